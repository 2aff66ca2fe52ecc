use crate::config::DrivingSide;
use crate::error::OsmImportError;
use crate::tags::highway;
use geo::Point;
use itertools::Itertools;
use macronet_core::algorithm::geometry::{self, Side};
use macronet_core::algorithm::spatial::{LinkLocator, LinkMatch};
use macronet_core::algorithm::topology;
use macronet_core::ids::{LayerId, LinkSegmentId, NodeId, TransferZoneId};
use macronet_core::network::link::Direction;
use macronet_core::{IdGenerators, MacroNetwork, Mode, Zoning};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// reuse an existing link endpoint instead of inserting a new vertex when the
/// projected stop location is this close to it, in meters.
const ENDPOINT_REUSE_DISTANCE_M: f64 = 1.0;

/// the mutable resources connectoid construction operates on, bundled so the
/// postprocessing pass can hand them around as one borrow.
pub struct AccessResources<'a> {
    pub network: &'a mut MacroNetwork,
    pub ids: &'a mut IdGenerators,
    pub locator: &'a mut LinkLocator,
    pub zoning: &'a mut Zoning,
    pub driving_side: DrivingSide,
    pub closest_edge_buffer_m: f64,
    /// classification value per osm way, for importance tie-breaking
    pub way_class: &'a HashMap<i64, String>,
}

impl AccessResources<'_> {
    /// the door side of travel: the side a waiting area must lie on for
    /// road-based boarding.
    fn door_side(&self) -> Side {
        match self.driving_side {
            DrivingSide::Left => Side::Left,
            DrivingSide::Right => Side::Right,
        }
    }

    /// whether any directional segment of the link overlaps the wanted modes.
    fn link_supports(&self, candidate: &LinkMatch, modes: &BTreeSet<Mode>) -> Result<bool, OsmImportError> {
        let layer = self.network.layer(candidate.layer)?;
        let link = layer.get_link(candidate.link)?;
        for (_, segment) in link.segments() {
            if layer.segment_modes(segment)?.intersection(modes).next().is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// whether travelling the link in the given direction at the projection
    /// places the zone on the door side of the vehicle.
    fn direction_has_door_side(
        &self,
        candidate: &LinkMatch,
        direction: Direction,
        zone_point: &Point<f64>,
    ) -> Result<bool, OsmImportError> {
        let layer = self.network.layer(candidate.layer)?;
        let link = layer.get_link(candidate.link)?;
        let index = candidate
            .projection
            .segment_index
            .min(link.geometry.0.len().saturating_sub(2));
        let (a, b) = match direction {
            Direction::Ab => (link.geometry.0[index], link.geometry.0[index + 1]),
            Direction::Ba => (link.geometry.0[index + 1], link.geometry.0[index]),
        };
        let side = geometry::side_of(&Point(a), &Point(b), zone_point);
        Ok(side == self.door_side() || side == Side::On)
    }

    /// whether a road-based zone could board from at least one mode
    /// compatible segment of the link without crossing traffic.
    fn link_has_boarding_side(
        &self,
        candidate: &LinkMatch,
        modes: &BTreeSet<Mode>,
        zone_point: &Point<f64>,
    ) -> Result<bool, OsmImportError> {
        let layer = self.network.layer(candidate.layer)?;
        let link = layer.get_link(candidate.link)?;
        for (direction, segment) in link.segments().collect_vec() {
            if layer.segment_modes(segment)?.intersection(modes).next().is_none() {
                continue;
            }
            if self.direction_has_door_side(candidate, direction, zone_point)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// candidate access links for a waiting area: within the radius, mode
    /// compatible, restricted to the nominated way when one exists, within
    /// the closest-edge buffer of the nearest hit, on the correct driving
    /// side for road modes, ranked by way importance, distance, id.
    pub fn select_access_links(
        &self,
        point: &Point<f64>,
        zone_point: &Point<f64>,
        modes: &BTreeSet<Mode>,
        radius_m: f64,
        restrict_way: Option<i64>,
        max_links: usize,
    ) -> Result<Vec<LinkMatch>, OsmImportError> {
        let rail = is_rail_boarding(modes);
        let mut candidates = vec![];
        for candidate in self.locator.links_within(self.network, point, radius_m)? {
            if let Some(way) = restrict_way {
                let link = self.network.layer(candidate.layer)?.get_link(candidate.link)?;
                if link.external_id != Some(way) {
                    continue;
                }
            }
            if !self.link_supports(&candidate, modes)? {
                continue;
            }
            candidates.push(candidate);
        }
        if candidates.is_empty() {
            return Ok(vec![]);
        }
        // candidates arrive distance-sorted; keep the closest-edge family
        let closest = candidates[0].projection.distance_m;
        candidates.retain(|c| c.projection.distance_m <= closest + self.closest_edge_buffer_m);

        if !rail {
            let mut accessible = vec![];
            for candidate in candidates.into_iter() {
                if self.link_has_boarding_side(&candidate, modes, zone_point)? {
                    accessible.push(candidate);
                }
            }
            candidates = accessible;
        }

        let importance_of = |c: &LinkMatch| -> usize {
            self.network
                .layer(c.layer)
                .ok()
                .and_then(|layer| layer.get_link(c.link).ok())
                .and_then(|link| link.external_id)
                .and_then(|external| self.way_class.get(&external))
                .map(|value| highway::importance(value))
                .unwrap_or(usize::MAX)
        };
        candidates.sort_by(|a, b| {
            importance_of(a)
                .cmp(&importance_of(b))
                .then(a.projection.distance_m.total_cmp(&b.projection.distance_m))
                .then(a.link.cmp(&b.link))
        });
        candidates.truncate(max_links);
        Ok(candidates)
    }

    /// the network node representing a point, if one exists on any layer.
    pub fn existing_node_at(&self, point: &Point<f64>) -> Option<(LayerId, NodeId)> {
        for layer in self.network.layer_iterator() {
            if let Some(node) = layer.node_at_position(point) {
                return Some((layer.id, node));
            }
        }
        None
    }

    /// anchors a location onto a candidate link: reuses the nearest endpoint
    /// when the projection is close enough, otherwise inserts the projected
    /// position as a vertex (when it is not one already) and breaks the link
    /// there. connectoids on the broken link are re-anchored inline.
    pub fn anchor_on_link(&mut self, candidate: &LinkMatch) -> Result<NodeId, OsmImportError> {
        let layer_id = candidate.layer;
        let projected = candidate.projection.closest;

        // endpoint reuse
        {
            let layer = self.network.layer(layer_id)?;
            let link = layer.get_link(candidate.link)?;
            let pos_a = layer.get_node(link.node_a)?.position;
            let pos_b = layer.get_node(link.node_b)?.position;
            if geometry::haversine_m(&projected, &pos_a) <= ENDPOINT_REUSE_DISTANCE_M {
                return Ok(link.node_a);
            }
            if geometry::haversine_m(&projected, &pos_b) <= ENDPOINT_REUSE_DISTANCE_M {
                return Ok(link.node_b);
            }
        }

        let layer = self.network.layer_mut(layer_id)?;
        let vertex_position = {
            let link = layer.get_link_mut(candidate.link)?;
            let index = geometry::insert_vertex(
                &mut link.geometry,
                candidate.projection.segment_index,
                projected,
            );
            Point(link.geometry.0[index])
        };
        let node = match layer.node_at_position(&vertex_position) {
            Some(existing) => existing,
            None => layer.add_node(self.ids, None, vertex_position, None)?,
        };
        let broken = topology::break_link_at_node(
            layer,
            Some(&mut *self.zoning),
            self.ids,
            candidate.link,
            node,
        )?;
        if let Some(broken) = broken {
            let layer = self.network.layer(layer_id)?;
            self.locator
                .replace_link(layer, broken.removed, &[broken.first, broken.second]);
        }
        Ok(node)
    }

    /// creates the directed connectoid(s) anchoring a zone at a network
    /// node. rail boarding takes every mode compatible entry segment (doors
    /// on both sides); road boarding takes the single driving-side
    /// consistent entry segment. returns how many connectoids were created.
    pub fn create_connectoids(
        &mut self,
        layer_id: LayerId,
        node: NodeId,
        zone: TransferZoneId,
        zone_point: &Point<f64>,
        modes: &BTreeSet<Mode>,
    ) -> Result<usize, OsmImportError> {
        let rail = is_rail_boarding(modes);
        let layer = self.network.layer(layer_id)?;
        let entries = entry_segments(layer, node)?;

        let mut eligible: Vec<(LinkSegmentId, BTreeSet<Mode>)> = vec![];
        for segment in entries {
            let shared: BTreeSet<Mode> = layer
                .segment_modes(segment)?
                .intersection(modes)
                .copied()
                .collect();
            if shared.is_empty() {
                continue;
            }
            if !rail && !self.segment_has_door_side(layer_id, segment, zone_point)? {
                continue;
            }
            eligible.push((segment, shared));
        }
        if !rail {
            // exactly one driving-side consistent access point
            eligible.sort_by_key(|(segment, _)| *segment);
            eligible.truncate(1);
        }

        let mut created = 0;
        for (segment, shared) in eligible {
            self.zoning.add_connectoid(
                self.ids,
                layer_id,
                segment,
                node,
                BTreeMap::from([(zone, shared)]),
            )?;
            created += 1;
        }
        Ok(created)
    }

    /// whether the final approach of a segment towards its downstream node
    /// puts the zone on the door side.
    fn segment_has_door_side(
        &self,
        layer_id: LayerId,
        segment_id: LinkSegmentId,
        zone_point: &Point<f64>,
    ) -> Result<bool, OsmImportError> {
        let layer = self.network.layer(layer_id)?;
        let segment = layer.get_segment(segment_id)?;
        let link = layer.get_link(segment.link)?;
        let coords = &link.geometry.0;
        let (a, b) = match segment.direction {
            Direction::Ab => (coords[coords.len() - 2], coords[coords.len() - 1]),
            Direction::Ba => (coords[1], coords[0]),
        };
        let side = geometry::side_of(&Point(a), &Point(b), zone_point);
        Ok(side == self.door_side() || side == Side::On)
    }
}

/// rail vehicles board from either side; road vehicles have a door side.
/// a mixed road/rail mode set falls back to the road rules, the stricter of
/// the two.
pub fn is_rail_boarding(modes: &BTreeSet<Mode>) -> bool {
    !modes.is_empty() && modes.iter().all(|m| m.is_rail_based())
}

/// the segments that can physically deliver passengers to a node: those
/// whose downstream vertex is the node.
pub fn entry_segments(
    layer: &macronet_core::network::NetworkLayer,
    node: NodeId,
) -> Result<Vec<LinkSegmentId>, OsmImportError> {
    let mut result = vec![];
    for link_id in layer.get_node(node)?.links() {
        let link = layer.get_link(*link_id)?;
        for (direction, segment) in link.segments() {
            if link.downstream_node(direction) == node {
                result.push(segment);
            }
        }
    }
    result.sort();
    Ok(result)
}
