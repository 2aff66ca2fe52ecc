use super::{DeferredStation, ZoningState};
use crate::config::Settings;
use crate::error::OsmImportError;
use crate::io::handler::OsmEntityHandler;
use crate::osm::entity::{OsmMemberKind, OsmNodeData, OsmRelationData, OsmTags, OsmWayData};
use crate::pass::mode_resolution::ModeResolver;
use crate::tags::pt;
use geo::{Centroid, Coord, Geometry, LineString, Point, Polygon};
use itertools::Itertools;
use macronet_core::zoning::TransferZoneKind;
use macronet_core::IdGenerators;

/// tag keys carrying reference codes used for exact stop matching.
const REF_KEYS: [&str; 3] = ["ref", "local_ref", "route_ref"];

/// pass 2 of the public transport stitching: materialises transfer zones
/// from platforms, poles, bus stops, halts and ferry terminals, groups them
/// by stop-area relations, and defers stop positions and stations to the
/// postprocessing pass.
pub struct ZoningMainHandler<'a> {
    settings: &'a Settings,
    state: &'a mut ZoningState,
    ids: &'a mut IdGenerators,
}

impl<'a> ZoningMainHandler<'a> {
    pub fn new(
        settings: &'a Settings,
        state: &'a mut ZoningState,
        ids: &'a mut IdGenerators,
    ) -> ZoningMainHandler<'a> {
        ZoningMainHandler {
            settings,
            state,
            ids,
        }
    }

    pub fn finish(self) {
        log::info!(
            "main zoning pass created {} transfer zones and {} groups, deferred {} stop positions and {} stations",
            self.state.zoning.n_zones(),
            self.state.zoning.n_groups(),
            self.state.deferred_stops.len(),
            self.state.deferred_stations.len()
        );
    }

    fn record_refs(&mut self, zone: macronet_core::ids::TransferZoneId, tags: &OsmTags) {
        let refs: Vec<String> = REF_KEYS
            .iter()
            .filter_map(|k| tags.get(*k))
            .flat_map(|v| v.split(';'))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        if !refs.is_empty() {
            self.state.zone_refs.insert(zone, refs);
        }
    }

    fn create_zone_from_node(&mut self, node: &OsmNodeData, kind: TransferZoneKind) {
        let modes = pt::inferred_modes(&node.tags);
        let zone = self.state.zoning.add_zone(
            self.ids,
            Some(node.osmid.0),
            node.tag("name").map(String::from),
            kind,
            Geometry::Point(node.get_point()),
            modes,
        );
        self.state.zone_by_node.insert(node.osmid.0, zone);
        self.record_refs(zone, &node.tags);
    }

    fn create_zone_from_way(&mut self, way: &OsmWayData, kind: TransferZoneKind) {
        let coords: Vec<Coord<f64>> = way
            .nodes
            .iter()
            .filter_map(|n| self.state.node_positions.get(&n.0))
            .map(|(x, y)| Coord::from((*x, *y)))
            .collect();
        let geometry = match coords.len() {
            0 => {
                self.state.warn_once(
                    self.settings,
                    way.osmid.0,
                    None,
                    format!(
                        "platform way {} has no retained nodes, no transfer zone created",
                        way.osmid
                    ),
                );
                return;
            }
            1 => Geometry::Point(Point(coords[0])),
            _ if way.is_circular() => Geometry::Polygon(Polygon::new(LineString(coords), vec![])),
            _ => Geometry::LineString(LineString(coords)),
        };
        let modes = pt::inferred_modes(&way.tags);
        let zone = self.state.zoning.add_zone(
            self.ids,
            Some(way.osmid.0),
            way.tag("name").map(String::from),
            kind,
            geometry,
            modes,
        );
        self.state.zone_by_way.insert(way.osmid.0, zone);
        self.record_refs(zone, &way.tags);
    }

    fn defer_station(
        &mut self,
        kind: OsmMemberKind,
        external_id: i64,
        tags: &OsmTags,
        position: Option<Point<f64>>,
    ) {
        let Some(position) = position else {
            self.state.warn_once(
                self.settings,
                external_id,
                None,
                format!("station {kind} {external_id} has no resolvable position, skipped"),
            );
            return;
        };
        self.state.deferred_stations.push(DeferredStation {
            kind,
            external_id,
            name: tags.get("name").cloned(),
            position,
            modes: pt::inferred_modes(tags),
        });
    }
}

impl OsmEntityHandler for ZoningMainHandler<'_> {
    fn handle_node(&mut self, node: &OsmNodeData) -> Result<(), OsmImportError> {
        self.state
            .node_positions
            .insert(node.osmid.0, (node.x, node.y));
        if node.tags.is_empty() || !pt::is_public_transport_entity(&node.tags) {
            return Ok(());
        }
        if self.settings.zoning.is_node_excluded(node.osmid.0) {
            return Ok(());
        }
        if let Some(bounds) = &self.settings.bounding_box {
            if !bounds.contains(node.x, node.y) {
                return Ok(());
            }
        }

        if pt::is_ptv2_stop_position(&node.tags) {
            self.state.deferred_stops.push(node.clone());
            return Ok(());
        }
        if pt::is_ptv2_station(&node.tags) || pt::is_ptv1_station(&node.tags) {
            self.defer_station(
                OsmMemberKind::Node,
                node.osmid.0,
                &node.tags,
                Some(node.get_point()),
            );
            return Ok(());
        }
        if pt::is_ptv2_platform(&node.tags)
            || pt::is_ptv1_highway_platform(&node.tags)
            || pt::is_ptv1_railway_platform(&node.tags)
        {
            self.create_zone_from_node(node, TransferZoneKind::Platform);
        } else if pt::is_ptv1_bus_stop(&node.tags) || pt::is_ptv1_tram_stop(&node.tags) {
            self.create_zone_from_node(node, TransferZoneKind::Pole);
        } else if pt::is_ptv1_halt(&node.tags) || pt::is_ferry_terminal(&node.tags) {
            self.create_zone_from_node(node, TransferZoneKind::None);
        }
        Ok(())
    }

    fn handle_way(&mut self, way: &OsmWayData) -> Result<(), OsmImportError> {
        // classification values feed the access-link importance tie-breaker
        if let Some((_, value)) = ModeResolver::classify_way(way) {
            self.state.way_class.insert(way.osmid.0, value);
        }
        let promoted = self.state.platform_ways.contains(&way.osmid.0);
        if way.tags.is_empty() && !promoted {
            return Ok(());
        }
        if self.settings.zoning.is_way_excluded(way.osmid.0) {
            return Ok(());
        }
        let platform = promoted
            || pt::is_ptv2_platform(&way.tags)
            || pt::is_ptv1_railway_platform(&way.tags)
            || pt::is_ptv1_highway_platform(&way.tags);
        let station = pt::is_ptv2_station(&way.tags) || pt::is_ptv1_station(&way.tags);
        let terminal = pt::is_ferry_terminal(&way.tags);
        if !platform && !station && !terminal {
            return Ok(());
        }
        self.state
            .way_refs
            .insert(way.osmid.0, way.nodes.iter().map(|n| n.0).collect_vec());
        if platform {
            self.create_zone_from_way(way, TransferZoneKind::Platform);
        } else if station {
            let centroid = self.way_centroid(way);
            self.defer_station(OsmMemberKind::Way, way.osmid.0, &way.tags, centroid);
        } else {
            self.create_zone_from_way(way, TransferZoneKind::None);
        }
        Ok(())
    }

    fn handle_relation(&mut self, relation: &OsmRelationData) -> Result<(), OsmImportError> {
        if pt::is_ptv2_stop_area(&relation.tags) {
            self.handle_stop_area(relation);
        } else if relation.has_tag(pt::TYPE, pt::MULTIPOLYGON) && pt::is_ptv2_platform(&relation.tags)
        {
            self.handle_multipolygon_platform(relation);
        }
        Ok(())
    }
}

impl ZoningMainHandler<'_> {
    fn way_centroid(&self, way: &OsmWayData) -> Option<Point<f64>> {
        let coords: Vec<Coord<f64>> = way
            .nodes
            .iter()
            .filter_map(|n| self.state.node_positions.get(&n.0))
            .map(|(x, y)| Coord::from((*x, *y)))
            .collect();
        match coords.len() {
            0 => None,
            1 => Some(Point(coords[0])),
            _ => LineString(coords).centroid(),
        }
    }

    fn handle_stop_area(&mut self, relation: &OsmRelationData) {
        let group = self.state.zoning.add_group(
            self.ids,
            Some(relation.osmid.0),
            relation.tag("name").map(String::from),
        );
        for member in relation.members.iter() {
            // station members name the group; any role is accepted because
            // real data often leaves it empty
            if let Some(index) = self
                .state
                .deferred_stations
                .iter()
                .position(|s| s.kind == member.kind && s.external_id == member.member_ref)
            {
                let station = self.state.deferred_stations.remove(index);
                let rename = match (&station.name, self.state.zoning.get_group(group).ok().and_then(|g| g.name.clone())) {
                    (Some(station_name), Some(group_name)) => station_name != &group_name,
                    (Some(_), None) => true,
                    (None, _) => false,
                };
                if rename {
                    if let Ok(g) = self.state.zoning.get_group_mut(group) {
                        g.name = station.name.clone();
                    }
                }
                continue;
            }
            match member.role.as_str() {
                pt::ROLE_PLATFORM => {
                    if let Some(zone) = self.state.zone_of_external(member.kind, member.member_ref)
                    {
                        if let Err(e) = self.state.zoning.add_zone_to_group(zone, group) {
                            log::warn!(
                                "failed to attach platform member {} to stop area {}: {e}",
                                member.member_ref,
                                relation.osmid
                            );
                        }
                    }
                }
                pt::ROLE_STOP => {
                    if member.kind == OsmMemberKind::Node
                        && !self.settings.zoning.is_node_excluded(member.member_ref)
                    {
                        self.state
                            .groups_of_stop
                            .entry(member.member_ref)
                            .or_default()
                            .push(group);
                        // stop members without their own stop_position tag
                        // are still stop positions; defer them with the
                        // position we recorded in the nodes phase
                        let already_deferred = self
                            .state
                            .deferred_stops
                            .iter()
                            .any(|s| s.osmid.0 == member.member_ref);
                        if !already_deferred {
                            if let Some((x, y)) =
                                self.state.node_positions.get(&member.member_ref).copied()
                            {
                                self.state.deferred_stops.push(OsmNodeData {
                                    osmid: crate::osm::ids::OsmNodeId(member.member_ref),
                                    x,
                                    y,
                                    tags: OsmTags::new(),
                                });
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn handle_multipolygon_platform(&mut self, relation: &OsmRelationData) {
        // the zone was created from the outer way marked in preprocessing;
        // the relation contributes its name when the way had none
        for member in relation.members_with_role(pt::ROLE_OUTER) {
            let Some(zone) = self.state.zone_of_external(member.kind, member.member_ref) else {
                continue;
            };
            if let Ok(z) = self.state.zoning.get_zone_mut(zone) {
                if z.name.is_none() {
                    z.name = relation.tag("name").map(String::from);
                }
                if z.modes.is_empty() {
                    z.modes = pt::inferred_modes(&relation.tags);
                }
            }
        }
    }
}
