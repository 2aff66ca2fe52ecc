use crate::algorithm::geometry::{self, Projection};
use crate::error::NetworkError;
use crate::ids::{LayerId, LinkId};
use crate::network::layer::NetworkLayer;
use crate::network::macro_network::MacroNetwork;
use geo::{LineString, Point};
use itertools::Itertools;
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{Envelope, RTree, RTreeObject, AABB};

type LinkEnvelope = GeomWithData<Rectangle<(f64, f64)>, (LayerId, LinkId)>;

/// a candidate link returned by a spatial query, with the exact projection of
/// the query point onto the link's polyline.
#[derive(Debug, Clone, Copy)]
pub struct LinkMatch {
    pub layer: LayerId,
    pub link: LinkId,
    pub projection: Projection,
}

/// bulk-loaded R-tree over link polyline bounding rectangles across all
/// layers. envelope hits are re-checked against the true geometry, since only
/// the bounding boxes are compared by the tree. rebuilt once after network
/// materialisation and kept in sync on link breaks.
pub struct LinkLocator {
    rtree: RTree<LinkEnvelope>,
}

fn envelope_of(geometry: &LineString<f64>) -> Rectangle<(f64, f64)> {
    let xs = geometry.0.iter().map(|c| c.x).collect_vec();
    let ys = geometry.0.iter().map(|c| c.y).collect_vec();
    let min_x = xs.iter().copied().fold(f64::INFINITY, f64::min);
    let max_x = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min_y = ys.iter().copied().fold(f64::INFINITY, f64::min);
    let max_y = ys.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Rectangle::from_corners((min_x, min_y), (max_x, max_y))
}

/// degrees of longitude/latitude spanned by a radius in meters at a latitude.
fn radius_to_degrees(radius_m: f64, lat: f64) -> (f64, f64) {
    let deg_lat = radius_m / 111_320.0;
    let cos = lat.to_radians().cos().max(0.01);
    (deg_lat / cos, deg_lat)
}

impl LinkLocator {
    pub fn from_network(network: &MacroNetwork) -> LinkLocator {
        let entries: Vec<LinkEnvelope> = network
            .layer_iterator()
            .flat_map(|layer| {
                layer
                    .link_iterator()
                    .map(|link| GeomWithData::new(envelope_of(&link.geometry), (layer.id, link.id)))
            })
            .collect();
        log::debug!("bulk loading link locator with {} envelopes", entries.len());
        LinkLocator {
            rtree: RTree::bulk_load(entries),
        }
    }

    /// all links within the given great-circle distance of the point, closest
    /// first, ties broken by link id for deterministic selection.
    pub fn links_within(
        &self,
        network: &MacroNetwork,
        point: &Point<f64>,
        radius_m: f64,
    ) -> Result<Vec<LinkMatch>, NetworkError> {
        let (dx, dy) = radius_to_degrees(radius_m, point.y());
        let search = AABB::from_corners(
            (point.x() - dx, point.y() - dy),
            (point.x() + dx, point.y() + dy),
        );
        let mut matches = vec![];
        for entry in self.rtree.locate_in_envelope_intersecting(&search) {
            let (layer_id, link_id) = entry.data;
            let link = network.layer(layer_id)?.get_link(link_id)?;
            // the envelope hit may still be farther than the radius
            if let Some(projection) = geometry::closest_on_linestring(point, &link.geometry) {
                if projection.distance_m <= radius_m {
                    matches.push(LinkMatch {
                        layer: layer_id,
                        link: link_id,
                        projection,
                    });
                }
            }
        }
        matches.sort_by(|a, b| {
            a.projection
                .distance_m
                .total_cmp(&b.projection.distance_m)
                .then(a.link.cmp(&b.link))
        });
        Ok(matches)
    }

    /// replaces the envelope of a removed link with the envelopes of its two
    /// halves after a break. the halves jointly cover the removed extent, so
    /// draining their union envelope is guaranteed to visit the stale entry.
    pub fn replace_link(&mut self, layer: &NetworkLayer, removed: LinkId, added: &[LinkId]) {
        let mut envelopes = vec![];
        for link_id in added {
            if let Ok(link) = layer.get_link(*link_id) {
                envelopes.push(GeomWithData::new(
                    envelope_of(&link.geometry),
                    (layer.id, *link_id),
                ));
            }
        }
        if let Some(union) = envelopes
            .iter()
            .map(|e| e.envelope())
            .reduce(|mut a, b| {
                a.merge(&b);
                a
            })
        {
            let drained = self
                .rtree
                .drain_in_envelope_intersecting(union)
                .collect_vec();
            for entry in drained.into_iter() {
                if entry.data != (layer.id, removed) {
                    self.rtree.insert(entry);
                }
            }
        }
        for entry in envelopes {
            self.rtree.insert(entry);
        }
    }

    pub fn len(&self) -> usize {
        self.rtree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.rtree.size() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::topology;
    use crate::ids::IdGenerators;
    use crate::mode::Mode;
    use crate::network::layer::test_support::chain_layer;
    use std::collections::BTreeSet;

    fn network_with_chain() -> (MacroNetwork, IdGenerators, Vec<LinkId>) {
        let mut ids = IdGenerators::new();
        let (layer, _, links) = chain_layer(&mut ids, &[0.0, 0.001, 0.002]);
        let mut network = MacroNetwork::new();
        let layer_id = network
            .create_layer(&mut ids, BTreeSet::from([Mode::Car, Mode::Bus]))
            .unwrap();
        // graft the prepared layer in place of the freshly created one
        let id = layer_id;
        let mut grafted = layer;
        grafted.id = id;
        *network.layer_mut(id).unwrap() = grafted;
        (network, ids, links)
    }

    #[test]
    fn test_links_within_radius() {
        let (network, _, links) = network_with_chain();
        let locator = LinkLocator::from_network(&network);
        assert_eq!(locator.len(), 2);
        let near = locator
            .links_within(&network, &Point::new(0.0005, 0.0001), 50.0)
            .unwrap();
        assert_eq!(near.len(), 1);
        assert_eq!(near[0].link, links[0]);
        assert!((near[0].projection.distance_m - 11.1).abs() < 1.0);

        let none = locator
            .links_within(&network, &Point::new(0.0005, 0.01), 50.0)
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_replace_link_after_break() {
        let (mut network, mut ids, links) = network_with_chain();
        let layer_id = network.layer_ids()[0];
        let mut locator = LinkLocator::from_network(&network);

        // add a node mid-way on the first link and break there
        let layer = network.layer_mut(layer_id).unwrap();
        let node = layer
            .add_node(&mut ids, Some(50), Point::new(0.0005, 0.0), None)
            .unwrap();
        let link = links[0];
        {
            let link_mut = layer.get_link_mut(link).unwrap();
            link_mut.geometry.0.insert(1, geo::Coord::from((0.0005, 0.0)));
        }
        let broken = topology::break_link_at_node(layer, None, &mut ids, link, node)
            .unwrap()
            .unwrap();
        let layer = network.layer(layer_id).unwrap();
        locator.replace_link(layer, broken.removed, &[broken.first, broken.second]);
        assert_eq!(locator.len(), 3);

        let near = locator
            .links_within(&network, &Point::new(0.00025, 0.0), 20.0)
            .unwrap();
        assert_eq!(near.len(), 1);
        assert_eq!(near[0].link, broken.first);
    }
}
