use crate::algorithm::geometry;
use crate::error::NetworkError;
use crate::ids::{IdGenerators, LinkId, NodeId};
use crate::network::link::Direction;
use crate::network::layer::NetworkLayer;
use crate::zoning::Zoning;
use geo::Point;

/// outcome of breaking a link at an internal node: the removed link and the
/// two replacement halves. callers use this to update their own indices
/// (spatial index, way-to-link mappings).
#[derive(Debug, Clone, Copy)]
pub struct BrokenLink {
    pub removed: LinkId,
    /// half from the original node a to the break node
    pub first: LinkId,
    /// half from the break node to the original node b
    pub second: LinkId,
    pub at: NodeId,
}

/// breaks a link at a node whose position is an internal vertex of the link's
/// polyline. both halves keep the original's direction(s), type, lanes,
/// external id and retained tags. connectoids registered on the removed
/// segments are re-anchored on the half that still ends at their access node.
///
/// breaking at an endpoint of the link is a no-op and returns None, which
/// makes repeated invocations idempotent. requesting a break at a node whose
/// position is not on the link at all is an invariant violation.
pub fn break_link_at_node(
    layer: &mut NetworkLayer,
    zoning: Option<&mut Zoning>,
    ids: &mut IdGenerators,
    link_id: LinkId,
    node_id: NodeId,
) -> Result<Option<BrokenLink>, NetworkError> {
    let link = layer.get_link(link_id)?;
    if link.has_endpoint(node_id) {
        return Ok(None);
    }
    let position = layer.get_node(node_id)?.position;
    let index = geometry::vertex_index_at(&layer.get_link(link_id)?.geometry, &position)
        .ok_or(NetworkError::BreakLocationNotInternal(link_id))?;

    let removed = layer.get_link(link_id)?.clone();
    let (first_geometry, second_geometry) = geometry::split_at_vertex(&removed.geometry, index)
        .ok_or(NetworkError::BreakLocationNotInternal(link_id))?;

    let original_segments: Vec<_> = removed
        .segments()
        .map(|(direction, id)| {
            let segment = layer.get_segment(id)?;
            Ok((direction, id, segment.type_id, segment.lanes))
        })
        .collect::<Result<Vec<_>, NetworkError>>()?;

    layer.remove_link(link_id)?;
    let first = layer.add_link(
        ids,
        removed.external_id,
        removed.node_a,
        node_id,
        first_geometry,
        removed.tags.clone(),
    )?;
    let second = layer.add_link(
        ids,
        removed.external_id,
        node_id,
        removed.node_b,
        second_geometry,
        removed.tags,
    )?;

    for (direction, _, type_id, lanes) in original_segments.iter() {
        layer.add_segment(ids, first, *direction, *type_id, *lanes)?;
        layer.add_segment(ids, second, *direction, *type_id, *lanes)?;
    }

    // a connectoid's access node is the downstream vertex of its segment, so
    // the ab half (which still reaches the original node b) takes over the ab
    // connectoids and the ba half takes over the ba connectoids.
    if let Some(zoning) = zoning {
        for (direction, old_segment, _, _) in original_segments {
            let half = match direction {
                Direction::Ab => second,
                Direction::Ba => first,
            };
            let replacement = layer.get_link(half)?.segment(direction).ok_or_else(|| {
                NetworkError::InternalError(format!(
                    "broken link half lost its {direction} segment"
                ))
            })?;
            zoning.retarget_segment(old_segment, replacement)?;
        }
    }

    Ok(Some(BrokenLink {
        removed: link_id,
        first,
        second,
        at: node_id,
    }))
}

/// links of the layer that carry the given position as an internal
/// (non-endpoint) vertex of their polyline. linear scan; callers batching
/// many lookups should index positions themselves.
pub fn links_with_internal_position(layer: &NetworkLayer, position: &Point<f64>) -> Vec<LinkId> {
    let key = geometry::position_key(position);
    layer
        .link_iterator()
        .filter(|link| {
            link.geometry.0[1..link.geometry.0.len().saturating_sub(1)]
                .iter()
                .any(|c| geometry::position_key(&Point(*c)) == key)
        })
        .map(|link| link.id)
        .collect()
}

/// breaks every link that runs through the given node internally. loops until
/// no link carries the node as an internal vertex, so a node internal to many
/// links (or to a previously-broken half) is handled in one call.
pub fn break_links_at_node(
    layer: &mut NetworkLayer,
    mut zoning: Option<&mut Zoning>,
    ids: &mut IdGenerators,
    node_id: NodeId,
) -> Result<Vec<BrokenLink>, NetworkError> {
    let mut breaks = vec![];
    loop {
        let position = layer.get_node(node_id)?.position;
        let candidates = links_with_internal_position(layer, &position);
        let Some(link_id) = candidates.first() else {
            break;
        };
        let result = break_link_at_node(layer, zoning.as_deref_mut(), ids, *link_id, node_id)?;
        match result {
            Some(broken) => breaks.push(broken),
            None => {
                return Err(NetworkError::InternalError(format!(
                    "link '{link_id}' reported node '{node_id}' as internal but break was a no-op"
                )))
            }
        }
    }
    Ok(breaks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::IdGenerators;
    use crate::mode::Mode;
    use crate::network::layer::NetworkLayer;
    use crate::network::link_segment_type::{AccessProperties, LinkSegmentType};
    use crate::ids::LinkSegmentTypeId;
    use geo::LineString;
    use std::collections::{BTreeMap, BTreeSet};

    /// one link a->b->c->d with both directions registered; returns the
    /// middle node b so tests can break there.
    fn layer_with_polyline() -> (NetworkLayer, IdGenerators, LinkId, NodeId) {
        let mut ids = IdGenerators::new();
        let mut layer = NetworkLayer::new(ids.next_layer(), BTreeSet::from([Mode::Car]));
        let type_id = layer.find_or_add_segment_type(
            &mut ids,
            LinkSegmentType {
                id: LinkSegmentTypeId(0),
                name: String::from("highway=tertiary"),
                external_id: String::from("highway=tertiary"),
                capacity_pcu_hour_lane: 1200.0,
                max_density_pcu_km_lane: 180.0,
                access: BTreeMap::from([(Mode::Car, AccessProperties::new(Mode::Car, 50.0))]),
            },
        );
        let a = layer
            .add_node(&mut ids, Some(1), geo::Point::new(0.0, 0.0), None)
            .unwrap();
        let d = layer
            .add_node(&mut ids, Some(4), geo::Point::new(0.003, 0.0), None)
            .unwrap();
        let geometry = LineString::from(vec![
            (0.0, 0.0),
            (0.001, 0.0),
            (0.002, 0.0),
            (0.003, 0.0),
        ]);
        let link = layer
            .add_link(&mut ids, Some(55), a, d, geometry, None)
            .unwrap();
        layer
            .add_segment(&mut ids, link, Direction::Ab, type_id, 1)
            .unwrap();
        layer
            .add_segment(&mut ids, link, Direction::Ba, type_id, 1)
            .unwrap();
        let b = layer
            .add_node(&mut ids, Some(2), geo::Point::new(0.001, 0.0), None)
            .unwrap();
        (layer, ids, link, b)
    }

    #[test]
    fn test_break_at_internal_vertex() {
        let (mut layer, mut ids, link, b) = layer_with_polyline();
        let broken = break_link_at_node(&mut layer, None, &mut ids, link, b)
            .unwrap()
            .unwrap();
        assert_eq!(layer.n_links(), 2);
        assert_eq!(layer.n_segments(), 4);
        let first = layer.get_link(broken.first).unwrap();
        let second = layer.get_link(broken.second).unwrap();
        assert_eq!(first.node_b, b);
        assert_eq!(second.node_a, b);
        assert_eq!(first.geometry.0.len(), 2);
        assert_eq!(second.geometry.0.len(), 3);
        assert_eq!(first.external_id, Some(55));
        assert_eq!(second.external_id, Some(55));
        assert_eq!(layer.links_of_external(55).len(), 2);
        // geometry endpoint invariant holds on both halves
        for link in [first, second] {
            let pos_a = layer.get_node(link.node_a).unwrap().position;
            let pos_b = layer.get_node(link.node_b).unwrap().position;
            assert!(geometry::same_position(&pos_a, &Point(link.geometry.0[0])));
            assert!(geometry::same_position(
                &pos_b,
                &Point(*link.geometry.0.last().unwrap())
            ));
        }
    }

    #[test]
    fn test_break_at_endpoint_is_noop() {
        let (mut layer, mut ids, link, _) = layer_with_polyline();
        let a = layer.get_link(link).unwrap().node_a;
        let result = break_link_at_node(&mut layer, None, &mut ids, link, a).unwrap();
        assert!(result.is_none());
        assert_eq!(layer.n_links(), 1);
    }

    #[test]
    fn test_break_all_then_no_internal_nodes_remain() {
        let (mut layer, mut ids, _, b) = layer_with_polyline();
        let c = layer
            .add_node(&mut ids, Some(3), geo::Point::new(0.002, 0.0), None)
            .unwrap();
        break_links_at_node(&mut layer, None, &mut ids, b).unwrap();
        break_links_at_node(&mut layer, None, &mut ids, c).unwrap();
        assert_eq!(layer.n_links(), 3);
        for node in [b, c] {
            let position = layer.get_node(node).unwrap().position;
            assert!(links_with_internal_position(&layer, &position).is_empty());
        }
        // second invocation is idempotent
        assert!(break_links_at_node(&mut layer, None, &mut ids, b)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_break_rewrites_connectoid_access_segments() {
        let (mut layer, mut ids, link, b) = layer_with_polyline();
        let mut zoning = Zoning::new();
        let zone = zoning.add_zone(
            &mut ids,
            Some(9),
            None,
            crate::zoning::TransferZoneKind::Pole,
            geo::Geometry::Point(geo::Point::new(0.003, 0.0001)),
            BTreeSet::from([Mode::Car]),
        );
        let ab = layer.get_link(link).unwrap().segment(Direction::Ab).unwrap();
        let node_b_end = layer.get_link(link).unwrap().node_b;
        let connectoid = zoning
            .add_connectoid(
                &mut ids,
                layer.id,
                ab,
                node_b_end,
                BTreeMap::from([(zone, BTreeSet::from([Mode::Car]))]),
            )
            .unwrap();
        let broken = break_link_at_node(&mut layer, Some(&mut zoning), &mut ids, link, b)
            .unwrap()
            .unwrap();
        let expected = layer
            .get_link(broken.second)
            .unwrap()
            .segment(Direction::Ab)
            .unwrap();
        assert_eq!(
            zoning.get_connectoid(connectoid).unwrap().access_segment,
            expected
        );
        // the access segment still ends at the connectoid's access node
        assert_eq!(
            layer.segment_downstream_node(expected).unwrap(),
            node_b_end
        );
    }
}
