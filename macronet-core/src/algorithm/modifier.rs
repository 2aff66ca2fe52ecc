use crate::error::NetworkError;
use crate::ids::{IdGenerators, LinkId, LinkSegmentId, LinkSegmentTypeId, NodeId};
use crate::network::layer::NetworkLayer;
use crate::network::link::Link;
use crate::network::link_segment::LinkSegment;
use crate::network::macro_network::MacroNetwork;
use crate::network::node::Node;
use std::collections::BTreeMap;

/// re-numbers node, link, segment and segment type ids contiguously across
/// the network after repair and pruning have left gaps. items are renumbered
/// in (external id, internal id) order so that identical input always yields
/// identical final ids. the passed generators are restarted and left at the
/// new high-water marks.
///
/// must run before any zoning references network ids.
pub fn renumber_contiguously(
    network: &mut MacroNetwork,
    ids: &mut IdGenerators,
) -> Result<(), NetworkError> {
    *ids = IdGenerators::new();
    for layer_id in network.layer_ids() {
        // layer ids themselves are few and remain untouched; advancing the
        // counter keeps future layer creation collision-free
        let _ = ids.next_layer();
        let layer = network.layer_mut(layer_id)?;
        renumber_layer(layer, ids)?;
    }
    Ok(())
}

fn renumber_layer(layer: &mut NetworkLayer, ids: &mut IdGenerators) -> Result<(), NetworkError> {
    // stable orderings: external id first, internal id as tie breaker
    let mut node_order: Vec<(Option<i64>, NodeId)> = layer
        .node_iterator()
        .map(|n| (n.external_id, n.id))
        .collect();
    node_order.sort();
    let node_map: BTreeMap<NodeId, NodeId> = node_order
        .into_iter()
        .map(|(_, old)| (old, ids.next_node()))
        .collect();

    let mut link_order: Vec<(Option<i64>, LinkId)> = layer
        .link_iterator()
        .map(|l| (l.external_id, l.id))
        .collect();
    link_order.sort();
    let link_map: BTreeMap<LinkId, LinkId> = link_order
        .into_iter()
        .map(|(_, old)| (old, ids.next_link()))
        .collect();

    let mut type_order: Vec<LinkSegmentTypeId> =
        layer.segment_type_iterator().map(|t| t.id).collect();
    type_order.sort();
    let type_map: BTreeMap<LinkSegmentTypeId, LinkSegmentTypeId> = type_order
        .into_iter()
        .map(|old| (old, ids.next_link_segment_type()))
        .collect();

    // segments follow their (renumbered) parent link, ab before ba
    let mut segment_order: Vec<(LinkId, crate::network::link::Direction, LinkSegmentId)> = layer
        .segment_iterator()
        .map(|s| {
            let mapped = link_map.get(&s.link).copied().ok_or_else(|| {
                NetworkError::InternalError(format!(
                    "segment '{}' references link '{}' absent from the layer",
                    s.id, s.link
                ))
            })?;
            Ok((mapped, s.direction, s.id))
        })
        .collect::<Result<Vec<_>, NetworkError>>()?;
    segment_order.sort();
    let segment_map: BTreeMap<LinkSegmentId, LinkSegmentId> = segment_order
        .into_iter()
        .map(|(_, _, old)| (old, ids.next_link_segment()))
        .collect();

    let rebuilt_nodes: BTreeMap<NodeId, Node> = layer
        .node_iterator()
        .map(|n| {
            let mut node = n.clone();
            node.id = node_map[&n.id];
            node.links = n.links().map(|l| link_map[l]).collect();
            (node.id, node)
        })
        .collect();
    let rebuilt_links: BTreeMap<LinkId, Link> = layer
        .link_iterator()
        .map(|l| {
            let mut link = l.clone();
            link.id = link_map[&l.id];
            link.node_a = node_map[&l.node_a];
            link.node_b = node_map[&l.node_b];
            link.segment_ab = l.segment_ab.map(|s| segment_map[&s]);
            link.segment_ba = l.segment_ba.map(|s| segment_map[&s]);
            (link.id, link)
        })
        .collect();
    let rebuilt_segments: BTreeMap<LinkSegmentId, LinkSegment> = layer
        .segment_iterator()
        .map(|s| {
            let mut segment = s.clone();
            segment.id = segment_map[&s.id];
            segment.link = link_map[&s.link];
            segment.type_id = type_map[&s.type_id];
            (segment.id, segment)
        })
        .collect();
    let rebuilt_types = layer
        .segment_type_iterator()
        .map(|t| {
            let mut st = t.clone();
            st.id = type_map[&t.id];
            (st.id, st)
        })
        .collect();

    layer.replace_contents(rebuilt_nodes, rebuilt_links, rebuilt_segments, rebuilt_types);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::IdGenerators;
    use crate::mode::Mode;
    use crate::network::layer::test_support::chain_layer;
    use std::collections::BTreeSet;

    #[test]
    fn test_renumbering_is_contiguous_and_consistent() {
        let mut ids = IdGenerators::new();
        let (layer, _, links) = chain_layer(&mut ids, &[0.0, 0.001, 0.002, 0.003]);
        let mut network = MacroNetwork::new();
        let layer_id = network
            .create_layer(&mut ids, BTreeSet::from([Mode::Car, Mode::Bus]))
            .unwrap();
        let mut grafted = layer;
        grafted.id = layer_id;
        *network.layer_mut(layer_id).unwrap() = grafted;

        // remove a middle link to create id gaps
        network
            .layer_mut(layer_id)
            .unwrap()
            .remove_link(links[1])
            .unwrap();

        renumber_contiguously(&mut network, &mut ids).unwrap();
        let layer = network.layer(layer_id).unwrap();
        let node_ids: Vec<u64> = layer.node_iterator().map(|n| n.id.0).collect();
        assert_eq!(node_ids, vec![0, 1, 2, 3]);
        let link_ids: Vec<u64> = layer.link_iterator().map(|l| l.id.0).collect();
        assert_eq!(link_ids, vec![0, 1]);
        let segment_ids: Vec<u64> = layer.segment_iterator().map(|s| s.id.0).collect();
        assert_eq!(segment_ids, vec![0, 1, 2, 3]);
        // internal references still resolve
        for link in layer.link_iterator() {
            layer.get_node(link.node_a).unwrap();
            layer.get_node(link.node_b).unwrap();
            for (_, segment) in link.segments() {
                assert_eq!(layer.get_segment(segment).unwrap().link, link.id);
            }
        }
        for segment in layer.segment_iterator() {
            layer.get_segment_type(segment.type_id).unwrap();
        }
    }
}
