use crate::error::NetworkError;
use crate::ids::{LinkId, NodeId};
use crate::network::layer::NetworkLayer;
use itertools::Itertools;
use std::collections::{HashSet, VecDeque};

/// connected components of the undirected skeleton of a layer, each as a
/// sorted list of node ids. components are returned largest first, ties
/// broken by smallest contained node id, so repeated runs are deterministic.
pub fn connected_components(layer: &NetworkLayer) -> Result<Vec<Vec<NodeId>>, NetworkError> {
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut components: Vec<Vec<NodeId>> = vec![];
    // node iteration is sorted by id, which makes component discovery order
    // (and therefore output order) stable across runs
    let all_nodes: Vec<NodeId> = layer.node_iterator().map(|n| n.id).collect();
    for start in all_nodes {
        if visited.contains(&start) {
            continue;
        }
        let mut component = vec![];
        let mut frontier: VecDeque<NodeId> = VecDeque::new();
        frontier.push_back(start);
        visited.insert(start);
        while let Some(next) = frontier.pop_front() {
            component.push(next);
            let neighbors = layer
                .get_node(next)?
                .links()
                .map(|link_id| {
                    let link = layer.get_link(*link_id)?;
                    link.other_node(next).ok_or_else(|| {
                        NetworkError::InternalError(format!(
                            "link '{link_id}' listed on node '{next}' does not end there"
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            // sorted for deterministic frontier insertion order
            for neighbor in neighbors.into_iter().sorted() {
                if visited.insert(neighbor) {
                    frontier.push_back(neighbor);
                }
            }
        }
        component.sort();
        components.push(component);
    }
    components.sort_by_key(|c| (std::cmp::Reverse(c.len()), c.first().copied()));
    Ok(components)
}

/// summary of a dangling-subnetwork removal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub components_removed: usize,
    pub nodes_removed: usize,
    pub links_removed: usize,
}

/// removes connected components below the size threshold (in nodes). when
/// `keep_largest` is set only the largest component survives regardless of
/// the threshold. idempotent: a second invocation removes nothing.
pub fn remove_dangling_subnetworks(
    layer: &mut NetworkLayer,
    min_size: usize,
    keep_largest: bool,
) -> Result<PruneReport, NetworkError> {
    let components = connected_components(layer)?;
    let mut report = PruneReport::default();
    for (index, component) in components.iter().enumerate() {
        let keep = if keep_largest {
            index == 0
        } else {
            component.len() >= min_size
        };
        if keep {
            continue;
        }
        report.components_removed += 1;
        let links: Vec<LinkId> = component
            .iter()
            .map(|node| Ok(layer.get_node(*node)?.links().copied().collect_vec()))
            .collect::<Result<Vec<_>, NetworkError>>()?
            .into_iter()
            .flatten()
            .sorted()
            .dedup()
            .collect();
        for link in links {
            layer.remove_link(link)?;
            report.links_removed += 1;
        }
        for node in component {
            layer.remove_node(*node)?;
            report.nodes_removed += 1;
        }
    }
    if report.components_removed > 0 {
        log::info!(
            "removed {} dangling subnetworks ({} nodes, {} links)",
            report.components_removed,
            report.nodes_removed,
            report.links_removed
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::IdGenerators;
    use crate::network::layer::test_support::chain_layer;
    use geo::{LineString, Point};

    #[test]
    fn test_single_component() {
        let mut ids = IdGenerators::new();
        let (layer, nodes, _) = chain_layer(&mut ids, &[0.0, 0.001, 0.002]);
        let components = connected_components(&layer).unwrap();
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].len(), nodes.len());
    }

    #[test]
    fn test_dangling_component_removed_and_idempotent() {
        let mut ids = IdGenerators::new();
        let (mut layer, _, _) = chain_layer(&mut ids, &[0.0, 0.001, 0.002, 0.003]);
        // a detached two-node stub away from the chain
        let a = layer
            .add_node(&mut ids, Some(100), Point::new(1.0, 1.0), None)
            .unwrap();
        let b = layer
            .add_node(&mut ids, Some(101), Point::new(1.001, 1.0), None)
            .unwrap();
        layer
            .add_link(
                &mut ids,
                Some(999),
                a,
                b,
                LineString::from(vec![(1.0, 1.0), (1.001, 1.0)]),
                None,
            )
            .unwrap();
        assert_eq!(connected_components(&layer).unwrap().len(), 2);

        let report = remove_dangling_subnetworks(&mut layer, 3, false).unwrap();
        assert_eq!(report.components_removed, 1);
        assert_eq!(report.nodes_removed, 2);
        assert_eq!(report.links_removed, 1);
        assert_eq!(layer.n_nodes(), 4);

        let second = remove_dangling_subnetworks(&mut layer, 3, false).unwrap();
        assert_eq!(second, PruneReport::default());
    }

    #[test]
    fn test_keep_largest_only() {
        let mut ids = IdGenerators::new();
        let (mut layer, _, _) = chain_layer(&mut ids, &[0.0, 0.001, 0.002]);
        let a = layer
            .add_node(&mut ids, Some(100), Point::new(1.0, 1.0), None)
            .unwrap();
        let b = layer
            .add_node(&mut ids, Some(101), Point::new(1.001, 1.0), None)
            .unwrap();
        layer
            .add_link(
                &mut ids,
                Some(999),
                a,
                b,
                LineString::from(vec![(1.0, 1.0), (1.001, 1.0)]),
                None,
            )
            .unwrap();
        remove_dangling_subnetworks(&mut layer, 0, true).unwrap();
        assert_eq!(connected_components(&layer).unwrap().len(), 1);
        assert_eq!(layer.n_nodes(), 3);
    }
}
