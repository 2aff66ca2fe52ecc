use crate::ids::{LinkId, NodeId};
use geo::Point;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// a vertex of the macroscopic network. positions are unique within a layer;
/// the owning layer maintains the position lookup and the link adjacency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// id of the source entity this node was created from, if any. nodes
    /// created by link breaking at projected locations have none.
    pub external_id: Option<i64>,
    pub position: Point<f64>,
    pub tags: Option<BTreeMap<String, String>>,
    /// links that have this node as an endpoint. maintained by the layer on
    /// link registration and removal.
    pub(crate) links: BTreeSet<LinkId>,
}

impl Node {
    pub fn new(
        id: NodeId,
        external_id: Option<i64>,
        position: Point<f64>,
        tags: Option<BTreeMap<String, String>>,
    ) -> Node {
        Node {
            id,
            external_id,
            position,
            tags,
            links: BTreeSet::new(),
        }
    }

    /// links incident to this node, ordered by id.
    pub fn links(&self) -> impl Iterator<Item = &LinkId> {
        self.links.iter()
    }

    pub fn degree(&self) -> usize {
        self.links.len()
    }
}
