use crate::ids::{LinkId, LinkSegmentId, NodeId};
use geo::LineString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;

/// travel direction of a link segment relative to its parent link's node
/// ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// from node a towards node b
    Ab,
    /// from node b towards node a
    Ba,
}

impl Direction {
    pub fn reversed(&self) -> Direction {
        match self {
            Direction::Ab => Direction::Ba,
            Direction::Ba => Direction::Ab,
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Ab => write!(f, "ab"),
            Direction::Ba => write!(f, "ba"),
        }
    }
}

/// an undirected edge of the macroscopic network. the polyline geometry runs
/// from node a to node b; directionality is carried by the (up to two)
/// registered link segments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    /// id of the source way this link was materialised from
    pub external_id: Option<i64>,
    pub node_a: NodeId,
    pub node_b: NodeId,
    pub geometry: LineString<f64>,
    pub length_km: f64,
    pub segment_ab: Option<LinkSegmentId>,
    pub segment_ba: Option<LinkSegmentId>,
    pub tags: Option<BTreeMap<String, String>>,
}

impl Link {
    pub fn segment(&self, direction: Direction) -> Option<LinkSegmentId> {
        match direction {
            Direction::Ab => self.segment_ab,
            Direction::Ba => self.segment_ba,
        }
    }

    pub fn segments(&self) -> impl Iterator<Item = (Direction, LinkSegmentId)> {
        self.segment_ab
            .map(|s| (Direction::Ab, s))
            .into_iter()
            .chain(self.segment_ba.map(|s| (Direction::Ba, s)))
    }

    pub fn has_endpoint(&self, node: NodeId) -> bool {
        self.node_a == node || self.node_b == node
    }

    pub fn other_node(&self, node: NodeId) -> Option<NodeId> {
        if self.node_a == node {
            Some(self.node_b)
        } else if self.node_b == node {
            Some(self.node_a)
        } else {
            None
        }
    }

    /// the node a segment in the given direction travels towards.
    pub fn downstream_node(&self, direction: Direction) -> NodeId {
        match direction {
            Direction::Ab => self.node_b,
            Direction::Ba => self.node_a,
        }
    }

    /// the node a segment in the given direction departs from.
    pub fn upstream_node(&self, direction: Direction) -> NodeId {
        match direction {
            Direction::Ab => self.node_a,
            Direction::Ba => self.node_b,
        }
    }
}
