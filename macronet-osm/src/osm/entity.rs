use super::ids::{OsmNodeId, OsmRelationId, OsmWayId};
use geo::Point;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;

/// free-form OSM key=value tags. ordered so that tag-derived output is stable
/// across runs.
pub type OsmTags = BTreeMap<String, String>;

/// an OSM node as delivered by the streaming source: id, WGS84 position and
/// its full tag map. unlike the network side, the raw entity keeps every tag
/// because the public transport matcher inspects arbitrary keys.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct OsmNodeData {
    pub osmid: OsmNodeId,
    pub x: f64,
    pub y: f64,
    pub tags: OsmTags,
}

impl OsmNodeData {
    pub fn get_point(&self) -> Point<f64> {
        Point::new(self.x, self.y)
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(|v| v.as_str())
    }

    pub fn has_tag(&self, key: &str, value: &str) -> bool {
        self.tag(key) == Some(value)
    }
}

impl From<&osmpbf::elements::Node<'_>> for OsmNodeData {
    fn from(node: &osmpbf::elements::Node) -> Self {
        OsmNodeData {
            osmid: OsmNodeId(node.id()),
            x: node.lon(),
            y: node.lat(),
            tags: node
                .tags()
                .map(|(k, v)| (String::from(k.trim()), String::from(v.trim())))
                .collect(),
        }
    }
}

impl From<&osmpbf::dense::DenseNode<'_>> for OsmNodeData {
    fn from(node: &osmpbf::dense::DenseNode<'_>) -> Self {
        OsmNodeData {
            osmid: OsmNodeId(node.id()),
            x: node.lon(),
            y: node.lat(),
            tags: node
                .tags()
                .map(|(k, v)| (String::from(k.trim()), String::from(v.trim())))
                .collect(),
        }
    }
}

/// an OSM way: the ordered node references plus its tag map. consecutive
/// duplicate references are removed on construction, matching the treatment
/// of degenerate paths in the source data.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct OsmWayData {
    pub osmid: OsmWayId,
    pub nodes: Vec<OsmNodeId>,
    pub tags: OsmTags,
}

impl OsmWayData {
    pub fn new(osmid: OsmWayId, nodes: Vec<OsmNodeId>, tags: OsmTags) -> OsmWayData {
        let mut deduped = nodes;
        deduped.dedup();
        OsmWayData {
            osmid,
            nodes: deduped,
            tags,
        }
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(|v| v.as_str())
    }

    pub fn has_tag(&self, key: &str, value: &str) -> bool {
        self.tag(key) == Some(value)
    }

    /// a way whose first and last node are the same node. such ways are
    /// deferred and split rather than materialised directly.
    pub fn is_circular(&self) -> bool {
        self.nodes.len() > 2 && self.nodes.first() == self.nodes.last()
    }

    /// whether the way geometry describes an area rather than a line.
    pub fn is_area(&self) -> bool {
        self.has_tag("area", "yes") || self.is_circular()
    }
}

impl From<&osmpbf::elements::Way<'_>> for OsmWayData {
    fn from(way: &osmpbf::elements::Way) -> Self {
        OsmWayData::new(
            OsmWayId(way.id()),
            way.refs().map(OsmNodeId).collect_vec(),
            way.tags()
                .map(|(k, v)| (String::from(k.trim()), String::from(v.trim())))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OsmMemberKind {
    Node,
    Way,
    Relation,
}

impl Display for OsmMemberKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OsmMemberKind::Node => write!(f, "node"),
            OsmMemberKind::Way => write!(f, "way"),
            OsmMemberKind::Relation => write!(f, "relation"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OsmRelationMember {
    pub kind: OsmMemberKind,
    pub member_ref: i64,
    pub role: String,
}

/// an OSM relation: ordered members with roles plus its tag map.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct OsmRelationData {
    pub osmid: OsmRelationId,
    pub members: Vec<OsmRelationMember>,
    pub tags: OsmTags,
}

impl OsmRelationData {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(|v| v.as_str())
    }

    pub fn has_tag(&self, key: &str, value: &str) -> bool {
        self.tag(key) == Some(value)
    }

    pub fn members_with_role<'a>(
        &'a self,
        role: &'a str,
    ) -> impl Iterator<Item = &'a OsmRelationMember> {
        self.members.iter().filter(move |m| m.role == role)
    }
}

impl From<&osmpbf::elements::Relation<'_>> for OsmRelationData {
    fn from(relation: &osmpbf::elements::Relation) -> Self {
        let members = relation
            .members()
            .map(|member| {
                let kind = match member.member_type {
                    osmpbf::RelMemberType::Node => OsmMemberKind::Node,
                    osmpbf::RelMemberType::Way => OsmMemberKind::Way,
                    osmpbf::RelMemberType::Relation => OsmMemberKind::Relation,
                };
                OsmRelationMember {
                    kind,
                    member_ref: member.member_id,
                    role: member.role().unwrap_or_default().to_string(),
                }
            })
            .collect_vec();
        OsmRelationData {
            osmid: OsmRelationId(relation.id()),
            members,
            tags: relation
                .tags()
                .map(|(k, v)| (String::from(k.trim()), String::from(v.trim())))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_way_dedups_consecutive_refs() {
        let way = OsmWayData::new(
            OsmWayId(1),
            vec![OsmNodeId(1), OsmNodeId(1), OsmNodeId(2)],
            OsmTags::new(),
        );
        assert_eq!(way.nodes.len(), 2);
    }

    #[test]
    fn test_circular_way_detection() {
        let circular = OsmWayData::new(
            OsmWayId(1),
            vec![OsmNodeId(1), OsmNodeId(2), OsmNodeId(3), OsmNodeId(1)],
            OsmTags::new(),
        );
        assert!(circular.is_circular());
        let open = OsmWayData::new(
            OsmWayId(2),
            vec![OsmNodeId(1), OsmNodeId(2)],
            OsmTags::new(),
        );
        assert!(!open.is_circular());
        // a two-node way collapsing to one point is degenerate, not circular
        let degenerate = OsmWayData::new(
            OsmWayId(3),
            vec![OsmNodeId(1), OsmNodeId(2), OsmNodeId(1)],
            OsmTags::new(),
        );
        assert!(!degenerate.is_circular() || degenerate.nodes.len() > 2);
    }
}
