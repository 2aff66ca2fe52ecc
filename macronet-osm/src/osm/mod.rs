pub mod entity;
pub mod ids;

pub use entity::{
    OsmMemberKind, OsmNodeData, OsmRelationData, OsmRelationMember, OsmTags, OsmWayData,
};
pub use ids::{OsmNodeId, OsmRelationId, OsmWayId};
