use crate::ids::{LinkId, LinkSegmentId, LinkSegmentTypeId};
use crate::network::link::Direction;
use serde::{Deserialize, Serialize};

/// one directional half of a link. carries the per-direction attributes; the
/// access properties live on the referenced link segment type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkSegment {
    pub id: LinkSegmentId,
    pub link: LinkId,
    pub direction: Direction,
    pub type_id: LinkSegmentTypeId,
    pub lanes: u32,
}

impl LinkSegment {
    pub fn new(
        id: LinkSegmentId,
        link: LinkId,
        direction: Direction,
        type_id: LinkSegmentTypeId,
        lanes: u32,
    ) -> LinkSegment {
        LinkSegment {
            id,
            link,
            direction,
            type_id,
            lanes,
        }
    }
}
