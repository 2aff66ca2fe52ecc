use crate::ids::{ConnectoidId, LayerId, LinkId, LinkSegmentId, LinkSegmentTypeId, NodeId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("attempting to get node '{0}' not in layer")]
    MissingNode(NodeId),
    #[error("attempting to get link '{0}' not in layer")]
    MissingLink(LinkId),
    #[error("attempting to get link segment '{0}' not in layer")]
    MissingLinkSegment(LinkSegmentId),
    #[error("attempting to get link segment type '{0}' not in layer")]
    MissingLinkSegmentType(LinkSegmentTypeId),
    #[error("attempting to get layer '{0}' not in network")]
    MissingLayer(LayerId),
    #[error("attempting to get connectoid '{0}' not in zoning")]
    MissingConnectoid(ConnectoidId),
    #[error("mode '{0}' is not assigned to any infrastructure layer")]
    UnassignedMode(String),
    #[error("link '{0}' cannot be created: {1}")]
    InvalidLink(LinkId, String),
    #[error("break of link '{0}' requested at a location not internal to the link")]
    BreakLocationNotInternal(LinkId),
    #[error("geometry error: {0}")]
    GeometryError(String),
    #[error("structure of network data is invalid: {0}")]
    InvalidNetworkData(String),
    #[error("{0}")]
    InternalError(String),
}
