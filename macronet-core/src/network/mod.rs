pub mod layer;
pub mod link;
pub mod link_segment;
pub mod link_segment_type;
pub mod macro_network;
pub mod node;

pub use layer::NetworkLayer;
pub use link::{Direction, Link};
pub use link_segment::LinkSegment;
pub use link_segment_type::{AccessProperties, LinkSegmentType};
pub use macro_network::MacroNetwork;
pub use node::Node;
