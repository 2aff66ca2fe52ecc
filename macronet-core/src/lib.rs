//! the macroscopic multi-modal transport network and transfer zoning model
//! consumed by traffic assignment tooling, together with the graph algorithms
//! that keep it topologically sound: link breaking at shared internal nodes,
//! dangling subnetwork removal, link segment type consolidation and spatial
//! lookup over link geometries.
//!
//! this crate has no knowledge of any particular data source; see the
//! companion source crates for materialising a network from raw map data.

pub mod algorithm;
pub mod error;
pub mod ids;
pub mod mode;
pub mod network;
pub mod zoning;

pub use error::NetworkError;
pub use ids::IdGenerators;
pub use mode::Mode;
pub use network::MacroNetwork;
pub use zoning::Zoning;
