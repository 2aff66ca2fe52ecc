pub mod mode_resolution;
pub mod network;
pub mod pipeline;
pub mod retention;
pub mod zoning;

pub use pipeline::{parse_intermodal, parse_network};
