pub mod handler;
pub mod pbf;
pub mod source;
pub mod xml;

pub use handler::{InMemoryOsm, OsmEntityHandler, OsmScanner};
pub use source::{OsmFormat, OsmSource};
