//! OpenStreetMap support for the macronet macroscopic transport network
//! model: streams `.osm` / `.osm.pbf` extracts (local or remote), resolves
//! tagged ways into a directed multi-layer network with repaired topology,
//! and stitches public transport waiting areas onto it as transfer zones
//! with directed connectoids.
//!
//! the typical entry points are [`pass::parse_network`] and
//! [`pass::parse_intermodal`] with an [`io::OsmSource`] and [`config::Settings`].

pub mod config;
pub mod error;
pub mod io;
pub mod osm;
pub mod pass;
pub mod tags;

pub use error::OsmImportError;
