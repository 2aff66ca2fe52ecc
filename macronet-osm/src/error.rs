use macronet_core::NetworkError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OsmImportError {
    #[error("invalid OSM import configuration: {0}")]
    ConfigurationError(String),
    #[error("failure reading .pbf source: {source}")]
    PbfLibError {
        #[from]
        source: osmpbf::Error,
    },
    #[error("failure parsing .osm xml source: {0}")]
    XmlParseError(String),
    #[error("failure retrieving remote source '{0}': {1}")]
    RemoteSourceError(String, String),
    #[error("failure reading file '{0}': {1}")]
    FileError(String, String),
    #[error("unsupported source '{0}': cannot determine OSM format from its name")]
    UnknownSourceFormat(String),
    #[error("network model error: {source}")]
    NetworkError {
        #[from]
        source: NetworkError,
    },
    #[error("structure of OSM data is invalid: {0}")]
    InvalidOsmData(String),
    #[error("{0}")]
    InternalError(String),
}
