use crate::error::OsmImportError;
use crate::io::handler::{OsmEntityHandler, OsmScanner};
use crate::io::{pbf, xml};
use std::path::PathBuf;

/// byte format of an OSM source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsmFormat {
    Xml,
    Pbf,
}

#[derive(Debug, Clone)]
enum Payload {
    File(PathBuf),
    /// remote sources are fetched once up front, then every pass replays the
    /// cached bytes
    Memory(Vec<u8>),
}

/// a local file or remote URL holding OSM data in XML or PBF form. the format
/// is sniffed from the name: `*.osm.pbf`/`*.pbf` is PBF, `*.osm`/`*.xml` is
/// XML; remote URLs without a recognisable extension (e.g. the OSM API `map`
/// endpoint) default to XML.
#[derive(Debug, Clone)]
pub struct OsmSource {
    descriptor: String,
    format: OsmFormat,
    payload: Payload,
}

impl OsmSource {
    /// resolves a descriptor to a source: `http(s)://` descriptors are
    /// downloaded, anything else is treated as a local path.
    pub fn locate(descriptor: &str) -> Result<OsmSource, OsmImportError> {
        if descriptor.starts_with("http://") || descriptor.starts_with("https://") {
            OsmSource::from_url(descriptor)
        } else {
            OsmSource::from_path(descriptor)
        }
    }

    pub fn from_path(path: &str) -> Result<OsmSource, OsmImportError> {
        let format = sniff_format(path)
            .ok_or_else(|| OsmImportError::UnknownSourceFormat(path.to_string()))?;
        Ok(OsmSource {
            descriptor: path.to_string(),
            format,
            payload: Payload::File(PathBuf::from(path)),
        })
    }

    pub fn from_url(url: &str) -> Result<OsmSource, OsmImportError> {
        // API endpoints serve XML without an extension
        let format = sniff_format(url).unwrap_or(OsmFormat::Xml);
        log::info!("retrieving remote OSM source {url}");
        let response = reqwest::blocking::get(url)
            .map_err(|e| OsmImportError::RemoteSourceError(url.to_string(), e.to_string()))?;
        if !response.status().is_success() {
            return Err(OsmImportError::RemoteSourceError(
                url.to_string(),
                format!("http status {}", response.status()),
            ));
        }
        let bytes = response
            .bytes()
            .map_err(|e| OsmImportError::RemoteSourceError(url.to_string(), e.to_string()))?;
        log::info!("retrieved {} bytes from remote source", bytes.len());
        Ok(OsmSource {
            descriptor: url.to_string(),
            format,
            payload: Payload::Memory(bytes.to_vec()),
        })
    }

    pub fn format(&self) -> OsmFormat {
        self.format
    }
}

impl OsmScanner for OsmSource {
    fn scan(&self, handler: &mut dyn OsmEntityHandler) -> Result<(), OsmImportError> {
        match (&self.payload, self.format) {
            (Payload::File(path), OsmFormat::Pbf) => pbf::scan_pbf_path(path, handler),
            (Payload::Memory(bytes), OsmFormat::Pbf) => pbf::scan_pbf_bytes(bytes, handler),
            (Payload::File(path), OsmFormat::Xml) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    OsmImportError::FileError(self.descriptor.clone(), e.to_string())
                })?;
                xml::scan_xml(&content, handler)
            }
            (Payload::Memory(bytes), OsmFormat::Xml) => {
                let content = std::str::from_utf8(bytes).map_err(|e| {
                    OsmImportError::XmlParseError(format!("source is not valid utf-8: {e}"))
                })?;
                xml::scan_xml(content, handler)
            }
        }
    }

    fn descriptor(&self) -> &str {
        &self.descriptor
    }
}

fn sniff_format(name: &str) -> Option<OsmFormat> {
    // strip query parameters before looking at the extension
    let path = name.split('?').next().unwrap_or(name);
    if path.ends_with(".osm.pbf") || path.ends_with(".pbf") {
        Some(OsmFormat::Pbf)
    } else if path.ends_with(".osm") || path.ends_with(".xml") {
        Some(OsmFormat::Xml)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_sniffing() {
        assert_eq!(sniff_format("melbourne.osm.pbf"), Some(OsmFormat::Pbf));
        assert_eq!(sniff_format("sydneycbd_2023.osm"), Some(OsmFormat::Xml));
        assert_eq!(
            sniff_format("https://example.org/extract.osm?bbox=1,2,3,4"),
            Some(OsmFormat::Xml)
        );
        assert_eq!(sniff_format("https://example.org/map"), None);
    }

    #[test]
    fn test_unknown_local_format_rejected() {
        assert!(OsmSource::from_path("network.gpkg").is_err());
    }
}
