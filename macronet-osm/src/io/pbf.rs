use crate::error::OsmImportError;
use crate::io::handler::OsmEntityHandler;
use crate::osm::entity::{OsmNodeData, OsmRelationData, OsmWayData};
use osmpbf::{Element, ElementReader};
use std::io::Read;
use std::path::Path;

/// decodes an `*.osm.pbf` file and replays it into the handler. pbf extracts
/// store their blobs in nodes, ways, relations order, which carries over to
/// the callback order the handlers depend on.
pub fn scan_pbf_path(
    path: &Path,
    handler: &mut dyn OsmEntityHandler,
) -> Result<(), OsmImportError> {
    let reader = ElementReader::from_path(path)?;
    scan_elements(reader, handler)
}

/// same as [`scan_pbf_path`] for an in-memory byte buffer, e.g. a downloaded
/// remote extract.
pub fn scan_pbf_bytes(
    bytes: &[u8],
    handler: &mut dyn OsmEntityHandler,
) -> Result<(), OsmImportError> {
    let reader = ElementReader::new(std::io::Cursor::new(bytes));
    scan_elements(reader, handler)
}

fn scan_elements<R: Read + Send>(
    reader: ElementReader<R>,
    handler: &mut dyn OsmEntityHandler,
) -> Result<(), OsmImportError> {
    // for_each cannot short-circuit, so the first handler error is captured
    // and subsequent elements are skipped
    let mut first_error: Option<OsmImportError> = None;
    reader.for_each(|element| {
        if first_error.is_some() {
            return;
        }
        let result = match element {
            Element::Node(ref node) => {
                if node.id() == 0 {
                    log::warn!(
                        "node missing OSMID at ({},{}) ignored",
                        node.lon(),
                        node.lat()
                    );
                    Ok(())
                } else {
                    handler.handle_node(&OsmNodeData::from(node))
                }
            }
            Element::DenseNode(ref dense) => handler.handle_node(&OsmNodeData::from(dense)),
            Element::Way(ref way) => handler.handle_way(&OsmWayData::from(way)),
            Element::Relation(ref relation) => {
                handler.handle_relation(&OsmRelationData::from(relation))
            }
        };
        if let Err(e) = result {
            first_error = Some(e);
        }
    })?;
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
