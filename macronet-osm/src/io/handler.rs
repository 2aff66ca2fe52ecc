use crate::error::OsmImportError;
use crate::osm::entity::{OsmNodeData, OsmRelationData, OsmWayData};

/// visitor over the streamed OSM entities. sources deliver entities strictly
/// in nodes, ways, relations order (ascending id within each kind); the
/// handlers rely on that ordering. default implementations ignore the entity
/// so a handler only implements the kinds it cares about.
pub trait OsmEntityHandler {
    fn handle_node(&mut self, _node: &OsmNodeData) -> Result<(), OsmImportError> {
        Ok(())
    }

    fn handle_way(&mut self, _way: &OsmWayData) -> Result<(), OsmImportError> {
        Ok(())
    }

    fn handle_relation(&mut self, _relation: &OsmRelationData) -> Result<(), OsmImportError> {
        Ok(())
    }
}

/// anything that can replay the full entity stream into a handler, repeatedly.
/// the network pass and each zoning pass perform one scan each.
pub trait OsmScanner {
    fn scan(&self, handler: &mut dyn OsmEntityHandler) -> Result<(), OsmImportError>;

    /// human-readable origin of the data, for log messages.
    fn descriptor(&self) -> &str;
}

/// a typed in-memory entity stream. the test surface for the passes, and the
/// backing store for sources that were fully decoded up front.
#[derive(Default, Debug, Clone)]
pub struct InMemoryOsm {
    pub nodes: Vec<OsmNodeData>,
    pub ways: Vec<OsmWayData>,
    pub relations: Vec<OsmRelationData>,
    descriptor: String,
}

impl InMemoryOsm {
    pub fn new(
        nodes: Vec<OsmNodeData>,
        ways: Vec<OsmWayData>,
        relations: Vec<OsmRelationData>,
    ) -> InMemoryOsm {
        InMemoryOsm {
            nodes,
            ways,
            relations,
            descriptor: String::from("in-memory"),
        }
    }
}

impl OsmScanner for InMemoryOsm {
    fn scan(&self, handler: &mut dyn OsmEntityHandler) -> Result<(), OsmImportError> {
        for node in self.nodes.iter() {
            handler.handle_node(node)?;
        }
        for way in self.ways.iter() {
            handler.handle_way(way)?;
        }
        for relation in self.relations.iter() {
            handler.handle_relation(relation)?;
        }
        Ok(())
    }

    fn descriptor(&self) -> &str {
        &self.descriptor
    }
}
