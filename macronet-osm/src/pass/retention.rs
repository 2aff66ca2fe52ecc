use crate::config::Settings;
use crate::error::OsmImportError;
use crate::io::handler::OsmEntityHandler;
use crate::osm::entity::OsmWayData;
use crate::osm::ids::OsmNodeId;
use crate::pass::mode_resolution::ModeResolver;
use std::collections::HashSet;

/// optional memory-optimisation pre-pass: scans only the ways and marks the
/// node ids the main pass must keep. nodes outside the marked set are never
/// stored, which matters on country-sized extracts where most nodes belong
/// to buildings and landuse, not to the network.
pub struct NodeRetentionPlanner<'a> {
    settings: &'a Settings,
    keep: HashSet<OsmNodeId>,
    ways_scanned: usize,
}

impl<'a> NodeRetentionPlanner<'a> {
    pub fn new(settings: &'a Settings) -> NodeRetentionPlanner<'a> {
        NodeRetentionPlanner {
            settings,
            keep: HashSet::new(),
            ways_scanned: 0,
        }
    }

    pub fn into_keep_set(self) -> HashSet<OsmNodeId> {
        log::info!(
            "node retention plan marks {} nodes across {} scanned ways",
            self.keep.len(),
            self.ways_scanned
        );
        self.keep
    }
}

impl OsmEntityHandler for NodeRetentionPlanner<'_> {
    fn handle_way(&mut self, way: &OsmWayData) -> Result<(), OsmImportError> {
        self.ways_scanned += 1;
        let Some((key, value)) = ModeResolver::classify_way(way) else {
            return Ok(());
        };
        if self.settings.network.is_way_type_activated(key, &value) {
            self.keep.extend(way.nodes.iter().copied());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::osm::entity::OsmTags;
    use crate::osm::ids::OsmWayId;

    fn way(id: i64, refs: &[i64], key: &str, value: &str) -> OsmWayData {
        let tags: OsmTags = [(key.to_string(), value.to_string())].into_iter().collect();
        OsmWayData::new(
            OsmWayId(id),
            refs.iter().map(|r| OsmNodeId(*r)).collect(),
            tags,
        )
    }

    #[test]
    fn test_only_activated_ways_mark_nodes() {
        let settings = Settings::default();
        let mut planner = NodeRetentionPlanner::new(&settings);
        planner
            .handle_way(&way(1, &[1, 2, 3], "highway", "residential"))
            .unwrap();
        planner
            .handle_way(&way(2, &[4, 5], "building", "yes"))
            .unwrap();
        planner
            .handle_way(&way(3, &[6, 7], "railway", "rail"))
            .unwrap();
        let keep = planner.into_keep_set();
        assert_eq!(keep.len(), 3);
        assert!(keep.contains(&OsmNodeId(1)));
        assert!(!keep.contains(&OsmNodeId(4)), "unclassified way ignored");
        assert!(!keep.contains(&OsmNodeId(6)), "railway parser inactive");
    }
}
