use crate::error::OsmImportError;
use crate::io::handler::OsmEntityHandler;
use crate::osm::entity::{
    OsmMemberKind, OsmNodeData, OsmRelationData, OsmRelationMember, OsmTags, OsmWayData,
};
use crate::osm::ids::{OsmNodeId, OsmRelationId, OsmWayId};
use itertools::Itertools;

/// decodes an `*.osm` XML document and replays it into the handler. per the
/// OSM XML conventions, top-level elements arrive in nodes, ways, relations
/// order; the handler callbacks preserve document order. elements with
/// missing or malformed mandatory attributes are skipped with a warning, a
/// malformed document is a decode error.
pub fn scan_xml(content: &str, handler: &mut dyn OsmEntityHandler) -> Result<(), OsmImportError> {
    let document =
        roxmltree::Document::parse(content).map_err(|e| OsmImportError::XmlParseError(e.to_string()))?;

    for element in document
        .root_element()
        .children()
        .filter(|c| c.is_element())
    {
        match element.tag_name().name() {
            "node" => {
                let (Some(id), Some(lon), Some(lat)) = (
                    parse_attribute::<i64>(&element, "id"),
                    parse_attribute::<f64>(&element, "lon"),
                    parse_attribute::<f64>(&element, "lat"),
                ) else {
                    log::warn!("osm xml node element missing id/lon/lat ignored");
                    continue;
                };
                let node = OsmNodeData {
                    osmid: OsmNodeId(id),
                    x: lon,
                    y: lat,
                    tags: collect_tags(&element),
                };
                handler.handle_node(&node)?;
            }
            "way" => {
                let Some(id) = parse_attribute::<i64>(&element, "id") else {
                    log::warn!("osm xml way element missing id ignored");
                    continue;
                };
                let refs = element
                    .children()
                    .filter(|c| c.is_element() && c.tag_name().name() == "nd")
                    .filter_map(|nd| {
                        let reference = nd.attribute("ref")?.parse::<i64>().ok()?;
                        Some(OsmNodeId(reference))
                    })
                    .collect_vec();
                let way = OsmWayData::new(OsmWayId(id), refs, collect_tags(&element));
                handler.handle_way(&way)?;
            }
            "relation" => {
                let Some(id) = parse_attribute::<i64>(&element, "id") else {
                    log::warn!("osm xml relation element missing id ignored");
                    continue;
                };
                let members = element
                    .children()
                    .filter(|c| c.is_element() && c.tag_name().name() == "member")
                    .filter_map(|member| {
                        let kind = match member.attribute("type")? {
                            "node" => OsmMemberKind::Node,
                            "way" => OsmMemberKind::Way,
                            "relation" => OsmMemberKind::Relation,
                            other => {
                                log::warn!("unknown relation member type '{other}' ignored");
                                return None;
                            }
                        };
                        let member_ref = member.attribute("ref")?.parse::<i64>().ok()?;
                        Some(OsmRelationMember {
                            kind,
                            member_ref,
                            role: member.attribute("role").unwrap_or_default().to_string(),
                        })
                    })
                    .collect_vec();
                let relation = OsmRelationData {
                    osmid: OsmRelationId(id),
                    members,
                    tags: collect_tags(&element),
                };
                handler.handle_relation(&relation)?;
            }
            // bounds, metadata and editor extensions are not our concern
            _ => {}
        }
    }
    Ok(())
}

fn parse_attribute<T: std::str::FromStr>(node: &roxmltree::Node, name: &str) -> Option<T> {
    node.attribute(name)?.parse::<T>().ok()
}

fn collect_tags(element: &roxmltree::Node) -> OsmTags {
    element
        .children()
        .filter(|c| c.is_element() && c.tag_name().name() == "tag")
        .filter_map(|tag| {
            let k = tag.attribute("k")?;
            let v = tag.attribute("v")?;
            Some((String::from(k.trim()), String::from(v.trim())))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::handler::InMemoryOsm;

    /// collecting handler used to observe the decoded stream
    #[derive(Default)]
    struct Collector {
        sink: InMemoryOsm,
    }

    impl OsmEntityHandler for Collector {
        fn handle_node(&mut self, node: &OsmNodeData) -> Result<(), OsmImportError> {
            self.sink.nodes.push(node.clone());
            Ok(())
        }
        fn handle_way(&mut self, way: &OsmWayData) -> Result<(), OsmImportError> {
            self.sink.ways.push(way.clone());
            Ok(())
        }
        fn handle_relation(&mut self, relation: &OsmRelationData) -> Result<(), OsmImportError> {
            self.sink.relations.push(relation.clone());
            Ok(())
        }
    }

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6" generator="test">
  <bounds minlat="0" minlon="0" maxlat="1" maxlon="1"/>
  <node id="1" lat="0.5" lon="0.5">
    <tag k="highway" v="bus_stop"/>
    <tag k="name" v="central"/>
  </node>
  <node id="2" lat="0.6" lon="0.6"/>
  <node id="3" lat="broken" lon="0.6"/>
  <way id="10">
    <nd ref="1"/>
    <nd ref="2"/>
    <tag k="highway" v="residential"/>
  </way>
  <relation id="20">
    <member type="node" ref="1" role="stop"/>
    <member type="way" ref="10" role="platform"/>
    <tag k="public_transport" v="stop_area"/>
  </relation>
</osm>"#;

    #[test]
    fn test_scan_sample_document() {
        let mut collector = Collector::default();
        scan_xml(SAMPLE, &mut collector).unwrap();
        assert_eq!(collector.sink.nodes.len(), 2, "broken node is skipped");
        assert_eq!(collector.sink.ways.len(), 1);
        assert_eq!(collector.sink.relations.len(), 1);

        let node = &collector.sink.nodes[0];
        assert_eq!(node.osmid.0, 1);
        assert_eq!(node.tag("highway"), Some("bus_stop"));

        let way = &collector.sink.ways[0];
        assert_eq!(way.nodes.len(), 2);
        assert_eq!(way.tag("highway"), Some("residential"));

        let relation = &collector.sink.relations[0];
        assert_eq!(relation.members.len(), 2);
        assert_eq!(relation.members[1].kind, OsmMemberKind::Way);
        assert_eq!(relation.members[1].role, "platform");
    }

    #[test]
    fn test_malformed_document_is_decode_error() {
        let mut collector = Collector::default();
        assert!(scan_xml("<osm><node id=", &mut collector).is_err());
    }
}
