use super::ZoningState;
use crate::config::Settings;
use crate::error::OsmImportError;
use crate::io::handler::OsmEntityHandler;
use crate::osm::entity::{OsmMemberKind, OsmRelationData};
use crate::tags::pt;

/// pass 1 of the public transport stitching: reads only relations and marks
/// the ways that must be retained as platforms in pass 2 even when the way
/// itself carries no public transport tag. this covers stop-area platform
/// members and multipolygon platforms, whose outer ways are plain geometry.
pub struct ZoningPreprocessHandler<'a> {
    settings: &'a Settings,
    state: &'a mut ZoningState,
    relations_matched: usize,
}

impl<'a> ZoningPreprocessHandler<'a> {
    pub fn new(settings: &'a Settings, state: &'a mut ZoningState) -> ZoningPreprocessHandler<'a> {
        ZoningPreprocessHandler {
            settings,
            state,
            relations_matched: 0,
        }
    }

    pub fn finish(self) {
        log::info!(
            "preprocessing marked {} ways as platforms across {} relations",
            self.state.platform_ways.len(),
            self.relations_matched
        );
    }
}

impl OsmEntityHandler for ZoningPreprocessHandler<'_> {
    fn handle_relation(&mut self, relation: &OsmRelationData) -> Result<(), OsmImportError> {
        let stop_area = pt::is_ptv2_stop_area(&relation.tags);
        let multipolygon_platform = relation.has_tag(pt::TYPE, pt::MULTIPOLYGON)
            && pt::is_ptv2_platform(&relation.tags);
        if !stop_area && !multipolygon_platform {
            return Ok(());
        }
        self.relations_matched += 1;
        for member in relation.members.iter() {
            if member.kind != OsmMemberKind::Way {
                continue;
            }
            if self.settings.zoning.is_way_excluded(member.member_ref) {
                continue;
            }
            if member.role == pt::ROLE_PLATFORM || (multipolygon_platform && member.role == pt::ROLE_OUTER)
            {
                self.state.platform_ways.insert(member.member_ref);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::osm::entity::{OsmRelationMember, OsmTags};
    use crate::osm::ids::OsmRelationId;

    fn relation(tags: &[(&str, &str)], members: &[(OsmMemberKind, i64, &str)]) -> OsmRelationData {
        OsmRelationData {
            osmid: OsmRelationId(1),
            members: members
                .iter()
                .map(|(kind, member_ref, role)| OsmRelationMember {
                    kind: *kind,
                    member_ref: *member_ref,
                    role: role.to_string(),
                })
                .collect(),
            tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<OsmTags>(),
        }
    }

    #[test]
    fn test_stop_area_platform_ways_marked() {
        let settings = Settings::default();
        let mut state = ZoningState::default();
        let mut handler = ZoningPreprocessHandler::new(&settings, &mut state);
        handler
            .handle_relation(&relation(
                &[("public_transport", "stop_area")],
                &[
                    (OsmMemberKind::Way, 10, "platform"),
                    (OsmMemberKind::Node, 11, "platform"),
                    (OsmMemberKind::Way, 12, "stop"),
                ],
            ))
            .unwrap();
        assert!(state.platform_ways.contains(&10));
        assert!(!state.platform_ways.contains(&11), "node members not ways");
        assert!(!state.platform_ways.contains(&12), "stop role not platform");
    }

    #[test]
    fn test_multipolygon_outer_ways_marked() {
        let settings = Settings::default();
        let mut state = ZoningState::default();
        let mut handler = ZoningPreprocessHandler::new(&settings, &mut state);
        handler
            .handle_relation(&relation(
                &[("type", "multipolygon"), ("public_transport", "platform")],
                &[(OsmMemberKind::Way, 20, "outer")],
            ))
            .unwrap();
        assert!(state.platform_ways.contains(&20));
    }

    #[test]
    fn test_excluded_ways_ignored() {
        let mut settings = Settings::default();
        settings.zoning.excluded_ways.push(10);
        let mut state = ZoningState::default();
        let mut handler = ZoningPreprocessHandler::new(&settings, &mut state);
        handler
            .handle_relation(&relation(
                &[("public_transport", "stop_area")],
                &[(OsmMemberKind::Way, 10, "platform")],
            ))
            .unwrap();
        assert!(state.platform_ways.is_empty());
    }
}
