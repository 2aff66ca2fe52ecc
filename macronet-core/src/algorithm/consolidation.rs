use crate::error::NetworkError;
use crate::ids::{LinkSegmentId, LinkSegmentTypeId};
use crate::network::layer::NetworkLayer;
use crate::network::link_segment_type::{FunctionalTypeKey, LinkSegmentType};
use itertools::Itertools;
use std::collections::BTreeMap;

/// the delimiter used when joining the identities of consolidated types.
const EXTERNAL_ID_DELIMITER: &str = ",";

/// consolidates functionally equal link segment types within a layer: types
/// with identical capacity, density and per-mode access properties collapse
/// onto the class member with the smallest id. the representative's external
/// id and name become the joined identities of the class. every link segment
/// pointing at a removed type is reassigned.
///
/// idempotent: after one pass every equivalence class is a singleton.
pub fn consolidate_segment_types(layer: &mut NetworkLayer) -> Result<usize, NetworkError> {
    let mut classes: BTreeMap<FunctionalTypeKey, Vec<LinkSegmentTypeId>> = BTreeMap::new();
    for st in layer.segment_type_iterator() {
        classes.entry(st.functional_key()).or_default().push(st.id);
    }

    let mut remap: BTreeMap<LinkSegmentTypeId, LinkSegmentTypeId> = BTreeMap::new();
    let mut retained: BTreeMap<LinkSegmentTypeId, LinkSegmentType> = BTreeMap::new();
    let mut removed = 0usize;
    for members in classes.values() {
        // members are pushed in ascending id order, the representative is the first
        let representative_id = members[0];
        let mut representative = layer.get_segment_type(representative_id)?.clone();
        if members.len() > 1 {
            let external_ids = members
                .iter()
                .map(|id| Ok(layer.get_segment_type(*id)?.external_id.clone()))
                .collect::<Result<Vec<_>, NetworkError>>()?
                .into_iter()
                .sorted()
                .dedup()
                .join(EXTERNAL_ID_DELIMITER);
            let names = members
                .iter()
                .map(|id| Ok(layer.get_segment_type(*id)?.name.clone()))
                .collect::<Result<Vec<_>, NetworkError>>()?
                .into_iter()
                .sorted()
                .dedup()
                .join(EXTERNAL_ID_DELIMITER);
            representative.external_id = external_ids;
            representative.name = names;
            removed += members.len() - 1;
        }
        for member in members.iter() {
            remap.insert(*member, representative_id);
        }
        retained.insert(representative_id, representative);
    }

    if removed == 0 {
        return Ok(0);
    }

    let reassignments: Vec<(LinkSegmentId, LinkSegmentTypeId)> = layer
        .segment_iterator()
        .filter_map(|segment| {
            let target = remap.get(&segment.type_id)?;
            if *target == segment.type_id {
                None
            } else {
                Some((segment.id, *target))
            }
        })
        .collect();
    layer.replace_segment_types(retained);
    for (segment, type_id) in reassignments {
        layer.set_segment_type(segment, type_id)?;
    }
    log::info!(
        "consolidated {} link segment types, {} remain",
        removed,
        layer.n_segment_types()
    );
    Ok(removed)
}
