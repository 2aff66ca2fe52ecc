use crate::ids::LinkSegmentTypeId;
use crate::mode::Mode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// per-mode access properties of a link segment type. speeds are stored
/// capped at the mode's physical maximum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccessProperties {
    pub max_speed_kmh: f64,
    pub critical_speed_kmh: f64,
}

impl AccessProperties {
    pub fn new(mode: Mode, max_speed_kmh: f64) -> AccessProperties {
        let capped = max_speed_kmh.min(mode.maximum_speed_kmh());
        AccessProperties {
            max_speed_kmh: capped,
            critical_speed_kmh: capped,
        }
    }
}

/// the access properties shared by many link segments: capacity, density and
/// the modes allowed on segments of this type. the external id records the
/// source `key=value` classification; consolidation may join several of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkSegmentType {
    pub id: LinkSegmentTypeId,
    pub name: String,
    pub external_id: String,
    pub capacity_pcu_hour_lane: f64,
    pub max_density_pcu_km_lane: f64,
    pub access: BTreeMap<Mode, AccessProperties>,
}

/// hashable key over the functional (access) properties of a type, used to
/// reuse existing types at registration time and to find equivalence classes
/// during consolidation. floats are compared bit-exact, which is sufficient
/// because equivalent types are derived from the same default tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionalTypeKey {
    capacity_bits: u64,
    density_bits: u64,
    access: Vec<(Mode, u64, u64)>,
}

impl LinkSegmentType {
    pub fn allows(&self, mode: Mode) -> bool {
        self.access.contains_key(&mode)
    }

    pub fn allowed_modes(&self) -> impl Iterator<Item = Mode> + '_ {
        self.access.keys().copied()
    }

    pub fn allows_any(&self, modes: &std::collections::BTreeSet<Mode>) -> bool {
        modes.iter().any(|m| self.allows(*m))
    }

    pub fn functional_key(&self) -> FunctionalTypeKey {
        FunctionalTypeKey {
            capacity_bits: self.capacity_pcu_hour_lane.to_bits(),
            density_bits: self.max_density_pcu_km_lane.to_bits(),
            access: self
                .access
                .iter()
                .map(|(mode, props)| {
                    (
                        *mode,
                        props.max_speed_kmh.to_bits(),
                        props.critical_speed_kmh.to_bits(),
                    )
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::LinkSegmentTypeId;

    fn build_type(id: u64, capacity: f64, speed: f64) -> LinkSegmentType {
        let mut access = BTreeMap::new();
        access.insert(Mode::Car, AccessProperties::new(Mode::Car, speed));
        LinkSegmentType {
            id: LinkSegmentTypeId(id),
            name: String::from("highway=primary"),
            external_id: String::from("highway=primary"),
            capacity_pcu_hour_lane: capacity,
            max_density_pcu_km_lane: 180.0,
            access,
        }
    }

    #[test]
    fn test_functional_key_ignores_identity() {
        let a = build_type(1, 1800.0, 60.0);
        let b = build_type(2, 1800.0, 60.0);
        assert_eq!(a.functional_key(), b.functional_key());
    }

    #[test]
    fn test_functional_key_differs_on_access() {
        let a = build_type(1, 1800.0, 60.0);
        let b = build_type(1, 1800.0, 80.0);
        assert_ne!(a.functional_key(), b.functional_key());
    }

    #[test]
    fn test_access_speed_capped_at_mode_maximum() {
        let props = AccessProperties::new(Mode::Foot, 50.0);
        assert_eq!(props.max_speed_kmh, Mode::Foot.maximum_speed_kmh());
    }
}
