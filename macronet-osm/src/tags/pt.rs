use super::{modes, railway};
use crate::osm::entity::OsmTags;
use macronet_core::Mode;
use std::collections::BTreeSet;

// Ptv2 scheme
pub const PUBLIC_TRANSPORT: &str = "public_transport";
pub const PLATFORM: &str = "platform";
pub const STATION: &str = "station";
pub const STOP_POSITION: &str = "stop_position";
pub const STOP_AREA: &str = "stop_area";

// Ptv1 scheme leftovers on the highway/railway/amenity keys
pub const HIGHWAY: &str = "highway";
pub const RAILWAY: &str = "railway";
pub const AMENITY: &str = "amenity";
pub const BUS_STOP: &str = "bus_stop";
pub const FERRY_TERMINAL: &str = "ferry_terminal";

// relation vocabulary
pub const TYPE: &str = "type";
pub const MULTIPOLYGON: &str = "multipolygon";
pub const ROLE_PLATFORM: &str = "platform";
pub const ROLE_OUTER: &str = "outer";
pub const ROLE_STOP: &str = "stop";

fn tag<'a>(tags: &'a OsmTags, key: &str) -> Option<&'a str> {
    tags.get(key).map(|v| v.as_str())
}

// --- Ptv2 predicates ---

pub fn is_ptv2_platform(tags: &OsmTags) -> bool {
    tag(tags, PUBLIC_TRANSPORT) == Some(PLATFORM)
}

pub fn is_ptv2_station(tags: &OsmTags) -> bool {
    tag(tags, PUBLIC_TRANSPORT) == Some(STATION)
}

pub fn is_ptv2_stop_position(tags: &OsmTags) -> bool {
    tag(tags, PUBLIC_TRANSPORT) == Some(STOP_POSITION)
}

pub fn is_ptv2_stop_area(tags: &OsmTags) -> bool {
    tag(tags, PUBLIC_TRANSPORT) == Some(STOP_AREA)
}

// --- Ptv1 predicates ---

pub fn is_ptv1_bus_stop(tags: &OsmTags) -> bool {
    tag(tags, HIGHWAY) == Some(BUS_STOP)
}

pub fn is_ptv1_highway_platform(tags: &OsmTags) -> bool {
    tag(tags, HIGHWAY) == Some(PLATFORM)
}

pub fn is_ptv1_railway_platform(tags: &OsmTags) -> bool {
    tag(tags, RAILWAY) == Some(railway::PLATFORM)
}

pub fn is_ptv1_halt(tags: &OsmTags) -> bool {
    tag(tags, RAILWAY) == Some(railway::HALT)
}

pub fn is_ptv1_tram_stop(tags: &OsmTags) -> bool {
    tag(tags, RAILWAY) == Some(railway::TRAM_STOP)
}

pub fn is_ptv1_station(tags: &OsmTags) -> bool {
    tag(tags, RAILWAY) == Some(railway::STATION)
}

pub fn is_ferry_terminal(tags: &OsmTags) -> bool {
    tag(tags, AMENITY) == Some(FERRY_TERMINAL)
}

/// whether the entity matches any recognised waiting-area pattern of either
/// tagging scheme (stations and stop positions included).
pub fn is_public_transport_entity(tags: &OsmTags) -> bool {
    tags.contains_key(PUBLIC_TRANSPORT)
        || is_ptv1_bus_stop(tags)
        || is_ptv1_highway_platform(tags)
        || is_ptv1_railway_platform(tags)
        || is_ptv1_halt(tags)
        || is_ptv1_tram_stop(tags)
        || is_ptv1_station(tags)
        || is_ferry_terminal(tags)
}

/// modes inferred from the entity's own tags: explicit mode tags under the
/// Ptv2 scheme (`bus=yes`, `train=yes`, ...) plus the implicit mode of the
/// Ptv1 value the entity is tagged with. an empty result defers the decision
/// to the postprocessing pass.
pub fn inferred_modes(tags: &OsmTags) -> BTreeSet<Mode> {
    let mut result = BTreeSet::new();
    let mode_tokens = [
        modes::road::BUS,
        modes::road::COACH,
        modes::rail::TRAIN,
        modes::rail::TRAM,
        modes::rail::LIGHT_RAIL,
        modes::rail::SUBWAY,
        modes::water::FERRY,
    ];
    for token in mode_tokens {
        if tag(tags, token) == Some("yes") {
            if let Some(mode) = modes::default_mode_of(token) {
                result.insert(mode);
            }
        }
    }
    if is_ptv1_bus_stop(tags) {
        result.insert(Mode::Bus);
    }
    if is_ptv1_tram_stop(tags) {
        result.insert(Mode::Tram);
    }
    if is_ptv1_halt(tags) || is_ptv1_station(tags) {
        result.insert(Mode::Train);
    }
    if is_ferry_terminal(tags) {
        result.insert(Mode::Ferry);
    }
    // `train=yes` style tags may coexist with a station value, the union is
    // intended
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> OsmTags {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_scheme_predicates() {
        assert!(is_ptv2_platform(&tags(&[("public_transport", "platform")])));
        assert!(is_ptv1_bus_stop(&tags(&[("highway", "bus_stop")])));
        assert!(is_ptv1_tram_stop(&tags(&[("railway", "tram_stop")])));
        assert!(!is_ptv2_platform(&tags(&[("railway", "platform")])));
        assert!(is_ptv1_railway_platform(&tags(&[("railway", "platform")])));
    }

    #[test]
    fn test_inferred_modes_from_ptv2_mode_tags() {
        let modes = inferred_modes(&tags(&[
            ("public_transport", "platform"),
            ("bus", "yes"),
            ("tram", "yes"),
        ]));
        assert_eq!(modes, BTreeSet::from([Mode::Bus, Mode::Tram]));
    }

    #[test]
    fn test_inferred_modes_from_ptv1_value() {
        assert_eq!(
            inferred_modes(&tags(&[("highway", "bus_stop")])),
            BTreeSet::from([Mode::Bus])
        );
        assert_eq!(
            inferred_modes(&tags(&[("railway", "halt")])),
            BTreeSet::from([Mode::Train])
        );
        assert!(inferred_modes(&tags(&[("public_transport", "platform")])).is_empty());
    }
}
