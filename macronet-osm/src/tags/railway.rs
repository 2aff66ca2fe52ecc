use std::collections::BTreeSet;

pub const KEY: &str = "railway";

pub const RAIL: &str = "rail";
pub const LIGHT_RAIL: &str = "light_rail";
pub const SUBWAY: &str = "subway";
pub const TRAM: &str = "tram";
pub const MONORAIL: &str = "monorail";
pub const NARROW_GAUGE: &str = "narrow_gauge";
pub const FUNICULAR: &str = "funicular";

// waiting-area values of the railway key, handled by the pt parser
pub const PLATFORM: &str = "platform";
pub const STATION: &str = "station";
pub const HALT: &str = "halt";
pub const TRAM_STOP: &str = "tram_stop";
pub const STOP: &str = "stop";

const TRACK_VALUES: [&str; 7] = [
    RAIL,
    LIGHT_RAIL,
    SUBWAY,
    TRAM,
    MONORAIL,
    NARROW_GAUGE,
    FUNICULAR,
];

/// whether the value describes actual rail track infrastructure rather than
/// a waiting area or ancillary feature.
pub fn is_rail_based_railway(value: &str) -> bool {
    TRACK_VALUES.contains(&value)
}

pub fn default_activated() -> BTreeSet<&'static str> {
    BTreeSet::from([RAIL, LIGHT_RAIL, SUBWAY, TRAM, NARROW_GAUGE])
}

pub fn default_deactivated() -> BTreeSet<&'static str> {
    BTreeSet::from([MONORAIL, FUNICULAR])
}

/// default capacity in pcu per track per hour. rail capacity is not lane
/// bound the way road capacity is, a single large default suffices for
/// macroscopic purposes.
pub fn default_capacity_pcu_hour_lane(_value: &str) -> f64 {
    3600.0
}

pub fn default_max_density_pcu_km_lane(_value: &str) -> f64 {
    50.0
}

pub fn default_lanes_per_direction(_value: &str) -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_values() {
        assert!(is_rail_based_railway(RAIL));
        assert!(is_rail_based_railway(TRAM));
        assert!(!is_rail_based_railway(PLATFORM));
        assert!(!is_rail_based_railway(STATION));
    }
}
