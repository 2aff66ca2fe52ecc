use std::cmp::Ordering;
use std::collections::BTreeSet;

pub const KEY: &str = "highway";

pub const MOTORWAY: &str = "motorway";
pub const MOTORWAY_LINK: &str = "motorway_link";
pub const TRUNK: &str = "trunk";
pub const TRUNK_LINK: &str = "trunk_link";
pub const PRIMARY: &str = "primary";
pub const PRIMARY_LINK: &str = "primary_link";
pub const SECONDARY: &str = "secondary";
pub const SECONDARY_LINK: &str = "secondary_link";
pub const TERTIARY: &str = "tertiary";
pub const TERTIARY_LINK: &str = "tertiary_link";
pub const RESIDENTIAL: &str = "residential";
pub const LIVING_STREET: &str = "living_street";
pub const SERVICE: &str = "service";
pub const BUSWAY: &str = "busway";
pub const ROAD: &str = "road";
pub const TRACK: &str = "track";
pub const PEDESTRIAN: &str = "pedestrian";
pub const FOOTWAY: &str = "footway";
pub const PATH: &str = "path";
pub const CYCLEWAY: &str = "cycleway";
pub const BRIDLEWAY: &str = "bridleway";
pub const STEPS: &str = "steps";
pub const CORRIDOR: &str = "corridor";
pub const ELEVATOR: &str = "elevator";
pub const PLATFORM: &str = "platform";
pub const RACEWAY: &str = "raceway";
pub const ESCAPE: &str = "escape";
pub const UNCLASSIFIED: &str = "unclassified";

pub const BUS_STOP: &str = "bus_stop";

/// fixed importance ranking of highway types, most important first
/// (motorway=1 through unclassified=28). used to pick the most important
/// candidate when several links qualify as a stop's access road.
pub const IMPORTANCE_RANKING: [&str; 28] = [
    MOTORWAY,
    MOTORWAY_LINK,
    TRUNK,
    TRUNK_LINK,
    PRIMARY,
    PRIMARY_LINK,
    SECONDARY,
    SECONDARY_LINK,
    TERTIARY,
    TERTIARY_LINK,
    RESIDENTIAL,
    LIVING_STREET,
    SERVICE,
    BUSWAY,
    ROAD,
    TRACK,
    PEDESTRIAN,
    FOOTWAY,
    PATH,
    CYCLEWAY,
    BRIDLEWAY,
    STEPS,
    CORRIDOR,
    ELEVATOR,
    PLATFORM,
    RACEWAY,
    ESCAPE,
    UNCLASSIFIED,
];

/// 1-based importance of a highway value; unknown values rank last.
pub fn importance(value: &str) -> usize {
    IMPORTANCE_RANKING
        .iter()
        .position(|v| *v == value)
        .map(|p| p + 1)
        .unwrap_or(usize::MAX)
}

/// compares two highway values by importance; `Less` means `a` is the more
/// important of the two.
pub fn compare_importance(a: &str, b: &str) -> Ordering {
    importance(a).cmp(&importance(b))
}

/// whether the value describes road-based infrastructure a link can be
/// materialised from. platforms and stops are waiting areas, not ways.
pub fn is_road_based_highway(value: &str) -> bool {
    !matches!(value, PLATFORM | BUS_STOP) && IMPORTANCE_RANKING.contains(&value)
}

/// highway types considered for materialisation unless settings deactivate
/// them.
pub fn default_activated() -> BTreeSet<&'static str> {
    BTreeSet::from([
        MOTORWAY,
        MOTORWAY_LINK,
        TRUNK,
        TRUNK_LINK,
        PRIMARY,
        PRIMARY_LINK,
        SECONDARY,
        SECONDARY_LINK,
        TERTIARY,
        TERTIARY_LINK,
        RESIDENTIAL,
        LIVING_STREET,
        SERVICE,
        BUSWAY,
        ROAD,
        UNCLASSIFIED,
        PEDESTRIAN,
        FOOTWAY,
        PATH,
        CYCLEWAY,
        STEPS,
        TRACK,
    ])
}

/// highway types recognised but not materialised unless settings activate
/// them.
pub fn default_deactivated() -> BTreeSet<&'static str> {
    BTreeSet::from([BRIDLEWAY, CORRIDOR, ELEVATOR, RACEWAY, ESCAPE])
}

/// default capacity in pcu per lane per hour for a highway type.
pub fn default_capacity_pcu_hour_lane(value: &str) -> f64 {
    match value {
        MOTORWAY | MOTORWAY_LINK => 2000.0,
        TRUNK | TRUNK_LINK => 1800.0,
        PRIMARY | PRIMARY_LINK => 1600.0,
        SECONDARY | SECONDARY_LINK => 1400.0,
        TERTIARY | TERTIARY_LINK => 1200.0,
        RESIDENTIAL | UNCLASSIFIED | ROAD => 1000.0,
        BUSWAY => 1400.0,
        LIVING_STREET => 300.0,
        SERVICE | TRACK => 500.0,
        _ => 300.0,
    }
}

/// default maximum density in pcu per km per lane. a single jam density is
/// assumed for all road infrastructure.
pub fn default_max_density_pcu_km_lane(_value: &str) -> f64 {
    180.0
}

/// default number of lanes per direction when no usable `lanes` tag exists.
pub fn default_lanes_per_direction(value: &str) -> u32 {
    match value {
        MOTORWAY | TRUNK => 2,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_importance_bounds() {
        assert_eq!(importance(MOTORWAY), 1);
        assert_eq!(importance(UNCLASSIFIED), 28);
        assert_eq!(importance("no_such_type"), usize::MAX);
    }

    #[test]
    fn test_compare_importance() {
        assert_eq!(compare_importance(PRIMARY, SECONDARY), Ordering::Less);
        assert_eq!(compare_importance(FOOTWAY, TRUNK), Ordering::Greater);
        assert_eq!(compare_importance(SERVICE, SERVICE), Ordering::Equal);
    }

    #[test]
    fn test_activation_sets_are_disjoint() {
        let activated = default_activated();
        for value in default_deactivated() {
            assert!(!activated.contains(value));
        }
    }

    #[test]
    fn test_platform_is_not_road_based() {
        assert!(!is_road_based_highway(PLATFORM));
        assert!(!is_road_based_highway(BUS_STOP));
        assert!(is_road_based_highway(RESIDENTIAL));
    }
}
