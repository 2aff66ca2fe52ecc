use super::highway;

pub const ROUTE_KEY: &str = "route";
pub const FERRY_VALUE: &str = "ferry";
pub const FERRY_KEY: &str = "ferry";

/// whether the key=value pair describes a ferry way. two taggings occur in
/// the wild: `route=ferry`, and `ferry=<highway type>` marking a road that
/// continues over water.
pub fn is_water_based_way(key: &str, value: &str) -> bool {
    match key {
        ROUTE_KEY => value == FERRY_VALUE,
        FERRY_KEY => value == "yes" || highway::is_road_based_highway(value),
        _ => false,
    }
}

pub fn default_capacity_pcu_hour_lane(_value: &str) -> f64 {
    200.0
}

pub fn default_max_density_pcu_km_lane(_value: &str) -> f64 {
    10.0
}

pub fn default_lanes_per_direction(_value: &str) -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ferry_taggings() {
        assert!(is_water_based_way("route", "ferry"));
        assert!(is_water_based_way("ferry", "primary"));
        assert!(is_water_based_way("ferry", "yes"));
        assert!(!is_water_based_way("route", "bus"));
        assert!(!is_water_based_way("waterway", "river"));
    }
}
