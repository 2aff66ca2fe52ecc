use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// the predefined transport modes this network model recognises. each mode is
/// assigned to exactly one infrastructure layer; the assignment lives on
/// [`crate::network::MacroNetwork`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Car,
    Motorcycle,
    Bus,
    HeavyGoods,
    HeavyGoodsArticulated,
    Bicycle,
    Foot,
    Train,
    Tram,
    LightRail,
    Subway,
    Ferry,
}

impl Mode {
    pub const ALL: [Mode; 12] = [
        Mode::Car,
        Mode::Motorcycle,
        Mode::Bus,
        Mode::HeavyGoods,
        Mode::HeavyGoodsArticulated,
        Mode::Bicycle,
        Mode::Foot,
        Mode::Train,
        Mode::Tram,
        Mode::LightRail,
        Mode::Subway,
        Mode::Ferry,
    ];

    /// the maximum physically attainable speed for the mode in km/h. used to
    /// cap per-mode speeds on link segment types regardless of posted limits.
    pub fn maximum_speed_kmh(&self) -> f64 {
        match self {
            Mode::Car => 130.0,
            Mode::Motorcycle => 130.0,
            Mode::Bus => 100.0,
            Mode::HeavyGoods => 90.0,
            Mode::HeavyGoodsArticulated => 90.0,
            Mode::Bicycle => 25.0,
            Mode::Foot => 5.0,
            Mode::Train => 140.0,
            Mode::Tram => 80.0,
            Mode::LightRail => 100.0,
            Mode::Subway => 80.0,
            Mode::Ferry => 45.0,
        }
    }

    /// whether vehicles of this mode can board passengers on either side.
    /// road-based vehicles have doors on a single (driving) side.
    pub fn is_rail_based(&self) -> bool {
        matches!(
            self,
            Mode::Train | Mode::Tram | Mode::LightRail | Mode::Subway
        )
    }

    pub fn is_road_based(&self) -> bool {
        matches!(
            self,
            Mode::Car
                | Mode::Motorcycle
                | Mode::Bus
                | Mode::HeavyGoods
                | Mode::HeavyGoodsArticulated
                | Mode::Bicycle
                | Mode::Foot
        )
    }

    pub fn is_water_based(&self) -> bool {
        matches!(self, Mode::Ferry)
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Mode::Car => "car",
            Mode::Motorcycle => "motorcycle",
            Mode::Bus => "bus",
            Mode::HeavyGoods => "heavy_goods",
            Mode::HeavyGoodsArticulated => "heavy_goods_articulated",
            Mode::Bicycle => "bicycle",
            Mode::Foot => "foot",
            Mode::Train => "train",
            Mode::Tram => "tram",
            Mode::LightRail => "light_rail",
            Mode::Subway => "subway",
            Mode::Ferry => "ferry",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::Mode;

    #[test]
    fn test_mode_families_are_disjoint() {
        for mode in Mode::ALL {
            let families = [
                mode.is_road_based(),
                mode.is_rail_based(),
                mode.is_water_based(),
            ];
            assert_eq!(
                families.iter().filter(|f| **f).count(),
                1,
                "mode {mode} must belong to exactly one family"
            );
        }
    }

    #[test]
    fn test_foot_is_slowest() {
        for mode in Mode::ALL {
            assert!(mode.maximum_speed_kmh() >= Mode::Foot.maximum_speed_kmh());
        }
    }
}
