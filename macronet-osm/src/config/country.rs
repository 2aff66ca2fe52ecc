use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// which side of the road traffic drives on. determines the door side used
/// when anchoring waiting areas onto directional link segments, and the
/// implicit orientation of roundabouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrivingSide {
    Left,
    Right,
}

impl Display for DrivingSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DrivingSide::Left => write!(f, "left"),
            DrivingSide::Right => write!(f, "right"),
        }
    }
}

/// ISO-2 codes of countries and territories driving on the left.
const LEFT_DRIVING: [&str; 44] = [
    "AU", "BD", "BN", "BT", "BW", "CY", "FJ", "GB", "GY", "HK", "ID", "IE", "IN", "JM", "JP",
    "KE", "LK", "LS", "MO", "MT", "MU", "MW", "MY", "MZ", "NA", "NP", "NZ", "PG", "PK", "SB",
    "SG", "SR", "SZ", "TH", "TL", "TT", "TZ", "UG", "WS", "ZA", "ZM", "ZW", "MV", "BB",
];

impl DrivingSide {
    /// resolves the driving side for an ISO-2 country code. unknown or empty
    /// codes resolve to right-hand driving, the global majority.
    pub fn of_country(iso2: &str) -> DrivingSide {
        if LEFT_DRIVING.contains(&iso2) {
            DrivingSide::Left
        } else {
            DrivingSide::Right
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driving_side_lookup() {
        assert_eq!(DrivingSide::of_country("AU"), DrivingSide::Left);
        assert_eq!(DrivingSide::of_country("JP"), DrivingSide::Left);
        assert_eq!(DrivingSide::of_country("DE"), DrivingSide::Right);
        assert_eq!(DrivingSide::of_country(""), DrivingSide::Right);
        assert_eq!(DrivingSide::of_country("XX"), DrivingSide::Right);
    }
}
