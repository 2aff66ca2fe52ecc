use super::{highway, railway, waterway};
use std::collections::HashMap;

/// fallback speeds when neither a country table nor the global per-type
/// table knows the way type, in km/h.
pub const GLOBAL_HIGHWAY_FALLBACK_KMH: f64 = 50.0;
pub const GLOBAL_RAILWAY_FALLBACK_KMH: f64 = 70.0;
pub const GLOBAL_WATERWAY_FALLBACK_KMH: f64 = 20.0;

/// global highway speed defaults as (way type, urban km/h, non-urban km/h).
const GLOBAL_HIGHWAY: [(&str, f64, f64); 22] = [
    (highway::MOTORWAY, 100.0, 120.0),
    (highway::MOTORWAY_LINK, 80.0, 100.0),
    (highway::TRUNK, 80.0, 100.0),
    (highway::TRUNK_LINK, 60.0, 80.0),
    (highway::PRIMARY, 60.0, 100.0),
    (highway::PRIMARY_LINK, 50.0, 80.0),
    (highway::SECONDARY, 50.0, 80.0),
    (highway::SECONDARY_LINK, 50.0, 60.0),
    (highway::TERTIARY, 50.0, 80.0),
    (highway::TERTIARY_LINK, 50.0, 60.0),
    (highway::UNCLASSIFIED, 50.0, 80.0),
    (highway::RESIDENTIAL, 40.0, 80.0),
    (highway::LIVING_STREET, 20.0, 20.0),
    (highway::SERVICE, 30.0, 30.0),
    (highway::BUSWAY, 50.0, 80.0),
    (highway::ROAD, 50.0, 80.0),
    (highway::TRACK, 30.0, 60.0),
    (highway::PEDESTRIAN, 10.0, 10.0),
    (highway::FOOTWAY, 5.0, 5.0),
    (highway::PATH, 5.0, 5.0),
    (highway::STEPS, 5.0, 5.0),
    (highway::CYCLEWAY, 20.0, 20.0),
];

/// speed limit defaults resolved for one country: lookups fall through
/// country table, global table, global constant, in that order.
#[derive(Debug, Clone, Default)]
pub struct SpeedLimits {
    country: String,
    highway_by_country: HashMap<String, (f64, f64)>,
    railway_by_country: HashMap<String, f64>,
}

impl SpeedLimits {
    /// loads the embedded country tables for an ISO-2 code. an unknown code
    /// falls back to the global tables with a warning; the empty string
    /// requests the global tables outright.
    pub fn for_country(iso2: &str) -> SpeedLimits {
        let mut result = SpeedLimits {
            country: iso2.to_string(),
            ..Default::default()
        };
        if iso2.is_empty() {
            return result;
        }
        match (embedded_highway_csv(iso2), embedded_railway_csv(iso2)) {
            (Some(highway_csv), Some(railway_csv)) => {
                result.highway_by_country = parse_highway_csv(iso2, highway_csv);
                result.railway_by_country = parse_railway_csv(iso2, railway_csv);
            }
            _ => {
                log::warn!(
                    "no speed limit defaults available for country '{iso2}', using global defaults"
                );
            }
        }
        result
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn highway_kmh(&self, value: &str, urban: bool) -> f64 {
        let from_country = self.highway_by_country.get(value).copied();
        let from_global = GLOBAL_HIGHWAY
            .iter()
            .find(|(v, _, _)| *v == value)
            .map(|(_, u, n)| (*u, *n));
        match from_country.or(from_global) {
            Some((u, n)) => {
                if urban {
                    u
                } else {
                    n
                }
            }
            None => GLOBAL_HIGHWAY_FALLBACK_KMH,
        }
    }

    pub fn railway_kmh(&self, value: &str) -> f64 {
        self.railway_by_country
            .get(value)
            .copied()
            .unwrap_or(GLOBAL_RAILWAY_FALLBACK_KMH)
    }

    pub fn waterway_kmh(&self) -> f64 {
        GLOBAL_WATERWAY_FALLBACK_KMH
    }

    /// dispatches on the way's classification key.
    pub fn speed_kmh(&self, key: &str, value: &str, urban: bool) -> f64 {
        if key == highway::KEY {
            self.highway_kmh(value, urban)
        } else if key == railway::KEY {
            self.railway_kmh(value)
        } else if waterway::is_water_based_way(key, value) {
            self.waterway_kmh()
        } else {
            GLOBAL_HIGHWAY_FALLBACK_KMH
        }
    }
}

fn embedded_highway_csv(iso2: &str) -> Option<&'static str> {
    match iso2 {
        "AU" => Some(include_str!("../../resources/speed_limit/highway/AU.csv")),
        "DE" => Some(include_str!("../../resources/speed_limit/highway/DE.csv")),
        _ => None,
    }
}

fn embedded_railway_csv(iso2: &str) -> Option<&'static str> {
    match iso2 {
        "AU" => Some(include_str!("../../resources/speed_limit/railway/AU.csv")),
        "DE" => Some(include_str!("../../resources/speed_limit/railway/DE.csv")),
        _ => None,
    }
}

/// parses a three column (way type, urban, non-urban) table. invalid rows
/// are discarded individually; the file as a whole is never fatal.
fn parse_highway_csv(iso2: &str, content: &str) -> HashMap<String, (f64, f64)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());
    let mut result = HashMap::new();
    for record in reader.records() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                log::warn!("skipping unreadable highway speed row for '{iso2}': {e}");
                continue;
            }
        };
        let parsed = (
            record.get(0),
            record.get(1).and_then(|v| v.trim().parse::<f64>().ok()),
            record.get(2).and_then(|v| v.trim().parse::<f64>().ok()),
        );
        match parsed {
            (Some(way_type), Some(urban), Some(non_urban)) => {
                result.insert(way_type.trim().to_string(), (urban, non_urban));
            }
            _ => {
                log::warn!(
                    "skipping invalid highway speed row for '{iso2}': {:?}",
                    record
                );
            }
        }
    }
    result
}

/// parses a two column (way type, km/h) table with the same row-level error
/// policy as the highway variant.
fn parse_railway_csv(iso2: &str, content: &str) -> HashMap<String, f64> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());
    let mut result = HashMap::new();
    for record in reader.records() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                log::warn!("skipping unreadable railway speed row for '{iso2}': {e}");
                continue;
            }
        };
        match (
            record.get(0),
            record.get(1).and_then(|v| v.trim().parse::<f64>().ok()),
        ) {
            (Some(way_type), Some(kmh)) => {
                result.insert(way_type.trim().to_string(), kmh);
            }
            _ => {
                log::warn!(
                    "skipping invalid railway speed row for '{iso2}': {:?}",
                    record
                );
            }
        }
    }
    result
}
