use super::{highway, modes, railway, waterway};
use std::collections::{BTreeSet, HashMap};

/// global mode access defaults per way type: which OSM mode tokens may use a
/// way of that type when its tags say nothing else.
fn global_allowed_tokens(key: &str, value: &str) -> Option<&'static [&'static str]> {
    use modes::{rail, road, water};
    if key == highway::KEY {
        let tokens: &'static [&'static str] = match value {
            highway::MOTORWAY | highway::MOTORWAY_LINK => &[
                road::MOTORCAR,
                road::MOTORCYCLE,
                road::BUS,
                road::COACH,
                road::HGV,
                road::HGV_ARTICULATED,
                road::GOODS,
            ],
            highway::TRUNK
            | highway::TRUNK_LINK
            | highway::PRIMARY
            | highway::PRIMARY_LINK
            | highway::SECONDARY
            | highway::SECONDARY_LINK
            | highway::TERTIARY
            | highway::TERTIARY_LINK
            | highway::UNCLASSIFIED
            | highway::RESIDENTIAL
            | highway::ROAD => &[
                road::MOTORCAR,
                road::MOTORCYCLE,
                road::BUS,
                road::MINIBUS,
                road::COACH,
                road::SHARE_TAXI,
                road::HGV,
                road::HGV_ARTICULATED,
                road::GOODS,
                road::BICYCLE,
                road::FOOT,
            ],
            highway::LIVING_STREET | highway::SERVICE => {
                &[road::MOTORCAR, road::MOTORCYCLE, road::BICYCLE, road::FOOT]
            }
            // busways are public transport infrastructure, other road modes
            // join only through explicit access tags
            highway::BUSWAY => &[road::BUS, road::MINIBUS, road::COACH],
            highway::PEDESTRIAN | highway::FOOTWAY | highway::STEPS | highway::CORRIDOR
            | highway::ELEVATOR => &[road::FOOT],
            highway::PATH | highway::TRACK => &[road::FOOT, road::BICYCLE],
            highway::CYCLEWAY => &[road::BICYCLE],
            highway::BRIDLEWAY => &[road::FOOT],
            highway::RACEWAY | highway::ESCAPE => &[road::MOTORCAR],
            _ => return None,
        };
        Some(tokens)
    } else if key == railway::KEY {
        let tokens: &'static [&'static str] = match value {
            railway::RAIL | railway::NARROW_GAUGE | railway::FUNICULAR | railway::MONORAIL => {
                &[rail::TRAIN]
            }
            railway::LIGHT_RAIL => &[rail::LIGHT_RAIL],
            railway::SUBWAY => &[rail::SUBWAY],
            railway::TRAM => &[rail::TRAM],
            _ => return None,
        };
        Some(tokens)
    } else if waterway::is_water_based_way(key, value) {
        Some(&[water::FERRY])
    } else {
        None
    }
}

/// mode access defaults resolved for one country: the global table overlaid
/// with per-country rows for the highway key. a country row replaces the
/// global allow list for its way type.
#[derive(Debug, Clone, Default)]
pub struct ModeAccessDefaults {
    country: String,
    highway_by_country: HashMap<String, BTreeSet<String>>,
}

impl ModeAccessDefaults {
    pub fn for_country(iso2: &str) -> ModeAccessDefaults {
        let mut result = ModeAccessDefaults {
            country: iso2.to_string(),
            ..Default::default()
        };
        if iso2.is_empty() {
            return result;
        }
        match embedded_mode_access_csv(iso2) {
            Some(content) => {
                result.highway_by_country = parse_mode_access_csv(iso2, content);
            }
            None => {
                log::warn!(
                    "no mode access defaults available for country '{iso2}', using global defaults"
                );
            }
        }
        result
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    /// the default allowed OSM mode tokens for a way of the given type, or
    /// None when the key=value combination is unknown (logged once by the
    /// caller).
    pub fn allowed_tokens(&self, key: &str, value: &str) -> Option<BTreeSet<String>> {
        if key == highway::KEY {
            if let Some(country_tokens) = self.highway_by_country.get(value) {
                return Some(country_tokens.clone());
            }
        }
        global_allowed_tokens(key, value)
            .map(|tokens| tokens.iter().map(|t| t.to_string()).collect())
    }
}

fn embedded_mode_access_csv(iso2: &str) -> Option<&'static str> {
    match iso2 {
        "AU" => Some(include_str!("../../resources/mode_access/AU.csv")),
        "DE" => Some(include_str!("../../resources/mode_access/DE.csv")),
        _ => None,
    }
}

/// parses rows of (way type, token, token, ...). the header row is skipped
/// and invalid rows are discarded individually.
fn parse_mode_access_csv(iso2: &str, content: &str) -> HashMap<String, BTreeSet<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());
    let mut result = HashMap::new();
    for record in reader.records() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                log::warn!("skipping unreadable mode access row for '{iso2}': {e}");
                continue;
            }
        };
        let Some(way_type) = record.get(0).map(|v| v.trim()).filter(|v| !v.is_empty()) else {
            log::warn!("skipping mode access row without way type for '{iso2}'");
            continue;
        };
        let tokens: BTreeSet<String> = record
            .iter()
            .skip(1)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if tokens.is_empty() {
            log::warn!("skipping mode access row without modes for '{way_type}' ('{iso2}')");
            continue;
        }
        result.insert(way_type.to_string(), tokens);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use macronet_core::Mode;

    #[test]
    fn test_global_defaults() {
        let defaults = ModeAccessDefaults::for_country("");
        let residential = defaults.allowed_tokens("highway", "residential").unwrap();
        assert!(residential.contains("motorcar"));
        assert!(residential.contains("foot"));
        let cycleway = defaults.allowed_tokens("highway", "cycleway").unwrap();
        assert_eq!(cycleway, BTreeSet::from([String::from("bicycle")]));
        assert!(defaults.allowed_tokens("highway", "nonsense").is_none());
    }

    #[test]
    fn test_busway_defaults_to_bus_only() {
        let defaults = ModeAccessDefaults::for_country("");
        let busway = defaults.allowed_tokens("highway", "busway").unwrap();
        assert!(busway
            .iter()
            .all(|t| super::modes::default_mode_of(t) == Some(Mode::Bus)));
    }

    #[test]
    fn test_country_row_replaces_global() {
        let au = ModeAccessDefaults::for_country("AU");
        // the AU table narrows service roads to motorcar/motorcycle/bicycle/foot
        let service = au.allowed_tokens("highway", "service").unwrap();
        assert_eq!(service.len(), 4);
        // untouched types keep the global defaults
        let motorway = au.allowed_tokens("highway", "motorway").unwrap();
        assert!(motorway.contains("bus"));
    }

    #[test]
    fn test_rail_and_water_defaults() {
        let defaults = ModeAccessDefaults::for_country("");
        assert_eq!(
            defaults.allowed_tokens("railway", "tram").unwrap(),
            BTreeSet::from([String::from("tram")])
        );
        assert_eq!(
            defaults.allowed_tokens("route", "ferry").unwrap(),
            BTreeSet::from([String::from("ferry")])
        );
    }

    #[test]
    fn test_invalid_rows_are_skipped() {
        let parsed = parse_mode_access_csv("XX", "way_type,modes\nfootway,foot\n,bus\nempty\n");
        assert_eq!(parsed.len(), 1);
        assert!(parsed.contains_key("footway"));
    }
}
