use crate::config::{DrivingSide, Settings};
use crate::osm::entity::OsmWayData;
use crate::tags::{highway, modes, railway, waterway, ModeAccessDefaults, SpeedLimits};
use macronet_core::Mode;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};

/// all concrete OSM mode tokens whose presence as a tag key constitutes an
/// access overlay on a way.
const OVERLAY_TOKENS: [&str; 18] = [
    modes::road::MOTORCAR,
    modes::road::MOTORCYCLE,
    modes::road::BUS,
    modes::road::MINIBUS,
    modes::road::COACH,
    modes::road::SHARE_TAXI,
    modes::road::HGV,
    modes::road::HGV_ARTICULATED,
    modes::road::GOODS,
    modes::road::BICYCLE,
    modes::road::FOOT,
    modes::rail::TRAIN,
    modes::rail::TRAM,
    modes::rail::LIGHT_RAIL,
    modes::rail::SUBWAY,
    modes::water::FERRY,
    modes::rail::RAIL,
    modes::rail::NARROW_GAUGE,
];

/// directionality of a way relative to its node ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WayDirectionality {
    BothWays,
    OneWayForward,
    OneWayBackward,
}

/// the fully resolved access of a way: its classification, the mode set per
/// travel direction (relative to node order), the governing speed and the
/// lanes per direction.
#[derive(Debug, Clone)]
pub struct WayAccess {
    pub key: String,
    pub value: String,
    pub forward: BTreeSet<Mode>,
    pub backward: BTreeSet<Mode>,
    pub speed_kmh: f64,
    pub lanes_forward: u32,
    pub lanes_backward: u32,
}

impl WayAccess {
    pub fn all_modes(&self) -> BTreeSet<Mode> {
        self.forward.union(&self.backward).copied().collect()
    }
}

/// resolves way tags into mode access, directionality, speed and lanes.
/// warnings for recoverable tag problems are emitted once per unique cause.
pub struct ModeResolver {
    access_defaults: ModeAccessDefaults,
    speed_limits: SpeedLimits,
    driving_side: DrivingSide,
    maxspeed_pattern: Regex,
    warned: HashSet<String>,
}

impl ModeResolver {
    pub fn new(settings: &Settings) -> ModeResolver {
        ModeResolver {
            access_defaults: ModeAccessDefaults::for_country(&settings.country_code),
            speed_limits: SpeedLimits::for_country(&settings.country_code),
            driving_side: settings.resolved_driving_side(),
            maxspeed_pattern: Regex::new(r"^([0-9]+(?:\.[0-9]+)?)\s*(mph|knots)?$")
                .unwrap_or_else(|e| panic!("invalid builtin maxspeed pattern: {e}")),
            warned: HashSet::new(),
        }
    }

    /// the classification key=value of a way, if it describes infrastructure
    /// any of the sub-parsers covers.
    pub fn classify_way(way: &OsmWayData) -> Option<(&'static str, String)> {
        if let Some(value) = way.tag(highway::KEY) {
            if highway::is_road_based_highway(value) {
                return Some((highway::KEY, value.to_string()));
            }
        }
        if let Some(value) = way.tag(railway::KEY) {
            if railway::is_rail_based_railway(value) {
                return Some((railway::KEY, value.to_string()));
            }
        }
        if let Some(value) = way.tag(waterway::ROUTE_KEY) {
            if waterway::is_water_based_way(waterway::ROUTE_KEY, value) {
                return Some((waterway::ROUTE_KEY, value.to_string()));
            }
        }
        if let Some(value) = way.tag(waterway::FERRY_KEY) {
            if waterway::is_water_based_way(waterway::FERRY_KEY, value) {
                return Some((waterway::FERRY_KEY, value.to_string()));
            }
        }
        None
    }

    fn warn_once(&mut self, cause: String) {
        if self.warned.insert(cause.clone()) {
            log::warn!("{cause}");
        }
    }

    /// resolves the way's allowed modes per direction. returns None when no
    /// activated mode survives, in which case the way produces no links.
    pub fn resolve(
        &mut self,
        way: &OsmWayData,
        key: &str,
        value: &str,
        settings: &Settings,
    ) -> Option<WayAccess> {
        let tokens = self.resolve_tokens(way, key, value, settings)?;

        // disallow beats allow beats category membership; categories were
        // already expanded in resolve_tokens, so mapping is all that remains
        let mut base_modes: BTreeSet<Mode> = tokens
            .iter()
            .filter_map(|t| settings.network.mode_of_token(t))
            .collect();
        base_modes.retain(|m| mode_fits_family(key, value, *m));
        if base_modes.is_empty() {
            return None;
        }

        let directionality = self.resolve_directionality(way);
        let (mut forward, mut backward) = match directionality {
            WayDirectionality::BothWays => (base_modes.clone(), base_modes.clone()),
            WayDirectionality::OneWayForward => (base_modes.clone(), BTreeSet::new()),
            WayDirectionality::OneWayBackward => (BTreeSet::new(), base_modes.clone()),
        };

        // per-mode oneway exceptions re-open the closed direction
        if directionality != WayDirectionality::BothWays {
            let closed: &mut BTreeSet<Mode> = match directionality {
                WayDirectionality::OneWayForward => &mut backward,
                _ => &mut forward,
            };
            for token in OVERLAY_TOKENS {
                if way.tag(&format!("oneway:{token}")) == Some("no") {
                    if let Some(mode) = settings.network.mode_of_token(token) {
                        if base_modes.contains(&mode) {
                            closed.insert(mode);
                        }
                    }
                }
            }
            // contraflow bus lanes
            if matches!(
                way.tag("busway"),
                Some("opposite_lane") | Some("opposite_track")
            ) {
                closed.insert(Mode::Bus);
            }
        }

        let speed_kmh = self.resolve_speed(way, key, value, settings);
        let (lanes_forward, lanes_backward) =
            self.resolve_lanes(way, key, value, settings, directionality);

        Some(WayAccess {
            key: key.to_string(),
            value: value.to_string(),
            forward,
            backward,
            speed_kmh,
            lanes_forward,
            lanes_backward,
        })
    }

    /// the surviving OSM mode tokens of a way after defaults, settings edits
    /// and the way's own access overlays.
    fn resolve_tokens(
        &mut self,
        way: &OsmWayData,
        key: &str,
        value: &str,
        settings: &Settings,
    ) -> Option<BTreeSet<String>> {
        let Some(defaults) = self.access_defaults.allowed_tokens(key, value) else {
            self.warn_once(format!(
                "no default mode access known for way type '{key}={value}', way {} dropped",
                way.osmid
            ));
            return None;
        };
        let mut tokens = settings
            .network
            .apply_mode_access_overrides(key, value, defaults);

        // a blanket access denial empties the way before re-allowances apply
        if let Some(access) = way.tag(modes::ACCESS) {
            if modes::is_access_negative(access) {
                tokens.clear();
            }
        }

        // category overlays first, then concrete tokens override them
        let mut allow: BTreeSet<String> = BTreeSet::new();
        let mut disallow: BTreeSet<String> = BTreeSet::new();
        for category in [modes::VEHICLE, modes::MOTOR_VEHICLE, modes::PSV] {
            if let Some(v) = way.tag(category) {
                for member in modes::expand(category) {
                    if modes::is_access_positive(v) {
                        allow.insert(member.to_string());
                    } else if modes::is_access_negative(v) {
                        disallow.insert(member.to_string());
                    }
                }
            }
        }
        tokens.extend(allow);
        for token in disallow {
            tokens.remove(&token);
        }

        let mut specific_allow: BTreeSet<String> = BTreeSet::new();
        let mut specific_disallow: BTreeSet<String> = BTreeSet::new();
        for token in OVERLAY_TOKENS {
            if let Some(v) = way.tag(token) {
                if modes::is_access_positive(v) {
                    specific_allow.insert(token.to_string());
                } else if modes::is_access_negative(v) {
                    specific_disallow.insert(token.to_string());
                } else {
                    self.warn_once(format!("unknown access value '{token}={v}' ignored"));
                }
            }
        }
        // dedicated lane schemes imply bus access
        if way.tags.contains_key("busway")
            || way.tags.contains_key("lanes:bus")
            || way.tags.contains_key("lanes:psv")
            || way.tags.contains_key("bus:lanes")
            || way.tags.contains_key("psv:lanes")
        {
            specific_allow.insert(modes::road::BUS.to_string());
        }
        tokens.extend(specific_allow);
        for token in specific_disallow {
            tokens.remove(&token);
        }

        if tokens.is_empty() {
            None
        } else {
            Some(tokens)
        }
    }

    /// oneway resolution. an explicit `oneway` tag always wins; roundabouts
    /// without one are implicitly one-way in the drive-side direction:
    /// forward node order under right-hand driving, reversed under left-hand
    /// driving.
    fn resolve_directionality(&mut self, way: &OsmWayData) -> WayDirectionality {
        if let Some(oneway) = way.tag("oneway") {
            match oneway.trim() {
                "yes" | "true" | "1" | "F" => WayDirectionality::OneWayForward,
                "-1" | "reverse" | "T" => WayDirectionality::OneWayBackward,
                "no" | "false" | "0" => WayDirectionality::BothWays,
                other => {
                    self.warn_once(format!(
                        "unknown 'oneway={other}' value, treating way as bidirectional"
                    ));
                    WayDirectionality::BothWays
                }
            }
        } else if way.has_tag("junction", "roundabout") {
            match self.driving_side {
                DrivingSide::Right => WayDirectionality::OneWayForward,
                DrivingSide::Left => WayDirectionality::OneWayBackward,
            }
        } else {
            WayDirectionality::BothWays
        }
    }

    /// the governing speed of the way: a usable `maxspeed` tag, else the
    /// country/global default for the way type.
    fn resolve_speed(
        &mut self,
        way: &OsmWayData,
        key: &str,
        value: &str,
        settings: &Settings,
    ) -> f64 {
        let default = self
            .speed_limits
            .speed_kmh(key, value, settings.network.assume_urban);
        let Some(maxspeed) = way.tag("maxspeed") else {
            return default;
        };
        match maxspeed.trim() {
            // no numeric limit: defer to the per-mode physical maxima
            "none" => return 150.0,
            "walk" => return 7.0,
            _ => {}
        }
        match self.maxspeed_pattern.captures(maxspeed.trim()) {
            Some(captures) => {
                let numeric = captures
                    .get(1)
                    .and_then(|m| m.as_str().parse::<f64>().ok());
                match numeric {
                    Some(speed) => match captures.get(2).map(|m| m.as_str()) {
                        Some("mph") => speed * 1.609_344,
                        Some("knots") => speed * 1.852,
                        _ => speed,
                    },
                    None => default,
                }
            }
            None => {
                self.warn_once(format!(
                    "unparsable 'maxspeed={maxspeed}' value, falling back to defaults"
                ));
                default
            }
        }
    }

    /// lanes per direction from the `lanes` scheme. when the generic tags
    /// are absent or malformed the dedicated lane schemes (`lanes:<mode>`,
    /// `<mode>:lanes`) still count, and only then the way type default.
    fn resolve_lanes(
        &mut self,
        way: &OsmWayData,
        key: &str,
        value: &str,
        settings: &Settings,
        directionality: WayDirectionality,
    ) -> (u32, u32) {
        let default = settings.network.default_lanes_for(key, value);
        let total = match way.tag("lanes") {
            None => None,
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(v) if v > 0 => Some(v),
                _ => {
                    self.warn_once(format!(
                        "invalid 'lanes={raw}' value, falling back to defaults"
                    ));
                    None
                }
            },
        };
        let explicit_forward = way.tag("lanes:forward").and_then(|v| v.trim().parse().ok());
        let explicit_backward = way
            .tag("lanes:backward")
            .and_then(|v| v.trim().parse().ok());
        let dedicated = self.dedicated_lane_count(way);

        match directionality {
            WayDirectionality::OneWayForward => (
                explicit_forward.or(total).or(dedicated).unwrap_or(default),
                0,
            ),
            WayDirectionality::OneWayBackward => (
                0,
                explicit_backward.or(total).or(dedicated).unwrap_or(default),
            ),
            WayDirectionality::BothWays => {
                // totals span both directions, dedicated counts included
                let halved = total.or(dedicated).map(|t| (t / 2).max(1));
                (
                    explicit_forward.or(halved).unwrap_or(default),
                    explicit_backward.or(halved).unwrap_or(default),
                )
            }
        }
    }

    /// lane counts carried by the dedicated lane tagging schemes:
    /// `lanes:<mode>` is a numeric count, `<mode>:lanes` enumerates access
    /// per lane so its entry count is a lane count. malformed values warn
    /// and fall through.
    fn dedicated_lane_count(&mut self, way: &OsmWayData) -> Option<u32> {
        for key in ["lanes:bus", "lanes:psv"] {
            let Some(raw) = way.tag(key) else {
                continue;
            };
            match raw.trim().parse::<u32>() {
                Ok(v) if v > 0 => return Some(v),
                _ => {
                    self.warn_once(format!("invalid '{key}={raw}' value ignored"));
                }
            }
        }
        for key in ["bus:lanes", "psv:lanes"] {
            let Some(raw) = way.tag(key) else {
                continue;
            };
            if raw.trim().is_empty() {
                continue;
            }
            return Some(raw.split('|').count() as u32);
        }
        None
    }
}

/// whether a mode may physically use infrastructure of the given family,
/// e.g. a tram granted access to a road by settings is legitimate, a car on
/// rail tracks is not.
fn mode_fits_family(key: &str, value: &str, mode: Mode) -> bool {
    if key == railway::KEY {
        mode.is_rail_based()
    } else if waterway::is_water_based_way(key, value) {
        mode.is_water_based()
    } else {
        // road infrastructure hosts road vehicles plus embedded tram/light
        // rail tracks
        mode.is_road_based() || matches!(mode, Mode::Tram | Mode::LightRail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::osm::entity::{OsmTags, OsmWayData};
    use crate::osm::ids::{OsmNodeId, OsmWayId};

    fn way(pairs: &[(&str, &str)]) -> OsmWayData {
        let tags: OsmTags = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        OsmWayData::new(
            OsmWayId(1),
            vec![OsmNodeId(1), OsmNodeId(2), OsmNodeId(3)],
            tags,
        )
    }

    fn resolve_for(country: &str, pairs: &[(&str, &str)]) -> Option<WayAccess> {
        let settings = Settings::for_country(country);
        let mut resolver = ModeResolver::new(&settings);
        let w = way(pairs);
        let (key, value) = ModeResolver::classify_way(&w)?;
        resolver.resolve(&w, key, &value, &settings)
    }

    fn resolve(pairs: &[(&str, &str)]) -> Option<WayAccess> {
        resolve_for("", pairs)
    }

    #[test]
    fn test_classification() {
        assert_eq!(
            ModeResolver::classify_way(&way(&[("highway", "primary")])),
            Some(("highway", String::from("primary")))
        );
        assert_eq!(
            ModeResolver::classify_way(&way(&[("railway", "rail")])),
            Some(("railway", String::from("rail")))
        );
        assert_eq!(
            ModeResolver::classify_way(&way(&[("route", "ferry")])),
            Some(("route", String::from("ferry")))
        );
        assert!(ModeResolver::classify_way(&way(&[("railway", "platform")])).is_none());
        assert!(ModeResolver::classify_way(&way(&[("building", "yes")])).is_none());
    }

    #[test]
    fn test_bidirectional_defaults() {
        let access = resolve(&[("highway", "residential")]).unwrap();
        assert_eq!(access.forward, access.backward);
        assert!(access.forward.contains(&Mode::Car));
        assert!(access.forward.contains(&Mode::Foot));
        assert_eq!(access.lanes_forward, 1);
    }

    #[test]
    fn test_oneway_reverse() {
        let access = resolve(&[("highway", "primary"), ("oneway", "-1")]).unwrap();
        assert!(access.forward.is_empty());
        assert!(!access.backward.is_empty());
    }

    #[test]
    fn test_roundabout_is_oneway_but_explicit_reverse_wins() {
        let roundabout = resolve(&[("highway", "primary"), ("junction", "roundabout")]).unwrap();
        assert!(!roundabout.forward.is_empty());
        assert!(roundabout.backward.is_empty());
        let reversed = resolve(&[
            ("highway", "primary"),
            ("junction", "roundabout"),
            ("oneway", "-1"),
        ])
        .unwrap();
        assert!(reversed.forward.is_empty());
        assert!(!reversed.backward.is_empty());
    }

    /// oneway/-1/roundabout crossed with the driving side. "DE" drives on the
    /// right, "AU" on the left; only the implicit roundabout case may differ
    /// between the two.
    #[test]
    fn test_directionality_matrix_across_driving_sides() {
        let cases: [(&[(&str, &str)], (bool, bool), (bool, bool)); 6] = [
            // tags beyond highway=primary, (fwd, bwd) right-hand, (fwd, bwd) left-hand
            (&[], (true, true), (true, true)),
            (&[("oneway", "yes")], (true, false), (true, false)),
            (&[("oneway", "-1")], (false, true), (false, true)),
            (&[("oneway", "no"), ("junction", "roundabout")], (true, true), (true, true)),
            // the implicit roundabout direction follows the driving side
            (&[("junction", "roundabout")], (true, false), (false, true)),
            // an explicit oneway always beats the roundabout implication
            (
                &[("junction", "roundabout"), ("oneway", "yes")],
                (true, false),
                (true, false),
            ),
        ];
        for (extra, right_hand, left_hand) in cases {
            for (country, expected) in [("DE", right_hand), ("AU", left_hand)] {
                let mut pairs = vec![("highway", "primary")];
                pairs.extend_from_slice(extra);
                let access = resolve_for(country, &pairs).unwrap();
                assert_eq!(
                    (!access.forward.is_empty(), !access.backward.is_empty()),
                    expected,
                    "tags {extra:?} in {country}"
                );
            }
        }
    }

    #[test]
    fn test_access_no_with_psv_exception() {
        let access = resolve(&[
            ("highway", "residential"),
            ("access", "no"),
            ("psv", "yes"),
        ])
        .unwrap();
        assert_eq!(access.forward, BTreeSet::from([Mode::Bus]));
    }

    #[test]
    fn test_foot_disallowed_overrides_default() {
        let access = resolve(&[("highway", "residential"), ("foot", "no")]).unwrap();
        assert!(!access.forward.contains(&Mode::Foot));
        assert!(access.forward.contains(&Mode::Car));
    }

    #[test]
    fn test_busway_exclusive_by_default() {
        let access = resolve(&[("highway", "busway")]).unwrap();
        assert_eq!(access.all_modes(), BTreeSet::from([Mode::Bus]));
        let shared = resolve(&[("highway", "busway"), ("motorcar", "yes")]).unwrap();
        assert!(shared.all_modes().contains(&Mode::Car));
    }

    #[test]
    fn test_contraflow_bus_lane() {
        let access = resolve(&[
            ("highway", "secondary"),
            ("oneway", "yes"),
            ("busway", "opposite_lane"),
        ])
        .unwrap();
        assert!(access.forward.contains(&Mode::Car));
        assert_eq!(access.backward, BTreeSet::from([Mode::Bus]));
    }

    #[test]
    fn test_oneway_bicycle_exception() {
        let access = resolve(&[
            ("highway", "residential"),
            ("oneway", "yes"),
            ("oneway:bicycle", "no"),
        ])
        .unwrap();
        assert_eq!(access.backward, BTreeSet::from([Mode::Bicycle]));
    }

    #[test]
    fn test_maxspeed_variants() {
        let plain = resolve(&[("highway", "primary"), ("maxspeed", "60")]).unwrap();
        assert_eq!(plain.speed_kmh, 60.0);
        let imperial = resolve(&[("highway", "primary"), ("maxspeed", "30 mph")]).unwrap();
        assert!((imperial.speed_kmh - 48.28).abs() < 0.01);
        let invalid = resolve(&[("highway", "primary"), ("maxspeed", "fast")]).unwrap();
        let default = resolve(&[("highway", "primary")]).unwrap();
        assert_eq!(invalid.speed_kmh, default.speed_kmh);
    }

    #[test]
    fn test_lanes_resolution() {
        let both = resolve(&[("highway", "primary"), ("lanes", "4")]).unwrap();
        assert_eq!((both.lanes_forward, both.lanes_backward), (2, 2));
        let explicit = resolve(&[
            ("highway", "primary"),
            ("lanes", "3"),
            ("lanes:forward", "2"),
            ("lanes:backward", "1"),
        ])
        .unwrap();
        assert_eq!((explicit.lanes_forward, explicit.lanes_backward), (2, 1));
        let oneway = resolve(&[("highway", "primary"), ("oneway", "yes"), ("lanes", "3")]).unwrap();
        assert_eq!((oneway.lanes_forward, oneway.lanes_backward), (3, 0));
        let invalid = resolve(&[("highway", "primary"), ("lanes", "two")]).unwrap();
        assert_eq!(invalid.lanes_forward, 1);
    }

    /// dedicated lane schemes count toward the totals when the generic
    /// `lanes` tags are absent or unusable.
    #[test]
    fn test_dedicated_lane_schemes_count() {
        let numeric = resolve(&[
            ("highway", "busway"),
            ("oneway", "yes"),
            ("lanes:bus", "2"),
        ])
        .unwrap();
        assert_eq!((numeric.lanes_forward, numeric.lanes_backward), (2, 0));

        // one entry per lane in the <mode>:lanes scheme
        let per_lane = resolve(&[
            ("highway", "secondary"),
            ("oneway", "yes"),
            ("bus:lanes", "designated|yes|yes"),
        ])
        .unwrap();
        assert_eq!(per_lane.lanes_forward, 3);

        // bidirectional counts span both directions
        let both = resolve(&[("highway", "secondary"), ("lanes:psv", "2")]).unwrap();
        assert_eq!((both.lanes_forward, both.lanes_backward), (1, 1));

        // an explicit generic count still wins
        let generic_wins = resolve(&[
            ("highway", "secondary"),
            ("oneway", "yes"),
            ("lanes", "4"),
            ("lanes:bus", "1"),
        ])
        .unwrap();
        assert_eq!(generic_wins.lanes_forward, 4);

        // malformed dedicated counts fall back to the type default
        let invalid = resolve(&[
            ("highway", "secondary"),
            ("oneway", "yes"),
            ("lanes:bus", "two"),
        ])
        .unwrap();
        assert_eq!(invalid.lanes_forward, 1);
    }

    #[test]
    fn test_rail_way_resolution() {
        let settings = Settings {
            network: crate::config::NetworkSettings {
                railways_active: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut resolver = ModeResolver::new(&settings);
        let w = way(&[("railway", "tram")]);
        let (key, value) = ModeResolver::classify_way(&w).unwrap();
        let access = resolver.resolve(&w, key, &value, &settings).unwrap();
        assert_eq!(access.all_modes(), BTreeSet::from([Mode::Tram]));
    }

    #[test]
    fn test_unmapped_type_yields_none() {
        // a settings edit removing every token of the type drops the way
        let mut settings = Settings::default();
        settings
            .network
            .mode_access_overrides
            .push(crate::config::ModeAccessOverride {
                key: String::from("highway"),
                value: String::from("cycleway"),
                set: Some(vec![]),
                ..Default::default()
            });
        let mut resolver = ModeResolver::new(&settings);
        let w = way(&[("highway", "cycleway")]);
        let (key, value) = ModeResolver::classify_way(&w).unwrap();
        assert!(resolver.resolve(&w, key, &value, &settings).is_none());
    }
}
