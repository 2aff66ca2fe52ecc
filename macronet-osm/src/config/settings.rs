use super::country::DrivingSide;
use crate::error::OsmImportError;
use crate::osm::entity::OsmMemberKind;
use crate::tags::{highway, railway, waterway};
use macronet_core::Mode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// rectangular bounding filter in WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> BoundingBox {
        BoundingBox {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.min_x <= x && x <= self.max_x && self.min_y <= y && y <= self.max_y
    }

    /// approximate distance from an interior point to the nearest border of
    /// the box, in meters. used to suppress warnings for entities that are
    /// very likely truncation artefacts of the extract.
    pub fn distance_to_border_m(&self, x: f64, y: f64) -> f64 {
        let m_per_deg_lat = 111_320.0;
        let m_per_deg_lon = m_per_deg_lat * y.to_radians().cos();
        let dx = (x - self.min_x).min(self.max_x - x).abs() * m_per_deg_lon;
        let dy = (y - self.min_y).min(self.max_y - y).abs() * m_per_deg_lat;
        dx.min(dy)
    }
}

/// a way classification, e.g. highway=primary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WayType {
    pub key: String,
    pub value: String,
}

impl WayType {
    pub fn new(key: &str, value: &str) -> WayType {
        WayType {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapacityOverride {
    pub key: String,
    pub value: String,
    pub capacity_pcu_hour_lane: f64,
    pub max_density_pcu_km_lane: f64,
}

/// edits to the default allowed-mode list of a way type. `set` replaces the
/// list wholesale; `add`/`remove` adjust it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModeAccessOverride {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub set: Option<Vec<String>>,
    #[serde(default)]
    pub add: Vec<String>,
    #[serde(default)]
    pub remove: Vec<String>,
}

/// an extra OSM mode token to predefined mode pairing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OsmModeMapping {
    pub osm_mode: String,
    pub mode: Mode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    /// per sub-parser activation
    pub highways_active: bool,
    pub railways_active: bool,
    pub waterways_active: bool,
    /// way types activated on top of the built-in defaults
    pub activated_types: Vec<WayType>,
    /// way types deactivated on top of the built-in defaults
    pub deactivated_types: Vec<WayType>,
    pub capacity_overrides: Vec<CapacityOverride>,
    pub mode_access_overrides: Vec<ModeAccessOverride>,
    /// OSM mode tokens whose default mode pairing is switched off
    pub removed_osm_modes: Vec<String>,
    /// extra OSM mode token pairings
    pub added_osm_modes: Vec<OsmModeMapping>,
    /// attach the parsed OSM tag maps to produced links and nodes
    pub retain_osm_tags: bool,
    pub remove_dangling_subnetworks: bool,
    pub dangling_min_size: usize,
    pub dangling_keep_largest: bool,
    pub consolidate_link_segment_types: bool,
    /// treat unclassified speed environments as urban when picking defaults
    pub assume_urban: bool,
    /// memory optimisation: pre-scan ways and keep only referenced nodes
    pub plan_node_retention: bool,
    /// explicit mode-to-layer assignment; empty means a single layer with
    /// every activated mode
    pub layers: Vec<Vec<Mode>>,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        NetworkSettings {
            highways_active: true,
            railways_active: false,
            waterways_active: false,
            activated_types: vec![],
            deactivated_types: vec![],
            capacity_overrides: vec![],
            mode_access_overrides: vec![],
            removed_osm_modes: vec![],
            added_osm_modes: vec![],
            retain_osm_tags: false,
            remove_dangling_subnetworks: true,
            dangling_min_size: 20,
            dangling_keep_largest: false,
            consolidate_link_segment_types: false,
            assume_urban: true,
            plan_node_retention: false,
            layers: vec![],
        }
    }
}

impl NetworkSettings {
    pub fn activate_type(&mut self, key: &str, value: &str) {
        self.deactivated_types
            .retain(|t| !(t.key == key && t.value == value));
        self.activated_types.push(WayType::new(key, value));
    }

    pub fn deactivate_type(&mut self, key: &str, value: &str) {
        self.activated_types
            .retain(|t| !(t.key == key && t.value == value));
        self.deactivated_types.push(WayType::new(key, value));
    }

    pub fn overwrite_capacity(
        &mut self,
        key: &str,
        value: &str,
        capacity_pcu_hour_lane: f64,
        max_density_pcu_km_lane: f64,
    ) {
        self.capacity_overrides.push(CapacityOverride {
            key: key.to_string(),
            value: value.to_string(),
            capacity_pcu_hour_lane,
            max_density_pcu_km_lane,
        });
    }

    pub fn add_allowed_mode(&mut self, key: &str, value: &str, token: &str) {
        self.mode_access_overrides.push(ModeAccessOverride {
            key: key.to_string(),
            value: value.to_string(),
            add: vec![token.to_string()],
            ..Default::default()
        });
    }

    pub fn remove_allowed_mode(&mut self, key: &str, value: &str, token: &str) {
        self.mode_access_overrides.push(ModeAccessOverride {
            key: key.to_string(),
            value: value.to_string(),
            remove: vec![token.to_string()],
            ..Default::default()
        });
    }

    /// whether a way family parser is active for the given classification key.
    pub fn family_active(&self, key: &str) -> bool {
        if key == highway::KEY {
            self.highways_active
        } else if key == railway::KEY {
            self.railways_active
        } else {
            // water-based ways carry route=ferry / ferry=* classifications
            self.waterways_active
        }
    }

    /// whether ways of this type take part in network materialisation,
    /// resolving user edits on top of the built-in defaults.
    pub fn is_way_type_activated(&self, key: &str, value: &str) -> bool {
        if !self.family_active(key) {
            return false;
        }
        if self
            .deactivated_types
            .iter()
            .any(|t| t.key == key && t.value == value)
        {
            return false;
        }
        if self
            .activated_types
            .iter()
            .any(|t| t.key == key && t.value == value)
        {
            return true;
        }
        if key == highway::KEY {
            highway::default_activated().contains(value)
        } else if key == railway::KEY {
            railway::default_activated().contains(value)
        } else {
            waterway::is_water_based_way(key, value)
        }
    }

    /// capacity and maximum density for a way type, from the defaults unless
    /// overridden.
    pub fn capacity_for(&self, key: &str, value: &str) -> (f64, f64) {
        if let Some(o) = self
            .capacity_overrides
            .iter()
            .rev()
            .find(|o| o.key == key && o.value == value)
        {
            return (o.capacity_pcu_hour_lane, o.max_density_pcu_km_lane);
        }
        if key == railway::KEY {
            (
                railway::default_capacity_pcu_hour_lane(value),
                railway::default_max_density_pcu_km_lane(value),
            )
        } else if waterway::is_water_based_way(key, value) {
            (
                waterway::default_capacity_pcu_hour_lane(value),
                waterway::default_max_density_pcu_km_lane(value),
            )
        } else {
            (
                highway::default_capacity_pcu_hour_lane(value),
                highway::default_max_density_pcu_km_lane(value),
            )
        }
    }

    /// default lanes per direction for a way type.
    pub fn default_lanes_for(&self, key: &str, value: &str) -> u32 {
        if key == railway::KEY {
            railway::default_lanes_per_direction(value)
        } else if waterway::is_water_based_way(key, value) {
            waterway::default_lanes_per_direction(value)
        } else {
            highway::default_lanes_per_direction(value)
        }
    }

    /// applies the configured access edits for a way type onto its default
    /// token list.
    pub fn apply_mode_access_overrides(
        &self,
        key: &str,
        value: &str,
        mut tokens: BTreeSet<String>,
    ) -> BTreeSet<String> {
        for edit in self
            .mode_access_overrides
            .iter()
            .filter(|o| o.key == key && o.value == value)
        {
            if let Some(set) = &edit.set {
                tokens = set.iter().cloned().collect();
            }
            for token in edit.add.iter() {
                tokens.insert(token.clone());
            }
            for token in edit.remove.iter() {
                tokens.remove(token);
            }
        }
        tokens
    }

    /// the predefined mode an OSM token activates, after applying the
    /// configured mapping edits.
    pub fn mode_of_token(&self, token: &str) -> Option<Mode> {
        if self.removed_osm_modes.iter().any(|t| t == token) {
            return None;
        }
        if let Some(mapping) = self
            .added_osm_modes
            .iter()
            .rev()
            .find(|m| m.osm_mode == token)
        {
            return Some(mapping.mode);
        }
        crate::tags::modes::default_mode_of(token)
    }
}

/// a user-nominated pairing of a stop position onto a specific waiting area.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopWaitingAreaOverride {
    pub stop_node: i64,
    pub waiting_area_kind: OsmMemberKind,
    pub waiting_area: i64,
}

/// a user-nominated access way for a waiting area.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitingAreaWayOverride {
    pub waiting_area_kind: OsmMemberKind,
    pub waiting_area: i64,
    pub osm_way: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoningSettings {
    /// gates the public transport passes entirely
    pub active: bool,
    pub stop_to_waiting_area_search_m: f64,
    pub station_to_waiting_area_search_m: f64,
    pub station_to_tracks_search_m: f64,
    /// links within this distance beyond the closest one remain stop access
    /// candidates
    pub closest_edge_buffer_m: f64,
    /// suppress matching warnings for entities closer than this to the
    /// bounding area border
    pub bounding_border_suppression_m: f64,
    pub stop_waiting_area_overrides: Vec<StopWaitingAreaOverride>,
    pub waiting_area_way_overrides: Vec<WaitingAreaWayOverride>,
    pub excluded_nodes: Vec<i64>,
    pub excluded_ways: Vec<i64>,
    /// ids whose matching warnings the user asked to silence
    pub suppressed_warning_ids: Vec<i64>,
}

impl Default for ZoningSettings {
    fn default() -> Self {
        ZoningSettings {
            active: true,
            stop_to_waiting_area_search_m: 25.0,
            station_to_waiting_area_search_m: 35.0,
            station_to_tracks_search_m: 35.0,
            closest_edge_buffer_m: 5.0,
            bounding_border_suppression_m: 20.0,
            stop_waiting_area_overrides: vec![],
            waiting_area_way_overrides: vec![],
            excluded_nodes: vec![],
            excluded_ways: vec![],
            suppressed_warning_ids: vec![],
        }
    }
}

impl ZoningSettings {
    pub fn is_node_excluded(&self, id: i64) -> bool {
        self.excluded_nodes.contains(&id)
    }

    pub fn is_way_excluded(&self, id: i64) -> bool {
        self.excluded_ways.contains(&id)
    }

    pub fn is_warning_suppressed(&self, id: i64) -> bool {
        self.suppressed_warning_ids.contains(&id)
    }

    pub fn overridden_waiting_area(&self, stop_node: i64) -> Option<(OsmMemberKind, i64)> {
        self.stop_waiting_area_overrides
            .iter()
            .rev()
            .find(|o| o.stop_node == stop_node)
            .map(|o| (o.waiting_area_kind, o.waiting_area))
    }

    pub fn overridden_access_way(&self, kind: OsmMemberKind, waiting_area: i64) -> Option<i64> {
        self.waiting_area_way_overrides
            .iter()
            .rev()
            .find(|o| o.waiting_area_kind == kind && o.waiting_area == waiting_area)
            .map(|o| o.osm_way)
    }

    pub fn overwrite_stop_waiting_area(
        &mut self,
        stop_node: i64,
        kind: OsmMemberKind,
        waiting_area: i64,
    ) {
        self.stop_waiting_area_overrides.push(StopWaitingAreaOverride {
            stop_node,
            waiting_area_kind: kind,
            waiting_area,
        });
    }

    pub fn overwrite_waiting_area_way(
        &mut self,
        kind: OsmMemberKind,
        waiting_area: i64,
        osm_way: i64,
    ) {
        self.waiting_area_way_overrides.push(WaitingAreaWayOverride {
            waiting_area_kind: kind,
            waiting_area,
            osm_way,
        });
    }
}

/// the full import configuration: country context, bounding filter and the
/// per-stage settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// ISO-2 country code driving the speed, access and driving-side
    /// defaults; empty means global defaults
    pub country_code: String,
    /// explicit driving side, overriding the country lookup
    pub driving_side: Option<DrivingSide>,
    pub bounding_box: Option<BoundingBox>,
    pub network: NetworkSettings,
    pub zoning: ZoningSettings,
}

impl Settings {
    pub fn for_country(iso2: &str) -> Settings {
        Settings {
            country_code: iso2.to_string(),
            ..Default::default()
        }
    }

    pub fn resolved_driving_side(&self) -> DrivingSide {
        self.driving_side
            .unwrap_or_else(|| DrivingSide::of_country(&self.country_code))
    }
}

impl TryFrom<&String> for Settings {
    type Error = OsmImportError;

    fn try_from(f: &String) -> Result<Self, Self::Error> {
        if f.ends_with(".toml") {
            let s = std::fs::read_to_string(f).map_err(|e| {
                OsmImportError::ConfigurationError(format!("failure reading {f}: {e}"))
            })?;
            toml::from_str(&s).map_err(|e| {
                OsmImportError::ConfigurationError(format!("failure decoding {f}: {e}"))
            })
        } else if f.ends_with(".json") {
            let s = std::fs::read_to_string(f).map_err(|e| {
                OsmImportError::ConfigurationError(format!("failure reading {f}: {e}"))
            })?;
            serde_json::from_str(&s).map_err(|e| {
                OsmImportError::ConfigurationError(format!("failure decoding {f}: {e}"))
            })
        } else {
            Err(OsmImportError::ConfigurationError(format!(
                "unsupported settings file type: {f}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_activation_edits() {
        let mut settings = NetworkSettings::default();
        assert!(settings.is_way_type_activated("highway", "road"));
        settings.deactivate_type("highway", "road");
        assert!(!settings.is_way_type_activated("highway", "road"));
        assert!(!settings.is_way_type_activated("highway", "raceway"));
        settings.activate_type("highway", "raceway");
        assert!(settings.is_way_type_activated("highway", "raceway"));
        // railway family inactive by default
        assert!(!settings.is_way_type_activated("railway", "rail"));
        settings.railways_active = true;
        assert!(settings.is_way_type_activated("railway", "rail"));
    }

    #[test]
    fn test_capacity_override() {
        let mut settings = NetworkSettings::default();
        let (default_capacity, _) = settings.capacity_for("highway", "primary");
        assert_ne!(default_capacity, 2200.0);
        settings.overwrite_capacity("highway", "primary", 2200.0, 180.0);
        assert_eq!(
            settings.capacity_for("highway", "primary"),
            (2200.0, 180.0)
        );
    }

    #[test]
    fn test_mode_access_edit_order() {
        let mut settings = NetworkSettings::default();
        settings.add_allowed_mode("highway", "secondary", "tram");
        settings.remove_allowed_mode("highway", "secondary", "foot");
        let tokens = settings.apply_mode_access_overrides(
            "highway",
            "secondary",
            BTreeSet::from([String::from("motorcar"), String::from("foot")]),
        );
        assert!(tokens.contains("tram"));
        assert!(tokens.contains("motorcar"));
        assert!(!tokens.contains("foot"));
    }

    #[test]
    fn test_mode_mapping_edits() {
        let mut settings = NetworkSettings::default();
        assert_eq!(settings.mode_of_token("motorcar"), Some(Mode::Car));
        settings.removed_osm_modes.push(String::from("motorcar"));
        assert_eq!(settings.mode_of_token("motorcar"), None);
        settings.added_osm_modes.push(OsmModeMapping {
            osm_mode: String::from("carriage"),
            mode: Mode::Car,
        });
        assert_eq!(settings.mode_of_token("carriage"), Some(Mode::Car));
    }

    #[test]
    fn test_bounding_box() {
        let bb = BoundingBox::new(144.9, -37.9, 145.0, -37.8);
        assert!(bb.contains(144.95, -37.85));
        assert!(!bb.contains(144.89, -37.85));
        let border_distance = bb.distance_to_border_m(144.9001, -37.85);
        assert!(border_distance < 50.0, "got {border_distance}");
    }

    #[test]
    fn test_settings_roundtrip_json() {
        let mut settings = Settings::for_country("AU");
        settings.network.retain_osm_tags = true;
        settings
            .zoning
            .overwrite_stop_waiting_area(1, OsmMemberKind::Way, 2);
        let encoded = serde_json::to_string(&settings).unwrap();
        let decoded: Settings = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.country_code, "AU");
        assert!(decoded.network.retain_osm_tags);
        assert_eq!(
            decoded.zoning.overridden_waiting_area(1),
            Some((OsmMemberKind::Way, 2))
        );
        assert_eq!(decoded.resolved_driving_side(), DrivingSide::Left);
    }
}
