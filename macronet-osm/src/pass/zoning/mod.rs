pub mod access;
pub mod main_pass;
pub mod post;
pub mod preprocess;

use crate::config::{BoundingBox, Settings};
use crate::osm::entity::{OsmMemberKind, OsmNodeData};
use geo::Point;
use macronet_core::algorithm::geometry;
use macronet_core::ids::{TransferZoneGroupId, TransferZoneId};
use macronet_core::zoning::TransferZone;
use macronet_core::{Mode, Zoning};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// a station encountered during the main pass whose handling is deferred:
/// either it names a nearby group of platforms, or it becomes a standalone
/// transfer zone with its own access links.
#[derive(Debug, Clone)]
pub struct DeferredStation {
    pub kind: OsmMemberKind,
    pub external_id: i64,
    pub name: Option<String>,
    pub position: Point<f64>,
    pub modes: BTreeSet<Mode>,
}

/// state shared by the three public transport passes. the preprocess pass
/// fills the platform promotion set, the main pass materialises zones and
/// defers the rest, the postprocess pass resolves everything onto the
/// network.
#[derive(Default)]
pub struct ZoningState {
    pub zoning: Zoning,
    pub zone_by_node: BTreeMap<i64, TransferZoneId>,
    pub zone_by_way: BTreeMap<i64, TransferZoneId>,
    /// `ref`-style tag values per zone, for exact stop matching
    pub zone_refs: HashMap<TransferZoneId, Vec<String>>,
    /// stop-area groups a stop-position node was listed in
    pub groups_of_stop: HashMap<i64, Vec<TransferZoneGroupId>>,
    pub deferred_stops: Vec<OsmNodeData>,
    pub deferred_stations: Vec<DeferredStation>,
    /// ways that must be retained as platforms because a stop-area or
    /// multipolygon relation references them
    pub platform_ways: HashSet<i64>,
    /// position of every streamed node, needed to build way geometries and
    /// resolve stop-role members without tags
    pub node_positions: HashMap<i64, (f64, f64)>,
    /// node refs of public-transport ways, for geometry construction
    pub way_refs: HashMap<i64, Vec<i64>>,
    /// classification value of materialised network ways, for access-link
    /// importance tie-breaking
    pub way_class: HashMap<i64, String>,
    /// bounding box of the run, for border warning suppression
    pub bounds: Option<BoundingBox>,
    warned: HashSet<String>,
}

impl ZoningState {
    pub fn new(bounds: Option<BoundingBox>) -> ZoningState {
        ZoningState {
            bounds,
            ..Default::default()
        }
    }

    /// logs a warning once per unique cause, unless the subject entity is so
    /// close to the bounding border that it is almost certainly a truncation
    /// artefact, or the user asked for the id to be silenced.
    pub fn warn_once(
        &mut self,
        settings: &Settings,
        id: i64,
        position: Option<Point<f64>>,
        cause: String,
    ) {
        if settings.zoning.is_warning_suppressed(id) {
            return;
        }
        if let (Some(bounds), Some(p)) = (&self.bounds, position) {
            if bounds.distance_to_border_m(p.x(), p.y())
                < settings.zoning.bounding_border_suppression_m
            {
                return;
            }
        }
        if self.warned.insert(cause.clone()) {
            log::warn!("{cause}");
        }
    }

    pub fn zone_of_external(&self, kind: OsmMemberKind, id: i64) -> Option<TransferZoneId> {
        match kind {
            OsmMemberKind::Node => self.zone_by_node.get(&id).copied(),
            OsmMemberKind::Way => self.zone_by_way.get(&id).copied(),
            OsmMemberKind::Relation => None,
        }
    }

    pub fn node_point(&self, id: i64) -> Option<Point<f64>> {
        self.node_positions.get(&id).map(|(x, y)| Point::new(*x, *y))
    }

    /// distance in meters between a point and a zone's geometry.
    pub fn zone_distance_m(zone: &TransferZone, point: &Point<f64>) -> Option<f64> {
        use geo::{Centroid, Contains, Geometry};
        match &zone.geometry {
            Geometry::Point(p) => Some(geometry::haversine_m(p, point)),
            Geometry::LineString(ls) => {
                geometry::closest_on_linestring(point, ls).map(|p| p.distance_m)
            }
            Geometry::Polygon(polygon) => {
                if polygon.contains(point) {
                    return Some(0.0);
                }
                geometry::closest_on_linestring(point, polygon.exterior()).map(|p| p.distance_m)
            }
            other => other
                .centroid()
                .map(|c| geometry::haversine_m(&c, point)),
        }
    }
}

// re-exported entry points of the three passes
pub use main_pass::ZoningMainHandler;
pub use post::resolve_deferred;
pub use preprocess::ZoningPreprocessHandler;
