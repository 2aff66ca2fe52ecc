use crate::ids::{TransferZoneGroupId, TransferZoneId};
use crate::mode::Mode;
use geo::{Centroid, Geometry, Point};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Display;

/// classification of a waiting area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferZoneKind {
    /// a dedicated boarding structure alongside the infrastructure
    Platform,
    /// a marker post, e.g. a bus stop sign
    Pole,
    /// no structural information available
    None,
}

impl Display for TransferZoneKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferZoneKind::Platform => write!(f, "platform"),
            TransferZoneKind::Pole => write!(f, "pole"),
            TransferZoneKind::None => write!(f, "none"),
        }
    }
}

/// a waiting area where travellers board or alight: a platform, pole or
/// station footprint. referenced by connectoids and groups via ids only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferZone {
    pub id: TransferZoneId,
    /// id of the source entity this zone was created from
    pub external_id: Option<i64>,
    pub name: Option<String>,
    pub kind: TransferZoneKind,
    /// point, linestring or polygon footprint in WGS84
    pub geometry: Geometry<f64>,
    /// modes that may board here. may be empty until a stop position adopts
    /// its modes onto the zone.
    pub modes: BTreeSet<Mode>,
    pub(crate) groups: BTreeSet<TransferZoneGroupId>,
}

impl TransferZone {
    /// a representative point of the zone used for distance computations.
    pub fn centroid(&self) -> Option<Point<f64>> {
        match &self.geometry {
            Geometry::Point(p) => Some(*p),
            other => other.centroid(),
        }
    }

    pub fn groups(&self) -> impl Iterator<Item = &TransferZoneGroupId> {
        self.groups.iter()
    }

    pub fn supports(&self, mode: Mode) -> bool {
        self.modes.contains(&mode)
    }

    pub fn supports_any(&self, modes: &BTreeSet<Mode>) -> bool {
        modes.iter().any(|m| self.supports(*m))
    }
}
