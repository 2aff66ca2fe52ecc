use crate::ids::{ConnectoidId, LayerId, LinkSegmentId, NodeId, TransferZoneId};
use crate::mode::Mode;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// a directed access point from one or more transfer zones onto a specific
/// link segment. the access node is the downstream vertex of that segment,
/// i.e. the physical boarding location. holds ids only; the referenced
/// segment and zones are owned by their containers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectedConnectoid {
    pub id: ConnectoidId,
    pub layer: LayerId,
    pub access_segment: LinkSegmentId,
    pub access_node: NodeId,
    /// allowed modes per served transfer zone. always a subset of the access
    /// segment's allowed modes.
    pub zones: BTreeMap<TransferZoneId, BTreeSet<Mode>>,
}

impl DirectedConnectoid {
    pub fn serves(&self, zone: TransferZoneId) -> bool {
        self.zones.contains_key(&zone)
    }

    pub fn zone_modes(&self, zone: TransferZoneId) -> Option<&BTreeSet<Mode>> {
        self.zones.get(&zone)
    }
}
