use crate::error::NetworkError;
use crate::ids::{
    ConnectoidId, IdGenerators, LayerId, LinkSegmentId, NodeId, TransferZoneGroupId, TransferZoneId,
};
use crate::mode::Mode;
use crate::zoning::connectoid::DirectedConnectoid;
use crate::zoning::transfer_zone::{TransferZone, TransferZoneKind};
use geo::Geometry;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// a named collection of transfer zones that logically form one station or
/// stop area.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferZoneGroup {
    pub id: TransferZoneGroupId,
    pub external_id: Option<i64>,
    pub name: Option<String>,
    pub zones: BTreeSet<TransferZoneId>,
}

/// the zoning model: waiting areas, their groupings and the directed
/// connectoids anchoring them onto the network. exclusively owns its items;
/// all cross-references are ids.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Zoning {
    zones: BTreeMap<TransferZoneId, TransferZone>,
    groups: BTreeMap<TransferZoneGroupId, TransferZoneGroup>,
    connectoids: BTreeMap<ConnectoidId, DirectedConnectoid>,
    connectoids_by_segment: BTreeMap<LinkSegmentId, Vec<ConnectoidId>>,
    connectoids_by_zone: BTreeMap<TransferZoneId, Vec<ConnectoidId>>,
}

impl Zoning {
    pub fn new() -> Zoning {
        Zoning::default()
    }

    // --- transfer zones ---

    pub fn n_zones(&self) -> usize {
        self.zones.len()
    }

    pub fn add_zone(
        &mut self,
        ids: &mut IdGenerators,
        external_id: Option<i64>,
        name: Option<String>,
        kind: TransferZoneKind,
        geometry: Geometry<f64>,
        modes: BTreeSet<Mode>,
    ) -> TransferZoneId {
        let id = ids.next_transfer_zone();
        self.zones.insert(
            id,
            TransferZone {
                id,
                external_id,
                name,
                kind,
                geometry,
                modes,
                groups: BTreeSet::new(),
            },
        );
        id
    }

    pub fn get_zone(&self, id: TransferZoneId) -> Result<&TransferZone, NetworkError> {
        self.zones
            .get(&id)
            .ok_or_else(|| NetworkError::InvalidNetworkData(format!("unknown transfer zone '{id}'")))
    }

    pub fn get_zone_mut(&mut self, id: TransferZoneId) -> Result<&mut TransferZone, NetworkError> {
        self.zones
            .get_mut(&id)
            .ok_or_else(|| NetworkError::InvalidNetworkData(format!("unknown transfer zone '{id}'")))
    }

    pub fn zone_iterator(&self) -> impl Iterator<Item = &TransferZone> {
        self.zones.values()
    }

    // --- groups ---

    pub fn n_groups(&self) -> usize {
        self.groups.len()
    }

    pub fn add_group(
        &mut self,
        ids: &mut IdGenerators,
        external_id: Option<i64>,
        name: Option<String>,
    ) -> TransferZoneGroupId {
        let id = ids.next_transfer_zone_group();
        self.groups.insert(
            id,
            TransferZoneGroup {
                id,
                external_id,
                name,
                zones: BTreeSet::new(),
            },
        );
        id
    }

    pub fn get_group(&self, id: TransferZoneGroupId) -> Result<&TransferZoneGroup, NetworkError> {
        self.groups.get(&id).ok_or_else(|| {
            NetworkError::InvalidNetworkData(format!("unknown transfer zone group '{id}'"))
        })
    }

    pub fn get_group_mut(
        &mut self,
        id: TransferZoneGroupId,
    ) -> Result<&mut TransferZoneGroup, NetworkError> {
        self.groups.get_mut(&id).ok_or_else(|| {
            NetworkError::InvalidNetworkData(format!("unknown transfer zone group '{id}'"))
        })
    }

    pub fn group_iterator(&self) -> impl Iterator<Item = &TransferZoneGroup> {
        self.groups.values()
    }

    pub fn add_zone_to_group(
        &mut self,
        zone: TransferZoneId,
        group: TransferZoneGroupId,
    ) -> Result<(), NetworkError> {
        self.get_group_mut(group)?.zones.insert(zone);
        self.get_zone_mut(zone)?.groups.insert(group);
        Ok(())
    }

    /// removes groups without members, returning how many were culled.
    pub fn remove_empty_groups(&mut self) -> usize {
        let empty: Vec<TransferZoneGroupId> = self
            .groups
            .values()
            .filter(|g| g.zones.is_empty())
            .map(|g| g.id)
            .collect();
        for id in empty.iter() {
            self.groups.remove(id);
        }
        empty.len()
    }

    // --- connectoids ---

    pub fn n_connectoids(&self) -> usize {
        self.connectoids.len()
    }

    /// registers a directed connectoid. the per-zone mode sets must be
    /// non-empty; an empty connectoid is a programming error upstream.
    pub fn add_connectoid(
        &mut self,
        ids: &mut IdGenerators,
        layer: LayerId,
        access_segment: LinkSegmentId,
        access_node: NodeId,
        zones: BTreeMap<TransferZoneId, BTreeSet<Mode>>,
    ) -> Result<ConnectoidId, NetworkError> {
        if zones.is_empty() || zones.values().any(|m| m.is_empty()) {
            return Err(NetworkError::InternalError(String::from(
                "connectoid constructed without any zone access modes",
            )));
        }
        let id = ids.next_connectoid();
        self.connectoids_by_segment
            .entry(access_segment)
            .or_default()
            .push(id);
        for zone in zones.keys() {
            self.connectoids_by_zone.entry(*zone).or_default().push(id);
        }
        self.connectoids.insert(
            id,
            DirectedConnectoid {
                id,
                layer,
                access_segment,
                access_node,
                zones,
            },
        );
        Ok(id)
    }

    pub fn get_connectoid(&self, id: ConnectoidId) -> Result<&DirectedConnectoid, NetworkError> {
        self.connectoids
            .get(&id)
            .ok_or(NetworkError::MissingConnectoid(id))
    }

    pub fn connectoid_iterator(&self) -> impl Iterator<Item = &DirectedConnectoid> {
        self.connectoids.values()
    }

    pub fn connectoids_on_segment(&self, segment: LinkSegmentId) -> &[ConnectoidId] {
        self.connectoids_by_segment
            .get(&segment)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn connectoids_of_zone(&self, zone: TransferZoneId) -> &[ConnectoidId] {
        self.connectoids_by_zone
            .get(&zone)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn zone_has_connectoids(&self, zone: TransferZoneId) -> bool {
        !self.connectoids_of_zone(zone).is_empty()
    }

    /// re-targets every connectoid on an access segment that disappeared in a
    /// link break, keeping the access node unchanged. called inline by the
    /// break operation for each affected segment.
    pub fn retarget_segment(
        &mut self,
        old_segment: LinkSegmentId,
        new_segment: LinkSegmentId,
    ) -> Result<(), NetworkError> {
        let Some(moved) = self.connectoids_by_segment.remove(&old_segment) else {
            return Ok(());
        };
        for id in moved.iter() {
            let connectoid = self
                .connectoids
                .get_mut(id)
                .ok_or(NetworkError::MissingConnectoid(*id))?;
            connectoid.access_segment = new_segment;
        }
        self.connectoids_by_segment
            .entry(new_segment)
            .or_default()
            .extend(moved);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Point;

    #[test]
    fn test_empty_connectoid_rejected() {
        let mut ids = IdGenerators::new();
        let mut zoning = Zoning::new();
        let result = zoning.add_connectoid(
            &mut ids,
            LayerId(0),
            LinkSegmentId(0),
            NodeId(0),
            BTreeMap::new(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_group_membership_is_bidirectional() {
        let mut ids = IdGenerators::new();
        let mut zoning = Zoning::new();
        let zone = zoning.add_zone(
            &mut ids,
            Some(42),
            Some(String::from("stop a")),
            TransferZoneKind::Pole,
            Geometry::Point(Point::new(0.0, 0.0)),
            BTreeSet::from([Mode::Bus]),
        );
        let group = zoning.add_group(&mut ids, Some(7), Some(String::from("station")));
        zoning.add_zone_to_group(zone, group).unwrap();
        assert!(zoning.get_group(group).unwrap().zones.contains(&zone));
        assert!(zoning.get_zone(zone).unwrap().groups().any(|g| *g == group));
        assert_eq!(zoning.remove_empty_groups(), 0);
    }

    #[test]
    fn test_empty_groups_are_culled() {
        let mut ids = IdGenerators::new();
        let mut zoning = Zoning::new();
        zoning.add_group(&mut ids, Some(7), None);
        assert_eq!(zoning.remove_empty_groups(), 1);
        assert_eq!(zoning.n_groups(), 0);
    }

    #[test]
    fn test_retarget_segment_moves_connectoids() {
        let mut ids = IdGenerators::new();
        let mut zoning = Zoning::new();
        let zone = zoning.add_zone(
            &mut ids,
            None,
            None,
            TransferZoneKind::Platform,
            Geometry::Point(Point::new(0.0, 0.0)),
            BTreeSet::from([Mode::Train]),
        );
        let connectoid = zoning
            .add_connectoid(
                &mut ids,
                LayerId(0),
                LinkSegmentId(3),
                NodeId(1),
                BTreeMap::from([(zone, BTreeSet::from([Mode::Train]))]),
            )
            .unwrap();
        zoning
            .retarget_segment(LinkSegmentId(3), LinkSegmentId(9))
            .unwrap();
        assert_eq!(
            zoning.get_connectoid(connectoid).unwrap().access_segment,
            LinkSegmentId(9)
        );
        assert!(zoning.connectoids_on_segment(LinkSegmentId(3)).is_empty());
        assert_eq!(zoning.connectoids_on_segment(LinkSegmentId(9)).len(), 1);
    }
}
