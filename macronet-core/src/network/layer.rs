use crate::algorithm::geometry;
use crate::error::NetworkError;
use crate::ids::{IdGenerators, LayerId, LinkId, LinkSegmentId, LinkSegmentTypeId, NodeId};
use crate::mode::Mode;
use crate::network::link::{Direction, Link};
use crate::network::link_segment::LinkSegment;
use crate::network::link_segment_type::{FunctionalTypeKey, LinkSegmentType};
use crate::network::node::Node;
use geo::{LineString, Point};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use wkt::ToWkt;

/// one infrastructure layer of the network: the container owning its nodes,
/// links, link segments and link segment types. cross-references between the
/// items are ids resolved through this layer.
///
/// containers are ordered maps so that iteration order is stable across runs
/// over identical input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkLayer {
    pub id: LayerId,
    pub modes: BTreeSet<Mode>,
    nodes: BTreeMap<NodeId, Node>,
    links: BTreeMap<LinkId, Link>,
    segments: BTreeMap<LinkSegmentId, LinkSegment>,
    segment_types: BTreeMap<LinkSegmentTypeId, LinkSegmentType>,
    #[serde(skip)]
    node_by_position: HashMap<(i64, i64), NodeId>,
    #[serde(skip)]
    type_by_key: HashMap<FunctionalTypeKey, LinkSegmentTypeId>,
    links_by_external: BTreeMap<i64, Vec<LinkId>>,
}

impl NetworkLayer {
    pub fn new(id: LayerId, modes: BTreeSet<Mode>) -> NetworkLayer {
        NetworkLayer {
            id,
            modes,
            ..Default::default()
        }
    }

    pub fn supports(&self, mode: Mode) -> bool {
        self.modes.contains(&mode)
    }

    pub fn supports_any(&self, modes: &BTreeSet<Mode>) -> bool {
        modes.iter().any(|m| self.supports(*m))
    }

    // --- nodes ---

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn get_node(&self, id: NodeId) -> Result<&Node, NetworkError> {
        self.nodes.get(&id).ok_or(NetworkError::MissingNode(id))
    }

    pub fn get_node_mut(&mut self, id: NodeId) -> Result<&mut Node, NetworkError> {
        self.nodes.get_mut(&id).ok_or(NetworkError::MissingNode(id))
    }

    pub fn node_iterator(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_at_position(&self, position: &Point<f64>) -> Option<NodeId> {
        self.node_by_position
            .get(&geometry::position_key(position))
            .copied()
    }

    /// registers a node. positions must be unique within the layer; a second
    /// registration at an occupied position is an invariant violation, the
    /// caller is expected to look up and reuse the existing node instead.
    pub fn add_node(
        &mut self,
        ids: &mut IdGenerators,
        external_id: Option<i64>,
        position: Point<f64>,
        tags: Option<BTreeMap<String, String>>,
    ) -> Result<NodeId, NetworkError> {
        let key = geometry::position_key(&position);
        if let Some(existing) = self.node_by_position.get(&key) {
            return Err(NetworkError::InvalidNetworkData(format!(
                "attempting to add node at {} already occupied by node '{existing}'",
                position.to_wkt()
            )));
        }
        let id = ids.next_node();
        self.node_by_position.insert(key, id);
        self.nodes
            .insert(id, Node::new(id, external_id, position, tags));
        Ok(id)
    }

    /// removes a node that no longer has incident links.
    pub fn remove_node(&mut self, id: NodeId) -> Result<(), NetworkError> {
        let node = self.get_node(id)?;
        if !node.links.is_empty() {
            return Err(NetworkError::InvalidNetworkData(format!(
                "attempting to remove node '{id}' that still has {} incident links",
                node.links.len()
            )));
        }
        let key = geometry::position_key(&node.position);
        self.node_by_position.remove(&key);
        self.nodes.remove(&id);
        Ok(())
    }

    // --- link segment types ---

    pub fn n_segment_types(&self) -> usize {
        self.segment_types.len()
    }

    pub fn get_segment_type(
        &self,
        id: LinkSegmentTypeId,
    ) -> Result<&LinkSegmentType, NetworkError> {
        self.segment_types
            .get(&id)
            .ok_or(NetworkError::MissingLinkSegmentType(id))
    }

    pub fn segment_type_iterator(&self) -> impl Iterator<Item = &LinkSegmentType> {
        self.segment_types.values()
    }

    /// finds an existing type with identical functional (access) properties,
    /// or registers the candidate as a new type. reuse keeps the number of
    /// types proportional to the distinct access configurations in the input.
    pub fn find_or_add_segment_type(
        &mut self,
        ids: &mut IdGenerators,
        mut candidate: LinkSegmentType,
    ) -> LinkSegmentTypeId {
        let key = candidate.functional_key();
        if let Some(existing) = self.type_by_key.get(&key) {
            return *existing;
        }
        let id = ids.next_link_segment_type();
        candidate.id = id;
        self.type_by_key.insert(key, id);
        self.segment_types.insert(id, candidate);
        id
    }

    /// replaces the whole segment type container, rebuilding the functional
    /// lookup. used by consolidation.
    pub(crate) fn replace_segment_types(
        &mut self,
        types: BTreeMap<LinkSegmentTypeId, LinkSegmentType>,
    ) {
        self.type_by_key = types
            .values()
            .map(|t| (t.functional_key(), t.id))
            .collect();
        self.segment_types = types;
    }

    /// swaps in fully rebuilt containers and derives every secondary index
    /// from them. used by the id renumbering modifier.
    pub(crate) fn replace_contents(
        &mut self,
        nodes: BTreeMap<NodeId, Node>,
        links: BTreeMap<LinkId, Link>,
        segments: BTreeMap<LinkSegmentId, LinkSegment>,
        segment_types: BTreeMap<LinkSegmentTypeId, LinkSegmentType>,
    ) {
        self.node_by_position = nodes
            .values()
            .map(|n| (geometry::position_key(&n.position), n.id))
            .collect();
        self.links_by_external = BTreeMap::new();
        for link in links.values() {
            if let Some(ext) = link.external_id {
                self.links_by_external.entry(ext).or_default().push(link.id);
            }
        }
        self.nodes = nodes;
        self.links = links;
        self.segments = segments;
        self.replace_segment_types(segment_types);
    }

    // --- links ---

    pub fn n_links(&self) -> usize {
        self.links.len()
    }

    pub fn get_link(&self, id: LinkId) -> Result<&Link, NetworkError> {
        self.links.get(&id).ok_or(NetworkError::MissingLink(id))
    }

    pub fn get_link_mut(&mut self, id: LinkId) -> Result<&mut Link, NetworkError> {
        self.links.get_mut(&id).ok_or(NetworkError::MissingLink(id))
    }

    pub fn link_iterator(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    pub fn links_of_external(&self, external_id: i64) -> &[LinkId] {
        self.links_by_external
            .get(&external_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// registers a link between two existing nodes. the geometry must run
    /// from node a's position to node b's position and the nodes must differ.
    pub fn add_link(
        &mut self,
        ids: &mut IdGenerators,
        external_id: Option<i64>,
        node_a: NodeId,
        node_b: NodeId,
        geometry: LineString<f64>,
        tags: Option<BTreeMap<String, String>>,
    ) -> Result<LinkId, NetworkError> {
        let id = ids.next_link();
        if node_a == node_b {
            return Err(NetworkError::InvalidLink(
                id,
                format!("self-loop on node '{node_a}'"),
            ));
        }
        if geometry.0.len() < 2 {
            return Err(NetworkError::InvalidLink(
                id,
                format!("geometry has {} positions", geometry.0.len()),
            ));
        }
        let pos_a = self.get_node(node_a)?.position;
        let pos_b = self.get_node(node_b)?.position;
        let first = Point(geometry.0[0]);
        let last = Point(geometry.0[geometry.0.len() - 1]);
        if !geometry::same_position(&pos_a, &first) || !geometry::same_position(&pos_b, &last) {
            return Err(NetworkError::InvalidLink(
                id,
                String::from("geometry endpoints do not match node positions"),
            ));
        }
        let length_km = geometry::length_km(&geometry);
        let link = Link {
            id,
            external_id,
            node_a,
            node_b,
            geometry,
            length_km,
            segment_ab: None,
            segment_ba: None,
            tags,
        };
        if let Some(ext) = external_id {
            self.links_by_external.entry(ext).or_default().push(id);
        }
        self.links.insert(id, link);
        self.get_node_mut(node_a)?.links.insert(id);
        self.get_node_mut(node_b)?.links.insert(id);
        Ok(id)
    }

    /// removes a link together with its segments. the endpoints remain, with
    /// their adjacency updated.
    pub fn remove_link(&mut self, id: LinkId) -> Result<Link, NetworkError> {
        let link = self.links.remove(&id).ok_or(NetworkError::MissingLink(id))?;
        for (_, segment_id) in link.segments() {
            self.segments.remove(&segment_id);
        }
        if let Some(ext) = link.external_id {
            if let Some(list) = self.links_by_external.get_mut(&ext) {
                list.retain(|l| *l != id);
                if list.is_empty() {
                    self.links_by_external.remove(&ext);
                }
            }
        }
        self.get_node_mut(link.node_a)?.links.remove(&id);
        self.get_node_mut(link.node_b)?.links.remove(&id);
        Ok(link)
    }

    // --- link segments ---

    pub fn n_segments(&self) -> usize {
        self.segments.len()
    }

    pub fn get_segment(&self, id: LinkSegmentId) -> Result<&LinkSegment, NetworkError> {
        self.segments
            .get(&id)
            .ok_or(NetworkError::MissingLinkSegment(id))
    }

    pub fn segment_iterator(&self) -> impl Iterator<Item = &LinkSegment> {
        self.segments.values()
    }

    /// registers a directional segment on a link. at most one segment may
    /// exist per direction per link.
    pub fn add_segment(
        &mut self,
        ids: &mut IdGenerators,
        link_id: LinkId,
        direction: Direction,
        type_id: LinkSegmentTypeId,
        lanes: u32,
    ) -> Result<LinkSegmentId, NetworkError> {
        self.get_segment_type(type_id)?;
        let link = self.get_link(link_id)?;
        if link.segment(direction).is_some() {
            return Err(NetworkError::InvalidNetworkData(format!(
                "link '{link_id}' already has a segment in direction {direction}"
            )));
        }
        let id = ids.next_link_segment();
        self.segments
            .insert(id, LinkSegment::new(id, link_id, direction, type_id, lanes));
        let link = self.get_link_mut(link_id)?;
        match direction {
            Direction::Ab => link.segment_ab = Some(id),
            Direction::Ba => link.segment_ba = Some(id),
        }
        Ok(id)
    }

    /// modes allowed on a segment, resolved through its type.
    pub fn segment_modes(&self, id: LinkSegmentId) -> Result<BTreeSet<Mode>, NetworkError> {
        let segment = self.get_segment(id)?;
        let st = self.get_segment_type(segment.type_id)?;
        Ok(st.allowed_modes().collect())
    }

    /// the node a segment travels towards, resolved through its parent link.
    pub fn segment_downstream_node(&self, id: LinkSegmentId) -> Result<NodeId, NetworkError> {
        let segment = self.get_segment(id)?;
        let link = self.get_link(segment.link)?;
        Ok(link.downstream_node(segment.direction))
    }

    pub(crate) fn set_segment_type(
        &mut self,
        id: LinkSegmentId,
        type_id: LinkSegmentTypeId,
    ) -> Result<(), NetworkError> {
        let segment = self
            .segments
            .get_mut(&id)
            .ok_or(NetworkError::MissingLinkSegment(id))?;
        segment.type_id = type_id;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::network::link_segment_type::AccessProperties;

    /// builds a layer with car access and a chain of nodes at the given
    /// longitudes (latitude 0), one link per consecutive pair.
    pub fn chain_layer(
        ids: &mut IdGenerators,
        lons: &[f64],
    ) -> (NetworkLayer, Vec<NodeId>, Vec<LinkId>) {
        let mut layer = NetworkLayer::new(
            ids.next_layer(),
            BTreeSet::from([Mode::Car, Mode::Bus]),
        );
        let mut access = BTreeMap::new();
        access.insert(Mode::Car, AccessProperties::new(Mode::Car, 50.0));
        access.insert(Mode::Bus, AccessProperties::new(Mode::Bus, 50.0));
        let type_id = layer.find_or_add_segment_type(
            ids,
            LinkSegmentType {
                id: LinkSegmentTypeId(0),
                name: String::from("highway=residential"),
                external_id: String::from("highway=residential"),
                capacity_pcu_hour_lane: 1000.0,
                max_density_pcu_km_lane: 180.0,
                access,
            },
        );
        let mut nodes = vec![];
        for (i, lon) in lons.iter().enumerate() {
            let id = layer
                .add_node(ids, Some(i as i64), Point::new(*lon, 0.0), None)
                .unwrap();
            nodes.push(id);
        }
        let mut links = vec![];
        for w in nodes.windows(2) {
            let a = layer.get_node(w[0]).unwrap().position;
            let b = layer.get_node(w[1]).unwrap().position;
            let link = layer
                .add_link(
                    ids,
                    Some(100),
                    w[0],
                    w[1],
                    LineString(vec![a.0, b.0]),
                    None,
                )
                .unwrap();
            layer
                .add_segment(ids, link, Direction::Ab, type_id, 1)
                .unwrap();
            layer
                .add_segment(ids, link, Direction::Ba, type_id, 1)
                .unwrap();
            links.push(link);
        }
        (layer, nodes, links)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_link_rejects_self_loop() {
        let mut ids = IdGenerators::new();
        let mut layer = NetworkLayer::new(ids.next_layer(), BTreeSet::from([Mode::Car]));
        let n = layer
            .add_node(&mut ids, Some(1), Point::new(0.0, 0.0), None)
            .unwrap();
        let geometry = LineString::from(vec![(0.0, 0.0), (0.0, 0.0)]);
        assert!(layer.add_link(&mut ids, None, n, n, geometry, None).is_err());
    }

    #[test]
    fn test_add_link_rejects_mismatched_geometry() {
        let mut ids = IdGenerators::new();
        let mut layer = NetworkLayer::new(ids.next_layer(), BTreeSet::from([Mode::Car]));
        let a = layer
            .add_node(&mut ids, Some(1), Point::new(0.0, 0.0), None)
            .unwrap();
        let b = layer
            .add_node(&mut ids, Some(2), Point::new(1.0, 0.0), None)
            .unwrap();
        let geometry = LineString::from(vec![(0.0, 0.0), (2.0, 0.0)]);
        assert!(layer.add_link(&mut ids, None, a, b, geometry, None).is_err());
    }

    #[test]
    fn test_remove_link_updates_adjacency() {
        let mut ids = IdGenerators::new();
        let (mut layer, nodes, links) = test_support::chain_layer(&mut ids, &[0.0, 0.001]);
        assert_eq!(layer.get_node(nodes[0]).unwrap().degree(), 1);
        layer.remove_link(links[0]).unwrap();
        assert_eq!(layer.get_node(nodes[0]).unwrap().degree(), 0);
        assert_eq!(layer.n_segments(), 0);
        layer.remove_node(nodes[0]).unwrap();
        assert_eq!(layer.n_nodes(), 1);
    }

    #[test]
    fn test_duplicate_position_rejected() {
        let mut ids = IdGenerators::new();
        let mut layer = NetworkLayer::new(ids.next_layer(), BTreeSet::from([Mode::Car]));
        layer
            .add_node(&mut ids, Some(1), Point::new(0.0, 0.0), None)
            .unwrap();
        assert!(layer
            .add_node(&mut ids, Some(2), Point::new(0.0, 0.0), None)
            .is_err());
    }

    #[test]
    fn test_segment_slots_are_exclusive() {
        let mut ids = IdGenerators::new();
        let (mut layer, _, links) = test_support::chain_layer(&mut ids, &[0.0, 0.001]);
        let type_id = layer.segment_type_iterator().next().unwrap().id;
        assert!(layer
            .add_segment(&mut ids, links[0], Direction::Ab, type_id, 1)
            .is_err());
    }
}
