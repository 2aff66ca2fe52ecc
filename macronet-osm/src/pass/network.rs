use crate::config::{BoundingBox, Settings};
use crate::error::OsmImportError;
use crate::io::handler::OsmEntityHandler;
use crate::osm::entity::{OsmTags, OsmWayData};
use crate::osm::ids::OsmNodeId;
use crate::pass::mode_resolution::{ModeResolver, WayAccess};
use geo::{Coord, LineString, Point};
use itertools::Itertools;
use macronet_core::algorithm::{components, consolidation, geometry, modifier, topology};
use macronet_core::ids::{LayerId, LinkSegmentTypeId, NodeId};
use macronet_core::network::link::Direction;
use macronet_core::network::link_segment_type::{AccessProperties, LinkSegmentType};
use macronet_core::{IdGenerators, MacroNetwork, Mode};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// a retained OSM node: position plus, when tag retention is on, its tags.
#[derive(Debug, Clone)]
struct StoredNode {
    x: f64,
    y: f64,
    tags: Option<OsmTags>,
}

/// outcome of the network materialisation stage, handed to the zoning stage.
pub struct NetworkBuild {
    pub network: MacroNetwork,
    pub ids: IdGenerators,
    /// the configured bounding box, or the observed extent of the input
    pub bounds: Option<BoundingBox>,
}

/// the main network pass: stores nodes, materialises activated ways into
/// links and link segments on their layers, then repairs the topology in
/// [`NetworkHandler::finalize`].
pub struct NetworkHandler<'a> {
    settings: &'a Settings,
    resolver: ModeResolver,
    ids: IdGenerators,
    network: MacroNetwork,
    nodes: HashMap<OsmNodeId, StoredNode>,
    keep: Option<HashSet<OsmNodeId>>,
    observed: Option<BoundingBox>,
    /// per osm node: how many materialised link polylines reference it.
    /// counts of two or more identify shared topology that must be broken.
    node_use: HashMap<OsmNodeId, u32>,
    /// circular ways are deferred to their own phase
    circular: Vec<(OsmWayData, WayAccess)>,
    nodes_kept: usize,
    ways_of_interest: usize,
    ways_dropped: usize,
}

impl<'a> NetworkHandler<'a> {
    pub fn new(
        settings: &'a Settings,
        keep: Option<HashSet<OsmNodeId>>,
    ) -> Result<NetworkHandler<'a>, OsmImportError> {
        let mut ids = IdGenerators::new();
        let mut network = MacroNetwork::new();
        let layer_specs: Vec<BTreeSet<Mode>> = if settings.network.layers.is_empty() {
            vec![Mode::ALL.into_iter().collect()]
        } else {
            settings
                .network
                .layers
                .iter()
                .map(|modes| modes.iter().copied().collect())
                .collect()
        };
        for modes in layer_specs {
            network.create_layer(&mut ids, modes).map_err(|e| {
                OsmImportError::ConfigurationError(format!("invalid layer configuration: {e}"))
            })?;
        }
        Ok(NetworkHandler {
            settings,
            resolver: ModeResolver::new(settings),
            ids,
            network,
            nodes: HashMap::new(),
            keep,
            observed: None,
            node_use: HashMap::new(),
            circular: vec![],
            nodes_kept: 0,
            ways_of_interest: 0,
            ways_dropped: 0,
        })
    }

    fn observe(&mut self, x: f64, y: f64) {
        match &mut self.observed {
            None => self.observed = Some(BoundingBox::new(x, y, x, y)),
            Some(b) => {
                b.min_x = b.min_x.min(x);
                b.min_y = b.min_y.min(y);
                b.max_x = b.max_x.max(x);
                b.max_y = b.max_y.max(y);
            }
        }
    }

    /// the node runs of a way that can be materialised: consecutive
    /// subsequences whose nodes were retained. with a bounding filter in
    /// place missing nodes are expected truncation, without one they are a
    /// data consistency problem and drop the way.
    fn node_runs(&self, way: &OsmWayData) -> Vec<Vec<OsmNodeId>> {
        let any_missing = way.nodes.iter().any(|n| !self.nodes.contains_key(n));
        if !any_missing {
            return vec![way.nodes.clone()];
        }
        if self.settings.bounding_box.is_none() {
            log::warn!(
                "way {} references nodes absent from the node store, way dropped",
                way.osmid
            );
            return vec![];
        }
        let mut runs = vec![];
        let mut current: Vec<OsmNodeId> = vec![];
        for n in way.nodes.iter() {
            if self.nodes.contains_key(n) {
                current.push(*n);
            } else if current.len() >= 2 {
                runs.push(std::mem::take(&mut current));
            } else {
                current.clear();
            }
        }
        if current.len() >= 2 {
            runs.push(current);
        }
        runs
    }

    fn find_or_create_node(
        &mut self,
        layer_id: LayerId,
        osm_node: OsmNodeId,
    ) -> Result<NodeId, OsmImportError> {
        let stored = self.nodes.get(&osm_node).ok_or_else(|| {
            OsmImportError::InternalError(format!(
                "node '{osm_node}' requested for materialisation but never stored"
            ))
        })?;
        let position = Point::new(stored.x, stored.y);
        let tags = stored.tags.clone();
        let layer = self.network.layer_mut(layer_id)?;
        if let Some(existing) = layer.node_at_position(&position) {
            return Ok(existing);
        }
        let node = layer.add_node(&mut self.ids, Some(osm_node.0), position, tags)?;
        Ok(node)
    }

    fn segment_type_for(
        &mut self,
        layer_id: LayerId,
        key: &str,
        value: &str,
        modes: &BTreeSet<Mode>,
        speed_kmh: f64,
    ) -> Result<LinkSegmentTypeId, OsmImportError> {
        let (capacity, density) = self.settings.network.capacity_for(key, value);
        let access: BTreeMap<Mode, AccessProperties> = modes
            .iter()
            .map(|mode| (*mode, AccessProperties::new(*mode, speed_kmh)))
            .collect();
        let external_id = format!("{key}={value}");
        let candidate = LinkSegmentType {
            id: LinkSegmentTypeId(0),
            name: external_id.clone(),
            external_id,
            capacity_pcu_hour_lane: capacity,
            max_density_pcu_km_lane: density,
            access,
        };
        let layer = self.network.layer_mut(layer_id)?;
        Ok(layer.find_or_add_segment_type(&mut self.ids, candidate))
    }

    /// materialises one retained node run of a way onto every layer that
    /// supports any of its resolved modes.
    fn materialise_run(
        &mut self,
        way: &OsmWayData,
        access: &WayAccess,
        refs: &[OsmNodeId],
    ) -> Result<(), OsmImportError> {
        for layer_id in self.network.layer_ids() {
            let layer_modes = self.network.layer(layer_id)?.modes.clone();
            let forward: BTreeSet<Mode> =
                access.forward.intersection(&layer_modes).copied().collect();
            let backward: BTreeSet<Mode> =
                access.backward.intersection(&layer_modes).copied().collect();
            if forward.is_empty() && backward.is_empty() {
                continue;
            }
            self.materialise_link(way, access, refs, layer_id, &forward, &backward)?;
        }
        Ok(())
    }

    fn materialise_link(
        &mut self,
        way: &OsmWayData,
        access: &WayAccess,
        refs: &[OsmNodeId],
        layer_id: LayerId,
        forward: &BTreeSet<Mode>,
        backward: &BTreeSet<Mode>,
    ) -> Result<(), OsmImportError> {
        // parallel ref/position list with coincident consecutive positions
        // removed
        let mut path: Vec<(OsmNodeId, Coord<f64>)> = vec![];
        for r in refs {
            let Some(stored) = self.nodes.get(r) else {
                continue;
            };
            let coord = Coord::from((stored.x, stored.y));
            let duplicate = path.last().is_some_and(|(_, prev)| {
                geometry::same_position(&Point(*prev), &Point(coord))
            });
            if !duplicate {
                path.push((*r, coord));
            }
        }
        if path.len() < 2 {
            log::warn!(
                "way {} collapses to fewer than two distinct positions, discarded",
                way.osmid
            );
            return Ok(());
        }
        let (first, _) = path[0];
        let (last, last_coord) = path[path.len() - 1];
        if geometry::same_position(&Point(path[0].1), &Point(last_coord)) {
            log::warn!(
                "way {} starts and ends on the same position after filtering, discarded",
                way.osmid
            );
            return Ok(());
        }

        let node_a = self.find_or_create_node(layer_id, first)?;
        let node_b = self.find_or_create_node(layer_id, last)?;
        let geometry = LineString(path.iter().map(|(_, c)| *c).collect_vec());
        let tags = self
            .settings
            .network
            .retain_osm_tags
            .then(|| way.tags.clone());

        let link = {
            let layer = self.network.layer_mut(layer_id)?;
            match layer.add_link(
                &mut self.ids,
                Some(way.osmid.0),
                node_a,
                node_b,
                geometry,
                tags,
            ) {
                Ok(link) => link,
                Err(e) => {
                    log::warn!("way {} produced an invalid link, discarded: {e}", way.osmid);
                    return Ok(());
                }
            }
        };
        for (r, _) in path.iter() {
            *self.node_use.entry(*r).or_insert(0) += 1;
        }

        if !forward.is_empty() {
            let type_id =
                self.segment_type_for(layer_id, &access.key, &access.value, forward, access.speed_kmh)?;
            let layer = self.network.layer_mut(layer_id)?;
            layer.add_segment(
                &mut self.ids,
                link,
                Direction::Ab,
                type_id,
                access.lanes_forward.max(1),
            )?;
        }
        if !backward.is_empty() {
            let type_id = self.segment_type_for(
                layer_id,
                &access.key,
                &access.value,
                backward,
                access.speed_kmh,
            )?;
            let layer = self.network.layer_mut(layer_id)?;
            layer.add_segment(
                &mut self.ids,
                link,
                Direction::Ba,
                type_id,
                access.lanes_backward.max(1),
            )?;
        }
        Ok(())
    }

    /// splits each deferred circular way at nodes shared with already
    /// materialised topology. a circle without shared nodes is split at a
    /// deterministic halfway index so no self-loop can arise.
    fn circular_phase(&mut self) -> Result<(), OsmImportError> {
        let deferred = std::mem::take(&mut self.circular);
        log::info!("processing {} circular ways", deferred.len());
        for (way, access) in deferred {
            // drop the closing duplicate of the first node
            let ring: Vec<OsmNodeId> = way.nodes[..way.nodes.len() - 1]
                .iter()
                .copied()
                .filter(|n| self.nodes.contains_key(n))
                .collect();
            if ring.len() < 2 {
                log::warn!(
                    "circular way {} has fewer than two retained nodes, discarded",
                    way.osmid
                );
                continue;
            }
            let shared: Vec<usize> = ring
                .iter()
                .enumerate()
                .filter(|(_, n)| self.node_use.get(n).copied().unwrap_or(0) >= 1)
                .map(|(i, _)| i)
                .collect();

            // rotate the ring so it starts at a shared node, then cut it at
            // every shared index; fewer than two cuts get a halfway cut so at
            // least two arcs result
            let start = shared.first().copied().unwrap_or(0);
            let rotated: Vec<OsmNodeId> = ring[start..]
                .iter()
                .chain(ring[..start].iter())
                .copied()
                .collect();
            let mut boundaries: Vec<usize> = shared
                .iter()
                .map(|i| (i + ring.len() - start) % ring.len())
                .sorted()
                .collect();
            if boundaries.is_empty() {
                boundaries.push(0);
            }
            if boundaries.len() < 2 {
                boundaries.push(rotated.len() / 2);
                boundaries.sort();
                boundaries.dedup();
            }

            for (index, boundary) in boundaries.iter().enumerate() {
                let next = boundaries.get(index + 1).copied();
                let mut arc: Vec<OsmNodeId> = match next {
                    Some(end) => rotated[*boundary..=end].to_vec(),
                    None => {
                        // the last arc wraps around to close the circle
                        let mut wrap = rotated[*boundary..].to_vec();
                        wrap.push(rotated[0]);
                        wrap
                    }
                };
                arc.dedup();
                if arc.len() < 2 {
                    continue;
                }
                self.materialise_run(&way, &access, &arc)?;
            }
        }
        Ok(())
    }

    /// breaks every link that runs through shared topology internally: any
    /// osm node referenced by two or more materialised polylines must end up
    /// an endpoint of every link that touches it.
    fn repair_phase(&mut self) -> Result<(), OsmImportError> {
        let candidates: Vec<OsmNodeId> = self
            .node_use
            .iter()
            .filter(|(_, count)| **count >= 2)
            .map(|(n, _)| *n)
            .sorted()
            .collect();
        let mut breaks = 0usize;
        for osm_node in candidates {
            let Some(stored) = self.nodes.get(&osm_node) else {
                continue;
            };
            let position = Point::new(stored.x, stored.y);
            let tags = stored.tags.clone();
            for layer_id in self.network.layer_ids() {
                let layer = self.network.layer(layer_id)?;
                if topology::links_with_internal_position(layer, &position).is_empty() {
                    continue;
                }
                let layer = self.network.layer_mut(layer_id)?;
                let node_id = match layer.node_at_position(&position) {
                    Some(existing) => existing,
                    None => layer.add_node(&mut self.ids, Some(osm_node.0), position, tags.clone())?,
                };
                breaks +=
                    topology::break_links_at_node(layer, None, &mut self.ids, node_id)?.len();
            }
        }
        log::info!("topology repair broke {} links at shared nodes", breaks);
        Ok(())
    }

    /// runs the deferred phases and returns the finished network. invoked
    /// after the entity stream is exhausted, also on an unexpectedly
    /// truncated stream so partial results remain usable.
    pub fn finalize(mut self) -> Result<NetworkBuild, OsmImportError> {
        log::info!(
            "main pass stored {} nodes, materialised {} of {} classified ways",
            self.nodes_kept,
            self.ways_of_interest - self.ways_dropped,
            self.ways_of_interest
        );
        self.circular_phase()?;
        self.repair_phase()?;

        if self.settings.network.remove_dangling_subnetworks {
            for layer_id in self.network.layer_ids() {
                let layer = self.network.layer_mut(layer_id)?;
                components::remove_dangling_subnetworks(
                    layer,
                    self.settings.network.dangling_min_size,
                    self.settings.network.dangling_keep_largest,
                )?;
            }
        }
        if self.settings.network.consolidate_link_segment_types {
            for layer_id in self.network.layer_ids() {
                let layer = self.network.layer_mut(layer_id)?;
                consolidation::consolidate_segment_types(layer)?;
            }
        }
        modifier::renumber_contiguously(&mut self.network, &mut self.ids)?;

        for layer in self.network.layer_iterator() {
            log::info!(
                "layer {} holds {} nodes, {} links, {} link segments, {} link segment types",
                layer.id,
                layer.n_nodes(),
                layer.n_links(),
                layer.n_segments(),
                layer.n_segment_types()
            );
        }
        let bounds = self.settings.bounding_box.or(self.observed);
        Ok(NetworkBuild {
            network: self.network,
            ids: self.ids,
            bounds,
        })
    }
}

impl OsmEntityHandler for NetworkHandler<'_> {
    fn handle_node(&mut self, node: &crate::osm::entity::OsmNodeData) -> Result<(), OsmImportError> {
        if let Some(keep) = &self.keep {
            if !keep.contains(&node.osmid) {
                return Ok(());
            }
        }
        if let Some(bounds) = &self.settings.bounding_box {
            if !bounds.contains(node.x, node.y) {
                return Ok(());
            }
        }
        self.observe(node.x, node.y);
        let tags = (self.settings.network.retain_osm_tags && !node.tags.is_empty())
            .then(|| node.tags.clone());
        self.nodes.insert(
            node.osmid,
            StoredNode {
                x: node.x,
                y: node.y,
                tags,
            },
        );
        self.nodes_kept += 1;
        Ok(())
    }

    fn handle_way(&mut self, way: &OsmWayData) -> Result<(), OsmImportError> {
        let Some((key, value)) = ModeResolver::classify_way(way) else {
            return Ok(());
        };
        self.ways_of_interest += 1;
        if !self.settings.network.is_way_type_activated(key, &value) {
            self.ways_dropped += 1;
            return Ok(());
        }
        let Some(access) = self.resolver.resolve(way, key, &value, self.settings) else {
            self.ways_dropped += 1;
            return Ok(());
        };
        if way.is_circular() {
            self.circular.push((way.clone(), access));
            return Ok(());
        }
        let runs = self.node_runs(way);
        if runs.is_empty() {
            self.ways_dropped += 1;
            return Ok(());
        }
        for run in runs {
            self.materialise_run(way, &access, &run)?;
        }
        Ok(())
    }
}
