use crate::error::NetworkError;
use crate::ids::{IdGenerators, LayerId};
use crate::mode::Mode;
use crate::network::layer::NetworkLayer;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// the macroscopic multi-layer network: one graph per disjoint mode family.
/// each mode maps to exactly one layer; layers may not share modes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MacroNetwork {
    layers: BTreeMap<LayerId, NetworkLayer>,
    mode_to_layer: BTreeMap<Mode, LayerId>,
}

impl MacroNetwork {
    pub fn new() -> MacroNetwork {
        MacroNetwork::default()
    }

    /// creates a layer supporting the given modes. fails when any of the
    /// modes is already assigned to another layer.
    pub fn create_layer(
        &mut self,
        ids: &mut IdGenerators,
        modes: BTreeSet<Mode>,
    ) -> Result<LayerId, NetworkError> {
        for mode in modes.iter() {
            if let Some(existing) = self.mode_to_layer.get(mode) {
                return Err(NetworkError::InvalidNetworkData(format!(
                    "mode '{mode}' is already assigned to layer '{existing}'"
                )));
            }
        }
        let id = ids.next_layer();
        for mode in modes.iter() {
            self.mode_to_layer.insert(*mode, id);
        }
        self.layers.insert(id, NetworkLayer::new(id, modes));
        Ok(id)
    }

    pub fn layer(&self, id: LayerId) -> Result<&NetworkLayer, NetworkError> {
        self.layers.get(&id).ok_or(NetworkError::MissingLayer(id))
    }

    pub fn layer_mut(&mut self, id: LayerId) -> Result<&mut NetworkLayer, NetworkError> {
        self.layers
            .get_mut(&id)
            .ok_or(NetworkError::MissingLayer(id))
    }

    pub fn layer_of_mode(&self, mode: Mode) -> Result<LayerId, NetworkError> {
        self.mode_to_layer
            .get(&mode)
            .copied()
            .ok_or_else(|| NetworkError::UnassignedMode(mode.to_string()))
    }

    pub fn layer_iterator(&self) -> impl Iterator<Item = &NetworkLayer> {
        self.layers.values()
    }

    pub fn layer_ids(&self) -> Vec<LayerId> {
        self.layers.keys().copied().collect()
    }

    pub fn n_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn n_nodes(&self) -> usize {
        self.layers.values().map(|l| l.n_nodes()).sum()
    }

    pub fn n_links(&self) -> usize {
        self.layers.values().map(|l| l.n_links()).sum()
    }

    pub fn n_segments(&self) -> usize {
        self.layers.values().map(|l| l.n_segments()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modes_cannot_span_layers() {
        let mut ids = IdGenerators::new();
        let mut network = MacroNetwork::new();
        network
            .create_layer(&mut ids, BTreeSet::from([Mode::Car, Mode::Bus]))
            .unwrap();
        assert!(network
            .create_layer(&mut ids, BTreeSet::from([Mode::Bus]))
            .is_err());
        let second = network
            .create_layer(&mut ids, BTreeSet::from([Mode::Train]))
            .unwrap();
        assert_eq!(network.layer_of_mode(Mode::Train).unwrap(), second);
        assert!(network.layer_of_mode(Mode::Ferry).is_err());
    }
}
