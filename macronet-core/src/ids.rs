use serde::{Deserialize, Serialize};
use std::fmt::Display;

macro_rules! network_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Default, Clone, Copy, Eq, PartialEq, PartialOrd, Ord, Deserialize, Serialize, Hash,
        )]
        pub struct $name(pub u64);

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

network_id!(LayerId);
network_id!(NodeId);
network_id!(LinkId);
network_id!(LinkSegmentId);
network_id!(LinkSegmentTypeId);
network_id!(TransferZoneId);
network_id!(TransferZoneGroupId);
network_id!(ConnectoidId);

/// monotonic id counters for one pipeline invocation. each container draws
/// from its own counter so that creation order dictates id order, which in
/// turn guarantees identical ids on repeated runs over the same input.
///
/// a fresh value must be used per invocation; there is no global state.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct IdGenerators {
    layers: u64,
    nodes: u64,
    links: u64,
    link_segments: u64,
    link_segment_types: u64,
    transfer_zones: u64,
    transfer_zone_groups: u64,
    connectoids: u64,
}

impl IdGenerators {
    pub fn new() -> IdGenerators {
        IdGenerators::default()
    }

    pub fn next_layer(&mut self) -> LayerId {
        let id = LayerId(self.layers);
        self.layers += 1;
        id
    }

    pub fn next_node(&mut self) -> NodeId {
        let id = NodeId(self.nodes);
        self.nodes += 1;
        id
    }

    pub fn next_link(&mut self) -> LinkId {
        let id = LinkId(self.links);
        self.links += 1;
        id
    }

    pub fn next_link_segment(&mut self) -> LinkSegmentId {
        let id = LinkSegmentId(self.link_segments);
        self.link_segments += 1;
        id
    }

    pub fn next_link_segment_type(&mut self) -> LinkSegmentTypeId {
        let id = LinkSegmentTypeId(self.link_segment_types);
        self.link_segment_types += 1;
        id
    }

    pub fn next_transfer_zone(&mut self) -> TransferZoneId {
        let id = TransferZoneId(self.transfer_zones);
        self.transfer_zones += 1;
        id
    }

    pub fn next_transfer_zone_group(&mut self) -> TransferZoneGroupId {
        let id = TransferZoneGroupId(self.transfer_zone_groups);
        self.transfer_zone_groups += 1;
        id
    }

    pub fn next_connectoid(&mut self) -> ConnectoidId {
        let id = ConnectoidId(self.connectoids);
        self.connectoids += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_independent() {
        let mut ids = IdGenerators::new();
        assert_eq!(ids.next_node(), NodeId(0));
        assert_eq!(ids.next_node(), NodeId(1));
        assert_eq!(ids.next_link(), LinkId(0));
        assert_eq!(ids.next_node(), NodeId(2));
        assert_eq!(ids.next_link(), LinkId(1));
    }
}
