pub mod country;
pub mod settings;

pub use country::DrivingSide;
pub use settings::{
    BoundingBox, CapacityOverride, ModeAccessOverride, NetworkSettings, OsmModeMapping, Settings,
    StopWaitingAreaOverride, WaitingAreaWayOverride, WayType, ZoningSettings,
};
