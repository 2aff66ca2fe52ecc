pub mod connectoid;
pub mod transfer_zone;
#[allow(clippy::module_inception)]
pub mod zoning;

pub use connectoid::DirectedConnectoid;
pub use transfer_zone::{TransferZone, TransferZoneKind};
pub use zoning::{TransferZoneGroup, Zoning};
