//! BLE peripheral that routes GATT callbacks to the owning service and
//! paces each characteristic's notifications with an Idle/Active scheduler.

pub mod config;
mod error;
pub mod gatt;
pub mod notification;
pub mod peripheral;
pub mod router;
pub mod service;

pub use config::{AdvertisingRequest, PeripheralConfig};
pub use error::{Error, ErrorType, Result};
pub use gatt::uuids::SdpShortUuid;
pub use peripheral::{Notifier, PeripheralPlatform, PeripheralServer};
pub use router::{GattRequest, GattResponse, Router};
pub use service::{Service, ServiceContext};
