#[cfg(all(feature = "bluez", target_os = "linux"))]
pub mod bluez;
pub mod server;

use crate::{
    config::AdvertisingRequest,
    gatt::{central::Central, service::ServiceDescriptor},
    Result,
};
use async_trait::async_trait;
use uuid::Uuid;

pub use server::PeripheralServer;

/// Platform notify primitive. Returns immediately; the outcome comes back
/// later as `PeripheralEvent::DidSendNotification`.
pub trait Notifier {
    fn notify(&self, characteristic: Uuid, payload: Vec<u8>, central: &Central);
}

/// Boundary to the platform BLE stack. Callbacks travel the other way as
/// `PeripheralEvent`s on the channel the platform was built with.
#[async_trait]
pub trait PeripheralPlatform: Notifier + Send + Sync {
    async fn is_powered(&self) -> Result<bool>;

    async fn remove_all_services(&mut self) -> Result<()>;

    async fn register_service(&mut self, service: &ServiceDescriptor) -> Result<()>;

    async fn advertise(&mut self, request: &AdvertisingRequest) -> Result<()>;

    async fn stop_advertising(&mut self) -> Result<()>;
}
