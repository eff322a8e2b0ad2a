mod characteristic_utils;
mod error;

use super::{Notifier, PeripheralPlatform};
use crate::{
    config::AdvertisingRequest,
    gatt::{
        central::Central,
        peripheral_event::PeripheralEvent,
        service::ServiceDescriptor,
        status::NotifyOutcome,
    },
    Result,
};
use async_trait::async_trait;
use bluer::{
    adv::{Advertisement, AdvertisementHandle, Feature, Type},
    gatt::local::{Application, ApplicationHandle, Service},
    Adapter, AdapterEvent, Address, DeviceEvent, DeviceProperty,
};
use futures::{pin_mut, StreamExt};
use log::{debug, info, warn};
use std::{
    collections::{BTreeSet, HashMap, HashSet},
    sync::{Arc, Mutex},
};
use tokio::{sync::mpsc::Sender, task::JoinHandle};
use uuid::Uuid;

/// Identifier reported for every BlueZ notify session.
pub const NOTIFY_SESSION: &str = "bluez-notify-session";

pub(crate) type NotifySessions = Arc<Mutex<HashMap<Uuid, Sender<Vec<u8>>>>>;

/// BlueZ binding over D-Bus.
pub struct Peripheral {
    adapter: Adapter,
    sender_tx: Sender<PeripheralEvent>,
    services: Vec<Service>,
    registered: Vec<Uuid>,
    sessions: NotifySessions,
    app_handle: Option<ApplicationHandle>,
    adv_handle: Option<AdvertisementHandle>,
    watcher: JoinHandle<()>,
}

impl Peripheral {
    pub async fn new(sender_tx: Sender<PeripheralEvent>) -> Result<Self> {
        let session = bluer::Session::new().await?;
        let adapter = session.default_adapter().await?;
        adapter.set_powered(true).await?;
        info!(
            "Initialize Bluetooth adapter {} with address {}",
            adapter.name(),
            adapter.address().await?
        );
        let watcher = tokio::spawn(watch_connections(adapter.clone(), sender_tx.clone()));

        Ok(Peripheral {
            adapter,
            sender_tx,
            services: vec![],
            registered: vec![],
            sessions: Arc::new(Mutex::new(HashMap::new())),
            app_handle: None,
            adv_handle: None,
            watcher,
        })
    }

    fn report(&self, event: PeripheralEvent) {
        if let Err(err) = self.sender_tx.try_send(event) {
            warn!("Dropping peripheral event: {}", err);
        }
    }

    async fn serve(&mut self) -> Result<()> {
        if self.app_handle.is_some() || self.services.is_empty() {
            return Ok(());
        }
        let application = Application {
            services: std::mem::take(&mut self.services),
            ..Default::default()
        };
        match self.adapter.serve_gatt_application(application).await {
            Ok(handle) => {
                self.app_handle = Some(handle);
                for service in &self.registered {
                    self.report(PeripheralEvent::DidAddService {
                        service: *service,
                        error: None,
                    });
                }
                Ok(())
            }
            Err(err) => {
                for service in &self.registered {
                    self.report(PeripheralEvent::DidAddService {
                        service: *service,
                        error: Some(err.to_string()),
                    });
                }
                Err(err.into())
            }
        }
    }
}

impl Drop for Peripheral {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}

impl Notifier for Peripheral {
    fn notify(&self, characteristic: Uuid, payload: Vec<u8>, central: &Central) {
        let session = self
            .sessions
            .lock()
            .ok()
            .and_then(|sessions| sessions.get(&characteristic).cloned());
        let failure = match session {
            Some(session) => match session.try_send(payload.clone()) {
                Ok(()) => return,
                Err(err) => err.to_string(),
            },
            None => format!("no notify session on {}", characteristic),
        };
        self.report(PeripheralEvent::DidSendNotification {
            client: central.clone(),
            characteristic,
            value: payload,
            outcome: NotifyOutcome::Failed(failure),
        });
    }
}

#[async_trait]
impl PeripheralPlatform for Peripheral {
    async fn is_powered(&self) -> Result<bool> {
        Ok(self.adapter.is_powered().await?)
    }

    /// BlueZ unregisters an application's services when the registering
    /// process exits or drops its handle, so only this process's own
    /// application can be stale here.
    async fn remove_all_services(&mut self) -> Result<()> {
        self.app_handle = None;
        self.services.clear();
        self.registered.clear();
        Ok(())
    }

    async fn register_service(&mut self, service: &ServiceDescriptor) -> Result<()> {
        self.services.push(characteristic_utils::parse_service(
            service,
            self.sender_tx.clone(),
            self.sessions.clone(),
        ));
        self.registered.push(service.uuid);
        Ok(())
    }

    async fn advertise(&mut self, request: &AdvertisingRequest) -> Result<()> {
        self.adapter.set_alias(request.local_name.clone()).await?;
        self.serve().await?;

        let le_advertisement = le_advertisement(request);
        match self.adapter.advertise(le_advertisement).await {
            Ok(handle) => {
                debug!("AdvHandle: {:?}", handle);
                self.adv_handle = Some(handle);
                self.report(PeripheralEvent::DidStartAdvertising { error: None });
                Ok(())
            }
            Err(err) => {
                self.report(PeripheralEvent::DidStartAdvertising {
                    error: Some(err.to_string()),
                });
                Err(err.into())
            }
        }
    }

    async fn stop_advertising(&mut self) -> Result<()> {
        if self.adv_handle.take().is_some() {
            self.report(PeripheralEvent::DidStopAdvertising);
        }
        Ok(())
    }
}

fn le_advertisement(request: &AdvertisingRequest) -> Advertisement {
    let mut system_includes = BTreeSet::new();
    if request.include_tx_power {
        system_includes.insert(Feature::TxPower);
    }
    let advertisement_type = if request.connectable {
        Type::Peripheral
    } else {
        Type::Broadcast
    };
    Advertisement {
        advertisement_type,
        service_uuids: BTreeSet::from([request.primary_service]),
        discoverable: Some(true),
        local_name: request
            .include_device_name
            .then(|| request.local_name.clone()),
        system_includes,
        ..Default::default()
    }
}

/// Turns BlueZ device `Connected` property changes into connect and
/// disconnect callbacks.
async fn watch_connections(adapter: Adapter, sender_tx: Sender<PeripheralEvent>) {
    let connected: Arc<Mutex<HashSet<Address>>> = Arc::new(Mutex::new(HashSet::new()));
    let events = match adapter.events().await {
        Ok(events) => events,
        Err(err) => {
            warn!("Cannot watch adapter events: {}", err);
            return;
        }
    };
    pin_mut!(events);
    while let Some(event) = events.next().await {
        match event {
            AdapterEvent::DeviceAdded(address) => {
                tokio::spawn(watch_device(
                    adapter.clone(),
                    address,
                    sender_tx.clone(),
                    connected.clone(),
                ));
            }
            AdapterEvent::DeviceRemoved(address) => {
                set_connected(&sender_tx, &connected, address, false).await;
            }
            _ => {}
        }
    }
}

async fn watch_device(
    adapter: Adapter,
    address: Address,
    sender_tx: Sender<PeripheralEvent>,
    connected: Arc<Mutex<HashSet<Address>>>,
) {
    let device = match adapter.device(address) {
        Ok(device) => device,
        Err(err) => {
            warn!("Cannot open device {}: {}", address, err);
            return;
        }
    };
    if let Ok(true) = device.is_connected().await {
        set_connected(&sender_tx, &connected, address, true).await;
    }
    let events = match device.events().await {
        Ok(events) => events,
        Err(err) => {
            warn!("Cannot watch device {}: {}", address, err);
            return;
        }
    };
    pin_mut!(events);
    while let Some(DeviceEvent::PropertyChanged(property)) = events.next().await {
        if let DeviceProperty::Connected(is_connected) = property {
            set_connected(&sender_tx, &connected, address, is_connected).await;
        }
    }
}

async fn set_connected(
    sender_tx: &Sender<PeripheralEvent>,
    connected: &Mutex<HashSet<Address>>,
    address: Address,
    is_connected: bool,
) {
    let changed = match connected.lock() {
        Ok(mut set) if is_connected => set.insert(address),
        Ok(mut set) => set.remove(&address),
        Err(_) => false,
    };
    if !changed {
        return;
    }
    let client = Central::new(address.to_string());
    let event = if is_connected {
        PeripheralEvent::DidConnect { client }
    } else {
        PeripheralEvent::DidDisconnect { client }
    };
    if let Err(err) = sender_tx.send(event).await {
        warn!("Error sending connection event: {}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PeripheralConfig;

    #[test]
    fn connectable_request_advertises_as_peripheral() {
        let request = PeripheralConfig::default().advertising_request(Uuid::from_u128(0x1101));
        let advertisement = le_advertisement(&request);
        assert_eq!(advertisement.advertisement_type, Type::Peripheral);
        assert_eq!(advertisement.discoverable, Some(true));
        assert!(advertisement.system_includes.contains(&Feature::TxPower));
        assert_eq!(advertisement.local_name.as_deref(), Some("SdlTester"));
    }

    #[test]
    fn non_connectable_request_broadcasts_but_stays_discoverable() {
        let request = AdvertisingRequest {
            connectable: false,
            ..PeripheralConfig::default().advertising_request(Uuid::from_u128(0x1101))
        };
        let advertisement = le_advertisement(&request);
        assert_eq!(advertisement.advertisement_type, Type::Broadcast);
        assert_eq!(advertisement.discoverable, Some(true));
    }
}
