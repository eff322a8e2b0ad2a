#![allow(dead_code)]

use async_trait::async_trait;
use gatt_router::{
    gatt::{central::Central, peripheral_event::PeripheralEvent, service::ServiceDescriptor},
    peripheral::server::event_channel,
    service::payload::decode_counter,
    AdvertisingRequest, Notifier, PeripheralConfig, PeripheralPlatform, PeripheralServer, Result,
};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::Sender;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct PlatformLog {
    pub notifications: Vec<(Uuid, Vec<u8>, Central)>,
    pub registered: Vec<Uuid>,
    pub advertised: Option<AdvertisingRequest>,
    pub removed_all: usize,
    pub stopped: usize,
}

/// In-memory platform that records every boundary call.
pub struct RecordingPlatform {
    log: Arc<Mutex<PlatformLog>>,
    sender: Sender<PeripheralEvent>,
    powered: bool,
}

impl RecordingPlatform {
    pub fn new(sender: Sender<PeripheralEvent>) -> Self {
        RecordingPlatform {
            log: Arc::default(),
            sender,
            powered: true,
        }
    }

    pub fn unpowered(sender: Sender<PeripheralEvent>) -> Self {
        RecordingPlatform {
            powered: false,
            ..RecordingPlatform::new(sender)
        }
    }

    pub fn log(&self) -> Arc<Mutex<PlatformLog>> {
        self.log.clone()
    }
}

impl Notifier for RecordingPlatform {
    fn notify(&self, characteristic: Uuid, payload: Vec<u8>, central: &Central) {
        self.log
            .lock()
            .unwrap()
            .notifications
            .push((characteristic, payload, central.clone()));
    }
}

#[async_trait]
impl PeripheralPlatform for RecordingPlatform {
    async fn is_powered(&self) -> Result<bool> {
        Ok(self.powered)
    }

    async fn remove_all_services(&mut self) -> Result<()> {
        self.log.lock().unwrap().removed_all += 1;
        Ok(())
    }

    async fn register_service(&mut self, service: &ServiceDescriptor) -> Result<()> {
        self.log.lock().unwrap().registered.push(service.uuid);
        let _ = self.sender.try_send(PeripheralEvent::DidAddService {
            service: service.uuid,
            error: None,
        });
        Ok(())
    }

    async fn advertise(&mut self, request: &AdvertisingRequest) -> Result<()> {
        self.log.lock().unwrap().advertised = Some(request.clone());
        let _ = self
            .sender
            .try_send(PeripheralEvent::DidStartAdvertising { error: None });
        Ok(())
    }

    async fn stop_advertising(&mut self) -> Result<()> {
        self.log.lock().unwrap().stopped += 1;
        let _ = self.sender.try_send(PeripheralEvent::DidStopAdvertising);
        Ok(())
    }
}

pub fn server() -> (PeripheralServer<RecordingPlatform>, Arc<Mutex<PlatformLog>>) {
    let config = PeripheralConfig::default();
    let (sender, receiver) = event_channel(&config);
    let platform = RecordingPlatform::new(sender.clone());
    let log = platform.log();
    (PeripheralServer::new(platform, config, sender, receiver), log)
}

/// (counter, central) of every notification sent so far.
pub fn sent_counters(log: &Arc<Mutex<PlatformLog>>) -> Vec<(u32, String)> {
    log.lock()
        .unwrap()
        .notifications
        .iter()
        .map(|(_, payload, central)| {
            (
                decode_counter(payload).expect("counter prefix"),
                central.to_string(),
            )
        })
        .collect()
}
