use super::PeripheralPlatform;
use crate::{
    config::PeripheralConfig,
    gatt::{
        descriptor::DescriptorId, peripheral_event::PeripheralEvent, service::ServiceDescriptor,
    },
    notification::Ticker,
    router::{GattRequest, GattResponse, Router},
    service::Service,
    Error, ErrorType, Result,
};
use log::{debug, error, info, warn};
use tokio::sync::mpsc::{channel, Receiver, Sender};
use uuid::Uuid;

/// Owns the platform binding, the router and the tick timer, and pumps the
/// single callback queue.
pub struct PeripheralServer<P: PeripheralPlatform> {
    platform: P,
    router: Router,
    ticker: Ticker,
    config: PeripheralConfig,
    receiver: Receiver<PeripheralEvent>,
    primary_service: Option<Uuid>,
    advertising: bool,
    powered: bool,
}

/// Creates the callback queue a platform binding and its server share.
pub fn event_channel(config: &PeripheralConfig) -> (Sender<PeripheralEvent>, Receiver<PeripheralEvent>) {
    channel(config.event_queue_depth)
}

impl<P: PeripheralPlatform> PeripheralServer<P> {
    /// `sender` must feed `receiver`; the platform should hold a clone of
    /// the same sender.
    pub fn new(
        platform: P,
        config: PeripheralConfig,
        sender: Sender<PeripheralEvent>,
        receiver: Receiver<PeripheralEvent>,
    ) -> Self {
        PeripheralServer {
            platform,
            router: Router::new(),
            ticker: Ticker::new(sender),
            config,
            receiver,
            primary_service: None,
            advertising: false,
            powered: false,
        }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn is_advertising(&self) -> bool {
        self.advertising
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    /// Registers every service, publishes their GATT tables and starts
    /// advertising the first one.
    pub async fn start(&mut self, services: Vec<Box<dyn Service>>) -> Result<()> {
        if !self.platform.is_powered().await? {
            error!("Bluetooth adapter is not powered");
            return Err(Error::from_type(ErrorType::NotPowered));
        }
        self.powered = true;
        self.platform.remove_all_services().await?;

        for service in services {
            let uuid = service.descriptor().uuid;
            self.router.register(service)?;
            if self.primary_service.is_none() {
                self.primary_service = Some(uuid);
            }
        }
        let descriptors: Vec<ServiceDescriptor> = self
            .router
            .services()
            .map(|s| s.descriptor().clone())
            .collect();
        for descriptor in &descriptors {
            self.platform.register_service(descriptor).await?;
        }

        let primary = self.primary_service.ok_or_else(|| {
            Error::with_description(ErrorType::Registration, "no service to advertise")
        })?;
        let request = self.config.advertising_request(primary);
        self.platform.advertise(&request).await?;
        info!("Advertising {} as {:?}", primary, request.local_name);
        Ok(())
    }

    /// Processes callbacks until every sender is gone.
    pub async fn run(&mut self) -> Result<()> {
        while self.process_next().await {}
        debug!("Event queue closed");
        Ok(())
    }

    /// Waits for one callback and handles it. Returns false once the queue
    /// is closed.
    pub async fn process_next(&mut self) -> bool {
        match self.receiver.recv().await {
            Some(event) => {
                self.handle_event(event);
                true
            }
            None => false,
        }
    }

    /// Handles whatever is queued right now without waiting for more.
    pub fn drain(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.receiver.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        if self.advertising {
            self.platform.stop_advertising().await?;
            self.advertising = false;
        }
        Ok(())
    }

    pub fn handle_event(&mut self, event: PeripheralEvent) {
        match event {
            PeripheralEvent::DidUpdateState { is_powered } => {
                info!("Adapter powered: {}", is_powered);
                self.powered = is_powered;
            }
            PeripheralEvent::DidStartAdvertising { error: None } => {
                info!("Advertising started");
                self.advertising = true;
            }
            PeripheralEvent::DidStartAdvertising { error: Some(reason) } => {
                error!("Advertising failed: {}", reason);
                self.advertising = false;
            }
            PeripheralEvent::DidStopAdvertising => {
                info!("Advertising stopped");
                self.advertising = false;
            }
            PeripheralEvent::DidAddService { service, error } => match error {
                None => debug!("Service {} added", service),
                Some(reason) => error!("Adding service {} failed: {}", service, reason),
            },
            PeripheralEvent::DidConnect { client } => {
                info!("Central {} connected", client);
                self.dispatch(GattRequest::Connect { central: client });
            }
            PeripheralEvent::DidDisconnect { client } => {
                info!("Central {} disconnected", client);
                self.dispatch(GattRequest::Disconnect { central: client });
            }
            PeripheralEvent::DidSubscribeToCharacteristic {
                client,
                characteristic,
                ..
            } => {
                self.dispatch(GattRequest::Subscribe {
                    central: client,
                    characteristic,
                });
            }
            PeripheralEvent::DidUnsubscribeFromCharacteristic {
                client,
                characteristic,
                ..
            } => {
                self.dispatch(GattRequest::Unsubscribe {
                    central: client,
                    characteristic,
                });
            }
            PeripheralEvent::DidReceiveReadRequest {
                client,
                characteristic,
                responder,
                ..
            } => {
                let response = self
                    .dispatch(GattRequest::Read {
                        central: client,
                        characteristic,
                    })
                    .into_read();
                if responder.send(response).is_err() {
                    warn!("Read of {} abandoned by the platform", characteristic);
                }
            }
            PeripheralEvent::DidReceiveWriteRequest {
                client,
                characteristic,
                value,
                responder,
                ..
            } => {
                let status = self
                    .dispatch(GattRequest::Write {
                        central: client,
                        characteristic,
                        value,
                    })
                    .into_write();
                if responder.send(status).is_err() {
                    warn!("Write to {} abandoned by the platform", characteristic);
                }
            }
            PeripheralEvent::DidReceiveDescriptorReadRequest {
                client,
                characteristic,
                descriptor,
                responder,
                ..
            } => {
                let response = self
                    .dispatch(GattRequest::DescriptorRead {
                        central: client,
                        descriptor: DescriptorId::new(characteristic, descriptor),
                    })
                    .into_read();
                if responder.send(response).is_err() {
                    warn!("Descriptor read of {} abandoned by the platform", descriptor);
                }
            }
            PeripheralEvent::DidReceiveDescriptorWriteRequest {
                client,
                characteristic,
                descriptor,
                value,
                responder,
                ..
            } => {
                let status = self
                    .dispatch(GattRequest::DescriptorWrite {
                        central: client,
                        descriptor: DescriptorId::new(characteristic, descriptor),
                        value,
                    })
                    .into_write();
                if responder.send(status).is_err() {
                    warn!("Descriptor write to {} abandoned by the platform", descriptor);
                }
            }
            PeripheralEvent::DidSendNotification {
                client,
                characteristic,
                outcome,
                ..
            } => {
                self.dispatch(GattRequest::NotificationSent {
                    central: client,
                    characteristic,
                    outcome,
                });
            }
            PeripheralEvent::NotificationTick {
                characteristic,
                epoch,
            } => {
                self.dispatch(GattRequest::Tick {
                    characteristic,
                    epoch,
                });
            }
        }
    }

    fn dispatch(&mut self, request: GattRequest) -> GattResponse {
        self.router.dispatch(request, &self.platform, &self.ticker)
    }
}
