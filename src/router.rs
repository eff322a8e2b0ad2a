use crate::{
    gatt::{
        central::Central,
        descriptor::DescriptorId,
        status::{GattStatus, NotifyOutcome},
    },
    notification::Ticker,
    peripheral::Notifier,
    service::{Service, ServiceContext},
    Error, ErrorType, Result,
};
use log::{debug, info, warn};
use std::collections::{BTreeSet, HashMap, HashSet};
use uuid::Uuid;

/// One inbound GATT operation, already stripped of platform types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GattRequest {
    Read {
        central: Central,
        characteristic: Uuid,
    },
    Write {
        central: Central,
        characteristic: Uuid,
        value: Vec<u8>,
    },
    DescriptorRead {
        central: Central,
        descriptor: DescriptorId,
    },
    DescriptorWrite {
        central: Central,
        descriptor: DescriptorId,
        value: Vec<u8>,
    },
    Subscribe {
        central: Central,
        characteristic: Uuid,
    },
    Unsubscribe {
        central: Central,
        characteristic: Uuid,
    },
    NotificationSent {
        central: Central,
        characteristic: Uuid,
        outcome: NotifyOutcome,
    },
    Connect {
        central: Central,
    },
    Disconnect {
        central: Central,
    },
    Tick {
        characteristic: Uuid,
        epoch: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GattResponse {
    Value(Vec<u8>),
    Status(GattStatus),
    Done,
}

impl GattResponse {
    pub fn into_read(self) -> std::result::Result<Vec<u8>, GattStatus> {
        match self {
            GattResponse::Value(value) => Ok(value),
            GattResponse::Status(status) => Err(status),
            GattResponse::Done => Err(GattStatus::UnlikelyError),
        }
    }

    pub fn into_write(self) -> GattStatus {
        match self {
            GattResponse::Status(status) => status,
            GattResponse::Value(_) | GattResponse::Done => GattStatus::UnlikelyError,
        }
    }
}

/// Service registry and callback router.
///
/// Services live in an arena in registration order. Registration builds the
/// characteristic → service index and the characteristic → declared
/// descriptor sets; after startup both are only read.
#[derive(Default)]
pub struct Router {
    services: Vec<Box<dyn Service>>,
    by_service: HashMap<Uuid, usize>,
    by_characteristic: HashMap<Uuid, usize>,
    descriptors: HashMap<Uuid, HashSet<Uuid>>,
    connected: BTreeSet<Central>,
}

impl Router {
    pub fn new() -> Self {
        Router::default()
    }

    /// Adds a service. On error the router is left unchanged.
    pub fn register(&mut self, service: Box<dyn Service>) -> Result<()> {
        let descriptor = service.descriptor();
        if self.by_service.contains_key(&descriptor.uuid) {
            return Err(Error::with_description(
                ErrorType::DuplicateService,
                format!("service {} is already registered", descriptor.uuid),
            ));
        }

        let mut claimed = HashSet::new();
        for characteristic in &descriptor.characteristics {
            if self.by_characteristic.contains_key(&characteristic.uuid)
                || !claimed.insert(characteristic.uuid)
            {
                return Err(Error::with_description(
                    ErrorType::ConflictingCharacteristic,
                    format!(
                        "characteristic {} of service {} is already owned",
                        characteristic.uuid, descriptor.uuid
                    ),
                ));
            }
        }

        let index = self.services.len();
        self.by_service.insert(descriptor.uuid, index);
        for characteristic in &descriptor.characteristics {
            self.by_characteristic.insert(characteristic.uuid, index);
            self.descriptors.insert(
                characteristic.uuid,
                characteristic.descriptors.iter().map(|d| d.uuid).collect(),
            );
        }
        info!(
            "Registered {} ({}) with {} characteristic(s)",
            service.name(),
            descriptor.uuid,
            descriptor.characteristics.len()
        );
        self.services.push(service);
        Ok(())
    }

    /// Services in registration order.
    pub fn services(&self) -> impl Iterator<Item = &dyn Service> {
        self.services.iter().map(|s| s.as_ref())
    }

    pub fn service(&self, uuid: &Uuid) -> Option<&dyn Service> {
        self.by_service.get(uuid).map(|&i| self.services[i].as_ref())
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn connected_centrals(&self) -> impl Iterator<Item = &Central> {
        self.connected.iter()
    }

    pub fn resolve(&self, characteristic: &Uuid) -> Result<&dyn Service> {
        self.owner(characteristic).map(|i| self.services[i].as_ref())
    }

    /// Descriptor → characteristic → service. Missing either hop is
    /// `UnknownCharacteristic`.
    pub fn resolve_descriptor(&self, descriptor: &DescriptorId) -> Result<&dyn Service> {
        self.descriptor_owner(descriptor)
            .map(|i| self.services[i].as_ref())
    }

    fn owner(&self, characteristic: &Uuid) -> Result<usize> {
        self.by_characteristic
            .get(characteristic)
            .copied()
            .ok_or_else(|| {
                Error::with_description(
                    ErrorType::UnknownCharacteristic,
                    format!("no service owns characteristic {}", characteristic),
                )
            })
    }

    fn descriptor_owner(&self, descriptor: &DescriptorId) -> Result<usize> {
        let declared = self
            .descriptors
            .get(&descriptor.characteristic)
            .is_some_and(|set| set.contains(&descriptor.descriptor));
        if !declared {
            return Err(Error::with_description(
                ErrorType::UnknownCharacteristic,
                format!(
                    "descriptor {} is not declared on characteristic {}",
                    descriptor.descriptor, descriptor.characteristic
                ),
            ));
        }
        self.owner(&descriptor.characteristic)
    }

    pub fn dispatch(
        &mut self,
        request: GattRequest,
        notifier: &dyn Notifier,
        ticker: &Ticker,
    ) -> GattResponse {
        match request {
            GattRequest::Connect { central } => {
                if !self.connected.insert(central.clone()) {
                    debug!("{} connected twice", central);
                }
                let ctx = ServiceContext::new(notifier, ticker, &self.connected);
                for service in self.services.iter_mut() {
                    service.on_connect(&central, &ctx);
                }
                GattResponse::Done
            }
            GattRequest::Disconnect { central } => {
                if !self.connected.remove(&central) {
                    debug!("Disconnect from unknown central {}", central);
                }
                let ctx = ServiceContext::new(notifier, ticker, &self.connected);
                for service in self.services.iter_mut() {
                    service.on_disconnect(&central, &ctx);
                }
                GattResponse::Done
            }
            GattRequest::Read {
                central,
                characteristic,
            } => match self.owner(&characteristic) {
                Ok(i) => match self.services[i].on_read(&central, characteristic) {
                    Ok(value) => GattResponse::Value(value),
                    Err(status) => GattResponse::Status(status),
                },
                Err(err) => not_supported(err),
            },
            GattRequest::Write {
                central,
                characteristic,
                value,
            } => match self.owner(&characteristic) {
                Ok(i) => {
                    GattResponse::Status(self.services[i].on_write(&central, characteristic, &value))
                }
                Err(err) => not_supported(err),
            },
            GattRequest::DescriptorRead {
                central,
                descriptor,
            } => match self.descriptor_owner(&descriptor) {
                Ok(i) => match self.services[i].on_descriptor_read(&central, descriptor) {
                    Ok(value) => GattResponse::Value(value),
                    Err(status) => GattResponse::Status(status),
                },
                Err(err) => not_supported(err),
            },
            GattRequest::DescriptorWrite {
                central,
                descriptor,
                value,
            } => match self.descriptor_owner(&descriptor) {
                Ok(i) => GattResponse::Status(
                    self.services[i].on_descriptor_write(&central, descriptor, &value),
                ),
                Err(err) => not_supported(err),
            },
            GattRequest::Subscribe {
                central,
                characteristic,
            } => match self.owner(&characteristic) {
                Ok(i) => {
                    let ctx = ServiceContext::new(notifier, ticker, &self.connected);
                    self.services[i].on_subscribe(&central, characteristic, &ctx);
                    GattResponse::Done
                }
                Err(err) => not_supported(err),
            },
            GattRequest::Unsubscribe {
                central,
                characteristic,
            } => match self.owner(&characteristic) {
                Ok(i) => {
                    let ctx = ServiceContext::new(notifier, ticker, &self.connected);
                    self.services[i].on_unsubscribe(&central, characteristic, &ctx);
                    GattResponse::Done
                }
                Err(err) => not_supported(err),
            },
            GattRequest::NotificationSent {
                central,
                characteristic,
                outcome,
            } => match self.owner(&characteristic) {
                Ok(i) => {
                    let ctx = ServiceContext::new(notifier, ticker, &self.connected);
                    self.services[i].on_notification_sent(&central, characteristic, &outcome, &ctx);
                    GattResponse::Done
                }
                Err(err) => not_supported(err),
            },
            GattRequest::Tick {
                characteristic,
                epoch,
            } => match self.owner(&characteristic) {
                Ok(i) => {
                    let ctx = ServiceContext::new(notifier, ticker, &self.connected);
                    self.services[i].on_tick(characteristic, epoch, &ctx);
                    GattResponse::Done
                }
                Err(err) => not_supported(err),
            },
        }
    }
}

fn not_supported(err: Error) -> GattResponse {
    warn!("{}", err);
    GattResponse::Status(GattStatus::RequestNotSupported)
}
