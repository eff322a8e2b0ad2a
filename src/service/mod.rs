pub mod lifecycle;
pub mod payload;
pub mod sdl;

use crate::{
    gatt::{
        central::Central, descriptor::DescriptorId, service::ServiceDescriptor,
        status::{GattStatus, NotifyOutcome},
    },
    notification::Ticker,
    peripheral::Notifier,
};
use log::trace;
use std::collections::BTreeSet;
use uuid::Uuid;

pub use lifecycle::NotificationLifecycle;
pub use payload::{PayloadSource, StaticPayload};
pub use sdl::{SdlService, SdlServiceConfig};

/// What a service may touch while handling one callback: the platform's
/// notify primitive, the tick timer and the peripheral-wide set of
/// connected centrals.
pub struct ServiceContext<'a> {
    notifier: &'a dyn Notifier,
    ticker: &'a Ticker,
    connected: &'a BTreeSet<Central>,
}

impl<'a> ServiceContext<'a> {
    pub fn new(
        notifier: &'a dyn Notifier,
        ticker: &'a Ticker,
        connected: &'a BTreeSet<Central>,
    ) -> Self {
        ServiceContext {
            notifier,
            ticker,
            connected,
        }
    }

    pub fn ticker(&self) -> &Ticker {
        self.ticker
    }

    pub fn has_connected_centrals(&self) -> bool {
        !self.connected.is_empty()
    }

    pub fn connected_centrals(&self) -> impl Iterator<Item = &Central> {
        self.connected.iter()
    }

    pub fn notify(&self, characteristic: Uuid, payload: Vec<u8>, central: &Central) {
        self.notifier.notify(characteristic, payload, central);
    }
}

/// One GATT service implementation.
///
/// Services that push notifications expose their [`NotificationLifecycle`]
/// and build payloads in [`Service::notification_payload`]; the provided
/// subscription, connection and tick handlers then drive the schedulers.
pub trait Service: Send {
    fn name(&self) -> &str;

    fn descriptor(&self) -> &ServiceDescriptor;

    fn on_read(&mut self, central: &Central, characteristic: Uuid) -> Result<Vec<u8>, GattStatus>;

    fn on_write(&mut self, central: &Central, characteristic: Uuid, value: &[u8]) -> GattStatus;

    fn on_descriptor_read(
        &mut self,
        _central: &Central,
        _descriptor: DescriptorId,
    ) -> Result<Vec<u8>, GattStatus> {
        Err(GattStatus::RequestNotSupported)
    }

    fn on_descriptor_write(
        &mut self,
        _central: &Central,
        _descriptor: DescriptorId,
        _value: &[u8],
    ) -> GattStatus {
        GattStatus::RequestNotSupported
    }

    fn notifications(&self) -> Option<&NotificationLifecycle> {
        None
    }

    fn notifications_mut(&mut self) -> Option<&mut NotificationLifecycle> {
        None
    }

    /// Full notification bytes for `counter` on `characteristic`.
    fn notification_payload(&mut self, _characteristic: Uuid, counter: u32) -> Vec<u8> {
        payload::encode_notification(counter, &[])
    }

    fn on_subscribe(&mut self, central: &Central, characteristic: Uuid, ctx: &ServiceContext<'_>) {
        let counter = self
            .notifications_mut()
            .and_then(|n| n.subscribe(central, characteristic, ctx));
        if let Some(counter) = counter {
            let subscribers = self
                .notifications()
                .map(|n| n.subscribers(&characteristic))
                .unwrap_or_default();
            self.send_notification(characteristic, counter, &subscribers, ctx);
        }
    }

    fn on_unsubscribe(&mut self, central: &Central, characteristic: Uuid, _ctx: &ServiceContext<'_>) {
        if let Some(notifications) = self.notifications_mut() {
            notifications.unsubscribe(central, characteristic);
        }
    }

    fn on_connect(&mut self, central: &Central, ctx: &ServiceContext<'_>) {
        trace!("{}: {} connected", self.name(), central);
        let resumed = self
            .notifications_mut()
            .map(|n| n.resume(ctx))
            .unwrap_or_default();
        for (characteristic, counter, subscribers) in resumed {
            self.send_notification(characteristic, counter, &subscribers, ctx);
        }
    }

    fn on_disconnect(&mut self, central: &Central, ctx: &ServiceContext<'_>) {
        if let Some(notifications) = self.notifications_mut() {
            notifications.disconnect(central, ctx);
        }
    }

    fn on_notification_sent(
        &mut self,
        central: &Central,
        characteristic: Uuid,
        outcome: &NotifyOutcome,
        _ctx: &ServiceContext<'_>,
    ) {
        if let Some(notifications) = self.notifications_mut() {
            notifications.notification_sent(central, characteristic, outcome);
        }
    }

    fn on_tick(&mut self, characteristic: Uuid, epoch: u64, ctx: &ServiceContext<'_>) {
        let tick = self
            .notifications_mut()
            .and_then(|n| n.tick(characteristic, epoch));
        if let Some((counter, subscribers)) = tick {
            self.send_notification(characteristic, counter, &subscribers, ctx);
        }
    }

    fn send_notification(
        &mut self,
        characteristic: Uuid,
        counter: u32,
        subscribers: &[Central],
        ctx: &ServiceContext<'_>,
    ) {
        let payload = self.notification_payload(characteristic, counter);
        trace!(
            "{}: notify #{} on {} to {} central(s)",
            self.name(),
            counter,
            characteristic,
            subscribers.len()
        );
        for central in subscribers {
            ctx.notify(characteristic, payload.clone(), central);
        }
    }
}
