use super::ServiceContext;
use crate::{
    gatt::{central::Central, service::ServiceDescriptor, status::NotifyOutcome},
    notification::{MessageCounter, NotificationScheduler, SchedulerState},
};
use log::{debug, warn};
use std::{
    collections::{BTreeSet, HashMap},
    time::Duration,
};
use uuid::Uuid;

#[derive(Debug)]
struct NotifyingCharacteristic {
    subscribers: BTreeSet<Central>,
    scheduler: NotificationScheduler,
}

/// Subscriber sets and schedulers for every notify-capable characteristic
/// of one service.
///
/// A scheduler is Active only while its characteristic has at least one
/// subscriber and the peripheral has at least one connected central.
#[derive(Debug, Default)]
pub struct NotificationLifecycle {
    characteristics: HashMap<Uuid, NotifyingCharacteristic>,
}

impl NotificationLifecycle {
    /// `default_interval` applies to notify-capable characteristics that do
    /// not declare their own.
    pub fn for_service(descriptor: &ServiceDescriptor, default_interval: Duration) -> Self {
        let characteristics = descriptor
            .characteristics
            .iter()
            .filter(|c| c.is_notify_capable())
            .map(|c| {
                let interval = c.notify_interval.unwrap_or(default_interval);
                (
                    c.uuid,
                    NotifyingCharacteristic {
                        subscribers: BTreeSet::new(),
                        scheduler: NotificationScheduler::new(c.uuid, interval),
                    },
                )
            })
            .collect();
        NotificationLifecycle { characteristics }
    }

    /// Seeds the counter of one characteristic, e.g. to exercise wraparound.
    pub fn with_counter(mut self, characteristic: Uuid, counter: MessageCounter) -> Self {
        if let Some(entry) = self.characteristics.get_mut(&characteristic) {
            entry.scheduler = NotificationScheduler::with_counter(
                characteristic,
                entry.scheduler.interval(),
                counter,
            );
        }
        self
    }

    pub fn scheduler(&self, characteristic: &Uuid) -> Option<&NotificationScheduler> {
        self.characteristics.get(characteristic).map(|e| &e.scheduler)
    }

    pub fn state(&self, characteristic: &Uuid) -> Option<SchedulerState> {
        self.scheduler(characteristic).map(|s| s.state())
    }

    pub fn subscribers(&self, characteristic: &Uuid) -> Vec<Central> {
        self.characteristics
            .get(characteristic)
            .map(|e| e.subscribers.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Adds `central` to the subscriber set. Returns the counter of the
    /// immediate notification when this moved the scheduler Idle → Active.
    pub fn subscribe(
        &mut self,
        central: &Central,
        characteristic: Uuid,
        ctx: &ServiceContext<'_>,
    ) -> Option<u32> {
        let Some(entry) = self.characteristics.get_mut(&characteristic) else {
            warn!("{} subscribed to non-notifying {}", central, characteristic);
            return None;
        };
        entry.subscribers.insert(central.clone());
        if !ctx.has_connected_centrals() {
            debug!(
                "{} subscribed to {} with no central connected, staying idle",
                central, characteristic
            );
            return None;
        }
        entry.scheduler.activate(ctx.ticker())
    }

    /// Activates every Idle characteristic that kept subscribers while no
    /// central was connected. Returns the immediate notifications to send.
    pub fn resume(&mut self, ctx: &ServiceContext<'_>) -> Vec<(Uuid, u32, Vec<Central>)> {
        if !ctx.has_connected_centrals() {
            return vec![];
        }
        self.characteristics
            .iter_mut()
            .filter(|(_, e)| !e.subscribers.is_empty())
            .filter_map(|(uuid, e)| {
                let counter = e.scheduler.activate(ctx.ticker())?;
                debug!("Resuming notifications on {}", uuid);
                Some((*uuid, counter, e.subscribers.iter().cloned().collect()))
            })
            .collect()
    }

    /// Returns true when the last subscriber left and the scheduler went Idle.
    pub fn unsubscribe(&mut self, central: &Central, characteristic: Uuid) -> bool {
        let Some(entry) = self.characteristics.get_mut(&characteristic) else {
            return false;
        };
        entry.subscribers.remove(central);
        entry.subscribers.is_empty() && entry.scheduler.deactivate()
    }

    /// Purges `central` from every subscriber set. Once no central is
    /// connected every scheduler goes Idle whatever the subscriber sets hold.
    pub fn disconnect(&mut self, central: &Central, ctx: &ServiceContext<'_>) {
        for entry in self.characteristics.values_mut() {
            if entry.subscribers.remove(central) && entry.subscribers.is_empty() {
                entry.scheduler.deactivate();
            }
        }
        if !ctx.has_connected_centrals() {
            self.force_idle();
        }
    }

    pub fn force_idle(&mut self) {
        for entry in self.characteristics.values_mut() {
            entry.scheduler.deactivate();
        }
    }

    /// Advances the counter for a live tick and returns it with the
    /// centrals to notify.
    pub fn tick(&mut self, characteristic: Uuid, epoch: u64) -> Option<(u32, Vec<Central>)> {
        let entry = self.characteristics.get_mut(&characteristic)?;
        let counter = entry.scheduler.tick(epoch)?;
        Some((counter, entry.subscribers.iter().cloned().collect()))
    }

    pub fn notification_sent(&mut self, central: &Central, characteristic: Uuid, outcome: &NotifyOutcome) {
        let Some(entry) = self.characteristics.get_mut(&characteristic) else {
            return;
        };
        if !entry.subscribers.contains(central) {
            debug!(
                "Notify completion for {} on {} after it left",
                central, characteristic
            );
            return;
        }
        entry.scheduler.record_outcome(outcome);
    }
}
