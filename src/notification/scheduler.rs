use super::{
    counter::MessageCounter,
    ticker::{TickHandle, Ticker},
};
use crate::{gatt::status::NotifyOutcome, Error, ErrorType};
use log::{debug, trace, warn};
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Active,
}

/// Idle/Active state machine that paces the notifications of one
/// characteristic.
///
/// Every Active period gets a fresh epoch; ticks armed in an earlier period
/// carry the old epoch and are dropped, as are ticks that arrive while Idle.
/// The message counter survives every transition.
#[derive(Debug)]
pub struct NotificationScheduler {
    characteristic: Uuid,
    interval: Duration,
    state: SchedulerState,
    counter: MessageCounter,
    epoch: u64,
    pending: Option<TickHandle>,
    delivered: u64,
    failed: u64,
    last_failure: Option<Error>,
}

impl NotificationScheduler {
    pub fn new(characteristic: Uuid, interval: Duration) -> Self {
        Self::with_counter(characteristic, interval, MessageCounter::default())
    }

    pub fn with_counter(characteristic: Uuid, interval: Duration, counter: MessageCounter) -> Self {
        NotificationScheduler {
            characteristic,
            interval,
            state: SchedulerState::Idle,
            counter,
            epoch: 0,
            pending: None,
            delivered: 0,
            failed: 0,
            last_failure: None,
        }
    }

    pub fn characteristic(&self) -> Uuid {
        self.characteristic
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SchedulerState::Active
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Last counter value handed out.
    pub fn counter(&self) -> u32 {
        self.counter.current()
    }

    pub fn has_pending_tick(&self) -> bool {
        self.pending.is_some()
    }

    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }

    pub fn last_failure(&self) -> Option<&Error> {
        self.last_failure.as_ref()
    }

    /// Idle → Active. Arms the recurring tick and returns the counter for
    /// the immediate notification, or `None` when already Active.
    pub fn activate(&mut self, ticker: &Ticker) -> Option<u32> {
        if self.is_active() {
            return None;
        }
        self.epoch = self.epoch.wrapping_add(1);
        self.state = SchedulerState::Active;
        self.pending = Some(ticker.arm(self.characteristic, self.epoch, self.interval));
        debug!(
            "Notifications for {} active (epoch {}, every {:?})",
            self.characteristic, self.epoch, self.interval
        );
        Some(self.counter.advance())
    }

    /// Active → Idle. Cancels the pending tick; returns whether a transition
    /// happened.
    pub fn deactivate(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        if let Some(pending) = self.pending.take() {
            pending.cancel();
        }
        self.state = SchedulerState::Idle;
        debug!("Notifications for {} idle", self.characteristic);
        true
    }

    /// Active → Active. Returns the counter for this tick's notification.
    pub fn tick(&mut self, epoch: u64) -> Option<u32> {
        if !self.is_active() || epoch != self.epoch {
            trace!(
                "Dropping stale tick for {} (epoch {}, current {}, {:?})",
                self.characteristic,
                epoch,
                self.epoch,
                self.state
            );
            return None;
        }
        Some(self.counter.advance())
    }

    pub fn record_outcome(&mut self, outcome: &NotifyOutcome) {
        if !self.is_active() {
            trace!(
                "Ignoring notify completion for idle characteristic {}",
                self.characteristic
            );
            return;
        }
        match outcome {
            NotifyOutcome::Delivered => self.delivered += 1,
            NotifyOutcome::Failed(reason) => {
                self.failed += 1;
                let err = Error::with_description(
                    ErrorType::NotifyFailed,
                    format!("notification on {} failed: {}", self.characteristic, reason),
                );
                warn!("{} ({} so far)", err, self.failed);
                self.last_failure = Some(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::channel;

    const INTERVAL: Duration = Duration::from_millis(500);

    fn scheduler() -> NotificationScheduler {
        NotificationScheduler::new(Uuid::from_u128(0x1102), INTERVAL)
    }

    #[tokio::test(start_paused = true)]
    async fn starts_idle() {
        let scheduler = scheduler();
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert!(!scheduler.has_pending_tick());
        assert_eq!(scheduler.counter(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn activate_arms_tick_and_yields_first_counter() {
        let (tx, _rx) = channel(8);
        let ticker = Ticker::new(tx);
        let mut scheduler = scheduler();

        assert_eq!(scheduler.activate(&ticker), Some(1));
        assert!(scheduler.is_active());
        assert!(scheduler.has_pending_tick());
        assert_eq!(scheduler.activate(&ticker), None);
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_are_strictly_increasing() {
        let (tx, _rx) = channel(8);
        let ticker = Ticker::new(tx);
        let mut scheduler = scheduler();
        scheduler.activate(&ticker);
        let epoch = scheduler.epoch();

        let counters: Vec<u32> = (0..5).filter_map(|_| scheduler.tick(epoch)).collect();
        assert_eq!(counters, vec![2, 3, 4, 5, 6]);
    }

    #[tokio::test(start_paused = true)]
    async fn deactivate_cancels_and_drops_later_ticks() {
        let (tx, _rx) = channel(8);
        let ticker = Ticker::new(tx);
        let mut scheduler = scheduler();
        scheduler.activate(&ticker);
        let epoch = scheduler.epoch();

        assert!(scheduler.deactivate());
        assert!(!scheduler.has_pending_tick());
        assert_eq!(scheduler.tick(epoch), None);
        assert_eq!(scheduler.counter(), 1);
        assert!(!scheduler.deactivate());
    }

    #[tokio::test(start_paused = true)]
    async fn tick_from_previous_period_is_ignored() {
        let (tx, _rx) = channel(8);
        let ticker = Ticker::new(tx);
        let mut scheduler = scheduler();
        scheduler.activate(&ticker);
        let old_epoch = scheduler.epoch();
        scheduler.deactivate();

        assert_eq!(scheduler.activate(&ticker), Some(2));
        assert_eq!(scheduler.tick(old_epoch), None);
        assert_eq!(scheduler.tick(scheduler.epoch()), Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn counter_wraps_across_ticks() {
        let (tx, _rx) = channel(8);
        let ticker = Ticker::new(tx);
        let mut scheduler = NotificationScheduler::with_counter(
            Uuid::from_u128(0x1102),
            INTERVAL,
            MessageCounter::starting_at(u32::MAX - 1),
        );
        assert_eq!(scheduler.activate(&ticker), Some(u32::MAX));
        assert_eq!(scheduler.tick(scheduler.epoch()), Some(0));
        assert_eq!(scheduler.tick(scheduler.epoch()), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_notify_is_counted_and_scheduler_stays_active() {
        let (tx, _rx) = channel(8);
        let ticker = Ticker::new(tx);
        let mut scheduler = scheduler();
        scheduler.activate(&ticker);

        scheduler.record_outcome(&NotifyOutcome::Failed("gatt busy".into()));
        scheduler.record_outcome(&NotifyOutcome::Delivered);
        assert_eq!(scheduler.failed(), 1);
        assert_eq!(scheduler.delivered(), 1);
        let failure = scheduler.last_failure().unwrap();
        assert_eq!(failure.error_type, ErrorType::NotifyFailed);
        assert!(failure.description.ends_with("gatt busy"));
        assert!(scheduler.is_active());
        assert_eq!(scheduler.tick(scheduler.epoch()), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn completion_while_idle_is_a_no_op() {
        let mut scheduler = scheduler();
        scheduler.record_outcome(&NotifyOutcome::Failed("late".into()));
        assert_eq!(scheduler.failed(), 0);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }
}
