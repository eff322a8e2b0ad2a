use crate::gatt::peripheral_event::PeripheralEvent;
use log::trace;
use std::time::Duration;
use tokio::{
    sync::mpsc::Sender,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use uuid::Uuid;

/// Arms recurring notification ticks. Each tick is posted onto the
/// peripheral's event queue so it is serialized with every other callback.
#[derive(Debug, Clone)]
pub struct Ticker {
    sender: Sender<PeripheralEvent>,
}

impl Ticker {
    pub fn new(sender: Sender<PeripheralEvent>) -> Self {
        Ticker { sender }
    }

    /// First tick fires one `period` after arming. Must be called from
    /// within a tokio runtime.
    pub fn arm(&self, characteristic: Uuid, epoch: u64, period: Duration) -> TickHandle {
        let sender = self.sender.clone();
        let task = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let event = PeripheralEvent::NotificationTick {
                    characteristic,
                    epoch,
                };
                if sender.send(event).await.is_err() {
                    trace!("Event queue closed, stopping ticks for {}", characteristic);
                    break;
                }
            }
        });
        TickHandle { task }
    }
}

/// Pending recurring tick. Dropping the handle cancels it.
#[derive(Debug)]
pub struct TickHandle {
    task: JoinHandle<()>,
}

impl TickHandle {
    pub fn cancel(self) {
        self.task.abort();
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
