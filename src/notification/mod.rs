pub mod counter;
pub mod scheduler;
pub mod ticker;

pub use counter::MessageCounter;
pub use scheduler::{NotificationScheduler, SchedulerState};
pub use ticker::{TickHandle, Ticker};
