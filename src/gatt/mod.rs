pub mod central;
pub mod characteristic;
pub mod descriptor;
pub mod peripheral_event;
pub mod properties;
pub mod service;
pub mod status;
pub mod uuids;

pub use central::Central;
pub use characteristic::Characteristic;
pub use descriptor::{Descriptor, DescriptorId};
pub use peripheral_event::PeripheralEvent;
pub use properties::{AttributePermission, CharacteristicProperty};
pub use service::ServiceDescriptor;
pub use status::{GattStatus, NotifyOutcome};
