use super::characteristic::Characteristic;
use uuid::Uuid;

/// GATT table entry for one service. Immutable once registered; only the
/// characteristic values change afterwards, and only through the owning
/// service implementation.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDescriptor {
    pub uuid: Uuid,
    pub primary: bool,
    pub characteristics: Vec<Characteristic>,
}

impl ServiceDescriptor {
    pub fn new(uuid: Uuid, primary: bool, characteristics: Vec<Characteristic>) -> Self {
        ServiceDescriptor {
            uuid,
            primary,
            characteristics,
        }
    }

    pub fn characteristic(&self, uuid: &Uuid) -> Option<&Characteristic> {
        self.characteristics.iter().find(|c| c.uuid == *uuid)
    }

    pub fn characteristic_mut(&mut self, uuid: &Uuid) -> Option<&mut Characteristic> {
        self.characteristics.iter_mut().find(|c| c.uuid == *uuid)
    }
}
