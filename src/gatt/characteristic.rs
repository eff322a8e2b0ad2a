use super::{
    descriptor::Descriptor,
    properties::{AttributePermission, CharacteristicProperty},
    status::GattStatus,
};
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct Characteristic {
    pub uuid: Uuid,
    pub properties: Vec<CharacteristicProperty>,
    pub permissions: Vec<AttributePermission>,
    pub value: Option<Vec<u8>>,
    pub descriptors: Vec<Descriptor>,
    /// Longest value a central may write.
    pub max_length: Option<usize>,
    /// Period of the recurring notification while subscribed.
    pub notify_interval: Option<Duration>,
}

impl Characteristic {
    pub fn new(
        uuid: Uuid,
        properties: Vec<CharacteristicProperty>,
        permissions: Vec<AttributePermission>,
        value: Option<Vec<u8>>,
        descriptors: Vec<Descriptor>,
    ) -> Self {
        Characteristic {
            uuid,
            properties,
            permissions,
            value,
            descriptors,
            max_length: None,
            notify_interval: None,
        }
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn with_notify_interval(mut self, interval: Duration) -> Self {
        self.notify_interval = Some(interval);
        self
    }

    pub fn is_readable(&self) -> bool {
        self.properties.contains(&CharacteristicProperty::Read)
    }

    pub fn is_writable(&self) -> bool {
        self.properties.iter().any(|p| p.is_write())
    }

    pub fn is_notify_capable(&self) -> bool {
        self.properties.iter().any(|p| p.is_notify())
    }

    pub fn descriptor(&self, uuid: &Uuid) -> Option<&Descriptor> {
        self.descriptors.iter().find(|d| d.uuid == *uuid)
    }

    pub fn descriptor_mut(&mut self, uuid: &Uuid) -> Option<&mut Descriptor> {
        self.descriptors.iter_mut().find(|d| d.uuid == *uuid)
    }

    /// Checks a write against the declared constraints without storing it.
    pub fn check_write(&self, value: &[u8]) -> GattStatus {
        if !self.is_writable() {
            return GattStatus::WriteNotPermitted;
        }
        match self.max_length {
            Some(max) if value.len() > max => GattStatus::InvalidLength,
            _ => GattStatus::Success,
        }
    }
}
