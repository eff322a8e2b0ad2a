use super::{
    properties::{AttributePermission, CharacteristicProperty},
    uuids::{characteristic_user_description_uuid, client_characteristic_configuration_uuid},
};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    pub uuid: Uuid,
    pub properties: Vec<CharacteristicProperty>,
    pub permissions: Vec<AttributePermission>,
    pub value: Option<Vec<u8>>,
}

impl Descriptor {
    pub fn new(
        uuid: Uuid,
        properties: Vec<CharacteristicProperty>,
        permissions: Vec<AttributePermission>,
        value: Option<Vec<u8>>,
    ) -> Self {
        Descriptor {
            uuid,
            properties,
            permissions,
            value,
        }
    }

    /// Client characteristic configuration (0x2902), notifications off.
    pub fn client_characteristic_configuration() -> Self {
        Descriptor::new(
            client_characteristic_configuration_uuid(),
            vec![CharacteristicProperty::Read, CharacteristicProperty::Write],
            vec![
                AttributePermission::Readable,
                AttributePermission::Writeable,
            ],
            Some(vec![0, 0]),
        )
    }

    /// Characteristic user description (0x2901).
    pub fn user_description(text: &str) -> Self {
        Descriptor::new(
            characteristic_user_description_uuid(),
            vec![CharacteristicProperty::Read, CharacteristicProperty::Write],
            vec![
                AttributePermission::Readable,
                AttributePermission::Writeable,
            ],
            Some(text.as_bytes().to_vec()),
        )
    }

    pub fn is_client_configuration(&self) -> bool {
        self.uuid == client_characteristic_configuration_uuid()
    }

    pub fn is_user_description(&self) -> bool {
        self.uuid == characteristic_user_description_uuid()
    }

    pub fn is_readable(&self) -> bool {
        self.permissions.iter().any(|p| p.allows_read())
    }

    pub fn is_writable(&self) -> bool {
        self.permissions.iter().any(|p| p.allows_write())
    }
}

/// A descriptor is only addressable through the characteristic it hangs off,
/// since the same descriptor UUID (e.g. 0x2902) repeats across characteristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorId {
    pub characteristic: Uuid,
    pub descriptor: Uuid,
}

impl DescriptorId {
    pub fn new(characteristic: Uuid, descriptor: Uuid) -> Self {
        DescriptorId {
            characteristic,
            descriptor,
        }
    }
}
