#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharacteristicProperty {
    Broadcast,
    Read,
    WriteWithoutResponse,
    Write,
    Notify,
    Indicate,
    AuthenticatedSignedWrites,
    ExtendedProperties,
    NotifyEncryptionRequired,
    IndicateEncryptionRequired,
}

impl CharacteristicProperty {
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            CharacteristicProperty::Write
                | CharacteristicProperty::WriteWithoutResponse
                | CharacteristicProperty::AuthenticatedSignedWrites
        )
    }

    pub fn is_notify(&self) -> bool {
        matches!(
            self,
            CharacteristicProperty::Notify
                | CharacteristicProperty::Indicate
                | CharacteristicProperty::NotifyEncryptionRequired
                | CharacteristicProperty::IndicateEncryptionRequired
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributePermission {
    Readable,
    Writeable,
    ReadEncryptionRequired,
    WriteEncryptionRequired,
}

impl AttributePermission {
    pub fn allows_read(&self) -> bool {
        matches!(
            self,
            AttributePermission::Readable | AttributePermission::ReadEncryptionRequired
        )
    }

    pub fn allows_write(&self) -> bool {
        matches!(
            self,
            AttributePermission::Writeable | AttributePermission::WriteEncryptionRequired
        )
    }
}
