use uuid::Uuid;

/// Bluetooth base UUID `00000000-0000-1000-8000-00805f9b34fb`.
pub const BLUETOOTH_BASE_UUID: u128 = 0x00000000_0000_1000_8000_00805f9b34fb;

pub const CHARACTERISTIC_USER_DESCRIPTION: u16 = 0x2901;
pub const CLIENT_CHARACTERISTIC_CONFIGURATION: u16 = 0x2902;

pub trait SdpShortUuid<T: Into<u32>> {
    fn from_sdp_short_uuid(uuid: T) -> Self;
}

impl<T: Into<u32>> SdpShortUuid<T> for Uuid {
    fn from_sdp_short_uuid(uuid: T) -> Self {
        let uuid: u32 = uuid.into();
        Uuid::from_u128(BLUETOOTH_BASE_UUID | ((uuid as u128) << 96))
    }
}

pub fn client_characteristic_configuration_uuid() -> Uuid {
    Uuid::from_sdp_short_uuid(CLIENT_CHARACTERISTIC_CONFIGURATION)
}

pub fn characteristic_user_description_uuid() -> Uuid {
    Uuid::from_sdp_short_uuid(CHARACTERISTIC_USER_DESCRIPTION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_uuid_expands_onto_base() {
        let uuid = Uuid::from_sdp_short_uuid(0x1101_u16);
        assert_eq!(uuid.to_string(), "00001101-0000-1000-8000-00805f9b34fb");
    }

    #[test]
    fn cccd_uuid() {
        assert_eq!(
            client_characteristic_configuration_uuid().to_string(),
            "00002902-0000-1000-8000-00805f9b34fb"
        );
    }
}
