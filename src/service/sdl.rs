use super::{
    lifecycle::NotificationLifecycle,
    payload::{encode_notification, PayloadSource, StaticPayload},
    Service,
};
use crate::gatt::{
    central::Central,
    characteristic::Characteristic,
    descriptor::{Descriptor, DescriptorId},
    properties::{AttributePermission, CharacteristicProperty},
    service::ServiceDescriptor,
    status::GattStatus,
    uuids::SdpShortUuid,
};
use log::{debug, info, warn};
use std::time::Duration;
use uuid::Uuid;

pub const SDL_SERVICE: u16 = 0x1101;
pub const MOBILE_NOTIFICATION: u16 = 0x1102;
pub const MOBILE_REQUEST: u16 = 0x1103;
pub const MOBILE_RESPONSE: u16 = 0x1104;

const NOTIFICATION_DESCRIPTION: &str = "Notifications to SDL.";
const INITIAL_NOTIFICATION_VALUE: [u8; 2] = [0x00, 0x40];
pub const PLACEHOLDER_PAYLOAD: &[u8] = b"too long fake string string again";
/// Largest attribute value ATT allows.
pub const MAX_ATTRIBUTE_LENGTH: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdlServiceConfig {
    pub notification_interval: Duration,
    pub max_response_length: usize,
}

impl Default for SdlServiceConfig {
    fn default() -> Self {
        SdlServiceConfig {
            notification_interval: Duration::from_secs(1),
            max_response_length: MAX_ATTRIBUTE_LENGTH,
        }
    }
}

/// SDL tester service: one notifying characteristic that pushes the
/// message counter, one readable "request" characteristic holding the
/// latest business payload, one writable "response" characteristic.
pub struct SdlService {
    descriptor: ServiceDescriptor,
    notifications: NotificationLifecycle,
    payload: Box<dyn PayloadSource>,
}

impl SdlService {
    pub fn new(config: SdlServiceConfig) -> Self {
        let descriptor = Self::build_descriptor(&config);
        let notifications =
            NotificationLifecycle::for_service(&descriptor, config.notification_interval);
        SdlService {
            descriptor,
            notifications,
            payload: Box::new(StaticPayload::new(PLACEHOLDER_PAYLOAD)),
        }
    }

    pub fn with_payload_source(mut self, payload: Box<dyn PayloadSource>) -> Self {
        self.payload = payload;
        self
    }

    pub fn service_uuid() -> Uuid {
        Uuid::from_sdp_short_uuid(SDL_SERVICE)
    }

    pub fn notification_uuid() -> Uuid {
        Uuid::from_sdp_short_uuid(MOBILE_NOTIFICATION)
    }

    pub fn request_uuid() -> Uuid {
        Uuid::from_sdp_short_uuid(MOBILE_REQUEST)
    }

    pub fn response_uuid() -> Uuid {
        Uuid::from_sdp_short_uuid(MOBILE_RESPONSE)
    }

    fn build_descriptor(config: &SdlServiceConfig) -> ServiceDescriptor {
        let notification = Characteristic::new(
            Self::notification_uuid(),
            vec![CharacteristicProperty::Notify],
            vec![],
            Some(INITIAL_NOTIFICATION_VALUE.to_vec()),
            vec![
                Descriptor::client_characteristic_configuration(),
                Descriptor::user_description(NOTIFICATION_DESCRIPTION),
            ],
        )
        .with_notify_interval(config.notification_interval);

        let request = Characteristic::new(
            Self::request_uuid(),
            vec![CharacteristicProperty::Read],
            vec![AttributePermission::Readable],
            None,
            vec![],
        );

        let response = Characteristic::new(
            Self::response_uuid(),
            vec![CharacteristicProperty::Write],
            vec![AttributePermission::Writeable],
            None,
            vec![],
        )
        .with_max_length(config.max_response_length);

        ServiceDescriptor::new(
            Self::service_uuid(),
            true,
            vec![notification, request, response],
        )
    }

    /// The platform owns the client configuration descriptor and reports
    /// its changes as subscribe and unsubscribe callbacks, so a write routed
    /// here is refused rather than stored out of step with the subscriptions.
    fn check_descriptor_write(descriptor: &Descriptor, value: &[u8]) -> GattStatus {
        if descriptor.is_client_configuration() {
            return GattStatus::RequestNotSupported;
        }
        if !descriptor.is_writable() {
            return GattStatus::WriteNotPermitted;
        }
        if descriptor.is_user_description() {
            if value.len() > MAX_ATTRIBUTE_LENGTH {
                return GattStatus::InvalidLength;
            }
            if std::str::from_utf8(value).is_err() {
                return GattStatus::ValueNotAllowed;
            }
        }
        GattStatus::Success
    }
}

impl Default for SdlService {
    fn default() -> Self {
        SdlService::new(SdlServiceConfig::default())
    }
}

impl Service for SdlService {
    fn name(&self) -> &str {
        "SdlService"
    }

    fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    fn on_read(&mut self, central: &Central, characteristic: Uuid) -> Result<Vec<u8>, GattStatus> {
        let characteristic = self
            .descriptor
            .characteristic(&characteristic)
            .ok_or(GattStatus::RequestNotSupported)?;
        if !characteristic.is_readable() {
            return Err(GattStatus::ReadNotPermitted);
        }
        debug!("{} read {}", central, characteristic.uuid);
        Ok(characteristic.value.clone().unwrap_or_default())
    }

    fn on_write(&mut self, central: &Central, characteristic: Uuid, value: &[u8]) -> GattStatus {
        let Some(characteristic) = self.descriptor.characteristic_mut(&characteristic) else {
            return GattStatus::RequestNotSupported;
        };
        let status = characteristic.check_write(value);
        if !status.is_success() {
            warn!(
                "Rejected {}-byte write from {} to {}: {:?}",
                value.len(),
                central,
                characteristic.uuid,
                status
            );
            return status;
        }
        info!(
            "{} wrote {} bytes to {}",
            central,
            value.len(),
            characteristic.uuid
        );
        characteristic.value = Some(value.to_vec());
        GattStatus::Success
    }

    fn on_descriptor_read(
        &mut self,
        _central: &Central,
        descriptor: DescriptorId,
    ) -> Result<Vec<u8>, GattStatus> {
        let descriptor = self
            .descriptor
            .characteristic(&descriptor.characteristic)
            .and_then(|c| c.descriptor(&descriptor.descriptor))
            .ok_or(GattStatus::RequestNotSupported)?;
        if !descriptor.is_readable() {
            return Err(GattStatus::ReadNotPermitted);
        }
        Ok(descriptor.value.clone().unwrap_or_default())
    }

    fn on_descriptor_write(
        &mut self,
        central: &Central,
        descriptor: DescriptorId,
        value: &[u8],
    ) -> GattStatus {
        let Some(target) = self
            .descriptor
            .characteristic_mut(&descriptor.characteristic)
            .and_then(|c| c.descriptor_mut(&descriptor.descriptor))
        else {
            return GattStatus::RequestNotSupported;
        };
        let status = Self::check_descriptor_write(target, value);
        if status.is_success() {
            target.value = Some(value.to_vec());
        } else {
            warn!(
                "Rejected descriptor write from {} to {:?}: {:?}",
                central, descriptor, status
            );
        }
        status
    }

    fn notifications(&self) -> Option<&NotificationLifecycle> {
        Some(&self.notifications)
    }

    fn notifications_mut(&mut self) -> Option<&mut NotificationLifecycle> {
        Some(&mut self.notifications)
    }

    fn notification_payload(&mut self, characteristic: Uuid, counter: u32) -> Vec<u8> {
        let business = self.payload.next_payload(characteristic, counter);
        let payload = encode_notification(counter, &business);
        if let Some(request) = self.descriptor.characteristic_mut(&Self::request_uuid()) {
            request.value = Some(business);
        }
        if let Some(notifying) = self.descriptor.characteristic_mut(&characteristic) {
            notifying.value = Some(payload.clone());
        }
        payload
    }
}
