use crate::{Error, ErrorType};
use crate::gatt::status::GattStatus;
use bluer::gatt::local::ReqError;

impl From<bluer::Error> for Error {
    fn from(value: bluer::Error) -> Self {
        Error::new(
            format!("bluer::Error: {:?}", value.kind),
            value.message,
            ErrorType::Bluez,
        )
    }
}

pub(crate) fn req_error(status: GattStatus) -> ReqError {
    match status {
        GattStatus::ReadNotPermitted | GattStatus::WriteNotPermitted => ReqError::NotPermitted,
        GattStatus::InvalidLength => ReqError::InvalidValueLength,
        GattStatus::RequestNotSupported => ReqError::NotSupported,
        GattStatus::Success | GattStatus::ValueNotAllowed | GattStatus::UnlikelyError => {
            ReqError::Failed
        }
    }
}
