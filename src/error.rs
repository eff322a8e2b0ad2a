use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    /// A service with the same UUID is already registered.
    DuplicateService,
    /// A characteristic UUID is already owned by another registered service.
    ConflictingCharacteristic,
    /// No registered service owns the addressed characteristic or descriptor.
    UnknownCharacteristic,
    /// The platform reported that a notification was not delivered.
    NotifyFailed,
    NotPowered,
    Registration,
    Advertising,
    ChannelClosed,
    Bluez,
}

impl ErrorType {
    fn name(&self) -> &'static str {
        match self {
            ErrorType::DuplicateService => "DuplicateService",
            ErrorType::ConflictingCharacteristic => "ConflictingCharacteristic",
            ErrorType::UnknownCharacteristic => "UnknownCharacteristic",
            ErrorType::NotifyFailed => "NotifyFailed",
            ErrorType::NotPowered => "NotPowered",
            ErrorType::Registration => "Registration",
            ErrorType::Advertising => "Advertising",
            ErrorType::ChannelClosed => "ChannelClosed",
            ErrorType::Bluez => "Bluez",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{name}: {description}")]
pub struct Error {
    pub name: String,
    pub description: String,
    pub error_type: ErrorType,
}

impl Error {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        error_type: ErrorType,
    ) -> Self {
        Error {
            name: name.into(),
            description: description.into(),
            error_type,
        }
    }

    pub fn from_type(error_type: ErrorType) -> Self {
        Error::new(error_type.name(), "", error_type)
    }

    /// Describes the failure while keeping the taxonomy name.
    pub fn with_description(error_type: ErrorType, description: impl Into<String>) -> Self {
        Error::new(error_type.name(), description, error_type)
    }

    /// Registration-time conflicts abort startup; everything else is
    /// reported per operation.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.error_type,
            ErrorType::DuplicateService | ErrorType::ConflictingCharacteristic
        )
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for Error {
    fn from(value: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Error::new(
            "tokio::sync::mpsc::error::SendError",
            format!("{}", value),
            ErrorType::ChannelClosed,
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_type_uses_taxonomy_name() {
        let err = Error::from_type(ErrorType::UnknownCharacteristic);
        assert_eq!(err.name, "UnknownCharacteristic");
        assert!(!err.is_fatal());
    }

    #[test]
    fn registration_conflicts_are_fatal() {
        assert!(Error::from_type(ErrorType::DuplicateService).is_fatal());
        assert!(Error::from_type(ErrorType::ConflictingCharacteristic).is_fatal());
        assert!(!Error::from_type(ErrorType::NotifyFailed).is_fatal());
    }

    #[test]
    fn display_joins_name_and_description() {
        let err = Error::with_description(ErrorType::Advertising, "adapter busy");
        assert_eq!(err.to_string(), "Advertising: adapter busy");
    }
}
