use uuid::Uuid;

pub const ADVERTISING_NAME: &str = "SdlTester";
pub const EVENT_QUEUE_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeripheralConfig {
    /// Adapter alias, sent in the scan response.
    pub name: String,
    pub include_device_name: bool,
    pub include_tx_power: bool,
    /// Depth of the callback queue shared by the platform and tick timers.
    pub event_queue_depth: usize,
}

impl Default for PeripheralConfig {
    fn default() -> Self {
        PeripheralConfig {
            name: ADVERTISING_NAME.to_string(),
            include_device_name: true,
            include_tx_power: true,
            event_queue_depth: EVENT_QUEUE_DEPTH,
        }
    }
}

impl PeripheralConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_tx_power(mut self, include: bool) -> Self {
        self.include_tx_power = include;
        self
    }

    pub fn with_event_queue_depth(mut self, depth: usize) -> Self {
        self.event_queue_depth = depth.max(1);
        self
    }

    pub fn advertising_request(&self, primary_service: Uuid) -> AdvertisingRequest {
        AdvertisingRequest {
            primary_service,
            local_name: self.name.clone(),
            include_device_name: self.include_device_name,
            include_tx_power: self.include_tx_power,
            connectable: true,
        }
    }
}

/// Parameters handed to the platform's advertiser. Advertising never
/// times out on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisingRequest {
    pub primary_service: Uuid,
    pub local_name: String,
    pub include_device_name: bool,
    pub include_tx_power: bool,
    pub connectable: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advertising_request_follows_config() {
        let config = PeripheralConfig::default()
            .with_name("bench")
            .with_tx_power(false);
        let request = config.advertising_request(Uuid::from_u128(1));
        assert_eq!(request.local_name, "bench");
        assert!(request.include_device_name);
        assert!(!request.include_tx_power);
        assert!(request.connectable);
    }

    #[test]
    fn queue_depth_is_never_zero() {
        assert_eq!(PeripheralConfig::default().with_event_queue_depth(0).event_queue_depth, 1);
    }
}
