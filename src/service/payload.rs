use crate::notification::MessageCounter;
use uuid::Uuid;

/// Supplies the business part of each notification. The router never
/// interprets these bytes.
pub trait PayloadSource: Send {
    fn next_payload(&mut self, characteristic: Uuid, counter: u32) -> Vec<u8>;
}

/// Same bytes on every tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticPayload(Vec<u8>);

impl StaticPayload {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        StaticPayload(bytes.into())
    }
}

impl PayloadSource for StaticPayload {
    fn next_payload(&mut self, _characteristic: Uuid, _counter: u32) -> Vec<u8> {
        self.0.clone()
    }
}

impl<F> PayloadSource for F
where
    F: FnMut(Uuid, u32) -> Vec<u8> + Send,
{
    fn next_payload(&mut self, characteristic: Uuid, counter: u32) -> Vec<u8> {
        self(characteristic, counter)
    }
}

/// Counter (big-endian) followed by the business bytes.
pub fn encode_notification(counter: u32, business: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(MessageCounter::WIDTH + business.len());
    payload.extend_from_slice(&MessageCounter::encode(counter));
    payload.extend_from_slice(business);
    payload
}

/// Inverse of [`encode_notification`]; `None` when shorter than the counter.
pub fn decode_counter(payload: &[u8]) -> Option<u32> {
    let bytes: [u8; MessageCounter::WIDTH] = payload.get(..MessageCounter::WIDTH)?.try_into().ok()?;
    Some(u32::from_be_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_is_counter_then_business_bytes() {
        assert_eq!(encode_notification(2, b"hi"), vec![0, 0, 0, 2, b'h', b'i']);
        assert_eq!(decode_counter(&[0, 0, 1, 0, 9]), Some(256));
        assert_eq!(decode_counter(&[0, 1]), None);
    }

    #[test]
    fn closures_are_payload_sources() {
        let mut source = |_: Uuid, counter: u32| vec![counter as u8];
        assert_eq!(source.next_payload(Uuid::nil(), 7), vec![7]);
    }
}
