/// Per-characteristic message sequence number.
///
/// Starts at 0 so the first notification carries 1. Wraps from `u32::MAX`
/// back to 0 with no error; the wire form is 4 bytes big-endian.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageCounter(u32);

impl MessageCounter {
    pub const WIDTH: usize = std::mem::size_of::<u32>();

    pub const fn starting_at(value: u32) -> Self {
        MessageCounter(value)
    }

    pub fn current(&self) -> u32 {
        self.0
    }

    pub fn advance(&mut self) -> u32 {
        self.0 = self.0.wrapping_add(1);
        self.0
    }

    pub fn encode(value: u32) -> [u8; MessageCounter::WIDTH] {
        value.to_be_bytes()
    }
}
