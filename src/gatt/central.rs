use std::fmt;

/// Opaque handle for one connected remote client.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Central(String);

impl Central {
    pub fn new(identifier: impl Into<String>) -> Self {
        Central(identifier.into())
    }

    pub fn identifier(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Central {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Central {
    fn from(value: &str) -> Self {
        Central::new(value)
    }
}
