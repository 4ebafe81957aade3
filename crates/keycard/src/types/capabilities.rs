use std::fmt;

/// A single capability flag advertised by the applet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Secure channel support
    SecureChannel = 0x01,
    /// Key management (generate/load/derive/remove)
    KeyManagement = 0x02,
    /// Credentials management (PIN/PUK/pairing secret)
    CredentialsManagement = 0x04,
    /// NDEF data storage
    Ndef = 0x08,
}

/// Capability flag set from the application info template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities(u8);

impl Capabilities {
    /// All capabilities, the default for cards that predate the flag
    pub const ALL: Self = Self(0x0F);

    /// Build a set from individual flags
    pub fn new(capabilities: &[Capability]) -> Self {
        Self(capabilities.iter().fold(0, |acc, &cap| acc | cap as u8))
    }

    /// Whether the card advertises the given capability
    pub fn has(&self, capability: Capability) -> bool {
        self.0 & capability as u8 != 0
    }
}

impl From<u8> for Capabilities {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.has(Capability::SecureChannel) {
            names.push("secure channel");
        }
        if self.has(Capability::KeyManagement) {
            names.push("key management");
        }
        if self.has(Capability::CredentialsManagement) {
            names.push("credentials management");
        }
        if self.has(Capability::Ndef) {
            names.push("NDEF");
        }
        write!(f, "{}", names.join(", "))
    }
}
