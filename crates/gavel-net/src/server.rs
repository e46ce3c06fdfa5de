//! Game server descriptors as listed by the master directory.

use crate::packet::SUB_FIELD_SEPARATOR;

/// A game server the client can connect to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerDescriptor {
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Host name or IP address.
    pub address: String,
    /// TCP port.
    pub port: u16,
}

impl ServerDescriptor {
    /// Parse one directory listing entry: `name&description&address&port`.
    ///
    /// Returns `None` for entries with fewer than four sub-fields or a port
    /// that is not a valid number.
    pub fn parse_listing(entry: &str) -> Option<Self> {
        let parts: Vec<&str> = entry.split(SUB_FIELD_SEPARATOR).collect();
        if parts.len() < 4 {
            return None;
        }
        Some(Self {
            name: parts[0].to_string(),
            description: parts[1].to_string(),
            address: parts[2].to_string(),
            port: parts[3].trim().parse().ok()?,
        })
    }

    /// `address:port`, suitable for connecting.
    pub fn authority(&self) -> String {
        if self.address.contains(':') {
            format!("[{}]:{}", self.address, self.port)
        } else {
            format!("{}:{}", self.address, self.port)
        }
    }
}
