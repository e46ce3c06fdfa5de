//! Client version triplet and the minimum-version check.

use std::fmt;

/// A `release.major.minor` version.
///
/// Field order makes the derived ordering compare release first, then major,
/// then minor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClientVersion {
    /// Release number.
    pub release: u32,
    /// Major version.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
}

impl ClientVersion {
    /// The version this client reports.
    pub const CURRENT: Self = Self::new(2, 4, 10);

    /// Build a version from its parts.
    pub const fn new(release: u32, major: u32, minor: u32) -> Self {
        Self {
            release,
            major,
            minor,
        }
    }

    /// Parse a dotted triplet. Needs at least three components; a component
    /// that is not a number counts as 0.
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split('.');
        let mut component = || parts.next().map(|p| p.trim().parse().unwrap_or(0));
        Some(Self::new(component()?, component()?, component()?))
    }

    /// Whether this version is strictly older than `required`.
    pub fn is_outdated(&self, required: &Self) -> bool {
        self < required
    }
}

impl Default for ClientVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl fmt::Display for ClientVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.release, self.major, self.minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(ClientVersion::new(2, 9, 1).to_string(), "2.9.1");
    }

    #[test]
    fn test_parse() {
        assert_eq!(ClientVersion::parse("2.9.1"), Some(ClientVersion::new(2, 9, 1)));
        assert_eq!(ClientVersion::parse("2.x.1"), Some(ClientVersion::new(2, 0, 1)));
        assert_eq!(ClientVersion::parse("2.9.1.4"), Some(ClientVersion::new(2, 9, 1)));
        assert_eq!(ClientVersion::parse("2.9"), None);
        assert_eq!(ClientVersion::parse(""), None);
    }

    #[test]
    fn test_ordering_is_field_by_field() {
        let local = ClientVersion::new(2, 9, 0);
        assert!(local.is_outdated(&ClientVersion::new(2, 9, 1)));
        assert!(!local.is_outdated(&ClientVersion::new(2, 9, 0)));
        assert!(!local.is_outdated(&ClientVersion::new(2, 8, 99)));
        assert!(!ClientVersion::new(3, 0, 0).is_outdated(&ClientVersion::new(2, 99, 99)));
        assert!(ClientVersion::new(1, 99, 99).is_outdated(&ClientVersion::new(2, 0, 0)));
    }
}
