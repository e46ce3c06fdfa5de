//! Static hardware-derived identifier sent in `HI` packets.

use sha2::{Digest, Sha256};

/// Files tried, in order, as the machine-specific seed.
const SEED_PATHS: [&str; 3] = ["/etc/machine-id", "/var/lib/dbus/machine-id", "/etc/hostname"];

/// Sent when no seed can be read.
pub const FALLBACK_HDID: &str = "gen-hdid-unavailable";

/// Length of the hex identifier.
const HDID_LEN: usize = 32;

/// The identifier to report: `configured` if set and non-empty, else a
/// digest of the first readable machine seed, else [`FALLBACK_HDID`].
pub fn hardware_id(configured: Option<&str>) -> String {
    if let Some(id) = configured.map(str::trim).filter(|id| !id.is_empty()) {
        return id.to_string();
    }

    for path in SEED_PATHS {
        match std::fs::read(path) {
            Ok(seed) if !seed.trim_ascii().is_empty() => return digest_hex(seed.trim_ascii()),
            Ok(_) => continue,
            Err(e) => tracing::debug!("No hardware seed at {path}: {e}"),
        }
    }

    tracing::warn!("No machine identifier available, using fallback hardware id");
    FALLBACK_HDID.to_string()
}

/// SHA-256 of `seed`, hex encoded and cut to 32 characters.
pub fn digest_hex(seed: &[u8]) -> String {
    let digest = Sha256::digest(seed);
    let mut hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    hex.truncate(HDID_LEN);
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_id_wins() {
        assert_eq!(hardware_id(Some("custom-id")), "custom-id");
    }

    #[test]
    fn test_blank_configured_id_ignored() {
        let id = hardware_id(Some("   "));
        assert_ne!(id.trim(), "");
        assert_ne!(id, "   ");
    }

    #[test]
    fn test_digest_is_stable_hex() {
        let a = digest_hex(b"machine");
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(a, digest_hex(b"machine"));
        assert_ne!(a, digest_hex(b"other machine"));
    }

    #[test]
    fn test_known_digest_prefix() {
        // sha256("abc")
        assert_eq!(digest_hex(b"abc"), "ba7816bf8f01cfea414140de5dae2223");
    }
}
