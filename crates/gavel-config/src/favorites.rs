//! Favorite servers, stored one per line as `address:port:name`.

use std::io::Write;
use std::path::Path;

use crate::error::ConfigError;

/// File name of the favorites list inside the config directory.
pub const FAVORITES_FILE: &str = "serverlist.txt";

/// A server the user saved for quick access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavoriteServerEntry {
    /// Host name or IP address.
    pub address: String,
    /// TCP port.
    pub port: u16,
    /// Display name.
    pub name: String,
}

impl FavoriteServerEntry {
    /// Parse one `address:port:name` line. The name may itself contain `:`.
    pub fn parse_line(line: &str) -> Option<Self> {
        let mut parts = line.trim_end_matches(['\r', '\n']).splitn(3, ':');
        let address = parts.next()?.trim();
        let port = parts.next()?.trim().parse().ok()?;
        let name = parts.next()?;
        if address.is_empty() {
            return None;
        }
        Some(Self {
            address: address.to_string(),
            port,
            name: name.to_string(),
        })
    }

    /// Render as a favorites-file line (no newline).
    pub fn to_line(&self) -> String {
        format!("{}:{}:{}", self.address, self.port, self.name)
    }
}

/// Read the favorites list. A missing file is an empty list; malformed lines
/// are skipped.
pub fn load_favorites(config_dir: &Path) -> Result<Vec<FavoriteServerEntry>, ConfigError> {
    let path = config_dir.join(FAVORITES_FILE);
    if !path.exists() {
        return Ok(Vec::new());
    }

    let contents = std::fs::read_to_string(&path).map_err(ConfigError::ReadError)?;
    let favorites: Vec<_> = contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let entry = FavoriteServerEntry::parse_line(line);
            if entry.is_none() {
                log::warn!("Skipping malformed favorite: {line}");
            }
            entry
        })
        .collect();

    log::info!("Loaded {} favorite servers", favorites.len());
    Ok(favorites)
}

/// Append one entry to the favorites list, creating the file if needed.
pub fn append_favorite(config_dir: &Path, entry: &FavoriteServerEntry) -> Result<(), ConfigError> {
    std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(config_dir.join(FAVORITES_FILE))
        .map_err(ConfigError::WriteError)?;
    writeln!(file, "{}", entry.to_line()).map_err(ConfigError::WriteError)?;
    Ok(())
}
