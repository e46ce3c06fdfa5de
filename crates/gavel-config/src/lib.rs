//! Configuration for the courtroom client.
//!
//! Settings persist to disk as RON (`config.ron`) in the platform config
//! directory, with CLI overrides via clap. The favorites list lives next to
//! it in the plain-text `serverlist.txt` format.

mod cli;
mod config;
mod error;
mod favorites;

pub use cli::CliArgs;
pub use config::{
    ClientConfig, Config, DebugConfig, LoadingConfig, MasterConfig, MusicProgress, NetworkConfig,
    default_config_dir,
};
pub use error::ConfigError;
pub use favorites::{FAVORITES_FILE, FavoriteServerEntry, append_favorite, load_favorites};
