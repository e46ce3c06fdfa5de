//! Wiring between the loaded configuration and the protocol engine.

pub mod console;
pub mod platform;

use std::sync::Arc;
use std::time::Duration;

use gavel_config::{Config, FavoriteServerEntry, NetworkConfig};
use gavel_net::{
    HickoryResolver, LinkConfig, ServerDescriptor, SocketConfig, SrvEndpoint, SrvResolver,
    StaticResolver,
};
use gavel_session::{ClientVersion, MachineConfig, ServerSelection, ServerTab, hardware_id};

pub use console::ConsolePresenter;
pub use platform::{AppDirs, PlatformError};

/// Errors that stop the client before the session starts.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Platform(#[from] PlatformError),
    #[error(transparent)]
    Discovery(#[from] gavel_net::DiscoveryError),
    #[error("invalid server address {0:?}, expected host:port")]
    InvalidServer(String),
}

/// Connection settings with the given connect timeout.
pub fn link_config(network: &NetworkConfig, connect_timeout_ms: u64) -> LinkConfig {
    LinkConfig {
        connect_timeout: Duration::from_millis(connect_timeout_ms),
        socket: SocketConfig {
            tcp_nodelay: network.tcp_nodelay,
            keepalive_enabled: network.keepalive,
            keepalive_idle: Duration::from_secs(network.keepalive_idle_secs),
            keepalive_interval: Duration::from_secs(network.keepalive_interval_secs),
            ..SocketConfig::default()
        },
        ..LinkConfig::default()
    }
}

/// Master directory settings from config.
pub fn master_config(config: &Config) -> gavel_net::MasterConfig {
    gavel_net::MasterConfig {
        srv_name: config.master.srv_name.clone(),
        link: link_config(&config.network, config.master.connect_timeout_ms),
    }
}

/// Fixed endpoints when configured, system DNS otherwise.
pub fn master_resolver(config: &Config) -> Result<Arc<dyn SrvResolver>, AppError> {
    let endpoints: Vec<SrvEndpoint> = config
        .master
        .endpoints
        .iter()
        .filter_map(|text| {
            let endpoint = SrvEndpoint::parse(text);
            if endpoint.is_none() {
                tracing::warn!("Ignoring invalid master endpoint {text:?}");
            }
            endpoint
        })
        .collect();

    if endpoints.is_empty() {
        tracing::debug!("Resolving master via SRV {}", config.master.srv_name);
        Ok(Arc::new(HickoryResolver::from_system_conf()?))
    } else {
        tracing::debug!("Using {} fixed master endpoint(s)", endpoints.len());
        Ok(Arc::new(StaticResolver::new(endpoints)))
    }
}

/// Session settings from config.
pub fn machine_config(config: &Config) -> MachineConfig {
    MachineConfig {
        version: ClientVersion::CURRENT,
        hdid: hardware_id(config.client.hdid.as_deref()),
        window_title: config.client.window_title.clone(),
        music_progress: config.loading.music_progress,
    }
}

/// Game server named on the command line.
pub fn server_from_arg(text: &str) -> Result<ServerDescriptor, AppError> {
    let endpoint =
        SrvEndpoint::parse(text).ok_or_else(|| AppError::InvalidServer(text.to_string()))?;
    Ok(ServerDescriptor {
        name: endpoint.target.clone(),
        description: String::new(),
        address: endpoint.target,
        port: endpoint.port,
    })
}

/// Favorites entry for `server`, so the courtroom title carries its name.
pub fn favorite_selection(
    favorites: &[FavoriteServerEntry],
    server: &ServerDescriptor,
) -> Option<ServerSelection> {
    favorites
        .iter()
        .position(|entry| entry.address == server.address && entry.port == server.port)
        .map(|index| ServerSelection {
            tab: ServerTab::Favorites,
            index,
        })
}
