//! Cross-platform TCP socket tuning for master and game connections.
//!
//! [`SocketConfig`] encapsulates the socket options applied to every outgoing
//! connection (TCP_NODELAY, keepalive) so both clients configure their
//! streams identically on Linux, Windows and macOS.

use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};
use tokio::net::TcpStream;

/// TCP socket options applied to every connection.
#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// Disable Nagle's algorithm. Packets are small and latency matters. Default: true.
    pub tcp_nodelay: bool,
    /// Enable TCP keepalive. Default: true.
    pub keepalive_enabled: bool,
    /// Idle time before the first keepalive probe. Default: 60s.
    pub keepalive_idle: Duration,
    /// Keepalive probe interval. Default: 10s.
    pub keepalive_interval: Duration,
    /// Number of keepalive probes before declaring the peer dead. Default: 3.
    pub keepalive_retries: u32,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            tcp_nodelay: true,
            keepalive_enabled: true,
            keepalive_idle: Duration::from_secs(60),
            keepalive_interval: Duration::from_secs(10),
            keepalive_retries: 3,
        }
    }
}

/// Apply socket configuration to a connected [`TcpStream`].
pub fn configure_stream(stream: &TcpStream, config: &SocketConfig) -> std::io::Result<()> {
    stream.set_nodelay(config.tcp_nodelay)?;

    if config.keepalive_enabled {
        let sock_ref = SockRef::from(stream);
        let keepalive = TcpKeepalive::new()
            .with_time(config.keepalive_idle)
            .with_interval(config.keepalive_interval);

        // Retries are supported on Linux and Windows but not macOS.
        #[cfg(any(target_os = "linux", target_os = "windows"))]
        let keepalive = keepalive.with_retries(config.keepalive_retries);

        sock_ref.set_tcp_keepalive(&keepalive)?;
    }

    Ok(())
}
