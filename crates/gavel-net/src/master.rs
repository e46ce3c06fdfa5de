//! Master directory client.
//!
//! Connecting runs in a spawned, abortable task: the master service name is
//! resolved through an [`SrvResolver`], then each returned endpoint is tried
//! in the order given, each bounded by the configured connect timeout. The
//! first endpoint that accepts wins. Exactly one
//! [`NetEvent::MasterConnectFinished`] is emitted per attempt.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use crate::connection::{
    Channel, ConnectionState, EventSender, Link, LinkConfig, NetError, NetEvent,
};
use crate::discovery::{SrvEndpoint, SrvResolver};
use crate::packet::Packet;
use crate::platform::{SocketConfig, configure_stream};

/// Default SRV name of the public master server.
pub const DEFAULT_MASTER_SRV: &str = "_aoms._tcp.aceattorneyonline.com";

/// Configuration for [`MasterDirectoryClient`].
#[derive(Debug, Clone)]
pub struct MasterConfig {
    /// SRV name to resolve.
    pub srv_name: String,
    /// Connection settings.
    pub link: LinkConfig,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            srv_name: DEFAULT_MASTER_SRV.to_string(),
            link: LinkConfig::default(),
        }
    }
}

/// Client side of the master directory connection.
pub struct MasterDirectoryClient {
    config: MasterConfig,
    resolver: Arc<dyn SrvResolver>,
    events: EventSender,
    epoch: u64,
    attempt: Option<JoinHandle<()>>,
    link: Option<Link>,
    state: ConnectionState,
}

impl MasterDirectoryClient {
    /// Create a disconnected client.
    pub fn new(config: MasterConfig, resolver: Arc<dyn SrvResolver>, events: EventSender) -> Self {
        Self {
            config,
            resolver,
            events,
            epoch: 0,
            attempt: None,
            link: None,
            state: ConnectionState::Disconnected,
        }
    }

    /// Drop any existing connection and start a new discovery attempt.
    ///
    /// Returns immediately; the outcome arrives as
    /// [`NetEvent::MasterConnectFinished`].
    pub fn connect(&mut self) {
        self.cancel();
        self.link = None;
        self.epoch += 1;
        self.state = ConnectionState::Connecting;

        let epoch = self.epoch;
        let resolver = Arc::clone(&self.resolver);
        let srv_name = self.config.srv_name.clone();
        let timeout = self.config.link.connect_timeout;
        let socket = self.config.link.socket.clone();
        let events = self.events.clone();

        self.attempt = Some(tokio::spawn(async move {
            let stream = connect_first(resolver.as_ref(), &srv_name, timeout, &socket)
                .await
                .map(|(stream, _)| stream);
            let _ = events
                .send(NetEvent::MasterConnectFinished { epoch, stream })
                .await;
        }));
    }

    /// Abort an in-flight discovery attempt, if any.
    ///
    /// An aborted attempt emits no outcome event.
    pub fn cancel(&mut self) {
        if let Some(attempt) = self.attempt.take() {
            attempt.abort();
            if self.link.is_none() {
                self.state = ConnectionState::Disconnected;
            }
        }
    }

    /// Consume a discovery outcome.
    ///
    /// Returns `None` if the outcome belongs to a superseded attempt, else
    /// whether the client is now connected.
    pub fn finish_connect(&mut self, epoch: u64, stream: Option<TcpStream>) -> Option<bool> {
        if epoch != self.epoch {
            tracing::debug!("Ignoring stale master connect outcome (epoch {epoch})");
            return None;
        }
        self.attempt = None;

        match stream {
            Some(stream) => {
                self.link = Some(Link::spawn(
                    stream,
                    Channel::Master,
                    epoch,
                    self.config.link.reassembly.clone(),
                    self.events.clone(),
                ));
                self.state = ConnectionState::Connected;
                Some(true)
            }
            None => {
                self.state = ConnectionState::Disconnected;
                Some(false)
            }
        }
    }

    /// Whether events tagged with `epoch` belong to the live link.
    pub fn is_current(&self, epoch: u64) -> bool {
        self.link.as_ref().is_some_and(|link| link.epoch() == epoch)
    }

    /// Forget the link after the peer closed it.
    pub fn on_closed(&mut self, epoch: u64) -> bool {
        if !self.is_current(epoch) {
            return false;
        }
        self.link = None;
        self.state = ConnectionState::Disconnected;
        true
    }

    /// Escape, encode and write a packet.
    pub async fn send(&mut self, packet: &Packet) -> Result<(), NetError> {
        let link = self
            .link
            .as_mut()
            .ok_or(NetError::NotConnected(Channel::Master))?;

        let mut packet = packet.clone();
        packet.escape_fields();
        let wire = packet.encode();
        tracing::trace!("S(ms): {wire}");
        link.write(&wire).await
    }

    /// Cancel any attempt and close the link.
    pub fn disconnect(&mut self) {
        self.cancel();
        self.link = None;
        self.state = ConnectionState::Disconnected;
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }
}

/// Resolve `srv_name` and connect to the first endpoint that accepts within
/// `timeout`, trying endpoints strictly in resolver order.
pub async fn connect_first(
    resolver: &dyn SrvResolver,
    srv_name: &str,
    timeout: Duration,
    socket: &SocketConfig,
) -> Option<(TcpStream, SrvEndpoint)> {
    let endpoints = match resolver.resolve(srv_name).await {
        Ok(endpoints) => endpoints,
        Err(e) => {
            tracing::warn!("SRV lookup of the master server failed: {e}");
            return None;
        }
    };

    for endpoint in endpoints {
        tracing::debug!("Connecting to {}:{}", endpoint.target, endpoint.port);
        let attempt = TcpStream::connect((endpoint.target.as_str(), endpoint.port));

        match tokio::time::timeout(timeout, attempt).await {
            Ok(Ok(stream)) => {
                if let Err(e) = configure_stream(&stream, socket) {
                    tracing::warn!("Could not tune master socket: {e}");
                }
                tracing::info!(
                    "Connected to master server {}:{}",
                    endpoint.target,
                    endpoint.port
                );
                return Some((stream, endpoint));
            }
            Ok(Err(e)) => {
                tracing::warn!("Error connecting to master server {}: {e}", endpoint.target);
            }
            Err(_) => {
                tracing::warn!(
                    "Connecting to master server {} timed out after {timeout:?}",
                    endpoint.target
                );
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::StaticResolver;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    /// A port on loopback that refuses connections.
    async fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn test_first_accepting_candidate_wins() {
        let dead = closed_port().await;
        let first = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let second = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let resolver = StaticResolver::new(vec![
            SrvEndpoint::new("127.0.0.1", dead),
            SrvEndpoint::new("127.0.0.1", first.local_addr().unwrap().port()),
            SrvEndpoint::new("127.0.0.1", second.local_addr().unwrap().port()),
        ]);

        let (_, endpoint) = connect_first(
            &resolver,
            "_test._tcp",
            Duration::from_secs(2),
            &SocketConfig::default(),
        )
        .await
        .unwrap();
        assert_eq!(endpoint.port, first.local_addr().unwrap().port());
    }

    #[tokio::test]
    async fn test_all_candidates_failing_yields_none() {
        let resolver = StaticResolver::new(vec![
            SrvEndpoint::new("127.0.0.1", closed_port().await),
            SrvEndpoint::new("127.0.0.1", closed_port().await),
        ]);
        let result = connect_first(
            &resolver,
            "_test._tcp",
            Duration::from_secs(2),
            &SocketConfig::default(),
        )
        .await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_discovery_failure_yields_none() {
        let result = connect_first(
            &StaticResolver::default(),
            "_test._tcp",
            Duration::from_secs(1),
            &SocketConfig::default(),
        )
        .await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_connect_emits_single_outcome_and_sends() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, mut rx) = mpsc::channel(16);
        let resolver = Arc::new(StaticResolver::new(vec![SrvEndpoint::new("127.0.0.1", port)]));
        let mut client = MasterDirectoryClient::new(MasterConfig::default(), resolver, tx);

        client.connect();
        assert_eq!(client.state(), ConnectionState::Connecting);

        let (epoch, stream) = match rx.recv().await.unwrap() {
            NetEvent::MasterConnectFinished { epoch, stream } => (epoch, stream),
            other => panic!("unexpected event {other:?}"),
        };
        assert_eq!(client.finish_connect(epoch, stream), Some(true));
        assert_eq!(client.state(), ConnectionState::Connected);

        let (mut server, _) = listener.accept().await.unwrap();
        client.send(&Packet::header_only("ALL")).await.unwrap();
        let mut buf = [0u8; 5];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ALL#%");
    }

    #[tokio::test]
    async fn test_stale_outcome_is_ignored() {
        let (tx, _rx) = mpsc::channel(16);
        let mut client = MasterDirectoryClient::new(
            MasterConfig::default(),
            Arc::new(StaticResolver::default()),
            tx,
        );
        client.connect();
        client.connect();
        assert_eq!(client.finish_connect(1, None), None);
        assert_eq!(client.finish_connect(2, None), Some(false));
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_send_without_link_fails() {
        let (tx, _rx) = mpsc::channel(16);
        let mut client = MasterDirectoryClient::new(
            MasterConfig::default(),
            Arc::new(StaticResolver::default()),
            tx,
        );
        let result = client.send(&Packet::header_only("ALL")).await;
        assert!(matches!(result, Err(NetError::NotConnected(Channel::Master))));
    }
}
