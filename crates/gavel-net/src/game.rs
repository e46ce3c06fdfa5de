//! Game-server session client.
//!
//! Owns the game connection. Connecting is non-blocking: the attempt runs in
//! a spawned task and reports through [`NetEvent::GameConnectFinished`].
//! Outgoing packets are escaped unless already encoded, and their header is
//! enciphered when the session requires it.

use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use crate::cipher::obfuscate_header;
use crate::connection::{
    Channel, ConnectionState, EventSender, Link, LinkConfig, NetError, NetEvent,
};
use crate::packet::Packet;
use crate::platform::configure_stream;
use crate::server::ServerDescriptor;

/// Client side of the game-server connection.
pub struct GameSessionClient {
    config: LinkConfig,
    events: EventSender,
    epoch: u64,
    attempt: Option<JoinHandle<()>>,
    link: Option<Link>,
    state: ConnectionState,
}

impl GameSessionClient {
    /// Create a disconnected client.
    pub fn new(config: LinkConfig, events: EventSender) -> Self {
        Self {
            config,
            events,
            epoch: 0,
            attempt: None,
            link: None,
            state: ConnectionState::Disconnected,
        }
    }

    /// Drop the current connection and start connecting to `server`.
    pub fn connect(&mut self, server: &ServerDescriptor) {
        if let Some(attempt) = self.attempt.take() {
            attempt.abort();
        }
        self.link = None;
        self.epoch += 1;
        self.state = ConnectionState::Connecting;

        let epoch = self.epoch;
        let address = server.address.clone();
        let port = server.port;
        let timeout = self.config.connect_timeout;
        let socket = self.config.socket.clone();
        let events = self.events.clone();

        tracing::info!("Connecting to game server {}", server.authority());
        self.attempt = Some(tokio::spawn(async move {
            let attempt = TcpStream::connect((address.as_str(), port));
            let result = match tokio::time::timeout(timeout, attempt).await {
                Ok(Ok(stream)) => {
                    if let Err(e) = configure_stream(&stream, &socket) {
                        tracing::warn!("Could not tune game socket: {e}");
                    }
                    Ok(stream)
                }
                Ok(Err(e)) => Err(e),
                Err(_) => Err(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("connect timed out after {timeout:?}"),
                )),
            };
            let _ = events
                .send(NetEvent::GameConnectFinished { epoch, result })
                .await;
        }));
    }

    /// Consume a connect outcome.
    ///
    /// Returns `None` for a superseded attempt, `Some(Ok(()))` once the link
    /// is live, or the connect error.
    pub fn finish_connect(
        &mut self,
        epoch: u64,
        result: std::io::Result<TcpStream>,
    ) -> Option<std::io::Result<()>> {
        if epoch != self.epoch {
            tracing::debug!("Ignoring stale game connect outcome (epoch {epoch})");
            return None;
        }
        self.attempt = None;

        match result {
            Ok(stream) => {
                self.link = Some(Link::spawn(
                    stream,
                    Channel::Game,
                    epoch,
                    self.config.reassembly.clone(),
                    self.events.clone(),
                ));
                self.state = ConnectionState::Connected;
                Some(Ok(()))
            }
            Err(e) => {
                self.state = ConnectionState::Disconnected;
                Some(Err(e))
            }
        }
    }

    /// Whether events tagged with `epoch` belong to the live link.
    pub fn is_current(&self, epoch: u64) -> bool {
        self.link.as_ref().is_some_and(|link| link.epoch() == epoch)
    }

    /// Forget the link after the peer closed it.
    ///
    /// Returns `false` for a close of a superseded link.
    pub fn on_closed(&mut self, epoch: u64) -> bool {
        if !self.is_current(epoch) {
            return false;
        }
        self.link = None;
        self.state = ConnectionState::Disconnected;
        true
    }

    /// Send a packet.
    ///
    /// Fields are escaped unless `already_encoded`. With `header_key` set the
    /// header is enciphered under that key; fields never are.
    pub async fn send(
        &mut self,
        packet: &Packet,
        already_encoded: bool,
        header_key: Option<u32>,
    ) -> Result<(), NetError> {
        let link = self
            .link
            .as_mut()
            .ok_or(NetError::NotConnected(Channel::Game))?;

        let wire = encode_outgoing(packet, already_encoded, header_key);
        link.write(&wire).await
    }

    /// Close the connection without reporting a disconnect.
    pub fn disconnect(&mut self) {
        if let Some(attempt) = self.attempt.take() {
            attempt.abort();
        }
        self.link = None;
        self.state = ConnectionState::Disconnected;
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }
}

/// Produce the exact wire text for an outgoing game packet.
pub fn encode_outgoing(packet: &Packet, already_encoded: bool, header_key: Option<u32>) -> String {
    let mut packet = packet.clone();
    if !already_encoded {
        packet.escape_fields();
    }

    match header_key {
        Some(key) => {
            tracing::trace!("S(e): {}", packet.encode());
            obfuscate_header(&packet, key).encode()
        }
        None => {
            let wire = packet.encode();
            tracing::trace!("S: {wire}");
            wire
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::{encrypt, reveal_header};
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    fn descriptor(port: u16) -> ServerDescriptor {
        ServerDescriptor {
            name: "Test".to_string(),
            description: String::new(),
            address: "127.0.0.1".to_string(),
            port,
        }
    }

    #[test]
    fn test_plain_packet_is_escaped() {
        let packet = Packet::new("CT", ["me", "100%"]);
        assert_eq!(encode_outgoing(&packet, false, None), "CT#me#100<percent>#%");
    }

    #[test]
    fn test_pre_encoded_packet_left_alone() {
        let packet = Packet::new("CT", ["me", "<and>"]);
        assert_eq!(encode_outgoing(&packet, true, None), "CT#me#<and>#%");
    }

    #[test]
    fn test_header_key_enciphers_header_only() {
        let packet = Packet::new("HI", ["abc"]);
        let wire = encode_outgoing(&packet, false, Some(5));
        assert_eq!(wire, format!("{}#abc#%", encrypt(b"HI", 5)));

        let decoded = Packet::decode(&wire);
        assert_eq!(reveal_header(&decoded, 5), Some(packet));
    }

    #[tokio::test]
    async fn test_connect_and_send() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, mut rx) = mpsc::channel(16);
        let mut client = GameSessionClient::new(LinkConfig::default(), tx);

        client.connect(&descriptor(port));
        let (epoch, result) = match rx.recv().await.unwrap() {
            NetEvent::GameConnectFinished { epoch, result } => (epoch, result),
            other => panic!("unexpected event {other:?}"),
        };
        assert!(matches!(client.finish_connect(epoch, result), Some(Ok(()))));
        assert_eq!(client.state(), ConnectionState::Connected);
        assert!(client.is_current(epoch));

        let (mut server, _) = listener.accept().await.unwrap();
        client
            .send(&Packet::header_only("askchar2"), false, None)
            .await
            .unwrap();
        let mut buf = [0u8; 10];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"askchar2#%");
    }

    #[tokio::test]
    async fn test_refused_connect_reports_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let (tx, mut rx) = mpsc::channel(16);
        let mut client = GameSessionClient::new(LinkConfig::default(), tx);

        client.connect(&descriptor(port));
        let (epoch, result) = match rx.recv().await.unwrap() {
            NetEvent::GameConnectFinished { epoch, result } => (epoch, result),
            other => panic!("unexpected event {other:?}"),
        };
        assert!(matches!(client.finish_connect(epoch, result), Some(Err(_))));
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_close_of_old_link_is_ignored() {
        let (tx, _rx) = mpsc::channel(16);
        let mut client = GameSessionClient::new(LinkConfig::default(), tx);
        assert!(!client.on_closed(3));
    }
}
