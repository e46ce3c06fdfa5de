//! Live TCP links and the event stream they feed.
//!
//! A [`Link`] owns the writer half of a connected stream and a background
//! reader task. The reader runs every read through its own
//! [`StreamReassembler`], decodes each completed packet and forwards it as a
//! [`NetEvent`] on a shared channel, so a single consumer sees the events of
//! both connections one at a time and in arrival order.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{mpsc, watch};

use std::time::Duration;

use crate::packet::Packet;
use crate::platform::SocketConfig;
use crate::reassembler::{ReassemblerConfig, StreamReassembler};

/// Size of the per-read scratch buffer.
const READ_BUFFER_SIZE: usize = 16_384;

/// Settings shared by the master and game connections.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// How long a single connect attempt may take. Default: 5 s.
    pub connect_timeout: Duration,
    /// Socket options applied after connecting.
    pub socket: SocketConfig,
    /// Reassembly limits for the reader task.
    pub reassembly: ReassemblerConfig,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            socket: SocketConfig::default(),
            reassembly: ReassemblerConfig::default(),
        }
    }
}

/// Which of the two connections an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Directory / master-server connection.
    Master,
    /// Game-server connection.
    Game,
}

/// Everything the network layer reports to the session layer.
///
/// `epoch` identifies the link (or connect attempt) that produced the event;
/// consumers drop events whose epoch is no longer current.
#[derive(Debug)]
pub enum NetEvent {
    /// A complete packet arrived.
    Packet {
        /// Originating connection.
        channel: Channel,
        /// Link epoch.
        epoch: u64,
        /// The decoded packet, fields still escaped.
        packet: Packet,
    },
    /// The peer closed the connection or a read failed.
    Closed {
        /// Originating connection.
        channel: Channel,
        /// Link epoch.
        epoch: u64,
    },
    /// Master discovery finished. `stream` is set if a candidate accepted.
    MasterConnectFinished {
        /// Attempt epoch.
        epoch: u64,
        /// The connected stream of the first candidate that accepted.
        stream: Option<TcpStream>,
    },
    /// A game-server connect attempt finished.
    GameConnectFinished {
        /// Attempt epoch.
        epoch: u64,
        /// The connected stream, or why the attempt failed.
        result: std::io::Result<TcpStream>,
    },
}

/// Sending side of the shared event channel.
pub type EventSender = mpsc::Sender<NetEvent>;

/// Errors produced when talking to a peer.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// There is no live connection on this channel.
    #[error("{0:?} connection is not established")]
    NotConnected(Channel),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// A connect attempt is in flight.
    Connecting,
    /// Connected, ready for communication.
    Connected,
    /// No connection.
    Disconnected,
}

/// An established connection: writer half plus a spawned reader task.
pub struct Link {
    channel: Channel,
    epoch: u64,
    writer: OwnedWriteHalf,
    /// Sending `true` (or dropping the link) stops the reader task.
    shutdown_tx: watch::Sender<bool>,
}

impl Link {
    /// Take ownership of `stream` and start forwarding its packets to `events`.
    pub fn spawn(
        stream: TcpStream,
        channel: Channel,
        epoch: u64,
        reassembly: ReassemblerConfig,
        events: EventSender,
    ) -> Self {
        let (reader, writer) = stream.into_split();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(async move {
            Self::read_loop(reader, channel, epoch, reassembly, events, shutdown_rx).await;
        });

        Self {
            channel,
            epoch,
            writer,
            shutdown_tx,
        }
    }

    /// Epoch this link was created under.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Write an already-framed packet string.
    pub async fn write(&mut self, wire: &str) -> Result<(), NetError> {
        self.writer.write_all(wire.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Stop the reader task. No [`NetEvent::Closed`] is emitted for a
    /// locally initiated close.
    pub fn close(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    async fn read_loop(
        mut reader: OwnedReadHalf,
        channel: Channel,
        epoch: u64,
        reassembly: ReassemblerConfig,
        events: EventSender,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let mut reassembler = StreamReassembler::new(reassembly);
        let mut buf = vec![0u8; READ_BUFFER_SIZE];

        loop {
            tokio::select! {
                result = reader.read(&mut buf) => {
                    let n = match result {
                        Ok(0) => {
                            tracing::info!("{channel:?} connection closed by peer");
                            let _ = events.send(NetEvent::Closed { channel, epoch }).await;
                            break;
                        }
                        Err(e) => {
                            tracing::warn!("{channel:?} read failed: {e}");
                            let _ = events.send(NetEvent::Closed { channel, epoch }).await;
                            break;
                        }
                        Ok(n) => n,
                    };

                    let raw_packets = match reassembler.feed(&buf[..n]) {
                        Ok(raw_packets) => raw_packets,
                        Err(e) => {
                            tracing::warn!("{channel:?} stream: {e}");
                            continue;
                        }
                    };

                    for raw in raw_packets {
                        let packet = Packet::decode(&raw);
                        if events.send(NetEvent::Packet { channel, epoch, packet }).await.is_err() {
                            return;
                        }
                    }
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        tracing::debug!("{:?} link (epoch {}) dropped", self.channel, self.epoch);
        self.close();
    }
}
