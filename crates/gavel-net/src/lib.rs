//! Networking for the courtroom client: packet codec, header cipher, stream
//! reassembly, master-server discovery and the game-server connection.

pub mod cipher;
pub mod connection;
pub mod discovery;
pub mod game;
pub mod master;
pub mod packet;
pub mod platform;
pub mod reassembler;
pub mod server;

pub use cipher::{decode_key, obfuscate_header, reveal_header};
pub use connection::{
    Channel, ConnectionState, EventSender, Link, LinkConfig, NetError, NetEvent,
};
pub use discovery::{DiscoveryError, HickoryResolver, SrvEndpoint, SrvResolver, StaticResolver};
pub use game::GameSessionClient;
pub use master::{DEFAULT_MASTER_SRV, MasterConfig, MasterDirectoryClient};
pub use packet::Packet;
pub use platform::SocketConfig;
pub use reassembler::{FrameError, ReassemblerConfig, StreamReassembler};
pub use server::ServerDescriptor;
