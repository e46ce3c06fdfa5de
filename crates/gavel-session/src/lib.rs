//! Session layer of the courtroom client.
//!
//! Interprets master and game packets, runs the handshake and the manifest
//! transfer, and reports everything visible through a [`Presenter`].

pub mod driver;
pub mod game_dispatch;
pub mod hardware;
pub mod header;
pub mod machine;
pub mod manifest;
pub mod master_dispatch;
pub mod presenter;
pub mod request;
pub mod state;
pub mod version;

pub use driver::{ClientCommand, SessionDriver};
pub use hardware::hardware_id;
pub use header::{GameHeader, MasterHeader};
pub use machine::{MachineConfig, Outbound, ProtocolStateMachine};
pub use manifest::{
    CharacterEntry, EvidenceEntry, IcMessage, MusicEntry, SongChange, Verdict, WtceKind,
};
pub use presenter::{Presenter, PresenterEvent, ServerSelection, ServerTab};
pub use request::Request;
pub use state::{FeatureFlags, ManifestProgress, ManifestSizes, SessionPhase, SessionState};
pub use version::ClientVersion;
