//! The presentation collaborator.
//!
//! The state machine never draws anything; it reports every visible effect
//! as a [`PresenterEvent`] and asks the presenter only for the current
//! server selection and the lobby chat history.

use gavel_net::ServerDescriptor;

use crate::manifest::{
    CharacterEntry, EvidenceEntry, IcMessage, MusicEntry, SongChange, Verdict, WtceKind,
};

/// Which server list a selection refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerTab {
    Public,
    Favorites,
}

/// The row highlighted in the lobby.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerSelection {
    pub tab: ServerTab,
    pub index: usize,
}

/// A visible effect of protocol processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenterEvent {
    ConstructLobby,
    DestructLobby,
    ConstructCourtroom,
    DestructCourtroom,
    /// The public directory was replaced.
    ServerListUpdated(Vec<ServerDescriptor>),
    /// Directory chat shown in the lobby.
    LobbyChat { name: String, message: String },
    /// Directory chat (or the lobby log on `DONE`) shown in the courtroom.
    CourtroomMasterChat { name: String, message: String },
    /// Game-server OOC chat.
    CourtroomServerChat { name: String, message: String },
    PlayerCount { online: i32, max: i32 },
    AppendCharacter(CharacterEntry),
    AppendEvidence(EvidenceEntry),
    AppendMusic(MusicEntry),
    SetCharacterTaken { index: usize, taken: bool },
    LoadingText(String),
    /// 0 to 100.
    LoadingPercent(u8),
    ShowLoadingOverlay,
    HideLoadingOverlay,
    Notice(String),
    Error(String),
    /// Character accepted; carries the assigned client id.
    EnterCourtroom(i32),
    WindowTitle(String),
    Background(String),
    IcMessage(IcMessage),
    SongChange(SongChange),
    Wtce(WtceKind),
    HealthBar { side: i32, value: i32 },
    EvidenceListReplace(Vec<EvidenceEntry>),
    IpList(String),
    Mute { muted: bool, id: i32 },
    Ban(i32),
    ModCalled(String),
    Confirm(Verdict),
    /// Manifest transfer complete.
    SessionReady,
}

/// Sink for [`PresenterEvent`]s plus the little lobby state the protocol
/// needs to read back.
pub trait Presenter {
    /// Show an effect. Must not block.
    fn present(&mut self, event: PresenterEvent);

    /// The server currently selected in the lobby, if any.
    fn selected_server(&self) -> Option<ServerSelection>;

    /// Accumulated lobby chat, copied into the courtroom on `DONE`.
    fn lobby_chat_log(&self) -> String;
}
