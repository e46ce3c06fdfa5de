//! The protocol state machine.
//!
//! Owns the session state, the server directory and the presentation
//! context flags. Packets are handled one at a time to completion; every
//! follow-up request is queued in the outbox and shipped by the driver.
//! Packet dispatch itself lives in [`crate::master_dispatch`] and
//! [`crate::game_dispatch`].

use std::collections::VecDeque;

use gavel_config::{FavoriteServerEntry, MusicProgress};
use gavel_net::{Packet, ServerDescriptor};

use crate::hardware::FALLBACK_HDID;
use crate::presenter::{Presenter, PresenterEvent, ServerTab};
use crate::request::Request;
use crate::state::{SessionPhase, SessionState};
use crate::version::ClientVersion;

/// Shown when no master server could be reached.
pub const MASTER_UNREACHABLE: &str = "There was an error connecting to the master server.\n\
We deploy multiple master servers to mitigate any possible downtime, \
but the client appears to have exhausted all possible methods of finding \
and connecting to one.\n\
Please check your Internet connection and firewall, and please try again.";

/// Shown when the game server drops a session that had a courtroom.
pub const DISCONNECTED_NOTICE: &str = "Disconnected from server.";

/// Static settings of the state machine.
#[derive(Debug, Clone)]
pub struct MachineConfig {
    /// Version reported in `ID` and checked against `AO2CHECK`.
    pub version: ClientVersion,
    /// Identifier sent in `HI`.
    pub hdid: String,
    /// Window title before a server name is appended.
    pub window_title: String,
    /// Progress accounting for fast-loading music lists.
    pub music_progress: MusicProgress,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            version: ClientVersion::CURRENT,
            hdid: FALLBACK_HDID.to_string(),
            window_title: "Attorney Online 2".to_string(),
            music_progress: MusicProgress::default(),
        }
    }
}

/// A packet waiting to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// For the master connection.
    Master(Packet),
    /// For the game connection. `header_key` is the session key at the time
    /// the packet was queued, if encryption was required.
    Game {
        packet: Packet,
        already_encoded: bool,
        header_key: Option<u32>,
    },
}

/// Interprets packets from both channels and sequences the handshake.
pub struct ProtocolStateMachine<P> {
    pub(crate) config: MachineConfig,
    pub(crate) presenter: P,
    pub(crate) session: SessionState,
    pub(crate) servers: Vec<ServerDescriptor>,
    pub(crate) favorites: Vec<FavoriteServerEntry>,
    pub(crate) lobby_constructed: bool,
    pub(crate) courtroom_constructed: bool,
    outbox: VecDeque<Outbound>,
}

impl<P: Presenter> ProtocolStateMachine<P> {
    /// Create a machine with no presentation context and no connection.
    pub fn new(config: MachineConfig, presenter: P) -> Self {
        Self {
            config,
            presenter,
            session: SessionState::default(),
            servers: Vec::new(),
            favorites: Vec::new(),
            lobby_constructed: false,
            courtroom_constructed: false,
            outbox: VecDeque::new(),
        }
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Public servers from the last `ALL`.
    pub fn servers(&self) -> &[ServerDescriptor] {
        &self.servers
    }

    pub fn favorites(&self) -> &[FavoriteServerEntry] {
        &self.favorites
    }

    /// Replace the favorites list (read from disk by the caller).
    pub fn set_favorites(&mut self, favorites: Vec<FavoriteServerEntry>) {
        self.favorites = favorites;
    }

    pub fn lobby_active(&self) -> bool {
        self.lobby_constructed
    }

    pub fn courtroom_active(&self) -> bool {
        self.courtroom_constructed
    }

    // -----------------------------------------------------------------------
    // Presentation contexts
    // -----------------------------------------------------------------------

    pub fn construct_lobby(&mut self) {
        if self.lobby_constructed {
            tracing::warn!("Lobby construction requested while it already exists");
            return;
        }
        self.lobby_constructed = true;
        self.present(PresenterEvent::ConstructLobby);
    }

    pub fn destruct_lobby(&mut self) {
        if !self.lobby_constructed {
            tracing::warn!("Lobby destruction requested while it does not exist");
            return;
        }
        self.lobby_constructed = false;
        self.present(PresenterEvent::DestructLobby);
    }

    pub fn construct_courtroom(&mut self) {
        if self.courtroom_constructed {
            tracing::warn!("Courtroom construction requested while it already exists");
            return;
        }
        self.courtroom_constructed = true;
        self.present(PresenterEvent::ConstructCourtroom);
    }

    pub fn destruct_courtroom(&mut self) {
        if !self.courtroom_constructed {
            tracing::warn!("Courtroom destruction requested while it does not exist");
            return;
        }
        self.courtroom_constructed = false;
        self.session.loaded = false;
        self.present(PresenterEvent::DestructCourtroom);
    }

    // -----------------------------------------------------------------------
    // Connection lifecycle
    // -----------------------------------------------------------------------

    /// Outcome of master discovery: request the directory, or report that
    /// no master server was reachable.
    pub fn on_master_connect_finished(&mut self, connected: bool) {
        if connected {
            tracing::info!("Connected to master server");
            self.send_master(Request::ServerList.to_packet());
        } else {
            tracing::warn!("Could not reach any master server");
            self.present(PresenterEvent::Error(MASTER_UNREACHABLE.to_string()));
        }
    }

    /// A new game connection is up; everything negotiated before is void.
    pub fn on_game_connected(&mut self) {
        tracing::info!("Game connection established");
        self.session = SessionState::connected();
    }

    /// A game connect attempt failed. Any courtroom left from an earlier
    /// session is torn down.
    pub fn on_game_connect_failed(&mut self, reason: &str) {
        tracing::warn!("Game connection failed: {reason}");
        self.leave_courtroom();
        self.session = SessionState::default();
        self.present(PresenterEvent::Notice(format!(
            "Could not connect to server: {reason}"
        )));
    }

    /// The game connection ended, closed by the server or replaced by a
    /// connection to another one.
    pub fn server_disconnected(&mut self) {
        tracing::info!("Game server disconnected");
        if self.courtroom_constructed {
            self.present(PresenterEvent::Notice(DISCONNECTED_NOTICE.to_string()));
            self.leave_courtroom();
        }
        self.session = SessionState::default();
    }

    /// Back to the lobby, closing the loading overlay if still loading.
    fn leave_courtroom(&mut self) {
        if !self.courtroom_constructed {
            return;
        }
        let loading = !self.session.loaded;
        if !self.lobby_constructed {
            self.construct_lobby();
        }
        self.destruct_courtroom();
        if loading {
            self.present(PresenterEvent::HideLoadingOverlay);
        }
    }

    /// The user aborted loading.
    pub fn cancel_loading(&mut self) {
        self.destruct_courtroom();
        self.present(PresenterEvent::HideLoadingOverlay);
    }

    /// Copy a directory entry into the favorites list and return it for the
    /// caller to persist. `None` for an out-of-range index.
    pub fn favorite_from_directory(&mut self, index: usize) -> Option<FavoriteServerEntry> {
        let server = self.servers.get(index)?;
        let entry = FavoriteServerEntry {
            address: server.address.clone(),
            port: server.port,
            name: server.name.clone(),
        };
        self.favorites.push(entry.clone());
        Some(entry)
    }

    /// Title for the courtroom window: the base title, plus the selected
    /// server's name when the selection is valid.
    pub(crate) fn session_title(&self) -> String {
        let base = &self.config.window_title;
        let name = self
            .presenter
            .selected_server()
            .and_then(|selection| match selection.tab {
                ServerTab::Public => self.servers.get(selection.index).map(|s| &s.name),
                ServerTab::Favorites => self.favorites.get(selection.index).map(|f| &f.name),
            });

        match name {
            Some(name) => format!("{base}: {name}"),
            None => base.clone(),
        }
    }

    pub(crate) fn set_phase(&mut self, phase: SessionPhase) {
        if self.session.phase != phase {
            tracing::debug!("Session phase {:?} -> {phase:?}", self.session.phase);
            self.session.phase = phase;
        }
    }

    // -----------------------------------------------------------------------
    // Outbox
    // -----------------------------------------------------------------------

    pub(crate) fn present(&mut self, event: PresenterEvent) {
        self.presenter.present(event);
    }

    /// Queue a packet for the master connection.
    pub fn send_master(&mut self, packet: Packet) {
        self.outbox.push_back(Outbound::Master(packet));
    }

    /// Queue a packet for the game connection, capturing the header key the
    /// session requires right now.
    pub fn send_game(&mut self, packet: Packet, already_encoded: bool) {
        self.outbox.push_back(Outbound::Game {
            packet,
            already_encoded,
            header_key: self.session.header_key(),
        });
    }

    pub(crate) fn request(&mut self, request: Request) {
        self.send_game(request.to_packet(), false);
    }

    /// Take every queued packet, oldest first.
    pub fn drain_outbox(&mut self) -> Vec<Outbound> {
        self.outbox.drain(..).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[path = "machine_tests.rs"]
mod tests;
