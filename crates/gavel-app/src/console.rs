//! Headless presenter that writes protocol effects to the log.

use gavel_net::ServerDescriptor;
use gavel_session::{Presenter, PresenterEvent, ServerSelection, ServerTab};

/// Logs every presenter event and keeps the lobby state the protocol reads
/// back (selection and chat history).
#[derive(Debug, Default)]
pub struct ConsolePresenter {
    selection: Option<ServerSelection>,
    chat_log: String,
    servers: Vec<ServerDescriptor>,
    /// `(address, port)` to highlight whenever it shows up in the directory.
    target: Option<(String, u16)>,
}

impl ConsolePresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highlight a server, as clicking a lobby row would.
    pub fn select(&mut self, selection: Option<ServerSelection>) {
        self.selection = selection;
    }

    /// Highlight `server` in every directory listing that contains it,
    /// unless a favorite is already selected.
    pub fn follow(&mut self, server: &ServerDescriptor) {
        self.target = Some((server.address.clone(), server.port));
    }

    /// Last directory listing received.
    pub fn servers(&self) -> &[ServerDescriptor] {
        &self.servers
    }
}

impl Presenter for ConsolePresenter {
    fn present(&mut self, event: PresenterEvent) {
        match event {
            PresenterEvent::ServerListUpdated(servers) => {
                tracing::info!("{} public servers", servers.len());
                for (index, server) in servers.iter().enumerate() {
                    tracing::info!("  [{index}] {} ({})", server.name, server.authority());
                }
                if let Some((address, port)) = &self.target
                    && self.selection.is_none_or(|s| s.tab == ServerTab::Public)
                {
                    self.selection = servers
                        .iter()
                        .position(|s| &s.address == address && s.port == *port)
                        .map(|index| ServerSelection {
                            tab: ServerTab::Public,
                            index,
                        });
                }
                self.servers = servers;
            }
            PresenterEvent::LobbyChat { name, message } => {
                tracing::info!("[lobby] {name}: {message}");
                self.chat_log.push_str(&format!("{name}: {message}\n"));
            }
            PresenterEvent::CourtroomMasterChat { name, message }
            | PresenterEvent::CourtroomServerChat { name, message } => {
                tracing::info!("[ooc] {name}: {message}");
            }
            PresenterEvent::IcMessage(message) => {
                tracing::info!("[ic] {}: {}", message.character, message.message);
            }
            PresenterEvent::LoadingText(text) => {
                tracing::debug!("{}", text.replace('\n', " "));
            }
            PresenterEvent::LoadingPercent(percent) => tracing::debug!("Loading {percent}%"),
            PresenterEvent::AppendCharacter(_)
            | PresenterEvent::AppendEvidence(_)
            | PresenterEvent::AppendMusic(_)
            | PresenterEvent::SetCharacterTaken { .. } => {
                tracing::trace!("{event:?}");
            }
            PresenterEvent::Notice(text) => tracing::warn!("Notice: {text}"),
            PresenterEvent::Error(text) => tracing::error!("{text}"),
            PresenterEvent::DestructLobby => {
                self.chat_log.clear();
                tracing::debug!("Lobby closed");
            }
            other => tracing::info!("{other:?}"),
        }
    }

    fn selected_server(&self) -> Option<ServerSelection> {
        self.selection
    }

    fn lobby_chat_log(&self) -> String {
        self.chat_log.clone()
    }
}
