//! Event loop tying the network clients to the state machine.
//!
//! One task, one event at a time: a network event or a client command is
//! handled to completion, then the outbox is flushed, before the next one
//! is taken. Events from superseded connections are dropped here.

use std::path::PathBuf;
use std::sync::Arc;

use gavel_config::append_favorite;
use gavel_net::{
    Channel, ConnectionState, GameSessionClient, LinkConfig, MasterConfig, MasterDirectoryClient,
    NetEvent, Packet, ServerDescriptor, SrvResolver,
};
use tokio::sync::mpsc;

use crate::machine::{Outbound, ProtocolStateMachine};
use crate::presenter::Presenter;

/// Capacity of the network event channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Requests from the front-end.
#[derive(Debug)]
pub enum ClientCommand {
    /// (Re)discover and connect to the master server.
    ConnectMaster,
    /// Join a game server, leaving the current one.
    ConnectGame(ServerDescriptor),
    /// Save the directory entry at this index as a favorite.
    AddFavorite(usize),
    /// Abort manifest loading.
    CancelLoading,
    /// Send a packet to the game server.
    SendGame {
        packet: Packet,
        already_encoded: bool,
    },
    /// Send a packet to the master server.
    SendMaster(Packet),
    /// Close everything and stop the loop.
    Shutdown,
}

/// Owns the state machine and both network clients.
pub struct SessionDriver<P> {
    machine: ProtocolStateMachine<P>,
    master: MasterDirectoryClient,
    game: GameSessionClient,
    events_rx: mpsc::Receiver<NetEvent>,
    commands_rx: mpsc::Receiver<ClientCommand>,
    favorites_dir: Option<PathBuf>,
}

impl<P: Presenter> SessionDriver<P> {
    pub fn new(
        machine: ProtocolStateMachine<P>,
        master_config: MasterConfig,
        game_link: LinkConfig,
        resolver: Arc<dyn SrvResolver>,
        commands_rx: mpsc::Receiver<ClientCommand>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            machine,
            master: MasterDirectoryClient::new(master_config, resolver, events_tx.clone()),
            game: GameSessionClient::new(game_link, events_tx),
            events_rx,
            commands_rx,
            favorites_dir: None,
        }
    }

    /// Persist favorites added through [`ClientCommand::AddFavorite`] to
    /// `serverlist.txt` in `dir`. Without it they are kept in memory only.
    pub fn with_favorites_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.favorites_dir = Some(dir.into());
        self
    }

    /// Run until [`ClientCommand::Shutdown`] or until every command sender is
    /// dropped. Returns the state machine for inspection.
    pub async fn run(mut self) -> ProtocolStateMachine<P> {
        loop {
            tokio::select! {
                command = self.commands_rx.recv() => {
                    match command {
                        Some(ClientCommand::Shutdown) | None => break,
                        Some(command) => self.handle_command(command),
                    }
                }
                Some(event) = self.events_rx.recv() => {
                    self.handle_event(event);
                }
            }
            self.flush_outbox().await;
        }

        tracing::info!("Session driver shutting down");
        self.master.disconnect();
        self.game.disconnect();
        self.machine
    }

    fn handle_command(&mut self, command: ClientCommand) {
        match command {
            ClientCommand::ConnectMaster => self.master.connect(),
            ClientCommand::ConnectGame(server) => {
                // Replacing a link emits no close event, so end the old session here.
                if self.game.state() != ConnectionState::Disconnected
                    || self.machine.courtroom_active()
                {
                    self.machine.server_disconnected();
                }
                self.game.connect(&server);
            }
            ClientCommand::AddFavorite(index) => self.add_favorite(index),
            ClientCommand::CancelLoading => self.machine.cancel_loading(),
            ClientCommand::SendGame {
                packet,
                already_encoded,
            } => self.machine.send_game(packet, already_encoded),
            ClientCommand::SendMaster(packet) => self.machine.send_master(packet),
            ClientCommand::Shutdown => {}
        }
    }

    fn add_favorite(&mut self, index: usize) {
        let Some(entry) = self.machine.favorite_from_directory(index) else {
            tracing::warn!("No directory entry {index} to add as a favorite");
            return;
        };
        tracing::info!("Added favorite {}", entry.name);
        if let Some(dir) = &self.favorites_dir
            && let Err(e) = append_favorite(dir, &entry)
        {
            tracing::warn!("Could not save favorite: {e}");
        }
    }

    fn handle_event(&mut self, event: NetEvent) {
        match event {
            NetEvent::Packet {
                channel: Channel::Master,
                epoch,
                packet,
            } => {
                if self.master.is_current(epoch) {
                    self.machine.handle_master(packet);
                }
            }
            NetEvent::Packet {
                channel: Channel::Game,
                epoch,
                packet,
            } => {
                if self.game.is_current(epoch) {
                    self.machine.handle_game(packet);
                }
            }
            NetEvent::Closed {
                channel: Channel::Master,
                epoch,
            } => {
                if self.master.on_closed(epoch) {
                    tracing::info!("Master connection closed");
                }
            }
            NetEvent::Closed {
                channel: Channel::Game,
                epoch,
            } => {
                if self.game.on_closed(epoch) {
                    self.machine.server_disconnected();
                }
            }
            NetEvent::MasterConnectFinished { epoch, stream } => {
                if let Some(connected) = self.master.finish_connect(epoch, stream) {
                    self.machine.on_master_connect_finished(connected);
                }
            }
            NetEvent::GameConnectFinished { epoch, result } => {
                match self.game.finish_connect(epoch, result) {
                    Some(Ok(())) => self.machine.on_game_connected(),
                    Some(Err(e)) => self.machine.on_game_connect_failed(&e.to_string()),
                    None => {}
                }
            }
        }
    }

    async fn flush_outbox(&mut self) {
        for outbound in self.machine.drain_outbox() {
            let result = match outbound {
                Outbound::Master(packet) => self.master.send(&packet).await,
                Outbound::Game {
                    packet,
                    already_encoded,
                    header_key,
                } => self.game.send(&packet, already_encoded, header_key).await,
            };
            if let Err(e) = result {
                tracing::warn!("Dropping outgoing packet: {e}");
            }
        }
    }
}
