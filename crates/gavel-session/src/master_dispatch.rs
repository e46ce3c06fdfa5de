//! Master-channel packet handling.

use gavel_net::{Packet, ServerDescriptor};

use crate::header::MasterHeader;
use crate::machine::ProtocolStateMachine;
use crate::presenter::{Presenter, PresenterEvent};
use crate::request::Request;
use crate::version::ClientVersion;

/// Shown when the directory exiles this client.
pub const EXILE_NOTICE: &str = "You have been exiled from AO. Have a nice day.";

impl<P: Presenter> ProtocolStateMachine<P> {
    /// Handle one packet from the master connection. Fields arrive escaped.
    pub fn handle_master(&mut self, mut packet: Packet) {
        if !packet.is_routable() {
            return;
        }
        packet.unescape_fields();

        let header = MasterHeader::from_wire(&packet.header);
        if header != MasterHeader::KeepAlive {
            tracing::trace!("R(ms): {}", packet.encode());
        }

        match header {
            MasterHeader::ServerList => self.on_server_list(&packet),
            MasterHeader::Chat => self.on_master_chat(&packet),
            MasterHeader::VersionCheck => self.on_version_check(&packet),
            MasterHeader::Exile => {
                self.present(PresenterEvent::Notice(EXILE_NOTICE.to_string()));
                self.destruct_courtroom();
                self.destruct_lobby();
            }
            MasterHeader::KeepAlive => {}
            MasterHeader::Unknown(other) => {
                tracing::debug!("Ignoring unknown master packet {other}");
            }
        }
    }

    fn on_server_list(&mut self, packet: &Packet) {
        self.servers = packet
            .fields
            .iter()
            .filter_map(|entry| {
                let server = ServerDescriptor::parse_listing(entry);
                if server.is_none() {
                    tracing::warn!("Malformed server listing: {entry}");
                }
                server
            })
            .collect();

        tracing::debug!("Directory lists {} servers", self.servers.len());
        if self.lobby_constructed {
            self.present(PresenterEvent::ServerListUpdated(self.servers.clone()));
        }
    }

    fn on_master_chat(&mut self, packet: &Packet) {
        let (name, message) = match packet.fields.as_slice() {
            [] => return,
            [message] => (String::new(), message.clone()),
            [name, message, ..] => (name.clone(), message.clone()),
        };

        if self.lobby_constructed {
            self.present(PresenterEvent::LobbyChat {
                name: name.clone(),
                message: message.clone(),
            });
        }
        if self.courtroom_constructed && self.session.loaded {
            self.present(PresenterEvent::CourtroomMasterChat { name, message });
        }
    }

    fn on_version_check(&mut self, packet: &Packet) {
        let local = self.config.version;
        self.send_master(Request::Identify(local).to_packet());
        self.send_master(Request::HardwareId(self.config.hdid.clone()).to_packet());

        let Some(required) = packet.field(0).and_then(ClientVersion::parse) else {
            return;
        };
        if !local.is_outdated(&required) {
            return;
        }

        tracing::warn!("Client {local} is older than the required {required}");
        self.present(PresenterEvent::Notice(format!(
            "Outdated version! Your version: {local}\nPlease go to aceattorneyonline.com to update."
        )));
        self.destruct_courtroom();
        self.destruct_lobby();
    }
}
