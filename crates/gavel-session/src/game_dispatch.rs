//! Game-channel packet handling.
//!
//! Each handler validates its packet up front and returns early when a
//! guard fails; a rejected packet changes nothing.

use gavel_net::{Packet, decode_key};

use crate::header::GameHeader;
use crate::machine::ProtocolStateMachine;
use crate::manifest::{
    CharacterEntry, EvidenceEntry, IcMessage, MusicEntry, SongChange, Verdict, WtceKind,
};
use crate::presenter::{Presenter, PresenterEvent};
use crate::request::Request;
use crate::state::{FeatureFlags, ManifestProgress, ManifestSizes, SessionPhase};

/// `decryptor` token that switches header encryption off.
pub const NO_ENCRYPTION_TOKEN: &str = "NOENCRYPT";

/// `CharsCheck` value marking a slot as taken.
pub const TAKEN_SENTINEL: &str = "-1";

/// `KK` target addressing every client.
pub const BROADCAST_CID: i32 = -1;

pub const KICKED_NOTICE: &str = "You have been kicked.";
pub const BANNED_NOTICE: &str = "You are banned on this server.";

impl<P: Presenter> ProtocolStateMachine<P> {
    /// Handle one packet from the game connection. Fields arrive escaped.
    pub fn handle_game(&mut self, mut packet: Packet) {
        if !packet.is_routable() {
            return;
        }
        packet.unescape_fields();

        let header = GameHeader::from_wire(&packet.header);
        if header != GameHeader::KeepAlive {
            tracing::trace!("R: {}", packet.encode());
        }

        match header {
            GameHeader::Decryptor => self.on_decryptor(&packet),
            GameHeader::Identify => self.on_identify(&packet),
            GameHeader::Chat => {
                if let [name, message, ..] = packet.fields.as_slice()
                    && self.courtroom_constructed
                {
                    self.present(PresenterEvent::CourtroomServerChat {
                        name: name.clone(),
                        message: message.clone(),
                    });
                }
            }
            GameHeader::FeatureList => {
                self.session.features.apply_feature_list(&packet.encode());
                tracing::debug!("Server features: {:?}", self.session.features);
            }
            GameHeader::PlayerCount => {
                if let [online, max, ..] = packet.fields.as_slice()
                    && self.lobby_constructed
                {
                    self.present(PresenterEvent::PlayerCount {
                        online: online.trim().parse().unwrap_or(0),
                        max: max.trim().parse().unwrap_or(0),
                    });
                }
            }
            GameHeader::ServerInfo => self.on_server_info(&packet),
            GameHeader::CharacterBatch => self.on_character_batch(&packet),
            GameHeader::CharacterList => self.on_character_list(&packet),
            GameHeader::EvidenceItem => self.on_evidence_item(&packet),
            GameHeader::MusicBatch => self.on_music_batch(&packet),
            GameHeader::MusicList => self.on_music_list(&packet),
            GameHeader::CharsCheck => self.on_chars_check(&packet),
            GameHeader::Done => self.on_done(),
            GameHeader::Background => {
                if let Some(background) = packet.field(0)
                    && self.courtroom_constructed
                {
                    self.present(PresenterEvent::Background(background.to_string()));
                }
            }
            GameHeader::CharacterAssigned => self.on_character_assigned(&packet),
            GameHeader::IcMessage => {
                if self.in_loaded_courtroom()
                    && let Some(message) = IcMessage::parse(&packet.fields)
                {
                    self.present(PresenterEvent::IcMessage(message));
                }
            }
            GameHeader::MusicChange => {
                if self.in_loaded_courtroom()
                    && let Some(song) = SongChange::parse(&packet.fields)
                {
                    self.present(PresenterEvent::SongChange(song));
                }
            }
            GameHeader::Wtce => {
                if let Some(token) = packet.field(0)
                    && self.courtroom_constructed
                {
                    self.present(PresenterEvent::Wtce(WtceKind::from_wire(token)));
                }
            }
            GameHeader::HealthBar => {
                if let [side, value, ..] = packet.fields.as_slice()
                    && self.courtroom_constructed
                {
                    self.present(PresenterEvent::HealthBar {
                        side: side.trim().parse().unwrap_or(0),
                        value: value.trim().parse().unwrap_or(0),
                    });
                }
            }
            GameHeader::EvidenceList => {
                if self.courtroom_constructed {
                    let list = packet
                        .fields
                        .iter()
                        .filter_map(|entry| EvidenceEntry::from_list_entry(entry))
                        .collect();
                    self.present(PresenterEvent::EvidenceListReplace(list));
                }
            }
            GameHeader::IpList => {
                if let Some(text) = packet.field(0)
                    && self.courtroom_constructed
                {
                    self.present(PresenterEvent::IpList(text.to_string()));
                }
            }
            GameHeader::Mute => self.on_mute(&packet, true),
            GameHeader::Unmute => self.on_mute(&packet, false),
            GameHeader::Kick => self.on_kick(&packet),
            GameHeader::Ban => {
                if let Some(id) = packet.field(0)
                    && self.courtroom_constructed
                {
                    self.present(PresenterEvent::Ban(id.trim().parse().unwrap_or(0)));
                }
            }
            GameHeader::Banned => {
                self.present(PresenterEvent::Notice(BANNED_NOTICE.to_string()));
            }
            GameHeader::ModCall => {
                if let Some(text) = packet.field(0)
                    && self.courtroom_constructed
                {
                    self.present(PresenterEvent::ModCalled(text.to_string()));
                }
            }
            GameHeader::Confirm => {
                let verdict = packet
                    .field(0)
                    .and_then(|code| code.trim().parse().ok())
                    .and_then(Verdict::from_code);
                if let Some(verdict) = verdict
                    && self.courtroom_constructed
                {
                    self.present(PresenterEvent::Confirm(verdict));
                }
            }
            GameHeader::KeepAlive => {}
            GameHeader::Unknown(other) => {
                tracing::debug!("Ignoring unknown game packet {other}");
            }
        }
    }

    fn in_loaded_courtroom(&self) -> bool {
        self.courtroom_constructed && self.session.loaded
    }

    // -----------------------------------------------------------------------
    // Handshake
    // -----------------------------------------------------------------------

    fn on_decryptor(&mut self, packet: &Packet) {
        let Some(token) = packet.field(0) else {
            tracing::warn!("decryptor without a key token");
            return;
        };

        self.session.decryptor_key = decode_key(token);
        self.session.features = FeatureFlags::legacy();
        if token == NO_ENCRYPTION_TOKEN {
            self.session.features.encryption_required = false;
        }
        self.set_phase(SessionPhase::NegotiatingVersion);

        self.request(Request::HardwareId(self.config.hdid.clone()));
    }

    fn on_identify(&mut self, packet: &Packet) {
        let [version, software, ..] = packet.fields.as_slice() else {
            tracing::warn!("ID with {} fields", packet.len());
            return;
        };

        self.session.protocol_version = version.trim().parse().unwrap_or(0);
        self.session.server_software = software.clone();
        tracing::info!(
            "Server runs {} (protocol {})",
            self.session.server_software,
            self.session.protocol_version
        );
        self.set_phase(SessionPhase::AwaitingManifestSizes);

        self.request(Request::Identify(self.config.version));
    }

    // -----------------------------------------------------------------------
    // Manifest loading
    // -----------------------------------------------------------------------

    fn on_server_info(&mut self, packet: &Packet) {
        let [characters, evidence, music] = packet.fields.as_slice() else {
            tracing::warn!("SI with {} fields, expected 3", packet.len());
            return;
        };
        let parse = |field: &String| field.trim().parse::<i64>().ok();
        let Some(sizes) = parse(characters)
            .zip(parse(evidence))
            .zip(parse(music))
            .and_then(|((c, e), m)| ManifestSizes::from_announcement(c, e, m))
        else {
            tracing::warn!("Rejected manifest sizes {characters}/{evidence}/{music}");
            return;
        };

        tracing::info!(
            "Loading {} characters, {} evidence, {} tracks",
            sizes.characters,
            sizes.evidence,
            sizes.music
        );
        self.session.manifest = Some(ManifestProgress::new(sizes));

        self.destruct_courtroom();
        self.construct_courtroom();
        self.session.loaded = false;
        self.set_phase(SessionPhase::LoadingCharacters);

        let title = self.session_title();
        self.present(PresenterEvent::WindowTitle(title));
        self.present(PresenterEvent::ShowLoadingOverlay);
        self.present(PresenterEvent::LoadingText("Loading".to_string()));
        self.present(PresenterEvent::LoadingPercent(0));

        if self.session.features.fast_loading {
            self.request(Request::CharacterList);
        } else {
            self.request(Request::LegacyCharacterList);
        }
    }

    /// Progress counters, when loading may proceed.
    fn loading_manifest(&self) -> Option<ManifestProgress> {
        if !self.courtroom_constructed {
            return None;
        }
        self.session.manifest
    }

    fn on_character_batch(&mut self, packet: &Packet) {
        let Some(mut progress) = self.loading_manifest() else {
            return;
        };
        self.set_phase(SessionPhase::LoadingCharacters);

        let fields = &packet.fields;
        for (position, pair) in fields.chunks(2).enumerate() {
            let expected = i64::from(progress.loaded_characters);
            if pair[0].trim().parse::<i64>().ok() != Some(expected) {
                tracing::debug!("CI index {} out of order, expected {expected}", pair[0]);
                break;
            }
            let Some(payload) = pair.get(1) else {
                break;
            };
            if !progress.characters_remaining() {
                tracing::warn!("CI carries more characters than announced");
                break;
            }
            let Some(entry) = CharacterEntry::from_batch_payload(payload) else {
                tracing::warn!("Malformed character at batch position {position}");
                break;
            };

            progress.loaded_characters += 1;
            self.present(PresenterEvent::LoadingText(format!(
                "Loading chars:\n{}/{}",
                progress.loaded_characters, progress.sizes.characters
            )));
            self.present(PresenterEvent::AppendCharacter(entry));
        }

        let percent = progress.character_percent();
        self.present(PresenterEvent::LoadingPercent(percent));
        self.session.manifest = Some(progress);

        if self.session.features.fast_loading {
            self.request(Request::NextCharacters);
        } else {
            self.request(Request::CharacterBatch(Request::batch_number(
                progress.loaded_characters,
            )));
        }
    }

    fn on_character_list(&mut self, packet: &Packet) {
        let Some(mut progress) = self.loading_manifest() else {
            return;
        };
        self.set_phase(SessionPhase::LoadingCharacters);

        for record in &packet.fields {
            if !progress.characters_remaining() {
                tracing::warn!("SC carries more characters than announced");
                break;
            }
            progress.loaded_characters += 1;
            self.present(PresenterEvent::LoadingText(format!(
                "Loading chars:\n{}/{}",
                progress.loaded_characters, progress.sizes.characters
            )));
            self.present(PresenterEvent::AppendCharacter(
                CharacterEntry::from_list_record(record),
            ));
        }

        let percent = progress.character_percent();
        self.present(PresenterEvent::LoadingPercent(percent));
        self.session.manifest = Some(progress);

        self.request(Request::MusicList);
    }

    fn on_evidence_item(&mut self, packet: &Packet) {
        let Some(mut progress) = self.loading_manifest() else {
            return;
        };
        let [index, payload, ..] = packet.fields.as_slice() else {
            tracing::warn!("EI with {} fields", packet.len());
            return;
        };

        // Evidence indices start at 1.
        let expected = i64::from(progress.loaded_evidence) + 1;
        if index.trim().parse::<i64>().ok() != Some(expected) {
            tracing::debug!("EI index {index} rejected, expected {expected}");
            return;
        }
        if !progress.evidence_remaining() {
            tracing::warn!("EI beyond the announced evidence count");
            return;
        }
        let Some(entry) = EvidenceEntry::from_item_payload(payload) else {
            tracing::warn!("Malformed evidence item {index}");
            return;
        };
        self.set_phase(SessionPhase::LoadingEvidence);

        progress.loaded_evidence += 1;
        self.present(PresenterEvent::LoadingText(format!(
            "Loading evidence:\n{}/{}",
            progress.loaded_evidence, progress.sizes.evidence
        )));
        self.present(PresenterEvent::AppendEvidence(entry));

        let percent = progress.evidence_percent();
        self.present(PresenterEvent::LoadingPercent(percent));
        self.session.manifest = Some(progress);

        self.request(Request::EvidenceItem(progress.loaded_evidence));
    }

    fn on_music_batch(&mut self, packet: &Packet) {
        let Some(mut progress) = self.loading_manifest() else {
            return;
        };
        self.set_phase(SessionPhase::LoadingMusic);

        for pair in packet.fields.chunks(2) {
            let expected = i64::from(progress.loaded_music);
            if pair[0].trim().parse::<i64>().ok() != Some(expected) {
                tracing::debug!("EM index {} out of order, expected {expected}", pair[0]);
                break;
            }
            let Some(track) = pair.get(1) else {
                break;
            };
            if !progress.music_remaining() {
                tracing::warn!("EM carries more tracks than announced");
                break;
            }

            progress.loaded_music += 1;
            self.present(PresenterEvent::LoadingText(format!(
                "Loading music:\n{}/{}",
                progress.loaded_music, progress.sizes.music
            )));
            self.present(PresenterEvent::AppendMusic(MusicEntry::new(track.clone())));
        }

        let percent = progress.music_batch_percent();
        self.present(PresenterEvent::LoadingPercent(percent));
        self.session.manifest = Some(progress);

        self.request(Request::MusicBatch(Request::batch_number(
            progress.loaded_music,
        )));
    }

    fn on_music_list(&mut self, packet: &Packet) {
        let Some(mut progress) = self.loading_manifest() else {
            return;
        };
        self.set_phase(SessionPhase::LoadingMusic);

        for track in &packet.fields {
            if !progress.music_remaining() {
                tracing::warn!("SM carries more tracks than announced");
                break;
            }
            progress.loaded_music += 1;
            self.present(PresenterEvent::LoadingText(format!(
                "Loading music:\n{}/{}",
                progress.loaded_music, progress.sizes.music
            )));
            self.present(PresenterEvent::AppendMusic(MusicEntry::new(track.clone())));
        }

        let percent = progress.music_list_percent(self.config.music_progress);
        self.present(PresenterEvent::LoadingPercent(percent));
        self.session.manifest = Some(progress);

        self.request(Request::Ready);
    }

    fn on_chars_check(&mut self, packet: &Packet) {
        if !self.courtroom_constructed {
            return;
        }
        if self.session.phase != SessionPhase::SessionReady {
            self.set_phase(SessionPhase::LoadingCharsCheck);
        }

        for (index, value) in packet.fields.iter().enumerate() {
            self.present(PresenterEvent::SetCharacterTaken {
                index,
                taken: value == TAKEN_SENTINEL,
            });
        }
    }

    fn on_done(&mut self) {
        if !self.courtroom_constructed {
            return;
        }

        if self.lobby_constructed {
            let log = self.presenter.lobby_chat_log();
            self.present(PresenterEvent::CourtroomMasterChat {
                name: String::new(),
                message: log,
            });
        }
        self.present(PresenterEvent::SessionReady);
        self.session.loaded = true;
        self.set_phase(SessionPhase::SessionReady);
        tracing::info!("Session ready");

        self.destruct_lobby();
    }

    // -----------------------------------------------------------------------
    // Courtroom membership
    // -----------------------------------------------------------------------

    fn on_character_assigned(&mut self, packet: &Packet) {
        let [_, _, cid] = packet.fields.as_slice() else {
            tracing::warn!("PV with {} fields, expected 3", packet.len());
            return;
        };
        if !self.courtroom_constructed {
            return;
        }
        let cid = cid.trim().parse().unwrap_or(0);
        self.session.cid = Some(cid);
        self.present(PresenterEvent::EnterCourtroom(cid));
    }

    fn on_mute(&mut self, packet: &Packet, muted: bool) {
        if let Some(id) = packet.field(0)
            && self.courtroom_constructed
        {
            self.present(PresenterEvent::Mute {
                muted,
                id: id.trim().parse().unwrap_or(0),
            });
        }
    }

    fn on_kick(&mut self, packet: &Packet) {
        if !self.courtroom_constructed {
            return;
        }
        if let Some(target) = packet.field(0) {
            let Ok(target) = target.trim().parse::<i32>() else {
                tracing::debug!("Ignoring KK with target {target}");
                return;
            };
            if target != BROADCAST_CID && Some(target) != self.session.cid {
                return;
            }
        }

        tracing::info!("Kicked from the server");
        self.present(PresenterEvent::Notice(KICKED_NOTICE.to_string()));
        if !self.lobby_constructed {
            self.construct_lobby();
        }
        self.destruct_courtroom();
    }
}
