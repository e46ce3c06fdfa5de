//! Per-connection session state: negotiated capabilities, header key and
//! manifest loading counters.

use gavel_config::MusicProgress;

/// Where a game connection is in its handshake.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionPhase {
    /// No game connection.
    #[default]
    Disconnected,
    /// Connected, waiting for `decryptor`.
    AwaitingHandshake,
    /// Sent `HI`, waiting for `ID`.
    NegotiatingVersion,
    /// Identified, waiting for `SI`.
    AwaitingManifestSizes,
    /// Receiving `CI` / `SC`.
    LoadingCharacters,
    /// Receiving `EI`.
    LoadingEvidence,
    /// Receiving `EM` / `SM`.
    LoadingMusic,
    /// Received `CharsCheck` before `DONE`.
    LoadingCharsCheck,
    /// `DONE` received.
    SessionReady,
}

/// Capabilities negotiated with the game server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Outgoing headers are enciphered with the session key.
    pub encryption_required: bool,
    pub yellow_text: bool,
    pub flipping: bool,
    pub custom_objections: bool,
    /// Use `RC`/`SC`/`RM`/`SM`/`RD` instead of the indexed requests.
    pub fast_loading: bool,
    pub desk_mod: bool,
    pub evidence: bool,
}

impl FeatureFlags {
    /// Values assumed once `decryptor` arrives: encryption on, every
    /// enhancement off.
    pub fn legacy() -> Self {
        Self {
            encryption_required: true,
            ..Self::default()
        }
    }

    /// Turn on every flag whose keyword appears anywhere in `packet_text`,
    /// case-insensitively. Flags are never turned off here except
    /// encryption, by `noencryption`.
    pub fn apply_feature_list(&mut self, packet_text: &str) {
        let text = packet_text.to_ascii_lowercase();
        let has = |keyword: &str| text.contains(keyword);

        if has("yellowtext") {
            self.yellow_text = true;
        }
        if has("flipping") {
            self.flipping = true;
        }
        if has("customobjections") {
            self.custom_objections = true;
        }
        if has("fastloading") {
            self.fast_loading = true;
        }
        if has("noencryption") {
            self.encryption_required = false;
        }
        if has("deskmod") {
            self.desk_mod = true;
        }
        if has("evidence") {
            self.evidence = true;
        }
    }
}

/// Manifest sizes announced by `SI`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManifestSizes {
    pub characters: u32,
    pub evidence: u32,
    pub music: u32,
}

impl ManifestSizes {
    /// Validate an `SI` triple: at least one character, no negative counts.
    pub fn from_announcement(characters: i64, evidence: i64, music: i64) -> Option<Self> {
        if characters < 1 || evidence < 0 || music < 0 {
            return None;
        }
        Some(Self {
            characters: u32::try_from(characters).ok()?,
            evidence: u32::try_from(evidence).ok()?,
            music: u32::try_from(music).ok()?,
        })
    }

    /// Sum of all three sizes.
    pub fn total(&self) -> u64 {
        u64::from(self.characters) + u64::from(self.evidence) + u64::from(self.music)
    }
}

/// Loading counters for the current manifest transfer.
///
/// Counters only grow and never pass the announced sizes; callers check
/// the `*_remaining` helpers before counting an item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManifestProgress {
    pub sizes: ManifestSizes,
    pub loaded_characters: u32,
    pub loaded_evidence: u32,
    pub loaded_music: u32,
    /// Highest percentage reported so far.
    last_percent: u8,
}

impl ManifestProgress {
    /// Fresh counters for a new announcement.
    pub fn new(sizes: ManifestSizes) -> Self {
        Self {
            sizes,
            ..Self::default()
        }
    }

    pub fn characters_remaining(&self) -> bool {
        self.loaded_characters < self.sizes.characters
    }

    pub fn evidence_remaining(&self) -> bool {
        self.loaded_evidence < self.sizes.evidence
    }

    pub fn music_remaining(&self) -> bool {
        self.loaded_music < self.sizes.music
    }

    /// Percentage after a character batch.
    pub fn character_percent(&mut self) -> u8 {
        self.report(u64::from(self.loaded_characters))
    }

    /// Percentage after an evidence item.
    pub fn evidence_percent(&mut self) -> u8 {
        self.report(u64::from(self.loaded_characters) + u64::from(self.loaded_evidence))
    }

    /// Percentage after an indexed music batch; always counts music.
    pub fn music_batch_percent(&mut self) -> u8 {
        self.report(self.loaded_total())
    }

    /// Percentage after a fast-loading music list.
    pub fn music_list_percent(&mut self, accounting: MusicProgress) -> u8 {
        let loaded = match accounting {
            MusicProgress::Legacy => {
                u64::from(self.loaded_characters) + u64::from(self.loaded_evidence)
            }
            MusicProgress::Full => self.loaded_total(),
        };
        self.report(loaded)
    }

    fn loaded_total(&self) -> u64 {
        u64::from(self.loaded_characters)
            + u64::from(self.loaded_evidence)
            + u64::from(self.loaded_music)
    }

    /// `loaded / total * 100`, rounded down, never below an earlier report.
    fn report(&mut self, loaded: u64) -> u8 {
        let total = self.sizes.total().max(1);
        let percent = (loaded.min(total) * 100 / total) as u8;
        self.last_percent = self.last_percent.max(percent);
        self.last_percent
    }
}

/// State of one game connection. Replaced wholesale on every new connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub phase: SessionPhase,
    /// Protocol version from `ID`.
    pub protocol_version: i32,
    /// Server software name from `ID`.
    pub server_software: String,
    pub features: FeatureFlags,
    /// Header key from `decryptor`.
    pub decryptor_key: u32,
    /// `None` until the first accepted `SI`.
    pub manifest: Option<ManifestProgress>,
    /// Set by `DONE`.
    pub loaded: bool,
    /// Assigned by `PV`.
    pub cid: Option<i32>,
}

impl SessionState {
    /// State for a freshly established connection.
    pub fn connected() -> Self {
        Self {
            phase: SessionPhase::AwaitingHandshake,
            ..Self::default()
        }
    }

    /// Key to encipher outgoing headers with, if the session requires it.
    pub fn header_key(&self) -> Option<u32> {
        self.features
            .encryption_required
            .then_some(self.decryptor_key)
    }
}
