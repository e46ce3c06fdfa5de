//! Typed packet headers for both channels.
//!
//! Every header the client reacts to has a variant; anything else lands in
//! `Unknown` and is ignored by the dispatcher.

/// Headers received from the master directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MasterHeader {
    /// `ALL`: full public server listing.
    ServerList,
    /// `CT`: directory-wide chat relay.
    Chat,
    /// `AO2CHECK`: capability check carrying the minimum client version.
    VersionCheck,
    /// `DOOM`: the client is exiled from the directory.
    Exile,
    /// `CHECK`: keep-alive.
    KeepAlive,
    /// Anything else.
    Unknown(String),
}

impl MasterHeader {
    /// Classify a raw header token. Matching is case-sensitive.
    pub fn from_wire(header: &str) -> Self {
        match header {
            "ALL" => Self::ServerList,
            "CT" => Self::Chat,
            "AO2CHECK" => Self::VersionCheck,
            "DOOM" => Self::Exile,
            "CHECK" => Self::KeepAlive,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// The wire token.
    pub fn as_str(&self) -> &str {
        match self {
            Self::ServerList => "ALL",
            Self::Chat => "CT",
            Self::VersionCheck => "AO2CHECK",
            Self::Exile => "DOOM",
            Self::KeepAlive => "CHECK",
            Self::Unknown(other) => other,
        }
    }
}

/// Headers received from a game server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameHeader {
    /// `decryptor`: header key token, starts the handshake.
    Decryptor,
    /// `ID`: protocol version and server software.
    Identify,
    /// `CT`: out-of-character chat.
    Chat,
    /// `FL`: feature list.
    FeatureList,
    /// `PN`: player count.
    PlayerCount,
    /// `SI`: manifest sizes.
    ServerInfo,
    /// `CI`: indexed character batch.
    CharacterBatch,
    /// `SC`: full character list (fast loading).
    CharacterList,
    /// `EI`: one evidence item.
    EvidenceItem,
    /// `EM`: indexed music batch.
    MusicBatch,
    /// `SM`: full music list (fast loading).
    MusicList,
    /// `CharsCheck`: authoritative taken flags.
    CharsCheck,
    /// `DONE`: manifest transfer finished.
    Done,
    /// `BN`: background change.
    Background,
    /// `PV`: character accepted, carries the client id.
    CharacterAssigned,
    /// `MS`: in-character message.
    IcMessage,
    /// `MC`: music or area change.
    MusicChange,
    /// `RT`: court-proceeding animation.
    Wtce,
    /// `HP`: health bar update.
    HealthBar,
    /// `LE`: evidence list replacement.
    EvidenceList,
    /// `IL`: IP list text.
    IpList,
    /// `MU`: mute a client.
    Mute,
    /// `UM`: unmute a client.
    Unmute,
    /// `KK`: kick.
    Kick,
    /// `KB`: ban of a client id.
    Ban,
    /// `BD`: this client is banned.
    Banned,
    /// `ZZ`: moderator call.
    ModCall,
    /// `confirm`: verdict confirmation.
    Confirm,
    /// `checkconnection`: keep-alive.
    KeepAlive,
    /// Anything else.
    Unknown(String),
}

impl GameHeader {
    /// Classify a raw header token. Matching is case-sensitive.
    pub fn from_wire(header: &str) -> Self {
        match header {
            "decryptor" => Self::Decryptor,
            "ID" => Self::Identify,
            "CT" => Self::Chat,
            "FL" => Self::FeatureList,
            "PN" => Self::PlayerCount,
            "SI" => Self::ServerInfo,
            "CI" => Self::CharacterBatch,
            "SC" => Self::CharacterList,
            "EI" => Self::EvidenceItem,
            "EM" => Self::MusicBatch,
            "SM" => Self::MusicList,
            "CharsCheck" => Self::CharsCheck,
            "DONE" => Self::Done,
            "BN" => Self::Background,
            "PV" => Self::CharacterAssigned,
            "MS" => Self::IcMessage,
            "MC" => Self::MusicChange,
            "RT" => Self::Wtce,
            "HP" => Self::HealthBar,
            "LE" => Self::EvidenceList,
            "IL" => Self::IpList,
            "MU" => Self::Mute,
            "UM" => Self::Unmute,
            "KK" => Self::Kick,
            "KB" => Self::Ban,
            "BD" => Self::Banned,
            "ZZ" => Self::ModCall,
            "confirm" => Self::Confirm,
            "checkconnection" => Self::KeepAlive,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// The wire token.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Decryptor => "decryptor",
            Self::Identify => "ID",
            Self::Chat => "CT",
            Self::FeatureList => "FL",
            Self::PlayerCount => "PN",
            Self::ServerInfo => "SI",
            Self::CharacterBatch => "CI",
            Self::CharacterList => "SC",
            Self::EvidenceItem => "EI",
            Self::MusicBatch => "EM",
            Self::MusicList => "SM",
            Self::CharsCheck => "CharsCheck",
            Self::Done => "DONE",
            Self::Background => "BN",
            Self::CharacterAssigned => "PV",
            Self::IcMessage => "MS",
            Self::MusicChange => "MC",
            Self::Wtce => "RT",
            Self::HealthBar => "HP",
            Self::EvidenceList => "LE",
            Self::IpList => "IL",
            Self::Mute => "MU",
            Self::Unmute => "UM",
            Self::Kick => "KK",
            Self::Ban => "KB",
            Self::Banned => "BD",
            Self::ModCall => "ZZ",
            Self::Confirm => "confirm",
            Self::KeepAlive => "checkconnection",
            Self::Unknown(other) => other,
        }
    }
}
