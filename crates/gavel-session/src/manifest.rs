//! Manifest items and the parsed payloads handed to the presenter.
//!
//! Parsers return `None` when a payload is below its minimum sub-field
//! count; the dispatcher treats that as a malformed packet.

use gavel_net::packet::split_sub_fields;

/// One playable character slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterEntry {
    /// Character folder name.
    pub name: String,
    /// Short description.
    pub description: String,
    /// Evidence string carried by indexed batches, when present.
    pub evidence_string: Option<String>,
    /// Provisional until `CharsCheck` says otherwise.
    pub taken: bool,
}

impl CharacterEntry {
    /// Parse an indexed-batch (`CI`) payload: `name&description&...&evidence`.
    ///
    /// Needs at least name and description; the evidence string is read from
    /// the fourth sub-field when present.
    pub fn from_batch_payload(payload: &str) -> Option<Self> {
        let sub = split_sub_fields(payload);
        if sub.len() < 2 {
            return None;
        }
        Some(Self {
            name: sub[0].to_string(),
            description: sub[1].to_string(),
            evidence_string: sub.get(3).map(|s| s.to_string()),
            taken: false,
        })
    }

    /// Parse a fast-loading (`SC`) record: `name[&description...]`.
    pub fn from_list_record(record: &str) -> Self {
        let sub = split_sub_fields(record);
        Self {
            name: sub.first().copied().unwrap_or_default().to_string(),
            description: sub.get(1).copied().unwrap_or_default().to_string(),
            evidence_string: None,
            taken: false,
        }
    }
}

/// One piece of evidence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceEntry {
    /// Display name.
    pub name: String,
    /// Description text.
    pub description: String,
    /// Image file reference.
    pub image: String,
}

impl EvidenceEntry {
    /// Parse an `EI` payload: `name&description&<unused>&image`.
    pub fn from_item_payload(payload: &str) -> Option<Self> {
        let sub = split_sub_fields(payload);
        if sub.len() < 4 {
            return None;
        }
        Some(Self {
            name: sub[0].to_string(),
            description: sub[1].to_string(),
            image: sub[3].to_string(),
        })
    }

    /// Parse an `LE` list entry: `name&description&image`.
    pub fn from_list_entry(entry: &str) -> Option<Self> {
        let sub = split_sub_fields(entry);
        if sub.len() < 3 {
            return None;
        }
        Some(Self {
            name: sub[0].to_string(),
            description: sub[1].to_string(),
            image: sub[2].to_string(),
        })
    }
}

/// One music track (or area/category label).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MusicEntry {
    /// Track name as sent by the server.
    pub name: String,
}

impl MusicEntry {
    /// Wrap a track name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Qt-style integer read: anything unparseable is 0.
fn int_field(fields: &[String], index: usize) -> i32 {
    fields
        .get(index)
        .and_then(|f| f.trim().parse().ok())
        .unwrap_or(0)
}

/// Number of fields in an `MS` packet.
pub const IC_MESSAGE_FIELDS: usize = 15;

/// An in-character chat message (`MS`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcMessage {
    pub desk_mod: String,
    pub pre_emote: String,
    pub character: String,
    pub emote: String,
    pub message: String,
    pub side: String,
    pub sfx_name: String,
    pub emote_modifier: i32,
    pub char_id: i32,
    pub sfx_delay: i32,
    pub objection_modifier: i32,
    pub evidence: i32,
    pub flip: bool,
    pub realization: bool,
    pub text_color: i32,
}

impl IcMessage {
    /// Parse the fields of an `MS` packet. Extra trailing fields are ignored.
    pub fn parse(fields: &[String]) -> Option<Self> {
        if fields.len() < IC_MESSAGE_FIELDS {
            return None;
        }
        Some(Self {
            desk_mod: fields[0].clone(),
            pre_emote: fields[1].clone(),
            character: fields[2].clone(),
            emote: fields[3].clone(),
            message: fields[4].clone(),
            side: fields[5].clone(),
            sfx_name: fields[6].clone(),
            emote_modifier: int_field(fields, 7),
            char_id: int_field(fields, 8),
            sfx_delay: int_field(fields, 9),
            objection_modifier: int_field(fields, 10),
            evidence: int_field(fields, 11),
            flip: int_field(fields, 12) == 1,
            realization: int_field(fields, 13) == 1,
            text_color: int_field(fields, 14),
        })
    }
}

/// A music or area change (`MC`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongChange {
    /// Track (or area) name.
    pub track: String,
    /// Character that triggered it, `-1` for the server.
    pub char_id: i32,
}

impl SongChange {
    /// Needs track and character id.
    pub fn parse(fields: &[String]) -> Option<Self> {
        if fields.len() < 2 {
            return None;
        }
        Some(Self {
            track: fields[0].clone(),
            char_id: int_field(fields, 1),
        })
    }
}

/// Court-proceeding animation requested by `RT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WtceKind {
    /// `testimony1`
    WitnessTestimony,
    /// `testimony2`
    CrossExamination,
    /// `judgeruling`
    JudgeRuling,
    /// Any other token, passed through.
    Other(String),
}

impl WtceKind {
    pub fn from_wire(token: &str) -> Self {
        match token {
            "testimony1" => Self::WitnessTestimony,
            "testimony2" => Self::CrossExamination,
            "judgeruling" => Self::JudgeRuling,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Outcome confirmed by a `confirm` packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Guilty,
    NotGuilty,
}

impl Verdict {
    /// `0` is guilty, `1` not guilty; other codes have no meaning.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Guilty),
            1 => Some(Self::NotGuilty),
            _ => None,
        }
    }
}
