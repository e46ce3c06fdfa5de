//! Outbound requests the client issues on its own.

use gavel_net::Packet;

use crate::version::ClientVersion;

/// Client software name sent in `ID`.
pub const CLIENT_SOFTWARE: &str = "AO2";

/// A request sent on either channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `ID#AO2#<version>`
    Identify(ClientVersion),
    /// `HI#<hdid>`
    HardwareId(String),
    /// `ALL`: public server directory.
    ServerList,
    /// `RC`: full character list (fast loading).
    CharacterList,
    /// `askchar2`: start of indexed character loading.
    LegacyCharacterList,
    /// `RE`: continue after an indexed batch on a fast-loading server.
    NextCharacters,
    /// `AN#<n>`: indexed character batch.
    CharacterBatch(i64),
    /// `RM`: full music list (fast loading).
    MusicList,
    /// `AE#<n>`: one evidence item.
    EvidenceItem(u32),
    /// `AM#<n>`: indexed music batch.
    MusicBatch(i64),
    /// `RD`: manifest done, ask for `DONE`.
    Ready,
}

impl Request {
    /// Batch number for the next indexed request after `loaded` items.
    pub fn batch_number(loaded: u32) -> i64 {
        ((i64::from(loaded) - 1) / 10) + 1
    }

    /// The wire header.
    pub fn header(&self) -> &'static str {
        match self {
            Request::Identify(_) => "ID",
            Request::HardwareId(_) => "HI",
            Request::ServerList => "ALL",
            Request::CharacterList => "RC",
            Request::LegacyCharacterList => "askchar2",
            Request::NextCharacters => "RE",
            Request::CharacterBatch(_) => "AN",
            Request::MusicList => "RM",
            Request::EvidenceItem(_) => "AE",
            Request::MusicBatch(_) => "AM",
            Request::Ready => "RD",
        }
    }

    pub fn to_packet(&self) -> Packet {
        let header = self.header();
        match self {
            Request::Identify(version) => {
                Packet::new(header, [CLIENT_SOFTWARE.to_string(), version.to_string()])
            }
            Request::HardwareId(hdid) => Packet::new(header, [hdid.clone()]),
            Request::CharacterBatch(n) | Request::MusicBatch(n) => {
                Packet::new(header, [n.to_string()])
            }
            Request::EvidenceItem(n) => Packet::new(header, [n.to_string()]),
            _ => Packet::header_only(header),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identify_wire() {
        let packet = Request::Identify(ClientVersion::new(2, 9, 1)).to_packet();
        assert_eq!(packet.encode(), "ID#AO2#2.9.1#%");
    }

    #[test]
    fn test_header_only_wire() {
        assert_eq!(Request::ServerList.to_packet().encode(), "ALL#%");
        assert_eq!(Request::LegacyCharacterList.to_packet().encode(), "askchar2#%");
        assert_eq!(Request::Ready.to_packet().encode(), "RD#%");
    }

    #[test]
    fn test_numbered_requests() {
        assert_eq!(Request::EvidenceItem(3).to_packet().encode(), "AE#3#%");
        assert_eq!(Request::MusicBatch(2).to_packet().encode(), "AM#2#%");
        assert_eq!(Request::HardwareId("abc".into()).to_packet().encode(), "HI#abc#%");
    }

    #[test]
    fn test_batch_number() {
        assert_eq!(Request::batch_number(0), 1);
        assert_eq!(Request::batch_number(1), 1);
        assert_eq!(Request::batch_number(10), 1);
        assert_eq!(Request::batch_number(11), 2);
        assert_eq!(Request::batch_number(20), 2);
        assert_eq!(Request::batch_number(21), 3);
    }
}
