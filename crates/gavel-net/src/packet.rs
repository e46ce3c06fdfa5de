//! Text packet codec.
//!
//! Every packet on the wire is UTF-8 text:
//!
//! ```text
//! HEADER#field1#field2#...#%
//! ```
//!
//! Fields are separated by `#` and the packet is terminated by `%`. Some
//! fields carry sub-fields separated by `&`. Characters that would collide
//! with the framing are escaped inside fields (see [`escape`]).

/// Separates the header and the fields of a packet.
pub const FIELD_SEPARATOR: char = '#';

/// Terminates a packet on the wire.
pub const TERMINATOR: char = '%';

/// Separates sub-fields inside a single field.
pub const SUB_FIELD_SEPARATOR: char = '&';

/// Escape table applied to outgoing fields, in application order.
const ESCAPES: [(&str, &str); 4] = [
    ("#", "<num>"),
    ("%", "<percent>"),
    ("$", "<dollar>"),
    ("&", "<and>"),
];

/// A single decoded protocol packet.
///
/// The header is the first `#`-delimited segment; everything after it is an
/// ordered list of fields. A packet with an empty header is unroutable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Packet {
    /// Packet header token, e.g. `ID` or `decryptor`.
    pub header: String,
    /// Ordered field strings.
    pub fields: Vec<String>,
}

impl Packet {
    /// Build a packet from a header and its fields.
    pub fn new<H, I, S>(header: H, fields: I) -> Self
    where
        H: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            header: header.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Build a packet with no fields.
    pub fn header_only(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            fields: Vec::new(),
        }
    }

    /// Decode a raw packet string.
    ///
    /// A trailing terminator is stripped if present, then the single trailing
    /// field separator emitted by [`encode`](Self::encode). Empty or
    /// headerless input yields an empty packet rather than an error.
    pub fn decode(raw: &str) -> Self {
        let body = raw.strip_suffix(TERMINATOR).unwrap_or(raw);
        let body = body.strip_suffix(FIELD_SEPARATOR).unwrap_or(body);

        let mut segments = body.split(FIELD_SEPARATOR);
        let header = segments.next().unwrap_or_default();
        if header.is_empty() {
            return Self::default();
        }

        Self {
            header: header.to_string(),
            fields: segments.map(str::to_string).collect(),
        }
    }

    /// Encode the packet to its wire form, terminator included.
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(
            self.header.len() + self.fields.iter().map(|f| f.len() + 1).sum::<usize>() + 2,
        );
        out.push_str(&self.header);
        for field in &self.fields {
            out.push(FIELD_SEPARATOR);
            out.push_str(field);
        }
        out.push(FIELD_SEPARATOR);
        out.push(TERMINATOR);
        out
    }

    /// Whether the dispatcher can route this packet.
    pub fn is_routable(&self) -> bool {
        !self.header.is_empty()
    }

    /// Field at `index`, if present.
    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the packet carries no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Escape framing characters in every field.
    pub fn escape_fields(&mut self) {
        for field in &mut self.fields {
            *field = escape(field);
        }
    }

    /// Reverse [`escape_fields`](Self::escape_fields).
    pub fn unescape_fields(&mut self) {
        for field in &mut self.fields {
            *field = unescape(field);
        }
    }
}

/// Replace framing characters with their escaped tokens.
pub fn escape(text: &str) -> String {
    ESCAPES
        .iter()
        .fold(text.to_string(), |acc, (raw, token)| acc.replace(raw, token))
}

/// Replace escaped tokens with the characters they stand for.
pub fn unescape(text: &str) -> String {
    ESCAPES
        .iter()
        .fold(text.to_string(), |acc, (raw, token)| acc.replace(token, raw))
}

/// Split a field into its `&`-separated sub-fields.
pub fn split_sub_fields(field: &str) -> Vec<&str> {
    field.split(SUB_FIELD_SEPARATOR).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_header_and_fields() {
        let packet = Packet::decode("ID#1#tsuserver3#");
        assert_eq!(packet.header, "ID");
        assert_eq!(packet.fields, vec!["1", "tsuserver3"]);
    }

    #[test]
    fn test_decode_strips_terminator() {
        let packet = Packet::decode("PN#3#100#%");
        assert_eq!(packet.header, "PN");
        assert_eq!(packet.fields, vec!["3", "100"]);
    }

    #[test]
    fn test_decode_without_trailing_separator() {
        let packet = Packet::decode("CT#name#hello");
        assert_eq!(packet.fields, vec!["name", "hello"]);
    }

    #[test]
    fn test_decode_header_only() {
        let packet = Packet::decode("DONE#");
        assert_eq!(packet.header, "DONE");
        assert!(packet.is_empty());
    }

    #[test]
    fn test_decode_empty_is_unroutable() {
        let packet = Packet::decode("");
        assert!(!packet.is_routable());
        assert!(packet.fields.is_empty());

        let headerless = Packet::decode("#a#b#");
        assert!(!headerless.is_routable());
        assert!(headerless.fields.is_empty());
    }

    #[test]
    fn test_encode_wire_form() {
        let packet = Packet::new("AN", ["3"]);
        assert_eq!(packet.encode(), "AN#3#%");
        assert_eq!(Packet::header_only("RC").encode(), "RC#%");
    }

    #[test]
    fn test_decode_inverts_encode() {
        let packets = [
            Packet::header_only("askchar2"),
            Packet::new("ID", ["AO2", "2.6.2"]),
            Packet::new("CT", ["", "trailing empty", ""]),
            Packet::new("MS", ["chat", "-", "Phoenix", "normal", "Hold it!"]),
        ];
        for packet in packets {
            assert_eq!(Packet::decode(&packet.encode()), packet);
        }
    }

    #[test]
    fn test_escape_roundtrip() {
        let text = "50% off #1 & $5";
        let escaped = escape(text);
        assert!(!escaped.contains('#'));
        assert!(!escaped.contains('%'));
        assert!(!escaped.contains('&'));
        assert_eq!(escaped, "50<percent> off <num>1 <and> <dollar>5");
        assert_eq!(unescape(&escaped), text);
    }

    #[test]
    fn test_escape_fields_leaves_header() {
        let mut packet = Packet::new("CT", ["me", "a#b"]);
        packet.escape_fields();
        assert_eq!(packet.encode(), "CT#me#a<num>b#%");
        packet.unescape_fields();
        assert_eq!(packet.field(1), Some("a#b"));
    }

    #[test]
    fn test_split_sub_fields() {
        assert_eq!(
            split_sub_fields("Phoenix&Defense attorney&0&badge"),
            vec!["Phoenix", "Defense attorney", "0", "badge"]
        );
    }
}
