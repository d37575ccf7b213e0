use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// Four-character box type. Compared byte-for-byte, never as text.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub fn from_str(s: &str) -> Option<Self> {
        let b = s.as_bytes();
        if b.len() == 4 {
            Some(FourCC([b[0], b[1], b[2], b[3]]))
        } else { None }
    }
    pub fn as_str_lossy(&self) -> String {
        self.0.iter().map(|&c| if (32..=126).contains(&c) { c as char } else { '.' })
            .collect()
    }
}
impl fmt::Debug for FourCC { fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.as_str_lossy()) } }
impl fmt::Display for FourCC { fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.as_str_lossy()) } }

impl From<&[u8; 4]> for FourCC {
    fn from(b: &[u8; 4]) -> Self { FourCC(*b) }
}

impl PartialEq<[u8; 4]> for FourCC {
    fn eq(&self, other: &[u8; 4]) -> bool { &self.0 == other }
}

impl PartialEq<&[u8; 4]> for FourCC {
    fn eq(&self, other: &&[u8; 4]) -> bool { &self.0 == *other }
}

impl Serialize for FourCC {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(&self.as_str_lossy())
    }
}

impl<'de> Deserialize<'de> for FourCC {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        FourCC::from_str(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("fourcc must be 4 bytes, got {s:?}")))
    }
}

/// Offset range of one length-prefixed record in a stream.
///
/// This is a descriptor only; the payload has to be fetched separately
/// (see [`crate::parser::read_box_content`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoxRange {
    pub content_offset: u64,
    pub content_length: u64,
    /// 2 or 4 for length-prefixed NAL units, 8 or 16 for boxes.
    pub header_length: u64,
}

impl BoxRange {
    pub fn header_offset(&self) -> u64 {
        self.content_offset - self.header_length
    }
    pub fn end_offset(&self) -> u64 {
        self.content_offset + self.content_length
    }
    pub fn total_length(&self) -> u64 {
        self.content_length + self.header_length
    }
}

impl PartialOrd for BoxRange {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

// Siblings are ordered by where their header starts.
impl Ord for BoxRange {
    fn cmp(&self, other: &Self) -> Ordering {
        self.header_offset()
            .cmp(&other.header_offset())
            .then(self.total_length().cmp(&other.total_length()))
            .then(self.header_length.cmp(&other.header_length))
    }
}

/// A box header located in a stream: its range plus its type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Atom {
    pub range: BoxRange,
    pub typ: FourCC,
}

impl Atom {
    pub fn new(content_offset: u64, content_length: u64, header_length: u64, typ: FourCC) -> Self {
        Atom { range: BoxRange { content_offset, content_length, header_length }, typ }
    }

    pub fn is_type(&self, t: &[u8; 4]) -> bool { self.typ == *t }

    pub fn content_offset(&self) -> u64 { self.range.content_offset }
    pub fn content_length(&self) -> u64 { self.range.content_length }
    pub fn header_offset(&self) -> u64 { self.range.header_offset() }
    pub fn end_offset(&self) -> u64 { self.range.end_offset() }

    pub fn is_container(&self) -> bool {
        crate::known_boxes::KnownBox::from(self.typ).is_container()
    }

    /// Offset of the first child relative to `content_offset`.
    pub fn child_offset(&self) -> u64 {
        crate::known_boxes::KnownBox::from(self.typ).child_offset()
    }

    /// Absolute offset where the first child header starts.
    pub fn children_start(&self) -> u64 {
        self.content_offset().saturating_add(self.child_offset())
    }
}

/// Version byte and 24-bit flags that open every full box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FullBoxHeader {
    pub version: u8,
    pub flags: u32,
}
