use crate::boxes::{Atom, BoxRange, FourCC, FullBoxHeader};
use crate::nalu::{Nalu, NaluKind};
use crate::util::read_slice;
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{Read, Seek, SeekFrom};

#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid box size {size} at offset {offset:#x}")]
    InvalidSize { offset: u64, size: u64 },
    #[error("box must have a 2 or 4 byte length field, got {0}")]
    MalformedLength(usize),
    #[error("structural violation: {0}")]
    Structure(String),
    #[error("{what}: exactly one supported, found {count}")]
    Cardinality { what: &'static str, count: usize },
    #[error("atom '{0}' not found")]
    NotFound(FourCC),
    #[error("{what} with {count} entries exceeds the table limit")]
    TooLarge { what: &'static str, count: u64 },
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// Most entries a table read from a file may expand to.
pub const MAX_TABLE_ENTRIES: u64 = 1 << 27;

/// Empty vector with room for `count` entries of a file-declared table.
pub(crate) fn alloc_table<T>(what: &'static str, count: u64) -> Result<Vec<T>> {
    let mut v = Vec::new();
    if count > MAX_TABLE_ENTRIES || v.try_reserve_exact(count as usize).is_err() {
        return Err(ParseError::TooLarge { what, count });
    }
    Ok(v)
}

pub fn stream_len<R: Seek + ?Sized>(r: &mut R) -> Result<u64> {
    Ok(r.seek(SeekFrom::End(0))?)
}

/// Parse the box header starting at `offset`.
///
/// A 32-bit length of 1 selects the 64-bit extended length (16 byte header),
/// a length of 0 means the box runs to the end of the stream.
pub fn read_atom_at<R: Read + Seek + ?Sized>(r: &mut R, offset: u64) -> Result<Atom> {
    r.seek(SeekFrom::Start(offset))?;
    let size32 = r.read_u32::<BigEndian>()?;
    let mut typ = [0u8; 4];
    r.read_exact(&mut typ)?;

    let (size, header_length) = match size32 {
        1 => (r.read_u64::<BigEndian>()?, 16),
        0 => (stream_len(r)?.saturating_sub(offset), 8),
        n => (n as u64, 8),
    };
    if size < header_length || offset.checked_add(size).is_none() {
        return Err(ParseError::InvalidSize { offset, size });
    }

    Ok(Atom::new(offset + header_length, size - header_length, header_length, FourCC(typ)))
}

/// Parse a header-less record with a 2 or 4 byte big-endian length prefix.
pub fn read_simple_box_at<R: Read + Seek + ?Sized>(
    r: &mut R,
    offset: u64,
    length_field_size: usize,
) -> Result<BoxRange> {
    r.seek(SeekFrom::Start(offset))?;
    let content_length = match length_field_size {
        2 => r.read_u16::<BigEndian>()? as u64,
        4 => r.read_u32::<BigEndian>()? as u64,
        n => return Err(ParseError::MalformedLength(n)),
    };
    let fits = offset
        .checked_add(length_field_size as u64)
        .and_then(|c| c.checked_add(content_length))
        .is_some();
    if !fits {
        return Err(ParseError::InvalidSize { offset, size: content_length });
    }
    Ok(BoxRange {
        content_offset: offset + length_field_size as u64,
        content_length,
        header_length: length_field_size as u64,
    })
}

/// Read a length-prefixed NAL unit and classify it from its first byte.
///
/// An empty unit has no header byte to classify and is rejected.
pub fn read_nalu_at<R: Read + Seek + ?Sized>(
    r: &mut R,
    offset: u64,
    length_field_size: usize,
    kind: NaluKind,
) -> Result<Nalu> {
    let range = read_simple_box_at(r, offset, length_field_size)?;
    if range.content_length == 0 {
        return Err(ParseError::Structure(format!("empty NAL unit at {offset:#x}")));
    }
    let header = r.read_u8()?;
    Ok(Nalu::new(range, header, kind))
}

/// All length-prefixed NAL units packed back to back inside `range`.
pub fn read_nalus<R: Read + Seek + ?Sized>(
    r: &mut R,
    range: &BoxRange,
    length_field_size: usize,
    kind: NaluKind,
) -> Result<Vec<Nalu>> {
    let mut nalus = Vec::new();
    let mut offset = range.content_offset;
    while offset < range.end_offset() {
        let nalu = read_nalu_at(r, offset, length_field_size, kind)?;
        offset = nalu.range.end_offset();
        nalus.push(nalu);
    }
    Ok(nalus)
}

pub fn read_full_box_header<R: Read + ?Sized>(r: &mut R) -> Result<FullBoxHeader> {
    let version = r.read_u8()?;
    let mut f = [0u8; 3];
    r.read_exact(&mut f)?;
    let flags = ((f[0] as u32) << 16) | ((f[1] as u32) << 8) | (f[2] as u32);
    Ok(FullBoxHeader { version, flags })
}

/// Payload of `range`, header excluded.
pub fn read_box_content<R: Read + Seek + ?Sized>(r: &mut R, range: &BoxRange) -> Result<Vec<u8>> {
    Ok(read_slice(r, range.content_offset, range.content_length)?)
}

/// Header and payload of `range`.
pub fn read_box_bytes<R: Read + Seek + ?Sized>(r: &mut R, range: &BoxRange) -> Result<Vec<u8>> {
    Ok(read_slice(r, range.header_offset(), range.total_length())?)
}

/// Direct children of `atom`, starting after its type-specific child offset.
pub fn read_children<R: Read + Seek + ?Sized>(r: &mut R, atom: &Atom) -> Result<Vec<Atom>> {
    let mut kids = Vec::new();
    let mut offset = atom.children_start();
    while offset < atom.end_offset() {
        let child = read_atom_at(r, offset)?;
        offset = child.end_offset();
        kids.push(child);
    }
    Ok(kids)
}
