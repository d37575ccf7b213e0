//! Non-caching diagnostics over a whole stream.
//!
//! Unlike [`crate::walker::AtomWalker`] these re-parse on every call and
//! recurse eagerly into every container.

use crate::boxes::{Atom, FourCC};
use crate::known_boxes::KnownBox;
use crate::parser::{read_children, Result};
use crate::registry::{default_registry, Record, Registry};
use serde::Serialize;
use std::fmt::Write as _;
use std::io::{Read, Seek};

fn file_atom(len: u64) -> Atom {
    Atom::new(0, len, 0, FourCC(*b"file"))
}

/// Visit every atom of the first `len` bytes in depth-first order.
///
/// `f` gets each atom with its depth (0 for top-level boxes).
pub fn visit_atoms<R, F>(r: &mut R, len: u64, mut f: F) -> Result<()>
where
    R: Read + Seek + ?Sized,
    F: FnMut(&Atom, usize) -> Result<()>,
{
    visit_children(r, &file_atom(len), 0, &mut f)
}

fn visit_children<R, F>(r: &mut R, parent: &Atom, depth: usize, f: &mut F) -> Result<()>
where
    R: Read + Seek + ?Sized,
    F: FnMut(&Atom, usize) -> Result<()>,
{
    for atom in read_children(r, parent)? {
        f(&atom, depth)?;
        if atom.is_container() {
            visit_children(r, &atom, depth + 1, f)?;
        }
    }
    Ok(())
}

/// Indented one-line-per-atom rendering, cut off below `max_depth`.
pub fn dump_atoms<R: Read + Seek + ?Sized>(r: &mut R, len: u64, max_depth: usize) -> Result<String> {
    let mut out = String::new();
    visit_atoms(r, len, |atom, depth| {
        if depth <= max_depth {
            let _ = writeln!(
                out,
                "{:indent$}{} size={} offset={:#x} ({})",
                "",
                atom.typ,
                atom.range.total_length(),
                atom.header_offset(),
                KnownBox::from(atom.typ).full_name(),
                indent = depth * 2
            );
        }
        Ok(())
    })?;
    Ok(out)
}

/// A serializable view of one atom and its subtree.
#[derive(Debug, Serialize)]
pub struct AtomInfo {
    pub offset: u64,
    pub size: u64,
    pub header_size: u64,
    pub typ: FourCC,
    pub full_name: String,
    pub container: bool,
    /// Typed record when decoding was requested and a decoder exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decoded: Option<Record>,
    /// Decoder failure for this atom; siblings are still reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<AtomInfo>,
}

/// Build the full atom tree, optionally decoding every atom with the
/// default registry.
pub fn atom_tree<R: Read + Seek>(r: &mut R, len: u64, decode: bool) -> Result<Vec<AtomInfo>> {
    let reg = default_registry();
    build_children(r, &file_atom(len), decode.then_some(&reg))
}

fn build_children<R: Read + Seek>(r: &mut R, parent: &Atom, reg: Option<&Registry>) -> Result<Vec<AtomInfo>> {
    let mut infos = Vec::new();
    for atom in read_children(r, parent)? {
        let (decoded, error) = match reg.and_then(|reg| reg.decode(r, &atom)) {
            Some(Ok(rec)) => (Some(rec), None),
            Some(Err(e)) => (None, Some(e.to_string())),
            None => (None, None),
        };
        let children = if atom.is_container() { build_children(r, &atom, reg)? } else { Vec::new() };
        infos.push(AtomInfo {
            offset: atom.header_offset(),
            size: atom.range.total_length(),
            header_size: atom.range.header_length,
            typ: atom.typ,
            full_name: KnownBox::from(atom.typ).full_name().to_string(),
            container: atom.is_container(),
            decoded,
            error,
            children,
        });
    }
    Ok(infos)
}
