//! Lazy, caching depth-first walk over the box tree of a stream.
//!
//! The walker owns its reader and an arena of every atom discovered so far.
//! [`AtomWalker::advance`] parses exactly one header per call; everything
//! else (`locate`, `require`, iteration) is built on it, so a byte range is
//! never parsed twice in one session.

use crate::boxes::{Atom, FourCC};
use crate::parser::{read_atom_at, stream_len, ParseError, Result};
use log::trace;
use std::io::{Read, Seek};

/// Index of a node in the walker's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct AtomNode {
    pub atom: Atom,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// 0 for the synthetic root, 1 for top-level boxes.
    pub depth: usize,
}

pub struct AtomWalker<R> {
    reader: R,
    // Arena in discovery order, which is depth-first pre-order.
    nodes: Vec<AtomNode>,
    current: NodeId,
    cursor: u64,
    exhausted: bool,
}

const ROOT: NodeId = NodeId(0);

impl<R: Read + Seek> AtomWalker<R> {
    /// Walk the whole stream; its length is found by seeking to the end.
    pub fn new(mut reader: R) -> Result<Self> {
        let len = stream_len(&mut reader)?;
        Ok(Self::with_len(reader, len))
    }

    /// Walk the first `len` bytes of the stream.
    pub fn with_len(reader: R, len: u64) -> Self {
        let root = AtomNode {
            atom: Atom::new(0, len, 0, FourCC(*b"file")),
            parent: None,
            children: Vec::new(),
            depth: 0,
        };
        AtomWalker { reader, nodes: vec![root], current: ROOT, cursor: 0, exhausted: false }
    }

    pub fn root(&self) -> NodeId {
        ROOT
    }

    pub fn node(&self, id: NodeId) -> &AtomNode {
        &self.nodes[id.0]
    }

    pub fn atom(&self, id: NodeId) -> &Atom {
        &self.nodes[id.0].atom
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn depth(&self, id: NodeId) -> usize {
        self.nodes[id.0].depth
    }

    /// Node most recently discovered (the root before the first step).
    pub fn current(&self) -> NodeId {
        self.current
    }

    /// Number of atoms discovered so far, root excluded.
    pub fn discovered(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Dotted type path from the top level down to `id`, e.g. `moov.trak.tkhd`.
    pub fn path(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        let mut at = Some(id);
        while let Some(n) = at.filter(|&n| n != ROOT) {
            parts.push(self.atom(n).typ.to_string());
            at = self.parent(n);
        }
        parts.reverse();
        parts.join(".")
    }

    pub fn current_path(&self) -> String {
        self.path(self.current)
    }

    /// Discover the next atom in depth-first order.
    ///
    /// Returns `Ok(None)` once the stream is exhausted. A parse error also
    /// ends the session: later calls return `Ok(None)`.
    pub fn advance(&mut self) -> Result<Option<Atom>> {
        if self.exhausted {
            return Ok(None);
        }
        while self.current != ROOT && self.cursor >= self.atom(self.current).end_offset() {
            self.current = self.parent(self.current).unwrap_or(ROOT);
        }
        if self.cursor >= self.atom(self.current).end_offset() {
            trace!("walker exhausted at {:#x}", self.cursor);
            self.exhausted = true;
            return Ok(None);
        }

        let atom = match read_atom_at(&mut self.reader, self.cursor) {
            Ok(a) => a,
            Err(e) => {
                self.exhausted = true;
                return Err(e);
            }
        };
        let parent = self.current;
        let id = NodeId(self.nodes.len());
        let depth = self.depth(parent) + 1;
        self.nodes.push(AtomNode { atom, parent: Some(parent), children: Vec::new(), depth });
        self.nodes[parent.0].children.push(id);
        self.current = id;
        self.cursor = if atom.is_container() { atom.children_start() } else { atom.end_offset() };
        trace!(
            "{:indent$}{} @ {:#x} len {}",
            "",
            atom.typ,
            atom.header_offset(),
            atom.range.total_length(),
            indent = (depth - 1) * 2
        );
        Ok(Some(atom))
    }

    /// First already-discovered node of type `typ`, in depth-first order.
    pub fn find_node(&self, typ: &[u8; 4]) -> Option<NodeId> {
        (1..self.nodes.len()).map(NodeId).find(|&id| self.atom(id).is_type(typ))
    }

    /// Like [`Self::locate`], returning the arena node.
    pub fn locate_node(&mut self, typ: &[u8; 4]) -> Result<Option<NodeId>> {
        if let Some(id) = self.find_node(typ) {
            return Ok(Some(id));
        }
        while let Some(atom) = self.advance()? {
            if atom.is_type(typ) {
                return Ok(Some(self.current));
            }
        }
        Ok(None)
    }

    /// First atom of type `typ`, searching the cached tree before walking on.
    pub fn locate(&mut self, typ: &[u8; 4]) -> Result<Option<Atom>> {
        Ok(self.locate_node(typ)?.map(|id| *self.atom(id)))
    }

    pub fn require(&mut self, typ: &[u8; 4]) -> Result<Atom> {
        self.locate(typ)?.ok_or(ParseError::NotFound(FourCC(*typ)))
    }

    /// Locate `typ` and run a typed decoder on it against this walker's reader.
    pub fn decode<T, F>(&mut self, typ: &[u8; 4], decode: F) -> Result<T>
    where
        F: FnOnce(&mut R, &Atom) -> Result<T>,
    {
        let atom = self.require(typ)?;
        decode(&mut self.reader, &atom)
    }

    /// Walk to the end of the stream, returning how many atoms were found.
    pub fn walk_all(&mut self) -> Result<usize> {
        while self.advance()?.is_some() {}
        Ok(self.discovered())
    }

    pub fn reader_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read + Seek> Iterator for AtomWalker<R> {
    type Item = Result<Atom>;

    fn next(&mut self) -> Option<Self::Item> {
        self.advance().transpose()
    }
}
