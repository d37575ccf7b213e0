pub mod boxes;
pub mod decode;
pub mod encode;
pub mod fixed_point;
pub mod inspect;
pub mod known_boxes;
pub mod nalu;
pub mod parser;
pub mod records;
pub mod registry;
pub mod util;
pub mod walker;

pub use boxes::{Atom, BoxRange, FourCC, FullBoxHeader};
pub use fixed_point::{Fixed16_16, Fixed2_30, Fixed8_8, FixedPoint, RuntimeFixedPoint};
pub use inspect::{atom_tree, dump_atoms, visit_atoms, AtomInfo};
pub use nalu::{Nalu, NaluKind};
pub use parser::{read_atom_at, read_nalus, read_simple_box_at, ParseError, Result};
pub use registry::{default_registry, BoxDecoder, Record, Registry};
pub use walker::{AtomNode, AtomWalker, NodeId};
