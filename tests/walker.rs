use mp4remux::boxes::FourCC;
use mp4remux::{AtomWalker, ParseError};
use proptest::prelude::*;
use std::io::Cursor;

fn atom(typ: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(&(8 + payload.len() as u32).to_be_bytes());
    v.extend_from_slice(typ);
    v.extend_from_slice(payload);
    v
}

// ftyp, moov{mvhd, trak{tkhd, mdia{mdhd}}, trak{tkhd}}, mdat
fn sample_file() -> Vec<u8> {
    let trak1 = atom(b"trak", &[atom(b"tkhd", &[1; 4]), atom(b"mdia", &atom(b"mdhd", &[0; 4]))].concat());
    let trak2 = atom(b"trak", &atom(b"tkhd", &[2; 4]));
    let moov = atom(b"moov", &[atom(b"mvhd", &[0; 12]), trak1, trak2].concat());
    [atom(b"ftyp", b"isom\0\0\0\0"), moov, atom(b"mdat", &[0; 16])].concat()
}

fn types<R: std::io::Read + std::io::Seek>(w: AtomWalker<R>) -> Vec<String> {
    w.map(|a| a.unwrap().typ.to_string()).collect()
}

#[test]
fn advance_walks_depth_first() {
    let w = AtomWalker::new(Cursor::new(sample_file())).unwrap();
    assert_eq!(
        types(w),
        vec!["ftyp", "moov", "mvhd", "trak", "tkhd", "mdia", "mdhd", "trak", "tkhd", "mdat"]
    );
}

#[test]
fn advance_reports_exhaustion_repeatedly() {
    let mut w = AtomWalker::new(Cursor::new(atom(b"free", &[]))).unwrap();
    assert!(w.advance().unwrap().is_some());
    assert!(w.advance().unwrap().is_none());
    assert!(w.advance().unwrap().is_none());
    assert!(w.is_exhausted());
}

#[test]
fn tree_records_parents_and_depths() {
    let mut w = AtomWalker::new(Cursor::new(sample_file())).unwrap();
    assert_eq!(w.walk_all().unwrap(), 10);

    let root = w.root();
    let top: Vec<FourCC> = w.children(root).iter().map(|&id| w.atom(id).typ).collect();
    assert_eq!(top, vec![FourCC(*b"ftyp"), FourCC(*b"moov"), FourCC(*b"mdat")]);

    let mdhd = w.find_node(b"mdhd").unwrap();
    assert_eq!(w.depth(mdhd), 4);
    assert_eq!(w.path(mdhd), "moov.trak.mdia.mdhd");
    let mdia = w.parent(mdhd).unwrap();
    assert_eq!(w.atom(mdia).typ, FourCC(*b"mdia"));
}

#[test]
fn locate_stops_at_first_match() {
    let mut w = AtomWalker::new(Cursor::new(sample_file())).unwrap();
    let tkhd = w.locate(b"tkhd").unwrap().unwrap();
    assert_eq!(w.discovered(), 5);
    assert_eq!(w.current_path(), "moov.trak.tkhd");

    let mut cur = w.into_inner();
    let again = mp4remux::read_atom_at(&mut cur, tkhd.header_offset()).unwrap();
    assert_eq!(again, tkhd);
}

#[test]
fn locate_reuses_cached_tree() {
    let mut w = AtomWalker::new(Cursor::new(sample_file())).unwrap();
    let mdat = w.locate(b"mdat").unwrap().unwrap();
    let discovered = w.discovered();

    // already in the tree: no further parsing
    let mvhd = w.locate(b"mvhd").unwrap().unwrap();
    assert_eq!(w.discovered(), discovered);
    assert!(mvhd.header_offset() < mdat.header_offset());
    assert_eq!(w.locate(b"mdat").unwrap(), Some(mdat));
}

#[test]
fn require_fails_when_absent() {
    let mut w = AtomWalker::new(Cursor::new(sample_file())).unwrap();
    match w.require(b"moof") {
        Err(ParseError::NotFound(t)) => assert_eq!(t, FourCC(*b"moof")),
        other => panic!("expected NotFound, got {other:?}"),
    }
    assert!(w.is_exhausted());
    assert_eq!(w.locate(b"moof").unwrap(), None);
}

#[test]
fn leaves_are_not_descended() {
    // mdat content looks like a box header but mdat is not a container
    let data = atom(b"mdat", &atom(b"moov", &[]));
    let w = AtomWalker::new(Cursor::new(data)).unwrap();
    assert_eq!(types(w), vec!["mdat"]);
}

#[test]
fn with_len_limits_the_walk() {
    let data = [atom(b"ftyp", &[0; 8]), atom(b"free", &[0; 4])].concat();
    let w = AtomWalker::with_len(Cursor::new(data), 16);
    assert_eq!(types(w), vec!["ftyp"]);
}

#[test]
fn parse_error_ends_the_session() {
    let mut data = atom(b"ftyp", &[0; 8]);
    data.extend_from_slice(&3u32.to_be_bytes());
    data.extend_from_slice(b"junk");
    let mut w = AtomWalker::new(Cursor::new(data)).unwrap();

    assert!(w.advance().unwrap().is_some());
    assert!(matches!(w.advance(), Err(ParseError::InvalidSize { .. })));
    assert!(w.advance().unwrap().is_none());
}

#[test]
fn decode_runs_typed_reader_on_located_atom() {
    let mut w = AtomWalker::new(Cursor::new(sample_file())).unwrap();
    let len = w.decode(b"mdat", |_r, a| Ok(a.content_length())).unwrap();
    assert_eq!(len, 16);
}

fn flat_file() -> impl Strategy<Value = Vec<(bool, usize)>> {
    // (is container, payload length)
    prop::collection::vec((any::<bool>(), 0usize..32), 1..12)
}

proptest! {
    #[test]
    fn siblings_come_in_increasing_offset_order(layout in flat_file()) {
        let mut data = Vec::new();
        for (container, len) in &layout {
            if *container {
                data.extend(atom(b"moov", &atom(b"free", &vec![0; *len])));
            } else {
                data.extend(atom(b"mdat", &vec![0; *len]));
            }
        }
        let mut w = AtomWalker::new(Cursor::new(data)).unwrap();
        let found = w.walk_all().unwrap();
        prop_assert_eq!(found, layout.len() + layout.iter().filter(|(c, _)| *c).count());

        let top = w.children(w.root()).to_vec();
        prop_assert_eq!(top.len(), layout.len());
        for pair in top.windows(2) {
            prop_assert!(w.atom(pair[0]).end_offset() <= w.atom(pair[1]).header_offset());
        }
    }
}
