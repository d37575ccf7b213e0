use mp4remux::boxes::FourCC;
use mp4remux::known_boxes::KnownBox;

#[test]
fn known_box_from_ftyp() {
    let kb = KnownBox::from(FourCC(*b"ftyp"));
    assert!(matches!(kb, KnownBox::Ftyp));
    assert_eq!(kb.full_name(), "File Type Box");
}

#[test]
fn unknown_tags_are_preserved() {
    let kb = KnownBox::from(FourCC(*b"abcd"));
    assert_eq!(kb, KnownBox::Unknown(FourCC(*b"abcd")));
    assert!(!kb.is_container());
}

#[test]
fn exactly_seventeen_container_tags() {
    let containers = [
        b"moov", b"moof", b"trak", b"traf", b"mfra", b"mvex", b"mdia", b"minf", b"stbl", b"stsd",
        b"dinf", b"dref", b"udta", b"meta", b"ilst", b"edts", b"avc1",
    ];
    for tag in containers {
        assert!(KnownBox::from(FourCC(*tag)).is_container(), "{}", FourCC(*tag));
    }
    for tag in [b"ftyp", b"mdat", b"mvhd", b"tkhd", b"avcC", b"stts", b"trun", b"url "] {
        assert!(!KnownBox::from(FourCC(*tag)).is_container(), "{}", FourCC(*tag));
    }
}

#[test]
fn child_offsets() {
    assert_eq!(KnownBox::from(FourCC(*b"stsd")).child_offset(), 8);
    assert_eq!(KnownBox::from(FourCC(*b"dref")).child_offset(), 8);
    assert_eq!(KnownBox::from(FourCC(*b"meta")).child_offset(), 4);
    assert_eq!(KnownBox::from(FourCC(*b"avc1")).child_offset(), 78);
    assert_eq!(KnownBox::from(FourCC(*b"moov")).child_offset(), 0);
}

#[test]
fn fourcc_serializes_as_text() {
    let cc = FourCC(*b"url ");
    assert_eq!(serde_json::to_string(&cc).unwrap(), "\"url \"");
    let back: FourCC = serde_json::from_str("\"avcC\"").unwrap();
    assert_eq!(back, FourCC(*b"avcC"));
    assert!(serde_json::from_str::<FourCC>("\"toolong\"").is_err());
}
