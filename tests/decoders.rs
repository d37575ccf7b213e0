use mp4remux::boxes::{Atom, FourCC};
use mp4remux::decode::*;
use mp4remux::records::{DataEntry, Matrix, MediaHeader, MovieHeader, TrackFragment};
use mp4remux::{read_atom_at, Fixed16_16, ParseError};
use std::io::Cursor;

fn atom(typ: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(&(8 + payload.len() as u32).to_be_bytes());
    v.extend_from_slice(typ);
    v.extend_from_slice(payload);
    v
}

fn full(typ: &[u8; 4], version: u8, flags: u32, payload: &[u8]) -> Vec<u8> {
    let mut p = vec![version];
    p.extend_from_slice(&flags.to_be_bytes()[1..]);
    p.extend_from_slice(payload);
    atom(typ, &p)
}

fn be32(vals: &[u32]) -> Vec<u8> {
    vals.iter().flat_map(|v| v.to_be_bytes()).collect()
}

fn open(data: Vec<u8>) -> (Cursor<Vec<u8>>, Atom) {
    let mut cur = Cursor::new(data);
    let a = read_atom_at(&mut cur, 0).unwrap();
    (cur, a)
}

fn identity_matrix() -> Vec<u8> {
    be32(&[0x10000, 0, 0, 0, 0x10000, 0, 0, 0, 0x4000_0000])
}

fn structure_message(e: ParseError) -> String {
    match e {
        ParseError::Structure(m) => m,
        other => panic!("expected a structural violation, got {other:?}"),
    }
}

// ---------- Movie / track headers ----------

#[test]
fn mvhd_version_0_is_promoted() {
    let mut p = be32(&[1, 2, 1000, 5000, 0x10000]);
    p.extend_from_slice(&0x0100i16.to_be_bytes());
    p.extend_from_slice(&[0; 10]);
    p.extend(identity_matrix());
    p.extend_from_slice(&[0; 24]);
    p.extend(be32(&[3]));
    let (mut cur, a) = open(full(b"mvhd", 0, 0, &p));

    let mvhd = read_mvhd(&mut cur, &a).unwrap();
    assert_eq!(mvhd.creation_time, 1);
    assert_eq!(mvhd.modification_time, 2);
    assert_eq!(mvhd.timescale, 1000);
    assert_eq!(mvhd.duration, 5000);
    assert_eq!(mvhd.preferred_rate.to_f32(), 1.0);
    assert_eq!(mvhd.preferred_volume.to_f32(), 1.0);
    assert_eq!(mvhd.matrix, Matrix::default());
    assert_eq!(mvhd.next_track_id, 3);
    assert_eq!(mvhd.duration_time().unwrap().to_f32(), 5.0);
}

#[test]
fn zero_timescale_is_rejected() {
    let mut p = be32(&[1, 2, 0, 5000, 0x10000]);
    p.extend_from_slice(&0x0100i16.to_be_bytes());
    p.extend_from_slice(&[0; 10]);
    p.extend(identity_matrix());
    p.extend_from_slice(&[0; 24]);
    p.extend(be32(&[3]));
    let (mut cur, a) = open(full(b"mvhd", 0, 0, &p));
    let msg = structure_message(read_mvhd(&mut cur, &a).unwrap_err());
    assert!(msg.contains("timescale"), "{msg}");

    let mut p = be32(&[0, 0, 0, 100]);
    p.extend_from_slice(&[0x15, 0xc7, 0, 0]);
    let (mut cur, a) = open(full(b"mdhd", 0, 0, &p));
    assert!(matches!(read_mdhd(&mut cur, &a), Err(ParseError::Structure(_))));
}

#[test]
fn zero_timescale_has_no_time_value() {
    let mdhd = MediaHeader { timescale: 0, duration: 100, ..Default::default() };
    assert!(mdhd.duration_time().is_none());
    let mvhd = MovieHeader { timescale: 0, duration: 100, ..Default::default() };
    assert!(mvhd.duration_time().is_none());

    let traf = TrackFragment { decode_time: Some(9000), ..Default::default() };
    assert!(traf.decode_time_in(0).is_none());
    assert_eq!(traf.decode_time_in(90000).unwrap().to_f32(), 0.1);
}

#[test]
fn tkhd_reads_dimensions_as_16_16() {
    let mut p = be32(&[0, 0, 7, 0, 900]);
    p.extend_from_slice(&[0; 8]);
    p.extend_from_slice(&[0, 0, 0, 1, 0, 0, 0, 0]); // layer, group 1, volume, reserved
    p.extend(identity_matrix());
    p.extend(be32(&[1920 << 16, 1080 << 16]));
    let (mut cur, a) = open(full(b"tkhd", 0, 3, &p));

    let tkhd = read_tkhd(&mut cur, &a).unwrap();
    assert_eq!(tkhd.flags, 3);
    assert_eq!(tkhd.track_id, 7);
    assert_eq!(tkhd.duration, 900);
    assert_eq!(tkhd.group, 1);
    assert_eq!(tkhd.width, Fixed16_16::from_f32(1920.0));
    assert_eq!(tkhd.height.to_f32(), 1080.0);
}

#[test]
fn elst_version_0_sign_extends_start() {
    let p = be32(&[2, 1000, 0xffff_ffff, 0x10000, 500, 40, 0x10000]);
    let (mut cur, a) = open(full(b"elst", 0, 0, &p));

    let edits = read_elst(&mut cur, &a).unwrap();
    assert_eq!(edits.len(), 2);
    assert_eq!(edits[0].start_offset, -1);
    assert_eq!(edits[1].duration, 500);
    assert_eq!(edits[1].start_offset, 40);
}

#[test]
fn mdhd_and_hdlr() {
    // "und" packs to 0x55c4
    let mut p = be32(&[0, 0, 90000, 180000]);
    p.extend_from_slice(&[0x55, 0xc4, 0, 0]);
    let (mut cur, a) = open(full(b"mdhd", 0, 0, &p));
    let mdhd = read_mdhd(&mut cur, &a).unwrap();
    assert_eq!(mdhd.timescale, 90000);
    assert_eq!(mdhd.language_code(), "und");
    assert_eq!(mdhd.duration_time().unwrap().to_f32(), 2.0);

    let mut p = be32(&[0]);
    p.extend_from_slice(b"vide");
    p.extend_from_slice(&[0; 12]);
    p.extend_from_slice(b"VideoHandler\0");
    let (mut cur, a) = open(full(b"hdlr", 0, 0, &p));
    let hdlr = read_hdlr(&mut cur, &a).unwrap();
    assert_eq!(hdlr.handler_type, FourCC(*b"vide"));
    assert_eq!(hdlr.name, "VideoHandler");
}

#[test]
fn dref_keeps_url_entries_only() {
    let mut p = be32(&[2]);
    p.extend(full(b"url ", 0, 1, &[]));
    p.extend(full(b"urn ", 0, 0, b"x\0"));
    let (mut cur, a) = open(full(b"dref", 0, 0, &p));

    let dref = read_dref(&mut cur, &a).unwrap();
    assert_eq!(dref.entries, vec![DataEntry { flags: 1, location: String::new() }]);
}

// ---------- Sample table ----------

#[test]
fn stsz_common_size_expands() {
    let (mut cur, a) = open(full(b"stsz", 0, 0, &be32(&[512, 3])));
    assert_eq!(read_stsz(&mut cur, &a).unwrap(), vec![512, 512, 512]);

    let (mut cur, a) = open(full(b"stsz", 0, 0, &be32(&[0, 3, 10, 20, 30])));
    assert_eq!(read_stsz(&mut cur, &a).unwrap(), vec![10, 20, 30]);
}

#[test]
fn stsz_common_size_count_is_bounded() {
    let (mut cur, a) = open(full(b"stsz", 0, 0, &be32(&[1, u32::MAX])));
    match read_stsz(&mut cur, &a) {
        Err(ParseError::TooLarge { count, .. }) => assert_eq!(count, u32::MAX as u64),
        other => panic!("expected TooLarge, got {other:?}"),
    }
}

#[test]
fn stts_single_huge_run_is_bounded() {
    let (mut cur, a) = open(full(b"stts", 0, 0, &be32(&[1, u32::MAX, 1024])));
    assert!(read_stts_runs(&mut cur, &a).is_ok());
    assert!(matches!(read_stts(&mut cur, &a), Err(ParseError::TooLarge { .. })));
}

#[test]
fn stts_and_ctts_expand_runs() {
    let (mut cur, a) = open(full(b"stts", 0, 0, &be32(&[2, 2, 3000, 1, 1500])));
    assert_eq!(read_stts(&mut cur, &a).unwrap(), vec![3000, 3000, 1500]);

    let (mut cur, a) = open(full(b"ctts", 1, 0, &be32(&[1, 1, (-3000i32) as u32])));
    assert_eq!(read_ctts(&mut cur, &a).unwrap(), vec![-3000]);
}

#[test]
fn stco_is_promoted_to_64_bit() {
    let (mut cur, a) = open(full(b"stco", 0, 0, &be32(&[2, 48, 0xffff_fff0])));
    assert_eq!(read_co64(&mut cur, &a).unwrap(), vec![48, 0xffff_fff0]);

    let mut p = be32(&[1]);
    p.extend_from_slice(&(1u64 << 40).to_be_bytes());
    let (mut cur, a) = open(full(b"co64", 0, 0, &p));
    assert_eq!(read_co64(&mut cur, &a).unwrap(), vec![1 << 40]);
}

#[test]
fn decoder_rejects_wrong_atom_type() {
    let (mut cur, a) = open(full(b"stss", 0, 0, &be32(&[0])));
    let msg = structure_message(read_stsz(&mut cur, &a).unwrap_err());
    assert!(msg.contains("stsz"));
}

#[test]
fn stsd_without_avc1_is_not_found() {
    let mut p = be32(&[1]);
    p.extend(atom(b"mp4v", &[0; 8]));
    let (mut cur, a) = open(full(b"stsd", 0, 0, &p));
    assert!(matches!(read_stsd(&mut cur, &a), Err(ParseError::NotFound(t)) if t == FourCC(*b"avc1")));
}

// ---------- avcC ----------

fn avcc(length_byte: u8, sps_count: u8, pps_count: u8) -> Vec<u8> {
    let mut p = vec![1, 0x64, 0x00, 0x1f, length_byte, 0xe0 | sps_count];
    for _ in 0..sps_count {
        p.extend_from_slice(&[0, 4, 0x67, 0x64, 0x00, 0x1f]);
    }
    p.push(pps_count);
    for _ in 0..pps_count {
        p.extend_from_slice(&[0, 2, 0x68, 0xee]);
    }
    atom(b"avcC", &p)
}

#[test]
fn avcc_copies_parameter_sets() {
    let (mut cur, a) = open(avcc(0xff, 1, 1));
    let cfg = read_avcc(&mut cur, &a).unwrap();
    assert_eq!(cfg.nalu_length_size, 4);
    assert_eq!(cfg.sps, vec![0x67, 0x64, 0x00, 0x1f]);
    assert_eq!(cfg.pps, vec![0x68, 0xee]);
}

// The length byte is decoded as `byte & 3 + 1`, which binds as `byte & 4`.
// A two-byte length field (0xfd) therefore reads back as 4, not 2.
#[test]
fn nalu_length_size_uses_literal_mask() {
    for (byte, expected) in [(0xfc, 4), (0xfd, 4), (0xfe, 4), (0xff, 4), (0x03, 0), (0x04, 4)] {
        let (mut cur, a) = open(avcc(byte, 1, 1));
        assert_eq!(read_avcc(&mut cur, &a).unwrap().nalu_length_size, expected, "byte {byte:#x}");
    }
}

#[test]
fn avcc_requires_exactly_one_sps_and_pps() {
    let (mut cur, a) = open(avcc(0xff, 2, 1));
    assert!(matches!(
        read_avcc(&mut cur, &a),
        Err(ParseError::Cardinality { what: "sps", count: 2 })
    ));

    let (mut cur, a) = open(avcc(0xff, 1, 0));
    assert!(matches!(
        read_avcc(&mut cur, &a),
        Err(ParseError::Cardinality { what: "pps", count: 0 })
    ));
}

#[test]
fn avc1_reads_dimensions_and_nested_avcc() {
    let mut p = vec![0; 6];
    p.extend_from_slice(&1u16.to_be_bytes());
    p.extend_from_slice(&[0; 16]);
    p.extend_from_slice(&1280u16.to_be_bytes());
    p.extend_from_slice(&720u16.to_be_bytes());
    p.resize(78, 0);
    p.extend(avcc(0xff, 1, 1));
    let (mut cur, a) = open(atom(b"avc1", &p));

    let entry = read_avc1(&mut cur, &a).unwrap();
    assert_eq!(entry.data_reference_index, 1);
    assert_eq!((entry.width, entry.height), (1280, 720));
    assert_eq!(entry.avcc.pps, vec![0x68, 0xee]);
}

// ---------- Fragments ----------

fn tfhd(flags: u32, fields: &[u32]) -> Vec<u8> {
    full(b"tfhd", 0, flags, &be32(fields))
}

fn tfdt(t: u64) -> Vec<u8> {
    full(b"tfdt", 1, 0, &t.to_be_bytes())
}

fn trun_one() -> Vec<u8> {
    full(b"trun", 0, 0x200, &be32(&[1, 1234]))
}

#[test]
fn tfhd_fields_follow_flags() {
    // base data offset (64-bit), default duration, default flags
    let (mut cur, a) = open(tfhd(0x1 | 0x8 | 0x20, &[9, 0, 4096, 3000, 0x0101_0000]));
    let h = read_tfhd(&mut cur, &a).unwrap();
    assert_eq!(h.track_id, 9);
    assert_eq!(h.base_data_offset, Some(4096));
    assert_eq!(h.sample_description_index, None);
    assert_eq!(h.default_sample_duration, Some(3000));
    assert_eq!(h.default_sample_size, None);
    assert_eq!(h.default_sample_flags, Some(0x0101_0000));
    assert_eq!(h.flags(), 0x29);
}

#[test]
fn trun_fields_apply_to_every_sample() {
    let p = be32(&[2, 100, 0x0200_0000, 3000, (-1000i32) as u32, 3000, 2000]);
    let (mut cur, a) = open(full(b"trun", 1, 0x1 | 0x4 | 0x100 | 0x800, &p));
    let run = read_trun(&mut cur, &a).unwrap();
    assert_eq!(run.data_offset, Some(100));
    assert_eq!(run.first_sample_flags, Some(0x0200_0000));
    assert_eq!(run.samples.len(), 2);
    assert_eq!(run.samples[0].duration, Some(3000));
    assert_eq!(run.samples[0].composition_time_offset, Some(-1000));
    assert_eq!(run.samples[1].composition_time_offset, Some(2000));
    assert_eq!(run.samples[1].size, None);
    assert_eq!(run.flags(), 0x905);
}

#[test]
fn traf_skips_unknown_children() {
    let data = atom(
        b"traf",
        &[tfhd(0, &[1]), atom(b"sdtp", &[0; 4]), tfdt(90000), trun_one(), trun_one()].concat(),
    );
    let (mut cur, a) = open(data);
    let traf = read_traf(&mut cur, &a).unwrap();
    assert_eq!(traf.header.track_id, 1);
    assert_eq!(traf.decode_time, Some(90000));
    assert_eq!(traf.runs.len(), 2);
    assert_eq!(traf.runs[1].samples[0].size, Some(1234));
    assert_eq!(traf.decode_time_in(90000).unwrap().to_f32(), 1.0);
}

#[test]
fn traf_rejects_tfdt_after_trun() {
    let (mut cur, a) = open(atom(b"traf", &[tfhd(0, &[1]), trun_one(), tfdt(0)].concat()));
    let msg = structure_message(read_traf(&mut cur, &a).unwrap_err());
    assert_eq!(msg, "tfdt has to occur before trun");
}

#[test]
fn traf_rejects_second_tfdt() {
    let (mut cur, a) = open(atom(b"traf", &[tfhd(0, &[1]), tfdt(0), tfdt(1)].concat()));
    let msg = structure_message(read_traf(&mut cur, &a).unwrap_err());
    assert_eq!(msg, "multiple tfdt atoms in traf atom");
}

#[test]
fn traf_must_open_with_tfhd() {
    let (mut cur, a) = open(atom(b"traf", &[tfdt(0), tfhd(0, &[1])].concat()));
    let msg = structure_message(read_traf(&mut cur, &a).unwrap_err());
    assert!(msg.contains("tfhd"));
}

#[test]
fn moof_accepts_only_traf_after_mfhd() {
    let mfhd = full(b"mfhd", 0, 0, &be32(&[7]));
    let traf = atom(b"traf", &[tfhd(0, &[1]), trun_one()].concat());

    let (mut cur, a) = open(atom(b"moof", &[mfhd.clone(), traf.clone(), traf.clone()].concat()));
    let moof = read_moof(&mut cur, &a).unwrap();
    assert_eq!(moof.sequence_number, 7);
    assert_eq!(moof.trafs.len(), 2);

    let (mut cur, a) = open(atom(b"moof", &[mfhd, traf, atom(b"free", &[])].concat()));
    let msg = structure_message(read_moof(&mut cur, &a).unwrap_err());
    assert_eq!(msg, "unexpected atom type 'free' in moof after header");
}

#[test]
fn ftyp_lists_compatible_brands() {
    let (mut cur, a) = open(atom(b"ftyp", b"mp42\0\0\0\x01isommp42"));
    let ftyp = read_ftyp(&mut cur, &a).unwrap();
    assert_eq!(ftyp.major_brand, FourCC(*b"mp42"));
    assert_eq!(ftyp.minor_version, 1);
    assert_eq!(ftyp.compatible_brands, vec![FourCC(*b"isom"), FourCC(*b"mp42")]);
}
