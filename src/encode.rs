//! Encoders mirroring [`crate::decode`].
//!
//! Each `write_*` appends one complete box to `out` and returns the number of
//! bytes it wrote. The length is written as a placeholder and patched once the
//! payload (and any children) are in place. Time fields always use the
//! version 1 layout.

use crate::fixed_point::FixedPoint;
use crate::parser::{ParseError, Result};
use crate::records::*;
use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use std::io::Write;

// ---------- Helpers ----------

fn begin_atom(out: &mut Vec<u8>, typ: &[u8; 4]) -> usize {
    let start = out.len();
    out.extend_from_slice(&[0; 4]);
    out.extend_from_slice(typ);
    start
}

fn finish_atom(out: &mut Vec<u8>, start: usize) -> Result<usize> {
    let size = out.len() - start;
    let size32 = u32::try_from(size)
        .map_err(|_| ParseError::Structure(format!("encoded box of {size} bytes exceeds 32-bit length")))?;
    BigEndian::write_u32(&mut out[start..start + 4], size32);
    Ok(size)
}

fn write_full_box_header(out: &mut Vec<u8>, version: u8, flags: u32) -> Result<()> {
    out.write_u8(version)?;
    out.write_u24::<BigEndian>(flags & 0x00ff_ffff)?;
    Ok(())
}

fn write_fixed<const B: u32>(out: &mut Vec<u8>, v: FixedPoint<B>) -> Result<()> {
    out.write_i32::<BigEndian>(v.count() as i32)?;
    Ok(())
}

fn write_matrix(out: &mut Vec<u8>, m: &Matrix) -> Result<()> {
    write_fixed(out, m.a)?;
    write_fixed(out, m.b)?;
    write_fixed(out, m.u)?;
    write_fixed(out, m.c)?;
    write_fixed(out, m.d)?;
    write_fixed(out, m.v)?;
    write_fixed(out, m.tx)?;
    write_fixed(out, m.ty)?;
    write_fixed(out, m.w)?;
    Ok(())
}

fn write_cstring(out: &mut Vec<u8>, s: &str) -> Result<()> {
    out.write_all(s.as_bytes())?;
    out.write_u8(0)?;
    Ok(())
}

// ---------- File level ----------

pub fn write_ftyp(out: &mut Vec<u8>, ftyp: &FileType) -> Result<usize> {
    let start = begin_atom(out, b"ftyp");
    out.write_all(&ftyp.major_brand.0)?;
    out.write_u32::<BigEndian>(ftyp.minor_version)?;
    for brand in &ftyp.compatible_brands {
        out.write_all(&brand.0)?;
    }
    finish_atom(out, start)
}

// ---------- Movie ----------

pub fn write_mvhd(out: &mut Vec<u8>, mvhd: &MovieHeader) -> Result<usize> {
    let start = begin_atom(out, b"mvhd");
    write_full_box_header(out, 1, 0)?;
    out.write_u64::<BigEndian>(mvhd.creation_time)?;
    out.write_u64::<BigEndian>(mvhd.modification_time)?;
    out.write_u32::<BigEndian>(mvhd.timescale)?;
    out.write_u64::<BigEndian>(mvhd.duration)?;
    write_fixed(out, mvhd.preferred_rate)?;
    out.write_i16::<BigEndian>(mvhd.preferred_volume.count() as i16)?;
    out.write_all(&[0; 10])?;
    write_matrix(out, &mvhd.matrix)?;
    out.write_i32::<BigEndian>(mvhd.preview_time)?;
    out.write_i32::<BigEndian>(mvhd.preview_duration)?;
    out.write_i32::<BigEndian>(mvhd.poster_time)?;
    out.write_i32::<BigEndian>(mvhd.selection_time)?;
    out.write_i32::<BigEndian>(mvhd.selection_duration)?;
    out.write_i32::<BigEndian>(mvhd.current_time)?;
    out.write_u32::<BigEndian>(mvhd.next_track_id)?;
    finish_atom(out, start)
}

pub fn write_moov(out: &mut Vec<u8>, movie: &Movie) -> Result<usize> {
    let start = begin_atom(out, b"moov");
    write_mvhd(out, &movie.mvhd)?;
    for track in &movie.tracks {
        write_trak(out, track)?;
    }
    finish_atom(out, start)
}

// ---------- Track ----------

/// `trak`; the `edts` box is only emitted when the track has edits.
pub fn write_trak(out: &mut Vec<u8>, track: &Track) -> Result<usize> {
    let start = begin_atom(out, b"trak");
    write_tkhd(out, &track.tkhd)?;
    if !track.edits.is_empty() {
        write_edts(out, &track.edits)?;
    }
    write_mdia(out, &track.mdia)?;
    finish_atom(out, start)
}

pub fn write_tkhd(out: &mut Vec<u8>, tkhd: &TrackHeader) -> Result<usize> {
    let start = begin_atom(out, b"tkhd");
    write_full_box_header(out, 1, tkhd.flags)?;
    out.write_u64::<BigEndian>(tkhd.creation_time)?;
    out.write_u64::<BigEndian>(tkhd.modification_time)?;
    out.write_u32::<BigEndian>(tkhd.track_id)?;
    out.write_u32::<BigEndian>(0)?;
    out.write_u64::<BigEndian>(tkhd.duration)?;
    out.write_all(&[0; 8])?;
    out.write_i16::<BigEndian>(tkhd.layer)?;
    out.write_u16::<BigEndian>(tkhd.group)?;
    out.write_i16::<BigEndian>(tkhd.volume.count() as i16)?;
    out.write_u16::<BigEndian>(0)?;
    write_matrix(out, &tkhd.matrix)?;
    out.write_u32::<BigEndian>(tkhd.width.count() as u32)?;
    out.write_u32::<BigEndian>(tkhd.height.count() as u32)?;
    finish_atom(out, start)
}

pub fn write_edts(out: &mut Vec<u8>, edits: &[EditEntry]) -> Result<usize> {
    let start = begin_atom(out, b"edts");
    write_elst(out, edits)?;
    finish_atom(out, start)
}

pub fn write_elst(out: &mut Vec<u8>, edits: &[EditEntry]) -> Result<usize> {
    let start = begin_atom(out, b"elst");
    write_full_box_header(out, 1, 0)?;
    out.write_u32::<BigEndian>(edits.len() as u32)?;
    for e in edits {
        out.write_u64::<BigEndian>(e.duration)?;
        out.write_i64::<BigEndian>(e.start_offset)?;
        write_fixed(out, e.rate)?;
    }
    finish_atom(out, start)
}

// ---------- Media ----------

pub fn write_mdia(out: &mut Vec<u8>, mdia: &Media) -> Result<usize> {
    let start = begin_atom(out, b"mdia");
    write_mdhd(out, &mdia.mdhd)?;
    write_hdlr(out, &mdia.hdlr)?;
    write_minf(out, &mdia.minf)?;
    finish_atom(out, start)
}

pub fn write_mdhd(out: &mut Vec<u8>, mdhd: &MediaHeader) -> Result<usize> {
    let start = begin_atom(out, b"mdhd");
    write_full_box_header(out, 1, 0)?;
    out.write_u64::<BigEndian>(mdhd.creation_time)?;
    out.write_u64::<BigEndian>(mdhd.modification_time)?;
    out.write_u32::<BigEndian>(mdhd.timescale)?;
    out.write_u64::<BigEndian>(mdhd.duration)?;
    out.write_u16::<BigEndian>(mdhd.language & 0x7fff)?;
    out.write_u16::<BigEndian>(0)?;
    finish_atom(out, start)
}

pub fn write_hdlr(out: &mut Vec<u8>, hdlr: &Handler) -> Result<usize> {
    let start = begin_atom(out, b"hdlr");
    write_full_box_header(out, 0, 0)?;
    out.write_u32::<BigEndian>(0)?;
    out.write_all(&hdlr.handler_type.0)?;
    out.write_all(&[0; 12])?;
    write_cstring(out, &hdlr.name)?;
    finish_atom(out, start)
}

pub fn write_minf(out: &mut Vec<u8>, minf: &MediaInformation) -> Result<usize> {
    let start = begin_atom(out, b"minf");
    write_vmhd(out, &minf.vmhd)?;
    write_dinf(out, &minf.dref)?;
    write_stbl(out, &minf.stbl)?;
    finish_atom(out, start)
}

pub fn write_vmhd(out: &mut Vec<u8>, vmhd: &VideoMediaHeader) -> Result<usize> {
    let start = begin_atom(out, b"vmhd");
    write_full_box_header(out, 0, 1)?;
    out.write_u16::<BigEndian>(vmhd.graphics_mode)?;
    for c in vmhd.opcolor {
        out.write_u16::<BigEndian>(c)?;
    }
    finish_atom(out, start)
}

pub fn write_dinf(out: &mut Vec<u8>, dref: &DataReference) -> Result<usize> {
    let start = begin_atom(out, b"dinf");
    write_dref(out, dref)?;
    finish_atom(out, start)
}

pub fn write_dref(out: &mut Vec<u8>, dref: &DataReference) -> Result<usize> {
    let start = begin_atom(out, b"dref");
    write_full_box_header(out, 0, 0)?;
    out.write_u32::<BigEndian>(dref.entries.len() as u32)?;
    for entry in &dref.entries {
        let url = begin_atom(out, b"url ");
        write_full_box_header(out, 0, entry.flags)?;
        if entry.flags & DataEntry::SELF_CONTAINED == 0 {
            write_cstring(out, &entry.location)?;
        }
        finish_atom(out, url)?;
    }
    finish_atom(out, start)
}

// ---------- Sample table ----------

/// `stbl`. `stss` is omitted when every sample is a sync sample and `ctts`
/// when there are no composition offsets.
pub fn write_stbl(out: &mut Vec<u8>, stbl: &SampleTable) -> Result<usize> {
    let start = begin_atom(out, b"stbl");
    write_stsd(out, &stbl.sample_description)?;
    write_stts(out, &stbl.decode_deltas)?;
    if let Some(sync) = &stbl.sync_samples {
        write_stss(out, sync)?;
    }
    if !stbl.composition_offsets.is_empty() {
        write_ctts(out, &stbl.composition_offsets)?;
    }
    write_stsc(out, &stbl.sample_to_chunk)?;
    write_stsz(out, &stbl.sample_sizes)?;
    write_co64(out, &stbl.chunk_offsets)?;
    finish_atom(out, start)
}

pub fn write_stsd(out: &mut Vec<u8>, stsd: &SampleDescription) -> Result<usize> {
    let start = begin_atom(out, b"stsd");
    write_full_box_header(out, 0, 0)?;
    out.write_u32::<BigEndian>(1)?;
    write_avc1(out, &stsd.avc1)?;
    finish_atom(out, start)
}

/// Visual sample entry: a fixed 78-byte preamble followed by `avcC`.
pub fn write_avc1(out: &mut Vec<u8>, avc1: &VisualSampleEntry) -> Result<usize> {
    let start = begin_atom(out, b"avc1");
    out.write_all(&[0; 6])?;
    out.write_u16::<BigEndian>(avc1.data_reference_index)?;
    // pre_defined, reserved, pre_defined[3]
    out.write_all(&[0; 16])?;
    out.write_u16::<BigEndian>(avc1.width)?;
    out.write_u16::<BigEndian>(avc1.height)?;
    // 72 dpi
    out.write_u32::<BigEndian>(0x0048_0000)?;
    out.write_u32::<BigEndian>(0x0048_0000)?;
    out.write_u32::<BigEndian>(0)?;
    // frame count
    out.write_u16::<BigEndian>(1)?;
    // compressor name
    out.write_all(&[0; 32])?;
    // depth
    out.write_u16::<BigEndian>(0x0018)?;
    out.write_i16::<BigEndian>(-1)?;
    write_avcc(out, &avc1.avcc)?;
    finish_atom(out, start)
}

pub fn write_avcc(out: &mut Vec<u8>, avcc: &AvcDecoderConfig) -> Result<usize> {
    let profile = avcc.sps.get(1..4).ok_or_else(|| {
        ParseError::Structure(format!("sps of {} bytes carries no profile/level", avcc.sps.len()))
    })?;
    if !(1..=4).contains(&avcc.nalu_length_size) {
        return Err(ParseError::MalformedLength(avcc.nalu_length_size as usize));
    }
    let start = begin_atom(out, b"avcC");
    out.write_u8(1)?;
    out.write_all(profile)?;
    out.write_u8(0xfc | (avcc.nalu_length_size - 1))?;
    out.write_u8(0xe0 | 1)?;
    out.write_u16::<BigEndian>(avcc.sps.len() as u16)?;
    out.write_all(&avcc.sps)?;
    out.write_u8(1)?;
    out.write_u16::<BigEndian>(avcc.pps.len() as u16)?;
    out.write_all(&avcc.pps)?;
    finish_atom(out, start)
}

pub fn write_stts(out: &mut Vec<u8>, runs: &[TtsRun]) -> Result<usize> {
    write_tts(out, b"stts", 0, runs)
}

/// Version 1 (signed offsets) is used only when some offset is negative.
pub fn write_ctts(out: &mut Vec<u8>, runs: &[TtsRun]) -> Result<usize> {
    let version = if runs.iter().any(|r| r.value < 0) { 1 } else { 0 };
    write_tts(out, b"ctts", version, runs)
}

fn write_tts(out: &mut Vec<u8>, typ: &[u8; 4], version: u8, runs: &[TtsRun]) -> Result<usize> {
    let start = begin_atom(out, typ);
    write_full_box_header(out, version, 0)?;
    out.write_u32::<BigEndian>(runs.len() as u32)?;
    for run in runs {
        out.write_u32::<BigEndian>(run.count)?;
        out.write_i32::<BigEndian>(run.value)?;
    }
    finish_atom(out, start)
}

pub fn write_stss(out: &mut Vec<u8>, sync_samples: &[u32]) -> Result<usize> {
    let start = begin_atom(out, b"stss");
    write_full_box_header(out, 0, 0)?;
    out.write_u32::<BigEndian>(sync_samples.len() as u32)?;
    for &s in sync_samples {
        out.write_u32::<BigEndian>(s)?;
    }
    finish_atom(out, start)
}

pub fn write_stsc(out: &mut Vec<u8>, entries: &[SampleToChunk]) -> Result<usize> {
    let start = begin_atom(out, b"stsc");
    write_full_box_header(out, 0, 0)?;
    out.write_u32::<BigEndian>(entries.len() as u32)?;
    for e in entries {
        out.write_u32::<BigEndian>(e.first_chunk)?;
        out.write_u32::<BigEndian>(e.samples_per_chunk)?;
        out.write_u32::<BigEndian>(e.sample_description_index)?;
    }
    finish_atom(out, start)
}

/// Writes the common-size form when every sample has the same non-zero size.
pub fn write_stsz(out: &mut Vec<u8>, sizes: &[u32]) -> Result<usize> {
    let start = begin_atom(out, b"stsz");
    write_full_box_header(out, 0, 0)?;
    let common = match sizes.split_first() {
        Some((&first, rest)) if first != 0 && rest.iter().all(|&s| s == first) => first,
        _ => 0,
    };
    out.write_u32::<BigEndian>(common)?;
    out.write_u32::<BigEndian>(sizes.len() as u32)?;
    if common == 0 {
        for &s in sizes {
            out.write_u32::<BigEndian>(s)?;
        }
    }
    finish_atom(out, start)
}

pub fn write_co64(out: &mut Vec<u8>, offsets: &[u64]) -> Result<usize> {
    let start = begin_atom(out, b"co64");
    write_full_box_header(out, 0, 0)?;
    out.write_u32::<BigEndian>(offsets.len() as u32)?;
    for &o in offsets {
        out.write_u64::<BigEndian>(o)?;
    }
    finish_atom(out, start)
}

// ---------- Fragments ----------

pub fn write_moof(out: &mut Vec<u8>, moof: &MovieFragment) -> Result<usize> {
    let start = begin_atom(out, b"moof");
    write_mfhd(out, moof.sequence_number)?;
    for traf in &moof.trafs {
        write_traf(out, traf)?;
    }
    finish_atom(out, start)
}

pub fn write_mfhd(out: &mut Vec<u8>, sequence_number: u32) -> Result<usize> {
    let start = begin_atom(out, b"mfhd");
    write_full_box_header(out, 0, 0)?;
    out.write_u32::<BigEndian>(sequence_number)?;
    finish_atom(out, start)
}

pub fn write_traf(out: &mut Vec<u8>, traf: &TrackFragment) -> Result<usize> {
    let start = begin_atom(out, b"traf");
    write_tfhd(out, &traf.header)?;
    if let Some(t) = traf.decode_time {
        write_tfdt(out, t)?;
    }
    for run in &traf.runs {
        write_trun(out, run)?;
    }
    finish_atom(out, start)
}

pub fn write_tfhd(out: &mut Vec<u8>, tfhd: &TrackFragmentHeader) -> Result<usize> {
    let start = begin_atom(out, b"tfhd");
    write_full_box_header(out, 0, tfhd.flags())?;
    out.write_u32::<BigEndian>(tfhd.track_id)?;
    if let Some(v) = tfhd.base_data_offset {
        out.write_u64::<BigEndian>(v)?;
    }
    for v in [
        tfhd.sample_description_index,
        tfhd.default_sample_duration,
        tfhd.default_sample_size,
        tfhd.default_sample_flags,
    ]
    .into_iter()
    .flatten()
    {
        out.write_u32::<BigEndian>(v)?;
    }
    finish_atom(out, start)
}

pub fn write_tfdt(out: &mut Vec<u8>, decode_time: u64) -> Result<usize> {
    let start = begin_atom(out, b"tfdt");
    write_full_box_header(out, 1, 0)?;
    out.write_u64::<BigEndian>(decode_time)?;
    finish_atom(out, start)
}

/// Fails when samples of the run do not all populate the same fields.
pub fn write_trun(out: &mut Vec<u8>, run: &TrackRun) -> Result<usize> {
    let flags = run.flags();
    let shape = flags & 0xf00;
    if let Some(i) = run.samples.iter().position(|s| s.field_flags() != shape) {
        return Err(ParseError::Structure(format!(
            "trun sample {i} has fields {:#x}, run uses {shape:#x}",
            run.samples[i].field_flags()
        )));
    }
    let start = begin_atom(out, b"trun");
    write_full_box_header(out, 1, flags)?;
    out.write_u32::<BigEndian>(run.sample_count())?;
    if let Some(v) = run.data_offset {
        out.write_i32::<BigEndian>(v)?;
    }
    if let Some(v) = run.first_sample_flags {
        out.write_u32::<BigEndian>(v)?;
    }
    for s in &run.samples {
        for v in [s.duration, s.size, s.flags].into_iter().flatten() {
            out.write_u32::<BigEndian>(v)?;
        }
        if let Some(v) = s.composition_time_offset {
            out.write_i32::<BigEndian>(v)?;
        }
    }
    finish_atom(out, start)
}
