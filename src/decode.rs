//! Typed decoders for the box catalogue.
//!
//! Every `read_*` takes an already-located [`Atom`] and reads its payload
//! with positioned reads. Time fields are promoted to their version 1 width.
//! Containers list their children with [`read_children`] and dispatch by
//! type; children this crate does not model are skipped.

use crate::boxes::{Atom, FourCC};
use crate::fixed_point::{Fixed16_16, Fixed2_30, Fixed8_8};
use crate::parser::{
    alloc_table, read_children, read_full_box_header, read_simple_box_at, ParseError, Result,
};
use crate::records::*;
use crate::util::read_slice;
use byteorder::{BigEndian, ReadBytesExt};
use log::{debug, warn};
use std::io::{Read, Seek, SeekFrom};

// ---------- Helpers ----------

fn seek_content<R: Seek + ?Sized>(r: &mut R, atom: &Atom) -> Result<()> {
    r.seek(SeekFrom::Start(atom.content_offset()))?;
    Ok(())
}

fn expect_type(atom: &Atom, tags: &[&[u8; 4]]) -> Result<()> {
    if tags.iter().any(|t| atom.is_type(t)) {
        Ok(())
    } else {
        let wanted: Vec<String> = tags.iter().map(|t| FourCC(**t).to_string()).collect();
        Err(ParseError::Structure(format!(
            "expected '{}' atom, found '{}'",
            wanted.join("' or '"),
            atom.typ
        )))
    }
}

fn read_timescale<R: Read + ?Sized>(r: &mut R, atom: &Atom) -> Result<u32> {
    match r.read_u32::<BigEndian>()? {
        0 => Err(ParseError::Structure(format!("{} timescale must be non-zero", atom.typ))),
        t => Ok(t),
    }
}

fn read_time<R: Read + ?Sized>(r: &mut R, version: u8) -> Result<u64> {
    Ok(if version == 1 {
        r.read_u64::<BigEndian>()?
    } else {
        r.read_u32::<BigEndian>()? as u64
    })
}

fn skip<R: Seek + ?Sized>(r: &mut R, n: i64) -> Result<()> {
    r.seek(SeekFrom::Current(n))?;
    Ok(())
}

fn find_child<'a>(kids: &'a [Atom], tag: &[u8; 4]) -> Option<&'a Atom> {
    kids.iter().find(|a| a.is_type(tag))
}

fn require_child<'a>(kids: &'a [Atom], tag: &[u8; 4]) -> Result<&'a Atom> {
    find_child(kids, tag).ok_or(ParseError::NotFound(FourCC(*tag)))
}

/// Null-terminated (or box-terminated) string of at most `len` bytes.
fn read_cstring<R: Read + Seek + ?Sized>(r: &mut R, len: u64) -> Result<String> {
    let offset = r.stream_position()?;
    let bytes = read_slice(r, offset, len)?;
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
}

fn read_matrix<R: Read + ?Sized>(r: &mut R) -> Result<Matrix> {
    let mut v = [0i64; 9];
    for x in v.iter_mut() {
        *x = r.read_i32::<BigEndian>()? as i64;
    }
    Ok(Matrix {
        a: Fixed16_16::with_count(v[0]),
        b: Fixed16_16::with_count(v[1]),
        u: Fixed2_30::with_count(v[2]),
        c: Fixed16_16::with_count(v[3]),
        d: Fixed16_16::with_count(v[4]),
        v: Fixed2_30::with_count(v[5]),
        tx: Fixed16_16::with_count(v[6]),
        ty: Fixed16_16::with_count(v[7]),
        w: Fixed2_30::with_count(v[8]),
    })
}

/// A u32 field present only when `flag` is set in `flags`.
fn read_flagged<R: Read + ?Sized>(r: &mut R, flags: u32, flag: u32) -> Result<Option<u32>> {
    Ok(if flags & flag != 0 { Some(r.read_u32::<BigEndian>()?) } else { None })
}

fn read_u32_table<R: Read + ?Sized>(r: &mut R, count: u32) -> Result<Vec<u32>> {
    let mut out = Vec::with_capacity(count.min(1 << 16) as usize);
    for _ in 0..count {
        out.push(r.read_u32::<BigEndian>()?);
    }
    Ok(out)
}

// ---------- File level ----------

pub fn read_ftyp<R: Read + Seek + ?Sized>(r: &mut R, atom: &Atom) -> Result<FileType> {
    expect_type(atom, &[b"ftyp"])?;
    seek_content(r, atom)?;
    let mut major = [0u8; 4];
    r.read_exact(&mut major)?;
    let minor_version = r.read_u32::<BigEndian>()?;
    let mut compatible_brands = Vec::new();
    for _ in 0..atom.content_length().saturating_sub(8) / 4 {
        let mut brand = [0u8; 4];
        r.read_exact(&mut brand)?;
        compatible_brands.push(FourCC(brand));
    }
    Ok(FileType { major_brand: FourCC(major), minor_version, compatible_brands })
}

// ---------- Movie ----------

pub fn read_mvhd<R: Read + Seek + ?Sized>(r: &mut R, atom: &Atom) -> Result<MovieHeader> {
    expect_type(atom, &[b"mvhd"])?;
    seek_content(r, atom)?;
    let h = read_full_box_header(r)?;
    let creation_time = read_time(r, h.version)?;
    let modification_time = read_time(r, h.version)?;
    let timescale = read_timescale(r, atom)?;
    let duration = read_time(r, h.version)?;
    let preferred_rate = Fixed16_16::with_count(r.read_i32::<BigEndian>()? as i64);
    let preferred_volume = Fixed8_8::with_count(r.read_i16::<BigEndian>()? as i64);
    // reserved: u16 + 2 * u32
    skip(r, 10)?;
    let matrix = read_matrix(r)?;
    Ok(MovieHeader {
        creation_time,
        modification_time,
        timescale,
        duration,
        preferred_rate,
        preferred_volume,
        matrix,
        preview_time: r.read_i32::<BigEndian>()?,
        preview_duration: r.read_i32::<BigEndian>()?,
        poster_time: r.read_i32::<BigEndian>()?,
        selection_time: r.read_i32::<BigEndian>()?,
        selection_duration: r.read_i32::<BigEndian>()?,
        current_time: r.read_i32::<BigEndian>()?,
        next_track_id: r.read_u32::<BigEndian>()?,
    })
}

/// `moov`: one `mvhd` plus every `trak`, in file order.
pub fn read_moov<R: Read + Seek + ?Sized>(r: &mut R, atom: &Atom) -> Result<Movie> {
    expect_type(atom, &[b"moov"])?;
    let kids = read_children(r, atom)?;
    let mvhd = read_mvhd(r, require_child(&kids, b"mvhd")?)?;
    let mut tracks = Vec::new();
    for kid in &kids {
        match &kid.typ.0 {
            b"mvhd" => {}
            b"trak" => tracks.push(read_trak(r, kid)?),
            _ => debug!("moov: skipping '{}' at {:#x}", kid.typ, kid.header_offset()),
        }
    }
    Ok(Movie { mvhd, tracks })
}

// ---------- Track ----------

pub fn read_trak<R: Read + Seek + ?Sized>(r: &mut R, atom: &Atom) -> Result<Track> {
    expect_type(atom, &[b"trak"])?;
    let kids = read_children(r, atom)?;
    let tkhd = read_tkhd(r, require_child(&kids, b"tkhd")?)?;
    let edits = match find_child(&kids, b"edts") {
        Some(edts) => read_edts(r, edts)?,
        None => Vec::new(),
    };
    let mdia = read_mdia(r, require_child(&kids, b"mdia")?)?;
    Ok(Track { tkhd, edits, mdia })
}

pub fn read_tkhd<R: Read + Seek + ?Sized>(r: &mut R, atom: &Atom) -> Result<TrackHeader> {
    expect_type(atom, &[b"tkhd"])?;
    seek_content(r, atom)?;
    let h = read_full_box_header(r)?;
    let creation_time = read_time(r, h.version)?;
    let modification_time = read_time(r, h.version)?;
    let track_id = r.read_u32::<BigEndian>()?;
    let _reserved = r.read_u32::<BigEndian>()?;
    let duration = read_time(r, h.version)?;
    skip(r, 8)?;
    let layer = r.read_i16::<BigEndian>()?;
    let group = r.read_u16::<BigEndian>()?;
    let volume = Fixed8_8::with_count(r.read_i16::<BigEndian>()? as i64);
    let _reserved = r.read_u16::<BigEndian>()?;
    let matrix = read_matrix(r)?;
    let width = Fixed16_16::with_count(r.read_u32::<BigEndian>()? as i64);
    let height = Fixed16_16::with_count(r.read_u32::<BigEndian>()? as i64);
    Ok(TrackHeader {
        flags: h.flags,
        creation_time,
        modification_time,
        track_id,
        duration,
        layer,
        group,
        volume,
        matrix,
        width,
        height,
    })
}

/// `edts` holding a single `elst`. An `edts` without one yields no edits.
pub fn read_edts<R: Read + Seek + ?Sized>(r: &mut R, atom: &Atom) -> Result<Vec<EditEntry>> {
    expect_type(atom, &[b"edts"])?;
    let kids = read_children(r, atom)?;
    match find_child(&kids, b"elst") {
        Some(elst) => read_elst(r, elst),
        None => Ok(Vec::new()),
    }
}

pub fn read_elst<R: Read + Seek + ?Sized>(r: &mut R, atom: &Atom) -> Result<Vec<EditEntry>> {
    expect_type(atom, &[b"elst"])?;
    seek_content(r, atom)?;
    let h = read_full_box_header(r)?;
    let count = r.read_u32::<BigEndian>()?;
    let mut edits = Vec::new();
    for _ in 0..count {
        let (duration, start_offset) = if h.version == 1 {
            (r.read_u64::<BigEndian>()?, r.read_i64::<BigEndian>()?)
        } else {
            (r.read_u32::<BigEndian>()? as u64, r.read_i32::<BigEndian>()? as i64)
        };
        let rate = Fixed16_16::with_count(r.read_i32::<BigEndian>()? as i64);
        edits.push(EditEntry { duration, start_offset, rate });
    }
    Ok(edits)
}

// ---------- Media ----------

pub fn read_mdia<R: Read + Seek + ?Sized>(r: &mut R, atom: &Atom) -> Result<Media> {
    expect_type(atom, &[b"mdia"])?;
    let kids = read_children(r, atom)?;
    Ok(Media {
        mdhd: read_mdhd(r, require_child(&kids, b"mdhd")?)?,
        hdlr: read_hdlr(r, require_child(&kids, b"hdlr")?)?,
        minf: read_minf(r, require_child(&kids, b"minf")?)?,
    })
}

pub fn read_mdhd<R: Read + Seek + ?Sized>(r: &mut R, atom: &Atom) -> Result<MediaHeader> {
    expect_type(atom, &[b"mdhd"])?;
    seek_content(r, atom)?;
    let h = read_full_box_header(r)?;
    let creation_time = read_time(r, h.version)?;
    let modification_time = read_time(r, h.version)?;
    let timescale = read_timescale(r, atom)?;
    let duration = read_time(r, h.version)?;
    let language = r.read_u16::<BigEndian>()? & 0x7fff;
    Ok(MediaHeader { creation_time, modification_time, timescale, duration, language })
}

pub fn read_hdlr<R: Read + Seek + ?Sized>(r: &mut R, atom: &Atom) -> Result<Handler> {
    expect_type(atom, &[b"hdlr"])?;
    seek_content(r, atom)?;
    let _h = read_full_box_header(r)?;
    let _pre_defined = r.read_u32::<BigEndian>()?;
    let mut handler_type = [0u8; 4];
    r.read_exact(&mut handler_type)?;
    skip(r, 12)?;
    let name = read_cstring(r, atom.content_length().saturating_sub(24))?;
    Ok(Handler { handler_type: FourCC(handler_type), name })
}

pub fn read_minf<R: Read + Seek + ?Sized>(r: &mut R, atom: &Atom) -> Result<MediaInformation> {
    expect_type(atom, &[b"minf"])?;
    let kids = read_children(r, atom)?;
    let vmhd = match find_child(&kids, b"vmhd") {
        Some(a) => read_vmhd(r, a)?,
        None => VideoMediaHeader::default(),
    };
    let dref = match find_child(&kids, b"dinf") {
        Some(a) => read_dinf(r, a)?,
        None => DataReference { entries: Vec::new() },
    };
    let stbl = read_stbl(r, require_child(&kids, b"stbl")?)?;
    Ok(MediaInformation { vmhd, dref, stbl })
}

pub fn read_vmhd<R: Read + Seek + ?Sized>(r: &mut R, atom: &Atom) -> Result<VideoMediaHeader> {
    expect_type(atom, &[b"vmhd"])?;
    seek_content(r, atom)?;
    let _h = read_full_box_header(r)?;
    let graphics_mode = r.read_u16::<BigEndian>()?;
    let mut opcolor = [0u16; 3];
    for c in opcolor.iter_mut() {
        *c = r.read_u16::<BigEndian>()?;
    }
    Ok(VideoMediaHeader { graphics_mode, opcolor })
}

pub fn read_dinf<R: Read + Seek + ?Sized>(r: &mut R, atom: &Atom) -> Result<DataReference> {
    expect_type(atom, &[b"dinf"])?;
    let kids = read_children(r, atom)?;
    read_dref(r, require_child(&kids, b"dref")?)
}

pub fn read_dref<R: Read + Seek + ?Sized>(r: &mut R, atom: &Atom) -> Result<DataReference> {
    expect_type(atom, &[b"dref"])?;
    let mut entries = Vec::new();
    for entry in read_children(r, atom)? {
        if !entry.is_type(b"url ") {
            warn!("dref: ignoring '{}' entry at {:#x}", entry.typ, entry.header_offset());
            continue;
        }
        seek_content(r, &entry)?;
        let h = read_full_box_header(r)?;
        let location = if h.flags & DataEntry::SELF_CONTAINED == 0 {
            read_cstring(r, entry.content_length().saturating_sub(4))?
        } else {
            String::new()
        };
        entries.push(DataEntry { flags: h.flags, location });
    }
    Ok(DataReference { entries })
}

// ---------- Sample table ----------

pub fn read_stbl<R: Read + Seek + ?Sized>(r: &mut R, atom: &Atom) -> Result<SampleTable> {
    expect_type(atom, &[b"stbl"])?;
    let kids = read_children(r, atom)?;
    let mut table = SampleTable {
        sample_description: read_stsd(r, require_child(&kids, b"stsd")?)?,
        ..SampleTable::default()
    };
    for kid in &kids {
        match &kid.typ.0 {
            b"stsd" => {}
            b"stts" => table.decode_deltas = read_stts_runs(r, kid)?,
            b"stss" => table.sync_samples = Some(read_stss(r, kid)?),
            b"ctts" => table.composition_offsets = read_ctts_runs(r, kid)?,
            b"stsc" => table.sample_to_chunk = read_stsc(r, kid)?,
            b"stsz" => table.sample_sizes = read_stsz(r, kid)?,
            b"stco" | b"co64" => table.chunk_offsets = read_co64(r, kid)?,
            _ => debug!("stbl: skipping '{}' at {:#x}", kid.typ, kid.header_offset()),
        }
    }
    Ok(table)
}

/// `stsd` with its first `avc1` entry. Other sample entry kinds are skipped.
pub fn read_stsd<R: Read + Seek + ?Sized>(r: &mut R, atom: &Atom) -> Result<SampleDescription> {
    expect_type(atom, &[b"stsd"])?;
    for entry in read_children(r, atom)? {
        if entry.is_type(b"avc1") {
            return Ok(SampleDescription { avc1: read_avc1(r, &entry)? });
        }
        warn!("stsd: unsupported sample entry '{}'", entry.typ);
    }
    Err(ParseError::NotFound(FourCC(*b"avc1")))
}

pub fn read_avc1<R: Read + Seek + ?Sized>(r: &mut R, atom: &Atom) -> Result<VisualSampleEntry> {
    expect_type(atom, &[b"avc1"])?;
    r.seek(SeekFrom::Start(atom.content_offset() + 6))?;
    let data_reference_index = r.read_u16::<BigEndian>()?;
    r.seek(SeekFrom::Start(atom.content_offset() + 24))?;
    let width = r.read_u16::<BigEndian>()?;
    let height = r.read_u16::<BigEndian>()?;
    let kids = read_children(r, atom)?;
    let avcc = read_avcc(r, require_child(&kids, b"avcC")?)?;
    Ok(VisualSampleEntry { data_reference_index, width, height, avcc })
}

pub fn read_avcc<R: Read + Seek + ?Sized>(r: &mut R, atom: &Atom) -> Result<AvcDecoderConfig> {
    expect_type(atom, &[b"avcC"])?;
    // version, profile, compatibility, level
    r.seek(SeekFrom::Start(atom.content_offset() + 4))?;
    let length_byte = r.read_u8()?;
    // `byte & 3 + 1` binds as `byte & 4`; files rely on that reading
    #[allow(clippy::precedence)]
    let nalu_length_size = length_byte & 3 + 1;

    let sps_count = (r.read_u8()? & 0x1f) as usize;
    if sps_count != 1 {
        return Err(ParseError::Cardinality { what: "sps", count: sps_count });
    }
    let sps = read_parameter_set(r)?;

    let pps_count = r.read_u8()? as usize;
    if pps_count != 1 {
        return Err(ParseError::Cardinality { what: "pps", count: pps_count });
    }
    let pps = read_parameter_set(r)?;
    Ok(AvcDecoderConfig { nalu_length_size, sps, pps })
}

fn read_parameter_set<R: Read + Seek + ?Sized>(r: &mut R) -> Result<Vec<u8>> {
    let offset = r.stream_position()?;
    let range = read_simple_box_at(r, offset, 2)?;
    let data = read_slice(r, range.content_offset, range.content_length)?;
    Ok(data)
}

fn read_tts_runs<R: Read + Seek + ?Sized>(r: &mut R, atom: &Atom) -> Result<Vec<TtsRun>> {
    seek_content(r, atom)?;
    let _h = read_full_box_header(r)?;
    let count = r.read_u32::<BigEndian>()?;
    let mut runs = Vec::new();
    for _ in 0..count {
        let count = r.read_u32::<BigEndian>()?;
        // ctts version 0 is nominally unsigned; both versions share the bit pattern
        let value = r.read_i32::<BigEndian>()?;
        runs.push(TtsRun { count, value });
    }
    Ok(runs)
}

pub fn read_stts_runs<R: Read + Seek + ?Sized>(r: &mut R, atom: &Atom) -> Result<Vec<TtsRun>> {
    expect_type(atom, &[b"stts"])?;
    read_tts_runs(r, atom)
}

pub fn read_ctts_runs<R: Read + Seek + ?Sized>(r: &mut R, atom: &Atom) -> Result<Vec<TtsRun>> {
    expect_type(atom, &[b"ctts"])?;
    read_tts_runs(r, atom)
}

/// Per-sample decode durations.
pub fn read_stts<R: Read + Seek + ?Sized>(r: &mut R, atom: &Atom) -> Result<Vec<i32>> {
    expand_tts(&read_stts_runs(r, atom)?)
}

/// Per-sample composition offsets.
pub fn read_ctts<R: Read + Seek + ?Sized>(r: &mut R, atom: &Atom) -> Result<Vec<i32>> {
    expand_tts(&read_ctts_runs(r, atom)?)
}

pub fn read_stss<R: Read + Seek + ?Sized>(r: &mut R, atom: &Atom) -> Result<Vec<u32>> {
    expect_type(atom, &[b"stss"])?;
    seek_content(r, atom)?;
    let _h = read_full_box_header(r)?;
    let count = r.read_u32::<BigEndian>()?;
    read_u32_table(r, count)
}

pub fn read_stsc<R: Read + Seek + ?Sized>(r: &mut R, atom: &Atom) -> Result<Vec<SampleToChunk>> {
    expect_type(atom, &[b"stsc"])?;
    seek_content(r, atom)?;
    let _h = read_full_box_header(r)?;
    let count = r.read_u32::<BigEndian>()?;
    let mut entries = Vec::new();
    for _ in 0..count {
        entries.push(SampleToChunk {
            first_chunk: r.read_u32::<BigEndian>()?,
            samples_per_chunk: r.read_u32::<BigEndian>()?,
            sample_description_index: r.read_u32::<BigEndian>()?,
        });
    }
    Ok(entries)
}

/// One size per sample, whether stored individually or as a common size.
pub fn read_stsz<R: Read + Seek + ?Sized>(r: &mut R, atom: &Atom) -> Result<Vec<u32>> {
    expect_type(atom, &[b"stsz"])?;
    seek_content(r, atom)?;
    let _h = read_full_box_header(r)?;
    let sample_size = r.read_u32::<BigEndian>()?;
    let count = r.read_u32::<BigEndian>()?;
    if sample_size != 0 {
        let mut sizes = alloc_table("stsz", count as u64)?;
        sizes.resize(count as usize, sample_size);
        return Ok(sizes);
    }
    read_u32_table(r, count)
}

/// Chunk offsets from `co64`, or from `stco` promoted to 64 bits.
pub fn read_co64<R: Read + Seek + ?Sized>(r: &mut R, atom: &Atom) -> Result<Vec<u64>> {
    expect_type(atom, &[b"co64", b"stco"])?;
    seek_content(r, atom)?;
    let _h = read_full_box_header(r)?;
    let count = r.read_u32::<BigEndian>()?;
    let wide = atom.is_type(b"co64");
    let mut offsets = Vec::new();
    for _ in 0..count {
        offsets.push(if wide {
            r.read_u64::<BigEndian>()?
        } else {
            r.read_u32::<BigEndian>()? as u64
        });
    }
    Ok(offsets)
}

// ---------- Fragments ----------

pub fn read_mfhd<R: Read + Seek + ?Sized>(r: &mut R, atom: &Atom) -> Result<u32> {
    expect_type(atom, &[b"mfhd"])?;
    seek_content(r, atom)?;
    let _h = read_full_box_header(r)?;
    Ok(r.read_u32::<BigEndian>()?)
}

pub fn read_tfhd<R: Read + Seek + ?Sized>(r: &mut R, atom: &Atom) -> Result<TrackFragmentHeader> {
    use crate::records::tfhd_flags::*;
    expect_type(atom, &[b"tfhd"])?;
    seek_content(r, atom)?;
    let h = read_full_box_header(r)?;
    let mut tfhd = TrackFragmentHeader { track_id: r.read_u32::<BigEndian>()?, ..Default::default() };
    if h.flags & BASE_DATA_OFFSET != 0 {
        tfhd.base_data_offset = Some(r.read_u64::<BigEndian>()?);
    }
    tfhd.sample_description_index = read_flagged(r, h.flags, SAMPLE_DESCRIPTION_INDEX)?;
    tfhd.default_sample_duration = read_flagged(r, h.flags, DEFAULT_SAMPLE_DURATION)?;
    tfhd.default_sample_size = read_flagged(r, h.flags, DEFAULT_SAMPLE_SIZE)?;
    tfhd.default_sample_flags = read_flagged(r, h.flags, DEFAULT_SAMPLE_FLAGS)?;
    Ok(tfhd)
}

pub fn read_tfdt<R: Read + Seek + ?Sized>(r: &mut R, atom: &Atom) -> Result<u64> {
    expect_type(atom, &[b"tfdt"])?;
    seek_content(r, atom)?;
    let h = read_full_box_header(r)?;
    read_time(r, h.version)
}

pub fn read_trun<R: Read + Seek + ?Sized>(r: &mut R, atom: &Atom) -> Result<TrackRun> {
    use crate::records::trun_flags::*;
    expect_type(atom, &[b"trun"])?;
    seek_content(r, atom)?;
    let h = read_full_box_header(r)?;
    let sample_count = r.read_u32::<BigEndian>()?;
    let mut run = TrackRun::default();
    if h.flags & DATA_OFFSET != 0 {
        run.data_offset = Some(r.read_i32::<BigEndian>()?);
    }
    run.first_sample_flags = read_flagged(r, h.flags, FIRST_SAMPLE_FLAGS)?;
    for _ in 0..sample_count {
        let duration = read_flagged(r, h.flags, SAMPLE_DURATION)?;
        let size = read_flagged(r, h.flags, SAMPLE_SIZE)?;
        let flags = read_flagged(r, h.flags, SAMPLE_FLAGS)?;
        let composition_time_offset =
            read_flagged(r, h.flags, SAMPLE_COMPOSITION_TIME_OFFSET)?.map(|v| v as i32);
        run.samples.push(TrunSample { duration, size, flags, composition_time_offset });
    }
    Ok(run)
}

/// `traf`: a leading `tfhd`, at most one `tfdt` ahead of any `trun`, then
/// runs. Children of other types are skipped.
pub fn read_traf<R: Read + Seek + ?Sized>(r: &mut R, atom: &Atom) -> Result<TrackFragment> {
    expect_type(atom, &[b"traf"])?;
    let kids = read_children(r, atom)?;
    let (first, rest) = kids.split_first().ok_or(ParseError::NotFound(FourCC(*b"tfhd")))?;
    if !first.is_type(b"tfhd") {
        return Err(ParseError::Structure(format!(
            "traf must start with tfhd, found '{}'",
            first.typ
        )));
    }
    let mut traf = TrackFragment { header: read_tfhd(r, first)?, ..Default::default() };
    for kid in rest {
        match &kid.typ.0 {
            b"tfdt" => {
                if traf.decode_time.is_some() {
                    return Err(ParseError::Structure("multiple tfdt atoms in traf atom".into()));
                }
                if !traf.runs.is_empty() {
                    return Err(ParseError::Structure("tfdt has to occur before trun".into()));
                }
                traf.decode_time = Some(read_tfdt(r, kid)?);
            }
            b"trun" => traf.runs.push(read_trun(r, kid)?),
            _ => debug!("traf: skipping '{}' at {:#x}", kid.typ, kid.header_offset()),
        }
    }
    Ok(traf)
}

/// `moof`: a leading `mfhd` followed only by `traf` children.
pub fn read_moof<R: Read + Seek + ?Sized>(r: &mut R, atom: &Atom) -> Result<MovieFragment> {
    expect_type(atom, &[b"moof"])?;
    let kids = read_children(r, atom)?;
    let (first, rest) = kids.split_first().ok_or(ParseError::NotFound(FourCC(*b"mfhd")))?;
    if !first.is_type(b"mfhd") {
        return Err(ParseError::Structure(format!(
            "moof must start with mfhd, found '{}'",
            first.typ
        )));
    }
    let sequence_number = read_mfhd(r, first)?;
    let mut trafs = Vec::new();
    for kid in rest {
        if !kid.is_type(b"traf") {
            return Err(ParseError::Structure(format!(
                "unexpected atom type '{}' in moof after header",
                kid.typ
            )));
        }
        trafs.push(read_traf(r, kid)?);
    }
    Ok(MovieFragment { sequence_number, trafs })
}
