//! Plain typed records for the box catalogue.
//!
//! Time fields are held at full (version 1) width whatever their on-disk
//! version was. Optional fields of `tfhd` / `trun` are `Option`s, and the
//! on-disk flag words are derived from which ones are populated.

use crate::boxes::FourCC;
use crate::fixed_point::{Fixed16_16, Fixed2_30, Fixed8_8, RuntimeFixedPoint};
use crate::parser::{alloc_table, Result};
use serde::{Deserialize, Serialize};

/// One `(run_count, value)` entry of a time-to-sample table (`stts`/`ctts`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtsRun {
    pub count: u32,
    pub value: i32,
}

/// Run-length encode a per-sample sequence.
pub fn compress_tts(values: &[i32]) -> Vec<TtsRun> {
    let mut runs = Vec::new();
    let Some(&first) = values.first() else {
        return runs;
    };
    let mut current = TtsRun { count: 0, value: first };
    for &v in values {
        if v != current.value {
            runs.push(current);
            current = TtsRun { count: 0, value: v };
        }
        current.count += 1;
    }
    runs.push(current);
    runs
}

/// Expand runs back into one value per sample.
///
/// Fails with [`crate::ParseError::TooLarge`] when the runs add up to more
/// than [`crate::parser::MAX_TABLE_ENTRIES`] samples.
pub fn expand_tts(runs: &[TtsRun]) -> Result<Vec<i32>> {
    let total: u64 = runs.iter().map(|r| r.count as u64).sum();
    let mut values = alloc_table("time-to-sample table", total)?;
    for run in runs {
        values.extend(std::iter::repeat_n(run.value, run.count as usize));
    }
    Ok(values)
}

// A zero timescale has no time value.
fn time_in(count: u64, timescale: u32) -> Option<RuntimeFixedPoint> {
    (timescale != 0).then(|| RuntimeFixedPoint::new(count as i64, timescale as u64))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileType {
    pub major_brand: FourCC,
    pub minor_version: u32,
    pub compatible_brands: Vec<FourCC>,
}

impl Default for FileType {
    fn default() -> Self {
        FileType {
            major_brand: FourCC(*b"isom"),
            minor_version: 0x200,
            compatible_brands: vec![
                FourCC(*b"isom"),
                FourCC(*b"iso2"),
                FourCC(*b"avc1"),
                FourCC(*b"mp41"),
            ],
        }
    }
}

/// 3x3 display transform; stored on disk as a, b, u, c, d, v, tx, ty, w.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub a: Fixed16_16,
    pub b: Fixed16_16,
    pub c: Fixed16_16,
    pub d: Fixed16_16,
    pub tx: Fixed16_16,
    pub ty: Fixed16_16,
    pub u: Fixed2_30,
    pub v: Fixed2_30,
    pub w: Fixed2_30,
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix {
            a: Fixed16_16::from_f32(1.0),
            b: Fixed16_16::default(),
            c: Fixed16_16::default(),
            d: Fixed16_16::from_f32(1.0),
            tx: Fixed16_16::default(),
            ty: Fixed16_16::default(),
            u: Fixed2_30::default(),
            v: Fixed2_30::default(),
            w: Fixed2_30::from_f32(1.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieHeader {
    pub creation_time: u64,
    pub modification_time: u64,
    pub timescale: u32,
    pub duration: u64,
    pub preferred_rate: Fixed16_16,
    pub preferred_volume: Fixed8_8,
    pub matrix: Matrix,
    pub preview_time: i32,
    pub preview_duration: i32,
    pub poster_time: i32,
    pub selection_time: i32,
    pub selection_duration: i32,
    pub current_time: i32,
    pub next_track_id: u32,
}

impl Default for MovieHeader {
    fn default() -> Self {
        MovieHeader {
            creation_time: 0,
            modification_time: 0,
            timescale: 90000,
            duration: 0,
            preferred_rate: Fixed16_16::from_f32(1.0),
            preferred_volume: Fixed8_8::from_f32(1.0),
            matrix: Matrix::default(),
            preview_time: 0,
            preview_duration: 0,
            poster_time: 0,
            selection_time: 0,
            selection_duration: 0,
            current_time: 0,
            next_track_id: 0xff,
        }
    }
}

impl MovieHeader {
    /// Duration expressed in the movie timebase; `None` for a zero timescale.
    pub fn duration_time(&self) -> Option<RuntimeFixedPoint> {
        time_in(self.duration, self.timescale)
    }
}

pub mod tkhd_flags {
    pub const ENABLED: u32 = 0x1;
    pub const IN_MOVIE: u32 = 0x2;
    pub const IN_PREVIEW: u32 = 0x4;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackHeader {
    pub flags: u32,
    pub creation_time: u64,
    pub modification_time: u64,
    pub track_id: u32,
    pub duration: u64,
    pub layer: i16,
    pub group: u16,
    pub volume: Fixed8_8,
    pub matrix: Matrix,
    pub width: Fixed16_16,
    pub height: Fixed16_16,
}

impl Default for TrackHeader {
    fn default() -> Self {
        TrackHeader {
            flags: tkhd_flags::ENABLED | tkhd_flags::IN_MOVIE,
            creation_time: 0,
            modification_time: 0,
            track_id: 1,
            duration: 0,
            layer: 0,
            group: 0,
            volume: Fixed8_8::default(),
            matrix: Matrix::default(),
            width: Fixed16_16::default(),
            height: Fixed16_16::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaHeader {
    pub creation_time: u64,
    pub modification_time: u64,
    pub timescale: u32,
    pub duration: u64,
    /// Packed ISO-639-2/T code, three 5-bit letters.
    pub language: u16,
}

impl Default for MediaHeader {
    fn default() -> Self {
        MediaHeader {
            creation_time: 0,
            modification_time: 0,
            timescale: 90000,
            duration: 0,
            language: 0,
        }
    }
}

impl MediaHeader {
    pub fn language_code(&self) -> String {
        lang_from_u16(self.language)
    }

    pub fn duration_time(&self) -> Option<RuntimeFixedPoint> {
        time_in(self.duration, self.timescale)
    }
}

fn lang_from_u16(code: u16) -> String {
    if code == 0 {
        return "und".to_string();
    }
    let c1 = ((code >> 10) & 0x1F) as u8 + 0x60;
    let c2 = ((code >> 5) & 0x1F) as u8 + 0x60;
    let c3 = (code & 0x1F) as u8 + 0x60;
    format!("{}{}{}", c1 as char, c2 as char, c3 as char,)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Handler {
    pub handler_type: FourCC,
    pub name: String,
}

impl Default for Handler {
    fn default() -> Self {
        Handler { handler_type: FourCC(*b"vide"), name: String::new() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoMediaHeader {
    pub graphics_mode: u16,
    pub opcolor: [u16; 3],
}

/// A `url ` entry. Flag 0x1 means the media data lives in this file and
/// `location` is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataEntry {
    pub flags: u32,
    pub location: String,
}

impl DataEntry {
    pub const SELF_CONTAINED: u32 = 0x1;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataReference {
    pub entries: Vec<DataEntry>,
}

impl Default for DataReference {
    fn default() -> Self {
        DataReference {
            entries: vec![DataEntry { flags: DataEntry::SELF_CONTAINED, location: String::new() }],
        }
    }
}

/// `avcC`: NAL length field width plus exactly one SPS and one PPS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvcDecoderConfig {
    pub nalu_length_size: u8,
    pub sps: Vec<u8>,
    pub pps: Vec<u8>,
}

impl Default for AvcDecoderConfig {
    fn default() -> Self {
        AvcDecoderConfig { nalu_length_size: 4, sps: Vec::new(), pps: Vec::new() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualSampleEntry {
    pub data_reference_index: u16,
    pub width: u16,
    pub height: u16,
    pub avcc: AvcDecoderConfig,
}

impl Default for VisualSampleEntry {
    fn default() -> Self {
        VisualSampleEntry { data_reference_index: 1, width: 0, height: 0, avcc: AvcDecoderConfig::default() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleDescription {
    pub avc1: VisualSampleEntry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleToChunk {
    pub first_chunk: u32,
    pub samples_per_chunk: u32,
    pub sample_description_index: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleTable {
    pub sample_description: SampleDescription,
    /// `stts` runs of sample durations.
    pub decode_deltas: Vec<TtsRun>,
    /// `stss` 1-based keyframe numbers; `None` when every sample is a sync sample.
    pub sync_samples: Option<Vec<u32>>,
    /// `ctts` runs of composition offsets; empty when absent.
    pub composition_offsets: Vec<TtsRun>,
    pub sample_to_chunk: Vec<SampleToChunk>,
    pub sample_sizes: Vec<u32>,
    pub chunk_offsets: Vec<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInformation {
    pub vmhd: VideoMediaHeader,
    pub dref: DataReference,
    pub stbl: SampleTable,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Media {
    pub mdhd: MediaHeader,
    pub hdlr: Handler,
    pub minf: MediaInformation,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EditEntry {
    pub duration: u64,
    /// Media time where the edit starts; -1 marks an empty edit.
    pub start_offset: i64,
    pub rate: Fixed16_16,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub tkhd: TrackHeader,
    pub edits: Vec<EditEntry>,
    pub mdia: Media,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub mvhd: MovieHeader,
    pub tracks: Vec<Track>,
}

// ---------- Fragments ----------

pub mod tfhd_flags {
    pub const BASE_DATA_OFFSET: u32 = 0x1;
    pub const SAMPLE_DESCRIPTION_INDEX: u32 = 0x2;
    pub const DEFAULT_SAMPLE_DURATION: u32 = 0x8;
    pub const DEFAULT_SAMPLE_SIZE: u32 = 0x10;
    pub const DEFAULT_SAMPLE_FLAGS: u32 = 0x20;
}

pub mod trun_flags {
    pub const DATA_OFFSET: u32 = 0x1;
    pub const FIRST_SAMPLE_FLAGS: u32 = 0x4;
    pub const SAMPLE_DURATION: u32 = 0x100;
    pub const SAMPLE_SIZE: u32 = 0x200;
    pub const SAMPLE_FLAGS: u32 = 0x400;
    pub const SAMPLE_COMPOSITION_TIME_OFFSET: u32 = 0x800;
}

fn flag_if(present: bool, flag: u32) -> u32 {
    if present { flag } else { 0 }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackFragmentHeader {
    pub track_id: u32,
    pub base_data_offset: Option<u64>,
    pub sample_description_index: Option<u32>,
    pub default_sample_duration: Option<u32>,
    pub default_sample_size: Option<u32>,
    pub default_sample_flags: Option<u32>,
}

impl TrackFragmentHeader {
    pub fn flags(&self) -> u32 {
        use tfhd_flags::*;
        flag_if(self.base_data_offset.is_some(), BASE_DATA_OFFSET)
            | flag_if(self.sample_description_index.is_some(), SAMPLE_DESCRIPTION_INDEX)
            | flag_if(self.default_sample_duration.is_some(), DEFAULT_SAMPLE_DURATION)
            | flag_if(self.default_sample_size.is_some(), DEFAULT_SAMPLE_SIZE)
            | flag_if(self.default_sample_flags.is_some(), DEFAULT_SAMPLE_FLAGS)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrunSample {
    pub duration: Option<u32>,
    pub size: Option<u32>,
    pub flags: Option<u32>,
    pub composition_time_offset: Option<i32>,
}

impl TrunSample {
    /// Per-sample flag bits implied by which fields are present.
    pub fn field_flags(&self) -> u32 {
        use trun_flags::*;
        flag_if(self.duration.is_some(), SAMPLE_DURATION)
            | flag_if(self.size.is_some(), SAMPLE_SIZE)
            | flag_if(self.flags.is_some(), SAMPLE_FLAGS)
            | flag_if(self.composition_time_offset.is_some(), SAMPLE_COMPOSITION_TIME_OFFSET)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRun {
    pub data_offset: Option<i32>,
    pub first_sample_flags: Option<u32>,
    pub samples: Vec<TrunSample>,
}

impl TrackRun {
    /// Flag word for the whole run. Per-sample bits come from the first
    /// sample, so every sample in a run must have the same shape.
    pub fn flags(&self) -> u32 {
        use trun_flags::*;
        flag_if(self.data_offset.is_some(), DATA_OFFSET)
            | flag_if(self.first_sample_flags.is_some(), FIRST_SAMPLE_FLAGS)
            | self.samples.first().map_or(0, TrunSample::field_flags)
    }

    pub fn sample_count(&self) -> u32 {
        self.samples.len() as u32
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackFragment {
    pub header: TrackFragmentHeader,
    /// `tfdt` base media decode time.
    pub decode_time: Option<u64>,
    pub runs: Vec<TrackRun>,
}

impl TrackFragment {
    pub fn decode_time_in(&self, timescale: u32) -> Option<RuntimeFixedPoint> {
        self.decode_time.and_then(|t| time_in(t, timescale))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieFragment {
    pub sequence_number: u32,
    pub trafs: Vec<TrackFragment>,
}
