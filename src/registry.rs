use crate::boxes::{Atom, FourCC};
use crate::decode::*;
use crate::parser::Result;
use crate::records::*;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{Read, Seek};

/// Object-safe stand-in for `Read + Seek`, so decoders can sit behind `dyn`.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek + ?Sized> ReadSeek for T {}

/// A typed record produced by a registered decoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Record {
    FileType(FileType),
    Movie(Movie),
    MovieHeader(MovieHeader),
    Track(Track),
    TrackHeader(TrackHeader),
    Edits(Vec<EditEntry>),
    Media(Media),
    MediaHeader(MediaHeader),
    Handler(Handler),
    MediaInformation(MediaInformation),
    VideoMediaHeader(VideoMediaHeader),
    DataReference(DataReference),
    SampleTable(SampleTable),
    SampleDescription(SampleDescription),
    VisualSampleEntry(VisualSampleEntry),
    AvcDecoderConfig(AvcDecoderConfig),
    /// `stts` / `ctts` runs.
    TimeToSample(Vec<TtsRun>),
    SyncSamples(Vec<u32>),
    SampleToChunk(Vec<SampleToChunk>),
    SampleSizes(Vec<u32>),
    ChunkOffsets(Vec<u64>),
    MovieFragment(MovieFragment),
    SequenceNumber(u32),
    TrackFragment(TrackFragment),
    TrackFragmentHeader(TrackFragmentHeader),
    DecodeTime(u64),
    TrackRun(TrackRun),
}

/// Decodes the box at a located atom into a [`Record`].
///
/// Any `Fn(&mut dyn ReadSeek, &Atom) -> Result<Record>` is a decoder.
pub trait BoxDecoder: Send + Sync {
    fn decode(&self, r: &mut dyn ReadSeek, atom: &Atom) -> Result<Record>;
}

impl<F> BoxDecoder for F
where
    F: Fn(&mut dyn ReadSeek, &Atom) -> Result<Record> + Send + Sync,
{
    fn decode(&self, r: &mut dyn ReadSeek, atom: &Atom) -> Result<Record> {
        self(r, atom)
    }
}

/// Registry of decoders keyed by box type.
///
/// The registry is immutable once constructed; use [`Registry::with_decoder`]
/// to build it fluently.
pub struct Registry {
    map: HashMap<FourCC, BoxDecoderEntry>,
}

struct BoxDecoderEntry {
    inner: Box<dyn BoxDecoder>,
    name: String,
}

impl Registry {
    pub fn new() -> Self {
        Self { map: HashMap::new() }
    }

    /// Return a new registry with the given decoder added.
    ///
    /// `name` is human-readable and used only for logging.
    pub fn with_decoder(mut self, key: FourCC, name: &str, dec: Box<dyn BoxDecoder>) -> Self {
        self.map.insert(key, BoxDecoderEntry { inner: dec, name: name.to_string() });
        self
    }

    pub fn contains(&self, key: &FourCC) -> bool {
        self.map.contains_key(key)
    }

    /// Decode `atom` with the decoder registered for its type.
    ///
    /// Returns `None` if no decoder exists for that type.
    pub fn decode(&self, r: &mut dyn ReadSeek, atom: &Atom) -> Option<Result<Record>> {
        self.map.get(&atom.typ).map(|d| {
            debug!("decoding '{}' at {:#x} as {}", atom.typ, atom.header_offset(), d.name);
            d.inner.decode(r, atom)
        })
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------- Default registry ----------

macro_rules! decoder {
    ($read:ident => $variant:ident) => {{
        let dec: Box<dyn BoxDecoder> =
            Box::new(|r: &mut dyn ReadSeek, a: &Atom| -> Result<Record> {
                Ok(Record::$variant($read(r, a)?))
            });
        dec
    }};
}

/// Every typed decoder this crate ships, keyed by the tag it reads.
pub fn default_registry() -> Registry {
    let entries: Vec<(&[u8; 4], &str, Box<dyn BoxDecoder>)> = vec![
        (b"ftyp", "file type", decoder!(read_ftyp => FileType)),
        (b"moov", "movie", decoder!(read_moov => Movie)),
        (b"mvhd", "movie header", decoder!(read_mvhd => MovieHeader)),
        (b"trak", "track", decoder!(read_trak => Track)),
        (b"tkhd", "track header", decoder!(read_tkhd => TrackHeader)),
        (b"edts", "edit list container", decoder!(read_edts => Edits)),
        (b"elst", "edit list", decoder!(read_elst => Edits)),
        (b"mdia", "media", decoder!(read_mdia => Media)),
        (b"mdhd", "media header", decoder!(read_mdhd => MediaHeader)),
        (b"hdlr", "handler", decoder!(read_hdlr => Handler)),
        (b"minf", "media information", decoder!(read_minf => MediaInformation)),
        (b"vmhd", "video media header", decoder!(read_vmhd => VideoMediaHeader)),
        (b"dinf", "data information", decoder!(read_dinf => DataReference)),
        (b"dref", "data reference", decoder!(read_dref => DataReference)),
        (b"stbl", "sample table", decoder!(read_stbl => SampleTable)),
        (b"stsd", "sample description", decoder!(read_stsd => SampleDescription)),
        (b"avc1", "avc sample entry", decoder!(read_avc1 => VisualSampleEntry)),
        (b"avcC", "avc configuration", decoder!(read_avcc => AvcDecoderConfig)),
        (b"stts", "decoding time to sample", decoder!(read_stts_runs => TimeToSample)),
        (b"ctts", "composition time to sample", decoder!(read_ctts_runs => TimeToSample)),
        (b"stss", "sync samples", decoder!(read_stss => SyncSamples)),
        (b"stsc", "sample to chunk", decoder!(read_stsc => SampleToChunk)),
        (b"stsz", "sample sizes", decoder!(read_stsz => SampleSizes)),
        (b"stco", "chunk offsets", decoder!(read_co64 => ChunkOffsets)),
        (b"co64", "64-bit chunk offsets", decoder!(read_co64 => ChunkOffsets)),
        (b"moof", "movie fragment", decoder!(read_moof => MovieFragment)),
        (b"mfhd", "movie fragment header", decoder!(read_mfhd => SequenceNumber)),
        (b"traf", "track fragment", decoder!(read_traf => TrackFragment)),
        (b"tfhd", "track fragment header", decoder!(read_tfhd => TrackFragmentHeader)),
        (b"tfdt", "track fragment decode time", decoder!(read_tfdt => DecodeTime)),
        (b"trun", "track run", decoder!(read_trun => TrackRun)),
    ];
    entries
        .into_iter()
        .fold(Registry::new(), |reg, (tag, name, dec)| reg.with_decoder(FourCC(*tag), name, dec))
}
