use crate::boxes::FourCC;

/// Typed view over the fixed box catalogue this codec understands.
///
/// Anything not in this list becomes `KnownBox::Unknown(fourcc)` and is
/// treated as an opaque leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownBox {
    // Synthetic root spanning the whole stream; never a real box.
    File,

    // File-level / top-level
    Ftyp,
    Moov,
    Moof,
    Mdat,
    Free,
    Skip,
    Mfra,

    // moov children
    Mvhd,
    Trak,
    Mvex,
    Udta,
    Meta,
    Ilst,

    // trak children
    Tkhd,
    Edts,
    Elst,
    Mdia,

    // mdia children
    Mdhd,
    Hdlr,
    Minf,

    // minf children
    Vmhd,
    Dinf,
    Dref,
    Url,
    Stbl,

    // stbl children
    Stsd,
    Avc1,
    Avcc,
    Hvcc,
    Stts,
    Stss,
    Ctts,
    Stsc,
    Stsz,
    Stco,
    Co64,

    // moof children
    Mfhd,
    Traf,
    Tfhd,
    Tfdt,
    Trun,

    Unknown(FourCC),
}

impl From<FourCC> for KnownBox {
    fn from(cc: FourCC) -> Self {
        match &cc.0 {
            b"file" => KnownBox::File,

            b"ftyp" => KnownBox::Ftyp,
            b"moov" => KnownBox::Moov,
            b"moof" => KnownBox::Moof,
            b"mdat" => KnownBox::Mdat,
            b"free" => KnownBox::Free,
            b"skip" => KnownBox::Skip,
            b"mfra" => KnownBox::Mfra,

            b"mvhd" => KnownBox::Mvhd,
            b"trak" => KnownBox::Trak,
            b"mvex" => KnownBox::Mvex,
            b"udta" => KnownBox::Udta,
            b"meta" => KnownBox::Meta,
            b"ilst" => KnownBox::Ilst,

            b"tkhd" => KnownBox::Tkhd,
            b"edts" => KnownBox::Edts,
            b"elst" => KnownBox::Elst,
            b"mdia" => KnownBox::Mdia,

            b"mdhd" => KnownBox::Mdhd,
            b"hdlr" => KnownBox::Hdlr,
            b"minf" => KnownBox::Minf,

            b"vmhd" => KnownBox::Vmhd,
            b"dinf" => KnownBox::Dinf,
            b"dref" => KnownBox::Dref,
            b"url " => KnownBox::Url,
            b"stbl" => KnownBox::Stbl,

            b"stsd" => KnownBox::Stsd,
            b"avc1" => KnownBox::Avc1,
            b"avcC" => KnownBox::Avcc,
            b"hvcC" => KnownBox::Hvcc,
            b"stts" => KnownBox::Stts,
            b"stss" => KnownBox::Stss,
            b"ctts" => KnownBox::Ctts,
            b"stsc" => KnownBox::Stsc,
            b"stsz" => KnownBox::Stsz,
            b"stco" => KnownBox::Stco,
            b"co64" => KnownBox::Co64,

            b"mfhd" => KnownBox::Mfhd,
            b"traf" => KnownBox::Traf,
            b"tfhd" => KnownBox::Tfhd,
            b"tfdt" => KnownBox::Tfdt,
            b"trun" => KnownBox::Trun,

            _ => KnownBox::Unknown(cc),
        }
    }
}

impl KnownBox {
    /// Does this box *contain* child boxes (container semantics)?
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            KnownBox::File
                | KnownBox::Moov
                | KnownBox::Moof
                | KnownBox::Trak
                | KnownBox::Traf
                | KnownBox::Mfra
                | KnownBox::Mvex
                | KnownBox::Mdia
                | KnownBox::Minf
                | KnownBox::Stbl
                | KnownBox::Stsd
                | KnownBox::Dinf
                | KnownBox::Dref
                | KnownBox::Udta
                | KnownBox::Meta
                | KnownBox::Ilst
                | KnownBox::Edts
                | KnownBox::Avc1
        )
    }

    /// Payload bytes that precede the first child of a container.
    pub fn child_offset(&self) -> u64 {
        match self {
            // version/flags + entry count
            KnownBox::Stsd | KnownBox::Dref => 8,
            // version/flags
            KnownBox::Meta => 4,
            // VisualSampleEntry fields up to and including pre_defined = -1.
            // Matches common encoder output; not checked against every muxer.
            KnownBox::Avc1 => 78,
            _ => 0,
        }
    }

    pub fn full_name(&self) -> &'static str {
        match self {
            KnownBox::File => "File (pseudo atom)",
            KnownBox::Ftyp => "File Type Box",
            KnownBox::Moov => "Movie Box",
            KnownBox::Moof => "Movie Fragment Box",
            KnownBox::Mdat => "Media Data Box",
            KnownBox::Free => "Free Space Box",
            KnownBox::Skip => "Free Space Box",
            KnownBox::Mfra => "Movie Fragment Random Access Box",
            KnownBox::Mvhd => "Movie Header Box",
            KnownBox::Trak => "Track Box",
            KnownBox::Mvex => "Movie Extends Box",
            KnownBox::Udta => "User Data Box",
            KnownBox::Meta => "Meta Box",
            KnownBox::Ilst => "Metadata Item List",
            KnownBox::Tkhd => "Track Header Box",
            KnownBox::Edts => "Edit Box",
            KnownBox::Elst => "Edit List Box",
            KnownBox::Mdia => "Media Box",
            KnownBox::Mdhd => "Media Header Box",
            KnownBox::Hdlr => "Handler Reference Box",
            KnownBox::Minf => "Media Information Box",
            KnownBox::Vmhd => "Video Media Header Box",
            KnownBox::Dinf => "Data Information Box",
            KnownBox::Dref => "Data Reference Box",
            KnownBox::Url => "Data Entry URL Box",
            KnownBox::Stbl => "Sample Table Box",
            KnownBox::Stsd => "Sample Description Box",
            KnownBox::Avc1 => "AVC Sample Entry",
            KnownBox::Avcc => "AVC Configuration Box",
            KnownBox::Hvcc => "HEVC Configuration Box",
            KnownBox::Stts => "Decoding Time to Sample Box",
            KnownBox::Stss => "Sync Sample Box",
            KnownBox::Ctts => "Composition Time to Sample Box",
            KnownBox::Stsc => "Sample To Chunk Box",
            KnownBox::Stsz => "Sample Size Box",
            KnownBox::Stco => "Chunk Offset Box",
            KnownBox::Co64 => "Chunk Large Offset Box",
            KnownBox::Mfhd => "Movie Fragment Header Box",
            KnownBox::Traf => "Track Fragment Box",
            KnownBox::Tfhd => "Track Fragment Header Box",
            KnownBox::Tfdt => "Track Fragment Decode Time Box",
            KnownBox::Trun => "Track Run Box",
            KnownBox::Unknown(_) => "Unknown Box",
        }
    }
}
