//! Codec-specific classification of NAL unit type codes.
//!
//! Nothing here looks at box structure: callers hand in the first byte(s) of
//! a NAL unit they already located (e.g. via
//! [`crate::parser::read_nalu_at`]) together with the codec kind.

use crate::boxes::BoxRange;
use crate::util::from_bits;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NaluKind {
    H264,
    H265,
}

/// Decode the type code from the start of a NAL unit.
///
/// H.264 stores it in the low 5 bits of the first byte, H.265 in 6 bits
/// starting at bit 1. Returns `None` for an empty slice.
pub fn nalu_type(kind: NaluKind, data: &[u8]) -> Option<u8> {
    match kind {
        NaluKind::H264 => data.first().map(|b| b & 0x1f),
        NaluKind::H265 => from_bits(data, 1, 6).map(|v| v as u8),
    }
}

pub fn is_vcl(kind: NaluKind, t: u8) -> bool {
    match kind {
        NaluKind::H264 => (1..=5).contains(&t),
        NaluKind::H265 => t <= 28,
    }
}

pub fn is_keyframe(kind: NaluKind, t: u8) -> bool {
    match kind {
        NaluKind::H264 => t == 5,
        // BLA / IDR / CRA
        NaluKind::H265 => (16..=21).contains(&t),
    }
}

pub fn is_parameter_set(kind: NaluKind, t: u8) -> bool {
    match kind {
        NaluKind::H264 => (7..=8).contains(&t),
        // VPS / SPS / PPS
        NaluKind::H265 => (32..=34).contains(&t),
    }
}

pub fn type_name(kind: NaluKind, t: u8) -> &'static str {
    match kind {
        NaluKind::H264 => h264_type_name(t),
        NaluKind::H265 => h265_type_name(t),
    }
}

fn h264_type_name(t: u8) -> &'static str {
    match t {
        0 => "unspecified",
        1 => "p-frame",
        2 => "coded slice a",
        3 => "coded slice b",
        4 => "coded slice c",
        5 => "i-frame",
        6 => "sei",
        7 => "sps",
        8 => "pps",
        9 => "access unit delimiter",
        10 => "end of sequence",
        11 => "end of stream",
        12 => "filler",
        13 => "sps extension",
        14 => "prefix",
        15 => "subset sps",
        16..=18 => "reserved",
        19 => "coded slice of an auxiliary coded picture without partitioning",
        20 => "coded slice extension",
        21 => "coded slice extension for depth view components",
        22 | 23 => "reserved",
        // RTP aggregation / fragmentation
        24 => "stap-a",
        25 => "stap-b",
        26 => "mtap16",
        27 => "mtap24",
        28 => "fu-a",
        29 => "fu-b",
        30 | 31 => "unspecified",
        _ => "???",
    }
}

fn h265_type_name(t: u8) -> &'static str {
    match t {
        0 => "TRAIL_N",
        1 => "TRAIL_R",
        2 => "TSA_N",
        3 => "TSA_R",
        4 => "STSA_N",
        5 => "STSA_R",
        6 => "RADL_N",
        7 => "RADL_R",
        8 => "RASL_N",
        9 => "RASL_R",
        10 => "RSV_VCL_N10",
        11 => "RSV_VCL_R11",
        12 => "RSV_VCL_N12",
        13 => "RSV_VCL_R13",
        14 => "RSV_VCL_N14",
        15 => "RSV_VCL_R15",
        16 => "BLA_W_LP",
        17 => "BLA_W_RADL",
        18 => "BLA_N_LP",
        19 => "IDR_W_RADL",
        20 => "IDR_N_LP",
        21 => "CRA_NUT",
        22 => "RSV_IRAP_VCL22",
        23 => "RSV_IRAP_VCL23",
        24 => "RSV_VCL24",
        25 => "RSV_VCL25",
        26 => "RSV_VCL26",
        27 => "RSV_VCL27",
        28 => "RSV_VCL28",
        29 => "RSV_VCL29",
        30 => "RSV_VCL30",
        31 => "RSV_VCL31",
        32 => "VPS_NUT",
        33 => "SPS_NUT",
        34 => "PPS_NUT",
        35 => "AUD_NUT",
        36 => "EOS_NUT",
        37 => "EOB_NUT",
        38 => "FD_NUT",
        39 => "PREFIX_SEI_NUT",
        40 => "SUFFIX_SEI_NUT",
        41..=47 => "RSV_NVCL",
        // RTP (RFC 7798)
        48 => "AP",
        49 => "FU",
        50 => "PACI",
        51..=64 => "UNSPEC",
        _ => "??",
    }
}

/// A length-prefixed NAL unit located in a stream, tagged with its type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nalu {
    pub range: BoxRange,
    pub kind: NaluKind,
    pub typ: u8,
}

impl Nalu {
    /// `header` is the first payload byte; for H.265 the type sits entirely
    /// inside it.
    pub fn new(range: BoxRange, header: u8, kind: NaluKind) -> Self {
        let typ = nalu_type(kind, &[header]).unwrap_or(0);
        Nalu { range, kind, typ }
    }

    pub fn describe_type(&self) -> &'static str { type_name(self.kind, self.typ) }
    pub fn is_vcl(&self) -> bool { is_vcl(self.kind, self.typ) }
    pub fn is_keyframe(&self) -> bool { is_keyframe(self.kind, self.typ) }
    pub fn is_parameter_set(&self) -> bool { is_parameter_set(self.kind, self.typ) }
}
