use std::collections::BTreeSet;

use bytes::Bytes;
use chrono::{DateTime, Utc};

/// A rational time value: `num / den` seconds, where `den` is the track timescale.
///
/// `num` is signed because decode/presentation timestamps can be re-based to a new
/// timeline origin (e.g. when the first frame of a segment doesn't start at zero).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MediaTimestamp {
    pub num: i64,
    pub den: u32,
}

impl MediaTimestamp {
    pub fn new(num: i64, den: u32) -> Self {
        assert!(den > 0, "MediaTimestamp denominator must be non-zero");
        Self { num, den }
    }

    pub fn zero(den: u32) -> Self {
        Self::new(0, den)
    }

    pub fn seconds(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// Rescale to a new timescale, rounding to the nearest tick.
    pub fn rescale(&self, new_den: u32) -> Self {
        if new_den == self.den {
            return *self;
        }
        let num = (self.num as i128 * new_den as i128) / self.den as i128;
        Self::new(num as i64, new_den)
    }

    pub fn checked_add(&self, other: &Self) -> Self {
        let rhs = other.rescale(self.den);
        Self::new(self.num + rhs.num, self.den)
    }
}

impl PartialOrd for MediaTimestamp {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MediaTimestamp {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        let lhs = self.num as i128 * other.den as i128;
        let rhs = other.num as i128 * self.den as i128;
        lhs.cmp(&rhs)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Codec {
    Aac,
    HeAac,
    HeAacV2,
    H264,
    H265,
}

impl Codec {
    pub fn is_audio(&self) -> bool {
        matches!(self, Codec::Aac | Codec::HeAac | Codec::HeAacV2)
    }

    pub fn is_video(&self) -> bool {
        !self.is_audio()
    }
}

/// One atomic unit of pre-encoded media handed to the segmenter.
#[derive(Clone, Debug)]
pub struct EncodedFrame {
    pub data: Bytes,
    pub timestamp: MediaTimestamp,
    pub duration: MediaTimestamp,
    pub is_keyframe: bool,
    pub codec: Codec,
}

impl EncodedFrame {
    pub fn end_timestamp(&self) -> MediaTimestamp {
        self.timestamp.checked_add(&self.duration)
    }
}

#[derive(Clone, Debug)]
pub struct LiveSegment {
    pub index: u64,
    pub filename: String,
    pub data: Bytes,
    pub duration: f64,
    pub timestamp: MediaTimestamp,
    pub frame_count: usize,
    pub is_independent: bool,
    pub codecs: BTreeSet<Codec>,
    pub is_gap: bool,
    pub program_date_time: Option<DateTime<Utc>>,
    pub discontinuity_before: bool,
}

impl LiveSegment {
    pub fn end_time_seconds(&self) -> f64 {
        self.timestamp.seconds() + self.duration
    }
}

#[derive(Clone, Debug)]
pub struct LivePartialSegment {
    pub index: u64,
    pub parent_index: u64,
    pub filename: String,
    pub data: Bytes,
    pub duration: f64,
    pub timestamp: MediaTimestamp,
    pub frame_count: usize,
    pub is_independent: bool,
    pub codecs: BTreeSet<Codec>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncryptionMethod {
    None,
    Aes128,
    SampleAes,
    SampleAesCtr,
}

#[derive(Clone, Debug)]
pub struct EncryptionKey {
    pub method: EncryptionMethod,
    pub key_bytes: [u8; 16],
    pub iv: [u8; 16],
    pub key_uri: String,
    pub key_format: Option<String>,
    pub key_format_versions: Option<String>,
    pub key_id: uuid::Uuid,
}

#[derive(Clone, Debug, Default)]
pub struct PlaylistMetadata {
    pub independent_segments: bool,
    pub start_offset: Option<f64>,
    pub start_precise: bool,
    pub custom_tags: Vec<String>,
}
