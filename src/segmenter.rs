use std::collections::VecDeque;
use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::cmaf::CMAFWriter;
use crate::error::SegmenterError;
use crate::model::{EncodedFrame, LiveSegment, MediaTimestamp};

#[derive(Clone, Debug)]
pub struct SegmenterConfig {
    pub track_id: u32,
    pub timescale: u32,
    pub target_duration: f64,
    pub max_duration: f64,
    pub keyframe_aligned: bool,
    pub ring_buffer_capacity: usize,
    pub filename_pattern: String,
    pub wall_clock_origin: Option<DateTime<Utc>>,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            track_id: 1,
            timescale: 90_000,
            target_duration: 6.0,
            max_duration: 9.0,
            keyframe_aligned: true,
            ring_buffer_capacity: 10,
            filename_pattern: "segment_{}.m4s".to_string(),
            wall_clock_origin: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Active,
    Finishing,
    Closed,
}

/// Why `decide_cut` fired, so `emit_pending` can tell a target-duration cut (independent
/// iff keyframe-or-audio) apart from a max-duration force-cut (independent iff keyframe).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CutReason {
    TargetDuration,
    ForceCut,
}

/// Frame-driven segment boundary decider. Owns its state; callers that need to share an
/// instance across tasks wrap it in `Arc<tokio::sync::Mutex<_>>` themselves.
pub struct IncrementalSegmenter {
    config: SegmenterConfig,
    state: State,
    pending: Vec<EncodedFrame>,
    last_timestamp: Option<MediaTimestamp>,
    next_index: u64,
    total_emitted: u64,
    ring_buffer: VecDeque<LiveSegment>,
    sender: tokio::sync::mpsc::Sender<LiveSegment>,
    receiver: Option<tokio::sync::mpsc::Receiver<LiveSegment>>,
}

impl IncrementalSegmenter {
    pub fn new(config: SegmenterConfig, start_index: u64) -> Self {
        let (sender, receiver) = tokio::sync::mpsc::channel(32);
        Self {
            config,
            state: State::Active,
            pending: Vec::new(),
            last_timestamp: None,
            next_index: start_index,
            total_emitted: 0,
            ring_buffer: VecDeque::new(),
            sender,
            receiver: Some(receiver),
        }
    }

    /// Takes ownership of the consumer half. May only be called once.
    pub fn segments(&mut self) -> tokio::sync::mpsc::Receiver<LiveSegment> {
        self.receiver
            .take()
            .expect("segments() consumer already taken")
    }

    pub fn recent_segments(&self) -> impl Iterator<Item = &LiveSegment> {
        self.ring_buffer.iter()
    }

    pub fn buffered_segment_count(&self) -> usize {
        self.ring_buffer.len()
    }

    pub fn ingest(&mut self, frame: EncodedFrame) -> Result<(), SegmenterError> {
        if self.state == State::Closed {
            return Err(SegmenterError::NotActive);
        }

        if let Some(last) = self.last_timestamp {
            if frame.timestamp < last {
                return Err(SegmenterError::NonMonotonicTimestamp {
                    last,
                    got: frame.timestamp,
                });
            }
        }

        if let Some(reason) = self.decide_cut(&frame) {
            self.emit_pending(reason == CutReason::TargetDuration);
        }

        self.last_timestamp = Some(frame.timestamp);
        self.pending.push(frame);
        Ok(())
    }

    pub fn force_segment_boundary(&mut self) -> Result<(), SegmenterError> {
        if self.pending.is_empty() {
            return Err(SegmenterError::NoFramesPending);
        }
        self.emit_pending(false);
        Ok(())
    }

    pub fn finish(&mut self) -> Option<LiveSegment> {
        if self.state == State::Closed {
            return None;
        }
        self.state = State::Finishing;
        let last = if !self.pending.is_empty() {
            Some(self.emit_pending(false))
        } else {
            None
        };
        self.state = State::Closed;
        info!(total_emitted = self.total_emitted, "segmenter closed");
        last
    }

    /// `last_ts - first_ts + last_duration` over the currently buffered (not yet
    /// appended) frames, per the boundary-decision formula.
    fn pending_duration(&self) -> f64 {
        match (self.pending.first(), self.pending.last()) {
            (Some(first), Some(last)) => {
                last.end_timestamp().seconds() - first.timestamp.seconds()
            }
            _ => 0.0,
        }
    }

    fn decide_cut(&self, frame: &EncodedFrame) -> Option<CutReason> {
        if self.pending.is_empty() {
            return None;
        }
        let pending_duration = self.pending_duration();

        if self.config.keyframe_aligned {
            if frame.is_keyframe && pending_duration >= self.config.target_duration {
                return Some(CutReason::TargetDuration);
            }
        } else if pending_duration >= self.config.target_duration {
            return Some(CutReason::TargetDuration);
        }

        if pending_duration >= self.config.max_duration {
            return Some(CutReason::ForceCut);
        }

        None
    }

    fn emit_pending(&mut self, is_target_duration_cut: bool) -> LiveSegment {
        let frames = std::mem::take(&mut self.pending);
        let first = frames.first().expect("emit_pending called with no frames");

        let is_independent = if is_target_duration_cut {
            first.is_keyframe || first.codec.is_audio()
        } else {
            // force-cut / force_segment_boundary / finish: independent only if it
            // happens to start on a keyframe, never via the audio-only exception.
            first.is_keyframe
        };

        let duration: f64 = frames
            .iter()
            .map(|f| f.duration.seconds())
            .sum();

        let codecs: BTreeSet<_> = frames.iter().map(|f| f.codec).collect();
        let frame_count = frames.len();
        let timestamp = first.timestamp;

        let index = self.next_index;
        self.next_index += 1;
        self.total_emitted += 1;

        let data = CMAFWriter::build_media_segment(
            &frames,
            self.config.track_id,
            index as u32,
            self.config.timescale,
        );

        let program_date_time = self
            .config
            .wall_clock_origin
            .map(|origin| origin + chrono::Duration::milliseconds((timestamp.seconds() * 1000.0) as i64));

        let filename = self.config.filename_pattern.replace("{}", &index.to_string());

        let segment = LiveSegment {
            index,
            filename,
            data,
            duration,
            timestamp,
            frame_count,
            is_independent,
            codecs,
            is_gap: false,
            program_date_time,
            discontinuity_before: false,
        };

        debug!(index, duration, frame_count, "segment emitted");

        if self.config.ring_buffer_capacity > 0 {
            self.ring_buffer.push_back(segment.clone());
            if self.ring_buffer.len() > self.config.ring_buffer_capacity {
                self.ring_buffer.pop_front();
            }
        }

        if let Err(e) = self.sender.try_send(segment.clone()) {
            warn!(error = %e, "segment consumer is not keeping up or has been dropped");
        }

        segment
    }
}
