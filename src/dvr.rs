use std::collections::{BTreeSet, HashMap, VecDeque};

use chrono::{DateTime, Utc};

use crate::model::LiveSegment;

/// Pure value type tracking HLS media/discontinuity sequence numbers as segments are
/// added and evicted from a playlist window.
#[derive(Clone, Debug, Default)]
pub struct MediaSequenceTracker {
    pub media_sequence: u64,
    pub discontinuity_sequence: u64,
    pub total_added: u64,
    pub total_evicted: u64,
    pending_discontinuity: bool,
    discontinuity_indices: BTreeSet<u64>,
}

impl MediaSequenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn segment_added(&mut self, index: u64) {
        self.total_added += 1;
        if self.pending_discontinuity {
            self.discontinuity_indices.insert(index);
            self.pending_discontinuity = false;
        }
    }

    pub fn segment_evicted(&mut self, index: u64) {
        self.media_sequence += 1;
        self.total_evicted += 1;
        if self.discontinuity_indices.remove(&index) {
            self.discontinuity_sequence += 1;
        }
    }

    pub fn discontinuity_inserted(&mut self) {
        self.pending_discontinuity = true;
    }

    pub fn is_discontinuity(&self, index: u64) -> bool {
        self.discontinuity_indices.contains(&index)
    }
}

/// Time-windowed append-only store of live segments with offset-indexed random access.
pub struct DVRBuffer {
    window_duration: f64,
    segments: VecDeque<LiveSegment>,
    index_map: HashMap<u64, usize>,
}

impl DVRBuffer {
    pub fn new(window_duration: f64) -> Self {
        Self {
            window_duration,
            segments: VecDeque::new(),
            index_map: HashMap::new(),
        }
    }

    pub fn append(&mut self, segment: LiveSegment) {
        let pos = self.segments.len();
        self.index_map.insert(segment.index, pos);
        self.segments.push_back(segment);
    }

    /// Evicts every segment whose end time is strictly before `latest_ts - window_duration`,
    /// where `latest_ts` is the newest segment's *start* timestamp. A segment whose end
    /// time is exactly equal to the cutoff is retained.
    pub fn evict_expired(&mut self) -> Vec<LiveSegment> {
        let Some(newest) = self.segments.back() else {
            return Vec::new();
        };
        let cutoff = newest.timestamp.seconds() - self.window_duration;

        let mut evicted = Vec::new();
        while let Some(front) = self.segments.front() {
            if front.end_time_seconds() < cutoff {
                let seg = self.segments.pop_front().unwrap();
                self.index_map.remove(&seg.index);
                evicted.push(seg);
            } else {
                break;
            }
        }
        self.rebuild_index_map();
        evicted
    }

    fn rebuild_index_map(&mut self) {
        self.index_map.clear();
        for (pos, seg) in self.segments.iter().enumerate() {
            self.index_map.insert(seg.index, pos);
        }
    }

    pub fn segment(&self, index: u64) -> Option<&LiveSegment> {
        self.index_map.get(&index).map(|&pos| &self.segments[pos])
    }

    pub fn segments_from_offset(&self, offset_seconds: f64, max_count: Option<usize>) -> Vec<&LiveSegment> {
        let Some(newest) = self.segments.back() else {
            return Vec::new();
        };
        let target = newest.timestamp.seconds() + offset_seconds;
        let matching: Vec<&LiveSegment> = self
            .segments
            .iter()
            .filter(|s| s.end_time_seconds() > target)
            .collect();
        match max_count {
            Some(n) => matching.into_iter().take(n).collect(),
            None => matching,
        }
    }

    pub fn segments_in_date_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<&LiveSegment> {
        self.segments
            .iter()
            .filter(|s| match s.program_date_time {
                Some(pdt) => pdt >= from && pdt <= to,
                None => false,
            })
            .collect()
    }

    pub fn total_duration(&self) -> f64 {
        self.segments.iter().map(|s| s.duration).sum()
    }

    pub fn total_data_size(&self) -> usize {
        self.segments.iter().map(|s| s.data.len()).sum()
    }

    pub fn oldest(&self) -> Option<&LiveSegment> {
        self.segments.front()
    }

    pub fn newest(&self) -> Option<&LiveSegment> {
        self.segments.back()
    }

    pub fn count(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn all_segments(&self) -> impl Iterator<Item = &LiveSegment> {
        self.segments.iter()
    }

    pub fn clear(&mut self) {
        self.segments.clear();
        self.index_map.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MediaTimestamp;
    use bytes::Bytes;
    use std::collections::BTreeSet;

    fn seg(index: u64, start: f64, duration: f64) -> LiveSegment {
        LiveSegment {
            index,
            filename: format!("segment_{}.m4s", index),
            data: Bytes::new(),
            duration,
            timestamp: MediaTimestamp::new((start * 1000.0) as i64, 1000),
            frame_count: 1,
            is_independent: true,
            codecs: BTreeSet::new(),
            is_gap: false,
            program_date_time: None,
            discontinuity_before: false,
        }
    }

    #[test]
    fn dvr_window_trims_oldest() {
        let mut buf = DVRBuffer::new(15.0);
        for i in 0..5 {
            buf.append(seg(i, i as f64 * 6.0, 6.0));
            buf.evict_expired();
        }
        // timestamps 0,6,12,18,24 each 6s long; newest start=24, cutoff=24-15=9
        // only segment 0 (end=6 < 9) falls below cutoff; segment 1 (end=12) is retained
        assert!(buf.segment(0).is_none());
        assert!(buf.segment(1).is_some());
        assert!(buf.segment(2).is_some());
        assert_eq!(buf.count(), 4);
    }

    #[test]
    fn dvr_retains_segment_with_equal_end_time() {
        let mut buf = DVRBuffer::new(4.0);
        buf.append(seg(0, 0.0, 6.0)); // end = 6.0
        buf.append(seg(1, 10.0, 2.0)); // newest start = 10.0, cutoff = 10.0 - 4.0 = 6.0
        let evicted = buf.evict_expired();
        assert!(evicted.is_empty());
        assert_eq!(buf.count(), 2);
    }

    #[test]
    fn tracker_media_sequence_tracks_evictions() {
        let mut tracker = MediaSequenceTracker::new();
        for i in 0..4 {
            tracker.segment_added(i);
        }
        tracker.segment_evicted(0);
        tracker.segment_evicted(1);
        assert_eq!(tracker.media_sequence, 2);
        assert_eq!(tracker.total_evicted, 2);
    }

    #[test]
    fn discontinuity_sequence_increments_only_on_eviction_of_marked_segment() {
        let mut tracker = MediaSequenceTracker::new();
        tracker.segment_added(0);
        tracker.discontinuity_inserted();
        tracker.segment_added(1); // carries the discontinuity
        tracker.segment_added(2);
        tracker.segment_evicted(0);
        assert_eq!(tracker.discontinuity_sequence, 0);
        tracker.segment_evicted(1);
        assert_eq!(tracker.discontinuity_sequence, 1);
    }
}
