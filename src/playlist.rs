use std::collections::VecDeque;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::debug;

use crate::dvr::{DVRBuffer, MediaSequenceTracker};
use crate::error::PlaylistError;
use crate::model::{LiveSegment, PlaylistMetadata};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaylistType {
    Event,
    Vod,
}

/// Stateless M3U8 renderer. Never reads wall-clock time; all timestamps are passed in.
pub struct PlaylistRenderer;

pub struct RenderContext<'a> {
    pub segments: &'a [&'a LiveSegment],
    pub media_sequence: u64,
    pub discontinuity_sequence: u64,
    pub metadata: &'a PlaylistMetadata,
    pub target_duration: Option<u64>,
    pub playlist_type: Option<PlaylistType>,
    pub has_end_list: bool,
    pub version: u8,
    pub init_segment_uri: Option<&'a str>,
}

impl PlaylistRenderer {
    pub fn render(ctx: &RenderContext) -> String {
        let mut out = String::new();
        out.push_str("#EXTM3U\n");
        out.push_str(&format!("#EXT-X-VERSION:{}\n", ctx.version));

        if ctx.metadata.independent_segments {
            out.push_str("#EXT-X-INDEPENDENT-SEGMENTS\n");
        }

        if let Some(offset) = ctx.metadata.start_offset {
            if ctx.metadata.start_precise {
                out.push_str(&format!(
                    "#EXT-X-START:TIME-OFFSET={},PRECISE=YES\n",
                    format_duration(offset)
                ));
            } else {
                out.push_str(&format!(
                    "#EXT-X-START:TIME-OFFSET={}\n",
                    format_duration(offset)
                ));
            }
        }

        // ceil(max segment duration) is primary; the configured `target_duration` is
        // only used as a fallback when the segment list is empty.
        let target_duration = ctx
            .segments
            .iter()
            .map(|s| s.duration.ceil() as u64)
            .max()
            .or(ctx.target_duration)
            .unwrap_or(0);
        out.push_str(&format!("#EXT-X-TARGETDURATION:{}\n", target_duration));
        out.push_str(&format!("#EXT-X-MEDIA-SEQUENCE:{}\n", ctx.media_sequence));

        if ctx.discontinuity_sequence != 0 {
            out.push_str(&format!(
                "#EXT-X-DISCONTINUITY-SEQUENCE:{}\n",
                ctx.discontinuity_sequence
            ));
        }

        match ctx.playlist_type {
            Some(PlaylistType::Event) => out.push_str("#EXT-X-PLAYLIST-TYPE:EVENT\n"),
            Some(PlaylistType::Vod) => out.push_str("#EXT-X-PLAYLIST-TYPE:VOD\n"),
            None => {}
        }

        if let Some(uri) = ctx.init_segment_uri {
            out.push_str(&format!("#EXT-X-MAP:URI=\"{}\"\n", uri));
        }

        for tag in &ctx.metadata.custom_tags {
            out.push_str(tag);
            out.push('\n');
        }

        for segment in ctx.segments {
            if segment.discontinuity_before {
                out.push_str("#EXT-X-DISCONTINUITY\n");
            }
            if let Some(pdt) = segment.program_date_time {
                out.push_str(&format!(
                    "#EXT-X-PROGRAM-DATE-TIME:{}\n",
                    format_program_date_time(pdt)
                ));
            }
            if segment.is_gap {
                out.push_str("#EXT-X-GAP\n");
            }
            out.push_str(&format!("#EXTINF:{},\n", format_duration(segment.duration)));
            out.push_str(&segment.filename);
            out.push('\n');
        }

        if ctx.has_end_list {
            out.push_str("#EXT-X-ENDLIST\n");
        }

        out
    }
}

fn format_duration(seconds: f64) -> String {
    let mut s = format!("{:.3}", seconds);
    while s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.push('0');
    }
    s
}

fn format_program_date_time(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Keeps the last `window_size` segments; evicts oldest on overflow.
pub struct SlidingWindowPlaylist {
    window_size: usize,
    target_duration: Option<u64>,
    version: u8,
    metadata: PlaylistMetadata,
    segments: VecDeque<LiveSegment>,
    tracker: MediaSequenceTracker,
    ended: bool,
}

impl SlidingWindowPlaylist {
    pub fn new(window_size: usize, target_duration: Option<u64>, version: u8) -> Self {
        Self {
            window_size,
            target_duration,
            version,
            metadata: PlaylistMetadata::default(),
            segments: VecDeque::new(),
            tracker: MediaSequenceTracker::new(),
            ended: false,
        }
    }

    pub fn metadata_mut(&mut self) -> &mut PlaylistMetadata {
        &mut self.metadata
    }

    pub fn add_segment(&mut self, mut segment: LiveSegment) -> Result<(), PlaylistError> {
        if self.ended {
            return Err(PlaylistError::StreamEnded);
        }
        self.tracker.segment_added(segment.index);
        segment.discontinuity_before = self.tracker.is_discontinuity(segment.index);
        self.segments.push_back(segment);
        while self.segments.len() > self.window_size.max(1) {
            let evicted = self.segments.pop_front().unwrap();
            self.tracker.segment_evicted(evicted.index);
            debug!(index = evicted.index, "evicted from sliding window");
        }
        Ok(())
    }

    pub fn insert_discontinuity(&mut self) {
        self.tracker.discontinuity_inserted();
    }

    pub fn end_stream(&mut self) -> String {
        self.ended = true;
        self.render_playlist()
    }

    pub fn render_playlist(&self) -> String {
        let refs: Vec<&LiveSegment> = self.segments.iter().collect();
        let ctx = RenderContext {
            segments: &refs,
            media_sequence: self.tracker.media_sequence,
            discontinuity_sequence: self.tracker.discontinuity_sequence,
            metadata: &self.metadata,
            target_duration: self.target_duration,
            playlist_type: None,
            has_end_list: self.ended,
            version: self.version,
            init_segment_uri: None,
        };
        PlaylistRenderer::render(&ctx)
    }
}

/// Keeps segments within a DVR time window; supports offset-based rendering.
pub struct DVRPlaylist {
    target_duration: Option<u64>,
    version: u8,
    metadata: PlaylistMetadata,
    buffer: DVRBuffer,
    tracker: MediaSequenceTracker,
    init_segment_uri: Option<String>,
    ended: bool,
}

impl DVRPlaylist {
    pub fn new(
        dvr_window_duration: f64,
        target_duration: Option<u64>,
        version: u8,
        init_segment_uri: Option<String>,
    ) -> Self {
        Self {
            target_duration,
            version,
            metadata: PlaylistMetadata::default(),
            buffer: DVRBuffer::new(dvr_window_duration),
            tracker: MediaSequenceTracker::new(),
            init_segment_uri,
            ended: false,
        }
    }

    pub fn metadata_mut(&mut self) -> &mut PlaylistMetadata {
        &mut self.metadata
    }

    pub fn add_segment(&mut self, mut segment: LiveSegment) -> Result<(), PlaylistError> {
        if self.ended {
            return Err(PlaylistError::StreamEnded);
        }
        self.tracker.segment_added(segment.index);
        segment.discontinuity_before = self.tracker.is_discontinuity(segment.index);
        self.buffer.append(segment);
        for evicted in self.buffer.evict_expired() {
            self.tracker.segment_evicted(evicted.index);
        }
        Ok(())
    }

    pub fn insert_discontinuity(&mut self) {
        self.tracker.discontinuity_inserted();
    }

    pub fn end_stream(&mut self) -> String {
        self.ended = true;
        self.render_playlist()
    }

    pub fn render_playlist(&self) -> String {
        let refs: Vec<&LiveSegment> = self.buffer.all_segments().collect();
        self.render(&refs)
    }

    pub fn render_playlist_from_offset(&self, offset_seconds: f64) -> String {
        let refs = self.buffer.segments_from_offset(offset_seconds, None);
        self.render(&refs)
    }

    fn render(&self, refs: &[&LiveSegment]) -> String {
        let ctx = RenderContext {
            segments: refs,
            media_sequence: self.tracker.media_sequence,
            discontinuity_sequence: self.tracker.discontinuity_sequence,
            metadata: &self.metadata,
            target_duration: self.target_duration,
            playlist_type: None,
            has_end_list: self.ended,
            version: self.version,
            init_segment_uri: self.init_segment_uri.as_deref(),
        };
        PlaylistRenderer::render(&ctx)
    }
}

#[cfg(test)]
mod sliding_window_tests {
    use super::*;
    use bytes::Bytes;
    use std::collections::BTreeSet;

    fn seg(index: u64, start: f64, duration: f64) -> LiveSegment {
        LiveSegment {
            index,
            filename: format!("segment_{}.m4s", index),
            data: Bytes::new(),
            duration,
            timestamp: crate::model::MediaTimestamp::new((start * 1000.0) as i64, 1000),
            frame_count: 1,
            is_independent: true,
            codecs: BTreeSet::new(),
            is_gap: false,
            program_date_time: None,
            discontinuity_before: false,
        }
    }

    #[test]
    fn sliding_window_keeps_last_n_and_advances_media_sequence() {
        let mut playlist = SlidingWindowPlaylist::new(3, None, 7);
        for i in 0..5u64 {
            playlist.add_segment(seg(i, i as f64 * 6.0, 6.0)).unwrap();
        }
        let rendered = playlist.render_playlist();
        assert!(rendered.contains("#EXT-X-MEDIA-SEQUENCE:2"));
        assert!(rendered.contains("#EXT-X-TARGETDURATION:6"));
        assert!(!rendered.contains("segment_0.m4s"));
        assert!(!rendered.contains("segment_1.m4s"));
        assert!(rendered.contains("segment_4.m4s"));
    }

    #[test]
    fn add_after_end_stream_fails() {
        let mut playlist = SlidingWindowPlaylist::new(3, None, 7);
        playlist.add_segment(seg(0, 0.0, 6.0)).unwrap();
        playlist.end_stream();
        let err = playlist.add_segment(seg(1, 6.0, 6.0));
        assert!(matches!(err, Err(PlaylistError::StreamEnded)));
    }

    #[test]
    fn discontinuity_tag_renders_on_the_segment_that_carries_it() {
        let mut playlist = SlidingWindowPlaylist::new(2, None, 7);
        playlist.add_segment(seg(0, 0.0, 6.0)).unwrap();
        playlist.insert_discontinuity();
        playlist.add_segment(seg(1, 6.0, 6.0)).unwrap();
        let rendered = playlist.render_playlist();
        let disc_pos = rendered.find("#EXT-X-DISCONTINUITY\n").expect("tag must render");
        let uri_pos = rendered.find("segment_1.m4s").expect("segment_1 must be in window");
        assert!(disc_pos < uri_pos, "discontinuity tag must precede segment_1's URI");
        assert!(!rendered.contains("segment_0.m4s\n#EXT-X-DISCONTINUITY"));
    }

    #[test]
    fn discontinuity_sequence_surfaces_after_eviction() {
        let mut playlist = SlidingWindowPlaylist::new(2, None, 7);
        playlist.add_segment(seg(0, 0.0, 6.0)).unwrap();
        playlist.insert_discontinuity();
        playlist.add_segment(seg(1, 6.0, 6.0)).unwrap();
        playlist.add_segment(seg(2, 12.0, 6.0)).unwrap();
        playlist.add_segment(seg(3, 18.0, 6.0)).unwrap();
        let rendered = playlist.render_playlist();
        assert!(rendered.contains("#EXT-X-DISCONTINUITY-SEQUENCE:1"));
        // seg1 (the discontinuity-carrying segment) has since been evicted out of the window
        assert!(!rendered.contains("segment_1.m4s"));
    }
}

/// Append-only playlist; never evicts. Always renders as EVENT.
pub struct EventPlaylist {
    target_duration: Option<u64>,
    version: u8,
    metadata: PlaylistMetadata,
    segments: Vec<LiveSegment>,
    ended: bool,
}

impl EventPlaylist {
    pub fn new(target_duration: Option<u64>, version: u8) -> Self {
        Self {
            target_duration,
            version,
            metadata: PlaylistMetadata::default(),
            segments: Vec::new(),
            ended: false,
        }
    }

    pub fn metadata_mut(&mut self) -> &mut PlaylistMetadata {
        &mut self.metadata
    }

    pub fn add_segment(&mut self, segment: LiveSegment) -> Result<(), PlaylistError> {
        if self.ended {
            return Err(PlaylistError::StreamEnded);
        }
        self.segments.push(segment);
        Ok(())
    }

    pub fn end_stream(&mut self) -> String {
        self.ended = true;
        self.render_playlist()
    }

    pub fn render_playlist(&self) -> String {
        let refs: Vec<&LiveSegment> = self.segments.iter().collect();
        let ctx = RenderContext {
            segments: &refs,
            media_sequence: 0,
            discontinuity_sequence: 0,
            metadata: &self.metadata,
            target_duration: self.target_duration,
            playlist_type: Some(PlaylistType::Event),
            has_end_list: self.ended,
            version: self.version,
            init_segment_uri: None,
        };
        PlaylistRenderer::render(&ctx)
    }
}
