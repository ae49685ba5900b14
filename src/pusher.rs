use async_trait::async_trait;
use bytes::Bytes;

use crate::error::PushError;
use crate::model::{LivePartialSegment, LiveSegment};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PushStats {
    pub segments_pushed: u64,
    pub partials_pushed: u64,
    pub playlists_pushed: u64,
    pub bytes_pushed: u64,
}

/// Contract implemented by each push transport (HTTP, RTMP, SRT, Icecast, ...). Those
/// transports live outside this crate; this trait is the seam they implement against.
#[async_trait]
pub trait SegmentPusher: Send + Sync {
    async fn connect(&mut self) -> Result<(), PushError>;
    fn disconnect(&mut self);
    async fn push_segment(&mut self, segment: &LiveSegment) -> Result<(), PushError>;
    async fn push_partial(&mut self, partial: &LivePartialSegment) -> Result<(), PushError>;
    async fn push_playlist(&mut self, m3u8: &str, filename: &str) -> Result<(), PushError>;
    async fn push_init_segment(&mut self, bytes: &Bytes, filename: &str) -> Result<(), PushError>;
    fn connection_state(&self) -> ConnectionState;
    fn stats(&self) -> PushStats;
}

/// In-memory test double: records what it was asked to push without any I/O.
#[derive(Default)]
pub struct NullPusher {
    state: ConnectionState,
    stats: PushStats,
}

impl Default for ConnectionState {
    fn default() -> Self {
        ConnectionState::Disconnected
    }
}

#[async_trait]
impl SegmentPusher for NullPusher {
    async fn connect(&mut self) -> Result<(), PushError> {
        self.state = ConnectionState::Connected;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.state = ConnectionState::Disconnected;
    }

    async fn push_segment(&mut self, segment: &LiveSegment) -> Result<(), PushError> {
        self.stats.segments_pushed += 1;
        self.stats.bytes_pushed += segment.data.len() as u64;
        Ok(())
    }

    async fn push_partial(&mut self, partial: &LivePartialSegment) -> Result<(), PushError> {
        self.stats.partials_pushed += 1;
        self.stats.bytes_pushed += partial.data.len() as u64;
        Ok(())
    }

    async fn push_playlist(&mut self, m3u8: &str, _filename: &str) -> Result<(), PushError> {
        self.stats.playlists_pushed += 1;
        self.stats.bytes_pushed += m3u8.len() as u64;
        Ok(())
    }

    async fn push_init_segment(&mut self, bytes: &Bytes, _filename: &str) -> Result<(), PushError> {
        self.stats.bytes_pushed += bytes.len() as u64;
        Ok(())
    }

    fn connection_state(&self) -> ConnectionState {
        self.state
    }

    fn stats(&self) -> PushStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Codec, LiveSegment, MediaTimestamp};
    use std::collections::BTreeSet;

    fn segment() -> LiveSegment {
        LiveSegment {
            index: 0,
            filename: "segment_0.m4s".to_string(),
            data: Bytes::from(vec![0u8; 128]),
            duration: 6.0,
            timestamp: MediaTimestamp::zero(1000),
            frame_count: 1,
            is_independent: true,
            codecs: BTreeSet::from([Codec::Aac]),
            is_gap: false,
            program_date_time: None,
            discontinuity_before: false,
        }
    }

    #[tokio::test]
    async fn null_pusher_tracks_connection_state_and_stats() {
        let mut pusher = NullPusher::default();
        assert_eq!(pusher.connection_state(), ConnectionState::Disconnected);

        pusher.connect().await.unwrap();
        assert_eq!(pusher.connection_state(), ConnectionState::Connected);

        pusher.push_segment(&segment()).await.unwrap();
        pusher.push_playlist("#EXTM3U\n", "stream.m3u8").await.unwrap();

        let stats = pusher.stats();
        assert_eq!(stats.segments_pushed, 1);
        assert_eq!(stats.playlists_pushed, 1);
        assert_eq!(stats.bytes_pushed, 128 + "#EXTM3U\n".len() as u64);

        pusher.disconnect();
        assert_eq!(pusher.connection_state(), ConnectionState::Disconnected);
    }
}
