use crate::model::MediaTimestamp;

#[derive(thiserror::Error, Debug)]
pub enum SegmenterError {
    #[error("segmenter is not active")]
    NotActive,
    #[error("non-monotonic timestamp: last={last:?} got={got:?}")]
    NonMonotonicTimestamp {
        last: MediaTimestamp,
        got: MediaTimestamp,
    },
    #[error("no frames pending")]
    NoFramesPending,
    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),
}

#[derive(thiserror::Error, Debug)]
pub enum PlaylistError {
    #[error("stream has already ended")]
    StreamEnded,
    #[error("invalid segment index: {0}")]
    InvalidSegmentIndex(u64),
    #[error("parent segment not found: {0}")]
    ParentSegmentNotFound(u64),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

#[derive(thiserror::Error, Debug)]
pub enum KeyManagerError {
    #[error("key provider failed: {0}")]
    Provider(#[from] anyhow::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum PushError {
    #[error("transport error: {0}")]
    Transport(#[from] anyhow::Error),
}
