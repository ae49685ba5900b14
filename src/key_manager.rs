use std::time::{Duration, Instant};

use crate::error::KeyManagerError;
use crate::model::EncryptionKey;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RotationPolicy {
    None,
    EverySegment,
    EveryNSegments(u64),
    Manual,
}

/// External collaborator that actually mints key material. The manager never generates
/// raw key bytes itself.
pub trait KeyProvider: Send + Sync {
    fn provide_key(&self) -> Result<EncryptionKey, anyhow::Error>;
    fn provider_name(&self) -> &str;
}

#[derive(Clone, Debug)]
pub struct KeyManagerStats {
    pub total_rotations: u64,
    pub current_key_id: Option<uuid::Uuid>,
    pub time_since_last_rotation: Option<Duration>,
    pub segments_since_last_rotation: u64,
}

pub struct LiveKeyManager {
    policy: RotationPolicy,
    provider: Box<dyn KeyProvider>,
    current_key: Option<EncryptionKey>,
    total_rotations: u64,
    last_rotation_at: Option<Instant>,
    segments_since_last_rotation: u64,
}

impl LiveKeyManager {
    pub fn new(policy: RotationPolicy, provider: Box<dyn KeyProvider>) -> Self {
        Self {
            policy,
            provider,
            current_key: None,
            total_rotations: 0,
            last_rotation_at: None,
            segments_since_last_rotation: 0,
        }
    }

    pub fn key_for_segment(&mut self, index: u64) -> Result<EncryptionKey, KeyManagerError> {
        let should_rotate = match self.policy {
            RotationPolicy::None => self.current_key.is_none(),
            RotationPolicy::EverySegment => true,
            RotationPolicy::EveryNSegments(n) => {
                self.current_key.is_none() || (n > 0 && index % n == 0)
            }
            RotationPolicy::Manual => self.current_key.is_none(),
        };

        if should_rotate {
            self.rotate()?;
        } else {
            self.segments_since_last_rotation += 1;
        }

        Ok(self
            .current_key
            .clone()
            .expect("key must exist after rotation check"))
    }

    pub fn force_key_rotation(&mut self) -> Result<EncryptionKey, KeyManagerError> {
        self.rotate()?;
        Ok(self.current_key.clone().unwrap())
    }

    fn rotate(&mut self) -> Result<(), KeyManagerError> {
        let key = self
            .provider
            .provide_key()
            .map_err(KeyManagerError::Provider)?;
        self.current_key = Some(key);
        self.total_rotations += 1;
        self.last_rotation_at = Some(Instant::now());
        self.segments_since_last_rotation = 0;
        Ok(())
    }

    pub fn statistics(&self) -> KeyManagerStats {
        KeyManagerStats {
            total_rotations: self.total_rotations,
            current_key_id: self.current_key.as_ref().map(|k| k.key_id),
            time_since_last_rotation: self.last_rotation_at.map(|t| t.elapsed()),
            segments_since_last_rotation: self.segments_since_last_rotation,
        }
    }

    pub fn reset(&mut self) {
        self.current_key = None;
        self.total_rotations = 0;
        self.last_rotation_at = None;
        self.segments_since_last_rotation = 0;
    }
}
