/// the index-tagged result of a read
///
use std::ops::Range;

/// A resolved value and where it came from: `found_at` is the index of the level
/// that answered, or None when the value was computed and is not yet cached.
///
/// A computed payload may be absent; a level hit always carries a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheValue<V> {
    pub payload: Option<V>,
    pub found_at: Option<usize>,
}

impl<V> CacheValue<V> {
    pub fn from_level(payload: V, index: usize) -> CacheValue<V> {
        CacheValue {
            payload: Some(payload),
            found_at: Some(index),
        }
    }

    pub fn computed(payload: Option<V>) -> CacheValue<V> {
        CacheValue {
            payload,
            found_at: None,
        }
    }

    pub fn found_at(&self) -> Option<usize> {
        self.found_at
    }

    pub fn is_computed(&self) -> bool {
        self.found_at.is_none()
    }

    pub fn is_absent(&self) -> bool {
        self.payload.is_none()
    }

    pub fn payload(&self) -> Option<&V> {
        self.payload.as_ref()
    }

    pub fn into_payload(self) -> Option<V> {
        self.payload
    }

    /// The level indices this value must be written to: every level when computed,
    /// otherwise the levels strictly nearer than the one that answered.
    pub fn write_range(&self, level_count: usize) -> Range<usize> {
        match self.found_at {
            Some(index) => 0..index.min(level_count),
            None => 0..level_count,
        }
    }
}
