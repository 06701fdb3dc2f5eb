//! Round-robin rotation over the Groq API key pool.
//!
//! One `KeyRotator` instance exists per provider and lives for the process
//! lifetime. The cursor is shared across all in-flight requests: concurrent
//! draws interleave over the same sequence, distributing load across keys
//! globally rather than per request.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::ai::AiError;

/// Ordered credential set with an atomic rotation cursor.
///
/// `next()` is a single indivisible read-advance-return step, so two callers
/// can never be handed the same slot. There is no health weighting or
/// cooldown: a key that just rate-limited is eligible again after one full
/// cycle.
#[derive(Debug)]
pub struct KeyRotator {
    keys: Vec<String>,
    cursor: AtomicUsize,
}

impl KeyRotator {
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            keys,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Returns the next credential in insertion order, wrapping around
    /// indefinitely. Fails on an empty pool — never panics on one.
    pub fn next(&self) -> Result<&str, AiError> {
        if self.keys.is_empty() {
            return Err(AiError::NoCredentials);
        }
        // The closure is total, so fetch_update always succeeds.
        let index = self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cursor| {
                Some((cursor + 1) % self.keys.len())
            })
            .unwrap_or(0);
        Ok(&self.keys[index])
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
