//! API credential rotation.
//!
//! Several keys spread quota across projects. The ring hands them out
//! round-robin, one per analysis; all candidate models of that analysis use
//! the same key. The counter lives in the ring itself so callers own the
//! rotation state and tests can observe it.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Ordered API keys plus a rotation counter.
pub struct KeyRing {
    keys: Vec<String>,
    next: AtomicUsize,
}

impl KeyRing {
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            keys,
            next: AtomicUsize::new(0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Hand out the next key, or `None` when no key is configured.
    pub fn next_key(&self) -> Option<&str> {
        if self.keys.is_empty() {
            return None;
        }
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.keys.len();
        debug!("Using API key index {} of {}", index, self.keys.len());
        Some(&self.keys[index])
    }
}

impl fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRing")
            .field("keys", &format_args!("<{} redacted>", self.keys.len()))
            .field("next", &self.next.load(Ordering::Relaxed))
            .finish()
    }
}
