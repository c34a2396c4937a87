//! Identifier generation for generated fields.

use std::fmt;

use parking_lot::Mutex;
use ulid::{Generator, Ulid};

/// How a generated field obtains its value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum IdStrategy {
    /// A ULID: 26 URL-safe characters, lexicographically sortable by creation time.
    #[default]
    Ulid,
}

/// Produces fresh identifiers.
pub trait IdGenerator: fmt::Debug + Send + Sync {
    /// A new identifier for `strategy`. Every call returns a distinct value.
    fn generate(&self, strategy: IdStrategy) -> String;
}

/// Monotonic ULID generator.
///
/// Ids generated within the same millisecond still sort in call order.
pub struct UlidGenerator {
    inner: Mutex<Generator>,
}

impl UlidGenerator {
    /// Create a generator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Generator::new()),
        }
    }
}

impl Default for UlidGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for UlidGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UlidGenerator").finish_non_exhaustive()
    }
}

impl IdGenerator for UlidGenerator {
    fn generate(&self, strategy: IdStrategy) -> String {
        match strategy {
            // The monotonic generator only fails once the random part of a
            // single millisecond is exhausted.
            IdStrategy::Ulid => self
                .inner
                .lock()
                .generate()
                .unwrap_or_else(|_| Ulid::new())
                .to_string(),
        }
    }
}
