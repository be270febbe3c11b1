//! Multipart boundary generation.
//!
//! Boundaries separate sibling body parts in a multipart message and
//! must be unique across sibling and nested parts.

use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;
use rand::distributions::Alphanumeric;

/// Length of the random portion of a boundary token.
const RANDOM_LEN: usize = 24;

/// Boundary generator for multipart messages.
///
/// Generates tokens in the format `boundary_<counter>_<random>`. The
/// counter is shared by every token from the same generator and the
/// random suffix is drawn fresh each time, so tokens never repeat over
/// the generator's lifetime.
#[derive(Debug)]
pub struct BoundaryGenerator {
    counter: AtomicU64,
}

impl BoundaryGenerator {
    /// Creates a new boundary generator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
        }
    }

    /// Generates the next boundary token.
    #[must_use]
    pub fn next(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(RANDOM_LEN)
            .map(char::from)
            .collect();
        format!("boundary_{n}_{suffix}")
    }

    /// Returns the current counter value without incrementing.
    #[must_use]
    pub fn current(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}

impl Default for BoundaryGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide generator backing [`next_boundary`].
static GENERATOR: BoundaryGenerator = BoundaryGenerator::new();

/// Generates a boundary token from the process-wide generator.
#[must_use]
pub fn next_boundary() -> String {
    GENERATOR.next()
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_format() {
        let generator = BoundaryGenerator::new();
        let boundary = generator.next();

        let parts: Vec<&str> = boundary.splitn(3, '_').collect();
        assert_eq!(parts[0], "boundary");
        assert_eq!(parts[1], "0");
        assert_eq!(parts[2].len(), RANDOM_LEN);
        assert!(parts[2].chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_counter_is_monotonic() {
        let generator = BoundaryGenerator::new();
        assert!(generator.next().starts_with("boundary_0_"));
        assert!(generator.next().starts_with("boundary_1_"));
        assert!(generator.next().starts_with("boundary_2_"));
    }

    #[test]
    fn test_consecutive_boundaries_are_distinct() {
        let generator = BoundaryGenerator::new();
        // Counter alone guarantees this even on a random-suffix collision
        assert_ne!(generator.next(), generator.next());
    }

    #[test]
    fn test_uniqueness() {
        let generator = BoundaryGenerator::new();
        let mut seen = std::collections::HashSet::new();

        for _ in 0..1000 {
            let boundary = generator.next();
            assert!(seen.insert(boundary), "duplicate boundary generated");
        }
    }

    #[test]
    fn test_current() {
        let generator = BoundaryGenerator::new();
        assert_eq!(generator.current(), 0);
        let _ = generator.next();
        assert_eq!(generator.current(), 1);
    }

    #[test]
    fn test_process_wide_generator() {
        let first = next_boundary();
        let second = next_boundary();
        assert_ne!(first, second);
        assert!(first.starts_with("boundary_"));
    }
}
