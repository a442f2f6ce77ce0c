//! Version numbers used to order conflicting value updates.

use std::sync::atomic::{AtomicU64, Ordering};

/// Version number associated with a process-variable value.
///
/// Non-decreasing on a receiver across its lifetime; `0` initially.
pub type VersionNumber = u64;

/// Source of strictly increasing version numbers.
///
/// One source is typically shared by all process variables of an application
/// so that versions form a total order across variables. A sender without a
/// configured source stamps every value with `0`, and its peer receiver's
/// version gate is disabled.
pub trait VersionNumberSource: Send + Sync {
    fn next_version_number(&self) -> VersionNumber;
}

/// Process-wide version-number source backed by an atomic counter.
///
/// The first number handed out is `1`, so values stamped by this source
/// always pass a freshly constructed receiver's version gate.
#[derive(Debug, Default)]
pub struct MonotonicVersionNumberSource {
    next: AtomicU64,
}

impl MonotonicVersionNumberSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VersionNumberSource for MonotonicVersionNumberSource {
    fn next_version_number(&self) -> VersionNumber {
        self.next.fetch_add(1, Ordering::Relaxed) + 1
    }
}
