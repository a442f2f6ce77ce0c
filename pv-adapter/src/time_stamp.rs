//! Time stamps carried alongside process-variable values.

use std::time::{SystemTime, UNIX_EPOCH};

/// Time stamp attached to a process-variable value.
///
/// `seconds`/`nanoseconds` are relative to the Unix epoch. `index0` and
/// `index1` are opaque user tags; the adapter never interprets them. The
/// default value (all fields zero) marks a value that has never been sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeStamp {
    pub seconds: u64,
    pub nanoseconds: u32,
    pub index0: u32,
    pub index1: u32,
}

impl TimeStamp {
    pub fn new(seconds: u64, nanoseconds: u32, index0: u32, index1: u32) -> Self {
        Self {
            seconds,
            nanoseconds,
            index0,
            index1,
        }
    }

    /// The current system time, with both index fields zero.
    ///
    /// A clock before the Unix epoch yields the all-zero stamp.
    pub fn now() -> Self {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self {
            seconds: elapsed.as_secs(),
            nanoseconds: elapsed.subsec_nanos(),
            index0: 0,
            index1: 0,
        }
    }
}

/// Source of the time stamps attached to outgoing values.
///
/// A sender without a configured source falls back to [`TimeStamp::now`].
pub trait TimeStampSource: Send + Sync {
    fn current_time_stamp(&self) -> TimeStamp;
}
