//! Helpers for exercising adapters in tests and host harnesses.

use std::sync::atomic::{AtomicU32, Ordering};

use spinning_top::Spinlock;

use crate::process_variable::{ProcessVariable, ProcessVariableListener, ProcessVariableRef};
use crate::time_stamp::{TimeStamp, TimeStampSource};

/// Time-stamp source returning stamps that are zero except for an invocation
/// count in the `index0` field.
///
/// Lets tests assert exactly which send produced a value without depending
/// on the wall clock.
#[derive(Debug, Default)]
pub struct CountingTimeStampSource {
    count: AtomicU32,
}

impl TimeStampSource for CountingTimeStampSource {
    fn current_time_stamp(&self) -> TimeStamp {
        TimeStamp::new(0, 0, self.count.fetch_add(1, Ordering::Relaxed), 0)
    }
}

/// Listener that records every handle it is notified with.
#[derive(Default)]
pub struct RecordingListener {
    notified: Spinlock<Vec<ProcessVariableRef>>,
}

impl RecordingListener {
    /// How many notifications have been recorded.
    pub fn count(&self) -> usize {
        self.notified.lock().len()
    }

    /// Names of the notified variables, in notification order.
    pub fn names(&self) -> Vec<String> {
        self.notified
            .lock()
            .iter()
            .map(|pv| pv.name().to_string())
            .collect()
    }

    /// Take all recorded handles, clearing the record.
    pub fn take(&self) -> Vec<ProcessVariableRef> {
        std::mem::take(&mut *self.notified.lock())
    }
}

impl ProcessVariableListener for RecordingListener {
    fn notify(&self, pv: &ProcessVariableRef) {
        self.notified.lock().push(pv.clone());
    }
}
