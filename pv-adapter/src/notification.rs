//! Cross-thread queues of "a value was sent in your direction" events.

use crossbeam_queue::SegQueue;

use crate::process_variable::ProcessVariableRef;

/// Per-side queue of send notifications.
///
/// Every sender whose channel points at a side enqueues into that side's
/// queue (multi-producer); only the side's synchronization utility drains it
/// (single consumer). Each entry is the receiver handle of the notifying
/// channel. Duplicates are expected: a variable sent several times between
/// drains appears several times, and the drainer treats the redundant
/// entries as no-ops.
///
/// Backed by a node-allocating lock-free queue, so `push` never blocks and
/// never fails regardless of how many variables share the queue.
pub struct NotificationQueue {
    queue: SegQueue<ProcessVariableRef>,
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self {
            queue: SegQueue::new(),
        }
    }

    /// Enqueue a notification for `pv`. Never blocks.
    pub fn push(&self, pv: ProcessVariableRef) {
        self.queue.push(pv);
    }

    /// Dequeue the next pending notification, if any.
    pub fn next_notification(&self) -> Option<ProcessVariableRef> {
        self.queue.pop()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::thread;

    use crate::scalar::create_simple_process_scalar;

    #[test]
    fn test_fifo_order() {
        let queue = NotificationQueue::new();
        let first: ProcessVariableRef = create_simple_process_scalar("FIRST", 0i32);
        let second: ProcessVariableRef = create_simple_process_scalar("SECOND", 0i32);

        queue.push(first);
        queue.push(second);

        assert_eq!(queue.next_notification().unwrap().name(), "FIRST");
        assert_eq!(queue.next_notification().unwrap().name(), "SECOND");
        assert!(queue.next_notification().is_none());
    }

    #[test]
    fn test_duplicates_are_kept() {
        let queue = NotificationQueue::new();
        let pv: ProcessVariableRef = create_simple_process_scalar("DUP", 0i32);

        queue.push(pv.clone());
        queue.push(pv);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_multi_producer_drain() {
        let queue = Arc::new(NotificationQueue::new());
        let mut producers = Vec::new();
        for i in 0..4 {
            let queue = queue.clone();
            producers.push(thread::spawn(move || {
                let pv: ProcessVariableRef =
                    create_simple_process_scalar(&format!("PV{i}"), 0i32);
                for _ in 0..100 {
                    queue.push(pv.clone());
                }
            }));
        }
        for producer in producers {
            producer.join().unwrap();
        }

        let mut drained = 0;
        while queue.next_notification().is_some() {
            drained += 1;
        }
        assert_eq!(drained, 400);
    }
}
