//! Per-side helpers that drain notifications and dispatch listeners.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::manager::{ControlSystemPvManager, DevicePvManager, PvManager};
use crate::process_variable::{ProcessVariable, ProcessVariableListener, PvError};

/// Drains one side's notification queue and broadcasts sends.
///
/// Owned and driven by the thread of its side; listener registration is not
/// synchronized with a concurrently running `receive_all`.
pub struct SynchronizationUtility<M: PvManager> {
    manager: Arc<M>,
    receive_notification_listeners: BTreeMap<String, Arc<dyn ProcessVariableListener>>,
}

/// Synchronization utility for the device side.
pub type DeviceSynchronizationUtility = SynchronizationUtility<DevicePvManager>;

/// Synchronization utility for the control-system side.
pub type ControlSystemSynchronizationUtility = SynchronizationUtility<ControlSystemPvManager>;

impl<M: PvManager> SynchronizationUtility<M> {
    pub fn new(manager: Arc<M>) -> Self {
        Self {
            manager,
            receive_notification_listeners: BTreeMap::new(),
        }
    }

    /// Register a listener invoked after `name` receives a value.
    ///
    /// At most one listener per name; a second registration replaces the
    /// first.
    pub fn add_receive_notification_listener(
        &mut self,
        name: &str,
        listener: Arc<dyn ProcessVariableListener>,
    ) {
        self.receive_notification_listeners
            .insert(name.to_string(), listener);
    }

    /// Remove the listener registered for `name`, if any.
    pub fn remove_receive_notification_listener(&mut self, name: &str) {
        self.receive_notification_listeners.remove(name);
    }

    /// Drain this side's notification queue.
    ///
    /// For each notified process variable, all buffered updates are received;
    /// the listener registered for its name (if any) is invoked once per
    /// accepted update, in arrival order. Redundant notifications for an
    /// already-drained variable are no-ops.
    pub fn receive_all(&self) -> Result<(), PvError> {
        while let Some(pv) = self.manager.next_notification() {
            if !pv.receive()? {
                continue;
            }
            match self.receive_notification_listeners.get(pv.name()) {
                Some(listener) => {
                    listener.notify(&pv);
                    while pv.receive()? {
                        listener.notify(&pv);
                    }
                }
                None => while pv.receive()? {},
            }
        }
        Ok(())
    }

    /// Send the current value of every process variable on this side whose
    /// role is sender. Overflow outcomes are deliberately ignored.
    pub fn send_all(&self) -> Result<(), PvError> {
        for pv in self.manager.all_process_variables() {
            if pv.is_sender() {
                pv.send()?;
            }
        }
        Ok(())
    }

    /// Poll [`receive_all`](Self::receive_all) every
    /// `check_interval_micros` until `timeout_micros` have elapsed.
    ///
    /// If either argument is non-positive, drains once and returns
    /// immediately. Intended for test harnesses; production callers drive
    /// `receive_all` from their own event loop.
    pub fn wait_for_notifications(
        &self,
        timeout_micros: i64,
        check_interval_micros: i64,
    ) -> Result<(), PvError> {
        if timeout_micros <= 0 || check_interval_micros <= 0 {
            return self.receive_all();
        }
        let limit = Instant::now() + Duration::from_micros(timeout_micros as u64);
        let interval = Duration::from_micros(check_interval_micros as u64);
        loop {
            self.receive_all()?;
            if Instant::now() >= limit {
                return Ok(());
            }
            thread::sleep(interval);
        }
    }
}
