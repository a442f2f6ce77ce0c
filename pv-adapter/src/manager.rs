//! Paired registries handing out the device-side and control-system-side
//! views of a set of process variables.
//!
//! All process variables are created through the device-side manager before
//! either side starts its loop; afterwards both registries are read-only, so
//! concurrent lookups from the two sides are safe.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::debug;
use spinning_top::Spinlock;
use thiserror::Error;

use crate::array::{ProcessArray, create_synchronized_process_array};
use crate::notification::NotificationQueue;
use crate::process_variable::{
    ChannelOptions, ProcessVariable, ProcessVariableListener, ProcessVariableRef, PvError,
};
use crate::scalar::{ProcessScalar, create_synchronized_process_scalar};
use crate::time_stamp::TimeStampSource;
use crate::value::ProcessValue;
use crate::version_number::VersionNumberSource;

/// Direction in which a process variable is synchronized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynchronizationDirection {
    /// The control-system side sends, the device side receives.
    ControlSystemToDevice,
    /// The device side sends, the control-system side receives.
    DeviceToControlSystem,
}

/// Error type for manager operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManagerError {
    /// No process variable with the given name is registered.
    #[error("no process variable named `{0}`")]
    NotFound(String),
    /// A process variable with the given name exists, but with a different
    /// element type or shape.
    #[error("process variable `{0}` has a different element type or shape")]
    TypeMismatch(String),
    /// A process variable with the given name already exists.
    #[error("a process variable named `{0}` already exists")]
    DuplicateName(String),
    /// A creation argument violated a contract.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}

impl From<PvError> for ManagerError {
    fn from(error: PvError) -> Self {
        match error {
            PvError::InvalidArgument(message) => ManagerError::InvalidArgument(message),
            PvError::WrongRole => ManagerError::InvalidArgument("wrong endpoint role"),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Side {
    Device,
    ControlSystem,
}

/// Registry state shared by the two manager façades.
struct PvManagerShared {
    /// Same key set in both maps; opposite role handles.
    device_pvs: Spinlock<BTreeMap<String, ProcessVariableRef>>,
    control_system_pvs: Spinlock<BTreeMap<String, ProcessVariableRef>>,
    /// Fed by senders of control-system-to-device variables.
    device_notifications: Arc<NotificationQueue>,
    /// Fed by senders of device-to-control-system variables.
    control_system_notifications: Arc<NotificationQueue>,
}

/// Send-notification listener that publishes the peer receiver handle into
/// one side's notification queue.
struct QueueNotificationListener {
    queue: Arc<NotificationQueue>,
}

impl ProcessVariableListener for QueueNotificationListener {
    fn notify(&self, pv: &ProcessVariableRef) {
        self.queue.push(pv.clone());
    }
}

impl PvManagerShared {
    fn pvs(&self, side: Side) -> &Spinlock<BTreeMap<String, ProcessVariableRef>> {
        match side {
            Side::Device => &self.device_pvs,
            Side::ControlSystem => &self.control_system_pvs,
        }
    }

    fn lookup(&self, side: Side, name: &str) -> Result<ProcessVariableRef, ManagerError> {
        self.pvs(side)
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| ManagerError::NotFound(name.to_string()))
    }

    fn lookup_scalar<T: ProcessValue>(
        &self,
        side: Side,
        name: &str,
    ) -> Result<Arc<ProcessScalar<T>>, ManagerError> {
        let pv = self.lookup(side, name)?;
        if pv.is_array() || pv.value_type() != T::VALUE_TYPE {
            return Err(ManagerError::TypeMismatch(name.to_string()));
        }
        pv.as_any_arc()
            .downcast::<ProcessScalar<T>>()
            .map_err(|_| ManagerError::TypeMismatch(name.to_string()))
    }

    fn lookup_array<T: ProcessValue>(
        &self,
        side: Side,
        name: &str,
    ) -> Result<Arc<ProcessArray<T>>, ManagerError> {
        let pv = self.lookup(side, name)?;
        if !pv.is_array() || pv.value_type() != T::VALUE_TYPE {
            return Err(ManagerError::TypeMismatch(name.to_string()));
        }
        pv.as_any_arc()
            .downcast::<ProcessArray<T>>()
            .map_err(|_| ManagerError::TypeMismatch(name.to_string()))
    }

    fn all(&self, side: Side) -> Vec<ProcessVariableRef> {
        self.pvs(side).lock().values().cloned().collect()
    }

    /// Options for a new channel: the notification listener is owned by the
    /// manager pair and always routes into the receiving side's queue.
    fn channel_options(
        &self,
        direction: SynchronizationDirection,
        number_of_buffers: usize,
        time_stamp_source: Option<Arc<dyn TimeStampSource>>,
        version_number_source: Option<Arc<dyn VersionNumberSource>>,
    ) -> ChannelOptions {
        let queue = match direction {
            SynchronizationDirection::ControlSystemToDevice => self.device_notifications.clone(),
            SynchronizationDirection::DeviceToControlSystem => {
                self.control_system_notifications.clone()
            }
        };
        ChannelOptions {
            number_of_buffers,
            time_stamp_source,
            version_number_source,
            send_notification_listener: Some(Arc::new(QueueNotificationListener { queue })),
        }
    }

    /// Register `sender`/`receiver` under `name`, assigning the sender to the
    /// sending side of `direction`. Fails on empty or duplicate names.
    fn register(
        &self,
        direction: SynchronizationDirection,
        name: &str,
        sender: ProcessVariableRef,
        receiver: ProcessVariableRef,
    ) -> Result<(), ManagerError> {
        if name.is_empty() {
            return Err(ManagerError::InvalidArgument(
                "process variable names must not be empty",
            ));
        }

        let (device_pv, control_system_pv) = match direction {
            SynchronizationDirection::ControlSystemToDevice => (receiver, sender),
            SynchronizationDirection::DeviceToControlSystem => (sender, receiver),
        };

        let mut device_pvs = self.device_pvs.lock();
        if device_pvs.contains_key(name) {
            return Err(ManagerError::DuplicateName(name.to_string()));
        }
        device_pvs.insert(name.to_string(), device_pv);
        self.control_system_pvs
            .lock()
            .insert(name.to_string(), control_system_pv);
        Ok(())
    }
}

/// Common lookup surface shared by the two manager façades.
pub trait PvManager: Send + Sync {
    /// Type-erased lookup by name.
    fn process_variable(&self, name: &str) -> Result<ProcessVariableRef, ManagerError>;

    /// Snapshot of all process variables on this side, in name order.
    fn all_process_variables(&self) -> Vec<ProcessVariableRef>;

    /// Dequeue the next send notification bound for this side.
    fn next_notification(&self) -> Option<ProcessVariableRef>;
}

/// The device side of a manager pair. Creates all process variables.
pub struct DevicePvManager {
    shared: Arc<PvManagerShared>,
}

/// The control-system side of a manager pair.
pub struct ControlSystemPvManager {
    shared: Arc<PvManagerShared>,
}

impl DevicePvManager {
    /// Create a synchronized scalar and register it under `name`.
    ///
    /// Returns the device-side endpoint: the sender for
    /// [`DeviceToControlSystem`](SynchronizationDirection::DeviceToControlSystem),
    /// the receiver for the opposite direction.
    pub fn create_process_scalar<T: ProcessValue>(
        &self,
        direction: SynchronizationDirection,
        name: &str,
        initial_value: T,
        number_of_buffers: usize,
        time_stamp_source: Option<Arc<dyn TimeStampSource>>,
        version_number_source: Option<Arc<dyn VersionNumberSource>>,
    ) -> Result<Arc<ProcessScalar<T>>, ManagerError> {
        let options = self.shared.channel_options(
            direction,
            number_of_buffers,
            time_stamp_source,
            version_number_source,
        );
        let (sender, receiver) = create_synchronized_process_scalar(name, initial_value, options)?;
        self.shared
            .register(direction, name, sender.clone(), receiver.clone())?;
        debug!("created process scalar `{name}` ({direction:?})");
        Ok(match direction {
            SynchronizationDirection::ControlSystemToDevice => receiver,
            SynchronizationDirection::DeviceToControlSystem => sender,
        })
    }

    /// Create a synchronized array and register it under `name`.
    ///
    /// The element count is fixed to `initial_values.len()`. Returns the
    /// device-side endpoint.
    pub fn create_process_array<T: ProcessValue>(
        &self,
        direction: SynchronizationDirection,
        name: &str,
        initial_values: &[T],
        number_of_buffers: usize,
        time_stamp_source: Option<Arc<dyn TimeStampSource>>,
        version_number_source: Option<Arc<dyn VersionNumberSource>>,
    ) -> Result<Arc<ProcessArray<T>>, ManagerError> {
        let options = self.shared.channel_options(
            direction,
            number_of_buffers,
            time_stamp_source,
            version_number_source,
        );
        let (sender, receiver) = create_synchronized_process_array(name, initial_values, options)?;
        self.shared
            .register(direction, name, sender.clone(), receiver.clone())?;
        debug!("created process array `{name}` ({direction:?})");
        Ok(match direction {
            SynchronizationDirection::ControlSystemToDevice => receiver,
            SynchronizationDirection::DeviceToControlSystem => sender,
        })
    }

    /// Typed scalar lookup on the device side.
    pub fn process_scalar<T: ProcessValue>(
        &self,
        name: &str,
    ) -> Result<Arc<ProcessScalar<T>>, ManagerError> {
        self.shared.lookup_scalar(Side::Device, name)
    }

    /// Typed array lookup on the device side.
    pub fn process_array<T: ProcessValue>(
        &self,
        name: &str,
    ) -> Result<Arc<ProcessArray<T>>, ManagerError> {
        self.shared.lookup_array(Side::Device, name)
    }
}

impl PvManager for DevicePvManager {
    fn process_variable(&self, name: &str) -> Result<ProcessVariableRef, ManagerError> {
        self.shared.lookup(Side::Device, name)
    }

    fn all_process_variables(&self) -> Vec<ProcessVariableRef> {
        self.shared.all(Side::Device)
    }

    fn next_notification(&self) -> Option<ProcessVariableRef> {
        self.shared.device_notifications.next_notification()
    }
}

impl ControlSystemPvManager {
    /// Typed scalar lookup on the control-system side.
    pub fn process_scalar<T: ProcessValue>(
        &self,
        name: &str,
    ) -> Result<Arc<ProcessScalar<T>>, ManagerError> {
        self.shared.lookup_scalar(Side::ControlSystem, name)
    }

    /// Typed array lookup on the control-system side.
    pub fn process_array<T: ProcessValue>(
        &self,
        name: &str,
    ) -> Result<Arc<ProcessArray<T>>, ManagerError> {
        self.shared.lookup_array(Side::ControlSystem, name)
    }
}

impl PvManager for ControlSystemPvManager {
    fn process_variable(&self, name: &str) -> Result<ProcessVariableRef, ManagerError> {
        self.shared.lookup(Side::ControlSystem, name)
    }

    fn all_process_variables(&self) -> Vec<ProcessVariableRef> {
        self.shared.all(Side::ControlSystem)
    }

    fn next_notification(&self) -> Option<ProcessVariableRef> {
        self.shared.control_system_notifications.next_notification()
    }
}

/// Create a connected `(control-system manager, device manager)` pair.
pub fn create_pv_manager() -> (Arc<ControlSystemPvManager>, Arc<DevicePvManager>) {
    let shared = Arc::new(PvManagerShared {
        device_pvs: Spinlock::new(BTreeMap::new()),
        control_system_pvs: Spinlock::new(BTreeMap::new()),
        device_notifications: Arc::new(NotificationQueue::new()),
        control_system_notifications: Arc::new(NotificationQueue::new()),
    });
    (
        Arc::new(ControlSystemPvManager {
            shared: shared.clone(),
        }),
        Arc::new(DevicePvManager { shared }),
    )
}
