//! Scalar process variables.

use std::any::Any;
use std::sync::Arc;

use buffer_ring::BufferRing;
use log::trace;
use spinning_top::Spinlock;

use crate::process_variable::{
    ChannelOptions, ProcessVariable, ProcessVariableListener, ProcessVariableRef, PvError, Role,
    SendOutcome,
};
use crate::time_stamp::{TimeStamp, TimeStampSource};
use crate::value::{ProcessValue, ValueType};
use crate::version_number::{VersionNumber, VersionNumberSource};

/// One unit of scalar handoff between sender and receiver.
struct ScalarBuffer<T> {
    time_stamp: TimeStamp,
    value: T,
    version: VersionNumber,
}

/// Endpoint-local state. Guarded by an uncontended spin lock: each endpoint
/// is driven by a single thread, the lock only makes sharing the handle with
/// the manager registry sound.
struct ScalarState<T> {
    value: T,
    time_stamp: TimeStamp,
    version: VersionNumber,
    /// Armed by `use_origin_version_number_for_next_send`, consumed by the
    /// next `send`.
    pinned_version: Option<VersionNumber>,
}

/// The scalar realization of a process variable, covering all three roles.
///
/// Senders and receivers come in pairs from
/// [`create_synchronized_process_scalar`]; the pair shares one lock-free
/// buffer ring, so the two endpoints can be driven from different threads
/// without a mutex. Each individual endpoint supports only a single thread.
pub struct ProcessScalar<T: ProcessValue> {
    name: String,
    role: Role,
    state: Spinlock<ScalarState<T>>,
    /// Shared with the peer; `None` for stand-alone variables.
    ring: Option<Arc<BufferRing<ScalarBuffer<T>>>>,
    /// The peer receiver; present on senders only. The receiver holds no
    /// back-reference.
    peer: Option<Arc<ProcessScalar<T>>>,
    time_stamp_source: Option<Arc<dyn TimeStampSource>>,
    version_number_source: Option<Arc<dyn VersionNumberSource>>,
    send_notification_listener: Option<Arc<dyn ProcessVariableListener>>,
}

impl<T: ProcessValue> std::fmt::Debug for ProcessScalar<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessScalar")
            .field("name", &self.name)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

impl<T: ProcessValue> ProcessScalar<T> {
    /// The role this endpoint was constructed with.
    pub fn role(&self) -> Role {
        self.role
    }

    /// A copy of the current value.
    pub fn get(&self) -> T {
        self.state.lock().value
    }

    /// Set the current value. Does not send.
    pub fn set(&self, value: T) {
        self.state.lock().value = value;
    }

    /// Send the current value with an explicit version number instead of one
    /// drawn from the version-number source.
    ///
    /// If the receiver's current value already has a version greater than or
    /// equal to `version`, it will silently discard this update.
    pub fn send_with_version(&self, version: VersionNumber) -> Result<SendOutcome, PvError> {
        self.send_internal(Some(version))
    }

    /// Set the value and send it, but only if `version` is greater than the
    /// current version.
    ///
    /// Returns `Ok(true)` if the value was set and sent. Equivalent to
    /// checking [`version_number`](ProcessVariable::version_number) before a
    /// `set` + [`send_with_version`](Self::send_with_version); useful when a
    /// variable is updated with a value computed from another variable, to
    /// avoid overwriting a newer value with an older one.
    pub fn set_and_send_if_new_version_greater(
        &self,
        value: T,
        version: VersionNumber,
    ) -> Result<bool, PvError> {
        if version > self.version_number() {
            self.set(value);
            self.send_with_version(version)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn send_internal(&self, explicit_version: Option<VersionNumber>) -> Result<SendOutcome, PvError> {
        if self.role != Role::Sender {
            return Err(PvError::WrongRole);
        }
        let Some(ring) = self.ring.as_ref() else {
            return Err(PvError::WrongRole);
        };

        let time_stamp = match &self.time_stamp_source {
            Some(source) => source.current_time_stamp(),
            None => TimeStamp::now(),
        };

        let mut state = self.state.lock();
        let version = match explicit_version {
            Some(version) => version,
            None => match state.pinned_version {
                Some(pinned) => pinned,
                None => match &self.version_number_source {
                    Some(source) => source.next_version_number(),
                    None => 0,
                },
            },
        };
        state.pinned_version = None;
        state.time_stamp = time_stamp;
        state.version = version;
        let buffer = ScalarBuffer {
            time_stamp,
            value: state.value,
            version,
        };
        drop(state);

        let outcome = match ring.push_overwrite(buffer) {
            None => SendOutcome::Sent,
            Some(_dropped) => {
                trace!("dropped oldest undelivered value of `{}`", self.name);
                SendOutcome::OverflowDropped
            }
        };

        if let Some(listener) = &self.send_notification_listener {
            if let Some(peer) = &self.peer {
                let handle: ProcessVariableRef = peer.clone();
                listener.notify(&handle);
            }
        }

        Ok(outcome)
    }

    fn receive_internal(&self) -> Result<bool, PvError> {
        if self.role != Role::Receiver {
            return Err(PvError::WrongRole);
        }
        let Some(ring) = self.ring.as_ref() else {
            return Err(PvError::WrongRole);
        };

        let Some(buffer) = ring.pop() else {
            return Ok(false);
        };

        let mut state = self.state.lock();
        if self.version_number_source.is_some() && buffer.version <= state.version {
            // A newer value is already resident.
            return Ok(false);
        }
        state.time_stamp = buffer.time_stamp;
        state.value = buffer.value;
        state.version = buffer.version;
        if state.pinned_version.is_some_and(|pinned| buffer.version > pinned) {
            state.pinned_version = None;
        }
        Ok(true)
    }

    fn use_origin_internal(&self, origin_version: VersionNumber) -> bool {
        let mut state = self.state.lock();
        let current = state.pinned_version.unwrap_or(state.version);
        if origin_version > current {
            state.pinned_version = Some(origin_version);
            true
        } else {
            false
        }
    }
}

impl<T: ProcessValue> ProcessVariable for ProcessScalar<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn value_type(&self) -> ValueType {
        T::VALUE_TYPE
    }

    fn is_array(&self) -> bool {
        false
    }

    fn is_sender(&self) -> bool {
        self.role == Role::Sender
    }

    fn is_receiver(&self) -> bool {
        self.role == Role::Receiver
    }

    fn time_stamp(&self) -> TimeStamp {
        self.state.lock().time_stamp
    }

    fn version_number(&self) -> VersionNumber {
        let state = self.state.lock();
        state.pinned_version.unwrap_or(state.version)
    }

    fn receive(&self) -> Result<bool, PvError> {
        self.receive_internal()
    }

    fn send(&self) -> Result<SendOutcome, PvError> {
        self.send_internal(None)
    }

    fn use_origin_version_number_for_next_send(&self, origin_version: VersionNumber) -> bool {
        self.use_origin_internal(origin_version)
    }

    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

fn initial_state<T: ProcessValue>(initial_value: T) -> ScalarState<T> {
    ScalarState {
        value: initial_value,
        time_stamp: TimeStamp::default(),
        version: 0,
        pinned_version: None,
    }
}

/// Create a stand-alone process scalar.
///
/// It is not synchronized with any other instance: `send` and `receive` fail
/// with [`PvError::WrongRole`], everything else behaves like on any process
/// variable.
pub fn create_simple_process_scalar<T: ProcessValue>(
    name: &str,
    initial_value: T,
) -> Arc<ProcessScalar<T>> {
    Arc::new(ProcessScalar {
        name: name.to_string(),
        role: Role::StandAlone,
        state: Spinlock::new(initial_state(initial_value)),
        ring: None,
        peer: None,
        time_stamp_source: None,
        version_number_source: None,
        send_notification_listener: None,
    })
}

/// Create a synchronized `(sender, receiver)` pair of process scalars.
///
/// The receiver owns the buffer ring, the sender shares it and holds the
/// receiver handle so the send-notification listener can be given the peer.
/// Both endpoints start out with `initial_value`, version 0 and an unset
/// time stamp.
pub fn create_synchronized_process_scalar<T: ProcessValue>(
    name: &str,
    initial_value: T,
    options: ChannelOptions,
) -> Result<(Arc<ProcessScalar<T>>, Arc<ProcessScalar<T>>), PvError> {
    if options.number_of_buffers < 1 {
        return Err(PvError::InvalidArgument(
            "a scalar channel needs at least one buffer",
        ));
    }

    let ring = Arc::new(BufferRing::new(options.number_of_buffers));
    let receiver = Arc::new(ProcessScalar {
        name: name.to_string(),
        role: Role::Receiver,
        state: Spinlock::new(initial_state(initial_value)),
        ring: Some(ring.clone()),
        peer: None,
        time_stamp_source: None,
        version_number_source: options.version_number_source.clone(),
        send_notification_listener: None,
    });
    let sender = Arc::new(ProcessScalar {
        name: name.to_string(),
        role: Role::Sender,
        state: Spinlock::new(initial_state(initial_value)),
        ring: Some(ring),
        peer: Some(receiver.clone()),
        time_stamp_source: options.time_stamp_source,
        version_number_source: options.version_number_source,
        send_notification_listener: options.send_notification_listener,
    });
    Ok((sender, receiver))
}
