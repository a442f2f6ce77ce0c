//! Array process variables.
//!
//! Array payloads are owned `Vec`s that move through the shared ring, so
//! `send` and `receive` never copy element data: the sender swaps its working
//! vector into the ring and adopts a spare one from the recycling pool, the
//! receiver adopts the popped vector and returns its previous one to the
//! pool.

use std::any::Any;
use std::sync::Arc;

use buffer_ring::{BufferPool, BufferRing};
use log::trace;
use spinning_top::Spinlock;

use crate::process_variable::{
    ChannelOptions, ProcessVariable, ProcessVariableListener, ProcessVariableRef, PvError, Role,
    SendOutcome,
};
use crate::time_stamp::{TimeStamp, TimeStampSource};
use crate::value::{ProcessValue, ValueType};
use crate::version_number::{VersionNumber, VersionNumberSource};

/// One unit of array handoff. The payload vector is owned and recycled.
struct ArrayBuffer<T> {
    time_stamp: TimeStamp,
    values: Vec<T>,
    version: VersionNumber,
}

struct ArrayState<T> {
    values: Vec<T>,
    time_stamp: TimeStamp,
    version: VersionNumber,
    pinned_version: Option<VersionNumber>,
}

/// The array realization of a process variable.
///
/// The element count is fixed at creation. Because payload vectors transfer
/// by ownership, a sender's local values are unspecified after `send` until
/// the next [`set`](Self::set) or [`with_values_mut`](Self::with_values_mut)
/// overwrites them.
pub struct ProcessArray<T: ProcessValue> {
    name: String,
    role: Role,
    length: usize,
    state: Spinlock<ArrayState<T>>,
    /// Filled buffers travelling sender -> receiver.
    full: Option<Arc<BufferRing<ArrayBuffer<T>>>>,
    /// Spent payload vectors travelling back for reuse.
    spares: Option<Arc<BufferPool<Vec<T>>>>,
    peer: Option<Arc<ProcessArray<T>>>,
    time_stamp_source: Option<Arc<dyn TimeStampSource>>,
    version_number_source: Option<Arc<dyn VersionNumberSource>>,
    send_notification_listener: Option<Arc<dyn ProcessVariableListener>>,
}

impl<T: ProcessValue> std::fmt::Debug for ProcessArray<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessArray")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

impl<T: ProcessValue> ProcessArray<T> {
    /// The role this endpoint was constructed with.
    pub fn role(&self) -> Role {
        self.role
    }

    /// The fixed number of elements.
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// A copy of the current values.
    pub fn get(&self) -> Vec<T> {
        self.state.lock().values.clone()
    }

    /// Copy `values` into the current value. Does not send.
    ///
    /// # Panics
    ///
    /// Panics if `values.len()` differs from [`len`](Self::len); array
    /// process variables cannot be resized.
    pub fn set(&self, values: &[T]) {
        assert_eq!(
            values.len(),
            self.length,
            "array process variable length is fixed"
        );
        self.state.lock().values.copy_from_slice(values);
    }

    /// Run `f` with shared access to the current values.
    pub fn with_values<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.state.lock().values)
    }

    /// Run `f` with mutable access to the current values, for in-place
    /// iteration, transformation and sorting without copying out.
    pub fn with_values_mut<R>(&self, f: impl FnOnce(&mut [T]) -> R) -> R {
        f(&mut self.state.lock().values)
    }

    /// Send the current values with an explicit version number.
    pub fn send_with_version(&self, version: VersionNumber) -> Result<SendOutcome, PvError> {
        self.send_internal(Some(version))
    }

    /// Set the values and send them, but only if `version` is greater than
    /// the current version.
    pub fn set_and_send_if_new_version_greater(
        &self,
        values: &[T],
        version: VersionNumber,
    ) -> Result<bool, PvError> {
        if version > self.version_number() {
            self.set(values);
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
        let (Some(full), Some(spares)) = (self.full.as_ref(), self.spares.as_ref()) else {
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

        // Adopt a replacement working vector before giving up the current
        // one. When the pool is drained, the oldest undelivered buffer is
        // reclaimed instead, which is the overflow case. Both the pool and
        // the ring can only be momentarily empty at once when a receive is
        // in flight between the two; then one bounded allocation bridges
        // the race.
        let mut overflowed = false;
        let replacement = match spares.take() {
            Some(values) => values,
            None => match full.pop() {
                Some(reclaimed) => {
                    overflowed = true;
                    reclaimed.values
                }
                None => vec![T::default(); self.length],
            },
        };
        let values = std::mem::replace(&mut state.values, replacement);
        drop(state);

        if let Some(evicted) = full.push_overwrite(ArrayBuffer {
            time_stamp,
            values,
            version,
        }) {
            overflowed = true;
            spares.put(evicted.values);
        }
        if overflowed {
            trace!("dropped oldest undelivered values of `{}`", self.name);
        }

        if let Some(listener) = &self.send_notification_listener {
            if let Some(peer) = &self.peer {
                let handle: ProcessVariableRef = peer.clone();
                listener.notify(&handle);
            }
        }

        Ok(if overflowed {
            SendOutcome::OverflowDropped
        } else {
            SendOutcome::Sent
        })
    }

    fn receive_internal(&self) -> Result<bool, PvError> {
        if self.role != Role::Receiver {
            return Err(PvError::WrongRole);
        }
        let (Some(full), Some(spares)) = (self.full.as_ref(), self.spares.as_ref()) else {
            return Err(PvError::WrongRole);
        };

        let Some(buffer) = full.pop() else {
            return Ok(false);
        };

        let mut state = self.state.lock();
        if self.version_number_source.is_some() && buffer.version <= state.version {
            drop(state);
            spares.put(buffer.values);
            return Ok(false);
        }
        let spent = std::mem::replace(&mut state.values, buffer.values);
        state.time_stamp = buffer.time_stamp;
        state.version = buffer.version;
        if state.pinned_version.is_some_and(|pinned| buffer.version > pinned) {
            state.pinned_version = None;
        }
        drop(state);
        spares.put(spent);
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

impl<T: ProcessValue> ProcessVariable for ProcessArray<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn value_type(&self) -> ValueType {
        T::VALUE_TYPE
    }

    fn is_array(&self) -> bool {
        true
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

fn initial_state<T: ProcessValue>(initial_values: &[T]) -> ArrayState<T> {
    ArrayState {
        values: initial_values.to_vec(),
        time_stamp: TimeStamp::default(),
        version: 0,
        pinned_version: None,
    }
}

/// Create a stand-alone process array.
pub fn create_simple_process_array<T: ProcessValue>(
    name: &str,
    initial_values: &[T],
) -> Arc<ProcessArray<T>> {
    Arc::new(ProcessArray {
        name: name.to_string(),
        role: Role::StandAlone,
        length: initial_values.len(),
        state: Spinlock::new(initial_state(initial_values)),
        full: None,
        spares: None,
        peer: None,
        time_stamp_source: None,
        version_number_source: None,
        send_notification_listener: None,
    })
}

/// Create a synchronized `(sender, receiver)` pair of process arrays.
///
/// `number_of_buffers` values may be in flight without loss; beyond the two
/// vectors resident in the endpoints, that many payload vectors are
/// pre-allocated into the recycling pool, so steady-state traffic allocates
/// nothing.
pub fn create_synchronized_process_array<T: ProcessValue>(
    name: &str,
    initial_values: &[T],
    options: ChannelOptions,
) -> Result<(Arc<ProcessArray<T>>, Arc<ProcessArray<T>>), PvError> {
    if options.number_of_buffers < 2 {
        return Err(PvError::InvalidArgument(
            "an array channel needs at least two buffers",
        ));
    }

    let full = Arc::new(BufferRing::new(options.number_of_buffers));
    // Room for every in-flight payload plus the two endpoint-resident ones,
    // so a transient imbalance never drops an allocation.
    let spares = Arc::new(BufferPool::new(options.number_of_buffers + 2));
    for _ in 0..options.number_of_buffers {
        spares.put(initial_values.to_vec());
    }

    let receiver = Arc::new(ProcessArray {
        name: name.to_string(),
        role: Role::Receiver,
        length: initial_values.len(),
        state: Spinlock::new(initial_state(initial_values)),
        full: Some(full.clone()),
        spares: Some(spares.clone()),
        peer: None,
        time_stamp_source: None,
        version_number_source: options.version_number_source.clone(),
        send_notification_listener: None,
    });
    let sender = Arc::new(ProcessArray {
        name: name.to_string(),
        role: Role::Sender,
        length: initial_values.len(),
        state: Spinlock::new(initial_state(initial_values)),
        full: Some(full),
        spares: Some(spares),
        peer: Some(receiver.clone()),
        time_stamp_source: options.time_stamp_source,
        version_number_source: options.version_number_source,
        send_notification_listener: options.send_notification_listener,
    });
    Ok((sender, receiver))
}
