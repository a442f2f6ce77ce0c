//! The type-erased process-variable handle and its shared vocabulary.

use std::any::Any;
use std::sync::Arc;

use thiserror::Error;

use crate::time_stamp::{TimeStamp, TimeStampSource};
use crate::value::ValueType;
use crate::version_number::{VersionNumber, VersionNumberSource};

/// Role of an endpoint within a process-variable channel.
///
/// Fixed at construction: a stand-alone variable has no peer, a sender/
/// receiver pair shares one buffer ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    StandAlone,
    Sender,
    Receiver,
}

/// Outcome of a successful `send`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// A free slot was available in the ring.
    Sent,
    /// The ring was full; the oldest undelivered value was dropped to make
    /// room. This is a normal return, not an error.
    OverflowDropped,
}

/// Error type for endpoint operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PvError {
    /// The operation is not allowed for this endpoint's role.
    #[error("operation not allowed for this endpoint's role")]
    WrongRole,
    /// A construction argument violated a contract.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}

/// Shared handle to a type-erased process variable.
pub type ProcessVariableRef = Arc<dyn ProcessVariable>;

/// Listener invoked with a process-variable handle.
///
/// Listeners run synchronously on the notifying thread and must not block.
pub trait ProcessVariableListener: Send + Sync {
    fn notify(&self, pv: &ProcessVariableRef);
}

impl<F> ProcessVariableListener for F
where
    F: Fn(&ProcessVariableRef) + Send + Sync,
{
    fn notify(&self, pv: &ProcessVariableRef) {
        self(pv)
    }
}

/// A named, typed value shared between the device side and the
/// control-system side of an application.
///
/// Each endpoint belongs to exactly one thread; the send/receive machinery
/// between the two endpoints of a pair is lock-free, but a single endpoint
/// must not be driven from two threads at once.
pub trait ProcessVariable: Send + Sync {
    /// The name identifying this process variable within its manager pair.
    fn name(&self) -> &str;

    /// Runtime tag of the element type.
    fn value_type(&self) -> ValueType;

    /// `true` for array variables, `false` for scalars.
    fn is_array(&self) -> bool;

    fn is_sender(&self) -> bool;

    fn is_receiver(&self) -> bool;

    /// Time stamp of the current value.
    fn time_stamp(&self) -> TimeStamp;

    /// Version number of the current value.
    ///
    /// This is the version received with the last accepted `receive` or sent
    /// with the last `send`, whichever happened later; while a version pinned
    /// by [`use_origin_version_number_for_next_send`] is armed, the pinned
    /// version is reported instead.
    ///
    /// [`use_origin_version_number_for_next_send`]: Self::use_origin_version_number_for_next_send
    fn version_number(&self) -> VersionNumber;

    /// Receive the next buffered value from the peer sender.
    ///
    /// Returns `Ok(true)` if a value was taken from the ring and adopted,
    /// `Ok(false)` if no value was available or the buffered value was stale
    /// (its version not greater than the current one while a version-number
    /// source is configured). Fails with [`PvError::WrongRole`] on
    /// non-receivers.
    fn receive(&self) -> Result<bool, PvError>;

    /// Send the current value to the peer receiver.
    ///
    /// Never blocks; see [`SendOutcome`] for the overflow behavior. Fails
    /// with [`PvError::WrongRole`] on non-senders.
    fn send(&self) -> Result<SendOutcome, PvError>;

    /// Force the next `send` to use `origin_version` instead of drawing a
    /// fresh number from the version-number source.
    ///
    /// Succeeds (and arms the pin) only when `origin_version` is greater
    /// than the current version. The pin is consumed by the next `send` and
    /// disarmed by an accepted `receive` above the pinned version.
    ///
    /// Use this when updating a variable with a value computed from another,
    /// just-received variable: variables depending on each other in a cycle
    /// then settle after one externally triggered update instead of looping.
    fn use_origin_version_number_for_next_send(&self, origin_version: VersionNumber) -> bool;

    /// Convenience form of [`use_origin_version_number_for_next_send`]
    /// taking the origin variable itself.
    ///
    /// [`use_origin_version_number_for_next_send`]: Self::use_origin_version_number_for_next_send
    fn use_origin_version_number_from(&self, origin: &dyn ProcessVariable) -> bool {
        self.use_origin_version_number_for_next_send(origin.version_number())
    }

    /// Upcast used by managers to downcast back to the typed endpoint.
    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// Options accepted by the synchronized-channel factories.
#[derive(Clone)]
pub struct ChannelOptions {
    /// How many values may be in flight without loss, i.e. how often `send`
    /// can be called in a row without an intervening `receive` before old
    /// values are dropped. Minimum 1 for scalars, 2 for arrays.
    pub number_of_buffers: usize,
    /// Stamps outgoing values; system clock when absent.
    pub time_stamp_source: Option<Arc<dyn TimeStampSource>>,
    /// Numbers outgoing values and enables the receiver's version gate.
    pub version_number_source: Option<Arc<dyn VersionNumberSource>>,
    /// Invoked with the peer receiver handle after every `send`.
    pub send_notification_listener: Option<Arc<dyn ProcessVariableListener>>,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            number_of_buffers: 2,
            time_stamp_source: None,
            version_number_source: None,
            send_notification_listener: None,
        }
    }
}
