//! Adapter coupling a real-time device loop to a control-system layer
//! through named, typed process variables.
//!
//! Each process variable is a scalar or fixed-length array of a primitive
//! numeric type, shared between exactly two endpoints on different threads.
//! Values travel through a lock-free buffer ring with version-based ordering
//! and overwrite-oldest overflow, so neither side ever blocks the other. A
//! [manager pair](manager::create_pv_manager) owns the registry and routes
//! send notifications into per-side queues; the
//! [synchronization utilities](sync_util::SynchronizationUtility) drain them
//! and dispatch per-variable listeners.

pub mod array;
pub mod manager;
pub mod notification;
pub mod process_variable;
pub mod scalar;
pub mod sync_util;
pub mod testing;
pub mod time_stamp;
pub mod value;
pub mod version_number;

pub use array::{ProcessArray, create_simple_process_array, create_synchronized_process_array};
pub use manager::{
    ControlSystemPvManager, DevicePvManager, ManagerError, PvManager, SynchronizationDirection,
    create_pv_manager,
};
pub use notification::NotificationQueue;
pub use process_variable::{
    ChannelOptions, ProcessVariable, ProcessVariableListener, ProcessVariableRef, PvError, Role,
    SendOutcome,
};
pub use scalar::{ProcessScalar, create_simple_process_scalar, create_synchronized_process_scalar};
pub use sync_util::{
    ControlSystemSynchronizationUtility, DeviceSynchronizationUtility, SynchronizationUtility,
};
pub use time_stamp::{TimeStamp, TimeStampSource};
pub use value::{ProcessValue, ValueType};
pub use version_number::{MonotonicVersionNumberSource, VersionNumber, VersionNumberSource};
