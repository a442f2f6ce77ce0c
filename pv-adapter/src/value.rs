//! Runtime element-type tags for process variables.

use std::fmt;

/// Runtime tag identifying a process variable's element type.
///
/// Managers compare this tag (together with the scalar/array shape flag) on
/// typed lookups, so a mismatching `get` fails instead of downcasting to the
/// wrong endpoint type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// 8-bit signed integer (`i8`)
    Int8,
    /// 8-bit unsigned integer (`u8`)
    UInt8,
    /// 16-bit signed integer (`i16`)
    Int16,
    /// 16-bit unsigned integer (`u16`)
    UInt16,
    /// 32-bit signed integer (`i32`)
    Int32,
    /// 32-bit unsigned integer (`u32`)
    UInt32,
    /// 32-bit IEEE float (`f32`)
    Float32,
    /// 64-bit IEEE float (`f64`)
    Float64,
}

impl ValueType {
    pub fn name(&self) -> &'static str {
        match self {
            ValueType::Int8 => "i8",
            ValueType::UInt8 => "u8",
            ValueType::Int16 => "i16",
            ValueType::UInt16 => "u16",
            ValueType::Int32 => "i32",
            ValueType::UInt32 => "u32",
            ValueType::Float32 => "f32",
            ValueType::Float64 => "f64",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Element types a process variable can carry.
///
/// Implemented exactly for the eight supported primitives. Values are moved
/// or copied bit-for-bit; the adapter performs no arithmetic on them, so
/// float payloads (including NaN bit patterns) survive a round trip
/// unchanged.
pub trait ProcessValue:
    Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static
{
    const VALUE_TYPE: ValueType;
}

macro_rules! impl_process_value {
    ($($ty:ty => $tag:ident),* $(,)?) => {
        $(
            impl ProcessValue for $ty {
                const VALUE_TYPE: ValueType = ValueType::$tag;
            }
        )*
    };
}

impl_process_value! {
    i8 => Int8,
    u8 => UInt8,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    f32 => Float32,
    f64 => Float64,
}
