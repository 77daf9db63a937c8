// SPDX-License-Identifier: PMPL-1.0-or-later
//
// The message value model.
//
// Everything that can travel over a CaptureKit channel is a `Value`. The
// three domain types are explicit variants rather than maps inspected for
// distinguishing keys: the sum type makes the codec's dispatch total and
// lets the compiler prove every shape is handled.

use capturekit_core::{CompressionResult, ScanOptions, ScanResult};

/// One value on the wire.
///
/// Maps preserve insertion order and are represented as pair lists; the
/// protocol never relies on map key lookup, only on round-tripping.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    F64(f64),
    Str(String),
    /// Contiguous byte payload (tag 8).
    U8List(Vec<u8>),
    I32List(Vec<i32>),
    I64List(Vec<i64>),
    F64List(Vec<f64>),
    F32List(Vec<f32>),
    List(Vec<Value>),
    Map(Vec<(Value, Value)>),
    ScanOptions(ScanOptions),
    ScanResult(ScanResult),
    CompressionResult(CompressionResult),
}

impl Value {
    /// String payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Integer payload. Both integer widths are accepted: the standard
    /// codec narrows small integers to 32 bits on the wire.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::I32(v) => Some(*v as i64),
            Self::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Whether this is the null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::I64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::F64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Option<String>> for Value {
    fn from(v: Option<String>) -> Self {
        match v {
            Some(s) => Self::Str(s),
            None => Self::Null,
        }
    }
}

impl From<ScanOptions> for Value {
    fn from(v: ScanOptions) -> Self {
        Self::ScanOptions(v)
    }
}

impl From<ScanResult> for Value {
    fn from(v: ScanResult) -> Self {
        Self::ScanResult(v)
    }
}

impl From<CompressionResult> for Value {
    fn from(v: CompressionResult) -> Self {
        Self::CompressionResult(v)
    }
}
