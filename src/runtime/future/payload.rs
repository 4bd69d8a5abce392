//! Future payloads
//!
//! A future holds one value from a closed set of numeric types, or an opaque
//! shared object. The tag makes every typed read checkable: asking for the
//! wrong type is a `TypeMismatch`, not a reinterpretation of raw bytes.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::runtime::error::{RuntimeError, RuntimeResult};

/// Type alias for shared opaque values
pub type OpaqueValue = Arc<dyn Any + Send + Sync>;

/// The type tag of a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    Int,
    Long,
    Float,
    Double,
    Opaque,
}

impl fmt::Display for PayloadKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let name = match self {
            PayloadKind::Int => "int",
            PayloadKind::Long => "long",
            PayloadKind::Float => "float",
            PayloadKind::Double => "double",
            PayloadKind::Opaque => "opaque",
        };
        f.write_str(name)
    }
}

/// The value carried by a ready future.
///
/// Cloning is cheap: opaque values are reference counted.
#[derive(Clone)]
pub enum Payload {
    /// 32-bit signed integer
    Int(i32),
    /// 64-bit signed integer
    Long(i64),
    /// 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
    /// Any other producer-defined value
    Opaque(OpaqueValue),
}

impl Payload {
    /// Wrap an arbitrary value as an opaque payload.
    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        Payload::Opaque(Arc::new(value))
    }

    /// The type tag of this payload.
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Int(_) => PayloadKind::Int,
            Payload::Long(_) => PayloadKind::Long,
            Payload::Float(_) => PayloadKind::Float,
            Payload::Double(_) => PayloadKind::Double,
            Payload::Opaque(_) => PayloadKind::Opaque,
        }
    }

    /// Read the payload as an `int`.
    pub fn as_int(&self) -> RuntimeResult<i32> {
        match self {
            Payload::Int(v) => Ok(*v),
            other => Err(other.mismatch(PayloadKind::Int)),
        }
    }

    /// Read the payload as a `long`.
    pub fn as_long(&self) -> RuntimeResult<i64> {
        match self {
            Payload::Long(v) => Ok(*v),
            other => Err(other.mismatch(PayloadKind::Long)),
        }
    }

    /// Read the payload as a `float`.
    pub fn as_float(&self) -> RuntimeResult<f32> {
        match self {
            Payload::Float(v) => Ok(*v),
            other => Err(other.mismatch(PayloadKind::Float)),
        }
    }

    /// Read the payload as a `double`.
    pub fn as_double(&self) -> RuntimeResult<f64> {
        match self {
            Payload::Double(v) => Ok(*v),
            other => Err(other.mismatch(PayloadKind::Double)),
        }
    }

    /// Downcast an opaque payload to its concrete type.
    pub fn downcast<T: Any + Send + Sync>(&self) -> RuntimeResult<Arc<T>> {
        match self {
            Payload::Opaque(value) => value
                .clone()
                .downcast::<T>()
                .map_err(|_| self.mismatch(PayloadKind::Opaque)),
            other => Err(other.mismatch(PayloadKind::Opaque)),
        }
    }

    fn mismatch(
        &self,
        expected: PayloadKind,
    ) -> RuntimeError {
        RuntimeError::TypeMismatch {
            expected,
            found: self.kind(),
        }
    }
}

impl PartialEq for Payload {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        match (self, other) {
            (Payload::Int(a), Payload::Int(b)) => a == b,
            (Payload::Long(a), Payload::Long(b)) => a == b,
            (Payload::Float(a), Payload::Float(b)) => a == b,
            (Payload::Double(a), Payload::Double(b)) => a == b,
            (Payload::Opaque(a), Payload::Opaque(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Payload::Int(v) => f.debug_tuple("Int").field(v).finish(),
            Payload::Long(v) => f.debug_tuple("Long").field(v).finish(),
            Payload::Float(v) => f.debug_tuple("Float").field(v).finish(),
            Payload::Double(v) => f.debug_tuple("Double").field(v).finish(),
            Payload::Opaque(_) => f.write_str("Opaque(..)"),
        }
    }
}

impl fmt::Display for Payload {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Payload::Int(v) => write!(f, "{}", v),
            Payload::Long(v) => write!(f, "{}", v),
            Payload::Float(v) => write!(f, "{}", v),
            Payload::Double(v) => write!(f, "{}", v),
            Payload::Opaque(_) => f.write_str("<opaque>"),
        }
    }
}

impl From<i32> for Payload {
    fn from(val: i32) -> Self {
        Payload::Int(val)
    }
}

impl From<i64> for Payload {
    fn from(val: i64) -> Self {
        Payload::Long(val)
    }
}

impl From<f32> for Payload {
    fn from(val: f32) -> Self {
        Payload::Float(val)
    }
}

impl From<f64> for Payload {
    fn from(val: f64) -> Self {
        Payload::Double(val)
    }
}
