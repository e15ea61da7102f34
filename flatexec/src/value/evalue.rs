use std::fmt;

use crate::error::{Error, Result};

use super::{Scalar, Tensor};

/// Variant tag of an [`EValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    None,
    Tensor,
    Int,
    Double,
    Bool,
}

impl Tag {
    pub fn name(self) -> &'static str {
        match self {
            Tag::None => "None",
            Tag::Tensor => "Tensor",
            Tag::Int => "Int",
            Tag::Double => "Double",
            Tag::Bool => "Bool",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Runtime value stored in a plan's value table.
///
/// `Int`, `Double` and `Bool` are the scalar variants. A tensor value owns
/// its metadata exclusively; the bytes stay in the pool it was resolved to.
#[derive(Debug, Default)]
pub enum EValue<'p> {
    #[default]
    None,
    Tensor(Tensor<'p>),
    Int(i64),
    Double(f64),
    Bool(bool),
}

impl<'p> EValue<'p> {
    pub fn tag(&self) -> Tag {
        match self {
            EValue::None => Tag::None,
            EValue::Tensor(_) => Tag::Tensor,
            EValue::Int(_) => Tag::Int,
            EValue::Double(_) => Tag::Double,
            EValue::Bool(_) => Tag::Bool,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, EValue::None)
    }

    pub fn is_tensor(&self) -> bool {
        matches!(self, EValue::Tensor(_))
    }

    pub fn is_int(&self) -> bool {
        matches!(self, EValue::Int(_))
    }

    pub fn is_double(&self) -> bool {
        matches!(self, EValue::Double(_))
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, EValue::Bool(_))
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, EValue::Int(_) | EValue::Double(_) | EValue::Bool(_))
    }

    pub fn as_tensor(&self) -> Result<&Tensor<'p>> {
        match self {
            EValue::Tensor(tensor) => Ok(tensor),
            other => Err(other.mismatch(Tag::Tensor.name())),
        }
    }

    pub fn to_int(&self) -> Result<i64> {
        match self {
            EValue::Int(value) => Ok(*value),
            other => Err(other.mismatch(Tag::Int.name())),
        }
    }

    pub fn to_double(&self) -> Result<f64> {
        match self {
            EValue::Double(value) => Ok(*value),
            other => Err(other.mismatch(Tag::Double.name())),
        }
    }

    pub fn to_bool(&self) -> Result<bool> {
        match self {
            EValue::Bool(value) => Ok(*value),
            other => Err(other.mismatch(Tag::Bool.name())),
        }
    }

    pub fn to_scalar(&self) -> Result<Scalar> {
        match self {
            EValue::Int(value) => Ok(Scalar::Int(*value)),
            EValue::Double(value) => Ok(Scalar::Double(*value)),
            EValue::Bool(value) => Ok(Scalar::Bool(*value)),
            other => Err(other.mismatch("Scalar")),
        }
    }

    fn mismatch(&self, expected: &'static str) -> Error {
        Error::TypeMismatch {
            expected,
            actual: self.tag().name(),
        }
    }
}

impl From<Scalar> for EValue<'_> {
    fn from(value: Scalar) -> Self {
        match value {
            Scalar::Bool(v) => EValue::Bool(v),
            Scalar::Int(v) => EValue::Int(v),
            Scalar::Double(v) => EValue::Double(v),
        }
    }
}

impl From<i64> for EValue<'_> {
    fn from(value: i64) -> Self {
        EValue::Int(value)
    }
}

impl From<f64> for EValue<'_> {
    fn from(value: f64) -> Self {
        EValue::Double(value)
    }
}

impl From<bool> for EValue<'_> {
    fn from(value: bool) -> Self {
        EValue::Bool(value)
    }
}

impl<'p> From<Tensor<'p>> for EValue<'p> {
    fn from(value: Tensor<'p>) -> Self {
        EValue::Tensor(value)
    }
}
