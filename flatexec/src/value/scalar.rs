use crate::error::{Error, Result};

/// Immutable scalar value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Double(f64),
}

impl Scalar {
    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Bool(_) => "Bool",
            Scalar::Int(_) => "Int",
            Scalar::Double(_) => "Double",
        }
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Scalar::Bool(_))
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Scalar::Int(_))
    }

    pub fn is_double(&self) -> bool {
        matches!(self, Scalar::Double(_))
    }

    pub fn to_bool(&self) -> Result<bool> {
        match self {
            Scalar::Bool(value) => Ok(*value),
            other => Err(mismatch("Bool", other)),
        }
    }

    pub fn to_int(&self) -> Result<i64> {
        match self {
            Scalar::Int(value) => Ok(*value),
            other => Err(mismatch("Int", other)),
        }
    }

    pub fn to_double(&self) -> Result<f64> {
        match self {
            Scalar::Double(value) => Ok(*value),
            other => Err(mismatch("Double", other)),
        }
    }
}

fn mismatch(expected: &'static str, actual: &Scalar) -> Error {
    Error::TypeMismatch {
        expected,
        actual: actual.type_name(),
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Double(value)
    }
}
