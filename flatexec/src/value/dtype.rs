use crate::error::{Error, Result};

/// Tensor element type. The discriminants are the `i8` codes used on the
/// wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Byte = 0,
    Char = 1,
    Short = 2,
    Int = 3,
    Long = 4,
    Half = 5,
    Float = 6,
    Double = 7,
    Bool = 11,
}

impl ScalarType {
    /// Decode a wire dtype code.
    pub fn from_code(code: i8) -> Result<Self> {
        match code {
            0 => Ok(ScalarType::Byte),
            1 => Ok(ScalarType::Char),
            2 => Ok(ScalarType::Short),
            3 => Ok(ScalarType::Int),
            4 => Ok(ScalarType::Long),
            5 => Ok(ScalarType::Half),
            6 => Ok(ScalarType::Float),
            7 => Ok(ScalarType::Double),
            11 => Ok(ScalarType::Bool),
            _ => Err(Error::UnknownDType(code)),
        }
    }

    pub fn code(self) -> i8 {
        self as i8
    }

    /// Size of one element in bytes.
    pub fn element_size(self) -> usize {
        match self {
            ScalarType::Byte | ScalarType::Char | ScalarType::Bool => 1,
            ScalarType::Short | ScalarType::Half => 2,
            ScalarType::Int | ScalarType::Float => 4,
            ScalarType::Long | ScalarType::Double => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ScalarType::Byte => "u8",
            ScalarType::Char => "i8",
            ScalarType::Short => "i16",
            ScalarType::Int => "i32",
            ScalarType::Long => "i64",
            ScalarType::Half => "f16",
            ScalarType::Float => "f32",
            ScalarType::Double => "f64",
            ScalarType::Bool => "bool",
        }
    }
}

/// Rust element type with a matching [`ScalarType`].
///
/// `Half` and `Bool` tensors have no element type; read them through
/// [`crate::Tensor::bytes`].
pub trait Element: bytemuck::Pod {
    const DTYPE: ScalarType;
}

macro_rules! impl_element {
    ($t:ty, $dtype:ident) => {
        impl Element for $t {
            const DTYPE: ScalarType = ScalarType::$dtype;
        }
    };
}

impl_element!(u8, Byte);
impl_element!(i8, Char);
impl_element!(i16, Short);
impl_element!(i32, Int);
impl_element!(i64, Long);
impl_element!(f32, Float);
impl_element!(f64, Double);
