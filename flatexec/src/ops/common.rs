use anyhow::{anyhow, Result};

use crate::registry::KernelArgs;
use crate::value::{Element, Scalar, Tensor};

/// Element type the builtin arithmetic kernels support.
pub(crate) trait Arith: Element {
    fn from_scalar(value: Scalar) -> Result<Self>;
    fn plus(self, rhs: Self) -> Self;
    fn minus(self, rhs: Self) -> Self;
    fn times(self, rhs: Self) -> Self;
}

macro_rules! int_arith {
    ($t:ty) => {
        impl Arith for $t {
            fn from_scalar(value: Scalar) -> Result<Self> {
                match value {
                    Scalar::Int(v) => <$t>::try_from(v)
                        .map_err(|_| anyhow!("scalar {} does not fit {}", v, stringify!($t))),
                    Scalar::Bool(v) => Ok(v as $t),
                    Scalar::Double(v) => {
                        Err(anyhow!("double scalar {} used with {} tensors", v, stringify!($t)))
                    }
                }
            }

            fn plus(self, rhs: Self) -> Self {
                self.wrapping_add(rhs)
            }

            fn minus(self, rhs: Self) -> Self {
                self.wrapping_sub(rhs)
            }

            fn times(self, rhs: Self) -> Self {
                self.wrapping_mul(rhs)
            }
        }
    };
}

macro_rules! float_arith {
    ($t:ty) => {
        impl Arith for $t {
            fn from_scalar(value: Scalar) -> Result<Self> {
                Ok(match value {
                    Scalar::Int(v) => v as $t,
                    Scalar::Double(v) => v as $t,
                    Scalar::Bool(v) => {
                        if v {
                            1.0
                        } else {
                            0.0
                        }
                    }
                })
            }

            fn plus(self, rhs: Self) -> Self {
                self + rhs
            }

            fn minus(self, rhs: Self) -> Self {
                self - rhs
            }

            fn times(self, rhs: Self) -> Self {
                self * rhs
            }
        }
    };
}

int_arith!(i32);
int_arith!(i64);
float_arith!(f32);
float_arith!(f64);

/// Call a generic kernel body for the arithmetic dtype of `$dtype`.
macro_rules! dispatch_arith {
    ($op:expr, $dtype:expr, $func:ident ( $($arg:expr),* $(,)? )) => {
        match $dtype {
            $crate::value::ScalarType::Int => $func::<i32>($($arg),*),
            $crate::value::ScalarType::Long => $func::<i64>($($arg),*),
            $crate::value::ScalarType::Float => $func::<f32>($($arg),*),
            $crate::value::ScalarType::Double => $func::<f64>($($arg),*),
            other => Err(anyhow::anyhow!("{} does not support dtype {:?}", $op, other)),
        }
    };
}

pub(crate) use dispatch_arith;

pub(crate) fn expect_args(op: &str, args: &KernelArgs<'_, '_>, count: usize) -> Result<()> {
    if args.len() != count {
        return Err(anyhow!(
            "{} expects {} arguments, got {}",
            op,
            count,
            args.len()
        ));
    }
    Ok(())
}

/// All tensors share the dtype and element count of the first.
pub(crate) fn expect_same_layout(op: &str, tensors: &[&Tensor<'_>]) -> Result<()> {
    let Some((first, rest)) = tensors.split_first() else {
        return Ok(());
    };
    for (pos, tensor) in rest.iter().enumerate() {
        if tensor.dtype() != first.dtype() {
            return Err(anyhow!(
                "{} tensor {} dtype {:?} differs from {:?}",
                op,
                pos + 1,
                tensor.dtype(),
                first.dtype()
            ));
        }
        if tensor.numel() != first.numel() {
            return Err(anyhow!(
                "{} tensor {} has {} elements, expected {}",
                op,
                pos + 1,
                tensor.numel(),
                first.numel()
            ));
        }
    }
    Ok(())
}
