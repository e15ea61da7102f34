use anyhow::Result;

use crate::registry::KernelArgs;
use crate::value::{Scalar, Tensor};

use super::common::{dispatch_arith, expect_args, expect_same_layout, Arith};

const OP: &str = "sub_out";

/// `out = a - alpha * b`, arguments `(a, b, alpha, out)`.
pub fn sub_out(args: &mut KernelArgs<'_, '_>) -> Result<()> {
    expect_args(OP, args, 4)?;
    let a = args.tensor(0)?;
    let b = args.tensor(1)?;
    let alpha = args.scalar(2)?;
    let out = args.tensor(3)?;
    expect_same_layout(OP, &[a, b, out])?;
    dispatch_arith!(OP, out.dtype(), sub_typed(a, b, alpha, out))
}

fn sub_typed<T: Arith>(
    a: &Tensor<'_>,
    b: &Tensor<'_>,
    alpha: Scalar,
    out: &Tensor<'_>,
) -> Result<()> {
    let alpha = T::from_scalar(alpha)?;
    let a = a.elements::<T>()?;
    let b = b.elements::<T>()?;
    let out = out.elements_mut::<T>()?;
    for idx in 0..out.len() {
        out.set(idx, a.get(idx).minus(alpha.times(b.get(idx))));
    }
    Ok(())
}
