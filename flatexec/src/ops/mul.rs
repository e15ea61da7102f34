use anyhow::Result;

use crate::registry::KernelArgs;
use crate::value::Tensor;

use super::common::{dispatch_arith, expect_args, expect_same_layout, Arith};

const OP: &str = "mul_out";

/// `out = a * b`, arguments `(a, b, out)`.
pub fn mul_out(args: &mut KernelArgs<'_, '_>) -> Result<()> {
    expect_args(OP, args, 3)?;
    let a = args.tensor(0)?;
    let b = args.tensor(1)?;
    let out = args.tensor(2)?;
    expect_same_layout(OP, &[a, b, out])?;
    dispatch_arith!(OP, out.dtype(), mul_typed(a, b, out))
}

fn mul_typed<T: Arith>(a: &Tensor<'_>, b: &Tensor<'_>, out: &Tensor<'_>) -> Result<()> {
    let a = a.elements::<T>()?;
    let b = b.elements::<T>()?;
    let out = out.elements_mut::<T>()?;
    for idx in 0..out.len() {
        out.set(idx, a.get(idx).times(b.get(idx)));
    }
    Ok(())
}
