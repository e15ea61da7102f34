//! Builtin elementwise operators.
//!
//! | name      | arguments              | result                      |
//! |-----------|------------------------|-----------------------------|
//! | `mul_out` | `a, b, out`            | `out[i] = a[i] * b[i]`      |
//! | `add_out` | `a, b, alpha, out`     | `out[i] = a[i] + alpha*b[i]`|
//! | `sub_out` | `a, b, alpha, out`     | `out[i] = a[i] - alpha*b[i]`|
//!
//! All tensors must share one dtype (i32, i64, f32 or f64) and element
//! count. `alpha` is a scalar; integer tensors reject a `Double` alpha.
//! Integer arithmetic wraps.
use once_cell::sync::Lazy;

use crate::registry::Operator;

mod add;
mod common;
mod mul;
mod sub;

pub use add::add_out;
pub use mul::mul_out;
pub use sub::sub_out;

pub static BUILTINS: Lazy<Vec<Operator>> = Lazy::new(|| {
    vec![
        Operator::new("mul_out", mul_out),
        Operator::new("add_out", add_out),
        Operator::new("sub_out", sub_out),
    ]
});
