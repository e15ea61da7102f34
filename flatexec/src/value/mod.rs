mod dtype;
mod evalue;
mod scalar;
mod tensor;

pub use dtype::{Element, ScalarType};
pub use evalue::{EValue, Tag};
pub use scalar::Scalar;
pub use tensor::{byte_len, numel, Elements, ElementsMut, Tensor};
