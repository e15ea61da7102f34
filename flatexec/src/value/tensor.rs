//! Tensor metadata bound to pool storage.
//!
//! A `Tensor` never owns its bytes. They live in a constant buffer or a host
//! pool and are reached through a [`Storage`] descriptor that the memory
//! manager validated at load time. Element access goes through
//! [`Elements`] / [`ElementsMut`], which read and write through the raw
//! address instead of handing out slices, so one operator call may read and
//! write aliasing tensors.
use std::fmt;
use std::marker::PhantomData;
use std::mem::size_of;
use std::ptr;

use crate::error::{Error, Result};
use crate::memory::Storage;

use super::{Element, ScalarType};

/// Element count of a shape. A rank-0 shape holds one element.
pub fn numel(sizes: &[usize]) -> usize {
    sizes.iter().copied().product::<usize>()
}

/// Byte length of a tensor, `None` on overflow.
pub fn byte_len(dtype: ScalarType, sizes: &[usize]) -> Option<usize> {
    sizes
        .iter()
        .try_fold(1usize, |acc, dim| acc.checked_mul(*dim))?
        .checked_mul(dtype.element_size())
}

pub struct Tensor<'p> {
    dtype: ScalarType,
    sizes: Vec<usize>,
    storage: Storage<'p>,
}

impl<'p> Tensor<'p> {
    /// Bind tensor metadata to a resolved storage range. The range must be
    /// exactly `numel(sizes) * element_size(dtype)` bytes.
    pub fn new(dtype: ScalarType, sizes: Vec<usize>, storage: Storage<'p>) -> Result<Self> {
        let expected = byte_len(dtype, &sizes)
            .ok_or_else(|| Error::invalid_program("tensor byte length overflows usize"))?;
        if storage.nbytes() != expected {
            return Err(Error::ElementCount {
                expected,
                actual: storage.nbytes(),
            });
        }
        Ok(Self {
            dtype,
            sizes,
            storage,
        })
    }

    pub fn dtype(&self) -> ScalarType {
        self.dtype
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Rank of the tensor.
    pub fn dim(&self) -> usize {
        self.sizes.len()
    }

    pub fn size(&self, dim: usize) -> Option<usize> {
        self.sizes.get(dim).copied()
    }

    pub fn numel(&self) -> usize {
        numel(&self.sizes)
    }

    pub fn nbytes(&self) -> usize {
        self.storage.nbytes()
    }

    pub fn storage(&self) -> &Storage<'p> {
        &self.storage
    }

    pub fn is_constant(&self) -> bool {
        !self.storage.is_writable()
    }

    /// Read-only typed view. `T` must match the tensor dtype.
    pub fn elements<T: Element>(&self) -> Result<Elements<'_, T>> {
        self.check_element::<T>()?;
        Ok(Elements {
            base: self.storage.as_ptr(),
            len: self.numel(),
            _marker: PhantomData,
        })
    }

    /// Writable typed view. Fails for constant tensors.
    pub fn elements_mut<T: Element>(&self) -> Result<ElementsMut<'_, T>> {
        self.check_element::<T>()?;
        if !self.storage.is_writable() {
            return Err(Error::ReadOnlyTensor);
        }
        Ok(ElementsMut {
            base: self.storage.as_ptr(),
            len: self.numel(),
            _marker: PhantomData,
        })
    }

    /// Copy the elements out into a vector.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        self.check_element::<T>()?;
        let mut out = vec![T::zeroed(); self.numel()];
        let dst: &mut [u8] = bytemuck::cast_slice_mut(&mut out);
        // SAFETY: storage covers exactly `nbytes` bytes, validated at resolve.
        unsafe {
            ptr::copy_nonoverlapping(self.storage.as_ptr(), dst.as_mut_ptr(), dst.len());
        }
        Ok(out)
    }

    /// Overwrite every element from `src`.
    pub fn copy_from_slice<T: Element>(&self, src: &[T]) -> Result<()> {
        let view = self.elements_mut::<T>()?;
        if src.len() != view.len() {
            return Err(Error::ElementCount {
                expected: view.len(),
                actual: src.len(),
            });
        }
        let bytes: &[u8] = bytemuck::cast_slice(src);
        // SAFETY: writable storage of exactly `bytes.len()` bytes.
        unsafe {
            ptr::copy_nonoverlapping(bytes.as_ptr(), view.base, bytes.len());
        }
        Ok(())
    }

    /// Raw bytes of the tensor.
    pub fn bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.nbytes()];
        // SAFETY: storage covers exactly `nbytes` bytes, validated at resolve.
        unsafe {
            ptr::copy_nonoverlapping(self.storage.as_ptr(), out.as_mut_ptr(), out.len());
        }
        out
    }

    fn check_element<T: Element>(&self) -> Result<()> {
        if T::DTYPE != self.dtype {
            return Err(Error::TypeMismatch {
                expected: self.dtype.name(),
                actual: T::DTYPE.name(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for Tensor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("dtype", &self.dtype)
            .field("sizes", &self.sizes)
            .field("pool", &self.storage.pool())
            .field("offset", &self.storage.offset())
            .field("nbytes", &self.storage.nbytes())
            .finish()
    }
}

/// Read-only typed view over tensor storage.
#[derive(Clone, Copy)]
pub struct Elements<'a, T> {
    base: *const u8,
    len: usize,
    _marker: PhantomData<&'a T>,
}

impl<'a, T: Element> Elements<'a, T> {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, index: usize) -> T {
        assert!(index < self.len, "element {} out of {}", index, self.len);
        // SAFETY: index is in bounds and storage holds `len` elements.
        unsafe {
            self.base
                .add(index * size_of::<T>())
                .cast::<T>()
                .read_unaligned()
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + 'a {
        let view = *self;
        (0..view.len).map(move |idx| view.get(idx))
    }
}

/// Writable typed view over tensor storage.
pub struct ElementsMut<'a, T> {
    base: *mut u8,
    len: usize,
    _marker: PhantomData<&'a T>,
}

impl<'a, T: Element> ElementsMut<'a, T> {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, index: usize) -> T {
        assert!(index < self.len, "element {} out of {}", index, self.len);
        // SAFETY: index is in bounds and storage holds `len` elements.
        unsafe {
            self.base
                .add(index * size_of::<T>())
                .cast::<T>()
                .read_unaligned()
        }
    }

    pub fn set(&self, index: usize, value: T) {
        assert!(index < self.len, "element {} out of {}", index, self.len);
        // SAFETY: index is in bounds and storage is a writable host pool.
        unsafe {
            self.base
                .add(index * size_of::<T>())
                .cast::<T>()
                .write_unaligned(value)
        }
    }

    pub fn fill(&self, value: T) {
        for idx in 0..self.len {
            self.set(idx, value);
        }
    }
}
