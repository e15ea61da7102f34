//! Address translation over host pools.
//!
//! Pool 0 is the constant pool; its base is the program's constant buffer
//! and is bound by the loader. Pools 1.. are read-write byte regions the host
//! lends to the executor for its lifetime. `resolve` is the only way to
//! obtain a [`Storage`], so every storage range in a loaded plan has been
//! bounds-checked exactly once.
use std::cell::Cell;
use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::error::{Error, Result};

/// Pool id of the constant pool.
pub const CONSTANT_POOL: u32 = 0;

#[derive(Debug, Clone, Copy)]
struct Region {
    base: NonNull<u8>,
    capacity: usize,
}

#[derive(Debug)]
enum PoolKind {
    Constant(Option<Region>),
    ReadWrite(Region),
}

/// One slot of the memory manager's pool table.
#[derive(Debug)]
pub struct MemoryPool<'p> {
    kind: PoolKind,
    _marker: PhantomData<&'p mut [u8]>,
}

impl<'p> MemoryPool<'p> {
    /// Placeholder for pool 0, bound to the constant buffer at load.
    pub fn constant() -> Self {
        Self {
            kind: PoolKind::Constant(None),
            _marker: PhantomData,
        }
    }

    /// Read-write pool spanning the whole buffer.
    pub fn new(buffer: &'p mut [u8]) -> Self {
        let capacity = buffer.len();
        Self::read_write(buffer, capacity)
    }

    /// Read-write pool with a declared capacity no larger than the buffer.
    pub fn with_capacity(buffer: &'p mut [u8], capacity: usize) -> Result<Self> {
        if capacity > buffer.len() {
            return Err(Error::InvalidPool(format!(
                "declared capacity {} exceeds buffer length {}",
                capacity,
                buffer.len()
            )));
        }
        Ok(Self::read_write(buffer, capacity))
    }

    fn read_write(buffer: &'p mut [u8], capacity: usize) -> Self {
        let base = NonNull::from(buffer).cast::<u8>();
        Self {
            kind: PoolKind::ReadWrite(Region { base, capacity }),
            _marker: PhantomData,
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        match &self.kind {
            PoolKind::Constant(region) => region.map(|r| r.capacity),
            PoolKind::ReadWrite(region) => Some(region.capacity),
        }
    }
}

/// Pool table used by the loader to turn `(pool, offset)` into storage.
#[derive(Debug)]
pub struct MemoryManager<'p> {
    pools: Vec<MemoryPool<'p>>,
}

impl<'p> MemoryManager<'p> {
    /// Build the pool table. Slot 0 must be [`MemoryPool::constant`]; the
    /// other slots must be read-write pools.
    pub fn new(pools: Vec<MemoryPool<'p>>) -> Result<Self> {
        match pools.first() {
            Some(MemoryPool {
                kind: PoolKind::Constant(_),
                ..
            }) => {}
            Some(_) => {
                return Err(Error::InvalidPool(
                    "pool 0 is reserved for the constant buffer".to_string(),
                ))
            }
            None => return Err(Error::InvalidPool("pool table is empty".to_string())),
        }
        if let Some(idx) = pools
            .iter()
            .skip(1)
            .position(|pool| matches!(pool.kind, PoolKind::Constant(_)))
        {
            return Err(Error::InvalidPool(format!(
                "pool {} is a constant placeholder; only pool 0 may be",
                idx + 1
            )));
        }
        Ok(Self { pools })
    }

    pub fn num_pools(&self) -> usize {
        self.pools.len()
    }

    /// Declared capacity of a pool, `None` for unknown or unbound pools.
    pub fn capacity(&self, pool: u32) -> Option<usize> {
        self.pools.get(pool as usize)?.capacity()
    }

    /// Point pool 0 at the program's constant buffer.
    pub fn bind_constant(&mut self, data: &'p [u8]) {
        let region = Region {
            base: NonNull::from(data).cast::<u8>(),
            capacity: data.len(),
        };
        self.pools[CONSTANT_POOL as usize].kind = PoolKind::Constant(Some(region));
    }

    /// Translate `(pool, offset)` into a storage range of `nbytes` bytes.
    pub fn resolve(&self, pool: u32, offset: usize, nbytes: usize) -> Result<Storage<'p>> {
        let slot = self
            .pools
            .get(pool as usize)
            .ok_or(Error::UnknownPool { pool })?;
        let (region, writable) = match slot.kind {
            PoolKind::Constant(Some(region)) => (region, false),
            PoolKind::Constant(None) => return Err(Error::UnknownPool { pool }),
            PoolKind::ReadWrite(region) => (region, true),
        };
        let end = offset.checked_add(nbytes);
        if end.map_or(true, |end| end > region.capacity) {
            return Err(Error::PoolOutOfBounds {
                pool,
                offset,
                nbytes,
                capacity: region.capacity,
            });
        }
        // SAFETY: offset + nbytes <= capacity <= length of the lent buffer.
        let ptr = unsafe { NonNull::new_unchecked(region.base.as_ptr().add(offset)) };
        Ok(Storage {
            ptr,
            pool,
            offset,
            nbytes,
            writable,
            _marker: PhantomData,
        })
    }
}

/// Bounds-checked storage range inside a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Storage<'p> {
    ptr: NonNull<u8>,
    pool: u32,
    offset: usize,
    nbytes: usize,
    writable: bool,
    _marker: PhantomData<&'p Cell<u8>>,
}

impl<'p> Storage<'p> {
    pub fn pool(&self) -> u32 {
        self.pool
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn nbytes(&self) -> usize {
        self.nbytes
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Live address of the first byte.
    pub fn addr(&self) -> usize {
        self.ptr.as_ptr() as usize
    }

    pub(crate) fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }
}
