use std::fmt;
use std::ops::{Deref, Range};
use std::sync::Arc;

use memmap2::Mmap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Byte range inside a memory-mapped container file.
#[derive(Clone)]
pub struct MappedSlice {
    mmap: Arc<Mmap>,
    range: Range<usize>,
}

impl MappedSlice {
    pub(crate) fn new(mmap: Arc<Mmap>, range: Range<usize>) -> Self {
        Self { mmap, range }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap[self.range.clone()]
    }
}

/// Backing bytes of pool 0.
///
/// Built and JSON-decoded programs own their constants. Programs opened from
/// a container file keep them in the file mapping and are never copied.
#[derive(Clone)]
pub enum ConstantBuffer {
    Owned(Vec<u8>),
    Mapped(MappedSlice),
}

impl ConstantBuffer {
    pub fn as_slice(&self) -> &[u8] {
        match self {
            ConstantBuffer::Owned(bytes) => bytes,
            ConstantBuffer::Mapped(slice) => slice.as_bytes(),
        }
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self, ConstantBuffer::Mapped(_))
    }
}

impl Default for ConstantBuffer {
    fn default() -> Self {
        ConstantBuffer::Owned(Vec::new())
    }
}

impl Deref for ConstantBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl From<Vec<u8>> for ConstantBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        ConstantBuffer::Owned(bytes)
    }
}

impl PartialEq for ConstantBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl fmt::Debug for ConstantBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_mapped() { "Mapped" } else { "Owned" };
        f.debug_struct("ConstantBuffer")
            .field("kind", &kind)
            .field("len", &self.len())
            .finish()
    }
}

impl Serialize for ConstantBuffer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_slice().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ConstantBuffer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<u8>::deserialize(deserializer).map(ConstantBuffer::Owned)
    }
}
