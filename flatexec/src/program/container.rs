//! Binary program container.
//!
//! Layout (little-endian):
//!
//! ```text
//! magic          8  "FXPG\0\0\0\0"
//! version        u32
//! flags          u32 (0)
//! schema_offset  u64
//! schema_nbytes  u64
//! data_offset    u64 (8-byte aligned)
//! data_nbytes    u64
//! file_size      u64
//! schema         JSON of version + execution plans
//! data           constant buffer
//! ```
use std::fs::{self, File};
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use memmap2::Mmap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::{ConstantBuffer, ExecutionPlan, MappedSlice, Program};

const MAGIC: &[u8; 8] = b"FXPG\0\0\0\0";
const CONTAINER_VERSION: u32 = 1;
const HEADER_SIZE: usize = 56;
const DATA_ALIGN: usize = 8;

#[derive(Serialize)]
struct SchemaRef<'a> {
    version: u32,
    execution_plans: &'a [ExecutionPlan],
}

#[derive(Deserialize)]
struct Schema {
    version: u32,
    execution_plans: Vec<ExecutionPlan>,
}

impl Program {
    /// Encode into the binary container.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let schema = serde_json::to_vec(&SchemaRef {
            version: self.version,
            execution_plans: &self.execution_plans,
        })?;
        let schema_offset = HEADER_SIZE;
        let data_offset = align_up(schema_offset + schema.len(), DATA_ALIGN);
        let file_size = data_offset + self.constant_buffer.len();

        let mut out = Vec::with_capacity(file_size);
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&CONTAINER_VERSION.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        for field in [
            schema_offset,
            schema.len(),
            data_offset,
            self.constant_buffer.len(),
            file_size,
        ] {
            out.extend_from_slice(&(field as u64).to_le_bytes());
        }
        out.extend_from_slice(&schema);
        out.resize(data_offset, 0);
        out.extend_from_slice(&self.constant_buffer);
        Ok(out)
    }

    /// Decode a binary container, copying the constant section.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let sections = Sections::parse(data)?;
        let schema = sections.schema(data)?;
        Ok(Program {
            version: schema.version,
            execution_plans: schema.execution_plans,
            constant_buffer: data[sections.data].to_vec().into(),
        })
    }

    /// Memory-map and decode a container file. The constant buffer stays in
    /// the mapping.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        // SAFETY: the file must not be modified while the program is alive;
        // the constant buffer is read straight out of the mapping.
        let mmap = Arc::new(unsafe { Mmap::map(&file)? });
        let sections = Sections::parse(&mmap[..])?;
        let schema = sections.schema(&mmap[..])?;
        let program = Program {
            version: schema.version,
            execution_plans: schema.execution_plans,
            constant_buffer: ConstantBuffer::Mapped(MappedSlice::new(mmap, sections.data)),
        };
        crate::trace!(
            "opened program {} ({} plans, {} constant bytes)",
            path.as_ref().display(),
            program.num_plans(),
            program.constant_buffer.len()
        );
        Ok(program)
    }

    /// Write the container to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_bytes()?)?;
        Ok(())
    }
}

/// Validated byte ranges of a container.
struct Sections {
    schema: Range<usize>,
    data: Range<usize>,
}

impl Sections {
    fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(Error::invalid_program("file too small for FXPG header"));
        }
        let mut cursor = 0usize;
        if read_bytes(data, &mut cursor, MAGIC.len())? != MAGIC {
            return Err(Error::invalid_program("invalid FXPG magic"));
        }
        let version = read_u32(data, &mut cursor)?;
        if version != CONTAINER_VERSION {
            return Err(Error::invalid_program(format!(
                "unsupported FXPG version {}",
                version
            )));
        }
        if read_u32(data, &mut cursor)? != 0 {
            return Err(Error::invalid_program("FXPG flags must be 0"));
        }
        let schema_offset = read_u64(data, &mut cursor)?;
        let schema_nbytes = read_u64(data, &mut cursor)?;
        let data_offset = read_u64(data, &mut cursor)?;
        let data_nbytes = read_u64(data, &mut cursor)?;
        let file_size = read_u64(data, &mut cursor)?;

        if file_size != data.len() {
            return Err(Error::invalid_program("file size mismatch"));
        }
        if schema_offset < HEADER_SIZE {
            return Err(Error::invalid_program("schema overlaps header"));
        }
        if data_offset % DATA_ALIGN != 0 {
            return Err(Error::invalid_program("data section offset not aligned"));
        }
        let schema_end = schema_offset
            .checked_add(schema_nbytes)
            .ok_or_else(|| Error::invalid_program("schema section overflows"))?;
        let data_end = data_offset
            .checked_add(data_nbytes)
            .ok_or_else(|| Error::invalid_program("data section overflows"))?;
        if schema_end > data_offset {
            return Err(Error::invalid_program("FXPG sections are not ascending"));
        }
        if data_end != file_size {
            return Err(Error::invalid_program("data section out of bounds"));
        }
        Ok(Self {
            schema: schema_offset..schema_end,
            data: data_offset..data_end,
        })
    }

    fn schema(&self, data: &[u8]) -> Result<Schema> {
        Ok(serde_json::from_slice(&data[self.schema.clone()])?)
    }
}

fn read_bytes<'a>(data: &'a [u8], cursor: &mut usize, len: usize) -> Result<&'a [u8]> {
    let end = cursor
        .checked_add(len)
        .filter(|end| *end <= data.len())
        .ok_or_else(|| Error::invalid_program("unexpected EOF"))?;
    let out = &data[*cursor..end];
    *cursor = end;
    Ok(out)
}

fn read_u32(data: &[u8], cursor: &mut usize) -> Result<u32> {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(read_bytes(data, cursor, 4)?);
    Ok(u32::from_le_bytes(buf))
}

fn read_u64(data: &[u8], cursor: &mut usize) -> Result<usize> {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(read_bytes(data, cursor, 8)?);
    usize::try_from(u64::from_le_bytes(buf))
        .map_err(|_| Error::invalid_program("offset does not fit in usize"))
}

fn align_up(value: usize, alignment: usize) -> usize {
    (value + alignment - 1) / alignment * alignment
}
