#![allow(dead_code)]

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;

use anyhow::Result;
use flatexec::{
    ChainBuilder, EValue, MemoryManager, MemoryPool, Program, ProgramBuilder, ScalarType,
    StorageId,
};

pub const A_DATA: [i32; 4] = [1, 2, 3, 4];
pub const B_DATA: [i32; 4] = [5, 6, 7, 8];

/// Value-table layout of the mul/add program.
pub struct MulAdd {
    pub a: usize,
    pub b: usize,
    pub c: usize,
    pub x: usize,
    pub y: usize,
    pub z: usize,
    pub activation_bytes: usize,
}

/// `z = a * x; y = z + c * b` over 2x2 i32 tensors, `c = 1`.
///
/// Values: 0 a, 1 b, 2 c, 3 x, 4 y, 5 z. Operators: 0 mul_out, 1 add_out.
pub fn mul_add_program() -> Result<(Program, MulAdd)> {
    let mut builder = ProgramBuilder::new();
    let mut plan = builder.plan();
    let a = plan.add_constant_from(StorageId(1), &[2, 2], &A_DATA)?;
    let b = plan.add_constant_from(StorageId(2), &[2, 2], &B_DATA)?;
    let c = plan.add_int(1);
    let x = plan.add_activation(ScalarType::Int, &[2, 2])?;
    let y = plan.add_activation(ScalarType::Int, &[2, 2])?;
    let z = plan.add_activation(ScalarType::Int, &[2, 2])?;
    let mul = plan.add_operator("mul_out");
    let add = plan.add_operator("add_out");
    plan.add_chain(
        ChainBuilder::new()
            .inputs(&[x])
            .outputs(&[y])
            .call(mul, &[a, x, z])
            .call(add, &[z, b, c, y]),
    )?;
    plan.set_inputs(&[x])?;
    plan.set_outputs(&[y])?;
    let activation_bytes = plan.activation_bytes();
    plan.finish();
    Ok((
        builder.build(),
        MulAdd {
            a,
            b,
            c,
            x,
            y,
            z,
            activation_bytes,
        },
    ))
}

/// Pool table with the constant slot and one activation pool over `buffer`.
pub fn memory(buffer: &mut [u8]) -> Result<MemoryManager<'_>> {
    Ok(MemoryManager::new(vec![
        MemoryPool::constant(),
        MemoryPool::new(buffer),
    ])?)
}

/// Build a standalone i32 tensor value over `buffer` at `offset`.
pub fn int_tensor<'p>(
    memory: &MemoryManager<'p>,
    offset: usize,
    data: &[i32],
) -> Result<EValue<'p>> {
    let storage = memory.resolve(1, offset, data.len() * 4)?;
    let tensor = flatexec::Tensor::new(ScalarType::Int, vec![data.len()], storage)?;
    tensor.copy_from_slice(data)?;
    Ok(EValue::Tensor(tensor))
}

/// System allocator that counts allocations made on the current thread
/// while [`count_allocations`] is running.
struct CountingAllocator;

thread_local! {
    static COUNTING: Cell<bool> = const { Cell::new(false) };
    static ALLOCATIONS: Cell<usize> = const { Cell::new(0) };
}

fn record_allocation() {
    let _ = COUNTING.try_with(|counting| {
        if counting.get() {
            let _ = ALLOCATIONS.try_with(|count| count.set(count.get() + 1));
        }
    });
}

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        record_allocation();
        System.alloc(layout)
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        record_allocation();
        System.alloc_zeroed(layout)
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        record_allocation();
        System.realloc(ptr, layout, new_size)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout)
    }
}

#[global_allocator]
static ALLOCATOR: CountingAllocator = CountingAllocator;

/// Run `f` and return its result with the number of heap allocations it
/// made on this thread.
pub fn count_allocations<R>(f: impl FnOnce() -> R) -> (R, usize) {
    ALLOCATIONS.with(|count| count.set(0));
    COUNTING.with(|counting| counting.set(true));
    let out = f();
    COUNTING.with(|counting| counting.set(false));
    (out, ALLOCATIONS.with(Cell::get))
}
