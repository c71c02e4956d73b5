use std::alloc::Layout;
use std::ops::Range;
use std::ptr::NonNull;
use std::{mem, slice};

use allocator_api2::alloc::Allocator;

use crate::{Error, Result};

/// Largest natural alignment of a scalar on this platform
///
/// Every block's base address is aligned to at least this much.
pub const MAX_ALIGN: usize = mem::align_of::<MaxAlign>();

#[allow(dead_code)]
#[repr(C)]
union MaxAlign {
    int: u128,
    float: f64,
    word: usize,
    ptr: *const u8,
}

/// Round `x` up to the next multiple of `alignment`, or `None` on overflow
///
/// Panics if `alignment` is not a power of two.
#[inline]
pub fn align_up(x: usize, alignment: usize) -> Option<usize> {
    assert!(
        alignment.is_power_of_two(),
        "alignment {alignment} is not a power of two"
    );
    Some(x.checked_add(alignment - 1)? & !(alignment - 1))
}

/// A fixed-capacity region of zeroed memory with a bump offset
pub(crate) struct Block {
    ptr: NonNull<u8>,
    layout: Layout,
    /// End of the committed prefix
    pub offset: usize,
    /// Index of the next block in chain order
    pub next: Option<usize>,
}

impl Block {
    /// Obtain a zeroed region described by `layout` from `alloc`
    pub fn new_in<A: Allocator>(alloc: &A, layout: Layout) -> Result<Self> {
        let ptr = alloc
            .allocate_zeroed(layout)
            .map_err(|_| Error::OutOfMemory {
                requested: layout.size(),
            })?;
        Ok(Self {
            ptr: ptr.cast(),
            layout,
            offset: 0,
            next: None,
        })
    }

    /// Layout for a block of `capacity` bytes that can hold an `alignment`-aligned request at 0
    pub fn layout(capacity: usize, alignment: usize) -> Result<Layout> {
        Layout::from_size_align(capacity, alignment.max(MAX_ALIGN))
            .map_err(|_| Error::CapacityOverflow)
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.layout.size()
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.capacity() - self.offset
    }

    #[inline]
    pub fn base(&self) -> NonNull<u8> {
        self.ptr
    }

    /// Range of a `size`-byte allocation placed at or after `from` whose address is a multiple of
    /// `alignment`, or `None` if it doesn't fit
    ///
    /// Padding is computed against the real base address, so alignments beyond the block's own are
    /// honored too.
    pub fn try_bump(&self, from: usize, size: usize, alignment: usize) -> Option<Range<usize>> {
        let base = self.ptr.as_ptr() as usize;
        let start = align_up(base.checked_add(from)?, alignment)? - base;
        let end = start.checked_add(size)?;
        if end > self.capacity() {
            return None;
        }
        Some(start..end)
    }

    /// The committed prefix `[0, offset)`
    ///
    /// # Safety
    ///
    /// No allocation handed out from this block may be live.
    pub unsafe fn committed(&self) -> &[u8] {
        slice::from_raw_parts(self.ptr.as_ptr(), self.offset)
    }

    /// Return the region to `alloc`
    ///
    /// # Safety
    ///
    /// `alloc` must be the allocator this block was created with, and no allocation handed out
    /// from this block may be live.
    pub unsafe fn release<A: Allocator>(self, alloc: &A) {
        alloc.deallocate(self.ptr, self.layout);
    }
}
