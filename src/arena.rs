use std::cell::{Cell, RefCell};
use std::ptr::{self, NonNull};
use std::{fmt, mem, slice, str};

use allocator_api2::alloc::{Allocator, Global};
use allocator_api2::vec::Vec;
use tracing::{debug, trace, warn};

use crate::block::{Block, MAX_ALIGN};
use crate::chain::{BlockChain, Step};
use crate::pack::PackExporter;
use crate::{ArenaConfig, Error, Result};

/// Self-growing bump allocator backed by a chain of blocks
///
/// Allocation takes `&self` and hands out views that borrow the arena; `reset`, `free` and `pack`
/// take `&mut self`, so no view outlives the next of those calls. Blocks retained across `reset`
/// are reused by later allocations; only `free` and drop return memory to the allocator.
///
/// Not `Sync`. Use one arena per thread, or serialize access externally.
pub struct Arena<A: Allocator = Global> {
    chain: RefCell<BlockChain>,
    /// Committed bytes across all blocks, padding included
    used: Cell<usize>,
    config: ArenaConfig,
    alloc: A,
}

// Blocks are uniquely owned by the arena, and `RefCell` already rules out `Sync`.
unsafe impl<A: Allocator + Send> Send for Arena<A> {}

impl Arena {
    /// Construct an arena whose first block holds `capacity` bytes
    ///
    /// Panics if the first block can't be allocated; see `try_new`.
    pub fn new(capacity: usize) -> Self {
        Self::new_in(capacity, Global)
    }

    pub fn with_config(config: ArenaConfig) -> Self {
        Self::with_config_in(config, Global)
    }

    pub fn try_new(capacity: usize) -> Result<Self> {
        Self::try_with_config_in(ArenaConfig::default().with_capacity(capacity), Global)
    }

    pub fn try_with_config(config: ArenaConfig) -> Result<Self> {
        Self::try_with_config_in(config, Global)
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::with_config(ArenaConfig::default())
    }
}

impl<A: Allocator> Arena<A> {
    /// Construct an arena drawing its blocks from `alloc`
    pub fn new_in(capacity: usize, alloc: A) -> Self {
        Self::with_config_in(ArenaConfig::default().with_capacity(capacity), alloc)
    }

    pub fn with_config_in(config: ArenaConfig, alloc: A) -> Self {
        match Self::try_with_config_in(config, alloc) {
            Ok(arena) => arena,
            Err(e) => panic!("failed to create arena: {e}"),
        }
    }

    pub fn try_with_config_in(config: ArenaConfig, alloc: A) -> Result<Self> {
        if !config.admits(config.capacity) {
            return Err(Error::OutOfMemory {
                requested: config.capacity,
            });
        }
        let head = Block::new_in(&alloc, Block::layout(config.capacity, MAX_ALIGN)?)?;
        Ok(Self {
            chain: RefCell::new(BlockChain::new(head)),
            used: Cell::new(0),
            config,
            alloc,
        })
    }

    /// Allocate `size` bytes positioned at a multiple of `alignment`
    ///
    /// Panics if `alignment` is not a power of two. On error the arena is left untouched.
    #[allow(clippy::mut_from_ref)]
    pub fn alloc(&self, size: usize, alignment: usize) -> Result<&mut [u8]> {
        let ptr = self.bump(size, alignment)?;
        Ok(unsafe { slice::from_raw_parts_mut(ptr.as_ptr(), size) })
    }

    /// Allocate `size` bytes aligned to `MAX_ALIGN`
    #[allow(clippy::mut_from_ref)]
    pub fn alloc_default(&self, size: usize) -> Result<&mut [u8]> {
        self.alloc(size, MAX_ALIGN)
    }

    /// Allocate `size` bytes directly after the previous allocation, without padding
    ///
    /// Arenas filled only through this method pack without any gaps.
    #[allow(clippy::mut_from_ref)]
    pub fn alloc_unaligned(&self, size: usize) -> Result<&mut [u8]> {
        self.alloc(size, 1)
    }

    /// Move `value` into the arena
    #[allow(clippy::mut_from_ref)]
    pub fn alloc_copy<T: Copy>(&self, value: T) -> Result<&mut T> {
        let ptr = self.bump(mem::size_of::<T>(), mem::align_of::<T>())?;
        let ptr = ptr.as_ptr().cast::<T>();
        unsafe {
            ptr::write(ptr, value);
            Ok(&mut *ptr)
        }
    }

    /// Copy `values` into the arena
    #[allow(clippy::mut_from_ref)]
    pub fn alloc_slice_copy<T: Copy>(&self, values: &[T]) -> Result<&mut [T]> {
        let size = mem::size_of::<T>()
            .checked_mul(values.len())
            .ok_or(Error::CapacityOverflow)?;
        let ptr = self.bump(size, mem::align_of::<T>())?;
        let ptr = ptr.as_ptr().cast::<T>();
        unsafe {
            ptr::copy_nonoverlapping(values.as_ptr(), ptr, values.len());
            Ok(slice::from_raw_parts_mut(ptr, values.len()))
        }
    }

    /// Copy `s` into the arena
    #[allow(clippy::mut_from_ref)]
    pub fn alloc_str(&self, s: &str) -> Result<&mut str> {
        let bytes = self.alloc_slice_copy(s.as_bytes())?;
        Ok(unsafe { str::from_utf8_unchecked_mut(bytes) })
    }

    /// Invalidate all prior allocations, keeping every block for reuse
    ///
    /// Idempotent. Memory is only returned to the allocator by `free` or drop.
    pub fn reset(&mut self) {
        let chain = self.chain.get_mut();
        chain.rewind();
        self.used.set(0);
        debug!(blocks = chain.len(), reserved = chain.reserved(), "arena reset");
    }

    /// Invalidate all prior allocations and release every block but the first
    pub fn free(&mut self) {
        // No views are live: we hold `&mut self`
        let released = unsafe { self.chain.get_mut().truncate(&self.alloc) };
        self.used.set(0);
        debug!(released, "arena freed");
    }

    /// Copy every committed byte, in allocation order, into a new buffer of exactly `used()` bytes
    ///
    /// The buffer is drawn from the arena's allocator but owned by the caller. Alignment padding is
    /// copied verbatim. Yields an empty, unallocated buffer if nothing is committed. The arena is
    /// not modified, including on failure.
    pub fn pack(&mut self) -> Result<Vec<u8, A>>
    where
        A: Clone,
    {
        let used = self.used.get();
        let alloc = self.alloc.clone();
        unsafe { PackExporter::new(self.chain.get_mut(), used) }.export_in(alloc)
    }

    /// Like `pack`, but appends to `out`, returning the number of bytes appended
    pub fn pack_into<B: Allocator>(&mut self, out: &mut Vec<u8, B>) -> Result<usize> {
        let used = self.used.get();
        unsafe { PackExporter::new(self.chain.get_mut(), used) }.export_into(out)?;
        Ok(used)
    }

    /// Bytes committed since the last `reset` or `free`, padding included
    #[inline]
    pub fn used(&self) -> usize {
        self.used.get()
    }

    /// Total capacity of every block currently held
    pub fn reserved(&self) -> usize {
        self.chain.borrow().reserved()
    }

    /// Number of blocks currently held
    pub fn block_count(&self) -> usize {
        self.chain.borrow().len()
    }

    /// Unused bytes at the end of the block currently receiving allocations
    pub fn remaining(&self) -> usize {
        self.chain.borrow().current().remaining()
    }

    #[inline]
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    #[inline]
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Reserve a `size`-byte, `alignment`-aligned range, growing the chain if needed
    fn bump(&self, size: usize, alignment: usize) -> Result<NonNull<u8>> {
        assert!(
            alignment.is_power_of_two(),
            "alignment {alignment} is not a power of two"
        );
        let mut chain = self.chain.borrow_mut();
        let start = match chain.plan(size, alignment, self.config.growth)? {
            Step::Bump(range) => {
                let used = self.committed(range.end - chain.current().offset)?;
                let start = range.start;
                chain.bump(range);
                self.used.set(used);
                start
            }
            Step::Advance { block, range } => {
                let used = self.committed(range.end)?;
                trace!(block, size, "advancing into retained block");
                let start = range.start;
                chain.advance(block);
                chain.bump(range);
                self.used.set(used);
                start
            }
            Step::Splice(layout) => {
                let capacity = layout.size();
                let reserved = chain
                    .reserved()
                    .checked_add(capacity)
                    .ok_or(Error::CapacityOverflow)?;
                if !self.config.admits(reserved) {
                    warn!(capacity, reserved, "arena limit reached");
                    return Err(Error::OutOfMemory {
                        requested: capacity,
                    });
                }
                let used = self.committed(size)?;
                chain.reserve_slot()?;
                let new = Block::new_in(&self.alloc, layout).map_err(|e| {
                    warn!(capacity, "failed to allocate block");
                    e
                })?;
                debug_assert_eq!(new.base().as_ptr() as usize % alignment, 0);
                let block = chain.splice(new);
                trace!(block, capacity, size, "spliced new block");
                chain.bump(0..size);
                self.used.set(used);
                0
            }
        };
        // Every step leaves the cursor on the block that received the allocation, and `start` is
        // within its capacity
        let base = chain.current().base();
        Ok(unsafe { NonNull::new_unchecked(base.as_ptr().add(start)) })
    }

    /// `used` after committing `bytes` more
    #[inline]
    fn committed(&self, bytes: usize) -> Result<usize> {
        self.used
            .get()
            .checked_add(bytes)
            .ok_or(Error::CapacityOverflow)
    }
}

impl<A: Allocator> Drop for Arena<A> {
    fn drop(&mut self) {
        unsafe {
            self.chain.get_mut().release(&self.alloc);
        }
    }
}

impl<A: Allocator> fmt::Debug for Arena<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chain = self.chain.borrow();
        f.debug_struct("Arena")
            .field("used", &self.used.get())
            .field("reserved", &chain.reserved())
            .field("blocks", &chain.len())
            .field("config", &self.config)
            .finish()
    }
}
