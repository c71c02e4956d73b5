use std::alloc::Layout;
use std::mem;
use std::ops::Range;

use allocator_api2::alloc::Allocator;

use crate::block::Block;
use crate::{Error, GrowthPolicy, Result};

/// Forward-only sequence of blocks, linked by index
///
/// `blocks[0]` is the head. Every block in `blocks` is reachable from the head, and every block
/// after `current` in chain order has an offset of 0.
pub(crate) struct BlockChain {
    blocks: Vec<Block>,
    current: usize,
    /// Sum of all block capacities
    reserved: usize,
}

/// Where a request lands, decided before anything is mutated
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Step {
    /// Fits in the current block
    Bump(Range<usize>),
    /// Fits at the start of the already-linked block after the current one
    Advance { block: usize, range: Range<usize> },
    /// Needs a new block with this layout spliced in after the current one
    Splice(Layout),
}

/// Capacity of a block spliced in after one of `current` bytes to satisfy a `size`-byte request
///
/// The half is rounded up so that even a 1-byte block grows.
pub(crate) fn grown_capacity(current: usize, size: usize) -> Result<usize> {
    let grown = current
        .checked_add(current.div_ceil(2))
        .ok_or(Error::CapacityOverflow)?;
    Ok(grown.max(size))
}

impl BlockChain {
    pub fn new(head: Block) -> Self {
        Self {
            reserved: head.capacity(),
            blocks: vec![head],
            current: 0,
        }
    }

    #[inline]
    pub fn current(&self) -> &Block {
        &self.blocks[self.current]
    }

    #[cfg(test)]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    pub fn reserved(&self) -> usize {
        self.reserved
    }

    /// Blocks in chain order, head first
    pub fn iter(&self) -> impl Iterator<Item = &Block> + '_ {
        let mut cursor = Some(0);
        std::iter::from_fn(move || {
            let block = &self.blocks[cursor?];
            cursor = block.next;
            Some(block)
        })
    }

    /// Decide how to place a `size`-byte, `alignment`-aligned request
    pub fn plan(&self, size: usize, alignment: usize, growth: GrowthPolicy) -> Result<Step> {
        let current = self.current();
        if let Some(range) = current.try_bump(current.offset, size, alignment) {
            return Ok(Step::Bump(range));
        }
        if growth == GrowthPolicy::ReuseNext {
            if let Some(next) = current.next {
                let block = &self.blocks[next];
                debug_assert_eq!(block.offset, 0, "block past the cursor was written");
                if let Some(range) = block.try_bump(0, size, alignment) {
                    return Ok(Step::Advance { block: next, range });
                }
            }
        }
        let capacity = grown_capacity(current.capacity(), size)?;
        Ok(Step::Splice(Block::layout(capacity, alignment)?))
    }

    /// Commit `range` in the current block, returning the number of newly committed bytes
    pub fn bump(&mut self, range: Range<usize>) -> usize {
        let block = &mut self.blocks[self.current];
        debug_assert!(range.start >= block.offset && range.end <= block.capacity());
        let committed = range.end - block.offset;
        block.offset = range.end;
        committed
    }

    /// Move the cursor to `block`, which must directly follow the current block
    pub fn advance(&mut self, block: usize) {
        debug_assert_eq!(self.current().next, Some(block));
        self.current = block;
    }

    /// Make room to record one more block, so a following `splice` cannot fail
    pub fn reserve_slot(&mut self) -> Result<()> {
        self.blocks
            .try_reserve(1)
            .map_err(|_| Error::OutOfMemory {
                requested: mem::size_of::<Block>(),
            })
    }

    /// Link `block` directly after the current block, keeping whatever followed it, and move the
    /// cursor onto it
    ///
    /// Only allocates if `reserve_slot` wasn't called first.
    pub fn splice(&mut self, mut block: Block) -> usize {
        let index = self.blocks.len();
        block.next = self.blocks[self.current].next.replace(index);
        self.reserved += block.capacity();
        self.blocks.push(block);
        self.current = index;
        index
    }

    /// Zero every offset and rewind the cursor to the head, retaining all blocks
    pub fn rewind(&mut self) {
        for block in &mut self.blocks {
            block.offset = 0;
        }
        self.current = 0;
    }

    /// Release every block after the head back to `alloc` and rewind the head, returning the
    /// number of bytes released
    ///
    /// # Safety
    ///
    /// `alloc` must be the allocator every block was created with, and no allocation may be live.
    pub unsafe fn truncate<A: Allocator>(&mut self, alloc: &A) -> usize {
        let mut released = 0;
        for block in self.blocks.drain(1..) {
            released += block.capacity();
            block.release(alloc);
        }
        let head = &mut self.blocks[0];
        head.offset = 0;
        head.next = None;
        self.current = 0;
        self.reserved = head.capacity();
        released
    }

    /// Release every block, leaving the chain empty
    ///
    /// # Safety
    ///
    /// As `truncate`. The chain must not be used afterwards.
    pub unsafe fn release<A: Allocator>(&mut self, alloc: &A) {
        for block in self.blocks.drain(..) {
            block.release(alloc);
        }
        self.reserved = 0;
    }
}
