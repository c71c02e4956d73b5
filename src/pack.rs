use allocator_api2::alloc::Allocator;
use allocator_api2::vec::Vec;

use crate::chain::BlockChain;
use crate::{Error, Result};

/// Concatenates the committed bytes of every block, in chain order
pub(crate) struct PackExporter<'a> {
    chain: &'a BlockChain,
    len: usize,
}

impl<'a> PackExporter<'a> {
    /// `len` must equal the sum of committed bytes across `chain`
    ///
    /// # Safety
    ///
    /// No allocation handed out from `chain` may be live while the exporter exists.
    pub unsafe fn new(chain: &'a BlockChain, len: usize) -> Self {
        Self { chain, len }
    }

    /// Copy into a buffer of exactly `len` bytes freshly allocated from `alloc`
    pub fn export_in<A: Allocator>(self, alloc: A) -> Result<Vec<u8, A>> {
        let mut out = Vec::new_in(alloc);
        self.export_into(&mut out)?;
        Ok(out)
    }

    /// Append to `out`, reserving all needed space up front so a failure leaves `out` untouched
    pub fn export_into<A: Allocator>(self, out: &mut Vec<u8, A>) -> Result<()> {
        if self.len == 0 {
            return Ok(());
        }
        out.try_reserve_exact(self.len)
            .map_err(|_| Error::OutOfMemory {
                requested: self.len,
            })?;
        let start = out.len();
        for block in self.chain.iter() {
            // Sound per the contract of `new`
            out.extend_from_slice(unsafe { block.committed() });
        }
        debug_assert_eq!(out.len() - start, self.len, "committed byte count drifted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use allocator_api2::alloc::Global;

    use super::*;
    use crate::block::Block;

    #[test]
    fn concatenates_in_chain_order() {
        let head = Block::new_in(&Global, Block::layout(4, 1).unwrap()).unwrap();
        let mut chain = BlockChain::new(head);
        chain.bump(0..3);
        let tail = Block::new_in(&Global, Block::layout(6, 1).unwrap()).unwrap();
        chain.splice(tail);
        chain.bump(0..2);

        let packed = unsafe { PackExporter::new(&chain, 5) }
            .export_in(Global)
            .unwrap();
        assert_eq!(&packed[..], &[0; 5]);

        let mut out = Vec::new();
        out.push(0xAA);
        unsafe { PackExporter::new(&chain, 5) }
            .export_into(&mut out)
            .unwrap();
        assert_eq!(out.len(), 6);
        assert_eq!(out[0], 0xAA);

        unsafe { chain.release(&Global) };
    }

    #[test]
    fn empty() {
        let head = Block::new_in(&Global, Block::layout(4, 1).unwrap()).unwrap();
        let mut chain = BlockChain::new(head);
        let packed = unsafe { PackExporter::new(&chain, 0) }
            .export_in(Global)
            .unwrap();
        assert!(packed.is_empty());
        assert_eq!(packed.capacity(), 0);
        unsafe { chain.release(&Global) };
    }
}
