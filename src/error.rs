use thiserror::Error;

/// Recoverable arena failures
///
/// Every operation returning this error leaves the arena exactly as it was before the call.
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum Error {
    /// The backing allocator refused a block or pack buffer, or the configured limit was reached
    #[error("out of memory: could not reserve {requested} bytes")]
    OutOfMemory {
        /// Size of the reservation that failed
        requested: usize,
    },
    /// Size or alignment arithmetic overflowed `usize`
    #[error("capacity overflow")]
    CapacityOverflow,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
