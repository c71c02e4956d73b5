//! Growable arena allocation for short-lived data reclaimed in bulk
//!
//! An [`Arena`] bump-allocates out of a chain of blocks, splicing in larger blocks as it fills up.
//! [`Arena::reset`] invalidates everything at once while keeping the blocks for reuse,
//! [`Arena::free`] additionally releases all but the first block, and [`Arena::pack`] copies every
//! live byte into one contiguous buffer.
//!
//! ```
//! let mut arena = strata::Arena::new(64);
//! arena.alloc_unaligned(3)?.copy_from_slice(b"abc");
//! arena.alloc_str("def")?;
//! assert_eq!(&arena.pack()?[..], b"abcdef");
//! arena.reset();
//! assert_eq!(arena.used(), 0);
//! # Ok::<(), strata::Error>(())
//! ```

mod arena;
mod block;
mod chain;
mod config;
mod error;
mod pack;

pub use arena::Arena;
pub use block::{align_up, MAX_ALIGN};
pub use config::{ArenaConfig, GrowthPolicy, DEFAULT_CAPACITY};
pub use error::{Error, Result};
