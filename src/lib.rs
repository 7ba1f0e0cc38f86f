//! mbufpool
//!
//! Fixed-size pooled I/O buffers ("mbufs") for cache and network services.
//!
//! An [`Mbuf`] is one allocation of `chunk_size` bytes: a writable body
//! followed by a small control block holding a guard value. Bytes are
//! appended at the write cursor and consumed from the read cursor, so one
//! buffer can be filled and drained incrementally. An [`MbufPool`] recycles
//! buffers through a free list instead of going back to the allocator.
//!
//! The crate intentionally:
//! - does NOT perform I/O
//! - does NOT parse protocols
//! - does NOT synchronize (one owner per pool, one owner per buffer)
//!
//! # Example
//!
//! ```
//! use mbufpool::{MbufConfig, MbufPool, MbufQueue};
//!
//! fn main() -> Result<(), mbufpool::MbufError> {
//!     let mut pool = MbufPool::new(MbufConfig::new(2048)?.with_max_free(64))?;
//!     let mut out = MbufQueue::new();
//!
//!     let mut mbuf = pool.take()?;
//!     mbuf.copy(b"VALUE key 0 5\r\nhello\r\nEND\r\n");
//!     out.insert(mbuf);
//!
//!     assert_eq!(out.readable_size(), 27);
//!     out.drain_into(&mut pool);
//!     assert_eq!(pool.free_count(), 1);
//!     Ok(())
//! }
//! ```
//!
//! # Failure model
//!
//! Running out of memory is recoverable and surfaces as
//! [`MbufError::OutOfMemory`]. Contract violations such as a corrupted guard
//! value, out-of-order cursors or copying more than fits are bugs and panic.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod mbuf;
mod pool;

mod util; // internal allocator wrapper

//
// Public surface
//

pub use config::{
    DEFAULT_CHUNK_SIZE, DEFAULT_MAX_FREE, HEADER_SIZE, MAX_CHUNK_SIZE, MBUF_MAGIC, MbufConfig,
};
pub use error::MbufError;
pub use mbuf::{Mbuf, MbufId, MbufQueue};
pub use pool::{MbufPool, PoolStats};
