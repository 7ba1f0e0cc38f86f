//! Buffer types.
//!
//! - [`Mbuf`] - Fixed-capacity buffer with read/write cursors and a tail guard
//! - [`MbufId`] - Stable identity of a buffer's allocation
//! - [`MbufQueue`] - Ordered (FIFO) sequence of owned buffers

mod buf;
mod queue;

pub use buf::{Mbuf, MbufId};
pub use queue::MbufQueue;
