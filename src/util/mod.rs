//! Internal utility functions and helpers.
//!
//! This module wraps the system allocator for chunk allocation. It is an
//! implementation detail and not part of the public API.

use crate::error::MbufError;

/// Allocator hook: returns a zeroed chunk of the requested size.
pub(crate) type ChunkAlloc = fn(usize) -> Result<Box<[u8]>, MbufError>;

/// Allocates a zeroed chunk of exactly `size` bytes.
///
/// Uses `try_reserve_exact` so that exhaustion surfaces as
/// [`MbufError::OutOfMemory`] instead of aborting the process. Releasing a
/// chunk is a plain drop.
pub(crate) fn alloc_chunk(size: usize) -> Result<Box<[u8]>, MbufError> {
    let mut chunk = Vec::new();
    chunk
        .try_reserve_exact(size)
        .map_err(|_| MbufError::OutOfMemory { requested: size })?;
    chunk.resize(size, 0);
    Ok(chunk.into_boxed_slice())
}
