//! Pool counters.

use std::fmt;

/// Snapshot of a pool's counters.
///
/// `free` and `outstanding` are gauges; every other field only grows over the
/// lifetime of the pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Idle buffers currently held in the free list.
    pub free: usize,

    /// Buffers handed out and not yet returned.
    pub outstanding: usize,

    /// Buffers allocated from the system allocator.
    pub created: u64,

    /// Buffers whose memory has been released.
    pub destroyed: u64,

    /// Successful `take` calls, recycled or freshly created.
    pub borrowed: u64,

    /// `put` calls, retained or discarded.
    pub returned: u64,

    /// Returned buffers destroyed because the free list was at its ceiling.
    pub discarded: u64,

    /// Allocations that failed.
    pub alloc_failures: u64,
}

impl fmt::Display for PoolStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "free={} outstanding={} created={} destroyed={} borrowed={} returned={} discarded={} alloc_failures={}",
            self.free,
            self.outstanding,
            self.created,
            self.destroyed,
            self.borrowed,
            self.returned,
            self.discarded,
            self.alloc_failures
        )
    }
}
