//! Buffer pool for recycling mbufs.
//!
//! - [`MbufPool`] - Free list of reset buffers, sized by an [`MbufConfig`]
//! - [`PoolStats`] - Counter snapshot
//!
//! The pool is plain single-owner state: every operation takes `&mut self`
//! and nothing is locked. Share it across threads only behind your own mutex.

mod stats;

pub use stats::PoolStats;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace, warn};

use crate::config::{HEADER_SIZE, MbufConfig};
use crate::error::MbufError;
use crate::mbuf::Mbuf;
use crate::util::{ChunkAlloc, alloc_chunk};

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(0);

/// A pool of equally sized buffers.
///
/// [`take`](MbufPool::take) hands out a recycled buffer when one is idle and
/// allocates otherwise. [`put`](MbufPool::put) accepts buffers back; once the
/// free list holds `max_free` buffers, further returns are destroyed instead
/// of retained. Neither call ever blocks.
///
/// # Example
///
/// ```
/// use mbufpool::{MbufConfig, MbufPool};
///
/// let mut pool = MbufPool::new(MbufConfig::new(2048)?)?;
/// assert_eq!(pool.capacity(), 1984);
///
/// let mut mbuf = pool.take()?;
/// mbuf.copy(b"hello");
/// let cut = mbuf.rpos() + 2;
/// let tail = pool.split(&mut mbuf, cut)?;
///
/// assert_eq!(mbuf.readable(), b"he");
/// assert_eq!(tail.readable(), b"llo");
///
/// pool.put(mbuf);
/// pool.put(tail);
/// assert_eq!(pool.free_count(), 2);
/// # Ok::<(), mbufpool::MbufError>(())
/// ```
#[derive(Debug)]
pub struct MbufPool {
    id: u64,
    config: MbufConfig,
    alloc: ChunkAlloc,
    free: VecDeque<Mbuf>,
    stats: PoolStats,
}

impl MbufPool {
    /// Creates an empty pool. The configuration, and with it the capacity of
    /// every buffer, is fixed for the pool's lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`MbufError::InvalidConfig`] if `config` does not validate.
    pub fn new(config: MbufConfig) -> Result<Self, MbufError> {
        config.validate()?;

        debug!(
            chunk_size = config.chunk_size(),
            header_size = HEADER_SIZE,
            capacity = config.capacity(),
            max_free = config.max_free(),
            "creating mbuf pool"
        );

        Ok(Self {
            id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
            config,
            alloc: alloc_chunk,
            free: VecDeque::new(),
            stats: PoolStats::default(),
        })
    }

    #[cfg(test)]
    pub(crate) fn with_allocator(mut self, alloc: ChunkAlloc) -> Self {
        self.alloc = alloc;
        self
    }

    /// Returns the configuration the pool was built with.
    pub fn config(&self) -> &MbufConfig {
        &self.config
    }

    /// Returns the body size of every buffer from this pool.
    pub fn capacity(&self) -> usize {
        self.config.capacity()
    }

    /// Returns the number of idle buffers.
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Returns the number of buffers handed out and not yet returned.
    pub fn outstanding(&self) -> usize {
        self.stats.outstanding
    }

    /// Returns a snapshot of the pool's counters.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            free: self.free.len(),
            ..self.stats
        }
    }

    /// Allocates idle buffers until the free list holds `count` of them
    /// (or `max_free`, whichever is smaller).
    ///
    /// # Errors
    ///
    /// Returns [`MbufError::OutOfMemory`] if an allocation fails. Buffers
    /// allocated before the failure stay in the free list.
    pub fn prealloc(&mut self, count: usize) -> Result<(), MbufError> {
        let target = match self.config.max_free() {
            0 => count,
            max => count.min(max),
        };

        while self.free.len() < target {
            let mbuf = self.create()?;
            self.free.push_back(mbuf);
        }

        debug!(free = self.free.len(), "preallocated mbufs");
        Ok(())
    }

    /// Hands out an empty buffer, recycling an idle one when available.
    ///
    /// # Errors
    ///
    /// Returns [`MbufError::OutOfMemory`] if the free list is empty and a new
    /// chunk cannot be allocated. The caller decides whether to retry.
    pub fn take(&mut self) -> Result<Mbuf, MbufError> {
        let mut mbuf = match self.free.pop_front() {
            Some(mbuf) => mbuf,
            None => self
                .create()
                .inspect_err(|err| debug!(error = %err, "borrow mbuf failed"))?,
        };

        mbuf.reset();
        self.stats.borrowed += 1;
        self.stats.outstanding += 1;

        trace!(id = %mbuf.id(), "borrow mbuf");
        Ok(mbuf)
    }

    /// Takes a buffer back.
    ///
    /// The buffer is reset and appended to the free list, unless the list
    /// already holds `max_free` buffers, in which case it is destroyed.
    ///
    /// # Panics
    ///
    /// Panics if the buffer's guard value is corrupted or if it was not
    /// allocated by this pool.
    pub fn put(&mut self, mut mbuf: Mbuf) {
        mbuf.assert_intact();
        assert_eq!(
            mbuf.owner(),
            Some(self.id),
            "{}: returned to a pool that did not allocate it",
            mbuf.id()
        );

        trace!(id = %mbuf.id(), "return mbuf");
        self.stats.returned += 1;
        self.stats.outstanding -= 1;

        let max_free = self.config.max_free();
        if max_free != 0 && self.free.len() >= max_free {
            trace!(id = %mbuf.id(), max_free, "discard mbuf: free list full");
            self.stats.discarded += 1;
            self.destroy_mbuf(mbuf);
            return;
        }

        mbuf.reset();
        self.free.push_back(mbuf);
    }

    /// Moves the bytes `[cut, wpos)` of `mbuf` into a freshly borrowed buffer
    /// and truncates `mbuf` at `cut`.
    ///
    /// To put fixed content (a header, say) in front of the moved bytes, take
    /// the destination yourself, fill it, and call [`Mbuf::split_into`].
    ///
    /// # Errors
    ///
    /// Returns [`MbufError::OutOfMemory`] if no buffer could be obtained;
    /// `mbuf` is left untouched.
    ///
    /// # Panics
    ///
    /// Panics if `cut` is outside `[rpos, wpos]`.
    pub fn split(&mut self, mbuf: &mut Mbuf, cut: usize) -> Result<Mbuf, MbufError> {
        let mut nbuf = self.take()?;
        mbuf.split_into(cut, &mut nbuf);
        Ok(nbuf)
    }

    /// Destroys every idle buffer and releases the pool.
    ///
    /// Equivalent to dropping it. Buffers still held by callers are not
    /// reclaimed.
    pub fn destroy(self) {
        drop(self);
    }

    fn create(&mut self) -> Result<Mbuf, MbufError> {
        match Mbuf::create_with(&self.config, self.alloc, Some(self.id)) {
            Ok(mbuf) => {
                self.stats.created += 1;
                Ok(mbuf)
            }
            Err(err) => {
                self.stats.alloc_failures += 1;
                Err(err)
            }
        }
    }

    fn destroy_mbuf(&mut self, mbuf: Mbuf) {
        mbuf.destroy();
        self.stats.destroyed += 1;
    }
}

impl Drop for MbufPool {
    fn drop(&mut self) {
        debug!(free = self.free.len(), "destroying mbuf pool");

        while let Some(mbuf) = self.free.pop_front() {
            self.destroy_mbuf(mbuf);
        }

        if self.stats.outstanding > 0 {
            warn!(
                outstanding = self.stats.outstanding,
                "mbuf pool torn down with buffers still borrowed"
            );
        }
    }
}
