//! Ordered sequences of buffers.

use std::collections::VecDeque;
use std::collections::vec_deque;

use bytes::{Bytes, BytesMut};
use tracing::trace;

use super::{Mbuf, MbufId};
use crate::pool::MbufPool;

/// A FIFO queue of buffers, e.g. the pending output of one connection.
///
/// The queue owns its members. A buffer can only be in one queue at a time,
/// and it cannot be destroyed or returned to a pool until it has been taken
/// back out with [`MbufQueue::remove`] or [`MbufQueue::pop_front`].
///
/// # Example
///
/// ```
/// use mbufpool::{MbufConfig, MbufPool, MbufQueue};
///
/// let mut pool = MbufPool::new(MbufConfig::new(256)?)?;
/// let mut queue = MbufQueue::new();
///
/// let mut mbuf = pool.take()?;
/// mbuf.copy(b"+OK\r\n");
/// let id = mbuf.id();
/// queue.insert(mbuf);
///
/// let mbuf = queue.remove(id).expect("queued");
/// pool.put(mbuf);
/// # Ok::<(), mbufpool::MbufError>(())
/// ```
#[derive(Debug, Default)]
pub struct MbufQueue {
    bufs: VecDeque<Mbuf>,
}

impl MbufQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a buffer at the tail.
    pub fn insert(&mut self, mbuf: Mbuf) {
        trace!(id = %mbuf.id(), len = mbuf.readable_size(), "insert mbuf");
        self.bufs.push_back(mbuf);
    }

    /// Detaches the buffer with the given id, wherever it sits in the queue.
    ///
    /// Returns `None` if no member has that id.
    pub fn remove(&mut self, id: MbufId) -> Option<Mbuf> {
        let idx = self.bufs.iter().position(|m| m.id() == id)?;
        let mbuf = self.bufs.remove(idx)?;
        trace!(id = %mbuf.id(), len = mbuf.readable_size(), "remove mbuf");
        Some(mbuf)
    }

    /// Detaches the head of the queue.
    pub fn pop_front(&mut self) -> Option<Mbuf> {
        self.bufs.pop_front()
    }

    /// Returns the head of the queue.
    pub fn front(&self) -> Option<&Mbuf> {
        self.bufs.front()
    }

    /// Returns the head of the queue mutably.
    pub fn front_mut(&mut self) -> Option<&mut Mbuf> {
        self.bufs.front_mut()
    }

    /// Returns the tail of the queue mutably, typically to keep appending to
    /// the last buffer until it fills up.
    pub fn back_mut(&mut self) -> Option<&mut Mbuf> {
        self.bufs.back_mut()
    }

    /// Returns the number of queued buffers.
    pub fn len(&self) -> usize {
        self.bufs.len()
    }

    /// Returns true if no buffer is queued.
    pub fn is_empty(&self) -> bool {
        self.bufs.is_empty()
    }

    /// Iterates over the queued buffers from head to tail.
    pub fn iter(&self) -> vec_deque::Iter<'_, Mbuf> {
        self.bufs.iter()
    }

    /// Returns the total number of unread bytes across all members.
    pub fn readable_size(&self) -> usize {
        self.bufs.iter().map(Mbuf::readable_size).sum()
    }

    /// Concatenates the unread bytes of every member, head first.
    pub fn to_bytes(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(self.readable_size());
        for mbuf in &self.bufs {
            out.extend_from_slice(mbuf.readable());
        }
        out.freeze()
    }

    /// Returns every member to `pool`, leaving the queue empty.
    pub fn drain_into(&mut self, pool: &mut MbufPool) {
        while let Some(mbuf) = self.bufs.pop_front() {
            pool.put(mbuf);
        }
    }
}

impl IntoIterator for MbufQueue {
    type Item = Mbuf;
    type IntoIter = vec_deque::IntoIter<Mbuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.bufs.into_iter()
    }
}

impl<'a> IntoIterator for &'a MbufQueue {
    type Item = &'a Mbuf;
    type IntoIter = vec_deque::Iter<'a, Mbuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.bufs.iter()
    }
}
