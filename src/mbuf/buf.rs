//! The Mbuf type - a fixed-capacity buffer with read/write cursors.
//!
//! ```text
//!   <------------------ chunk_size ------------------>
//!   +------------------------------+-----------------+
//!   |          mbuf body           |  control block  |
//!   |          (capacity)          |  (HEADER_SIZE)  |
//!   +------------------------------+-----------------+
//!   ^          ^          ^        ^
//!   start      rpos       wpos     end (guard value starts here)
//! ```

use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::{Buf, Bytes};
use tracing::trace;

use crate::config::{MBUF_MAGIC, MbufConfig};
use crate::error::MbufError;
use crate::util::{ChunkAlloc, alloc_chunk};

const GUARD_LEN: usize = std::mem::size_of::<u32>();

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique identity of an [`Mbuf`].
///
/// Assigned when the chunk is allocated and kept across recycling, so two
/// handles with the same id refer to the same underlying allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MbufId(u64);

impl MbufId {
    /// Returns the raw identifier.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for MbufId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mbuf#{}", self.0)
    }
}

/// A fixed-capacity byte buffer with a read cursor and a write cursor.
///
/// Bytes are appended at `wpos` and consumed from `rpos`. The invariant
/// `start <= rpos <= wpos <= end` holds at all times; every size query
/// asserts it. Cursor positions are offsets into the body, `start` being 0.
///
/// The control block lives after the body within the same allocation. Its
/// guard value is checked whenever the buffer is destroyed or handed back to
/// a pool, and a mismatch panics.
///
/// # Example
///
/// ```
/// use mbufpool::{Mbuf, MbufConfig};
///
/// let mut mbuf = Mbuf::create(&MbufConfig::new(2048)?)?;
/// mbuf.reset();
/// mbuf.copy(b"hello");
///
/// assert_eq!(mbuf.readable(), b"hello");
/// assert_eq!(mbuf.writable_size(), 1984 - 5);
/// # Ok::<(), mbufpool::MbufError>(())
/// ```
pub struct Mbuf {
    /// The whole chunk: body followed by the control block.
    region: Box<[u8]>,

    /// One past the last body byte; the control block starts here.
    end: usize,

    /// Read cursor.
    rpos: usize,

    /// Write cursor.
    wpos: usize,

    id: MbufId,

    /// Pool that allocated this buffer, if any.
    owner: Option<u64>,
}

impl Mbuf {
    /// Allocates a new buffer of `config.chunk_size()` bytes and writes the
    /// guard value into its control block.
    ///
    /// Both cursors start at the beginning of the body. Buffers obtained from
    /// a pool are always reset before they are handed out.
    ///
    /// # Errors
    ///
    /// - [`MbufError::InvalidConfig`] if the configuration does not validate
    /// - [`MbufError::OutOfMemory`] if the allocation fails
    pub fn create(config: &MbufConfig) -> Result<Self, MbufError> {
        Self::create_with(config, alloc_chunk, None)
    }

    pub(crate) fn create_with(
        config: &MbufConfig,
        alloc: ChunkAlloc,
        owner: Option<u64>,
    ) -> Result<Self, MbufError> {
        config.validate()?;

        let mut region = alloc(config.chunk_size())?;
        let end = config.capacity();
        region[end..end + GUARD_LEN].copy_from_slice(&MBUF_MAGIC.to_le_bytes());

        let id = MbufId(NEXT_ID.fetch_add(1, Ordering::Relaxed));
        trace!(%id, chunk_size = config.chunk_size(), "create mbuf");

        Ok(Self {
            region,
            end,
            rpos: 0,
            wpos: 0,
            id,
            owner,
        })
    }

    /// Releases the buffer's memory.
    ///
    /// # Panics
    ///
    /// Panics if the guard value has been overwritten.
    pub fn destroy(self) {
        self.assert_intact();
        trace!(id = %self.id, len = self.readable_size(), "destroy mbuf");
    }

    /// Discards any buffered content by moving both cursors to the start.
    pub fn reset(&mut self) {
        self.rpos = 0;
        self.wpos = 0;
    }

    /// Returns this buffer's identity.
    pub fn id(&self) -> MbufId {
        self.id
    }

    /// Returns the number of unread bytes, `wpos - rpos`.
    ///
    /// # Panics
    ///
    /// Panics if the cursors are out of order.
    pub fn readable_size(&self) -> usize {
        assert!(
            self.rpos <= self.wpos,
            "{}: rpos {} is past wpos {}",
            self.id,
            self.rpos,
            self.wpos
        );
        self.wpos - self.rpos
    }

    /// Returns the remaining writable space, `end - wpos`.
    ///
    /// # Panics
    ///
    /// Panics if the write cursor is past the end of the body.
    pub fn writable_size(&self) -> usize {
        assert!(
            self.wpos <= self.end,
            "{}: wpos {} is past end {}",
            self.id,
            self.wpos,
            self.end
        );
        self.end - self.wpos
    }

    /// Returns the body size. Identical for all buffers of one configuration.
    pub fn capacity(&self) -> usize {
        self.end
    }

    /// Returns the full allocation size, control block included.
    pub fn chunk_size(&self) -> usize {
        self.region.len()
    }

    /// Returns true if there is nothing left to read.
    pub fn is_empty(&self) -> bool {
        self.readable_size() == 0
    }

    /// Returns true if there is no room left to write.
    pub fn is_full(&self) -> bool {
        self.writable_size() == 0
    }

    /// Returns the read cursor as an offset from the start of the body.
    pub fn rpos(&self) -> usize {
        self.rpos
    }

    /// Returns the write cursor as an offset from the start of the body.
    pub fn wpos(&self) -> usize {
        self.wpos
    }

    /// Returns the unread bytes `[rpos, wpos)`.
    pub fn readable(&self) -> &[u8] {
        &self.region[self.rpos..self.wpos]
    }

    /// Returns the writable space `[wpos, end)`.
    ///
    /// Fill it directly (for instance from a socket read) and commit the
    /// bytes with [`Mbuf::advance_write`].
    pub fn writable_mut(&mut self) -> &mut [u8] {
        &mut self.region[self.wpos..self.end]
    }

    /// Marks `n` bytes as consumed.
    ///
    /// # Panics
    ///
    /// Panics if fewer than `n` bytes are readable.
    pub fn advance_read(&mut self, n: usize) {
        let rsize = self.readable_size();
        assert!(
            n <= rsize,
            "{}: cannot consume {} bytes, only {} readable",
            self.id,
            n,
            rsize
        );
        self.rpos += n;
    }

    /// Commits `n` bytes previously written into [`Mbuf::writable_mut`].
    ///
    /// # Panics
    ///
    /// Panics if fewer than `n` bytes are writable.
    pub fn advance_write(&mut self, n: usize) {
        let wsize = self.writable_size();
        assert!(
            n <= wsize,
            "{}: cannot commit {} bytes, only {} writable",
            self.id,
            n,
            wsize
        );
        self.wpos += n;
    }

    /// Moves the unread bytes to the start of the body, reclaiming space
    /// consumed by earlier reads.
    pub fn shift_left(&mut self) {
        let size = self.readable_size();
        self.region.copy_within(self.rpos..self.wpos, 0);
        self.rpos = 0;
        self.wpos = size;
    }

    /// Moves the unread bytes so they end at `end`, leaving all free space in
    /// front of `rpos` (room to prepend a header).
    pub fn shift_right(&mut self) {
        let size = self.readable_size();
        let dst = self.end - size;
        self.region.copy_within(self.rpos..self.wpos, dst);
        self.rpos = dst;
        self.wpos = self.end;
    }

    /// Appends `src` at the write cursor.
    ///
    /// An empty `src` is a no-op. The source is a shared borrow, so it can
    /// never alias this buffer's body.
    ///
    /// # Panics
    ///
    /// Panics if `src` does not fit in [`Mbuf::writable_size`]. Nothing is
    /// written in that case.
    pub fn copy(&mut self, src: &[u8]) {
        let n = src.len();
        if n == 0 {
            return;
        }

        let wsize = self.writable_size();
        assert!(
            n <= wsize,
            "{}: copy of {} bytes exceeds writable size {}",
            self.id,
            n,
            wsize
        );

        self.region[self.wpos..self.wpos + n].copy_from_slice(src);
        self.wpos += n;
    }

    /// Appends an externally owned byte string. Same contract as [`Mbuf::copy`].
    pub fn copy_bstring(&mut self, bstr: &Bytes) {
        self.copy(bstr);
    }

    /// Moves the bytes `[cut, wpos)` to the end of `dst` and truncates this
    /// buffer at `cut`.
    ///
    /// `dst` may already hold content (for example a protocol header), which
    /// then precedes the moved bytes. See [`MbufPool::split`](crate::MbufPool::split)
    /// for the variant that borrows `dst` from a pool.
    ///
    /// # Panics
    ///
    /// Panics if `cut` is outside `[rpos, wpos]` or if the moved bytes do not
    /// fit in `dst`.
    pub fn split_into(&mut self, cut: usize, dst: &mut Mbuf) {
        assert!(
            self.rpos <= cut && cut <= self.wpos,
            "{}: split point {} outside readable range [{}, {}]",
            self.id,
            cut,
            self.rpos,
            self.wpos
        );

        let size = self.wpos - cut;
        dst.copy(&self.region[cut..self.wpos]);
        self.wpos = cut;

        trace!(
            mbuf = %self.id,
            len = self.readable_size(),
            nbuf = %dst.id,
            nlen = dst.readable_size(),
            copied = size,
            "split mbuf"
        );
    }

    /// Copies the unread bytes into a new [`Bytes`].
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(self.readable())
    }

    /// Returns true if the guard value in the control block is untouched.
    pub fn is_intact(&self) -> bool {
        self.guard() == MBUF_MAGIC
    }

    pub(crate) fn owner(&self) -> Option<u64> {
        self.owner
    }

    pub(crate) fn assert_intact(&self) {
        let guard = self.guard();
        assert!(
            guard == MBUF_MAGIC,
            "{}: guard corrupted (found {:#010x}, expected {:#010x})",
            self.id,
            guard,
            MBUF_MAGIC
        );
    }

    fn guard(&self) -> u32 {
        let mut raw = [0u8; GUARD_LEN];
        raw.copy_from_slice(&self.region[self.end..self.end + GUARD_LEN]);
        u32::from_le_bytes(raw)
    }

    #[cfg(test)]
    pub(crate) fn corrupt_guard(&mut self) {
        self.region[self.end] ^= 0xff;
    }

    #[cfg(test)]
    pub(crate) fn region_ptr(&self) -> *const u8 {
        self.region.as_ptr()
    }
}

impl Buf for Mbuf {
    fn remaining(&self) -> usize {
        self.readable_size()
    }

    fn chunk(&self) -> &[u8] {
        self.readable()
    }

    fn advance(&mut self, cnt: usize) {
        self.advance_read(cnt);
    }
}

/// Writes as much as fits; a full buffer reports a zero-length write.
impl io::Write for Mbuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = buf.len().min(self.writable_size());
        self.copy(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl fmt::Debug for Mbuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mbuf")
            .field("id", &self.id)
            .field("rpos", &self.rpos)
            .field("wpos", &self.wpos)
            .field("end", &self.end)
            .field("owner", &self.owner)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn mbuf(chunk_size: usize) -> Mbuf {
        let mut mbuf = Mbuf::create(&MbufConfig::new(chunk_size).unwrap()).unwrap();
        mbuf.reset();
        mbuf
    }

    #[test]
    fn test_create_layout() {
        let mbuf = mbuf(2048);
        assert_eq!(mbuf.chunk_size(), 2048);
        assert_eq!(mbuf.capacity(), 1984);
        assert_eq!(mbuf.readable_size(), 0);
        assert_eq!(mbuf.writable_size(), 1984);
        assert!(mbuf.is_intact());
        assert!(mbuf.is_empty());
        assert!(!mbuf.is_full());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = mbuf(256);
        let b = mbuf(256);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_reset_idempotent() {
        let mut mbuf = mbuf(256);
        mbuf.copy(b"abcdef");
        mbuf.advance_read(2);

        mbuf.reset();
        let once = (mbuf.rpos(), mbuf.wpos());
        mbuf.reset();
        assert_eq!((mbuf.rpos(), mbuf.wpos()), once);
        assert_eq!(once, (0, 0));
    }

    #[test]
    fn test_copy_and_read() {
        let mut mbuf = mbuf(256);
        mbuf.copy(b"hello");
        assert_eq!(mbuf.readable_size(), 5);
        assert_eq!(mbuf.readable(), b"hello");

        mbuf.copy(b" world");
        assert_eq!(mbuf.readable(), b"hello world");
        assert_eq!(mbuf.writable_size(), mbuf.capacity() - 11);
    }

    #[test]
    fn test_copy_empty_is_noop() {
        let mut mbuf = mbuf(256);
        mbuf.copy(&[]);
        assert_eq!(mbuf.wpos(), 0);

        // Also a no-op on a full buffer.
        let cap = mbuf.capacity();
        mbuf.copy(&vec![1u8; cap]);
        assert!(mbuf.is_full());
        mbuf.copy(&[]);
        assert_eq!(mbuf.wpos(), cap);
    }

    #[test]
    fn test_copy_exactly_capacity() {
        let mut mbuf = mbuf(128);
        let data: Vec<u8> = (0..mbuf.capacity() as u8).collect();
        mbuf.copy(&data);
        assert!(mbuf.is_full());
        assert_eq!(mbuf.readable(), &data[..]);
        assert!(mbuf.is_intact());
    }

    #[test]
    #[should_panic(expected = "exceeds writable size")]
    fn test_copy_overflow_panics() {
        let mut mbuf = mbuf(128);
        let data = vec![0u8; mbuf.capacity() + 1];
        mbuf.copy(&data);
    }

    #[test]
    fn test_copy_bstring() {
        let mut mbuf = mbuf(128);
        mbuf.copy_bstring(&Bytes::from_static(b"VALUE"));
        assert_eq!(mbuf.readable(), b"VALUE");
    }

    #[test]
    fn test_shift_left() {
        let mut mbuf = mbuf(128);
        mbuf.copy(b"0123456789");
        mbuf.advance_read(3);

        mbuf.shift_left();
        assert_eq!(mbuf.rpos(), 0);
        assert_eq!(mbuf.wpos(), 7);
        assert_eq!(mbuf.readable(), b"3456789");
    }

    #[test]
    fn test_shift_right() {
        let mut mbuf = mbuf(128);
        mbuf.copy(b"0123456789");
        mbuf.advance_read(4);

        mbuf.shift_right();
        assert_eq!(mbuf.wpos(), mbuf.capacity());
        assert_eq!(mbuf.rpos(), mbuf.capacity() - 6);
        assert_eq!(mbuf.readable(), b"456789");
        assert!(mbuf.is_intact());
    }

    #[test]
    fn test_shift_empty() {
        let mut mbuf = mbuf(128);
        mbuf.shift_right();
        assert_eq!(mbuf.rpos(), mbuf.capacity());
        assert!(mbuf.is_empty());

        mbuf.shift_left();
        assert_eq!((mbuf.rpos(), mbuf.wpos()), (0, 0));
    }

    #[test]
    fn test_writable_mut_and_advance_write() {
        let mut mbuf = mbuf(128);
        mbuf.writable_mut()[..3].copy_from_slice(b"abc");
        mbuf.advance_write(3);
        assert_eq!(mbuf.readable(), b"abc");
    }

    #[test]
    #[should_panic(expected = "only 2 readable")]
    fn test_advance_read_past_wpos_panics() {
        let mut mbuf = mbuf(128);
        mbuf.copy(b"ab");
        mbuf.advance_read(3);
    }

    #[test]
    #[should_panic(expected = "cannot commit")]
    fn test_advance_write_past_end_panics() {
        let mut mbuf = mbuf(128);
        let cap = mbuf.capacity();
        mbuf.advance_write(cap + 1);
    }

    #[test]
    fn test_split_into() {
        let mut src = mbuf(256);
        let mut dst = mbuf(256);
        src.copy(b"hello");

        src.split_into(src.rpos() + 2, &mut dst);
        assert_eq!(src.readable(), b"he");
        assert_eq!(dst.readable(), b"llo");
    }

    #[test]
    fn test_split_into_after_header() {
        let mut src = mbuf(256);
        let mut dst = mbuf(256);
        src.copy(b"GET a\r\nGET b\r\n");
        dst.copy(b"HDR:");

        src.split_into(7, &mut dst);
        assert_eq!(src.readable(), b"GET a\r\n");
        assert_eq!(dst.readable(), b"HDR:GET b\r\n");
    }

    #[test]
    fn test_split_at_wpos_moves_nothing() {
        let mut src = mbuf(256);
        let mut dst = mbuf(256);
        src.copy(b"abc");

        let wpos = src.wpos();
        src.split_into(wpos, &mut dst);
        assert_eq!(src.readable(), b"abc");
        assert!(dst.is_empty());
    }

    #[test]
    #[should_panic(expected = "outside readable range")]
    fn test_split_before_rpos_panics() {
        let mut src = mbuf(256);
        let mut dst = mbuf(256);
        src.copy(b"abcdef");
        src.advance_read(3);
        src.split_into(1, &mut dst);
    }

    #[test]
    fn test_buf_impl() {
        let mut mbuf = mbuf(128);
        mbuf.copy(&[0x00, 0x2a, 0xff, 0x01, 0x02]);

        assert_eq!(mbuf.remaining(), 5);
        assert_eq!(mbuf.get_u16(), 0x002a);
        assert_eq!(mbuf.get_u8(), 0xff);
        assert_eq!(mbuf.rpos(), 3);
        assert_eq!(mbuf.copy_to_bytes(2), Bytes::from_static(&[0x01, 0x02]));
        assert!(mbuf.is_empty());
    }

    #[test]
    fn test_write_impl_stops_at_end() {
        let mut mbuf = mbuf(HEADER + 8);
        assert_eq!(mbuf.write(b"0123456789").unwrap(), 8);
        assert!(mbuf.is_full());
        assert_eq!(mbuf.write(b"x").unwrap(), 0);
        assert!(mbuf.write_all(b"x").is_err());
        assert!(mbuf.is_intact());
    }

    #[test]
    fn test_write_fmt() {
        let mut mbuf = mbuf(128);
        write!(mbuf, "VALUE {} 0 {}\r\n", "key", 5).unwrap();
        assert_eq!(mbuf.readable(), b"VALUE key 0 5\r\n");
    }

    #[test]
    fn test_to_bytes_leaves_cursors() {
        let mut mbuf = mbuf(128);
        mbuf.copy(b"data");
        assert_eq!(mbuf.to_bytes(), Bytes::from_static(b"data"));
        assert_eq!(mbuf.readable_size(), 4);
    }

    #[test]
    fn test_corrupted_guard_detected() {
        let mut mbuf = mbuf(128);
        mbuf.corrupt_guard();
        assert!(!mbuf.is_intact());
    }

    #[test]
    #[should_panic(expected = "guard corrupted")]
    fn test_destroy_corrupted_panics() {
        let mut mbuf = mbuf(128);
        mbuf.corrupt_guard();
        mbuf.destroy();
    }

    #[test]
    #[should_panic(expected = "guard corrupted")]
    fn test_destroy_checks_guard_before_cursors() {
        let mut mbuf = mbuf(128);
        mbuf.corrupt_guard();
        mbuf.rpos = 1;
        mbuf.wpos = 0;
        mbuf.destroy();
    }

    #[test]
    fn test_standalone_has_no_owner() {
        let mbuf = mbuf(128);
        assert_eq!(mbuf.owner(), None);
    }

    #[test]
    fn test_destroy_intact() {
        let mut mbuf = mbuf(128);
        mbuf.copy(b"bye");
        mbuf.destroy();
    }

    const HEADER: usize = crate::config::HEADER_SIZE;
}
