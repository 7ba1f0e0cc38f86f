//! Configuration for mbuf sizing and pool retention.
//!
//! - [`MbufConfig`] - Chunk size (and therefore capacity) plus free list ceiling
//!
//! # Example
//!
//! ```
//! use mbufpool::MbufConfig;
//!
//! let config = MbufConfig::new(2048)?.with_max_free(64);
//! assert_eq!(config.capacity(), 1984);
//!
//! # Ok::<(), mbufpool::MbufError>(())
//! ```

use crate::error::MbufError;

/// Default chunk size, header included (16 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

/// Size of the control block reserved at the tail of every chunk.
pub const HEADER_SIZE: usize = 64;

/// Default free list ceiling. Zero means the pool retains every returned buffer.
pub const DEFAULT_MAX_FREE: usize = 0;

/// Largest accepted chunk size. Cursor arithmetic stays within 32 bits.
pub const MAX_CHUNK_SIZE: usize = u32::MAX as usize;

/// Guard value stored at the start of each chunk's control block.
pub const MBUF_MAGIC: u32 = 0xdead_beef;

/// Sizing and retention parameters shared by every buffer of a pool.
///
/// A chunk is one allocation of `chunk_size` bytes: the writable body comes
/// first, followed by [`HEADER_SIZE`] bytes of control block. All buffers built
/// from the same configuration therefore share one capacity.
///
/// # Constraints
///
/// - `chunk_size` must be larger than [`HEADER_SIZE`]
/// - `chunk_size` must not exceed [`MAX_CHUNK_SIZE`]
///
/// # Example
///
/// ```
/// use mbufpool::{MbufConfig, HEADER_SIZE};
///
/// let config = MbufConfig::default().with_chunk_size(4096);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.capacity(), 4096 - HEADER_SIZE);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MbufConfig {
    /// Total allocation size per buffer, control block included.
    chunk_size: usize,

    /// Maximum number of idle buffers kept by the pool (0 = unbounded).
    max_free: usize,
}

impl MbufConfig {
    /// Creates a configuration for the given chunk size with an unbounded free list.
    ///
    /// # Errors
    ///
    /// Returns [`MbufError::InvalidConfig`] if the chunk cannot hold the
    /// control block plus at least one body byte, or if it exceeds
    /// [`MAX_CHUNK_SIZE`].
    ///
    /// # Example
    ///
    /// ```
    /// use mbufpool::MbufConfig;
    ///
    /// assert!(MbufConfig::new(2048).is_ok());
    /// assert!(MbufConfig::new(64).is_err());
    /// ```
    pub fn new(chunk_size: usize) -> Result<Self, MbufError> {
        let config = Self {
            chunk_size,
            max_free: DEFAULT_MAX_FREE,
        };
        config.validate()?;
        Ok(config)
    }

    /// Sets the chunk size.
    ///
    /// Note: This does not validate the configuration. Use [`MbufConfig::validate`]
    /// to check if the configuration is valid.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Sets how many idle buffers the pool keeps before it starts discarding
    /// returned ones. Zero keeps everything.
    ///
    /// # Example
    ///
    /// ```
    /// use mbufpool::MbufConfig;
    ///
    /// let config = MbufConfig::default().with_max_free(8);
    /// assert_eq!(config.max_free(), 8);
    /// ```
    pub fn with_max_free(mut self, max_free: usize) -> Self {
        self.max_free = max_free;
        self
    }

    /// Returns the chunk size, control block included.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Returns the free list ceiling (0 = unbounded).
    pub fn max_free(&self) -> usize {
        self.max_free
    }

    /// Returns the usable body size of every buffer built from this configuration.
    ///
    /// Zero for a chunk size that cannot hold the header; such a
    /// configuration fails [`MbufConfig::validate`].
    pub fn capacity(&self) -> usize {
        self.chunk_size.saturating_sub(HEADER_SIZE)
    }

    /// Validates the current configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use mbufpool::MbufConfig;
    ///
    /// let config = MbufConfig::default().with_chunk_size(10);
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), MbufError> {
        if self.chunk_size <= HEADER_SIZE {
            return Err(MbufError::InvalidConfig {
                message: "chunk_size must be larger than the mbuf header",
            });
        }

        if self.chunk_size > MAX_CHUNK_SIZE {
            return Err(MbufError::InvalidConfig {
                message: "chunk_size must fit in 32 bits",
            });
        }

        Ok(())
    }
}

impl Default for MbufConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_free: DEFAULT_MAX_FREE,
        }
    }
}
