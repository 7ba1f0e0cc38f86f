//! Error types for mbufpool.
//!
//! Only recoverable conditions are represented here. Contract violations
//! (guard mismatch, cursor disorder, overfull copies) panic instead.

use std::fmt;

/// Errors that can occur while configuring a pool or obtaining buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MbufError {
    /// The allocator could not provide a new chunk.
    OutOfMemory {
        /// Number of bytes that were requested.
        requested: usize,
    },

    /// Invalid configuration parameter.
    InvalidConfig {
        /// Description of what was invalid.
        message: &'static str,
    },
}

impl fmt::Display for MbufError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MbufError::OutOfMemory { requested } => {
                write!(f, "out of memory: failed to allocate {} bytes", requested)
            }
            MbufError::InvalidConfig { message } => {
                write!(f, "invalid config: {}", message)
            }
        }
    }
}

impl std::error::Error for MbufError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_oom() {
        let err = MbufError::OutOfMemory { requested: 2048 };
        let msg = err.to_string();
        assert!(msg.contains("out of memory"));
        assert!(msg.contains("2048"));
    }

    #[test]
    fn test_display_config() {
        let err = MbufError::InvalidConfig {
            message: "chunk_size must be larger than the mbuf header",
        };
        assert!(err.to_string().starts_with("invalid config"));
    }

    #[test]
    fn test_is_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(MbufError::OutOfMemory { requested: 1 });
        assert!(err.source().is_none());
    }
}
