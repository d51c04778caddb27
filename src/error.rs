//! Error types for smallworld.

use thiserror::Error;

/// Errors surfaced at the codec boundary.
///
/// Insert and search are infallible; only snapshot I/O can fail.
#[derive(Debug, Error)]
pub enum Error {
    /// Backing store operation failed; propagated verbatim.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed record: version mismatch, truncated binary, length disagreement.
    #[error("codec error: {0}")]
    Codec(String),

    /// A decoded adjacency list references a node outside the arena.
    #[error("pointer {addr} out of range for arena of {size} nodes")]
    PointerOutOfRange { addr: u32, size: u32 },
}

/// Result type alias for smallworld operations.
pub type Result<T> = std::result::Result<T, Error>;
