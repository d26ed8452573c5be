//! # Wire Error Types
//!
//! Everything that can go wrong while reading or writing a datagram.
//! None of these are ever reported to the peer: a datagram that fails to
//! decode is dropped without a reply.

use thiserror::Error;

/// Errors produced by the wire codec.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireError {
    /// The datagram ended before the record did.
    #[error("truncated record: needed {needed} more bytes, {remaining} remaining")]
    Truncated {
        /// Bytes the next field required.
        needed: usize,
        /// Bytes left in the buffer.
        remaining: usize,
    },

    /// The output buffer cannot hold the record.
    #[error("buffer full: {needed} bytes needed, {remaining} remaining")]
    BufferFull {
        /// Bytes the next field required.
        needed: usize,
        /// Bytes left in the buffer.
        remaining: usize,
    },

    /// The leading type tag is not a known message type.
    #[error("unknown message type: {0}")]
    UnknownType(u8),

    /// The type tag does not match the record being decoded.
    #[error("unexpected message type: expected {expected}, got {actual}")]
    UnexpectedType {
        /// Tag the decoder was built for.
        expected: u8,
        /// Tag found in the datagram.
        actual: u8,
    },

    /// The trailing checksum does not match the record bytes.
    #[error("checksum mismatch: computed {computed:#010x}, received {received:#010x}")]
    ChecksumMismatch {
        /// Checksum recomputed over the record.
        computed: u32,
        /// Checksum carried by the record.
        received: u32,
    },

    /// The declared payload length runs past the end of the datagram.
    #[error("payload overrun: declared {declared} bytes, {available} available")]
    PayloadOverrun {
        /// Length declared in the header.
        declared: usize,
        /// Bytes actually present after the header.
        available: usize,
    },

    /// An unknown error code was found in a response.
    #[error("unknown error code: {0}")]
    UnknownErrorCode(i8),
}

/// Result type for codec operations.
pub type WireResult<T> = Result<T, WireError>;
