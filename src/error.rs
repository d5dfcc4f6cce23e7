//! Failure taxonomy shared by the reader and the writer.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CodecError>;

/// Errors raised by [`BigEndianReader`](crate::BigEndianReader) and
/// [`BigEndianWriter`](crate::BigEndianWriter) operations.
///
/// Every failure is surfaced synchronously to the caller of the operation
/// that triggered it; nothing is retried or suppressed internally. There is
/// no partial-success state: a value is either fully decoded/encoded or the
/// operation fails, with the stream position left wherever the underlying
/// partial reads or writes left it.
#[derive(Debug, Error)]
pub enum CodecError {
    /// An operation was attempted after the reader or writer was closed.
    #[error("cannot access a closed reader or writer")]
    Disposed,

    /// The stream ran out of bytes before the operation was satisfied.
    #[error("attempted to read past the end of the stream")]
    EndOfStream,

    /// A declared or computed string byte length falls outside `0..=32767`.
    #[error("invalid string length of {0} bytes")]
    InvalidStringLength(i64),

    /// An internal scratch-buffer request exceeded the buffer's capacity.
    /// Not reachable through the public surface.
    #[error("requested {requested} bytes from a {capacity}-byte scratch buffer")]
    OutOfRangeBufferRequest {
        /// Number of bytes requested.
        requested: usize,
        /// Capacity of the scratch buffer.
        capacity: usize,
    },

    /// The underlying stream failed.
    #[error("stream error: {0}")]
    Io(#[from] std::io::Error),
}
