//! Reads and writes binary values in big-endian byte order over `std::io`
//! streams.
//!
//! The codec pair — [`BigEndianReader`] and [`BigEndianWriter`] — covers
//! booleans, 16/32/64-bit signed and unsigned integers, IEEE-754 floats,
//! 128-bit decimals ([`Decimal128`]) and length-prefixed short strings.
//! Multi-byte values are stored most-significant-byte first regardless of
//! the host's native order, so a stream written on one platform decodes
//! bit-for-bit on any other.
//!
//! Strings are framed as a big-endian `i16` byte length followed by the
//! text encoded under a configurable [`TextEncoding`] (UTF-8 by default).
//! The payload length is limited to 32767 bytes; longer strings are
//! rejected before anything reaches the stream.
//!
//! Both halves wrap exactly one stream for their lifetime. Reads tolerate
//! short reads from the underlying stream and either return a complete
//! value or fail with [`CodecError::EndOfStream`]; there is no partially
//! decoded state. Closing a reader or writer is idempotent, and every
//! operation after the first close fails with [`CodecError::Disposed`].

#![forbid(unsafe_code)]
#![forbid(unused_must_use)]
#![warn(missing_docs)]

mod decimal;
mod encoding;
mod error;
mod reader;
mod writer;


pub use decimal::Decimal128;
pub use encoding::{Converted, TextDecoder, TextEncoder, TextEncoding, Utf16Encoding, Utf8Encoding};
pub use error::{CodecError, Result};
pub use reader::BigEndianReader;
pub use writer::BigEndianWriter;
