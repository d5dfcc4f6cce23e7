use std::io::Write;

use zerocopy::byteorder::{BE, U32};
use zerocopy::IntoBytes;

use crate::decimal::Decimal128;
use crate::encoding::{TextEncoder, TextEncoding, Utf8Encoding};
use crate::error::{CodecError, Result};

/// Initial size of the reusable string-payload buffer.
const STRING_BUF_LEN: usize = 256;

/// Largest payload the 16-bit length prefix can declare.
const MAX_STRING_BYTES: usize = i16::MAX as usize;

/// Encodes big-endian values onto a byte stream.
///
/// Primitive values are converted to their big-endian wire form and
/// written with a single call; string payloads go through the
/// [`TextEncoding`] supplied at construction (UTF-8 by default), framed
/// by a big-endian `i16` byte length. Payloads longer than 32767 bytes
/// are rejected before the length prefix is written, so a failed string
/// write leaves the stream untouched.
///
/// The writer wraps exactly one stream for its lifetime. By default it
/// owns the stream: [`close`](Self::close) flushes and drops it, and
/// dropping the writer closes it best-effort. Construct with
/// [`with_options`](Self::with_options) and `leave_open = true` to keep
/// the stream alive past the writer. After the first `close`, every
/// write fails with [`CodecError::Disposed`].
///
/// The writer is not thread-safe; operations take `&mut self` and the
/// contract is one caller at a time.
pub struct BigEndianWriter<W: Write> {
    /// `None` once the writer is closed and owned the stream.
    stream: Option<W>,
    encoding: Box<dyn TextEncoding>,
    encoder: Box<dyn TextEncoder>,
    /// Reusable payload buffer, allocated on the first string write.
    str_buf: Vec<u8>,
    /// Characters guaranteed to fit one conversion into `str_buf`.
    max_chars: usize,
    max_bytes_per_char: usize,
    leave_open: bool,
    disposed: bool,
}

impl<W: Write> BigEndianWriter<W> {
    /// Creates a writer over `stream` encoding strings as UTF-8. The
    /// stream is flushed and dropped when the writer is closed.
    pub fn new(stream: W) -> Self {
        Self::with_options(stream, Utf8Encoding, false)
    }

    /// Creates a writer with an explicit string encoding. The stream is
    /// flushed and dropped when the writer is closed.
    pub fn with_encoding<E: TextEncoding + 'static>(stream: W, encoding: E) -> Self {
        Self::with_options(stream, encoding, false)
    }

    /// Creates a writer with an explicit string encoding and stream
    /// ownership. When `leave_open` is true the stream survives
    /// [`close`](Self::close) and can be recovered with
    /// [`into_inner`](Self::into_inner).
    pub fn with_options<E: TextEncoding + 'static>(stream: W, encoding: E, leave_open: bool) -> Self {
        let encoder = encoding.new_encoder();
        let max_bytes_per_char = encoding.max_bytes_per_char().max(1);
        Self {
            stream: Some(stream),
            encoding: Box::new(encoding),
            encoder,
            str_buf: Vec::new(),
            max_chars: 0,
            max_bytes_per_char,
            leave_open,
            disposed: false,
        }
    }

    /// Flushes the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        if self.disposed {
            return Err(CodecError::Disposed);
        }
        let stream = self.stream.as_mut().ok_or(CodecError::Disposed)?;
        stream.flush()?;
        Ok(())
    }

    /// Closes the writer. Every subsequent write fails with
    /// [`CodecError::Disposed`].
    ///
    /// The stream is flushed, and dropped unless the writer was
    /// constructed with `leave_open`. Closing an already-closed writer
    /// has no effect.
    pub fn close(&mut self) -> Result<()> {
        if self.disposed {
            return Ok(());
        }
        self.disposed = true;
        let flushed = match self.stream.as_mut() {
            Some(stream) => stream.flush().map_err(CodecError::from),
            None => Ok(()),
        };
        if !self.leave_open {
            self.stream = None;
        }
        flushed
    }

    /// Consumes the writer and returns the wrapped stream, or `None` if
    /// the writer was closed while owning it.
    pub fn into_inner(mut self) -> Option<W> {
        self.disposed = true;
        self.stream.take()
    }

    /// Accesses the wrapped stream, or `None` once it has been dropped.
    pub fn inner_mut(&mut self) -> Option<&mut W> {
        self.stream.as_mut()
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        if self.disposed {
            return Err(CodecError::Disposed);
        }
        let stream = self.stream.as_mut().ok_or(CodecError::Disposed)?;
        stream.write_all(bytes)?;
        Ok(())
    }

    /// Writes raw bytes with no framing.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_all(bytes)
    }

    /// Writes a `bool` as one byte: 1 for true, 0 for false.
    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_all(&[value as u8])
    }

    /// Writes a single `u8`.
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_all(&[value])
    }

    /// Writes a single `i8`.
    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        self.write_all(&[value as u8])
    }

    /// Writes an `i16` in big-endian byte order.
    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        self.write_all(&value.to_be_bytes())
    }

    /// Writes a `u16` in big-endian byte order.
    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write_all(&value.to_be_bytes())
    }

    /// Writes an `i32` in big-endian byte order.
    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_all(&value.to_be_bytes())
    }

    /// Writes a `u32` in big-endian byte order.
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_all(&value.to_be_bytes())
    }

    /// Writes an `i64` in big-endian byte order.
    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.write_all(&value.to_be_bytes())
    }

    /// Writes a `u64` in big-endian byte order.
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.write_all(&value.to_be_bytes())
    }

    /// Writes an `f32` in its 4-byte big-endian IEEE-754 representation.
    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.write_all(&value.to_be_bytes())
    }

    /// Writes an `f64` in its 8-byte big-endian IEEE-754 representation.
    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.write_all(&value.to_be_bytes())
    }

    /// Writes a [`Decimal128`] in its 16-byte wire form.
    ///
    /// The wire stores the components as flags, hi, mid, lo — the reverse
    /// of the host component order — with each component individually
    /// big-endian.
    pub fn write_decimal(&mut self, value: Decimal128) -> Result<()> {
        let quads: [U32<BE>; 4] = [
            U32::new(value.flags()),
            U32::new(value.hi()),
            U32::new(value.mid()),
            U32::new(value.lo()),
        ];
        self.write_all(quads.as_bytes())
    }

    /// Writes a length-prefixed string.
    ///
    /// The payload's byte length under the configured encoding is
    /// computed first; lengths above 32767 fail with
    /// [`CodecError::InvalidStringLength`] before anything is written.
    /// Payloads that fit the internal buffer are encoded and written in
    /// one call; longer payloads are streamed through the encoding's
    /// stateful encoder in bounded chunks that never split one
    /// character's encoded form.
    pub fn write_short_string(&mut self, value: &str) -> Result<()> {
        if self.disposed {
            return Err(CodecError::Disposed);
        }
        let byte_count = self.encoding.byte_count(value);
        if byte_count > MAX_STRING_BYTES {
            return Err(CodecError::InvalidStringLength(byte_count as i64));
        }
        self.write_i16(byte_count as i16)?;
        if byte_count == 0 {
            return Ok(());
        }
        if self.str_buf.is_empty() {
            self.str_buf
                .resize(STRING_BUF_LEN.max(self.max_bytes_per_char), 0);
            self.max_chars = self.str_buf.len() / self.max_bytes_per_char;
        }

        if byte_count <= self.str_buf.len() {
            let step = self.encoder.convert(value, &mut self.str_buf, true);
            debug_assert_eq!(step.bytes_written, byte_count);
            let stream = self.stream.as_mut().ok_or(CodecError::Disposed)?;
            stream.write_all(&self.str_buf[..step.bytes_written])?;
            return Ok(());
        }

        let mut rest = value;
        let mut chars_left = value.chars().count();
        while !rest.is_empty() {
            let last = chars_left <= self.max_chars;
            let step = self.encoder.convert(rest, &mut self.str_buf, last);
            let stream = self.stream.as_mut().ok_or(CodecError::Disposed)?;
            stream.write_all(&self.str_buf[..step.bytes_written])?;
            rest = &rest[step.bytes_read..];
            chars_left -= step.chars_read;
        }
        Ok(())
    }
}

impl<W: Write> Drop for BigEndianWriter<W> {
    fn drop(&mut self) {
        // Errors surface on an explicit close; drop is best-effort.
        let _ = self.close();
    }
}
