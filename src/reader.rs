use std::io::{self, Read};

use zerocopy::byteorder::{BE, U32};
use zerocopy::FromBytes;

use crate::decimal::Decimal128;
use crate::encoding::{TextDecoder, TextEncoding, Utf8Encoding};
use crate::error::{CodecError, Result};

/// Smallest scratch buffer the reader will allocate.
const MIN_SCRATCH: usize = 16;

/// Chunk size used while reading string payloads.
const CHAR_CHUNK: usize = 128;

/// Decodes big-endian values from a byte stream.
///
/// Each value is read with an accumulate-until-satisfied loop, so streams
/// that deliver short reads (sockets, pipes) are handled transparently: a
/// read either produces the complete value or fails with
/// [`CodecError::EndOfStream`]. The reader never buffers ahead — exactly
/// the wire width of each value is consumed from the stream.
///
/// String payloads are decoded through the [`TextEncoding`] supplied at
/// construction (UTF-8 by default) using a stateful decoder, so multi-byte
/// characters split across internal chunk boundaries survive intact.
///
/// The reader wraps exactly one stream for its lifetime. By default it
/// owns the stream and drops it on [`close`](Self::close); construct with
/// [`with_options`](Self::with_options) and `leave_open = true` to keep
/// the stream alive past the reader. After the first `close`, every read
/// fails with [`CodecError::Disposed`].
///
/// The reader is not thread-safe; operations take `&mut self` and the
/// contract is one caller at a time.
pub struct BigEndianReader<R> {
    /// `None` once the reader is closed and owned the stream.
    stream: Option<R>,
    /// Reused for every fixed-width read; at least [`MIN_SCRATCH`] bytes.
    scratch: Vec<u8>,
    /// Chunk buffer for string payloads, allocated on first use.
    char_bytes: Vec<u8>,
    decoder: Box<dyn TextDecoder>,
    leave_open: bool,
    disposed: bool,
}

impl<R: Read> BigEndianReader<R> {
    /// Creates a reader over `stream` decoding strings as UTF-8. The
    /// stream is dropped when the reader is closed.
    pub fn new(stream: R) -> Self {
        Self::with_options(stream, Utf8Encoding, false)
    }

    /// Creates a reader with an explicit string encoding. The stream is
    /// dropped when the reader is closed.
    pub fn with_encoding<E: TextEncoding>(stream: R, encoding: E) -> Self {
        Self::with_options(stream, encoding, false)
    }

    /// Creates a reader with an explicit string encoding and stream
    /// ownership. When `leave_open` is true the stream survives
    /// [`close`](Self::close) and can be recovered with
    /// [`into_inner`](Self::into_inner).
    pub fn with_options<E: TextEncoding>(stream: R, encoding: E, leave_open: bool) -> Self {
        let scratch = vec![0; encoding.max_bytes_per_char().max(MIN_SCRATCH)];
        Self {
            stream: Some(stream),
            scratch,
            char_bytes: Vec::new(),
            decoder: encoding.new_decoder(),
            leave_open,
            disposed: false,
        }
    }

    /// Closes the reader. Every subsequent read fails with
    /// [`CodecError::Disposed`].
    ///
    /// The wrapped stream is dropped unless the reader was constructed
    /// with `leave_open`. Closing an already-closed reader has no effect.
    pub fn close(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        if !self.leave_open {
            self.stream = None;
        }
    }

    /// Consumes the reader and returns the wrapped stream, or `None` if
    /// the reader was closed while owning it.
    pub fn into_inner(mut self) -> Option<R> {
        self.stream.take()
    }

    /// Reads exactly `n` bytes into the scratch buffer, looping over
    /// short reads until satisfied.
    fn fill(&mut self, n: usize) -> Result<()> {
        if self.disposed {
            return Err(CodecError::Disposed);
        }
        if n > self.scratch.len() {
            return Err(CodecError::OutOfRangeBufferRequest {
                requested: n,
                capacity: self.scratch.len(),
            });
        }
        let Self { stream, scratch, .. } = self;
        let stream = stream.as_mut().ok_or(CodecError::Disposed)?;
        let mut have = 0;
        while have < n {
            match stream.read(&mut scratch[have..n]) {
                Ok(0) => return Err(CodecError::EndOfStream),
                Ok(read) => have += read,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Fills the scratch buffer and returns its first `N` bytes.
    fn fill_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.fill(N)?;
        // `fill` checked the length, so this unwrap cannot fail.
        Ok(<[u8; N]>::try_from(&self.scratch[..N]).unwrap())
    }

    /// Reads exactly `buf.len()` bytes into `buf`.
    #[cfg(feature = "bstr")]
    fn read_full(&mut self, buf: &mut [u8]) -> Result<()> {
        if self.disposed {
            return Err(CodecError::Disposed);
        }
        let stream = self.stream.as_mut().ok_or(CodecError::Disposed)?;
        let mut have = 0;
        while have < buf.len() {
            match stream.read(&mut buf[have..]) {
                Ok(0) => return Err(CodecError::EndOfStream),
                Ok(read) => have += read,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Reads a `bool`. Zero decodes as false, any nonzero byte as true.
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.fill_array::<1>()?[0] != 0)
    }

    /// Reads a single `u8`.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.fill_array::<1>()?[0])
    }

    /// Reads a single `i8`.
    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    /// Reads an `i16` in big-endian byte order.
    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(i16::from_be_bytes(self.fill_array()?))
    }

    /// Reads a `u16` in big-endian byte order.
    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.fill_array()?))
    }

    /// Reads an `i32` in big-endian byte order.
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.fill_array()?))
    }

    /// Reads a `u32` in big-endian byte order.
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.fill_array()?))
    }

    /// Reads an `i64` in big-endian byte order.
    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_be_bytes(self.fill_array()?))
    }

    /// Reads a `u64` in big-endian byte order.
    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(self.fill_array()?))
    }

    /// Reads an `f32` from its 4-byte big-endian IEEE-754 representation.
    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_be_bytes(self.fill_array()?))
    }

    /// Reads an `f64` from its 8-byte big-endian IEEE-754 representation.
    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_be_bytes(self.fill_array()?))
    }

    /// Reads a [`Decimal128`] from its 16-byte wire form.
    ///
    /// The wire stores the components as flags, hi, mid, lo — each
    /// big-endian — so both the component order and the byte order are
    /// reversed while reassembling the host value.
    pub fn read_decimal(&mut self) -> Result<Decimal128> {
        self.fill(16)?;
        // `fill` checked the length, so this unwrap cannot fail.
        let [flags, hi, mid, lo] = <[U32<BE>; 4]>::read_from_bytes(&self.scratch[..16]).unwrap();
        Ok(Decimal128::from_raw_parts(
            lo.get(),
            mid.get(),
            hi.get(),
            flags.get(),
        ))
    }

    /// Reads a length-prefixed string.
    ///
    /// The prefix is a big-endian `i16` byte count. A negative count
    /// fails with [`CodecError::InvalidStringLength`] before any payload
    /// byte is consumed; a zero count yields the empty string. The
    /// payload is decoded in chunks of at most 128 bytes through the
    /// configured encoding's stateful decoder, so multi-byte characters
    /// spanning chunk boundaries are reassembled correctly. Running out
    /// of stream before the declared count is satisfied fails with
    /// [`CodecError::EndOfStream`].
    pub fn read_short_string(&mut self) -> Result<String> {
        if self.disposed {
            return Err(CodecError::Disposed);
        }
        let len = self.read_i16()?;
        if len < 0 {
            return Err(CodecError::InvalidStringLength(len.into()));
        }
        if len == 0 {
            return Ok(String::new());
        }
        if self.char_bytes.is_empty() {
            self.char_bytes.resize(CHAR_CHUNK, 0);
        }
        let mut remaining = len as usize;
        let mut out = String::with_capacity(remaining.min(360));
        let Self { stream, char_bytes, decoder, .. } = self;
        let stream = stream.as_mut().ok_or(CodecError::Disposed)?;
        while remaining > 0 {
            let want = remaining.min(CHAR_CHUNK);
            let got = match stream.read(&mut char_bytes[..want]) {
                Ok(0) => return Err(CodecError::EndOfStream),
                Ok(got) => got,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            decoder.decode(&char_bytes[..got], &mut out);
            remaining -= got;
        }
        decoder.finish(&mut out);
        Ok(out)
    }

    /// Reads a length-prefixed string payload without decoding it.
    ///
    /// The length prefix is validated exactly as in
    /// [`read_short_string`](Self::read_short_string); the payload bytes
    /// are returned as-is. Useful when the payload's encoding is unknown
    /// or when the caller wants to defer validation.
    #[cfg(feature = "bstr")]
    pub fn read_short_string_raw(&mut self) -> Result<bstr::BString> {
        if self.disposed {
            return Err(CodecError::Disposed);
        }
        let len = self.read_i16()?;
        if len < 0 {
            return Err(CodecError::InvalidStringLength(len.into()));
        }
        let mut buf = vec![0u8; len as usize];
        self.read_full(&mut buf)?;
        Ok(bstr::BString::from(buf))
    }

    /// Reads up to `count` bytes, stopping early only at end of data.
    ///
    /// The returned buffer is shorter than `count` when the stream ends
    /// first; reaching end of data here is not an error.
    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>> {
        if self.disposed {
            return Err(CodecError::Disposed);
        }
        let stream = self.stream.as_mut().ok_or(CodecError::Disposed)?;
        let mut buf = vec![0u8; count];
        let mut filled = 0;
        while filled < count {
            match stream.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(read) => filled += read,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        buf.truncate(filled);
        Ok(buf)
    }
}
