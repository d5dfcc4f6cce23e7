//! Text encodings used for short-string payloads.
//!
//! The reader and writer never transcode text themselves; they drive a
//! [`TextEncoding`] collaborator. Encoders and decoders are stateful so
//! string payloads can be processed in bounded chunks: a multi-byte
//! character split across two chunks is held back and completed on the
//! next call rather than corrupted at the boundary.
//!
//! Byte sequences that do not decode to valid text are replaced with
//! U+FFFD rather than rejected; the wire format carries no indication of
//! which encoding produced a payload, so the decoder is deliberately
//! forgiving.

use zerocopy::byteorder::{LE, U16};
use zerocopy::FromBytes;

/// Progress report from a single [`TextEncoder::convert`] call.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Converted {
    /// Characters consumed from the input.
    pub chars_read: usize,
    /// UTF-8 bytes consumed from the input.
    pub bytes_read: usize,
    /// Encoded bytes written to the output buffer.
    pub bytes_written: usize,
}

/// A character encoding for short-string payloads.
pub trait TextEncoding {
    /// Exact number of bytes `s` occupies under this encoding.
    fn byte_count(&self, s: &str) -> usize;

    /// Largest number of bytes a single character can encode to.
    ///
    /// The reader and writer size their buffers from this so a chunk can
    /// always hold at least one whole character.
    fn max_bytes_per_char(&self) -> usize;

    /// Creates a fresh encoder with no pending state.
    fn new_encoder(&self) -> Box<dyn TextEncoder>;

    /// Creates a fresh decoder with no pending state.
    fn new_decoder(&self) -> Box<dyn TextDecoder>;
}

/// Converts characters to encoded bytes, one bounded chunk at a time.
pub trait TextEncoder {
    /// Encodes the longest whole-character prefix of `input` that fits in
    /// `out` and reports how much was consumed and produced.
    ///
    /// One character's encoded form is never split across calls, so every
    /// produced chunk is safe to write to the stream as-is. `last` is true
    /// when the caller knows the remaining input fits in this call; it
    /// exists for encodings with shift state and is ignored by the
    /// built-in encoders.
    fn convert(&mut self, input: &str, out: &mut [u8], last: bool) -> Converted;
}

/// Converts encoded bytes back to characters, one bounded chunk at a time.
///
/// Implementations retain partial multi-byte sequences between calls.
pub trait TextDecoder {
    /// Decodes `input`, appending the resulting characters to `out`.
    ///
    /// A trailing partial sequence is held back and completed by the next
    /// call.
    fn decode(&mut self, input: &[u8], out: &mut String);

    /// Flushes any pending partial sequence, emitting U+FFFD if the input
    /// ended mid-character, and resets the decoder.
    fn finish(&mut self, out: &mut String);
}

/// UTF-8, the default payload encoding.
#[derive(Clone, Copy, Debug, Default)]
pub struct Utf8Encoding;

impl TextEncoding for Utf8Encoding {
    fn byte_count(&self, s: &str) -> usize {
        s.len()
    }

    fn max_bytes_per_char(&self) -> usize {
        4
    }

    fn new_encoder(&self) -> Box<dyn TextEncoder> {
        Box::new(Utf8Encoder)
    }

    fn new_decoder(&self) -> Box<dyn TextDecoder> {
        Box::new(Utf8Decoder::default())
    }
}

struct Utf8Encoder;

impl TextEncoder for Utf8Encoder {
    fn convert(&mut self, input: &str, out: &mut [u8], _last: bool) -> Converted {
        // Longest char-boundary prefix that fits in `out`.
        let mut end = input.len().min(out.len());
        while !input.is_char_boundary(end) {
            end -= 1;
        }
        out[..end].copy_from_slice(&input.as_bytes()[..end]);
        Converted {
            chars_read: input[..end].chars().count(),
            bytes_read: end,
            bytes_written: end,
        }
    }
}

/// Number of bytes in the sequence introduced by a UTF-8 lead byte.
fn utf8_seq_len(lead: u8) -> usize {
    match lead {
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        _ => 4,
    }
}

#[derive(Default)]
struct Utf8Decoder {
    /// Bytes of an incomplete sequence left over from the previous chunk.
    pending: [u8; 4],
    pending_len: usize,
}

impl TextDecoder for Utf8Decoder {
    fn decode(&mut self, input: &[u8], out: &mut String) {
        let mut input = input;

        if self.pending_len > 0 {
            let need = utf8_seq_len(self.pending[0]);
            while self.pending_len < need && !input.is_empty() && (input[0] & 0xc0) == 0x80 {
                self.pending[self.pending_len] = input[0];
                self.pending_len += 1;
                input = &input[1..];
            }
            if self.pending_len == need {
                match std::str::from_utf8(&self.pending[..need]) {
                    Ok(s) => out.push_str(s),
                    Err(_) => out.push(char::REPLACEMENT_CHARACTER),
                }
                self.pending_len = 0;
            } else if input.is_empty() {
                // Still incomplete; wait for the next chunk.
                return;
            } else {
                // Cut short by a non-continuation byte.
                out.push(char::REPLACEMENT_CHARACTER);
                self.pending_len = 0;
            }
        }

        while !input.is_empty() {
            match std::str::from_utf8(input) {
                Ok(s) => {
                    out.push_str(s);
                    return;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    if valid > 0 {
                        // The prefix was just validated; this cannot fail.
                        out.push_str(std::str::from_utf8(&input[..valid]).unwrap());
                    }
                    match err.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            input = &input[valid + bad..];
                        }
                        None => {
                            // Incomplete trailing sequence, at most 3 bytes.
                            let tail = &input[valid..];
                            self.pending[..tail.len()].copy_from_slice(tail);
                            self.pending_len = tail.len();
                            return;
                        }
                    }
                }
            }
        }
    }

    fn finish(&mut self, out: &mut String) {
        if self.pending_len > 0 {
            out.push(char::REPLACEMENT_CHARACTER);
            self.pending_len = 0;
        }
    }
}

/// UTF-16 with little-endian code units, the order used by .NET's
/// `UnicodeEncoding` and Windows wide strings.
#[derive(Clone, Copy, Debug, Default)]
pub struct Utf16Encoding;

impl TextEncoding for Utf16Encoding {
    fn byte_count(&self, s: &str) -> usize {
        s.encode_utf16().count() * 2
    }

    fn max_bytes_per_char(&self) -> usize {
        // A supplementary-plane character is a surrogate pair.
        4
    }

    fn new_encoder(&self) -> Box<dyn TextEncoder> {
        Box::new(Utf16Encoder)
    }

    fn new_decoder(&self) -> Box<dyn TextDecoder> {
        Box::new(Utf16Decoder::default())
    }
}

struct Utf16Encoder;

impl TextEncoder for Utf16Encoder {
    fn convert(&mut self, input: &str, out: &mut [u8], _last: bool) -> Converted {
        let mut step = Converted::default();
        let mut units = [0u16; 2];
        for c in input.chars() {
            let encoded = c.encode_utf16(&mut units);
            let width = encoded.len() * 2;
            if step.bytes_written + width > out.len() {
                break;
            }
            for unit in encoded.iter() {
                out[step.bytes_written..step.bytes_written + 2]
                    .copy_from_slice(&unit.to_le_bytes());
                step.bytes_written += 2;
            }
            step.chars_read += 1;
            step.bytes_read += c.len_utf8();
        }
        step
    }
}

#[derive(Default)]
struct Utf16Decoder {
    /// First byte of a code unit split across chunks.
    half: Option<u8>,
    /// High surrogate awaiting its low half.
    pending_high: Option<u16>,
}

impl Utf16Decoder {
    fn push_unit(&mut self, unit: u16, out: &mut String) {
        match unit {
            0xd800..=0xdbff => {
                if self.pending_high.replace(unit).is_some() {
                    out.push(char::REPLACEMENT_CHARACTER);
                }
            }
            0xdc00..=0xdfff => match self.pending_high.take() {
                Some(high) => {
                    let scalar =
                        0x10000 + ((u32::from(high) - 0xd800) << 10) + (u32::from(unit) - 0xdc00);
                    out.push(char::from_u32(scalar).unwrap_or(char::REPLACEMENT_CHARACTER));
                }
                None => out.push(char::REPLACEMENT_CHARACTER),
            },
            _ => {
                if self.pending_high.take().is_some() {
                    out.push(char::REPLACEMENT_CHARACTER);
                }
                out.push(char::from_u32(u32::from(unit)).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
        }
    }
}

impl TextDecoder for Utf16Decoder {
    fn decode(&mut self, input: &[u8], out: &mut String) {
        let mut input = input;

        if let Some(low_byte) = self.half.take() {
            if let Some((&high_byte, rest)) = input.split_first() {
                self.push_unit(u16::from_le_bytes([low_byte, high_byte]), out);
                input = rest;
            } else {
                self.half = Some(low_byte);
                return;
            }
        }

        let even = input.len() & !1;
        let (pairs, tail) = input.split_at(even);
        // `pairs` has even length and U16<LE> has no alignment requirement,
        // so this cannot fail.
        let units = <[U16<LE>]>::ref_from_bytes(pairs).unwrap();
        for unit in units {
            self.push_unit(unit.get(), out);
        }
        if let [byte] = tail {
            self.half = Some(*byte);
        }
    }

    fn finish(&mut self, out: &mut String) {
        if self.pending_high.take().is_some() {
            out.push(char::REPLACEMENT_CHARACTER);
        }
        if self.half.take().is_some() {
            out.push(char::REPLACEMENT_CHARACTER);
        }
    }
}
