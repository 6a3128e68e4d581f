//! Base128 (varint) streams used by the control channel wire format.
//!
//! Integers are written seven bits at a time, least significant group first.
//! The high bit of every byte is a continuation flag: `1` means another byte
//! follows, `0` marks the last byte of the integer.
//!
//! ```text
//! 0          -> [0x00]
//! 127        -> [0x7F]
//! 128        -> [0x80, 0x01]
//! 2^31 - 1   -> [0xFF, 0xFF, 0xFF, 0xFF, 0x07]
//! -1 (i32)   -> [0xFF, 0xFF, 0xFF, 0xFF, 0x0F]
//! ```
//!
//! Signed integers travel as their two's-complement bit pattern, so negative
//! values always take five bytes.  Floats travel as the varint of their
//! IEEE-754 bits.  Byte strings and UTF-8 strings are a varint length followed
//! by the raw bytes; UTF-16 strings are a varint code-unit count followed by
//! one varint per code unit.

use std::io::{self, Read};

use crate::protocol::codec::ProtocolError;

/// Maximum number of bytes a 32-bit varint may occupy on the wire.
pub const MAX_VARINT32_BYTES: usize = 5;

const DEFAULT_BUFFER_SIZE: usize = 4096;

// ── Writer ────────────────────────────────────────────────────────────────────

/// Accumulates varint-encoded fields into an in-memory buffer.
///
/// Messages are always encoded completely before any byte reaches the socket,
/// so a partially encoded message can never corrupt the stream framing.
#[derive(Debug, Default, Clone)]
pub struct Base128Writer {
    buf: Vec<u8>,
}

impl Base128Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn write_u32(&mut self, value: u32) {
        let mut v = value;
        while v >= 0x80 {
            self.buf.push((v as u8 & 0x7F) | 0x80);
            v >>= 7;
        }
        self.buf.push(v as u8);
    }

    pub fn write_i32(&mut self, value: i32) {
        self.write_u32(value as u32);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_u32(u32::from(value));
    }

    pub fn write_f32(&mut self, value: f32) {
        self.write_u32(value.to_bits());
    }

    /// Writes a varint length followed by the raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.write_u32(bytes.len() as u32);
        self.buf.extend_from_slice(bytes);
    }

    /// Writes a UTF-8 string as a length-prefixed byte string.
    pub fn write_str(&mut self, s: &str) {
        self.write_bytes(s.as_bytes());
    }

    /// Writes a string as a varint code-unit count followed by one varint per
    /// UTF-16 code unit.
    pub fn write_utf16(&mut self, s: &str) {
        let units: Vec<u16> = s.encode_utf16().collect();
        self.write_u32(units.len() as u32);
        for unit in units {
            self.write_u32(u32::from(unit));
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

// ── Reader ────────────────────────────────────────────────────────────────────

/// Buffered varint reader over any byte source.
///
/// Reading past the end of the source yields [`ProtocolError::EndOfStream`],
/// which callers treat as a clean close rather than corruption.
pub struct Base128Reader<R> {
    inner: R,
    buf: Box<[u8]>,
    pos: usize,
    filled: usize,
}

impl<R: Read> Base128Reader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_capacity(inner, DEFAULT_BUFFER_SIZE)
    }

    pub fn with_capacity(inner: R, capacity: usize) -> Self {
        Self {
            inner,
            buf: vec![0u8; capacity.max(1)].into_boxed_slice(),
            pos: 0,
            filled: 0,
        }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Number of bytes already read from the source but not yet consumed.
    pub fn buffered(&self) -> usize {
        self.filled - self.pos
    }

    /// Makes at least one byte available without consuming it.
    ///
    /// Returns `Ok(false)` when the underlying source timed out with no data
    /// (`WouldBlock` or `TimedOut`), which lets a polling receive loop tell an
    /// idle peer apart from a closed one.
    pub fn prefetch(&mut self) -> Result<bool, ProtocolError> {
        if self.pos < self.filled {
            return Ok(true);
        }
        match self.fill() {
            Ok(()) => Ok(true),
            Err(ProtocolError::Io(e)) if is_timeout(&e) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub fn read_byte(&mut self) -> Result<u8, ProtocolError> {
        if self.pos == self.filled {
            self.fill()?;
        }
        let byte = self.buf[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    pub fn read_u32(&mut self) -> Result<u32, ProtocolError> {
        let mut result: u32 = 0;
        for i in 0..MAX_VARINT32_BYTES {
            let byte = self.read_byte()?;
            result |= u32::from(byte & 0x7F) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }
        Err(ProtocolError::Malformed(format!(
            "varint longer than {MAX_VARINT32_BYTES} bytes"
        )))
    }

    pub fn read_i32(&mut self) -> Result<i32, ProtocolError> {
        self.read_u32().map(|v| v as i32)
    }

    pub fn read_bool(&mut self) -> Result<bool, ProtocolError> {
        self.read_u32().map(|v| v != 0)
    }

    pub fn read_f32(&mut self) -> Result<f32, ProtocolError> {
        self.read_u32().map(f32::from_bits)
    }

    /// Reads a length-prefixed byte string, consuming exactly the declared
    /// number of bytes.
    pub fn read_bytes(&mut self) -> Result<Vec<u8>, ProtocolError> {
        let len = self.read_u32()? as usize;
        let mut out = Vec::with_capacity(len.min(self.buf.len()));
        let mut remaining = len;
        while remaining > 0 {
            if self.pos == self.filled {
                self.fill()?;
            }
            let n = remaining.min(self.filled - self.pos);
            out.extend_from_slice(&self.buf[self.pos..self.pos + n]);
            self.pos += n;
            remaining -= n;
        }
        Ok(out)
    }

    pub fn read_string(&mut self) -> Result<String, ProtocolError> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes)
            .map_err(|e| ProtocolError::Malformed(format!("invalid UTF-8: {e}")))
    }

    pub fn read_utf16(&mut self) -> Result<String, ProtocolError> {
        let count = self.read_u32()? as usize;
        let mut units = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            let raw = self.read_u32()?;
            let unit = u16::try_from(raw).map_err(|_| {
                ProtocolError::Malformed(format!("UTF-16 code unit out of range: {raw:#x}"))
            })?;
            units.push(unit);
        }
        String::from_utf16(&units)
            .map_err(|e| ProtocolError::Malformed(format!("invalid UTF-16: {e}")))
    }

    /// Refills the buffer from the source.  Only called when it is empty.
    fn fill(&mut self) -> Result<(), ProtocolError> {
        loop {
            match self.inner.read(&mut self.buf) {
                Ok(0) => return Err(ProtocolError::EndOfStream),
                Ok(n) => {
                    self.pos = 0;
                    self.filled = n;
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::UnexpectedEof | io::ErrorKind::ConnectionReset
                    ) =>
                {
                    return Err(ProtocolError::EndOfStream)
                }
                Err(e) => return Err(ProtocolError::Io(e)),
            }
        }
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
