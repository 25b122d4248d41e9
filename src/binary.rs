//! Cursor-based binary reader and grow-on-write writer.
//!
//! These are the synchronous primitives underneath every codec: little-endian
//! fixed-size values, unsigned LEB128 varints and length-prefixed UTF-8
//! strings, operating on in-memory byte slices.
//!
//! The async block stream reads whole chunks off the network and then parses
//! them through [`Reader`]; all within-block decoding is synchronous.

use crate::{
    Error,
    Result,
};
use bytes::{
    BufMut,
    Bytes,
    BytesMut,
};

/// Maximum encoded size of a varint (63-bit payload).
const MAX_VARINT_BYTES: usize = 10;

/// Cursor over an in-memory byte slice.
///
/// Every read advances the cursor and fails with
/// [`Error::BufferUnderflow`] when the slice does not hold enough bytes,
/// which lets the streaming front end distinguish "wait for more input"
/// from corrupt data.
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Create a reader positioned at the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Fail early unless `n` more bytes are available.
    ///
    /// Codecs use this to precheck batched reads so a bulk copy never
    /// straddles the end of the buffer.
    pub fn ensure_available(&self, n: usize) -> Result<()> {
        if self.remaining() < n {
            return Err(Error::BufferUnderflow {
                needed: n,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    /// Read `n` bytes as a borrowed view into the underlying buffer.
    pub fn read_slice(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure_available(n)?;
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Read `n` bytes as an owned copy.
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        Ok(self.read_slice(n)?.to_vec())
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure_available(1)?;
        let b = self.buf[self.pos];
        self.pos += 1;
        Ok(b)
    }

    /// Read a little-endian u16.
    pub fn read_u16_le(&mut self) -> Result<u16> {
        let b = self.read_slice(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    /// Read a little-endian u32.
    pub fn read_u32_le(&mut self) -> Result<u32> {
        let b = self.read_slice(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read a little-endian u64.
    pub fn read_u64_le(&mut self) -> Result<u64> {
        let b = self.read_slice(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Ok(u64::from_le_bytes(raw))
    }

    /// Read a little-endian i32.
    pub fn read_i32_le(&mut self) -> Result<i32> {
        Ok(self.read_u32_le()? as i32)
    }

    /// Read a little-endian i64.
    pub fn read_i64_le(&mut self) -> Result<i64> {
        Ok(self.read_u64_le()? as i64)
    }

    /// Read an unsigned LEB128 varint, up to 10 bytes.
    pub fn read_varint(&mut self) -> Result<u64> {
        let mut result: u64 = 0;
        let mut shift = 0;

        loop {
            let byte = self.read_u8()?;
            result |= ((byte & 0x7F) as u64) << shift;

            if byte & 0x80 == 0 {
                break;
            }

            shift += 7;
            if shift >= 7 * MAX_VARINT_BYTES {
                return Err(Error::Protocol("Varint overflow".to_string()));
            }
        }

        Ok(result)
    }

    /// Read a varint length followed by that many UTF-8 bytes.
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_varint()? as usize;
        let bytes = self.read_bytes(len)?;
        Ok(String::from_utf8(bytes)?)
    }
}

/// Grow-on-write output buffer with a size hint.
///
/// Composite codecs pre-size the writer from `estimate_size` so large
/// payloads are written without intermediate reallocations; `finish`
/// produces a tight final slice.
pub struct Writer {
    buf: BytesMut,
}

impl Writer {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self { buf: BytesMut::new() }
    }

    /// Create a writer pre-sized for roughly `size_hint` bytes.
    pub fn with_capacity(size_hint: usize) -> Self {
        Self { buf: BytesMut::with_capacity(size_hint) }
    }

    /// Reserve room for at least `additional` more bytes.
    pub fn reserve(&mut self, additional: usize) {
        self.buf.reserve(additional);
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Write a single byte.
    pub fn write_u8(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    /// Write a little-endian u16.
    pub fn write_u16_le(&mut self, v: u16) {
        self.buf.put_u16_le(v);
    }

    /// Write a little-endian u32.
    pub fn write_u32_le(&mut self, v: u32) {
        self.buf.put_u32_le(v);
    }

    /// Write a little-endian u64.
    pub fn write_u64_le(&mut self, v: u64) {
        self.buf.put_u64_le(v);
    }

    /// Write a little-endian i32.
    pub fn write_i32_le(&mut self, v: i32) {
        self.buf.put_i32_le(v);
    }

    /// Write a little-endian i64.
    pub fn write_i64_le(&mut self, v: i64) {
        self.buf.put_i64_le(v);
    }

    /// Write raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    /// Write an unsigned LEB128 varint.
    pub fn write_varint(&mut self, mut value: u64) {
        loop {
            let mut byte = (value & 0x7F) as u8;
            value >>= 7;

            if value != 0 {
                byte |= 0x80;
            }

            self.buf.put_u8(byte);

            if value == 0 {
                break;
            }
        }
    }

    /// Write a varint length followed by the UTF-8 bytes of `s`.
    pub fn write_string(&mut self, s: &str) {
        self.write_varint(s.len() as u64);
        self.buf.put_slice(s.as_bytes());
    }

    /// Consume the writer, producing the final byte slice.
    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }

    /// View the bytes written so far.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_roundtrip() {
        let test_cases =
            vec![0u64, 1, 127, 128, 255, 256, 65535, 65536, u64::MAX];

        for value in test_cases {
            let mut w = Writer::new();
            w.write_varint(value);
            let buf = w.finish();

            let mut r = Reader::new(&buf);
            let decoded = r.read_varint().unwrap();

            assert_eq!(value, decoded, "Varint roundtrip failed for {}", value);
            assert_eq!(r.remaining(), 0, "Buffer should be fully consumed");
        }
    }

    #[test]
    fn test_varint_overflow() {
        // Eleven continuation bytes exceed the 10-byte limit.
        let buf = [0xFFu8; 11];
        let mut r = Reader::new(&buf);
        assert!(r.read_varint().is_err());
    }

    #[test]
    fn test_string_roundtrip() {
        let test_strings =
            vec!["", "hello", "мир", "🦀", "test\nwith\nnewlines"];

        for s in test_strings {
            let mut w = Writer::new();
            w.write_string(s);
            let buf = w.finish();

            let mut r = Reader::new(&buf);
            let decoded = r.read_string().unwrap();

            assert_eq!(s, decoded, "String roundtrip failed for '{}'", s);
            assert_eq!(r.remaining(), 0);
        }
    }

    #[test]
    fn test_string_truncated() {
        let mut w = Writer::new();
        w.write_varint(100); // claim 100 bytes
        w.write_bytes(b"only10"); // provide 6
        let buf = w.finish();

        let mut r = Reader::new(&buf);
        assert!(matches!(
            r.read_string(),
            Err(Error::BufferUnderflow { .. })
        ));
    }

    #[test]
    fn test_fixed_little_endian() {
        let mut w = Writer::new();
        w.write_u32_le(0x12345678);
        let buf = w.finish();
        assert_eq!(&buf[..], &[0x78, 0x56, 0x34, 0x12]);

        let mut r = Reader::new(&buf);
        assert_eq!(r.read_u32_le().unwrap(), 0x12345678);
    }

    #[test]
    fn test_underflow_reports_sizes() {
        let buf = [1u8, 2];
        let mut r = Reader::new(&buf);
        match r.read_u64_le() {
            Err(Error::BufferUnderflow { needed, available }) => {
                assert_eq!(needed, 8);
                assert_eq!(available, 2);
            }
            other => panic!("expected underflow, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_position_tracks_consumption() {
        let mut w = Writer::new();
        w.write_varint(3);
        w.write_string("ab");
        let buf = w.finish();

        let mut r = Reader::new(&buf);
        r.read_varint().unwrap();
        assert_eq!(r.position(), 1);
        r.read_string().unwrap();
        assert_eq!(r.position(), buf.len());
    }
}
