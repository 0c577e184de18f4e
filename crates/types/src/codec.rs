//! Little-endian binary codec.
//!
//! Every wire type exposes an inherent `encode(&self, &mut Writer)` and
//! `decode(&mut Reader) -> Result<Self, CodecError>` pair built on these two
//! primitives. Variable-length integers use the one/three/five/nine byte
//! var-uint layout (`0xFD`, `0xFE`, `0xFF` prefixes).

use thiserror::Error;

/// Errors raised while decoding untrusted bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("unexpected end of input: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    #[error("unknown transaction type: {0:#04x}")]
    UnknownTransactionType(u8),

    #[error("invalid {what} value: {value:#04x}")]
    InvalidEnumValue { what: &'static str, value: u8 },

    #[error("invalid utf-8 string")]
    InvalidUtf8,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("length {0} does not fit in usize")]
    LengthOverflow(u64),

    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),
}

/// Append-only byte sink.
#[derive(Debug, Default, Clone)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_bool(&mut self, v: bool) {
        self.buf.push(u8::from(v));
    }

    pub fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Raw bytes with no length prefix.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_var_uint(&mut self, v: u64) {
        if v < 0xFD {
            self.write_u8(v as u8);
        } else if v <= u64::from(u16::MAX) {
            self.write_u8(0xFD);
            self.write_u16(v as u16);
        } else if v <= u64::from(u32::MAX) {
            self.write_u8(0xFE);
            self.write_u32(v as u32);
        } else {
            self.write_u8(0xFF);
            self.write_u64(v);
        }
    }

    pub fn write_var_bytes(&mut self, bytes: &[u8]) {
        self.write_var_uint(bytes.len() as u64);
        self.write_bytes(bytes);
    }

    pub fn write_var_string(&mut self, s: &str) {
        self.write_var_bytes(s.as_bytes());
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor over a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Fail unless every byte has been consumed.
    pub fn finish(&self) -> Result<(), CodecError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(CodecError::TrailingBytes(n)),
        }
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        if len > self.remaining() {
            return Err(CodecError::UnexpectedEof {
                needed: len,
                remaining: self.remaining(),
            });
        }
        let out = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool, CodecError> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16(&mut self) -> Result<u16, CodecError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, CodecError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, CodecError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64, CodecError> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    pub fn read_var_uint(&mut self) -> Result<u64, CodecError> {
        match self.read_u8()? {
            0xFD => self.read_u16().map(u64::from),
            0xFE => self.read_u32().map(u64::from),
            0xFF => self.read_u64(),
            b => Ok(u64::from(b)),
        }
    }

    /// Read a var-uint used as a length, rejecting anything larger than the
    /// remaining input before the caller allocates.
    pub fn read_length(&mut self) -> Result<usize, CodecError> {
        let len = self.read_var_uint()?;
        let len = usize::try_from(len).map_err(|_| CodecError::LengthOverflow(len))?;
        if len > self.remaining() {
            return Err(CodecError::UnexpectedEof {
                needed: len,
                remaining: self.remaining(),
            });
        }
        Ok(len)
    }

    pub fn read_var_bytes(&mut self) -> Result<Vec<u8>, CodecError> {
        let len = self.read_length()?;
        Ok(self.read_bytes(len)?.to_vec())
    }

    pub fn read_var_string(&mut self) -> Result<String, CodecError> {
        String::from_utf8(self.read_var_bytes()?).map_err(|_| CodecError::InvalidUtf8)
    }

    /// Read a var-uint count followed by that many items.
    ///
    /// Every element occupies at least one byte, so the count is bounded by
    /// the remaining input.
    pub fn read_list<T>(
        &mut self,
        mut item: impl FnMut(&mut Self) -> Result<T, CodecError>,
    ) -> Result<Vec<T>, CodecError> {
        let count = self.read_length()?;
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(item(self)?);
        }
        Ok(out)
    }
}

/// Write a var-uint count followed by each item.
pub fn write_list<T>(w: &mut Writer, items: &[T], mut item: impl FnMut(&T, &mut Writer)) {
    w.write_var_uint(items.len() as u64);
    for it in items {
        item(it, w);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_uint_boundaries() {
        let cases: [(u64, usize); 6] = [
            (0, 1),
            (0xFC, 1),
            (0xFD, 3),
            (0xFFFF, 3),
            (0x1_0000, 5),
            (0x1_0000_0000, 9),
        ];
        for (value, len) in cases {
            let mut w = Writer::new();
            w.write_var_uint(value);
            let bytes = w.into_bytes();
            assert_eq!(bytes.len(), len, "value {value:#x}");
            let mut r = Reader::new(&bytes);
            assert_eq!(r.read_var_uint().unwrap(), value);
            assert!(r.finish().is_ok());
        }
    }

    #[test]
    fn test_read_past_end_is_error() {
        let mut r = Reader::new(&[1, 2]);
        assert_eq!(
            r.read_u32(),
            Err(CodecError::UnexpectedEof {
                needed: 4,
                remaining: 2
            })
        );
    }

    #[test]
    fn test_oversized_length_rejected_before_alloc() {
        // Declares 0xFFFF_FFFF bytes but carries none.
        let bytes = [0xFE, 0xFF, 0xFF, 0xFF, 0xFF];
        let mut r = Reader::new(&bytes);
        assert!(matches!(
            r.read_var_bytes(),
            Err(CodecError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_var_string() {
        let mut w = Writer::new();
        w.write_var_string("meridian");
        let bytes = w.into_bytes();
        assert_eq!(bytes[0], 8);
        let mut r = Reader::new(&bytes);
        assert_eq!(r.read_var_string().unwrap(), "meridian");
    }

    #[test]
    fn test_invalid_utf8() {
        let mut r = Reader::new(&[2, 0xC3, 0x28]);
        assert_eq!(r.read_var_string(), Err(CodecError::InvalidUtf8));
    }
}
