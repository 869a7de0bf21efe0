//! Fixed-layout byte codec
//!
//! Characteristic values are flat byte arrays with a fixed field order.
//! [`ByteWriter`] and [`ByteReader`] walk such a buffer field by field so
//! feature code never computes offsets by hand. Multi-byte fields are
//! little-endian unless a `_be` variant is used.

/// Reserved byte meaning "field intentionally not provided"
pub const ESCAPE: u8 = 0xFF;

/// Errors raised while packing or unpacking a characteristic value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// A field did not fit in the remaining output buffer
    BufferOverflow,
    /// Input ended before all fields were read
    BufferUnderflow,
    /// The encoded size differs from the declared value length
    LengthMismatch { expected: usize, actual: usize },
    /// A field holds a value outside its documented range
    InvalidField,
}

/// Sequential writer over a fixed-size output buffer.
pub struct ByteWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> ByteWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn put_slice(&mut self, data: &[u8]) -> Result<(), CodecError> {
        let end = self.pos + data.len();
        let dst = self
            .buf
            .get_mut(self.pos..end)
            .ok_or(CodecError::BufferOverflow)?;
        dst.copy_from_slice(data);
        self.pos = end;
        Ok(())
    }

    pub fn put_u8(&mut self, value: u8) -> Result<(), CodecError> {
        self.put_slice(&[value])
    }

    /// Write `value`, or [`ESCAPE`] when it is `None`.
    ///
    /// `Some(ESCAPE)` is rejected: it would read back as `None`.
    pub fn put_opt_u8(&mut self, value: Option<u8>) -> Result<(), CodecError> {
        match value {
            Some(ESCAPE) => Err(CodecError::InvalidField),
            Some(byte) => self.put_u8(byte),
            None => self.put_u8(ESCAPE),
        }
    }

    /// Fill `count` bytes with [`ESCAPE`].
    pub fn put_escape(&mut self, count: usize) -> Result<(), CodecError> {
        for _ in 0..count {
            self.put_u8(ESCAPE)?;
        }
        Ok(())
    }

    pub fn put_u16_le(&mut self, value: u16) -> Result<(), CodecError> {
        self.put_slice(&value.to_le_bytes())
    }

    pub fn put_i16_le(&mut self, value: i16) -> Result<(), CodecError> {
        self.put_slice(&value.to_le_bytes())
    }

    pub fn put_u32_le(&mut self, value: u32) -> Result<(), CodecError> {
        self.put_slice(&value.to_le_bytes())
    }

    pub fn put_i32_le(&mut self, value: i32) -> Result<(), CodecError> {
        self.put_slice(&value.to_le_bytes())
    }

    pub fn put_u16_be(&mut self, value: u16) -> Result<(), CodecError> {
        self.put_slice(&value.to_be_bytes())
    }

    /// Bytes written so far
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Check the whole buffer was filled and return the written length.
    pub fn finish(self) -> Result<usize, CodecError> {
        if self.pos != self.buf.len() {
            return Err(CodecError::LengthMismatch {
                expected: self.buf.len(),
                actual: self.pos,
            });
        }
        Ok(self.pos)
    }
}

/// Sequential reader over a received characteristic value.
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Reader that only accepts input of exactly `expected` bytes
    pub fn exact(buf: &'a [u8], expected: usize) -> Result<Self, CodecError> {
        if buf.len() != expected {
            return Err(CodecError::LengthMismatch {
                expected,
                actual: buf.len(),
            });
        }
        Ok(Self::new(buf))
    }

    pub fn take(&mut self, count: usize) -> Result<&'a [u8], CodecError> {
        let end = self.pos + count;
        let src = self
            .buf
            .get(self.pos..end)
            .ok_or(CodecError::BufferUnderflow)?;
        self.pos = end;
        Ok(src)
    }

    pub fn skip(&mut self, count: usize) -> Result<(), CodecError> {
        self.take(count).map(|_| ())
    }

    pub fn array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.array::<1>()?[0])
    }

    /// Read a byte, mapping [`ESCAPE`] to `None`.
    pub fn opt_u8(&mut self) -> Result<Option<u8>, CodecError> {
        let value = self.u8()?;
        Ok((value != ESCAPE).then_some(value))
    }

    pub fn u16_le(&mut self) -> Result<u16, CodecError> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    pub fn i16_le(&mut self) -> Result<i16, CodecError> {
        Ok(i16::from_le_bytes(self.array()?))
    }

    pub fn u32_le(&mut self) -> Result<u32, CodecError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub fn i32_le(&mut self) -> Result<i32, CodecError> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    pub fn u16_be(&mut self) -> Result<u16, CodecError> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }
}
