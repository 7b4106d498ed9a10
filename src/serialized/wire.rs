//! Little-endian primitive encoding used inside mesh blocks.
//!
//! Only the kinds the serialized format knows about can be written:
//! `u8`..`u64`, `i8`..`i64`, `f32` and NUL-terminated UTF-8 strings.
//! [`WireValue`] is sealed, so the set is closed at compile time.

use std::io::{self, Write};

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};

use crate::util::{Error, Result};

mod sealed {
    pub trait Sealed {}
}

/// A value with a fixed wire representation.
pub trait WireValue: sealed::Sealed {
    /// Write the value's wire bytes.
    fn encode<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()>;
}

macro_rules! impl_wire_int {
    ($($ty:ty => $write:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}
            impl WireValue for $ty {
                #[inline]
                fn encode<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
                    w.$write::<LittleEndian>(*self)
                }
            }
        )*
    };
}

impl_wire_int! {
    u16 => write_u16,
    i16 => write_i16,
    u32 => write_u32,
    i32 => write_i32,
    u64 => write_u64,
    i64 => write_i64,
    f32 => write_f32,
}

impl sealed::Sealed for u8 {}
impl WireValue for u8 {
    #[inline]
    fn encode<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        w.write_u8(*self)
    }
}

impl sealed::Sealed for i8 {}
impl WireValue for i8 {
    #[inline]
    fn encode<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        w.write_i8(*self)
    }
}

// UTF-8 bytes plus a single NUL, no length prefix.
impl sealed::Sealed for str {}
impl WireValue for str {
    fn encode<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(self.as_bytes())?;
        w.write_u8(0)
    }
}

impl sealed::Sealed for String {}
impl WireValue for String {
    fn encode<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        self.as_str().encode(w)
    }
}

/// Extension for writing wire values to any `Write`.
pub trait WireWrite: Write {
    #[inline]
    fn put<T: WireValue + ?Sized>(&mut self, value: &T) -> io::Result<()> {
        value.encode(self)
    }
}

impl<W: Write + ?Sized> WireWrite for W {}

/// Cursor over decoded wire bytes.
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current read position.
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(Error::UnexpectedEof((self.pos + len) as u64));
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.take(8)?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(LittleEndian::read_f32(self.take(4)?))
    }

    /// Read `count` f32 values in one bounds check.
    pub fn read_f32_array(&mut self, count: usize) -> Result<Vec<f32>> {
        let len = count
            .checked_mul(4)
            .ok_or_else(|| Error::invalid("f32 array length overflows"))?;
        let bytes = self.take(len)?;
        let mut out = vec![0.0f32; count];
        LittleEndian::read_f32_into(bytes, &mut out);
        Ok(out)
    }

    /// Read `count` u32 values in one bounds check.
    pub fn read_u32_array(&mut self, count: usize) -> Result<Vec<u32>> {
        let len = count
            .checked_mul(4)
            .ok_or_else(|| Error::invalid("u32 array length overflows"))?;
        let bytes = self.take(len)?;
        let mut out = vec![0u32; count];
        LittleEndian::read_u32_into(bytes, &mut out);
        Ok(out)
    }

    /// Read a NUL-terminated UTF-8 string (terminator consumed, not returned).
    pub fn read_string(&mut self) -> Result<String> {
        let rest = &self.buf[self.pos..];
        let end = rest
            .iter()
            .position(|b| *b == 0)
            .ok_or(Error::UnexpectedEof(self.buf.len() as u64))?;
        let bytes = rest[..end].to_vec();
        self.pos += end + 1;
        Ok(String::from_utf8(bytes)?)
    }
}
