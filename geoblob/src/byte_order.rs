//! Primitive reads and writes with optional byte swapping relative to native order.
//!
//! Both blob formats declare their byte order once, up front. The swap decision is
//! made from that declaration a single time per blob and then applied to every
//! integer and float the blob contains.

use crate::result::{Error, Result};
use byteorder::{ByteOrder as _, NativeEndian, WriteBytesExt};
use std::io::Write;

/// Byte order as declared inside a blob.
///
/// The discriminants are the marker values used by WKB, the GeoPackage flags
/// byte and the SpatiaLite endian marker alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    BigEndian = 0,
    #[default]
    LittleEndian = 1,
}

impl ByteOrder {
    pub fn native() -> Self {
        if cfg!(target_endian = "little") {
            ByteOrder::LittleEndian
        } else {
            ByteOrder::BigEndian
        }
    }

    pub fn from_marker(b: u8) -> Option<Self> {
        match b {
            0 => Some(ByteOrder::BigEndian),
            1 => Some(ByteOrder::LittleEndian),
            _ => None,
        }
    }

    pub fn marker(self) -> u8 {
        self as u8
    }
}

/// Reads and writes fixed-width values, reversing their bytes when the blob's
/// byte order differs from the native one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteOrderCodec {
    swap: bool,
}

impl ByteOrderCodec {
    pub fn new(order: ByteOrder) -> Self {
        Self {
            swap: order != ByteOrder::native(),
        }
    }

    pub fn swaps(&self) -> bool {
        self.swap
    }

    pub fn read_u8(&self, buf: &[u8], offset: &mut usize) -> Result<u8> {
        let b = *buf.get(*offset).ok_or(Error::UnexpectedEndOfData)?;
        *offset += 1;
        Ok(b)
    }

    pub fn read_i32(&self, buf: &[u8], offset: &mut usize) -> Result<i32> {
        let v = NativeEndian::read_i32(take(buf, offset, 4)?);
        Ok(if self.swap { v.swap_bytes() } else { v })
    }

    /// Reads an element count. Negative counts are rejected as running past the data.
    pub fn read_count(&self, buf: &[u8], offset: &mut usize) -> Result<usize> {
        let v = self.read_i32(buf, offset)?;
        usize::try_from(v).map_err(|_| Error::UnexpectedEndOfData)
    }

    pub fn read_f64(&self, buf: &[u8], offset: &mut usize) -> Result<f64> {
        let bits = NativeEndian::read_u64(take(buf, offset, 8)?);
        Ok(f64::from_bits(if self.swap { bits.swap_bytes() } else { bits }))
    }

    pub fn read_f32(&self, buf: &[u8], offset: &mut usize) -> Result<f32> {
        let bits = NativeEndian::read_u32(take(buf, offset, 4)?);
        Ok(f32::from_bits(if self.swap { bits.swap_bytes() } else { bits }))
    }

    pub fn write_i32(&self, w: &mut impl Write, v: i32) -> Result<()> {
        w.write_i32::<NativeEndian>(if self.swap { v.swap_bytes() } else { v })?;
        Ok(())
    }

    /// Writes a count as the 32 bit integer both formats use.
    pub fn write_count(&self, w: &mut impl Write, n: usize) -> Result<()> {
        let v = i32::try_from(n).map_err(|_| Error::InvalidArgument("element count exceeds i32"))?;
        self.write_i32(w, v)
    }

    pub fn write_f64(&self, w: &mut impl Write, v: f64) -> Result<()> {
        let bits = v.to_bits();
        w.write_u64::<NativeEndian>(if self.swap { bits.swap_bytes() } else { bits })?;
        Ok(())
    }

    pub fn write_f32(&self, w: &mut impl Write, v: f32) -> Result<()> {
        let bits = v.to_bits();
        w.write_u32::<NativeEndian>(if self.swap { bits.swap_bytes() } else { bits })?;
        Ok(())
    }
}

fn take<'a>(buf: &'a [u8], offset: &mut usize, len: usize) -> Result<&'a [u8]> {
    let end = offset.checked_add(len).ok_or(Error::UnexpectedEndOfData)?;
    let bytes = buf.get(*offset..end).ok_or(Error::UnexpectedEndOfData)?;
    *offset = end;
    Ok(bytes)
}
