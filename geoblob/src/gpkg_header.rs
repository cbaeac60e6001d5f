//! The binary header that precedes the WKB body of a GeoPackage geometry.
//!
//! See the GeoPackage [specification](https://www.geopackage.org/spec130/#gpb_spec).

use crate::byte_order::{ByteOrder, ByteOrderCodec};
use crate::envelope::{Envelope, Interval};
use crate::ordinates::Ordinates;
use crate::result::{Error, Result};
use std::io::Write;

/// Which ranges the header's envelope records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeType {
    Missing,
    XY,
    XYZ,
    XYM,
    XYZM,
}

impl EnvelopeType {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(EnvelopeType::Missing),
            1 => Some(EnvelopeType::XY),
            2 => Some(EnvelopeType::XYZ),
            3 => Some(EnvelopeType::XYM),
            4 => Some(EnvelopeType::XYZM),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            EnvelopeType::Missing => 0,
            EnvelopeType::XY => 1,
            EnvelopeType::XYZ => 2,
            EnvelopeType::XYM => 3,
            EnvelopeType::XYZM => 4,
        }
    }

    pub fn from_ordinates(ordinates: Ordinates) -> Self {
        match (ordinates.has_z(), ordinates.has_m()) {
            (false, false) => EnvelopeType::XY,
            (true, false) => EnvelopeType::XYZ,
            (false, true) => EnvelopeType::XYM,
            (true, true) => EnvelopeType::XYZM,
        }
    }

    /// The ordinates the envelope covers, `None` when there is no envelope.
    pub fn ordinates(self) -> Option<Ordinates> {
        match self {
            EnvelopeType::Missing => None,
            EnvelopeType::XY => Some(Ordinates::XY),
            EnvelopeType::XYZ => Some(Ordinates::XYZ),
            EnvelopeType::XYM => Some(Ordinates::XYM),
            EnvelopeType::XYZM => Some(Ordinates::XYZM),
        }
    }

    pub fn num_doubles(self) -> usize {
        match self.ordinates() {
            None => 0,
            Some(o) => 2 * o.dimension(),
        }
    }
}

/// The flags byte of the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoPackageFlags {
    pub extended: bool,
    pub empty_geom: bool,
    pub byte_order: ByteOrder,
    pub envelope: EnvelopeType,
}

impl GeoPackageFlags {
    // https://www.geopackage.org/spec130/#flags_layout
    pub fn from_byte(b: u8) -> Result<Self> {
        let envelope = EnvelopeType::from_code((b >> 1) & 0b111).ok_or(Error::InvalidHeaderFlags(b))?;
        let byte_order = if b & 1 > 0 {
            ByteOrder::LittleEndian
        } else {
            ByteOrder::BigEndian
        };
        Ok(GeoPackageFlags {
            extended: (b >> 5) & 1 > 0,
            empty_geom: (b >> 4) & 1 > 0,
            byte_order,
            envelope,
        })
    }

    pub fn to_byte(&self) -> u8 {
        let mut flags = 0u8;
        flags |= (self.extended as u8) << 5;
        flags |= (self.empty_geom as u8) << 4;
        flags |= self.envelope.code() << 1;
        flags |= self.byte_order.marker();
        flags
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPackageHeader {
    pub magic: [u8; 2],
    pub version: u8,
    pub flags: GeoPackageFlags,
    pub srs_id: i32,
    /// The full-range sentinel when the flags declare no envelope.
    pub envelope: Envelope,
}

impl GeoPackageHeader {
    /// `GP` in ASCII.
    pub const MAGIC: [u8; 2] = *b"GP";

    /// Byte length of the header, envelope included.
    pub fn len(&self) -> usize {
        8 + 8 * self.flags.envelope.num_doubles()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.empty_geom
    }

    /// Reads a header from `buf` starting at `offset`, leaving `offset` at the
    /// first byte of the WKB body.
    pub fn read(buf: &[u8], offset: &mut usize) -> Result<Self> {
        let start = *offset;
        let magic = buf
            .get(start..start + 2)
            .ok_or(Error::UnexpectedEndOfData)?;
        let magic = [magic[0], magic[1]];
        *offset += 2;

        // the flags byte decides the order of everything after it
        let raw = ByteOrderCodec::new(ByteOrder::LittleEndian);
        let version = raw.read_u8(buf, offset)?;
        let flags = GeoPackageFlags::from_byte(raw.read_u8(buf, offset)?)?;

        let codec = ByteOrderCodec::new(flags.byte_order);
        let srs_id = codec.read_i32(buf, offset)?;
        let envelope = match flags.envelope.ordinates() {
            None => Envelope::sentinel(),
            Some(ordinates) => {
                let min_x = codec.read_f64(buf, offset)?;
                let max_x = codec.read_f64(buf, offset)?;
                let min_y = codec.read_f64(buf, offset)?;
                let max_y = codec.read_f64(buf, offset)?;
                let z = if ordinates.has_z() {
                    Some(read_interval(&codec, buf, offset)?)
                } else {
                    None
                };
                let m = if ordinates.has_m() {
                    Some(read_interval(&codec, buf, offset)?)
                } else {
                    None
                };
                Envelope {
                    min_x,
                    max_x,
                    min_y,
                    max_y,
                    z,
                    m,
                }
            }
        };

        Ok(GeoPackageHeader {
            magic,
            version,
            flags,
            srs_id,
            envelope,
        })
    }

    pub fn write(&self, w: &mut impl Write) -> Result<()> {
        w.write_all(&self.magic)?;
        w.write_all(&[self.version, self.flags.to_byte()])?;

        let codec = ByteOrderCodec::new(self.flags.byte_order);
        codec.write_i32(w, self.srs_id)?;
        let ordinates = match self.flags.envelope.ordinates() {
            Some(o) => o,
            None => return Ok(()),
        };
        let env = &self.envelope;
        for v in [env.min_x, env.max_x, env.min_y, env.max_y] {
            codec.write_f64(w, v)?;
        }
        if ordinates.has_z() {
            write_interval(&codec, w, env.z)?;
        }
        if ordinates.has_m() {
            write_interval(&codec, w, env.m)?;
        }
        Ok(())
    }
}

fn read_interval(codec: &ByteOrderCodec, buf: &[u8], offset: &mut usize) -> Result<Interval> {
    let min = codec.read_f64(buf, offset)?;
    let max = codec.read_f64(buf, offset)?;
    Ok(Interval::new(min, max))
}

fn write_interval(codec: &ByteOrderCodec, w: &mut impl Write, range: Option<Interval>) -> Result<()> {
    let range = range.unwrap_or(Interval::new(f64::NAN, f64::NAN));
    codec.write_f64(w, range.min)?;
    codec.write_f64(w, range.max)
}
