//! GeoPackage geometry blobs: a [GeoPackageHeader] followed by a WKB body.

use crate::byte_order::ByteOrder;
use crate::envelope::Envelope;
use crate::factory::{GeometryFactory, PrecisionModel};
use crate::gpkg_header::{EnvelopeType, GeoPackageFlags, GeoPackageHeader};
use crate::ordinates::Ordinates;
use crate::result::{Error, Result};
use crate::types::{Geometry, Shape};
use crate::wkb::{WkbReader, WkbWriter};
use std::io::{Cursor, Write};
use tracing::debug;

/// A trait containing methods for encoding geometries according to the GeoPackage [specifcation](https://www.geopackage.org/spec130/#gpb_spec)
///
/// Uses a default [GeoPackageWriter] and a [GeoPackageReader] that keeps the
/// header SRID.
pub trait GeoPackageWKB: Sized {
    fn to_wkb(&self) -> Result<Vec<u8>>;
    fn from_wkb(wkb: &[u8]) -> Result<Self>;
}

impl GeoPackageWKB for Shape {
    fn to_wkb(&self) -> Result<Vec<u8>> {
        GeoPackageWriter::new().write_to_vec(self)
    }

    fn from_wkb(wkb: &[u8]) -> Result<Self> {
        GeoPackageReader::new().with_handle_srid(true).read(wkb)
    }
}

// geo-types geometries are XY only and carry no SRID, so they go through a
// Shape and the conversions in types.rs
macro_rules! impl_gpkg_wkb_geo {
    ($($t:ident),*) => {
        $(
            impl GeoPackageWKB for geo_types::$t<f64> {
                fn to_wkb(&self) -> Result<Vec<u8>> {
                    let g = geo_types::Geometry::<f64>::from(self.clone());
                    Shape::new(Geometry::from(g)).to_wkb()
                }

                fn from_wkb(wkb: &[u8]) -> Result<Self> {
                    let shape = Shape::from_wkb(wkb)?;
                    let g = geo_types::Geometry::<f64>::try_from(&shape.geometry)?;
                    Self::try_from(g).map_err(|_| {
                        Error::InvalidArgument(concat!("blob does not hold a ", stringify!($t)))
                    })
                }
            }
        )*
    };
}

impl_gpkg_wkb_geo!(
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    Geometry
);

/// Encodes [Shape] values as GeoPackage blobs.
///
/// The format fixes SRID handling on and little-endian output; the setters for
/// those exist only to reject other values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoPackageWriter {
    handle_ordinates: Ordinates,
    write_envelope: bool,
}

impl GeoPackageWriter {
    pub const ALLOWED_ORDINATES: Ordinates = Ordinates::XYZM;

    pub fn new() -> Self {
        GeoPackageWriter {
            handle_ordinates: Self::ALLOWED_ORDINATES,
            write_envelope: true,
        }
    }

    pub fn handle_ordinates(&self) -> Ordinates {
        self.handle_ordinates
    }

    pub fn set_handle_ordinates(&mut self, ordinates: Ordinates) {
        self.handle_ordinates = Ordinates::clamp(ordinates, Self::ALLOWED_ORDINATES);
    }

    pub fn with_handle_ordinates(mut self, ordinates: Ordinates) -> Self {
        self.set_handle_ordinates(ordinates);
        self
    }

    /// Whether the header records an envelope. Without one the shape code is 0.
    pub fn with_envelope(mut self, write_envelope: bool) -> Self {
        self.write_envelope = write_envelope;
        self
    }

    pub fn handle_srid(&self) -> bool {
        true
    }

    pub fn set_handle_srid(&mut self, handle_srid: bool) -> Result<()> {
        if handle_srid {
            Ok(())
        } else {
            Err(Error::UnsupportedConfiguration(
                "GeoPackage blobs always carry an SRID",
            ))
        }
    }

    pub fn byte_order(&self) -> ByteOrder {
        ByteOrder::LittleEndian
    }

    pub fn set_byte_order(&mut self, byte_order: ByteOrder) -> Result<()> {
        match byte_order {
            ByteOrder::LittleEndian => Ok(()),
            ByteOrder::BigEndian => Err(Error::UnsupportedConfiguration(
                "GeoPackage blobs are written little-endian",
            )),
        }
    }

    pub fn write(&self, shape: &Shape, w: &mut impl Write) -> Result<()> {
        let geometry = &shape.geometry;
        let is_empty = geometry.is_empty();
        let ordinates = match geometry {
            // empty points are written as NaN coordinates in every handled ordinate
            Geometry::Point(p) if p.is_empty() => self.handle_ordinates,
            _ => self.handle_ordinates & geometry.ordinates(),
        };
        let envelope_type = if self.write_envelope {
            EnvelopeType::from_ordinates(ordinates)
        } else {
            EnvelopeType::Missing
        };
        let envelope = Envelope::of(geometry, ordinates).unwrap_or_else(|| Envelope::nan(ordinates));

        let header = GeoPackageHeader {
            magic: GeoPackageHeader::MAGIC,
            version: 0,
            flags: GeoPackageFlags {
                extended: false,
                empty_geom: is_empty,
                byte_order: ByteOrder::LittleEndian,
                envelope: envelope_type,
            },
            srs_id: shape.srid.unwrap_or(-1),
            envelope,
        };
        debug!(
            kind = ?geometry.kind(),
            %ordinates,
            srid = header.srs_id,
            empty = is_empty,
            "writing GeoPackage blob"
        );
        header.write(w)?;

        // the header carries the SRID, the body must not repeat it
        WkbWriter::new(ByteOrder::LittleEndian, false, ordinates).write(shape, w)
    }

    pub fn write_to_vec(&self, shape: &Shape) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write(shape, &mut buf)?;
        Ok(buf)
    }
}

impl Default for GeoPackageWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Decodes GeoPackage blobs into [Shape] values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPackageReader {
    handle_ordinates: Ordinates,
    handle_srid: bool,
    repair_rings: bool,
    precision: PrecisionModel,
}

impl GeoPackageReader {
    pub const ALLOWED_ORDINATES: Ordinates = Ordinates::XYZM;

    pub fn new() -> Self {
        GeoPackageReader {
            handle_ordinates: Self::ALLOWED_ORDINATES,
            handle_srid: false,
            repair_rings: false,
            precision: PrecisionModel::Floating,
        }
    }

    pub fn handle_ordinates(&self) -> Ordinates {
        self.handle_ordinates
    }

    pub fn set_handle_ordinates(&mut self, ordinates: Ordinates) {
        self.handle_ordinates = Ordinates::clamp(ordinates, Self::ALLOWED_ORDINATES);
    }

    pub fn with_handle_ordinates(mut self, ordinates: Ordinates) -> Self {
        self.set_handle_ordinates(ordinates);
        self
    }

    /// Stamp the header SRID onto decoded shapes.
    pub fn with_handle_srid(mut self, handle_srid: bool) -> Self {
        self.handle_srid = handle_srid;
        self
    }

    pub fn with_repair_rings(mut self, repair_rings: bool) -> Self {
        self.repair_rings = repair_rings;
        self
    }

    pub fn with_precision(mut self, precision: PrecisionModel) -> Self {
        self.precision = precision;
        self
    }

    pub fn read_header(&self, blob: &[u8]) -> Result<GeoPackageHeader> {
        if blob.is_empty() {
            return Err(Error::InvalidArgument("empty GeoPackage blob"));
        }
        let mut offset = 0;
        GeoPackageHeader::read(blob, &mut offset)
    }

    pub fn read(&self, blob: &[u8]) -> Result<Shape> {
        let header = self.read_header(blob)?;
        let body = &blob[header.len()..];
        debug!(
            srid = header.srs_id,
            byte_order = ?header.flags.byte_order,
            envelope = ?header.flags.envelope,
            len = blob.len(),
            "reading GeoPackage blob"
        );

        let srid = match header.srs_id {
            -1 => None,
            srid if self.handle_srid => Some(srid),
            _ => None,
        };
        let factory = GeometryFactory::new(self.precision, srid);
        WkbReader::new(factory)
            .with_handle_ordinates(self.handle_ordinates)
            .with_repair_rings(self.repair_rings)
            .with_handle_srid(false)
            .read(&mut Cursor::new(body))
    }
}

impl Default for GeoPackageReader {
    fn default() -> Self {
        Self::new()
    }
}
