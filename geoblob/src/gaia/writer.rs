use super::coords::{writer_for, WriteCoords};
use super::tag::GaiaType;
use super::{END, ENTITY, MBR, START};
use crate::byte_order::{ByteOrder, ByteOrderCodec};
use crate::envelope::Envelope;
use crate::ordinates::Ordinates;
use crate::result::Result;
use crate::types::{Coord, CoordSeq, Geometry, GeometryKind, Point, Polygon, Shape};
use std::io::Write;
use tracing::{debug, trace};

/// Encodes [Shape] values as SpatiaLite blobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GaiaWriter {
    handle_ordinates: Ordinates,
    use_compressed: bool,
    byte_order: ByteOrder,
}

impl GaiaWriter {
    pub const ALLOWED_ORDINATES: Ordinates = Ordinates::XYZM;

    pub fn new() -> Self {
        GaiaWriter {
            handle_ordinates: Self::ALLOWED_ORDINATES,
            use_compressed: false,
            byte_order: ByteOrder::LittleEndian,
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

    pub fn use_compressed(&self) -> bool {
        self.use_compressed
    }

    /// Delta compress line string and polygon payloads.
    pub fn with_compressed(mut self, use_compressed: bool) -> Self {
        self.use_compressed = use_compressed;
        self
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    pub fn write(&self, shape: &Shape) -> Result<Vec<u8>> {
        let geometry = &shape.geometry;
        let ordinates = self.handle_ordinates & geometry.ordinates();
        let codec = ByteOrderCodec::new(self.byte_order);
        debug!(
            kind = ?geometry.kind(),
            %ordinates,
            compressed = self.use_compressed,
            byte_order = ?self.byte_order,
            "writing SpatiaLite blob"
        );

        let mut buf = vec![START, self.byte_order.marker()];
        codec.write_i32(&mut buf, shape.srid.unwrap_or(0))?;
        let mbr = Envelope::of(geometry, Ordinates::XY).unwrap_or_else(Envelope::zero);
        for v in [mbr.min_x, mbr.min_y, mbr.max_x, mbr.max_y] {
            codec.write_f64(&mut buf, v)?;
        }
        buf.push(MBR);

        let mut body = Body {
            codec,
            buf,
            use_compressed: self.use_compressed,
        };
        body.write_geometry(geometry, ordinates)?;
        let mut buf = body.buf;
        buf.push(END);
        Ok(buf)
    }

    pub fn write_to(&self, shape: &Shape, w: &mut impl Write) -> Result<()> {
        w.write_all(&self.write(shape)?)?;
        Ok(())
    }
}

impl Default for GaiaWriter {
    fn default() -> Self {
        Self::new()
    }
}

struct Body {
    codec: ByteOrderCodec,
    buf: Vec<u8>,
    use_compressed: bool,
}

impl Body {
    fn write_type(&mut self, kind: GeometryKind, ordinates: Ordinates) -> Result<GaiaType> {
        let ty = GaiaType::for_geometry(kind, ordinates, self.use_compressed);
        trace!(tag = ty.tag(), offset = self.buf.len(), "writing SpatiaLite geometry");
        self.codec.write_i32(&mut self.buf, ty.tag() as i32)?;
        Ok(ty)
    }

    fn writer(&self, ty: GaiaType) -> WriteCoords {
        writer_for(ty.compressed, ty.ordinates)
    }

    fn write_count(&mut self, n: usize) -> Result<()> {
        self.codec.write_count(&mut self.buf, n)
    }

    // members narrow `ordinates` to what they carry themselves
    fn write_geometry(&mut self, g: &Geometry, ordinates: Ordinates) -> Result<()> {
        let ty = self.write_type(g.kind(), ordinates)?;
        match g {
            Geometry::Point(p) => self.write_point(ty, p),
            Geometry::LineString(ls) => {
                let write = self.writer(ty);
                self.write_seq(write, ls.seq())
            }
            Geometry::Polygon(poly) => self.write_polygon(ty, poly),
            Geometry::MultiPoint(mp) => {
                self.write_count(mp.0.len())?;
                for p in &mp.0 {
                    self.buf.push(ENTITY);
                    let ty = self.write_type(GeometryKind::Point, ordinates & p.seq().ordinates())?;
                    self.write_point(ty, p)?;
                }
                Ok(())
            }
            Geometry::MultiLineString(mls) => {
                self.write_count(mls.0.len())?;
                for ls in &mls.0 {
                    self.buf.push(ENTITY);
                    let ords = ordinates & ls.seq().ordinates();
                    let ty = self.write_type(GeometryKind::LineString, ords)?;
                    let write = self.writer(ty);
                    self.write_seq(write, ls.seq())?;
                }
                Ok(())
            }
            Geometry::MultiPolygon(mp) => {
                self.write_count(mp.0.len())?;
                for poly in &mp.0 {
                    self.buf.push(ENTITY);
                    let ty = self.write_type(GeometryKind::Polygon, ordinates & poly.ordinates())?;
                    self.write_polygon(ty, poly)?;
                }
                Ok(())
            }
            Geometry::GeometryCollection(gc) => {
                self.write_count(gc.0.len())?;
                for child in &gc.0 {
                    self.buf.push(ENTITY);
                    self.write_geometry(child, ordinates & child.ordinates())?;
                }
                Ok(())
            }
        }
    }

    // the format has no empty point, one is written with NaN ordinates
    fn write_point(&mut self, ty: GaiaType, p: &Point) -> Result<()> {
        let c = p.coord().copied().unwrap_or_else(Coord::nan);
        self.writer(ty)(&self.codec, &mut self.buf, &[c])
    }

    fn write_seq(&mut self, write: WriteCoords, seq: &CoordSeq) -> Result<()> {
        self.write_count(seq.len())?;
        write(&self.codec, &mut self.buf, seq.coords())
    }

    fn write_polygon(&mut self, ty: GaiaType, poly: &Polygon) -> Result<()> {
        if poly.is_empty() && poly.interiors().is_empty() {
            return self.write_count(0);
        }
        let write = self.writer(ty);
        self.write_count(poly.interiors().len() + 1)?;
        for ring in poly.rings() {
            self.write_seq(write, ring.seq())?;
        }
        Ok(())
    }
}
