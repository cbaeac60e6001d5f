use super::coords::reader_for;
use super::tag::GaiaType;
use super::{END, ENTITY, MBR, MBR_MARKER_OFFSET, MIN_BLOB_LEN, SRID_OFFSET, START, TYPE_OFFSET};
use crate::byte_order::{ByteOrder, ByteOrderCodec};
use crate::envelope::Envelope;
use crate::factory::{GeometryFactory, PrecisionModel};
use crate::ordinates::Ordinates;
use crate::result::{Error, MarkerKind, Result};
use crate::types::{
    CoordSeq, Geometry, GeometryKind, LineString, Polygon, Shape, MAX_NESTING_DEPTH, MAX_PREALLOC,
};
use tracing::{debug, trace};

/// Decodes SpatiaLite blobs into [Shape] values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaiaReader {
    handle_ordinates: Ordinates,
    precision: PrecisionModel,
}

impl GaiaReader {
    pub const ALLOWED_ORDINATES: Ordinates = Ordinates::XYZM;

    pub fn new() -> Self {
        GaiaReader {
            handle_ordinates: Self::ALLOWED_ORDINATES,
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

    pub fn with_precision(mut self, precision: PrecisionModel) -> Self {
        self.precision = precision;
        self
    }

    pub fn read(&self, blob: &[u8]) -> Result<Shape> {
        let frame = Frame::parse(blob)?;
        debug!(
            srid = ?frame.srid,
            byte_order = ?frame.byte_order,
            len = blob.len(),
            "reading SpatiaLite blob"
        );

        let factory = GeometryFactory::new(self.precision, frame.srid);
        let mut parser = Parser {
            codec: ByteOrderCodec::new(frame.byte_order),
            buf: blob,
            offset: TYPE_OFFSET,
            factory,
            handle_ordinates: self.handle_ordinates,
        };
        let ty = parser.read_type()?;
        let geometry = parser.read_geometry(ty, 0)?;
        parser.expect_end()?;
        Ok(factory.create_shape(geometry))
    }

    /// The MBR stored in the blob's frame. The geometry itself is not decoded.
    pub fn read_envelope(&self, blob: &[u8]) -> Result<Envelope> {
        Ok(Frame::parse(blob)?.mbr)
    }
}

impl Default for GaiaReader {
    fn default() -> Self {
        Self::new()
    }
}

/// The fixed-size part of a blob, ahead of the type tag.
struct Frame {
    byte_order: ByteOrder,
    srid: Option<i32>,
    mbr: Envelope,
}

impl Frame {
    fn parse(blob: &[u8]) -> Result<Self> {
        if blob.is_empty() {
            return Err(Error::InvalidArgument("empty SpatiaLite blob"));
        }
        if blob.len() < MIN_BLOB_LEN {
            return Err(Error::TooShort {
                len: blob.len(),
                min: MIN_BLOB_LEN,
            });
        }
        expect_marker(blob, 0, START, MarkerKind::Start)?;
        let byte_order = ByteOrder::from_marker(blob[1]).ok_or(Error::BadMarker {
            kind: MarkerKind::Endian,
            offset: 1,
            found: blob[1],
        })?;

        let codec = ByteOrderCodec::new(byte_order);
        let mut offset = SRID_OFFSET;
        let srid = match codec.read_i32(blob, &mut offset)? {
            0 => None,
            srid => Some(srid),
        };
        let min_x = codec.read_f64(blob, &mut offset)?;
        let min_y = codec.read_f64(blob, &mut offset)?;
        let max_x = codec.read_f64(blob, &mut offset)?;
        let max_y = codec.read_f64(blob, &mut offset)?;
        expect_marker(blob, MBR_MARKER_OFFSET, MBR, MarkerKind::Mbr)?;

        Ok(Frame {
            byte_order,
            srid,
            mbr: Envelope {
                min_x,
                max_x,
                min_y,
                max_y,
                z: None,
                m: None,
            },
        })
    }
}

fn expect_marker(buf: &[u8], offset: usize, expected: u8, kind: MarkerKind) -> Result<()> {
    match buf.get(offset) {
        None => Err(Error::UnexpectedEndOfData),
        Some(&found) if found != expected => Err(Error::BadMarker {
            kind,
            offset,
            found,
        }),
        Some(_) => Ok(()),
    }
}

struct Parser<'a> {
    codec: ByteOrderCodec,
    buf: &'a [u8],
    offset: usize,
    factory: GeometryFactory,
    handle_ordinates: Ordinates,
}

impl<'a> Parser<'a> {
    fn read_type(&mut self) -> Result<GaiaType> {
        let tag = self.codec.read_i32(self.buf, &mut self.offset)? as u32;
        GaiaType::from_tag(tag)
    }

    fn read_count(&mut self) -> Result<usize> {
        self.codec.read_count(self.buf, &mut self.offset)
    }

    fn read_geometry(&mut self, ty: GaiaType, depth: usize) -> Result<Geometry> {
        trace!(
            kind = ?ty.kind,
            ordinates = %ty.ordinates,
            compressed = ty.compressed,
            offset = self.offset,
            depth,
            "reading SpatiaLite geometry"
        );
        let geometry: Geometry = match ty.kind {
            GeometryKind::Point => {
                let seq = self.read_seq(ty, 1)?;
                self.factory.create_point(seq)?.into()
            }
            GeometryKind::LineString => {
                let n = self.read_count()?;
                let seq = self.read_seq(ty, n)?;
                self.factory.create_line_string(seq).into()
            }
            GeometryKind::Polygon => self.read_polygon(ty)?.into(),
            GeometryKind::MultiPoint => {
                let n = self.read_count()?;
                let mut points = Vec::with_capacity(n.min(MAX_PREALLOC));
                for _ in 0..n {
                    match self.read_child(depth)? {
                        Geometry::Point(p) => points.push(p),
                        other => return Err(unexpected_child(GeometryKind::Point, &other)),
                    }
                }
                self.factory.create_multi_point(points).into()
            }
            GeometryKind::MultiLineString => {
                let n = self.read_count()?;
                let mut lines = Vec::with_capacity(n.min(MAX_PREALLOC));
                for _ in 0..n {
                    match self.read_child(depth)? {
                        Geometry::LineString(ls) => lines.push(ls),
                        other => return Err(unexpected_child(GeometryKind::LineString, &other)),
                    }
                }
                self.factory.create_multi_line_string(lines).into()
            }
            GeometryKind::MultiPolygon => {
                let n = self.read_count()?;
                let mut polygons = Vec::with_capacity(n.min(MAX_PREALLOC));
                for _ in 0..n {
                    match self.read_child(depth)? {
                        Geometry::Polygon(poly) => polygons.push(poly),
                        other => return Err(unexpected_child(GeometryKind::Polygon, &other)),
                    }
                }
                self.factory.create_multi_polygon(polygons).into()
            }
            GeometryKind::GeometryCollection => {
                let n = self.read_count()?;
                let mut geoms = Vec::with_capacity(n.min(MAX_PREALLOC));
                for _ in 0..n {
                    geoms.push(self.read_child(depth)?);
                }
                self.factory.create_geometry_collection(geoms).into()
            }
        };
        Ok(geometry)
    }

    // every member re-declares its own type, compression included
    fn read_child(&mut self, depth: usize) -> Result<Geometry> {
        if depth >= MAX_NESTING_DEPTH {
            return Err(Error::NestingTooDeep(MAX_NESTING_DEPTH));
        }
        let at = self.offset;
        let marker = self.codec.read_u8(self.buf, &mut self.offset)?;
        if marker != ENTITY {
            return Err(Error::BadMarker {
                kind: MarkerKind::Entity,
                offset: at,
                found: marker,
            });
        }
        let ty = self.read_type()?;
        self.read_geometry(ty, depth + 1)
    }

    fn read_seq(&mut self, ty: GaiaType, n: usize) -> Result<CoordSeq> {
        let read = reader_for(ty.compressed, ty.ordinates);
        self.read_seq_with(read, ty.ordinates, n)
    }

    fn read_seq_with(
        &mut self,
        read: super::ReadCoords,
        blob_ordinates: Ordinates,
        n: usize,
    ) -> Result<CoordSeq> {
        let coords = read(&self.codec, self.buf, &mut self.offset, n)?;
        let factory = self.factory;
        Ok(CoordSeq::new(
            blob_ordinates & self.handle_ordinates,
            coords.into_iter().map(|c| factory.make_precise(c)).collect(),
        ))
    }

    fn read_polygon(&mut self, ty: GaiaType) -> Result<Polygon> {
        let num_rings = self.read_count()?;
        if num_rings == 0 {
            return Ok(Polygon::empty(ty.ordinates & self.handle_ordinates));
        }
        let read = reader_for(ty.compressed, ty.ordinates);
        let mut rings: Vec<LineString> = Vec::with_capacity(num_rings.min(MAX_PREALLOC));
        for _ in 0..num_rings {
            let n = self.read_count()?;
            let seq = self.read_seq_with(read, ty.ordinates, n)?;
            rings.push(self.factory.create_linear_ring(seq, false));
        }
        let shell = rings.remove(0);
        Ok(self.factory.create_polygon(shell, rings))
    }

    fn expect_end(&mut self) -> Result<()> {
        expect_marker(self.buf, self.offset, END, MarkerKind::End)?;
        let trailing = self.buf.len() - self.offset - 1;
        if trailing > 0 {
            return Err(Error::TrailingBytes(trailing));
        }
        Ok(())
    }
}

fn unexpected_child(expected: GeometryKind, found: &Geometry) -> Error {
    Error::UnexpectedChildType {
        expected: expected.code(),
        found: found.kind().code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Coord;
    use byteorder::{BigEndian, LittleEndian, WriteBytesExt};

    fn frame<T: byteorder::ByteOrder>(buf: &mut Vec<u8>, marker: u8, srid: i32, tag: u32) {
        buf.write_u8(START).unwrap();
        buf.write_u8(marker).unwrap();
        buf.write_i32::<T>(srid).unwrap();
        for v in [-105.0, 40.0, -104.0, 41.0] {
            buf.write_f64::<T>(v).unwrap();
        }
        buf.write_u8(MBR).unwrap();
        buf.write_u32::<T>(tag).unwrap();
    }

    #[test]
    fn read_point() {
        let mut le_buf = Vec::new();
        frame::<LittleEndian>(&mut le_buf, 1, 4326, 1);
        le_buf.write_f64::<LittleEndian>(-105.0).unwrap();
        le_buf.write_f64::<LittleEndian>(40.0).unwrap();
        le_buf.write_u8(END).unwrap();

        let mut be_buf = Vec::new();
        frame::<BigEndian>(&mut be_buf, 0, 4326, 1);
        be_buf.write_f64::<BigEndian>(-105.0).unwrap();
        be_buf.write_f64::<BigEndian>(40.0).unwrap();
        be_buf.write_u8(END).unwrap();

        for buf in [le_buf, be_buf] {
            let shape = GaiaReader::new().read(&buf).unwrap();
            assert_eq!(shape.srid, Some(4326));
            match shape.geometry {
                Geometry::Point(p) => assert_eq!(p.coord(), Some(&Coord::xy(-105.0, 40.0))),
                other => panic!("expected point, got {:?}", other),
            }
        }
    }

    #[test]
    fn read_envelope_from_frame() {
        let mut buf = Vec::new();
        frame::<LittleEndian>(&mut buf, 1, 0, 1);
        buf.write_f64::<LittleEndian>(-105.0).unwrap();
        buf.write_f64::<LittleEndian>(40.0).unwrap();
        buf.write_u8(END).unwrap();

        let env = GaiaReader::new().read_envelope(&buf).unwrap();
        assert_eq!((env.min_x, env.min_y, env.max_x, env.max_y), (-105.0, 40.0, -104.0, 41.0));
        assert_eq!(GaiaReader::new().read(&buf).unwrap().srid, None);
    }

    #[test]
    fn read_multipoint_members_with_z() {
        let mut buf = Vec::new();
        frame::<LittleEndian>(&mut buf, 1, 4326, 1004);
        buf.write_i32::<LittleEndian>(2).unwrap();
        for z in [1.0, 2.0] {
            buf.write_u8(ENTITY).unwrap();
            buf.write_u32::<LittleEndian>(1001).unwrap();
            buf.write_f64::<LittleEndian>(0.0).unwrap();
            buf.write_f64::<LittleEndian>(0.0).unwrap();
            buf.write_f64::<LittleEndian>(z).unwrap();
        }
        buf.write_u8(END).unwrap();

        let shape = GaiaReader::new().read(&buf).unwrap();
        assert_eq!(shape.geometry.kind(), GeometryKind::MultiPoint);
        assert_eq!(shape.geometry.ordinates(), Ordinates::XYZ);

        let flat = GaiaReader::new()
            .with_handle_ordinates(Ordinates::XY)
            .read(&buf)
            .unwrap();
        assert_eq!(flat.geometry.ordinates(), Ordinates::XY);
    }

    #[test]
    fn read_members_with_mixed_compression() {
        let mut buf = Vec::new();
        frame::<LittleEndian>(&mut buf, 1, 4326, 5);
        buf.write_i32::<LittleEndian>(2).unwrap();

        buf.write_u8(ENTITY).unwrap();
        buf.write_u32::<LittleEndian>(2).unwrap();
        buf.write_i32::<LittleEndian>(2).unwrap();
        for v in [-105.0, 40.0, -104.0, 41.0] {
            buf.write_f64::<LittleEndian>(v).unwrap();
        }

        buf.write_u8(ENTITY).unwrap();
        buf.write_u32::<LittleEndian>(1_000_002).unwrap();
        buf.write_i32::<LittleEndian>(3).unwrap();
        buf.write_f64::<LittleEndian>(10.0).unwrap();
        buf.write_f64::<LittleEndian>(20.0).unwrap();
        buf.write_f32::<LittleEndian>(0.5).unwrap();
        buf.write_f32::<LittleEndian>(-0.25).unwrap();
        buf.write_f64::<LittleEndian>(11.0).unwrap();
        buf.write_f64::<LittleEndian>(19.0).unwrap();
        buf.write_u8(END).unwrap();

        let lines = match GaiaReader::new().read(&buf).unwrap().geometry {
            Geometry::MultiLineString(mls) => mls.0,
            other => panic!("expected multilinestring, got {:?}", other),
        };
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0].seq().coords(),
            &[Coord::xy(-105.0, 40.0), Coord::xy(-104.0, 41.0)]
        );
        assert_eq!(
            lines[1].seq().coords(),
            &[Coord::xy(10.0, 20.0), Coord::xy(10.5, 19.75), Coord::xy(11.0, 19.0)]
        );
    }

    #[test]
    fn rejects_bad_markers() {
        let mut good = Vec::new();
        frame::<LittleEndian>(&mut good, 1, 4326, 1);
        good.write_f64::<LittleEndian>(1.0).unwrap();
        good.write_f64::<LittleEndian>(2.0).unwrap();
        good.write_u8(END).unwrap();
        assert!(GaiaReader::new().read(&good).is_ok());

        let cases = [
            (0, MarkerKind::Start),
            (1, MarkerKind::Endian),
            (38, MarkerKind::Mbr),
            (good.len() - 1, MarkerKind::End),
        ];
        for (offset, kind) in cases {
            let mut bad = good.clone();
            bad[offset] = 0x42;
            match GaiaReader::new().read(&bad) {
                Err(Error::BadMarker { kind: k, offset: o, found }) => {
                    assert_eq!((k, o, found), (kind, offset, 0x42));
                }
                other => panic!("expected bad {} marker, got {:?}", kind, other),
            }
        }
    }

    #[test]
    fn rejects_bad_entity_marker() {
        let mut buf = Vec::new();
        frame::<LittleEndian>(&mut buf, 1, 4326, 4);
        buf.write_i32::<LittleEndian>(1).unwrap();
        buf.write_u8(0x42).unwrap();
        buf.write_u32::<LittleEndian>(1).unwrap();
        buf.write_f64::<LittleEndian>(1.0).unwrap();
        buf.write_f64::<LittleEndian>(2.0).unwrap();
        buf.write_u8(END).unwrap();
        assert!(matches!(
            GaiaReader::new().read(&buf),
            Err(Error::BadMarker {
                kind: MarkerKind::Entity,
                offset: 47,
                found: 0x42
            })
        ));
    }

    #[test]
    fn rejects_wrong_child_and_unknown_type() {
        let mut buf = Vec::new();
        frame::<LittleEndian>(&mut buf, 1, 4326, 5);
        buf.write_i32::<LittleEndian>(1).unwrap();
        buf.write_u8(ENTITY).unwrap();
        buf.write_u32::<LittleEndian>(1).unwrap();
        buf.write_f64::<LittleEndian>(1.0).unwrap();
        buf.write_f64::<LittleEndian>(2.0).unwrap();
        buf.write_u8(END).unwrap();
        assert!(matches!(
            GaiaReader::new().read(&buf),
            Err(Error::UnexpectedChildType {
                expected: 2,
                found: 1
            })
        ));

        let mut buf = Vec::new();
        frame::<LittleEndian>(&mut buf, 1, 4326, 9);
        buf.extend_from_slice(&[0; 16]);
        buf.write_u8(END).unwrap();
        assert!(matches!(
            GaiaReader::new().read(&buf),
            Err(Error::UnknownGeometryType(9))
        ));
    }

    #[test]
    fn requires_exact_length() {
        let mut buf = Vec::new();
        frame::<LittleEndian>(&mut buf, 1, 4326, 2);
        buf.write_i32::<LittleEndian>(0).unwrap();
        buf.write_u8(END).unwrap();
        assert!(GaiaReader::new().read(&buf).is_ok());

        let mut long = buf.clone();
        long.push(0);
        assert!(matches!(
            GaiaReader::new().read(&long),
            Err(Error::TrailingBytes(1))
        ));

        assert!(matches!(
            GaiaReader::new().read(&buf[..buf.len() - 1]),
            Err(Error::UnexpectedEndOfData)
        ));
        assert!(matches!(
            GaiaReader::new().read(&buf[..20]),
            Err(Error::TooShort { len: 20, min: 45 })
        ));
        assert!(matches!(
            GaiaReader::new().read(&[]),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn nesting_limit() {
        let mut buf = Vec::new();
        frame::<LittleEndian>(&mut buf, 1, 0, 7);
        for _ in 0..MAX_NESTING_DEPTH + 1 {
            buf.write_i32::<LittleEndian>(1).unwrap();
            buf.write_u8(ENTITY).unwrap();
            buf.write_u32::<LittleEndian>(7).unwrap();
        }
        buf.write_i32::<LittleEndian>(0).unwrap();
        buf.write_u8(END).unwrap();
        assert!(matches!(
            GaiaReader::new().read(&buf),
            Err(Error::NestingTooDeep(_))
        ));
    }
}
