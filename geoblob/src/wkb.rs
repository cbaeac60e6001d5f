//! Well-known binary encoding of [Geometry] values, with Z and M support.
//!
//! The writer emits ISO type codes, or EWKB flag codes when SRIDs are handled. The
//! reader accepts either, in either byte order, and every nested geometry carries
//! its own header.

use crate::byte_order::ByteOrder;
use crate::factory::GeometryFactory;
use crate::ordinates::Ordinates;
use crate::result::{Error, Result};
use crate::types::{
    Coord, CoordSeq, Geometry, GeometryKind, LineString, Point, Polygon, Shape,
    MAX_NESTING_DEPTH, MAX_PREALLOC,
};
use byteorder::{BigEndian, ByteOrder as Endianness, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};
use tracing::trace;

const EWKB_Z: u32 = 0x8000_0000;
const EWKB_M: u32 = 0x4000_0000;
const EWKB_SRID: u32 = 0x2000_0000;
const EWKB_FLAGS: u32 = EWKB_Z | EWKB_M | EWKB_SRID;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WkbType {
    kind: GeometryKind,
    ordinates: Ordinates,
    has_srid: bool,
}

impl WkbType {
    fn iso_code(self) -> u32 {
        let dims = match (self.ordinates.has_z(), self.ordinates.has_m()) {
            (false, false) => 0,
            (true, false) => 1000,
            (false, true) => 2000,
            (true, true) => 3000,
        };
        self.kind.code() + dims
    }

    fn ewkb_code(self) -> u32 {
        let mut code = self.kind.code();
        if self.ordinates.has_z() {
            code |= EWKB_Z;
        }
        if self.ordinates.has_m() {
            code |= EWKB_M;
        }
        if self.has_srid {
            code |= EWKB_SRID;
        }
        code
    }

    fn from_code(code: u32) -> Result<Self> {
        let flags = code & EWKB_FLAGS;
        let iso = code & !EWKB_FLAGS;
        let (base, iso_z, iso_m) = match iso / 1000 {
            0 => (iso, false, false),
            1 => (iso - 1000, true, false),
            2 => (iso - 2000, false, true),
            3 => (iso - 3000, true, true),
            _ => return Err(Error::UnknownGeometryType(code)),
        };
        let kind = GeometryKind::from_code(base).ok_or(Error::UnknownGeometryType(code))?;
        Ok(WkbType {
            kind,
            ordinates: Ordinates::from_flags(iso_z || flags & EWKB_Z != 0, iso_m || flags & EWKB_M != 0),
            has_srid: flags & EWKB_SRID != 0,
        })
    }
}

/// Serializes geometries as WKB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WkbWriter {
    byte_order: ByteOrder,
    handle_srid: bool,
    ordinates: Ordinates,
}

impl WkbWriter {
    /// `ordinates` is the set written for the root geometry. Members of a
    /// collection write the part of it they carry themselves.
    pub fn new(byte_order: ByteOrder, handle_srid: bool, ordinates: Ordinates) -> Self {
        WkbWriter {
            byte_order,
            handle_srid,
            ordinates,
        }
    }

    pub fn ordinates(&self) -> Ordinates {
        self.ordinates
    }

    pub fn write(&self, shape: &Shape, w: &mut impl Write) -> Result<()> {
        // only the root header carries the SRID
        let srid = if self.handle_srid { shape.srid } else { None };
        let (g, ords) = (&shape.geometry, self.ordinates);
        match self.byte_order {
            ByteOrder::LittleEndian => self.write_geometry::<LittleEndian>(w, g, ords, srid),
            ByteOrder::BigEndian => self.write_geometry::<BigEndian>(w, g, ords, srid),
        }
    }

    pub fn write_to_vec(&self, shape: &Shape) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write(shape, &mut buf)?;
        Ok(buf)
    }

    fn write_header<T: Endianness>(
        &self,
        w: &mut impl Write,
        kind: GeometryKind,
        ordinates: Ordinates,
        srid: Option<i32>,
    ) -> Result<()> {
        let ty = WkbType {
            kind,
            ordinates,
            has_srid: srid.is_some(),
        };
        let code = if self.handle_srid {
            ty.ewkb_code()
        } else {
            ty.iso_code()
        };
        w.write_u8(self.byte_order.marker())?;
        w.write_u32::<T>(code)?;
        if let Some(srid) = srid {
            w.write_i32::<T>(srid)?;
        }
        Ok(())
    }

    fn write_geometry<T: Endianness>(
        &self,
        w: &mut impl Write,
        g: &Geometry,
        ords: Ordinates,
        srid: Option<i32>,
    ) -> Result<()> {
        self.write_header::<T>(w, g.kind(), ords, srid)?;
        match g {
            Geometry::Point(p) => self.write_point::<T>(w, p, ords),
            Geometry::LineString(ls) => self.write_seq::<T>(w, ls.seq(), ords),
            Geometry::Polygon(poly) => self.write_polygon::<T>(w, poly, ords),
            Geometry::MultiPoint(mp) => {
                write_count::<T>(w, mp.0.len())?;
                for p in &mp.0 {
                    let ords = ords & p.seq().ordinates();
                    self.write_header::<T>(w, GeometryKind::Point, ords, None)?;
                    self.write_point::<T>(w, p, ords)?;
                }
                Ok(())
            }
            Geometry::MultiLineString(mls) => {
                write_count::<T>(w, mls.0.len())?;
                for ls in &mls.0 {
                    let ords = ords & ls.seq().ordinates();
                    self.write_header::<T>(w, GeometryKind::LineString, ords, None)?;
                    self.write_seq::<T>(w, ls.seq(), ords)?;
                }
                Ok(())
            }
            Geometry::MultiPolygon(mp) => {
                write_count::<T>(w, mp.0.len())?;
                for poly in &mp.0 {
                    let ords = ords & poly.ordinates();
                    self.write_header::<T>(w, GeometryKind::Polygon, ords, None)?;
                    self.write_polygon::<T>(w, poly, ords)?;
                }
                Ok(())
            }
            Geometry::GeometryCollection(gc) => {
                write_count::<T>(w, gc.0.len())?;
                for child in &gc.0 {
                    self.write_geometry::<T>(w, child, ords & child.ordinates(), None)?;
                }
                Ok(())
            }
        }
    }

    fn write_coord<T: Endianness>(
        &self,
        w: &mut impl Write,
        c: &Coord,
        ords: Ordinates,
    ) -> Result<()> {
        w.write_f64::<T>(c.x)?;
        w.write_f64::<T>(c.y)?;
        if ords.has_z() {
            w.write_f64::<T>(c.z)?;
        }
        if ords.has_m() {
            w.write_f64::<T>(c.m)?;
        }
        Ok(())
    }

    // WKB has no empty point, so one is written with NaN ordinates
    fn write_point<T: Endianness>(
        &self,
        w: &mut impl Write,
        p: &Point,
        ords: Ordinates,
    ) -> Result<()> {
        match p.coord() {
            Some(c) => self.write_coord::<T>(w, c, ords),
            None => self.write_coord::<T>(w, &Coord::nan(), ords),
        }
    }

    fn write_seq<T: Endianness>(
        &self,
        w: &mut impl Write,
        seq: &CoordSeq,
        ords: Ordinates,
    ) -> Result<()> {
        write_count::<T>(w, seq.len())?;
        for c in seq.coords() {
            self.write_coord::<T>(w, c, ords)?;
        }
        Ok(())
    }

    fn write_polygon<T: Endianness>(
        &self,
        w: &mut impl Write,
        poly: &Polygon,
        ords: Ordinates,
    ) -> Result<()> {
        if poly.is_empty() && poly.interiors().is_empty() {
            w.write_u32::<T>(0)?;
            return Ok(());
        }
        write_count::<T>(w, poly.interiors().len() + 1)?;
        for ring in poly.rings() {
            self.write_seq::<T>(w, ring.seq(), ords)?;
        }
        Ok(())
    }
}

fn write_count<T: Endianness>(w: &mut impl Write, n: usize) -> Result<()> {
    let n = u32::try_from(n).map_err(|_| Error::InvalidArgument("element count exceeds u32"))?;
    w.write_u32::<T>(n)?;
    Ok(())
}

fn read_count<T: Endianness>(r: &mut impl Read) -> Result<usize> {
    Ok(r.read_u32::<T>()? as usize)
}

/// Parses WKB into [Shape] values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WkbReader {
    handle_ordinates: Ordinates,
    handle_srid: bool,
    repair_rings: bool,
    factory: GeometryFactory,
}

impl WkbReader {
    pub fn new(factory: GeometryFactory) -> Self {
        WkbReader {
            handle_ordinates: Ordinates::XYZM,
            handle_srid: false,
            repair_rings: false,
            factory,
        }
    }

    pub fn with_handle_ordinates(mut self, ordinates: Ordinates) -> Self {
        self.handle_ordinates = Ordinates::clamp(ordinates, Ordinates::XYZM);
        self
    }

    /// Stamp an EWKB SRID, when present, onto the decoded shape.
    pub fn with_handle_srid(mut self, handle_srid: bool) -> Self {
        self.handle_srid = handle_srid;
        self
    }

    pub fn with_repair_rings(mut self, repair_rings: bool) -> Self {
        self.repair_rings = repair_rings;
        self
    }

    pub fn read(&self, r: &mut impl Read) -> Result<Shape> {
        let (geometry, srid) = self.read_geometry(r, 0)?;
        let mut shape = self.factory.create_shape(geometry);
        if let (true, Some(srid)) = (self.handle_srid, srid) {
            shape.srid = Some(srid);
        }
        Ok(shape)
    }

    pub fn read_slice(&self, bytes: &[u8]) -> Result<Shape> {
        self.read(&mut Cursor::new(bytes))
    }

    fn read_geometry<R: Read>(&self, r: &mut R, depth: usize) -> Result<(Geometry, Option<i32>)> {
        if depth > MAX_NESTING_DEPTH {
            return Err(Error::NestingTooDeep(MAX_NESTING_DEPTH));
        }
        let marker = r.read_u8()?;
        match ByteOrder::from_marker(marker) {
            Some(ByteOrder::LittleEndian) => self.read_body::<LittleEndian, R>(r, depth),
            Some(ByteOrder::BigEndian) => self.read_body::<BigEndian, R>(r, depth),
            None => Err(Error::InvalidByteOrder(marker)),
        }
    }

    fn read_body<T: Endianness, R: Read>(
        &self,
        r: &mut R,
        depth: usize,
    ) -> Result<(Geometry, Option<i32>)> {
        let ty = WkbType::from_code(r.read_u32::<T>()?)?;
        let srid = if ty.has_srid {
            Some(r.read_i32::<T>()?)
        } else {
            None
        };
        trace!(kind = ?ty.kind, ordinates = %ty.ordinates, depth, "reading wkb geometry");

        let geometry: Geometry = match ty.kind {
            GeometryKind::Point => {
                let seq = self.read_coords::<T, R>(r, 1, ty.ordinates)?;
                self.factory.create_point(seq)?.into()
            }
            GeometryKind::LineString => {
                let n = read_count::<T>(r)?;
                let seq = self.read_coords::<T, R>(r, n, ty.ordinates)?;
                self.factory.create_line_string(seq).into()
            }
            GeometryKind::Polygon => self.read_polygon::<T, R>(r, ty.ordinates)?.into(),
            GeometryKind::MultiPoint => {
                let n = read_count::<T>(r)?;
                let mut points = Vec::with_capacity(n.min(MAX_PREALLOC));
                for _ in 0..n {
                    match self.read_geometry(r, depth + 1)?.0 {
                        Geometry::Point(p) => points.push(p),
                        other => return Err(unexpected_child(GeometryKind::Point, &other)),
                    }
                }
                self.factory.create_multi_point(points).into()
            }
            GeometryKind::MultiLineString => {
                let n = read_count::<T>(r)?;
                let mut lines = Vec::with_capacity(n.min(MAX_PREALLOC));
                for _ in 0..n {
                    match self.read_geometry(r, depth + 1)?.0 {
                        Geometry::LineString(ls) => lines.push(ls),
                        other => return Err(unexpected_child(GeometryKind::LineString, &other)),
                    }
                }
                self.factory.create_multi_line_string(lines).into()
            }
            GeometryKind::MultiPolygon => {
                let n = read_count::<T>(r)?;
                let mut polygons = Vec::with_capacity(n.min(MAX_PREALLOC));
                for _ in 0..n {
                    match self.read_geometry(r, depth + 1)?.0 {
                        Geometry::Polygon(poly) => polygons.push(poly),
                        other => return Err(unexpected_child(GeometryKind::Polygon, &other)),
                    }
                }
                self.factory.create_multi_polygon(polygons).into()
            }
            GeometryKind::GeometryCollection => {
                let n = read_count::<T>(r)?;
                let mut geoms = Vec::with_capacity(n.min(MAX_PREALLOC));
                for _ in 0..n {
                    geoms.push(self.read_geometry(r, depth + 1)?.0);
                }
                self.factory.create_geometry_collection(geoms).into()
            }
        };
        Ok((geometry, srid))
    }

    fn read_coords<T: Endianness, R: Read>(
        &self,
        r: &mut R,
        n: usize,
        blob_ordinates: Ordinates,
    ) -> Result<CoordSeq> {
        let mut coords = Vec::with_capacity(n.min(MAX_PREALLOC));
        for _ in 0..n {
            let mut c = Coord::xy(r.read_f64::<T>()?, r.read_f64::<T>()?);
            if blob_ordinates.has_z() {
                c.z = r.read_f64::<T>()?;
            }
            if blob_ordinates.has_m() {
                c.m = r.read_f64::<T>()?;
            }
            coords.push(self.factory.make_precise(c));
        }
        Ok(CoordSeq::new(blob_ordinates & self.handle_ordinates, coords))
    }

    fn read_polygon<T: Endianness, R: Read>(
        &self,
        r: &mut R,
        blob_ordinates: Ordinates,
    ) -> Result<Polygon> {
        let num_rings = read_count::<T>(r)?;
        if num_rings == 0 {
            return Ok(Polygon::empty(blob_ordinates & self.handle_ordinates));
        }
        let shell = self.read_ring::<T, R>(r, blob_ordinates)?;
        let mut holes = Vec::with_capacity((num_rings - 1).min(MAX_PREALLOC));
        for _ in 1..num_rings {
            holes.push(self.read_ring::<T, R>(r, blob_ordinates)?);
        }
        Ok(self.factory.create_polygon(shell, holes))
    }

    fn read_ring<T: Endianness, R: Read>(
        &self,
        r: &mut R,
        blob_ordinates: Ordinates,
    ) -> Result<LineString> {
        let n = read_count::<T>(r)?;
        let seq = self.read_coords::<T, R>(r, n, blob_ordinates)?;
        Ok(self.factory.create_linear_ring(seq, self.repair_rings))
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
    use crate::types::{GeometryCollection, MultiPoint};

    fn xy_writer() -> WkbWriter {
        WkbWriter::new(ByteOrder::LittleEndian, false, Ordinates::XY)
    }

    fn reader() -> WkbReader {
        WkbReader::new(GeometryFactory::default())
    }

    fn line(coords: &[(f64, f64)]) -> LineString {
        LineString::new(CoordSeq::new(
            Ordinates::XY,
            coords.iter().map(|&(x, y)| Coord::xy(x, y)).collect(),
        ))
    }

    #[test]
    fn write_point() {
        let mut manual_buf = Vec::new();
        // little endian
        manual_buf.write_u8(1).unwrap();
        // geom type flag
        manual_buf.write_u32::<LittleEndian>(1).unwrap();
        manual_buf.write_f64::<LittleEndian>(-105.0).unwrap();
        manual_buf.write_f64::<LittleEndian>(40.0).unwrap();

        let shape = Shape::new(Point::new(Coord::xy(-105.0, 40.0), Ordinates::XY).into());
        let auto_buf = xy_writer().write_to_vec(&shape).unwrap();
        assert_eq!(manual_buf, auto_buf);

        // read our own output back
        let back = reader().read_slice(&auto_buf).unwrap();
        assert_eq!(back, shape);
    }

    #[test]
    fn read_point() {
        let mut le_buf = Vec::new();
        le_buf.write_u8(1).unwrap();
        le_buf.write_u32::<LittleEndian>(1).unwrap();
        le_buf.write_f64::<LittleEndian>(-105.0).unwrap();
        le_buf.write_f64::<LittleEndian>(40.0).unwrap();

        let mut be_buf = Vec::new();
        be_buf.write_u8(0).unwrap();
        be_buf.write_u32::<BigEndian>(1).unwrap();
        be_buf.write_f64::<BigEndian>(-105.0).unwrap();
        be_buf.write_f64::<BigEndian>(40.0).unwrap();

        let expected: Geometry = Point::new(Coord::xy(-105.0, 40.0), Ordinates::XY).into();
        assert_eq!(reader().read_slice(&le_buf).unwrap().geometry, expected);
        assert_eq!(reader().read_slice(&be_buf).unwrap().geometry, expected);
    }

    #[test]
    fn write_point_zm_uses_iso_code() {
        let writer = WkbWriter::new(ByteOrder::BigEndian, false, Ordinates::XYZM);
        let shape = Shape::new(
            Point::new(Coord::xyzm(1.0, 2.0, 3.0, 4.0), Ordinates::XYZM).into(),
        );
        let buf = writer.write_to_vec(&shape).unwrap();
        assert_eq!(buf[0], 0);
        assert_eq!(BigEndian::read_u32(&buf[1..5]), 3001);
        assert_eq!(buf.len(), 5 + 32);
        assert_eq!(reader().read_slice(&buf).unwrap(), shape);
    }

    #[test]
    fn write_linestring() {
        let mut manual_buf = Vec::new();
        manual_buf.write_u8(1).unwrap();
        manual_buf.write_u32::<LittleEndian>(2).unwrap();
        // number of points
        manual_buf.write_u32::<LittleEndian>(3).unwrap();
        for (x, y) in [(-105.0, 40.0), (-106.0, 41.5), (-107.0, 43.0)] {
            manual_buf.write_f64::<LittleEndian>(x).unwrap();
            manual_buf.write_f64::<LittleEndian>(y).unwrap();
        }

        let shape = Shape::new(line(&[(-105.0, 40.0), (-106.0, 41.5), (-107.0, 43.0)]).into());
        let auto_buf = xy_writer().write_to_vec(&shape).unwrap();
        assert_eq!(manual_buf, auto_buf);
        assert_eq!(reader().read_slice(&auto_buf).unwrap(), shape);
    }

    #[test]
    fn read_polygon_with_hole() {
        let mut buf = Vec::new();
        buf.write_u8(0).unwrap();
        buf.write_u32::<BigEndian>(3).unwrap();
        // number of rings
        buf.write_u32::<BigEndian>(2).unwrap();
        let shell = [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)];
        let hole = [(2.0, 2.0), (4.0, 2.0), (4.0, 4.0), (2.0, 2.0)];
        for ring in [&shell[..], &hole[..]] {
            buf.write_u32::<BigEndian>(ring.len() as u32).unwrap();
            for &(x, y) in ring {
                buf.write_f64::<BigEndian>(x).unwrap();
                buf.write_f64::<BigEndian>(y).unwrap();
            }
        }

        let expected: Geometry = Polygon::new(line(&shell), vec![line(&hole)]).into();
        assert_eq!(reader().read_slice(&buf).unwrap().geometry, expected);
    }

    #[test]
    fn repairs_open_rings_on_request() {
        let open = Polygon::new(line(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]), vec![]);
        let buf = xy_writer()
            .write_to_vec(&Shape::new(open.clone().into()))
            .unwrap();

        assert_eq!(reader().read_slice(&buf).unwrap().geometry, Geometry::from(open));
        match reader().with_repair_rings(true).read_slice(&buf).unwrap().geometry {
            Geometry::Polygon(p) => {
                assert!(p.exterior().is_closed());
                assert_eq!(p.exterior().seq().len(), 4);
            }
            other => panic!("expected polygon, got {:?}", other),
        }
    }

    #[test]
    fn ewkb_srid_and_flags() {
        let writer = WkbWriter::new(ByteOrder::LittleEndian, true, Ordinates::XYZ);
        let shape = Shape::new(Point::new(Coord::xyz(1.0, 2.0, 3.0), Ordinates::XYZ).into())
            .with_srid(4326);
        let buf = writer.write_to_vec(&shape).unwrap();
        assert_eq!(LittleEndian::read_u32(&buf[1..5]), 1 | EWKB_Z | EWKB_SRID);
        assert_eq!(LittleEndian::read_i32(&buf[5..9]), 4326);

        assert_eq!(reader().read_slice(&buf).unwrap().srid, None);
        assert_eq!(
            reader().with_handle_srid(true).read_slice(&buf).unwrap(),
            shape
        );
    }

    #[test]
    fn handle_ordinates_drops_z() {
        let writer = WkbWriter::new(ByteOrder::LittleEndian, false, Ordinates::XYZ);
        let shape = Shape::new(line(&[(0.0, 0.0), (1.0, 1.0)]).into());
        let buf = writer.write_to_vec(&shape).unwrap();
        let back = reader()
            .with_handle_ordinates(Ordinates::XY)
            .read_slice(&buf)
            .unwrap();
        assert_eq!(back.geometry.ordinates(), Ordinates::XY);
    }

    #[test]
    fn empty_point_is_nan() {
        let shape = Shape::new(Point::empty(Ordinates::XY).into());
        let buf = xy_writer().write_to_vec(&shape).unwrap();
        assert_eq!(buf.len(), 21);
        match reader().read_slice(&buf).unwrap().geometry {
            Geometry::Point(p) => {
                let c = p.coord().unwrap();
                assert!(c.x.is_nan() && c.y.is_nan());
            }
            other => panic!("expected point, got {:?}", other),
        }
    }

    #[test]
    fn nested_collection() {
        let gc: Geometry = GeometryCollection(vec![
            MultiPoint(vec![
                Point::new(Coord::xy(1.0, 2.0), Ordinates::XY),
                Point::new(Coord::xy(3.0, 4.0), Ordinates::XY),
            ])
            .into(),
            Polygon::empty(Ordinates::XY).into(),
        ])
        .into();
        let shape = Shape::new(gc);
        let buf = xy_writer().write_to_vec(&shape).unwrap();
        assert_eq!(reader().read_slice(&buf).unwrap(), shape);
    }

    #[test]
    fn rejects_bad_input() {
        let mut buf = Vec::new();
        buf.write_u8(1).unwrap();
        buf.write_u32::<LittleEndian>(17).unwrap();
        assert!(matches!(
            reader().read_slice(&buf),
            Err(Error::UnknownGeometryType(17))
        ));

        assert!(matches!(
            reader().read_slice(&[2, 1, 0, 0, 0]),
            Err(Error::InvalidByteOrder(2))
        ));

        let shape = Shape::new(line(&[(0.0, 0.0), (1.0, 1.0)]).into());
        let full = xy_writer().write_to_vec(&shape).unwrap();
        assert!(matches!(
            reader().read_slice(&full[..full.len() - 1]),
            Err(Error::UnexpectedEndOfData)
        ));
    }

    #[test]
    fn rejects_wrong_child_type() {
        let mut buf = Vec::new();
        buf.write_u8(1).unwrap();
        buf.write_u32::<LittleEndian>(4).unwrap();
        buf.write_u32::<LittleEndian>(1).unwrap();
        // a linestring where a point belongs
        buf.write_u8(1).unwrap();
        buf.write_u32::<LittleEndian>(2).unwrap();
        buf.write_u32::<LittleEndian>(0).unwrap();
        assert!(matches!(
            reader().read_slice(&buf),
            Err(Error::UnexpectedChildType {
                expected: 1,
                found: 2
            })
        ));
    }

    #[test]
    fn nesting_limit() {
        let mut buf = Vec::new();
        for _ in 0..MAX_NESTING_DEPTH + 2 {
            buf.write_u8(1).unwrap();
            buf.write_u32::<LittleEndian>(7).unwrap();
            buf.write_u32::<LittleEndian>(1).unwrap();
        }
        assert!(matches!(
            reader().read_slice(&buf),
            Err(Error::NestingTooDeep(_))
        ));
    }
}
