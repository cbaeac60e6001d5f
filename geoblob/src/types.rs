use crate::ordinates::Ordinates;
use crate::result::{Error, Result};

/// A single vertex. Ordinates the owning sequence does not carry are NaN.
#[derive(Debug, Clone, Copy)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub m: f64,
}

impl Coord {
    pub fn xy(x: f64, y: f64) -> Self {
        Coord {
            x,
            y,
            z: f64::NAN,
            m: f64::NAN,
        }
    }

    pub fn xyz(x: f64, y: f64, z: f64) -> Self {
        Coord { z, ..Coord::xy(x, y) }
    }

    pub fn xym(x: f64, y: f64, m: f64) -> Self {
        Coord { m, ..Coord::xy(x, y) }
    }

    pub fn xyzm(x: f64, y: f64, z: f64, m: f64) -> Self {
        Coord { x, y, z, m }
    }

    /// A coordinate with every ordinate set to the IEEE-754 quiet NaN.
    pub fn nan() -> Self {
        let qnan = f64::from_bits(0x7FF8_0000_0000_0000);
        Coord {
            x: qnan,
            y: qnan,
            z: qnan,
            m: qnan,
        }
    }

    /// Keeps only the ordinates in `ordinates`, setting the others to NaN.
    pub fn restrict(self, ordinates: Ordinates) -> Self {
        Coord {
            z: if ordinates.has_z() { self.z } else { f64::NAN },
            m: if ordinates.has_m() { self.m } else { f64::NAN },
            ..self
        }
    }
}

// NaN compares equal to NaN so that coordinates with absent ordinates can be
// compared exactly.
impl PartialEq for Coord {
    fn eq(&self, other: &Self) -> bool {
        fn same(a: f64, b: f64) -> bool {
            a == b || (a.is_nan() && b.is_nan())
        }
        same(self.x, other.x)
            && same(self.y, other.y)
            && same(self.z, other.z)
            && same(self.m, other.m)
    }
}

/// An ordered list of coordinates sharing one ordinate set.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordSeq {
    ordinates: Ordinates,
    coords: Vec<Coord>,
}

impl CoordSeq {
    pub fn new(ordinates: Ordinates, coords: Vec<Coord>) -> Self {
        let coords = coords.into_iter().map(|c| c.restrict(ordinates)).collect();
        CoordSeq { ordinates, coords }
    }

    pub fn empty(ordinates: Ordinates) -> Self {
        CoordSeq {
            ordinates,
            coords: Vec::new(),
        }
    }

    pub fn ordinates(&self) -> Ordinates {
        self.ordinates
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn coords(&self) -> &[Coord] {
        &self.coords
    }

    pub fn get(&self, i: usize) -> Option<&Coord> {
        self.coords.get(i)
    }

    pub fn is_closed(&self) -> bool {
        match (self.coords.first(), self.coords.last()) {
            (Some(a), Some(b)) => a.x == b.x && a.y == b.y,
            _ => false,
        }
    }

    pub(crate) fn push(&mut self, c: Coord) {
        self.coords.push(c.restrict(self.ordinates));
    }
}

/// Deepest collection nesting the decoders accept.
pub const MAX_NESTING_DEPTH: usize = 128;

// counts come from the blob, so capacity hints are bounded
pub(crate) const MAX_PREALLOC: usize = 1024;

/// Base geometry kinds. The discriminants are the codes WKB and SpatiaLite share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Point = 1,
    LineString = 2,
    Polygon = 3,
    MultiPoint = 4,
    MultiLineString = 5,
    MultiPolygon = 6,
    GeometryCollection = 7,
}

impl GeometryKind {
    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(GeometryKind::Point),
            2 => Some(GeometryKind::LineString),
            3 => Some(GeometryKind::Polygon),
            4 => Some(GeometryKind::MultiPoint),
            5 => Some(GeometryKind::MultiLineString),
            6 => Some(GeometryKind::MultiPolygon),
            7 => Some(GeometryKind::GeometryCollection),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Point(CoordSeq);

impl Point {
    pub fn new(coord: Coord, ordinates: Ordinates) -> Self {
        Point(CoordSeq::new(ordinates, vec![coord]))
    }

    pub fn empty(ordinates: Ordinates) -> Self {
        Point(CoordSeq::empty(ordinates))
    }

    /// Fails when the sequence holds more than one coordinate.
    pub fn from_seq(seq: CoordSeq) -> Result<Self> {
        if seq.len() > 1 {
            return Err(Error::InvalidArgument("a point holds at most one coordinate"));
        }
        Ok(Point(seq))
    }

    pub fn coord(&self) -> Option<&Coord> {
        self.0.get(0)
    }

    pub fn seq(&self) -> &CoordSeq {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineString(CoordSeq);

impl LineString {
    pub fn new(seq: CoordSeq) -> Self {
        LineString(seq)
    }

    pub fn seq(&self) -> &CoordSeq {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.0.is_closed()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    exterior: LineString,
    interiors: Vec<LineString>,
}

impl Polygon {
    pub fn new(exterior: LineString, interiors: Vec<LineString>) -> Self {
        Polygon {
            exterior,
            interiors,
        }
    }

    pub fn empty(ordinates: Ordinates) -> Self {
        Polygon::new(LineString::new(CoordSeq::empty(ordinates)), Vec::new())
    }

    pub fn exterior(&self) -> &LineString {
        &self.exterior
    }

    pub fn interiors(&self) -> &[LineString] {
        &self.interiors
    }

    /// Exterior ring first, then the holes.
    pub fn rings(&self) -> impl Iterator<Item = &LineString> {
        std::iter::once(&self.exterior).chain(self.interiors.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.exterior.is_empty()
    }

    pub fn ordinates(&self) -> Ordinates {
        self.rings()
            .fold(Ordinates::XY, |acc, r| acc | r.seq().ordinates())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MultiPoint(pub Vec<Point>);
#[derive(Debug, Clone, PartialEq)]
pub struct MultiLineString(pub Vec<LineString>);
#[derive(Debug, Clone, PartialEq)]
pub struct MultiPolygon(pub Vec<Polygon>);
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryCollection(pub Vec<Geometry>);

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Point),
    LineString(LineString),
    Polygon(Polygon),
    MultiPoint(MultiPoint),
    MultiLineString(MultiLineString),
    MultiPolygon(MultiPolygon),
    GeometryCollection(GeometryCollection),
}

impl Geometry {
    pub fn kind(&self) -> GeometryKind {
        match self {
            Geometry::Point(_) => GeometryKind::Point,
            Geometry::LineString(_) => GeometryKind::LineString,
            Geometry::Polygon(_) => GeometryKind::Polygon,
            Geometry::MultiPoint(_) => GeometryKind::MultiPoint,
            Geometry::MultiLineString(_) => GeometryKind::MultiLineString,
            Geometry::MultiPolygon(_) => GeometryKind::MultiPolygon,
            Geometry::GeometryCollection(_) => GeometryKind::GeometryCollection,
        }
    }

    /// A composite is empty when all of its members are.
    pub fn is_empty(&self) -> bool {
        match self {
            Geometry::Point(p) => p.is_empty(),
            Geometry::LineString(ls) => ls.is_empty(),
            Geometry::Polygon(poly) => poly.is_empty(),
            Geometry::MultiPoint(mp) => mp.0.iter().all(Point::is_empty),
            Geometry::MultiLineString(mls) => mls.0.iter().all(LineString::is_empty),
            Geometry::MultiPolygon(mp) => mp.0.iter().all(Polygon::is_empty),
            Geometry::GeometryCollection(gc) => gc.0.iter().all(Geometry::is_empty),
        }
    }

    /// Union of the ordinates carried by every coordinate sequence in the geometry.
    pub fn ordinates(&self) -> Ordinates {
        let mut ordinates = Ordinates::XY;
        self.for_each_seq(&mut |seq| ordinates = ordinates | seq.ordinates());
        ordinates
    }

    /// Visits every coordinate sequence, depth first, in encoding order.
    pub fn for_each_seq(&self, f: &mut impl FnMut(&CoordSeq)) {
        match self {
            Geometry::Point(p) => f(p.seq()),
            Geometry::LineString(ls) => f(ls.seq()),
            Geometry::Polygon(poly) => poly.rings().for_each(|r| f(r.seq())),
            Geometry::MultiPoint(mp) => mp.0.iter().for_each(|p| f(p.seq())),
            Geometry::MultiLineString(mls) => mls.0.iter().for_each(|ls| f(ls.seq())),
            Geometry::MultiPolygon(mp) => mp
                .0
                .iter()
                .flat_map(Polygon::rings)
                .for_each(|r| f(r.seq())),
            Geometry::GeometryCollection(gc) => gc.0.iter().for_each(|g| g.for_each_seq(f)),
        }
    }

    pub fn for_each_coord(&self, f: &mut impl FnMut(&Coord)) {
        self.for_each_seq(&mut |seq| seq.coords().iter().for_each(|c| f(c)));
    }
}

/// A geometry tagged with its spatial reference identifier.
///
/// This is the root object every codec reads and writes. Child geometries of a
/// composite share the SRID of the root.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub geometry: Geometry,
    pub srid: Option<i32>,
}

impl Shape {
    pub fn new(geometry: Geometry) -> Self {
        Shape {
            geometry,
            srid: None,
        }
    }

    pub fn with_srid(mut self, srid: i32) -> Self {
        self.srid = Some(srid);
        self
    }
}

impl From<Geometry> for Shape {
    fn from(geometry: Geometry) -> Self {
        Shape::new(geometry)
    }
}

// helper macro to reduce boilerplate for wrapping each variant
macro_rules! geometry_from_variant {
    ($($t:ident),*) => {
        $(
            impl From<$t> for Geometry {
                fn from(g: $t) -> Self {
                    Geometry::$t(g)
                }
            }
        )*
    };
}

geometry_from_variant!(
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection
);

fn line_from_geo(ls: geo_types::LineString<f64>) -> LineString {
    LineString::new(CoordSeq::new(
        Ordinates::XY,
        ls.0.into_iter().map(|c| Coord::xy(c.x, c.y)).collect(),
    ))
}

fn polygon_from_geo(poly: geo_types::Polygon<f64>) -> Polygon {
    let (exterior, interiors) = poly.into_inner();
    Polygon::new(
        line_from_geo(exterior),
        interiors.into_iter().map(line_from_geo).collect(),
    )
}

fn point_from_geo(p: geo_types::Point<f64>) -> Point {
    Point::new(Coord::xy(p.x(), p.y()), Ordinates::XY)
}

impl From<geo_types::Geometry<f64>> for Geometry {
    fn from(g: geo_types::Geometry<f64>) -> Self {
        match g {
            geo_types::Geometry::Point(p) => point_from_geo(p).into(),
            geo_types::Geometry::Line(l) => {
                line_from_geo(geo_types::LineString::new(vec![l.start, l.end])).into()
            }
            geo_types::Geometry::LineString(ls) => line_from_geo(ls).into(),
            geo_types::Geometry::Polygon(poly) => polygon_from_geo(poly).into(),
            geo_types::Geometry::MultiPoint(mp) => {
                MultiPoint(mp.0.into_iter().map(point_from_geo).collect()).into()
            }
            geo_types::Geometry::MultiLineString(mls) => {
                MultiLineString(mls.0.into_iter().map(line_from_geo).collect()).into()
            }
            geo_types::Geometry::MultiPolygon(mp) => {
                MultiPolygon(mp.0.into_iter().map(polygon_from_geo).collect()).into()
            }
            geo_types::Geometry::GeometryCollection(gc) => {
                GeometryCollection(gc.0.into_iter().map(Geometry::from).collect()).into()
            }
            geo_types::Geometry::Rect(r) => polygon_from_geo(r.to_polygon()).into(),
            geo_types::Geometry::Triangle(t) => polygon_from_geo(t.to_polygon()).into(),
        }
    }
}

fn line_to_geo(ls: &LineString) -> geo_types::LineString<f64> {
    geo_types::LineString::new(
        ls.seq()
            .coords()
            .iter()
            .map(|c| geo_types::Coord { x: c.x, y: c.y })
            .collect(),
    )
}

fn polygon_to_geo(poly: &Polygon) -> geo_types::Polygon<f64> {
    geo_types::Polygon::new(
        line_to_geo(poly.exterior()),
        poly.interiors().iter().map(line_to_geo).collect(),
    )
}

fn point_to_geo(p: &Point) -> Result<geo_types::Point<f64>> {
    let c = p
        .coord()
        .ok_or(Error::InvalidArgument("empty point has no geo-types equivalent"))?;
    Ok(geo_types::Point::new(c.x, c.y))
}

/// Converts to the XY-only `geo_types` model, dropping Z and M.
impl TryFrom<&Geometry> for geo_types::Geometry<f64> {
    type Error = Error;

    fn try_from(g: &Geometry) -> Result<Self> {
        Ok(match g {
            Geometry::Point(p) => point_to_geo(p)?.into(),
            Geometry::LineString(ls) => line_to_geo(ls).into(),
            Geometry::Polygon(poly) => polygon_to_geo(poly).into(),
            Geometry::MultiPoint(mp) => geo_types::MultiPoint::new(
                mp.0.iter().map(point_to_geo).collect::<Result<Vec<_>>>()?,
            )
            .into(),
            Geometry::MultiLineString(mls) => {
                geo_types::MultiLineString::new(mls.0.iter().map(line_to_geo).collect()).into()
            }
            Geometry::MultiPolygon(mp) => {
                geo_types::MultiPolygon::new(mp.0.iter().map(polygon_to_geo).collect()).into()
            }
            Geometry::GeometryCollection(gc) => {
                geo_types::Geometry::GeometryCollection(geo_types::GeometryCollection(
                    gc.0.iter()
                        .map(geo_types::Geometry::<f64>::try_from)
                        .collect::<Result<Vec<_>>>()?,
                ))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::coord;

    #[test]
    fn coord_equality_treats_nan_as_equal() {
        assert_eq!(Coord::xy(1.0, 2.0), Coord::xy(1.0, 2.0));
        assert_ne!(Coord::xy(1.0, 2.0), Coord::xyz(1.0, 2.0, 3.0));
        assert_eq!(Coord::nan(), Coord::nan());
    }

    #[test]
    fn seq_drops_ordinates_it_does_not_carry() {
        let seq = CoordSeq::new(Ordinates::XYM, vec![Coord::xyzm(1.0, 2.0, 3.0, 4.0)]);
        let c = seq.get(0).unwrap();
        assert!(c.z.is_nan());
        assert_eq!(c.m, 4.0);
    }

    #[test]
    fn emptiness_of_composites() {
        let empty = GeometryCollection(vec![
            Point::empty(Ordinates::XY).into(),
            Polygon::empty(Ordinates::XY).into(),
        ]);
        assert!(Geometry::from(empty).is_empty());

        let not_empty = MultiPoint(vec![
            Point::empty(Ordinates::XY),
            Point::new(Coord::xy(1.0, 1.0), Ordinates::XY),
        ]);
        assert!(!Geometry::from(not_empty).is_empty());
        assert!(Geometry::from(MultiPolygon(vec![])).is_empty());
    }

    #[test]
    fn ordinates_are_the_union_of_members() {
        let gc: Geometry = GeometryCollection(vec![
            Point::new(Coord::xyz(1.0, 2.0, 3.0), Ordinates::XYZ).into(),
            LineString::new(CoordSeq::new(
                Ordinates::XYM,
                vec![Coord::xym(0.0, 0.0, 1.0), Coord::xym(1.0, 1.0, 2.0)],
            ))
            .into(),
        ])
        .into();
        assert_eq!(gc.ordinates(), Ordinates::XYZM);
        assert_eq!(Geometry::from(MultiPoint(vec![])).ordinates(), Ordinates::XY);
    }

    #[test]
    fn point_rejects_several_coords() {
        let seq = CoordSeq::new(Ordinates::XY, vec![Coord::xy(0.0, 0.0), Coord::xy(1.0, 1.0)]);
        assert!(Point::from_seq(seq).is_err());
    }

    #[test]
    fn geo_types_round_trip() {
        let poly = geo_types::Polygon::new(
            geo_types::LineString::new(vec![
                coord! {x: -105.0, y: 40.0},
                coord! {x: -106.0, y: 41.5},
                coord! {x: -107.0, y: 43.0},
                coord! {x: -105.0, y: 40.0},
            ]),
            vec![],
        );
        let gc = geo_types::Geometry::GeometryCollection(geo_types::GeometryCollection(vec![
            geo_types::Point::new(1.0, 2.0).into(),
            poly.into(),
        ]));

        let ours = Geometry::from(gc.clone());
        assert_eq!(ours.kind(), GeometryKind::GeometryCollection);
        let back = geo_types::Geometry::try_from(&ours).unwrap();
        assert_eq!(back, gc);

        let rect = geo_types::Rect::new(coord! {x: 0.0, y: 0.0}, coord! {x: 1.0, y: 1.0});
        match Geometry::from(geo_types::Geometry::Rect(rect)) {
            Geometry::Polygon(p) => assert!(p.exterior().is_closed()),
            other => panic!("expected polygon, got {:?}", other),
        }
    }

    #[test]
    fn empty_point_has_no_geo_types_equivalent() {
        let g: Geometry = Point::empty(Ordinates::XY).into();
        assert!(geo_types::Geometry::try_from(&g).is_err());
    }
}
