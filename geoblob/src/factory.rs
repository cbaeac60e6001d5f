use crate::types::{
    Coord, CoordSeq, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint,
    MultiPolygon, Point, Polygon, Shape,
};
use crate::result::Result;

/// Rounding applied to X and Y as coordinates are decoded.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PrecisionModel {
    #[default]
    Floating,
    /// Rounds to the nearest `f32`.
    FloatingSingle,
    /// Rounds to a grid of `1 / scale`.
    Fixed { scale: f64 },
}

impl PrecisionModel {
    pub fn make_precise(&self, v: f64) -> f64 {
        match *self {
            PrecisionModel::Floating => v,
            PrecisionModel::FloatingSingle => v as f32 as f64,
            PrecisionModel::Fixed { scale } => {
                if v.is_nan() {
                    v
                } else {
                    (v * scale).round() / scale
                }
            }
        }
    }
}

/// Builds geometries for a single decode call.
///
/// A factory is cheap and is constructed fresh for every blob from the reader's
/// precision model and the SRID found in the blob.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryFactory {
    precision: PrecisionModel,
    srid: Option<i32>,
}

impl GeometryFactory {
    pub fn new(precision: PrecisionModel, srid: Option<i32>) -> Self {
        GeometryFactory { precision, srid }
    }

    pub fn precision(&self) -> PrecisionModel {
        self.precision
    }

    pub fn srid(&self) -> Option<i32> {
        self.srid
    }

    /// Applies the precision model to X and Y. Z and M pass through untouched.
    pub fn make_precise(&self, c: Coord) -> Coord {
        Coord {
            x: self.precision.make_precise(c.x),
            y: self.precision.make_precise(c.y),
            ..c
        }
    }

    pub fn create_point(&self, seq: CoordSeq) -> Result<Point> {
        Point::from_seq(seq)
    }

    pub fn create_line_string(&self, seq: CoordSeq) -> LineString {
        LineString::new(seq)
    }

    /// Builds a polygon ring, closing it first when `repair` is set.
    pub fn create_linear_ring(&self, mut seq: CoordSeq, repair: bool) -> LineString {
        if repair && !seq.is_empty() && !seq.is_closed() {
            if let Some(first) = seq.get(0).copied() {
                seq.push(first);
            }
        }
        LineString::new(seq)
    }

    pub fn create_polygon(&self, shell: LineString, holes: Vec<LineString>) -> Polygon {
        Polygon::new(shell, holes)
    }

    pub fn create_multi_point(&self, points: Vec<Point>) -> MultiPoint {
        MultiPoint(points)
    }

    pub fn create_multi_line_string(&self, lines: Vec<LineString>) -> MultiLineString {
        MultiLineString(lines)
    }

    pub fn create_multi_polygon(&self, polygons: Vec<Polygon>) -> MultiPolygon {
        MultiPolygon(polygons)
    }

    pub fn create_geometry_collection(&self, geoms: Vec<Geometry>) -> GeometryCollection {
        GeometryCollection(geoms)
    }

    /// Tags a finished geometry with the factory's SRID.
    pub fn create_shape(&self, geometry: Geometry) -> Shape {
        Shape {
            geometry,
            srid: self.srid,
        }
    }
}

impl Default for GeometryFactory {
    fn default() -> Self {
        GeometryFactory::new(PrecisionModel::Floating, None)
    }
}
