use crate::ordinates::Ordinates;
use crate::types::{Coord, Geometry};

/// A closed range of ordinate values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f64,
    pub max: f64,
}

impl Interval {
    pub fn new(min: f64, max: f64) -> Self {
        Interval { min, max }
    }

    /// The full range of finite doubles.
    pub fn full() -> Self {
        Interval::new(f64::MIN, f64::MAX)
    }

    fn nan() -> Self {
        Interval::new(f64::NAN, f64::NAN)
    }

    // f64::min and f64::max ignore NaN operands, so absent values never widen the range
    fn expand(&mut self, v: f64) {
        self.min = self.min.min(v);
        self.max = self.max.max(v);
    }
}

/// Axis aligned bounds of a geometry, with optional Z and M ranges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub z: Option<Interval>,
    pub m: Option<Interval>,
}

impl Envelope {
    /// Stands in for a header that recorded no envelope at all.
    pub fn sentinel() -> Self {
        let full = Interval::full();
        Envelope {
            min_x: full.min,
            max_x: full.max,
            min_y: full.min,
            max_y: full.max,
            z: Some(full),
            m: Some(full),
        }
    }

    /// All-zero XY bounds, written in place of the MBR of an empty geometry.
    pub fn zero() -> Self {
        Envelope {
            min_x: 0.0,
            max_x: 0.0,
            min_y: 0.0,
            max_y: 0.0,
            z: None,
            m: None,
        }
    }

    /// NaN bounds for the requested ordinates.
    pub fn nan(ordinates: Ordinates) -> Self {
        Envelope {
            min_x: f64::NAN,
            max_x: f64::NAN,
            min_y: f64::NAN,
            max_y: f64::NAN,
            z: ordinates.has_z().then(Interval::nan),
            m: ordinates.has_m().then(Interval::nan),
        }
    }

    /// Scans every coordinate of `geometry`. Returns `None` for an empty geometry.
    ///
    /// Z and M ranges are only tracked for the ordinates in `ordinates`; values that
    /// are NaN are skipped.
    pub fn of(geometry: &Geometry, ordinates: Ordinates) -> Option<Self> {
        if geometry.is_empty() {
            return None;
        }
        let mut env = Envelope::nan(ordinates);
        geometry.for_each_coord(&mut |c| env.expand(c));
        Some(env)
    }

    fn expand(&mut self, c: &Coord) {
        self.min_x = self.min_x.min(c.x);
        self.max_x = self.max_x.max(c.x);
        self.min_y = self.min_y.min(c.y);
        self.max_y = self.max_y.max(c.y);
        if let Some(z) = self.z.as_mut() {
            z.expand(c.z);
        }
        if let Some(m) = self.m.as_mut() {
            m.expand(c.m);
        }
    }
}
