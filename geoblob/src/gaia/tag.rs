use crate::ordinates::Ordinates;
use crate::result::{Error, Result};
use crate::types::GeometryKind;

const Z_OFFSET: u32 = 1000;
const M_OFFSET: u32 = 2000;
const ZM_OFFSET: u32 = 3000;
const COMPRESSED_OFFSET: u32 = 1_000_000;

/// A SpatiaLite geometry type tag, decomposed.
///
/// The tag is the base kind code plus 1000 for Z, 2000 for M or 3000 for both,
/// plus 1 000 000 when the coordinate payload is delta compressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GaiaType {
    pub kind: GeometryKind,
    pub ordinates: Ordinates,
    pub compressed: bool,
}

impl GaiaType {
    pub fn new(kind: GeometryKind, ordinates: Ordinates, compressed: bool) -> Self {
        GaiaType {
            kind,
            ordinates,
            compressed,
        }
    }

    /// The type a writer emits for `kind`. Only line strings and polygons carry a
    /// compressed payload; points and containers never take the compression offset.
    pub fn for_geometry(kind: GeometryKind, ordinates: Ordinates, use_compressed: bool) -> Self {
        let compressed = use_compressed
            && matches!(kind, GeometryKind::LineString | GeometryKind::Polygon);
        GaiaType::new(kind, ordinates, compressed)
    }

    pub fn tag(self) -> u32 {
        let dims = match (self.ordinates.has_z(), self.ordinates.has_m()) {
            (false, false) => 0,
            (true, false) => Z_OFFSET,
            (false, true) => M_OFFSET,
            (true, true) => ZM_OFFSET,
        };
        let compressed = if self.compressed { COMPRESSED_OFFSET } else { 0 };
        self.kind.code() + dims + compressed
    }

    pub fn from_tag(tag: u32) -> Result<Self> {
        let mut base = tag;
        let compressed = base > COMPRESSED_OFFSET;
        if compressed {
            base -= COMPRESSED_OFFSET;
        }
        let ordinates = if base > ZM_OFFSET {
            base -= ZM_OFFSET;
            Ordinates::XYZM
        } else if base > M_OFFSET {
            base -= M_OFFSET;
            Ordinates::XYM
        } else if base > Z_OFFSET {
            base -= Z_OFFSET;
            Ordinates::XYZ
        } else {
            Ordinates::XY
        };
        let kind = GeometryKind::from_code(base).ok_or(Error::UnknownGeometryType(tag))?;
        Ok(GaiaType::new(kind, ordinates, compressed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KINDS: [GeometryKind; 7] = [
        GeometryKind::Point,
        GeometryKind::LineString,
        GeometryKind::Polygon,
        GeometryKind::MultiPoint,
        GeometryKind::MultiLineString,
        GeometryKind::MultiPolygon,
        GeometryKind::GeometryCollection,
    ];

    #[test]
    fn tag_bijection() {
        for kind in KINDS {
            for ordinates in [Ordinates::XY, Ordinates::XYZ, Ordinates::XYM, Ordinates::XYZM] {
                for compressed in [false, true] {
                    let ty = GaiaType::new(kind, ordinates, compressed);
                    assert_eq!(GaiaType::from_tag(ty.tag()).unwrap(), ty);
                }
            }
        }
    }

    #[test]
    fn known_tags() {
        assert_eq!(
            GaiaType::new(GeometryKind::LineString, Ordinates::XY, true).tag(),
            1_000_002
        );
        assert_eq!(
            GaiaType::new(GeometryKind::Polygon, Ordinates::XYZM, true).tag(),
            1_003_003
        );
        assert_eq!(
            GaiaType::new(GeometryKind::MultiPoint, Ordinates::XYM, false).tag(),
            2004
        );
    }

    #[test]
    fn containers_never_compressed() {
        for kind in KINDS {
            let ty = GaiaType::for_geometry(kind, Ordinates::XYZ, true);
            let expected = matches!(kind, GeometryKind::LineString | GeometryKind::Polygon);
            assert_eq!(ty.compressed, expected, "{:?}", kind);
        }
    }

    #[test]
    fn unknown_tags() {
        for tag in [0, 8, 1000, 1008, 4001, 1_000_000, 1_000_009] {
            assert!(
                matches!(GaiaType::from_tag(tag), Err(Error::UnknownGeometryType(t)) if t == tag),
                "{}",
                tag
            );
        }
    }
}
