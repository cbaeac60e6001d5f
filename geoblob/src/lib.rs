//! Reading and writing geometry blobs as stored by spatially enabled SQLite databases.
//!
//! Two encodings are supported:
//! - GeoPackage blobs, a binary header followed by well-known binary
//!   ([GeoPackageWriter], [GeoPackageReader]).
//! - SpatiaLite blobs, a marker framed format with optional delta compression of
//!   coordinates ([GaiaWriter], [GaiaReader]).
//!
//! Both work on [Shape], a [Geometry] with an optional SRID. Coordinates carry
//! optional Z and M ordinates; which of them a codec writes or keeps is set
//! through [Ordinates].
//!
//! ```
//! use geoblob::{Coord, GaiaReader, GaiaWriter, GeoPackageReader, GeoPackageWriter};
//! use geoblob::{Ordinates, Point, Shape};
//!
//! let shape = Shape::new(Point::new(Coord::xyz(11.11, 22.22, 33.33), Ordinates::XYZ).into())
//!     .with_srid(4326);
//!
//! let writer = GeoPackageWriter::new().with_handle_ordinates(Ordinates::XYZ);
//! let blob = writer.write_to_vec(&shape)?;
//! let back = GeoPackageReader::new().with_handle_srid(true).read(&blob)?;
//! assert_eq!(back, shape);
//!
//! let writer = GaiaWriter::new().with_handle_ordinates(Ordinates::XYZ);
//! let blob = writer.write(&shape)?;
//! assert_eq!(GaiaReader::new().read(&blob)?, shape);
//! # Ok::<(), geoblob::Error>(())
//! ```

pub mod byte_order;
pub mod envelope;
pub mod factory;
pub mod gaia;
pub mod gpkg_header;
pub mod gpkg_wkb;
pub mod ordinates;
pub mod result;
pub mod types;
pub mod wkb;

pub use byte_order::ByteOrder;
pub use envelope::{Envelope, Interval};
pub use factory::{GeometryFactory, PrecisionModel};
pub use gaia::{GaiaReader, GaiaWriter};
pub use gpkg_wkb::{GeoPackageReader, GeoPackageWKB, GeoPackageWriter};
pub use ordinates::Ordinates;
pub use result::{Error, MarkerKind, Result};
pub use types::{
    Coord, CoordSeq, Geometry, GeometryCollection, GeometryKind, LineString, MultiLineString,
    MultiPoint, MultiPolygon, Point, Polygon, Shape,
};
