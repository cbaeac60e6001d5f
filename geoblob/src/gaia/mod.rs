//! SpatiaLite ("Gaia") geometry blobs.
//!
//! ```text
//! offset  size  field
//!      0     1  START marker (0x00)
//!      1     1  endian marker (0x01 little, 0x00 big)
//!      2     4  SRID
//!      6    32  MBR: min x, min y, max x, max y
//!     38     1  MBR marker (0x7C)
//!     39     4  type tag
//!     43     .  payload, each member of a collection preceded by ENTITY (0x69)
//!   last     1  END marker (0xFE)
//! ```

mod coords;
mod reader;
mod tag;
mod writer;

pub use coords::{encoded_len, reader_for, writer_for, ReadCoords, WriteCoords};
pub use reader::GaiaReader;
pub use tag::GaiaType;
pub use writer::GaiaWriter;

pub const START: u8 = 0x00;
pub const MBR: u8 = 0x7C;
pub const ENTITY: u8 = 0x69;
pub const END: u8 = 0xFE;

const SRID_OFFSET: usize = 2;
const MBR_MARKER_OFFSET: usize = 38;
const TYPE_OFFSET: usize = 39;

/// The smallest blob a reader will look at.
pub const MIN_BLOB_LEN: usize = 45;
