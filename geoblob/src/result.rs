use std::fmt;

/// The result returned by many methods within the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Names the framing byte that failed validation in a [Error::BadMarker].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Start,
    Endian,
    Mbr,
    Entity,
    End,
}

impl fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MarkerKind::Start => "start",
            MarkerKind::Endian => "endian",
            MarkerKind::Mbr => "MBR",
            MarkerKind::Entity => "entity",
            MarkerKind::End => "end",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Missing required input: {0}")]
    InvalidArgument(&'static str),
    #[error("Blob of {len} bytes is shorter than the minimum of {min} bytes")]
    TooShort { len: usize, min: usize },
    #[error("Unexpected end of data while decoding geometry")]
    UnexpectedEndOfData,
    #[error("Bad {kind} marker at offset {offset}: found {found:#04x}")]
    BadMarker {
        kind: MarkerKind,
        offset: usize,
        found: u8,
    },
    #[error("Invalid WKB byte order marker {0:#04x}")]
    InvalidByteOrder(u8),
    #[error("Geometry nesting exceeds {0} levels")]
    NestingTooDeep(usize),
    #[error("Unsupported geometry type {0}")]
    UnknownGeometryType(u32),
    #[error("Expected a child geometry of type {expected}, found type {found}")]
    UnexpectedChildType { expected: u32, found: u32 },
    #[error("Invalid GeoPackage header flags {0:#010b}")]
    InvalidHeaderFlags(u8),
    #[error("Invalid ordinate mask {0:#06b}")]
    InvalidOrdinates(u8),
    #[error("Unsupported configuration: {0}")]
    UnsupportedConfiguration(&'static str),
    #[error("{0} unexpected bytes after the end of the geometry blob")]
    TrailingBytes(usize),
    #[error("I/O error while encoding geometry")]
    Io(#[source] std::io::Error),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::UnexpectedEof => Error::UnexpectedEndOfData,
            _ => Error::Io(e),
        }
    }
}
