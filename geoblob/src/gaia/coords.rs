//! Coordinate payloads of SpatiaLite blobs.
//!
//! Plain sequences are `N * k` doubles. Compressed sequences store the first and
//! last coordinate as doubles and every interior coordinate as `f32` deltas from
//! the previous reconstructed coordinate, so rounding never accumulates along the
//! sequence.
//!
//! One reader and one writer exist per (compressed, Z, M) combination. They are
//! looked up once per sequence and then applied to every coordinate.

use crate::byte_order::ByteOrderCodec;
use crate::ordinates::Ordinates;
use crate::result::Result;
use crate::types::{Coord, MAX_PREALLOC};

pub type ReadCoords = fn(&ByteOrderCodec, &[u8], &mut usize, usize) -> Result<Vec<Coord>>;
pub type WriteCoords = fn(&ByteOrderCodec, &mut Vec<u8>, &[Coord]) -> Result<()>;

const READERS: [ReadCoords; 8] = [
    read_plain::<false, false>,
    read_plain::<false, true>,
    read_plain::<true, false>,
    read_plain::<true, true>,
    read_compressed::<false, false>,
    read_compressed::<false, true>,
    read_compressed::<true, false>,
    read_compressed::<true, true>,
];

const WRITERS: [WriteCoords; 8] = [
    write_plain::<false, false>,
    write_plain::<false, true>,
    write_plain::<true, false>,
    write_plain::<true, true>,
    write_compressed::<false, false>,
    write_compressed::<false, true>,
    write_compressed::<true, false>,
    write_compressed::<true, true>,
];

fn index(compressed: bool, ordinates: Ordinates) -> usize {
    (compressed as usize) << 2 | (ordinates.has_z() as usize) << 1 | ordinates.has_m() as usize
}

pub fn reader_for(compressed: bool, ordinates: Ordinates) -> ReadCoords {
    READERS[index(compressed, ordinates)]
}

pub fn writer_for(compressed: bool, ordinates: Ordinates) -> WriteCoords {
    WRITERS[index(compressed, ordinates)]
}

/// Bytes taken by `n` coordinates.
pub fn encoded_len(compressed: bool, ordinates: Ordinates, n: usize) -> usize {
    let k = ordinates.dimension();
    match (compressed, n) {
        (false, _) | (true, 0..=2) => n * k * 8,
        (true, _) => 2 * k * 8 + (n - 2) * k * 4,
    }
}

fn read_coord<const Z: bool, const M: bool>(
    codec: &ByteOrderCodec,
    buf: &[u8],
    offset: &mut usize,
) -> Result<Coord> {
    let x = codec.read_f64(buf, offset)?;
    let y = codec.read_f64(buf, offset)?;
    let mut c = Coord::xy(x, y);
    if Z {
        c.z = codec.read_f64(buf, offset)?;
    }
    if M {
        c.m = codec.read_f64(buf, offset)?;
    }
    Ok(c)
}

fn read_delta<const Z: bool, const M: bool>(
    codec: &ByteOrderCodec,
    buf: &[u8],
    offset: &mut usize,
    prev: &Coord,
) -> Result<Coord> {
    let x = prev.x + codec.read_f32(buf, offset)? as f64;
    let y = prev.y + codec.read_f32(buf, offset)? as f64;
    let mut c = Coord::xy(x, y);
    if Z {
        c.z = prev.z + codec.read_f32(buf, offset)? as f64;
    }
    if M {
        c.m = prev.m + codec.read_f32(buf, offset)? as f64;
    }
    Ok(c)
}

fn read_plain<const Z: bool, const M: bool>(
    codec: &ByteOrderCodec,
    buf: &[u8],
    offset: &mut usize,
    n: usize,
) -> Result<Vec<Coord>> {
    let mut coords = Vec::with_capacity(n.min(MAX_PREALLOC));
    for _ in 0..n {
        coords.push(read_coord::<Z, M>(codec, buf, offset)?);
    }
    Ok(coords)
}

fn read_compressed<const Z: bool, const M: bool>(
    codec: &ByteOrderCodec,
    buf: &[u8],
    offset: &mut usize,
    n: usize,
) -> Result<Vec<Coord>> {
    let mut coords: Vec<Coord> = Vec::with_capacity(n.min(MAX_PREALLOC));
    for i in 0..n {
        let c = match coords.last() {
            Some(prev) if i < n - 1 => read_delta::<Z, M>(codec, buf, offset, prev)?,
            _ => read_coord::<Z, M>(codec, buf, offset)?,
        };
        coords.push(c);
    }
    Ok(coords)
}

fn write_coord<const Z: bool, const M: bool>(
    codec: &ByteOrderCodec,
    buf: &mut Vec<u8>,
    c: &Coord,
) -> Result<()> {
    codec.write_f64(buf, c.x)?;
    codec.write_f64(buf, c.y)?;
    if Z {
        codec.write_f64(buf, c.z)?;
    }
    if M {
        codec.write_f64(buf, c.m)?;
    }
    Ok(())
}

// writes the f32 delta and advances `prev` by exactly what a reader will add
fn write_delta(codec: &ByteOrderCodec, buf: &mut Vec<u8>, v: f64, prev: &mut f64) -> Result<()> {
    let delta = (v - *prev) as f32;
    codec.write_f32(buf, delta)?;
    *prev += delta as f64;
    Ok(())
}

fn write_plain<const Z: bool, const M: bool>(
    codec: &ByteOrderCodec,
    buf: &mut Vec<u8>,
    coords: &[Coord],
) -> Result<()> {
    for c in coords {
        write_coord::<Z, M>(codec, buf, c)?;
    }
    Ok(())
}

fn write_compressed<const Z: bool, const M: bool>(
    codec: &ByteOrderCodec,
    buf: &mut Vec<u8>,
    coords: &[Coord],
) -> Result<()> {
    let (first, rest) = match coords.split_first() {
        Some(split) => split,
        None => return Ok(()),
    };
    write_coord::<Z, M>(codec, buf, first)?;
    let (last, interior) = match rest.split_last() {
        Some(split) => split,
        None => return Ok(()),
    };

    let mut prev = *first;
    for c in interior {
        write_delta(codec, buf, c.x, &mut prev.x)?;
        write_delta(codec, buf, c.y, &mut prev.y)?;
        if Z {
            write_delta(codec, buf, c.z, &mut prev.z)?;
        }
        if M {
            write_delta(codec, buf, c.m, &mut prev.m)?;
        }
    }
    write_coord::<Z, M>(codec, buf, last)
}
