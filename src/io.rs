//! Binary pack I/O (C11): parses the on-disk/over-the-wire layout for the
//! land mask raster (spec.md §3). Environment pack planes arrive
//! already decoded (`EnvironmentPack::load` takes `Vec<f32>`/`Vec<u8>`
//! directly, per spec.md §4.11) so there is no binary parsing for them
//! here — only the shared `GridDescriptor` header layout.
//!
//! The teacher never had a binary format of its own (it deserializes a
//! `RoaringTreemap` via `roaring`'s own `(de)serialize_from` and decodes
//! GRIB via `eccodes`); this module is grounded instead in the fixed
//! little-endian header convention spec.md §3 specifies bit-exact, read
//! with plain `from_le_bytes` slicing rather than a parser combinator
//! crate — the header has no variable-length or repeated structure that
//! would justify one.

use crate::data::GridDescriptor;
use crate::error::RoutingError;

pub const HEADER_LEN: usize = 56;

/// A parsed land mask raster header plus its body bytes.
pub struct ParsedLandMask {
    pub grid: GridDescriptor,
    pub rows: usize,
    pub cols: usize,
    pub cells: Vec<u8>,
}

fn read_f64(bytes: &[u8], offset: usize) -> f64 {
    f64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap())
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
}

/// Parses the 56-byte header plus `rows*cols` body, per spec.md §3's
/// bit-exact layout. Returns `RoutingError::Load` on any malformed input.
pub fn parse_land_mask(bytes: &[u8]) -> Result<ParsedLandMask, RoutingError> {
    if bytes.len() < HEADER_LEN {
        return Err(RoutingError::Load(format!(
            "truncated header: need {HEADER_LEN} bytes, got {}",
            bytes.len()
        )));
    }

    let lat0 = read_f64(bytes, 0);
    let lat1 = read_f64(bytes, 8);
    let lon0 = read_f64(bytes, 16);
    let lon1 = read_f64(bytes, 24);
    let d_lat = read_f64(bytes, 32);
    let d_lon = read_f64(bytes, 40);
    let rows = read_u32(bytes, 48) as usize;
    let cols = read_u32(bytes, 52) as usize;

    let grid = GridDescriptor::new(lat0, lat1, lon0, lon1, d_lat, d_lon);
    if !grid.is_valid() {
        return Err(RoutingError::Load("invalid header: bad grid bounds".into()));
    }
    if rows == 0 || cols == 0 {
        return Err(RoutingError::Load("invalid header: zero rows or cols".into()));
    }

    let expected_len = HEADER_LEN + rows * cols;
    if bytes.len() != expected_len {
        return Err(RoutingError::Load(format!(
            "size mismatch: expected {expected_len} bytes, got {}",
            bytes.len()
        )));
    }

    let cells = bytes[HEADER_LEN..].to_vec();
    Ok(ParsedLandMask { grid, rows, cols, cells })
}

/// Serializes a land mask raster back to the on-disk layout. Used by
/// tests and by hosts that want to round-trip a mask they built in memory.
pub fn write_land_mask(grid: &GridDescriptor, cells: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + cells.len());
    out.extend_from_slice(&grid.lat0.to_le_bytes());
    out.extend_from_slice(&grid.lat1.to_le_bytes());
    out.extend_from_slice(&grid.lon0.to_le_bytes());
    out.extend_from_slice(&grid.lon1.to_le_bytes());
    out.extend_from_slice(&grid.d_lat.to_le_bytes());
    out.extend_from_slice(&grid.d_lon.to_le_bytes());
    out.extend_from_slice(&(grid.rows() as u32).to_le_bytes());
    out.extend_from_slice(&(grid.cols() as u32).to_le_bytes());
    out.extend_from_slice(cells);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_grid() -> GridDescriptor {
        GridDescriptor::new(-1.0, 1.0, -1.0, 1.0, 1.0, 1.0)
    }

    #[test]
    fn round_trip_header_and_body() {
        let grid = sample_grid();
        let cells = vec![0u8, 1, 0, 1, 0, 1, 0, 1, 0];
        let bytes = write_land_mask(&grid, &cells);
        let parsed = parse_land_mask(&bytes).unwrap();
        assert_eq!(parsed.rows, 3);
        assert_eq!(parsed.cols, 3);
        assert_eq!(parsed.cells, cells);
    }

    #[test]
    fn truncated_header_is_load_error() {
        let err = parse_land_mask(&[0u8; 10]).unwrap_err();
        assert!(matches!(err, RoutingError::Load(_)));
    }

    #[test]
    fn truncated_body_is_load_error() {
        let grid = sample_grid();
        let mut bytes = write_land_mask(&grid, &vec![0u8; 9]);
        bytes.truncate(bytes.len() - 3);
        let err = parse_land_mask(&bytes).unwrap_err();
        assert!(matches!(err, RoutingError::Load(_)));
    }

    #[test]
    fn zero_rows_is_load_error() {
        let mut bytes = write_land_mask(&sample_grid(), &vec![0u8; 9]);
        bytes[48..52].copy_from_slice(&0u32.to_le_bytes());
        let err = parse_land_mask(&bytes).unwrap_err();
        assert!(matches!(err, RoutingError::Load(_)));
    }
}
