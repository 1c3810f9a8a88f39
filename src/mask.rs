//! Land mask (C3).
//!
//! The teacher's `LandMask` (`engine::mask::LandMask`) wraps a fixed
//! whole-Earth `RoaringTreemap` with a hardcoded 1/240-degree affine
//! transform (`coords_to_indices`); this version keeps its `is_land`
//! query and "load once, query many" shape but ties the mask to the same
//! `GridDescriptor` every other component uses, stored as a dense
//! `Vec<u8>` (spec.md §3's on-disk layout is already dense, so there is
//! nothing for a sparse bitmap to compress away once the grid is bounded).

use log::{info, warn};

use crate::data::GeoPoint;
use crate::data::GridDescriptor;
use crate::geo::distance_nm;
use crate::grid::lat_lon_to_fractional;
use crate::io;

#[derive(Debug, Clone)]
pub struct LandMask {
    loaded: bool,
    grid: GridDescriptor,
    rows: usize,
    cols: usize,
    cells: Vec<u8>,
}

impl Default for LandMask {
    fn default() -> Self {
        Self::empty()
    }
}

impl LandMask {
    /// An unloaded mask: `is_land` always answers false, matching spec.md
    /// §4.3's "access after a failed load behaves as 'no mask loaded'".
    pub fn empty() -> Self {
        Self {
            loaded: false,
            grid: GridDescriptor::new(-1.0, 1.0, -1.0, 1.0, 1.0, 1.0),
            rows: 0,
            cols: 0,
            cells: Vec::new(),
        }
    }

    /// Parses the bit-exact binary layout of spec.md §3.
    pub fn load(bytes: &[u8]) -> Result<Self, crate::error::RoutingError> {
        info!("loading land mask raster ({} bytes)", bytes.len());
        let parsed = io::parse_land_mask(bytes)?;
        info!("land mask loaded: {} rows x {} cols", parsed.rows, parsed.cols);
        Ok(Self { loaded: true, grid: parsed.grid, rows: parsed.rows, cols: parsed.cols, cells: parsed.cells })
    }

    /// Builds a mask directly from a grid and cell bytes (used by tests
    /// and by hosts constructing masks in memory rather than from bytes).
    pub fn from_cells(grid: GridDescriptor, cells: Vec<u8>) -> Self {
        let rows = grid.rows();
        let cols = grid.cols();
        debug_assert_eq!(cells.len(), rows * cols);
        Self { loaded: true, grid, rows, cols, cells }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// True iff the nearest cell to `p` is marked land. Out-of-bounds
    /// queries (or queries against an unloaded mask) answer false: open
    /// water is assumed outside the mask's coverage.
    pub fn is_land(&self, p: GeoPoint) -> bool {
        if !self.loaded {
            return false;
        }
        let f = lat_lon_to_fractional(&self.grid, p);
        let i = f.i.round() as usize;
        let j = f.j.round() as usize;
        if i >= self.rows || j >= self.cols {
            return false;
        }
        self.cells[i * self.cols + j] != 0
    }

    /// Samples the great-circle segment between `a` and `b` at `step_nm`
    /// intervals (minimum 2 samples) and reports whether any sample lands
    /// on a land cell.
    pub fn segment_crosses_land(&self, a: GeoPoint, b: GeoPoint, step_nm: f64) -> bool {
        if !self.loaded {
            return false;
        }
        let total = distance_nm(a, b);
        let step = step_nm.max(1e-6);
        let samples = ((total / step).ceil() as usize + 1).max(2);
        for k in 0..=samples {
            let t = k as f64 / samples as f64;
            let p = GeoPoint::new(a.lat + (b.lat - a.lat) * t, a.lon + (b.lon - a.lon) * t);
            if self.is_land(p) {
                return true;
            }
        }
        false
    }

    /// Extent, resolution, and a reference to the cells, for visualization
    /// export by the host.
    pub fn describe(&self) -> LandMaskDescription<'_> {
        LandMaskDescription {
            loaded: self.loaded,
            grid: self.grid,
            rows: self.rows,
            cols: self.cols,
            cells: &self.cells,
        }
    }
}

pub struct LandMaskDescription<'a> {
    pub loaded: bool,
    pub grid: GridDescriptor,
    pub rows: usize,
    pub cols: usize,
    pub cells: &'a [u8],
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip_mask() -> LandMask {
        // 40..44N, -60..-55W land strip on a coarse test grid.
        let grid = GridDescriptor::new(30.0, 50.0, -70.0, -50.0, 1.0, 1.0);
        let rows = grid.rows();
        let cols = grid.cols();
        let mut cells = vec![0u8; rows * cols];
        for i in 0..rows {
            let lat = grid.lat0 + i as f64 * grid.d_lat;
            if lat >= 40.0 && lat <= 44.0 {
                for j in 0..cols {
                    let lon = grid.lon0 + j as f64 * grid.d_lon;
                    if lon >= -60.0 && lon <= -55.0 {
                        cells[i * cols + j] = 1;
                    }
                }
            }
        }
        LandMask::from_cells(grid, cells)
    }

    #[test]
    fn unloaded_mask_never_reports_land() {
        let mask = LandMask::empty();
        assert!(!mask.is_land(GeoPoint::new(42.0, -58.0)));
    }

    #[test]
    fn land_cell_detected() {
        let mask = strip_mask();
        assert!(mask.is_land(GeoPoint::new(42.0, -58.0)));
        assert!(!mask.is_land(GeoPoint::new(10.0, -30.0)));
    }

    #[test]
    fn segment_crosses_land_is_symmetric() {
        let mask = strip_mask();
        let a = GeoPoint::new(38.0, -58.0);
        let b = GeoPoint::new(46.0, -58.0);
        assert_eq!(mask.segment_crosses_land(a, b, 20.0), mask.segment_crosses_land(b, a, 20.0));
        assert!(mask.segment_crosses_land(a, b, 20.0));
    }

    #[test]
    fn segment_over_open_water_does_not_cross_land() {
        let mask = strip_mask();
        let a = GeoPoint::new(10.0, -30.0);
        let b = GeoPoint::new(12.0, -30.0);
        assert!(!mask.segment_crosses_land(a, b, 20.0));
    }

    #[test]
    fn malformed_bytes_is_load_error() {
        let err = LandMask::load(&[1, 2, 3]).unwrap_err();
        match err {
            crate::error::RoutingError::Load(_) => {}
            _ => panic!("expected Load error"),
        }
        warn!("malformed mask correctly rejected");
    }
}
