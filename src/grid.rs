//! Lat/lon <-> grid index conversions (C2).

use crate::data::{GeoPoint, GridDescriptor};

/// Integer cell index, clamped to `[0, rows)` x `[0, cols)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellIndex {
    pub i: usize,
    pub j: usize,
}

/// Fractional index used internally by bilinear samplers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FractionalIndex {
    pub i: f64,
    pub j: f64,
}

pub fn lat_lon_to_fractional(grid: &GridDescriptor, p: GeoPoint) -> FractionalIndex {
    let fi = (p.lat - grid.lat0) / grid.d_lat;
    let fj = (p.lon - grid.lon0) / grid.d_lon;
    let max_i = (grid.rows().max(1) - 1) as f64;
    let max_j = (grid.cols().max(1) - 1) as f64;
    FractionalIndex { i: fi.clamp(0.0, max_i), j: fj.clamp(0.0, max_j) }
}

/// Nearest in-bounds cell for a geographic point, clamping out-of-bounds
/// input to the nearest valid cell.
pub fn lat_lon_to_grid(grid: &GridDescriptor, p: GeoPoint) -> CellIndex {
    let f = lat_lon_to_fractional(grid, p);
    CellIndex { i: f.i.round() as usize, j: f.j.round() as usize }
}

/// Cell-center point for an in-bounds index. Indices outside the grid are
/// clamped first.
pub fn grid_to_lat_lon(grid: &GridDescriptor, cell: CellIndex) -> GeoPoint {
    let max_i = grid.rows().max(1) - 1;
    let max_j = grid.cols().max(1) - 1;
    let i = cell.i.min(max_i);
    let j = cell.j.min(max_j);
    GeoPoint::new(grid.lat0 + i as f64 * grid.d_lat, grid.lon0 + j as f64 * grid.d_lon)
}

pub fn in_bounds(grid: &GridDescriptor, cell: CellIndex) -> bool {
    cell.i < grid.rows() && cell.j < grid.cols()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn grid() -> GridDescriptor {
        GridDescriptor::new(-80.0, 80.0, -180.0, 180.0, 0.5, 0.5)
    }

    #[test]
    fn round_trip_in_bounds() {
        let g = grid();
        for (i, j) in [(0usize, 0usize), (10, 20), (320, 720)] {
            let p = grid_to_lat_lon(&g, CellIndex { i, j });
            let back = lat_lon_to_grid(&g, p);
            assert_eq!(back, CellIndex { i, j });
        }
    }

    #[test]
    fn out_of_bounds_clamps() {
        let g = grid();
        let far = GeoPoint::new(89.0, 179.9999);
        let cell = lat_lon_to_grid(&g, far);
        assert!(in_bounds(&g, cell));
        assert_eq!(cell.i, g.rows() - 1);
    }

    proptest! {
        #[test]
        fn round_trip_prop(i in 0usize..321, j in 0usize..721) {
            let g = grid();
            let p = grid_to_lat_lon(&g, CellIndex { i, j });
            let back = lat_lon_to_grid(&g, p);
            prop_assert_eq!(back, CellIndex { i, j });
        }
    }
}
