//! Environment pack (C4): gridded current/wave/depth planes, bilinearly
//! sampled at any lat/lon.
//!
//! The teacher has no grid pack at all — its `WindField` is a hash of
//! 1-degree chunks answering nearest-neighbor only (`get_wind_at`). This
//! module keeps that "sample a dense field at a point" idea but
//! generalizes it to the spec's bilinear interpolation over a shared
//! `GridDescriptor`, matching C2/C3.

use log::info;

use crate::data::{EnvironmentSample, GeoPoint, GridDescriptor};
use crate::error::RoutingError;
use crate::grid::lat_lon_to_fractional;

pub const DEFAULT_WAVE_HEIGHT_M: f64 = 1.0;
pub const DEFAULT_DEPTH_M: f64 = 5000.0;
pub const SHALLOW_DEPTH_M: f64 = 5.0;

#[derive(Debug, Clone)]
pub struct EnvironmentPack {
    grid: GridDescriptor,
    rows: usize,
    cols: usize,
    cur_u: Vec<f32>,
    cur_v: Vec<f32>,
    wave_hs: Option<Vec<f32>>,
    depth: Option<Vec<f32>>,
    mask_land: Option<Vec<u8>>,
    #[allow(dead_code)]
    mask_shallow: Option<Vec<u8>>,
}

impl EnvironmentPack {
    /// Loads the four (two mandatory, two optional) float32 planes plus
    /// the two optional byte masks. Every present plane/mask must have
    /// exactly `rows*cols` entries.
    pub fn load(
        grid: GridDescriptor,
        cur_u: Vec<f32>,
        cur_v: Vec<f32>,
        wave_hs: Option<Vec<f32>>,
        mask_land: Option<Vec<u8>>,
        mask_shallow: Option<Vec<u8>>,
        depth: Option<Vec<f32>>,
    ) -> Result<Self, RoutingError> {
        let rows = grid.rows();
        let cols = grid.cols();
        let n = rows * cols;

        let check = |name: &str, len: usize| -> Result<(), RoutingError> {
            if len != n {
                Err(RoutingError::Load(format!(
                    "plane '{name}' has {len} entries, expected {n} ({rows}x{cols})"
                )))
            } else {
                Ok(())
            }
        };
        check("cur_u", cur_u.len())?;
        check("cur_v", cur_v.len())?;
        if let Some(ref p) = wave_hs { check("wave_hs", p.len())?; }
        if let Some(ref p) = depth { check("depth", p.len())?; }
        if let Some(ref p) = mask_land { check("mask_land", p.len())?; }
        if let Some(ref p) = mask_shallow { check("mask_shallow", p.len())?; }

        info!("environment pack loaded: {rows}x{cols}, wave_hs={}, depth={}", wave_hs.is_some(), depth.is_some());
        Ok(Self { grid, rows, cols, cur_u, cur_v, wave_hs, depth, mask_land, mask_shallow })
    }

    /// An empty pack: currents zero everywhere, default wave height and
    /// depth everywhere. Used when no pack has been loaded.
    pub fn empty(grid: GridDescriptor) -> Self {
        let n = grid.rows() * grid.cols();
        Self {
            grid,
            rows: grid.rows(),
            cols: grid.cols(),
            cur_u: vec![0.0; n],
            cur_v: vec![0.0; n],
            wave_hs: None,
            depth: None,
            mask_land: None,
            mask_shallow: None,
        }
    }

    fn bilinear(&self, plane: &[f32], i_f: f64, j_f: f64) -> f64 {
        let i0 = i_f.floor() as usize;
        let j0 = j_f.floor() as usize;
        let i1 = (i0 + 1).min(self.rows - 1);
        let j1 = (j0 + 1).min(self.cols - 1);
        let ti = i_f - i0 as f64;
        let tj = j_f - j0 as f64;

        let at = |i: usize, j: usize| plane[i * self.cols + j] as f64;

        let v00 = at(i0, j0);
        let v01 = at(i0, j1);
        let v10 = at(i1, j0);
        let v11 = at(i1, j1);

        let v0 = v00 * (1.0 - tj) + v01 * tj;
        let v1 = v10 * (1.0 - tj) + v11 * tj;
        v0 * (1.0 - ti) + v1 * ti
    }

    fn is_land_at(&self, i_f: f64, j_f: f64) -> bool {
        match &self.mask_land {
            None => false,
            Some(mask) => {
                let i = i_f.round() as usize;
                let j = j_f.round() as usize;
                if i >= self.rows || j >= self.cols {
                    false
                } else {
                    mask[i * self.cols + j] != 0
                }
            }
        }
    }

    /// Bilinearly samples every plane at `(lat, lon)`, clamping
    /// out-of-bounds queries to the nearest edge cell. `_time_hours` is a
    /// hook for future forecast packs; the pack is time-invariant today.
    pub fn sample(&self, p: GeoPoint, _time_hours: f64) -> EnvironmentSample {
        if self.rows == 0 || self.cols == 0 {
            return EnvironmentSample::calm();
        }
        let f = lat_lon_to_fractional(&self.grid, p);

        let wave_height_m = match &self.wave_hs {
            Some(plane) => self.bilinear(plane, f.i, f.j),
            None => DEFAULT_WAVE_HEIGHT_M,
        };

        let depth_m = match &self.depth {
            Some(plane) => self.bilinear(plane, f.i, f.j),
            None if self.is_land_at(f.i, f.j) => SHALLOW_DEPTH_M,
            None => DEFAULT_DEPTH_M,
        };

        EnvironmentSample {
            current_east_kn: self.bilinear(&self.cur_u, f.i, f.j),
            current_north_kn: self.bilinear(&self.cur_v, f.i, f.j),
            wave_height_m,
            depth_m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid() -> GridDescriptor {
        GridDescriptor::new(0.0, 2.0, 0.0, 2.0, 1.0, 1.0)
    }

    #[test]
    fn sample_at_cell_center_equals_cell_value() {
        let g = grid();
        // 3x3 grid, cur_u ramps with column index.
        let cur_u = vec![0.0, 1.0, 2.0, 0.0, 1.0, 2.0, 0.0, 1.0, 2.0];
        let cur_v = vec![0.0; 9];
        let pack = EnvironmentPack::load(g, cur_u, cur_v, None, None, None, None).unwrap();
        let sample = pack.sample(GeoPoint::new(1.0, 1.0), 0.0);
        assert_relative_eq!(sample.current_east_kn, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn sample_is_continuous() {
        let g = grid();
        let cur_u = vec![0.0, 1.0, 2.0, 0.0, 1.0, 2.0, 0.0, 1.0, 2.0];
        let cur_v = vec![0.0; 9];
        let pack = EnvironmentPack::load(g, cur_u, cur_v, None, None, None, None).unwrap();
        let a = pack.sample(GeoPoint::new(1.0, 1.0), 0.0);
        let b = pack.sample(GeoPoint::new(1.0, 1.0 + 1e-6), 0.0);
        assert!((a.current_east_kn - b.current_east_kn).abs() < 1e-4);
    }

    #[test]
    fn missing_wave_and_depth_use_defaults() {
        let g = grid();
        let pack = EnvironmentPack::load(g, vec![0.0; 9], vec![0.0; 9], None, None, None, None).unwrap();
        let sample = pack.sample(GeoPoint::new(1.0, 1.0), 0.0);
        assert_eq!(sample.wave_height_m, DEFAULT_WAVE_HEIGHT_M);
        assert_eq!(sample.depth_m, DEFAULT_DEPTH_M);
    }

    #[test]
    fn mismatched_plane_size_is_load_error() {
        let g = grid();
        let err = EnvironmentPack::load(g, vec![0.0; 9], vec![0.0; 3], None, None, None, None).unwrap_err();
        assert!(matches!(err, RoutingError::Load(_)));
    }

    #[test]
    fn out_of_bounds_clamps_to_edge() {
        let g = grid();
        let pack = EnvironmentPack::load(g, vec![0.0; 9], vec![0.0; 9], None, None, None, None).unwrap();
        let edge = pack.sample(GeoPoint::new(1.0, 1.0), 0.0);
        let beyond = pack.sample(GeoPoint::new(50.0, 50.0), 0.0);
        // Both clamp into the same grid; beyond should equal the corner cell.
        let corner = pack.sample(GeoPoint::new(2.0, 2.0), 0.0);
        assert_eq!(beyond.current_east_kn, corner.current_east_kn);
        let _ = edge;
    }
}
