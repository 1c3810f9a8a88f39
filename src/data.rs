//! Core data model: geographic points, grids, vessel parameters, and the
//! request/response shapes exchanged with the solve façade.
//!
//! `Coordinate`/`WindData` in the teacher's `engine::models` are the direct
//! ancestors of `GeoPoint` and `EnvironmentSample` here; the rest (grid
//! descriptor, vessel model, requests/responses, hazard flags) are new,
//! built to the shapes spec.md §3 names.

use serde::{Deserialize, Serialize};

use crate::geo::normalize_longitude;

/// A geographic position. Longitudes are normalized to `[-180, 180)` on
/// construction, matching spec.md §3's ingress/egress rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat: lat.clamp(-90.0, 90.0),
            lon: normalize_longitude(lon),
        }
    }
}

/// Describes a regular lat/lon grid. Cell `(i, j)` is the point
/// `(lat0 + i*dLat, lon0 + j*dLon)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridDescriptor {
    pub lat0: f64,
    pub lat1: f64,
    pub lon0: f64,
    pub lon1: f64,
    pub d_lat: f64,
    pub d_lon: f64,
}

impl GridDescriptor {
    pub fn new(lat0: f64, lat1: f64, lon0: f64, lon1: f64, d_lat: f64, d_lon: f64) -> Self {
        Self { lat0, lat1, lon0, lon1, d_lat, d_lon }
    }

    pub fn rows(&self) -> usize {
        (((self.lat1 - self.lat0) / self.d_lat).round() as i64 + 1).max(0) as usize
    }

    pub fn cols(&self) -> usize {
        (((self.lon1 - self.lon0) / self.d_lon).round() as i64 + 1).max(0) as usize
    }

    pub fn is_valid(&self) -> bool {
        self.lat0 < self.lat1 && self.lon0 < self.lon1 && self.d_lat > 0.0 && self.d_lon > 0.0
    }
}

/// Effective ship parameters used for a single solve: ship's vessel model
/// with any provided safety caps overlaid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VesselModel {
    pub calm_speed_kts: f64,
    pub min_speed_kts: f64,
    pub max_wave_height_m: f64,
    pub max_heading_change_deg: f64,
    pub draft_m: f64,
    pub safety_depth_buffer_m: f64,
    pub wave_drag_coefficient: f64,
}

impl Default for VesselModel {
    fn default() -> Self {
        Self {
            calm_speed_kts: 14.0,
            min_speed_kts: 3.0,
            max_wave_height_m: 8.0,
            max_heading_change_deg: 30.0,
            draft_m: 5.0,
            safety_depth_buffer_m: 10.0,
            wave_drag_coefficient: 0.1,
        }
    }
}

impl VesselModel {
    pub fn is_valid(&self) -> bool {
        self.calm_speed_kts > self.min_speed_kts
            && self.min_speed_kts > 0.0
            && self.max_heading_change_deg > 0.0
            && self.max_heading_change_deg <= 180.0
            && (self.draft_m + self.safety_depth_buffer_m) > 0.0
    }
}

/// Optional overrides applied on top of a `VesselModel` for one solve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SafetyCaps {
    pub max_wave_height_m: Option<f64>,
    pub max_heading_change_deg: Option<f64>,
    pub min_water_depth_m: Option<f64>,
}

impl SafetyCaps {
    /// Overlays these caps on a ship's base vessel model, returning the
    /// effective model used by a solve. `min_water_depth_m` has no direct
    /// `VesselModel` field; callers compare depth against
    /// `draft_m + safety_depth_buffer_m`, so the cap is folded into
    /// `safety_depth_buffer_m` by raising it until that sum matches the cap.
    pub fn apply(&self, ship: &VesselModel) -> VesselModel {
        let mut effective = *ship;
        if let Some(wave) = self.max_wave_height_m {
            effective.max_wave_height_m = wave;
        }
        if let Some(heading) = self.max_heading_change_deg {
            effective.max_heading_change_deg = heading;
        }
        if let Some(min_depth) = self.min_water_depth_m {
            let required_buffer = min_depth - effective.draft_m;
            if required_buffer > effective.safety_depth_buffer_m {
                effective.safety_depth_buffer_m = required_buffer;
            }
        }
        effective
    }
}

/// Sampled environment at a point in space (and, nominally, time).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSample {
    pub current_east_kn: f64,
    pub current_north_kn: f64,
    pub wave_height_m: f64,
    pub depth_m: f64,
}

impl EnvironmentSample {
    /// A benign "calm sea, deep water" sample used when no pack is loaded.
    pub fn calm() -> Self {
        Self { current_east_kn: 0.0, current_north_kn: 0.0, wave_height_m: 1.0, depth_m: 5000.0 }
    }
}

/// Per-state hazard bitset. A plain `u8` rather than a `bitflags` crate —
/// four bits don't justify the dependency.
pub type HazardFlags = u8;

pub const HAZARD_LAND_TOUCH: HazardFlags = 1 << 0;
pub const HAZARD_SHALLOW: HazardFlags = 1 << 1;
pub const HAZARD_WAVE_CAP: HazardFlags = 1 << 2;
pub const HAZARD_HEADING_CAP: HazardFlags = 1 << 3;
pub const HAZARD_SAMPLER_FAILURE: HazardFlags = 1 << 4;

/// A single waypoint in a produced route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub lat: f64,
    pub lon: f64,
    pub time_hours: Option<f64>,
    pub heading_deg: Option<f64>,
    pub is_course_change: Option<bool>,
    pub max_wave_height_m: Option<f64>,
    pub hazard_flags: Option<HazardFlags>,
}

impl Waypoint {
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }

    pub fn from_point(p: GeoPoint, time_hours: f64) -> Self {
        Self {
            lat: p.lat,
            lon: p.lon,
            time_hours: Some(time_hours),
            heading_deg: None,
            is_course_change: None,
            max_wave_height_m: None,
            hazard_flags: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveMode {
    #[serde(rename = "ASTAR")]
    AStar,
    #[serde(rename = "ISOCHRONE")]
    Isochrone,
}

/// Diagnostics reported alongside every route response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub total_distance_nm: f64,
    pub average_speed_kts: f64,
    pub max_wave_height_m: f64,
    pub step_count: usize,
    pub frontier_count: usize,
    pub reached_goal: bool,
    pub final_distance_to_goal_nm: f64,
    pub eta_hours: f64,
    pub hazard_flags: HazardFlags,
    pub timed_out: bool,
    pub sampler_failure: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResponse {
    pub mode: SolveMode,
    pub waypoints: Vec<Waypoint>,
    pub waypoints_raw: Vec<Waypoint>,
    pub index_map: Vec<usize>,
    pub eta_hours: f64,
    pub is_coarse_route: Option<bool>,
    pub diagnostics: Diagnostics,
}
