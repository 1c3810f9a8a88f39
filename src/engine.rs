//! Solve façade (C9): the single entry point hosts talk to. Owns the
//! grid, land mask, and environment pack for a voyage's lifetime and
//! dispatches `solve()` to the A* or isochrone backend.
//!
//! Grounded in the teacher's `RoutingEngine` (`engine/mod.rs`), which
//! plays the same "owns mask + wind field + physics model, exposes one
//! `calculate_route`" role — generalized here to own a configurable
//! grid rather than a hardcoded whole-Earth one, and to dispatch between
//! two solvers instead of always running the isochrone router.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use log::info;

use crate::astar::{self, AStarRequest};
use crate::control::SolveControl;
use crate::data::{
    Diagnostics, EnvironmentSample, GeoPoint, GridDescriptor, RouteResponse, SafetyCaps, SolveMode,
    VesselModel,
};
use crate::environment::EnvironmentPack;
use crate::error::{Result, RoutingError};
use crate::geo;
use crate::grid::{self, CellIndex};
use crate::isochrone::{self, IsochroneRequest};
use crate::mask::{LandMask, LandMaskDescription};
use crate::postprocess::{self, PostprocessResult};
use crate::sampler::{EnvironmentSampler, SamplerSource};

/// Isochrone-specific knobs, split out from `SolveRequest` so A* requests
/// don't have to carry fields they never use.
#[derive(Debug, Clone, Copy)]
pub struct IsochroneTunables {
    pub time_step_minutes: f64,
    pub heading_count: usize,
    pub merge_radius_nm: f64,
    pub goal_radius_nm: f64,
    pub max_hours: f64,
    pub bearing_window_deg: f64,
    pub beam_width: usize,
    pub enable_adaptive_sampling: bool,
    pub min_time_step_minutes: f64,
    pub max_time_step_minutes: f64,
    pub complexity_threshold: f64,
    pub enable_hierarchical_routing: bool,
    pub long_route_threshold_nm: f64,
    pub coarse_grid_resolution_deg: f64,
    pub corridor_width_nm: f64,
}

impl Default for IsochroneTunables {
    fn default() -> Self {
        let defaults = IsochroneRequest::default();
        Self {
            time_step_minutes: defaults.time_step_minutes,
            heading_count: defaults.heading_count,
            merge_radius_nm: defaults.merge_radius_nm,
            goal_radius_nm: defaults.goal_radius_nm,
            max_hours: defaults.max_hours,
            bearing_window_deg: defaults.bearing_window_deg,
            beam_width: defaults.beam_width,
            enable_adaptive_sampling: defaults.enable_adaptive_sampling,
            min_time_step_minutes: defaults.min_time_step_minutes,
            max_time_step_minutes: defaults.max_time_step_minutes,
            complexity_threshold: defaults.complexity_threshold,
            enable_hierarchical_routing: defaults.enable_hierarchical_routing,
            long_route_threshold_nm: defaults.long_route_threshold_nm,
            coarse_grid_resolution_deg: defaults.coarse_grid_resolution_deg,
            corridor_width_nm: defaults.corridor_width_nm,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SolveRequest {
    pub mode: SolveMode,
    pub start: GeoPoint,
    pub destination: GeoPoint,
    pub depart_time_hours: f64,
    pub ship: VesselModel,
    pub safety_caps: SafetyCaps,
    pub isochrone: IsochroneTunables,
    pub simplify_tolerance_nm: f64,
    pub min_leg_nm: f64,
    pub min_heading_deg: f64,
    pub deadline: Option<Instant>,
    pub abort: Option<Arc<AtomicBool>>,
}

impl Default for SolveRequest {
    fn default() -> Self {
        Self {
            mode: SolveMode::AStar,
            start: GeoPoint::new(0.0, 0.0),
            destination: GeoPoint::new(0.0, 0.0),
            depart_time_hours: 0.0,
            ship: VesselModel::default(),
            safety_caps: SafetyCaps::default(),
            isochrone: IsochroneTunables::default(),
            simplify_tolerance_nm: 2.0,
            min_leg_nm: 0.0,
            min_heading_deg: 0.0,
            deadline: None,
            abort: None,
        }
    }
}

/// Owns a voyage's grid, land mask, and environment pack across
/// however many `solve()` calls a host makes against them.
pub struct Engine {
    grid: GridDescriptor,
    land_mask: LandMask,
    environment: EnvironmentPack,
}

impl Engine {
    /// `createEngine` (spec.md §6): validates the grid and starts with an
    /// unloaded land mask and a calm-sea environment pack.
    pub fn create(grid: GridDescriptor) -> Result<Self> {
        if !grid.is_valid() {
            return Err(RoutingError::Validation("grid descriptor has non-positive extent or spacing".into()));
        }
        Ok(Self { grid, land_mask: LandMask::empty(), environment: EnvironmentPack::empty(grid) })
    }

    pub fn grid(&self) -> &GridDescriptor {
        &self.grid
    }

    /// `loadLandMask`.
    pub fn load_land_mask(&mut self, bytes: &[u8]) -> Result<()> {
        self.land_mask = LandMask::load(bytes)?;
        Ok(())
    }

    /// `loadEnvironmentPack`. `depth` is accepted as a trailing optional
    /// parameter (an Open Question decision documented in SPEC_FULL.md).
    #[allow(clippy::too_many_arguments)]
    pub fn load_environment_pack(
        &mut self,
        cur_u: Vec<f32>,
        cur_v: Vec<f32>,
        wave_hs: Option<Vec<f32>>,
        mask_land: Option<Vec<u8>>,
        mask_shallow: Option<Vec<u8>>,
        depth: Option<Vec<f32>>,
    ) -> Result<()> {
        self.environment = EnvironmentPack::load(self.grid, cur_u, cur_v, wave_hs, mask_land, mask_shallow, depth)?;
        Ok(())
    }

    /// `solve`: runs the requested backend, then the shared
    /// post-processing pipeline (C8), producing a `RouteResponse`.
    pub fn solve(&self, request: &SolveRequest, external_sampler: Option<&(dyn EnvironmentSampler + Sync)>) -> Result<RouteResponse> {
        let ship = request.safety_caps.apply(&request.ship);
        if !ship.is_valid() {
            return Err(RoutingError::Validation("vessel model (after safety caps) is not internally consistent".into()));
        }

        info!("solve request: mode={:?} start={:?} destination={:?}", request.mode, request.start, request.destination);

        let sampler = SamplerSource::new(external_sampler, Some(&self.environment));
        let control = SolveControl::new(request.deadline, request.abort.clone());

        let (raw, diagnostics, is_coarse_route) = match request.mode {
            SolveMode::AStar => {
                let astar_request = AStarRequest {
                    start: request.start,
                    goal: request.destination,
                    depart_time_hours: request.depart_time_hours,
                };
                let result = astar::solve(&self.grid, &astar_request, &ship, &self.land_mask, &sampler, &control);
                (result.waypoints_raw, result.diagnostics, None)
            }
            SolveMode::Isochrone => {
                let iso = request.isochrone;
                let isochrone_request = IsochroneRequest {
                    start: request.start,
                    destination: request.destination,
                    depart_time_hours: request.depart_time_hours,
                    time_step_minutes: iso.time_step_minutes,
                    heading_count: iso.heading_count,
                    merge_radius_nm: iso.merge_radius_nm,
                    goal_radius_nm: iso.goal_radius_nm,
                    max_hours: iso.max_hours,
                    simplify_tolerance_nm: request.simplify_tolerance_nm,
                    min_leg_nm: request.min_leg_nm,
                    min_heading_deg: request.min_heading_deg,
                    bearing_window_deg: iso.bearing_window_deg,
                    beam_width: iso.beam_width,
                    enable_adaptive_sampling: iso.enable_adaptive_sampling,
                    min_time_step_minutes: iso.min_time_step_minutes,
                    max_time_step_minutes: iso.max_time_step_minutes,
                    complexity_threshold: iso.complexity_threshold,
                    enable_hierarchical_routing: iso.enable_hierarchical_routing,
                    long_route_threshold_nm: iso.long_route_threshold_nm,
                    coarse_grid_resolution_deg: iso.coarse_grid_resolution_deg,
                    corridor_width_nm: iso.corridor_width_nm,
                    ship: request.ship,
                    safety_caps: request.safety_caps,
                }
                .normalized();
                let result = isochrone::solve(&isochrone_request, &self.land_mask, &sampler, &control);
                (result.waypoints_raw, result.diagnostics, Some(result.is_coarse_route))
            }
        };

        let PostprocessResult { waypoints_raw, waypoints, index_map } = postprocess::postprocess(
            &raw,
            request.start,
            request.destination,
            request.simplify_tolerance_nm,
            request.min_leg_nm,
            request.min_heading_deg,
        );

        Ok(RouteResponse {
            mode: request.mode,
            waypoints,
            waypoints_raw,
            index_map,
            eta_hours: diagnostics.eta_hours,
            is_coarse_route,
            diagnostics,
        })
    }

    /// `sampleEnvironment`: exposes the same sampler chain `solve` uses,
    /// for hosts that want to probe conditions without routing.
    pub fn sample_environment(&self, p: GeoPoint, time_hours: f64, external_sampler: Option<&(dyn EnvironmentSampler + Sync)>) -> EnvironmentSample {
        SamplerSource::new(external_sampler, Some(&self.environment)).sample(p, time_hours)
    }

    /// `gridToLatLon`.
    pub fn grid_to_lat_lon(&self, cell: CellIndex) -> GeoPoint {
        grid::grid_to_lat_lon(&self.grid, cell)
    }

    /// `latLonToGrid`.
    pub fn lat_lon_to_grid(&self, p: GeoPoint) -> CellIndex {
        grid::lat_lon_to_grid(&self.grid, p)
    }

    /// `greatCircleDistance`, in nautical miles.
    pub fn great_circle_distance_nm(&self, a: GeoPoint, b: GeoPoint) -> f64 {
        geo::distance_nm(a, b)
    }

    /// `normalizeLongitude`.
    pub fn normalize_longitude(&self, lon: f64) -> f64 {
        geo::normalize_longitude(lon)
    }

    /// `crossesAntiMeridian`.
    pub fn crosses_anti_meridian(&self, lon1: f64, lon2: f64) -> bool {
        geo::crosses_antimeridian(lon1, lon2)
    }

    /// `getLandMaskData`: extent, resolution, and cells for host-side
    /// visualization.
    pub fn land_mask_data(&self) -> LandMaskDescription<'_> {
        self.land_mask.describe()
    }

    /// Current diagnostics helper used by hosts that want a no-op solve's
    /// shape (e.g. a UI preview) without running a search.
    pub fn empty_diagnostics(&self, depart_time_hours: f64) -> Diagnostics {
        Diagnostics {
            total_distance_nm: 0.0,
            average_speed_kts: 0.0,
            max_wave_height_m: 0.0,
            step_count: 0,
            frontier_count: 0,
            reached_goal: false,
            final_distance_to_goal_nm: 0.0,
            eta_hours: depart_time_hours,
            hazard_flags: 0,
            timed_out: false,
            sampler_failure: false,
        }
    }
}
