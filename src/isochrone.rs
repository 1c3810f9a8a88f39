//! Isochrone solver (C7): free-space successor expansion over discrete
//! headings, with merge-radius pruning, beam limiting, adaptive time
//! step, bearing-window pruning, and a hierarchical coarse-to-fine
//! corridor pass.
//!
//! Directly descended from the teacher's `IsochroneRouter::step`
//! (`engine/router.rs`): the per-state `rayon`-parallel heading fan-out
//! and the "bucket candidates, keep the best per bucket" density-pruning
//! idea survive verbatim in spirit. What's new relative to the teacher:
//! true merge-radius dominance (distance-based, not grid-bucket
//! equality) with the spec's tie-break order, bearing-window and
//! heading-cap pruning, beam limiting, adaptive time stepping, and the
//! hierarchical coarse/fine corridor pass — none of which the teacher's
//! debug-grade router implemented.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};

use log::{debug, info};
use rayon::prelude::*;

use crate::control::SolveControl;
use crate::data::{
    Diagnostics, GeoPoint, HazardFlags, SafetyCaps, SolveMode, VesselModel, Waypoint,
    HAZARD_LAND_TOUCH, HAZARD_SHALLOW, HAZARD_WAVE_CAP,
};
use crate::geo::{distance_nm, distance_to_polyline_nm, destination_point, heading_difference, initial_bearing_deg};
use crate::mask::LandMask;
use crate::sampler::SamplerSource;
use crate::vessel::ground_vector;

#[derive(Debug, Clone, Copy)]
pub struct IsochroneState {
    pub position: GeoPoint,
    pub time_hours: f64,
    pub heading_deg: f64,
    pub parent_index: i64,
    pub segment_distance_nm: f64,
    pub cumulative_distance_nm: f64,
    pub effective_speed_kts: f64,
    pub max_wave_height_m: f64,
    pub hazard_flags: HazardFlags,
}

#[derive(Debug, Clone)]
pub struct IsochroneRequest {
    pub start: GeoPoint,
    pub destination: GeoPoint,
    pub depart_time_hours: f64,
    pub time_step_minutes: f64,
    pub heading_count: usize,
    pub merge_radius_nm: f64,
    pub goal_radius_nm: f64,
    pub max_hours: f64,
    pub simplify_tolerance_nm: f64,
    pub min_leg_nm: f64,
    pub min_heading_deg: f64,
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
    pub ship: VesselModel,
    pub safety_caps: SafetyCaps,
}

impl Default for IsochroneRequest {
    fn default() -> Self {
        Self {
            start: GeoPoint::new(0.0, 0.0),
            destination: GeoPoint::new(0.0, 0.0),
            depart_time_hours: 0.0,
            time_step_minutes: 30.0,
            heading_count: 16,
            merge_radius_nm: 20.0,
            goal_radius_nm: 20.0,
            max_hours: 240.0,
            simplify_tolerance_nm: 2.0,
            min_leg_nm: 0.0,
            min_heading_deg: 0.0,
            bearing_window_deg: 120.0,
            beam_width: 0,
            enable_adaptive_sampling: false,
            min_time_step_minutes: 10.0,
            max_time_step_minutes: 60.0,
            complexity_threshold: 5.0,
            enable_hierarchical_routing: false,
            long_route_threshold_nm: 1500.0,
            coarse_grid_resolution_deg: 2.0,
            corridor_width_nm: 150.0,
            ship: VesselModel::default(),
            safety_caps: SafetyCaps::default(),
        }
    }
}

impl IsochroneRequest {
    /// Clamps every bounded field into the ranges spec.md §3 names.
    pub fn normalized(mut self) -> Self {
        self.time_step_minutes = self.time_step_minutes.clamp(1.0, 360.0);
        self.heading_count = self.heading_count.clamp(6, 72);
        self.merge_radius_nm = self.merge_radius_nm.clamp(5.0, 40.0);
        self.goal_radius_nm = self.goal_radius_nm.clamp(10.0, 60.0);
        self.max_hours = self.max_hours.clamp(12.0, 720.0);
        self.simplify_tolerance_nm = self.simplify_tolerance_nm.max(0.0);
        self.min_leg_nm = self.min_leg_nm.max(0.0);
        self.min_heading_deg = self.min_heading_deg.max(0.0);
        self.bearing_window_deg = self.bearing_window_deg.clamp(1e-6, 180.0);
        self
    }

    pub fn effective_ship(&self) -> VesselModel {
        self.safety_caps.apply(&self.ship)
    }
}

pub struct IsochroneResult {
    pub waypoints_raw: Vec<Waypoint>,
    pub diagnostics: Diagnostics,
    pub is_coarse_route: bool,
}

/// A local complexity score used to decide whether the adaptive time step
/// should shrink: rises with wave height and with nearness to a hazard.
fn local_complexity(sample: &crate::data::EnvironmentSample, ship: &VesselModel) -> f64 {
    let wave_term = sample.wave_height_m;
    let min_depth = ship.draft_m + ship.safety_depth_buffer_m;
    let shallow_term = if sample.depth_m < min_depth * 3.0 {
        ((min_depth * 3.0 - sample.depth_m) / min_depth.max(1.0)).max(0.0)
    } else {
        0.0
    };
    wave_term + shallow_term
}

fn effective_time_step_hours(
    request: &IsochroneRequest,
    sample: &crate::data::EnvironmentSample,
    ship: &VesselModel,
) -> f64 {
    let base_minutes = request.time_step_minutes;
    if !request.enable_adaptive_sampling {
        return base_minutes / 60.0;
    }
    let complexity = local_complexity(sample, ship);
    let minutes = if complexity > request.complexity_threshold {
        request.min_time_step_minutes
    } else {
        base_minutes.clamp(request.min_time_step_minutes, request.max_time_step_minutes)
    };
    minutes / 60.0
}

struct Expansion<'a> {
    request: &'a IsochroneRequest,
    ship: VesselModel,
    land_mask: &'a LandMask,
    sampler: &'a SamplerSource<'a>,
    corridor: Option<&'a [GeoPoint]>,
    /// Hazard bits observed on candidates rejected during expansion, so a
    /// layer with no survivors still reports why (spec.md §4.6: "on a
    /// hazard caused by sampling noise, set the corresponding bit in
    /// hazardFlags and reject").
    rejected_hazards: AtomicU8,
}

impl<'a> Expansion<'a> {
    fn expand_state(&self, parent_index: usize, state: &IsochroneState) -> Vec<IsochroneState> {
        let is_root = state.parent_index < 0;
        let bearing_to_goal = initial_bearing_deg(state.position, self.request.destination);

        let mut headings = Vec::with_capacity(self.request.heading_count);
        for k in 0..self.request.heading_count {
            let theta = (k as f64) * 360.0 / (self.request.heading_count as f64);
            if heading_difference(theta, bearing_to_goal) <= self.request.bearing_window_deg {
                headings.push(theta);
            }
        }

        let sample_here = self.sampler.sample(state.position, state.time_hours);
        let dt_hours = effective_time_step_hours(self.request, &sample_here, &self.ship);

        headings
            .into_iter()
            .filter_map(|theta| {
                if !is_root && heading_difference(state.heading_deg, theta) > self.ship.max_heading_change_deg {
                    return None;
                }

                let (ground_speed, cog) = ground_vector(
                    &self.ship,
                    theta,
                    sample_here.wave_height_m,
                    sample_here.current_east_kn,
                    sample_here.current_north_kn,
                );
                let distance_nm = ground_speed * dt_hours;
                let new_position = destination_point(state.position, cog, distance_nm);

                let mut hazards: HazardFlags = 0;
                if self.land_mask.segment_crosses_land(state.position, new_position, 1.0) {
                    hazards |= HAZARD_LAND_TOUCH;
                }
                if sample_here.wave_height_m > self.ship.max_wave_height_m {
                    hazards |= HAZARD_WAVE_CAP;
                }
                let dest_sample = self.sampler.sample(new_position, state.time_hours + dt_hours);
                if dest_sample.depth_m < self.ship.draft_m + self.ship.safety_depth_buffer_m {
                    hazards |= HAZARD_SHALLOW;
                }

                if let Some(corridor) = self.corridor {
                    if distance_to_polyline_nm(new_position, corridor) > self.request.corridor_width_nm {
                        return None;
                    }
                }

                if hazards & (HAZARD_LAND_TOUCH | HAZARD_WAVE_CAP | HAZARD_SHALLOW) != 0 {
                    self.rejected_hazards.fetch_or(hazards, Ordering::Relaxed);
                    return None;
                }

                Some(IsochroneState {
                    position: new_position,
                    time_hours: state.time_hours + dt_hours,
                    heading_deg: theta,
                    parent_index: parent_index as i64,
                    segment_distance_nm: distance_nm,
                    cumulative_distance_nm: state.cumulative_distance_nm + distance_nm,
                    effective_speed_kts: ground_speed,
                    max_wave_height_m: state.max_wave_height_m.max(sample_here.wave_height_m),
                    hazard_flags: state.hazard_flags | hazards,
                })
            })
            .collect()
    }
}

/// Merge-radius dominance pruning (spec.md §4.7 step 3): sorts candidates
/// by the dominance priority (smaller time, then smaller cumulative
/// distance, then smaller hazard popcount) and greedily keeps a candidate
/// only if no already-kept state lies within `merge_radius_nm`.
fn prune_merge_radius(mut candidates: Vec<IsochroneState>, merge_radius_nm: f64) -> Vec<IsochroneState> {
    candidates.sort_by(|a, b| {
        a.time_hours
            .partial_cmp(&b.time_hours)
            .unwrap()
            .then_with(|| a.cumulative_distance_nm.partial_cmp(&b.cumulative_distance_nm).unwrap())
            .then_with(|| a.hazard_flags.count_ones().cmp(&b.hazard_flags.count_ones()))
    });

    let bucket_deg = (merge_radius_nm / 60.0).max(1e-6);
    let mut buckets: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
    let mut kept: Vec<IsochroneState> = Vec::new();

    for cand in candidates {
        let lat_bucket = (cand.position.lat / bucket_deg).floor() as i64;
        let lon_scale = (cand.position.lat.to_radians().cos()).max(0.15);
        let lon_bucket_deg = bucket_deg / lon_scale;
        let lon_bucket = (cand.position.lon / lon_bucket_deg).floor() as i64;

        let mut dominated = false;
        'search: for dlat in -1..=1 {
            for dlon in -1..=1 {
                if let Some(idxs) = buckets.get(&(lat_bucket + dlat, lon_bucket + dlon)) {
                    for &idx in idxs {
                        if distance_nm(cand.position, kept[idx].position) <= merge_radius_nm {
                            dominated = true;
                            break 'search;
                        }
                    }
                }
            }
        }
        if dominated {
            continue;
        }
        let new_index = kept.len();
        buckets.entry((lat_bucket, lon_bucket)).or_default().push(new_index);
        kept.push(cand);
    }
    kept
}

fn beam_limit(mut layer: Vec<IsochroneState>, beam_width: usize, destination: GeoPoint, calm_speed_kts: f64) -> Vec<IsochroneState> {
    if beam_width == 0 || layer.len() <= beam_width {
        return layer;
    }
    let alpha = 1.0 / calm_speed_kts.max(1e-6);
    layer.sort_by(|a, b| {
        let sa = a.time_hours + alpha * distance_nm(a.position, destination);
        let sb = b.time_hours + alpha * distance_nm(b.position, destination);
        sa.partial_cmp(&sb).unwrap()
    });
    layer.truncate(beam_width);
    layer
}

struct RunOutcome {
    arena: Vec<IsochroneState>,
    layers: usize,
    best_arrival: Option<usize>,
    timed_out: bool,
    rejected_hazards: HazardFlags,
    /// Number of states in the final layer (spec.md §4.9's `frontierCount`
    /// for the isochrone solver), as opposed to `arena.len()`'s count of
    /// every state ever expanded.
    frontier_count: usize,
}

fn run_expansion(
    request: &IsochroneRequest,
    ship: &VesselModel,
    land_mask: &LandMask,
    sampler: &SamplerSource,
    control: &SolveControl,
    merge_radius_nm: f64,
    corridor: Option<&[GeoPoint]>,
) -> RunOutcome {
    let mut arena = vec![IsochroneState {
        position: request.start,
        time_hours: request.depart_time_hours,
        heading_deg: f64::NAN,
        parent_index: -1,
        segment_distance_nm: 0.0,
        cumulative_distance_nm: 0.0,
        effective_speed_kts: 0.0,
        max_wave_height_m: 0.0,
        hazard_flags: 0,
    }];
    let mut current_layer: Vec<usize> = vec![0];
    let expansion = Expansion { request, ship: *ship, land_mask, sampler, corridor, rejected_hazards: AtomicU8::new(0) };

    let mut best_arrival: Option<usize> = None;
    let mut layers = 0usize;
    let mut timed_out = false;
    let mut goal_layer_completing = false;
    let mut frontier_count = current_layer.len();

    while !current_layer.is_empty() {
        if arena[current_layer[0]].time_hours - request.depart_time_hours >= request.max_hours {
            break;
        }
        if control.should_stop() {
            timed_out = true;
            break;
        }

        let candidates: Vec<IsochroneState> = current_layer
            .par_iter()
            .flat_map_iter(|&idx| expansion.expand_state(idx, &arena[idx]))
            .collect();

        let pruned = prune_merge_radius(candidates, merge_radius_nm);
        let beamed = beam_limit(pruned, request.beam_width, request.destination, ship.calm_speed_kts);

        let mut next_layer = Vec::with_capacity(beamed.len());
        for state in beamed {
            let index = arena.len();
            let reached = distance_nm(state.position, request.destination) <= request.goal_radius_nm;
            arena.push(state);
            next_layer.push(index);
            if reached {
                let better = match best_arrival {
                    None => true,
                    Some(b) => arena[index].time_hours < arena[b].time_hours,
                };
                if better {
                    best_arrival = Some(index);
                }
                goal_layer_completing = true;
            }
        }

        layers += 1;
        frontier_count = next_layer.len();
        current_layer = next_layer;
        if goal_layer_completing {
            // Finish this layer (already done above), then stop per spec.md
            // §4.7 step 4: "continue that layer to completion; then terminate."
            break;
        }
    }

    let rejected_hazards = expansion.rejected_hazards.load(Ordering::Relaxed);
    RunOutcome { arena, layers, best_arrival, timed_out, rejected_hazards, frontier_count }
}

fn nearest_to_goal(arena: &[IsochroneState], destination: GeoPoint) -> usize {
    arena
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            distance_nm(a.position, destination)
                .partial_cmp(&distance_nm(b.position, destination))
                .unwrap()
        })
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn backtrack(arena: &[IsochroneState], from: usize) -> Vec<Waypoint> {
    let mut chain = Vec::new();
    let mut cursor = Some(from as i64);
    while let Some(idx) = cursor {
        if idx < 0 {
            break;
        }
        let state = arena[idx as usize];
        chain.push(Waypoint {
            lat: state.position.lat,
            lon: state.position.lon,
            time_hours: Some(state.time_hours),
            heading_deg: if state.heading_deg.is_nan() { None } else { Some(state.heading_deg) },
            is_course_change: None,
            max_wave_height_m: Some(state.max_wave_height_m),
            hazard_flags: Some(state.hazard_flags),
        });
        cursor = if state.parent_index < 0 { None } else { Some(state.parent_index) };
    }
    chain.reverse();
    chain
}

fn diagnostics_from(
    chain: &[Waypoint],
    layers: usize,
    frontier_count: usize,
    destination: GeoPoint,
    reached: bool,
    timed_out: bool,
    depart: f64,
    sampler_failure: bool,
    rejected_hazards: HazardFlags,
) -> Diagnostics {
    let total_distance_nm: f64 = chain
        .windows(2)
        .map(|pair| distance_nm(pair[0].position(), pair[1].position()))
        .sum();

    let max_wave = chain.iter().filter_map(|w| w.max_wave_height_m).fold(0.0f64, f64::max);
    let hazard_flags = chain.iter().filter_map(|w| w.hazard_flags).fold(rejected_hazards, |acc, f| acc | f);
    let eta_hours = chain.last().and_then(|w| w.time_hours).unwrap_or(depart);
    let elapsed = eta_hours - depart;
    let final_point = chain.last().map(|w| w.position()).unwrap_or(destination);

    Diagnostics {
        total_distance_nm,
        average_speed_kts: if elapsed > 0.0 { total_distance_nm / elapsed } else { 0.0 },
        max_wave_height_m: max_wave,
        step_count: layers,
        frontier_count,
        reached_goal: reached,
        final_distance_to_goal_nm: distance_nm(final_point, destination),
        eta_hours,
        hazard_flags,
        timed_out,
        sampler_failure,
    }
}

pub fn solve(
    request: &IsochroneRequest,
    land_mask: &LandMask,
    sampler: &SamplerSource,
    control: &SolveControl,
) -> IsochroneResult {
    let request = request.clone().normalized();
    let ship = request.effective_ship();
    info!(
        "isochrone solve: start={:?} destination={:?} heading_count={}",
        request.start, request.destination, request.heading_count
    );

    let gc_distance = distance_nm(request.start, request.destination);
    let want_hierarchical = request.enable_hierarchical_routing && gc_distance >= request.long_route_threshold_nm;

    if !want_hierarchical {
        let outcome = run_expansion(&request, &ship, land_mask, sampler, control, request.merge_radius_nm, None);
        return finish(&request, outcome, sampler, false);
    }

    // Coarse pass: merge radius proportional to the coarse cell diagonal
    // (spec.md §9: "merge radius ~= 0.6 * coarseCellDiagonalNm").
    let coarse_cell_diagonal_nm = {
        let d_lat = request.coarse_grid_resolution_deg;
        let mid_lat = (request.start.lat + request.destination.lat) / 2.0;
        let lon_term = (d_lat * mid_lat.to_radians().cos()).max(1e-6);
        (d_lat * d_lat + lon_term * lon_term).sqrt() * 60.0
    };
    let coarse_merge_radius = (0.6 * coarse_cell_diagonal_nm).clamp(5.0, 200.0);

    let coarse_outcome = run_expansion(&request, &ship, land_mask, sampler, control, coarse_merge_radius, None);
    let coarse_chain_index = coarse_outcome.best_arrival.unwrap_or_else(|| nearest_to_goal(&coarse_outcome.arena, request.destination));
    let coarse_chain = backtrack(&coarse_outcome.arena, coarse_chain_index);
    let coarse_reached = coarse_outcome.best_arrival.is_some();

    if !coarse_reached {
        debug!("hierarchical isochrone: coarse pass failed to reach the goal");
        return finish(&request, coarse_outcome, sampler, true);
    }

    let corridor: Vec<GeoPoint> = coarse_chain.iter().map(|w| w.position()).collect();
    let fine_outcome = run_expansion(&request, &ship, land_mask, sampler, control, request.merge_radius_nm, Some(&corridor));

    if fine_outcome.best_arrival.is_some() {
        finish(&request, fine_outcome, sampler, false)
    } else {
        debug!("hierarchical isochrone: fine pass failed, falling back to coarse route");
        finish(&request, coarse_outcome, sampler, true)
    }
}

fn finish(request: &IsochroneRequest, outcome: RunOutcome, sampler: &SamplerSource, is_coarse: bool) -> IsochroneResult {
    let reached = outcome.best_arrival.is_some();
    let chain_index = outcome.best_arrival.unwrap_or_else(|| nearest_to_goal(&outcome.arena, request.destination));
    let chain = backtrack(&outcome.arena, chain_index);
    let diagnostics = diagnostics_from(
        &chain,
        outcome.layers,
        outcome.frontier_count,
        request.destination,
        reached,
        outcome.timed_out,
        request.depart_time_hours,
        sampler.sampler_failed(),
        outcome.rejected_hazards,
    );
    debug!("isochrone solve done: layers={}, reached_goal={}, states={}", outcome.layers, reached, outcome.arena.len());
    IsochroneResult { waypoints_raw: chain, diagnostics, is_coarse_route: is_coarse }
}

pub const MODE: SolveMode = SolveMode::Isochrone;

#[cfg(test)]
mod tests {
    use super::*;

    fn calm_request(start: GeoPoint, destination: GeoPoint) -> IsochroneRequest {
        IsochroneRequest {
            start,
            destination,
            max_hours: 240.0,
            ..IsochroneRequest::default()
        }
    }

    #[test]
    fn reaches_goal_on_open_water() {
        let request = calm_request(GeoPoint::new(42.35, -70.90), GeoPoint::new(47.00, -8.00));
        let land_mask = LandMask::empty();
        let sampler = SamplerSource::new(None, None);
        let control = SolveControl::default();

        let result = solve(&request, &land_mask, &sampler, &control);
        assert!(result.diagnostics.reached_goal);
        assert!(result.waypoints_raw.len() >= 2);
        let expected_eta = distance_nm(request.start, request.destination) / request.ship.calm_speed_kts;
        assert!((result.diagnostics.eta_hours - expected_eta).abs() / expected_eta < 0.02 + 1e-9);
    }

    #[test]
    fn parent_chain_is_acyclic_and_time_increases() {
        let request = calm_request(GeoPoint::new(42.35, -70.90), GeoPoint::new(47.00, -8.00));
        let land_mask = LandMask::empty();
        let sampler = SamplerSource::new(None, None);
        let control = SolveControl::default();

        let outcome = run_expansion(&request, &request.effective_ship(), &land_mask, &sampler, &control, request.merge_radius_nm, None);
        for (idx, state) in outcome.arena.iter().enumerate() {
            if state.parent_index >= 0 {
                assert!((state.parent_index as usize) < idx);
                let parent = outcome.arena[state.parent_index as usize];
                assert!(state.time_hours > parent.time_hours);
                assert!(state.cumulative_distance_nm >= parent.cumulative_distance_nm);
            }
        }
    }

    #[test]
    fn merge_radius_dominance_holds_within_a_layer() {
        let request = calm_request(GeoPoint::new(42.35, -70.90), GeoPoint::new(47.00, -8.00));
        let land_mask = LandMask::empty();
        let sampler = SamplerSource::new(None, None);
        let control = SolveControl::default();

        let outcome = run_expansion(&request, &request.effective_ship(), &land_mask, &sampler, &control, request.merge_radius_nm, None);
        // Reconstruct the final layer: states whose time equals the max time.
        let max_time = outcome.arena.iter().map(|s| s.time_hours).fold(f64::MIN, f64::max);
        let last_layer: Vec<&IsochroneState> = outcome.arena.iter().filter(|s| (s.time_hours - max_time).abs() < 1e-9).collect();
        for i in 0..last_layer.len() {
            for j in (i + 1)..last_layer.len() {
                let d = distance_nm(last_layer[i].position, last_layer[j].position);
                assert!(d > request.merge_radius_nm - 1e-6, "states {i},{j} too close: {d}");
            }
        }
    }

    #[test]
    fn wave_cap_rejection_prevents_arrival() {
        let request = IsochroneRequest {
            ship: VesselModel { max_wave_height_m: 6.0, ..VesselModel::default() },
            max_hours: 48.0,
            ..calm_request(GeoPoint::new(42.0, -70.0), GeoPoint::new(43.0, -69.0))
        };
        let land_mask = LandMask::empty();
        // Sampler always reports 10m waves.
        let sampler_fn = |_p: GeoPoint, _t: f64| {
            Some(crate::data::EnvironmentSample { current_east_kn: 0.0, current_north_kn: 0.0, wave_height_m: 10.0, depth_m: 5000.0 })
        };
        let sampler = SamplerSource::new(Some(&sampler_fn), None);
        let control = SolveControl::default();

        let result = solve(&request, &land_mask, &sampler, &control);
        assert!(!result.diagnostics.reached_goal);
        assert_ne!(result.diagnostics.hazard_flags & HAZARD_WAVE_CAP, 0);
    }
}
