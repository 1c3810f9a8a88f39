//! Time-dependent A* solver (C6): 8-connected search on the routing grid
//! with environment-aware edge cost.
//!
//! The teacher has no grid search at all (its router works in free space,
//! see `isochrone.rs`); this module's shape — binary heap keyed by
//! f-cost, closed set keyed by cell, parent-chain backtrack — follows the
//! generic weighted-graph A* sketched by `evefrontier-lib`'s
//! `routing::planner::AStarPlanner`
//! (`examples/other_examples/…evefrontier-lib…routing-mod.rs.rs`), with
//! edge cost and rejection rules specific to spec.md §4.6.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use log::{debug, info};

use crate::control::SolveControl;
use crate::data::{Diagnostics, GeoPoint, GridDescriptor, HazardFlags, SolveMode, VesselModel, Waypoint,
    HAZARD_LAND_TOUCH, HAZARD_SHALLOW, HAZARD_WAVE_CAP};
use crate::geo::{distance_nm, heading_difference, initial_bearing_deg};
use crate::grid::{grid_to_lat_lon, in_bounds, lat_lon_to_grid, CellIndex};
use crate::mask::LandMask;
use crate::sampler::SamplerSource;
use crate::vessel::ground_vector;

const CANCEL_CHECK_INTERVAL: usize = 1024;

/// One node in the A* search arena.
#[derive(Debug, Clone, Copy)]
pub struct AStarNode {
    pub i: usize,
    pub j: usize,
    pub time_hours: f64,
    pub g_cost: f64,
    pub f_cost: f64,
    pub parent: Option<usize>,
    pub heading_into_deg: Option<f64>,
}

pub struct AStarRequest {
    pub start: GeoPoint,
    pub goal: GeoPoint,
    pub depart_time_hours: f64,
}

pub struct AStarResult {
    pub waypoints_raw: Vec<Waypoint>,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct HeapEntry {
    f_cost: f64,
    g_cost: f64,
    node_index: usize,
}

impl Eq for HeapEntry {}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; invert f_cost so the smallest f_cost
        // pops first. Ties broken by larger g_cost (more goal-directed).
        other
            .f_cost
            .partial_cmp(&self.f_cost)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.g_cost.partial_cmp(&other.g_cost).unwrap_or(Ordering::Equal))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

const NEIGHBOR_OFFSETS: [(i64, i64); 8] =
    [(-1, -1), (-1, 0), (-1, 1), (0, -1), (0, 1), (1, -1), (1, 0), (1, 1)];

/// Rejects an edge per spec.md §4.6 step 6, returning the hazard bit that
/// caused rejection (if any) so callers can accumulate diagnostics even
/// when the edge is ultimately allowed through (hazard flags are set on
/// any brush, not only on rejection, mirroring isochrone's behavior).
fn edge_hazards(
    land_mask: &LandMask,
    ship: &VesselModel,
    from: GeoPoint,
    to: GeoPoint,
    wave_from: f64,
    wave_to: f64,
    depth_to: f64,
) -> HazardFlags {
    let mut flags = 0;
    if land_mask.segment_crosses_land(from, to, 1.0) {
        flags |= HAZARD_LAND_TOUCH;
    }
    if wave_from > ship.max_wave_height_m || wave_to > ship.max_wave_height_m {
        flags |= HAZARD_WAVE_CAP;
    }
    if depth_to < ship.draft_m + ship.safety_depth_buffer_m {
        flags |= HAZARD_SHALLOW;
    }
    flags
}

pub fn solve(
    grid: &GridDescriptor,
    request: &AStarRequest,
    ship: &VesselModel,
    land_mask: &LandMask,
    sampler: &SamplerSource,
    control: &SolveControl,
) -> AStarResult {
    info!("A* solve: start={:?} goal={:?}", request.start, request.goal);

    let start_cell = lat_lon_to_grid(grid, request.start);
    let goal_cell = lat_lon_to_grid(grid, request.goal);

    let mut arena: Vec<AStarNode> = Vec::new();
    let mut best_g: HashMap<(usize, usize), f64> = HashMap::new();
    let mut closed: std::collections::HashSet<(usize, usize)> = std::collections::HashSet::new();
    let mut heap: BinaryHeap<HeapEntry> = BinaryHeap::new();
    let mut hazard_flags_total: HazardFlags = 0;
    let mut max_wave_seen = 0.0f64;
    let mut popped = 0usize;
    let mut timed_out = false;

    let h0 = distance_nm(request.start, request.goal) / ship.calm_speed_kts;
    arena.push(AStarNode {
        i: start_cell.i,
        j: start_cell.j,
        time_hours: request.depart_time_hours,
        g_cost: 0.0,
        f_cost: h0,
        parent: None,
        heading_into_deg: None,
    });
    best_g.insert((start_cell.i, start_cell.j), 0.0);
    heap.push(HeapEntry { f_cost: h0, g_cost: 0.0, node_index: 0 });

    let mut goal_index: Option<usize> = None;

    while let Some(entry) = heap.pop() {
        popped += 1;
        if popped % CANCEL_CHECK_INTERVAL == 0 && control.should_stop() {
            timed_out = true;
            break;
        }

        let node = arena[entry.node_index];
        let key = (node.i, node.j);
        if closed.contains(&key) {
            continue;
        }
        closed.insert(key);

        if key == (goal_cell.i, goal_cell.j) {
            goal_index = Some(entry.node_index);
            break;
        }

        let from_point = grid_to_lat_lon(grid, CellIndex { i: node.i, j: node.j });

        for (di, dj) in NEIGHBOR_OFFSETS {
            let ni = node.i as i64 + di;
            let nj = node.j as i64 + dj;
            if ni < 0 || nj < 0 {
                continue;
            }
            let neighbor_cell = CellIndex { i: ni as usize, j: nj as usize };
            if !in_bounds(grid, neighbor_cell) {
                continue;
            }
            if closed.contains(&(neighbor_cell.i, neighbor_cell.j)) {
                continue;
            }

            let to_point = grid_to_lat_lon(grid, neighbor_cell);
            let midpoint = GeoPoint::new((from_point.lat + to_point.lat) / 2.0, (from_point.lon + to_point.lon) / 2.0);
            let mid_sample = sampler.sample(midpoint, node.time_hours);
            let edge_distance_nm = distance_nm(from_point, to_point);
            if edge_distance_nm <= 0.0 {
                continue;
            }
            let bearing = initial_bearing_deg(from_point, to_point);

            if let Some(prev_heading) = node.heading_into_deg {
                if heading_difference(prev_heading, bearing) > ship.max_heading_change_deg {
                    continue;
                }
            }

            let (ground_speed, _cog) = ground_vector(
                ship,
                bearing,
                mid_sample.wave_height_m,
                mid_sample.current_east_kn,
                mid_sample.current_north_kn,
            );

            let to_sample = sampler.sample(to_point, node.time_hours);
            let hazards = edge_hazards(
                land_mask,
                ship,
                from_point,
                to_point,
                mid_sample.wave_height_m,
                to_sample.wave_height_m,
                to_sample.depth_m,
            );
            if hazards != 0 {
                hazard_flags_total |= hazards;
                continue;
            }
            max_wave_seen = max_wave_seen.max(mid_sample.wave_height_m).max(to_sample.wave_height_m);

            let edge_cost_hours = edge_distance_nm / ground_speed;
            let tentative_g = node.g_cost + edge_cost_hours;

            let better = best_g
                .get(&(neighbor_cell.i, neighbor_cell.j))
                .map(|&g| tentative_g < g)
                .unwrap_or(true);
            if !better {
                continue;
            }
            best_g.insert((neighbor_cell.i, neighbor_cell.j), tentative_g);

            let h = distance_nm(to_point, request.goal) / ship.calm_speed_kts;
            let f_cost = tentative_g + h;
            let index = arena.len();
            arena.push(AStarNode {
                i: neighbor_cell.i,
                j: neighbor_cell.j,
                time_hours: request.depart_time_hours + tentative_g,
                g_cost: tentative_g,
                f_cost,
                parent: Some(entry.node_index),
                heading_into_deg: Some(bearing),
            });
            heap.push(HeapEntry { f_cost, g_cost: tentative_g, node_index: index });
        }
    }

    let reached_goal = goal_index.is_some();
    let chain_end = goal_index.unwrap_or_else(|| {
        // No path: report the closed node nearest the goal, if any were
        // expanded at all, else just the start.
        arena
            .iter()
            .enumerate()
            .filter(|(_, n)| closed.contains(&(n.i, n.j)))
            .min_by(|(_, a), (_, b)| {
                let da = distance_nm(grid_to_lat_lon(grid, CellIndex { i: a.i, j: a.j }), request.goal);
                let db = distance_nm(grid_to_lat_lon(grid, CellIndex { i: b.i, j: b.j }), request.goal);
                da.partial_cmp(&db).unwrap_or(Ordering::Equal)
            })
            .map(|(idx, _)| idx)
            .unwrap_or(0)
    });

    let mut chain_indices = Vec::new();
    let mut cursor = Some(chain_end);
    while let Some(idx) = cursor {
        chain_indices.push(idx);
        cursor = arena[idx].parent;
    }
    chain_indices.reverse();

    let mut waypoints_raw = Vec::with_capacity(chain_indices.len());
    for idx in &chain_indices {
        let node = arena[*idx];
        let p = grid_to_lat_lon(grid, CellIndex { i: node.i, j: node.j });
        waypoints_raw.push(Waypoint {
            lat: p.lat,
            lon: p.lon,
            time_hours: Some(node.time_hours),
            heading_deg: node.heading_into_deg,
            is_course_change: None,
            max_wave_height_m: None,
            hazard_flags: None,
        });
    }

    let total_distance_nm: f64 = waypoints_raw
        .windows(2)
        .map(|w| distance_nm(w[0].position(), w[1].position()))
        .sum();
    let final_node = arena[chain_end];
    let final_point = grid_to_lat_lon(grid, CellIndex { i: final_node.i, j: final_node.j });
    let final_distance_to_goal_nm = distance_nm(final_point, request.goal);
    let eta_hours = final_node.time_hours;
    let elapsed = eta_hours - request.depart_time_hours;

    debug!("A* solve done: popped={popped}, reached_goal={reached_goal}, eta={eta_hours}");

    AStarResult {
        waypoints_raw,
        diagnostics: Diagnostics {
            total_distance_nm,
            average_speed_kts: if elapsed > 0.0 { total_distance_nm / elapsed } else { 0.0 },
            max_wave_height_m: max_wave_seen,
            step_count: popped,
            frontier_count: heap.len(),
            reached_goal,
            final_distance_to_goal_nm,
            eta_hours,
            hazard_flags: hazard_flags_total,
            timed_out,
            sampler_failure: sampler.sampler_failed(),
        },
    }
}

pub const MODE: SolveMode = SolveMode::AStar;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::GridDescriptor;

    fn open_grid() -> GridDescriptor {
        GridDescriptor::new(-10.0, 10.0, -10.0, 10.0, 0.5, 0.5)
    }

    #[test]
    fn reaches_goal_on_open_water() {
        let grid = open_grid();
        let ship = VesselModel::default();
        let land_mask = LandMask::empty();
        let sampler = SamplerSource::new(None, None);
        let control = SolveControl::default();
        let request = AStarRequest { start: GeoPoint::new(0.0, 0.0), goal: GeoPoint::new(2.0, 2.0), depart_time_hours: 0.0 };

        let result = solve(&grid, &request, &ship, &land_mask, &sampler, &control);
        assert!(result.diagnostics.reached_goal);
        assert!(result.waypoints_raw.len() >= 2);

        let start_cell = lat_lon_to_grid(&grid, request.start);
        let goal_cell = lat_lon_to_grid(&grid, request.goal);
        let first = lat_lon_to_grid(&grid, result.waypoints_raw.first().unwrap().position());
        let last = lat_lon_to_grid(&grid, result.waypoints_raw.last().unwrap().position());
        assert_eq!(first, start_cell);
        assert_eq!(last, goal_cell);

        for w in result.waypoints_raw.windows(2) {
            let a = lat_lon_to_grid(&grid, w[0].position());
            let b = lat_lon_to_grid(&grid, w[1].position());
            let di = (a.i as i64 - b.i as i64).abs();
            let dj = (a.j as i64 - b.j as i64).abs();
            assert!(di <= 1 && dj <= 1 && (di != 0 || dj != 0));
        }
    }

    #[test]
    fn eta_equals_depart_plus_gcost() {
        let grid = open_grid();
        let ship = VesselModel::default();
        let land_mask = LandMask::empty();
        let sampler = SamplerSource::new(None, None);
        let control = SolveControl::default();
        let request = AStarRequest { start: GeoPoint::new(0.0, 0.0), goal: GeoPoint::new(1.0, 1.0), depart_time_hours: 5.0 };

        let result = solve(&grid, &request, &ship, &land_mask, &sampler, &control);
        let last = result.waypoints_raw.last().unwrap();
        assert!((last.time_hours.unwrap() - result.diagnostics.eta_hours).abs() < 1e-9);
        assert!(result.diagnostics.eta_hours >= request.depart_time_hours);
    }

    #[test]
    fn no_path_reports_unreached_goal() {
        // Land mask covering the entire grid: nothing is reachable.
        let grid = open_grid();
        let rows = grid.rows();
        let cols = grid.cols();
        let land_mask = LandMask::from_cells(grid, vec![1u8; rows * cols]);
        let ship = VesselModel::default();
        let sampler = SamplerSource::new(None, None);
        let control = SolveControl::default();
        let request = AStarRequest { start: GeoPoint::new(0.0, 0.0), goal: GeoPoint::new(2.0, 2.0), depart_time_hours: 0.0 };

        let result = solve(&grid, &request, &ship, &land_mask, &sampler, &control);
        assert!(!result.diagnostics.reached_goal);
    }
}
