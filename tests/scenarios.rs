//! End-to-end seed scenarios (spec.md §8), driven entirely through the
//! public `seapath::Engine` façade.

use seapath::{
    Engine, GeoPoint, GridDescriptor, HAZARD_SHALLOW, HAZARD_WAVE_CAP, SafetyCaps, SolveMode,
    SolveRequest, VesselModel,
};

fn world_grid() -> GridDescriptor {
    GridDescriptor::new(-80.0, 80.0, -180.0, 180.0, 0.5, 0.5)
}

fn calm_ship() -> VesselModel {
    VesselModel { calm_speed_kts: 14.0, min_speed_kts: 3.0, max_heading_change_deg: 90.0, ..VesselModel::default() }
}

/// Scenario 1: direct ocean crossing, no hazards, isochrone mode.
#[test]
fn direct_ocean_crossing_reaches_goal() {
    let engine = Engine::create(world_grid()).unwrap();
    let request = SolveRequest {
        mode: SolveMode::Isochrone,
        start: GeoPoint::new(42.35, -70.90),
        destination: GeoPoint::new(47.00, -8.00),
        depart_time_hours: 0.0,
        ship: calm_ship(),
        ..SolveRequest::default()
    };

    let response = engine.solve(&request, None).unwrap();
    assert!(response.waypoints.len() >= 2);
    assert!(response.diagnostics.reached_goal);

    let expected_eta = response.diagnostics.total_distance_nm / 14.0;
    let relative_error = (response.diagnostics.eta_hours - expected_eta).abs() / expected_eta;
    assert!(relative_error <= 0.02, "relative error {relative_error} too large");
}

/// Scenario 2: a land strip forces the route around it.
#[test]
fn land_blocker_is_routed_around() {
    let grid = world_grid();
    let rows = grid.rows();
    let cols = grid.cols();
    let mut cells = vec![0u8; rows * cols];
    for i in 0..rows {
        let lat = grid.lat0 + i as f64 * grid.d_lat;
        if (40.0..=44.0).contains(&lat) {
            for j in 0..cols {
                let lon = grid.lon0 + j as f64 * grid.d_lon;
                if (-60.0..=-55.0).contains(&lon) {
                    cells[i * cols + j] = 1;
                }
            }
        }
    }

    let mut engine = Engine::create(grid).unwrap();
    // Builds the on-disk layout so this test also exercises the binary
    // land mask pack path (C11), not just `LandMask::from_cells`.
    let bytes = seapath_io_bytes(&grid, &cells);
    engine.load_land_mask(&bytes).unwrap();

    let request = SolveRequest {
        mode: SolveMode::Isochrone,
        start: GeoPoint::new(42.35, -70.90),
        destination: GeoPoint::new(42.35, -20.0),
        ship: calm_ship(),
        ..SolveRequest::default()
    };
    let response = engine.solve(&request, None).unwrap();
    assert!(response.diagnostics.reached_goal);

    for pair in response.waypoints_raw.windows(2) {
        let mid_lat = (pair[0].lat + pair[1].lat) / 2.0;
        let mid_lon = (pair[0].lon + pair[1].lon) / 2.0;
        let inside_strip = (40.0..=44.0).contains(&mid_lat) && (-60.0..=-55.0).contains(&mid_lon);
        assert!(!inside_strip, "segment midpoint fell inside the forbidden rectangle");
    }
}

fn seapath_io_bytes(grid: &GridDescriptor, cells: &[u8]) -> Vec<u8> {
    // Mirrors `io::write_land_mask`'s layout without depending on a
    // non-public crate item: header is six little-endian f64s (grid
    // bounds and spacing) then two little-endian u32s (rows, cols), then
    // the cell bytes.
    let mut out = Vec::with_capacity(56 + cells.len());
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

/// Scenario 3: a uniform 10m wave field with a 6m cap rejects arrival.
#[test]
fn wave_cap_rejection_flags_hazard_and_fails_to_reach() {
    let engine = Engine::create(world_grid()).unwrap();
    let sampler = |_p: GeoPoint, _t: f64| {
        Some(seapath::EnvironmentSample { current_east_kn: 0.0, current_north_kn: 0.0, wave_height_m: 10.0, depth_m: 5000.0 })
    };
    let request = SolveRequest {
        mode: SolveMode::Isochrone,
        start: GeoPoint::new(10.0, 10.0),
        destination: GeoPoint::new(12.0, 12.0),
        safety_caps: SafetyCaps { max_wave_height_m: Some(6.0), ..SafetyCaps::default() },
        ship: calm_ship(),
        ..SolveRequest::default()
    };
    let response = engine.solve(&request, Some(&sampler)).unwrap();
    assert!(!response.diagnostics.reached_goal);
    assert_ne!(response.diagnostics.hazard_flags & HAZARD_WAVE_CAP, 0);
}

/// Scenario 4: an 8m-deep field with a 5m draft + 10m buffer cap rejects arrival.
#[test]
fn depth_cap_rejection_flags_shallow_hazard() {
    let engine = Engine::create(world_grid()).unwrap();
    let sampler = |_p: GeoPoint, _t: f64| {
        Some(seapath::EnvironmentSample { current_east_kn: 0.0, current_north_kn: 0.0, wave_height_m: 1.0, depth_m: 8.0 })
    };
    let request = SolveRequest {
        mode: SolveMode::Isochrone,
        start: GeoPoint::new(10.0, 10.0),
        destination: GeoPoint::new(12.0, 12.0),
        ship: VesselModel { draft_m: 5.0, safety_depth_buffer_m: 10.0, ..calm_ship() },
        ..SolveRequest::default()
    };
    let response = engine.solve(&request, Some(&sampler)).unwrap();
    assert!(!response.diagnostics.reached_goal);
    assert_ne!(response.diagnostics.hazard_flags & HAZARD_SHALLOW, 0);
}

/// Scenario 5: A* and isochrone agree to within 15% on open water.
#[test]
fn astar_and_isochrone_parity_on_open_water() {
    let grid = GridDescriptor::new(-80.0, 80.0, -180.0, 180.0, 0.5, 0.5);
    let engine = Engine::create(grid).unwrap();

    let isochrone_request = SolveRequest {
        mode: SolveMode::Isochrone,
        start: GeoPoint::new(42.35, -70.90),
        destination: GeoPoint::new(47.00, -8.00),
        ship: calm_ship(),
        ..SolveRequest::default()
    };
    let astar_request = SolveRequest { mode: SolveMode::AStar, ..isochrone_request.clone() };

    let isochrone_response = engine.solve(&isochrone_request, None).unwrap();
    let astar_response = engine.solve(&astar_request, None).unwrap();

    assert!(isochrone_response.diagnostics.reached_goal);
    assert!(astar_response.diagnostics.reached_goal);

    let relative_gap = (astar_response.diagnostics.eta_hours - isochrone_response.diagnostics.eta_hours).abs()
        / isochrone_response.diagnostics.eta_hours;
    assert!(relative_gap <= 0.15, "relative ETA gap {relative_gap} exceeds 15%");
}

/// Scenario 6: a route crossing the antimeridian.
#[test]
fn antimeridian_crossing_produces_a_coherent_polyline() {
    let engine = Engine::create(world_grid()).unwrap();
    let request = SolveRequest {
        mode: SolveMode::Isochrone,
        start: GeoPoint::new(0.0, 170.0),
        destination: GeoPoint::new(0.0, -170.0),
        ship: calm_ship(),
        ..SolveRequest::default()
    };
    let response = engine.solve(&request, None).unwrap();
    assert!(response.diagnostics.reached_goal);

    for pair in response.waypoints_raw.windows(2) {
        let delta = (pair[0].lon - pair[1].lon).abs();
        let wrapped = if delta > 180.0 { 360.0 - delta } else { delta };
        assert!(wrapped <= 180.0 + 1e-6);
    }

    let expected_eta = 20.0 * 60.0 / 14.0;
    let relative_error = (response.diagnostics.eta_hours - expected_eta).abs() / expected_eta;
    assert!(relative_error <= 0.02, "relative error {relative_error} too large");
}
