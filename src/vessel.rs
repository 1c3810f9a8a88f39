//! Vessel model and safety caps (C5): the speed-through-water and
//! ground-speed model used by both solvers.
//!
//! Grounded in the teacher's `PhysicsModel::compute_vector`
//! (`engine/physics.rs`): heading unit vector plus current vector, then
//! magnitude/course from the sum. The teacher looks boat speed up in a
//! sail-polar table (`PolarData::get_speed(tws, twa)`); spec.md §1
//! explicitly excludes polar plotting, so speed-through-water here is the
//! linear wave-drag placeholder of spec.md §4.5, kept behind a narrow
//! function so a future polar model can replace it without touching
//! callers (spec.md §9 Open Questions).

use crate::data::VesselModel;

/// Speed through water given calm-water speed and significant wave height.
pub fn speed_through_water(ship: &VesselModel, wave_height_m: f64) -> f64 {
    (ship.calm_speed_kts - ship.wave_drag_coefficient * wave_height_m).max(ship.min_speed_kts)
}

/// Ground-speed vector: boat's through-water velocity (on heading `theta`,
/// degrees clockwise from north) plus the current vector, in knots.
/// Returns `(ground_speed_kts, course_over_ground_deg)`.
pub fn ground_vector(
    ship: &VesselModel,
    heading_deg: f64,
    wave_height_m: f64,
    current_east_kn: f64,
    current_north_kn: f64,
) -> (f64, f64) {
    let stw = speed_through_water(ship, wave_height_m);
    let heading_rad = heading_deg.to_radians();
    let vx = stw * heading_rad.sin() + current_east_kn;
    let vy = stw * heading_rad.cos() + current_north_kn;

    let speed = (vx * vx + vy * vy).sqrt().max(ship.min_speed_kts);
    let mut course = vx.atan2(vy).to_degrees();
    if course < 0.0 {
        course += 360.0;
    }
    (speed, course)
}
