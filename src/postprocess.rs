//! Route post-processing (C8): endpoint attachment, Douglas-Peucker
//! simplification, minimum-leg and minimum-heading-change filtering, and
//! course-change marking.
//!
//! The teacher has no simplification step at all — its UI draws every
//! raw isochrone waypoint. This module is grounded in the generic
//! Douglas-Peucker sketch in `other_examples/` geometry helpers,
//! adapted to use the spherical `distance_to_polyline_nm`/
//! `cross_track_distance_nm` primitives from `geo.rs` instead of planar
//! ones, since every distance here is a great-circle distance.

use crate::data::{GeoPoint, Waypoint};
use crate::geo::{crosses_antimeridian, distance_nm, distance_to_polyline_nm, heading_difference, initial_bearing_deg};

/// Distance below which a route endpoint is considered already attached
/// to the requested start/destination (about 50 meters).
const ENDPOINT_EPSILON_NM: f64 = 0.027;

/// Below this heading delta a vertex isn't considered a course change.
const COURSE_CHANGE_EPSILON_DEG: f64 = 1.0;

pub struct PostprocessResult {
    /// The raw trajectory, with the requested start/destination attached
    /// if the solver's own endpoints weren't already within
    /// `ENDPOINT_EPSILON_NM` of them.
    pub waypoints_raw: Vec<Waypoint>,
    /// The simplified, filtered route actually shown to the caller.
    pub waypoints: Vec<Waypoint>,
    /// `index_map[k]` is the index into `waypoints_raw` that
    /// `waypoints[k]` came from. Strictly increasing.
    pub index_map: Vec<usize>,
}

/// Prepends/appends `start`/`destination` to `raw` if the solver's own
/// endpoints aren't already within epsilon of them. Idempotent: running
/// this twice on its own output is a no-op.
fn attach_endpoints(raw: &[Waypoint], start: GeoPoint, destination: GeoPoint) -> Vec<Waypoint> {
    let mut out = Vec::with_capacity(raw.len() + 2);
    let needs_start = raw.first().map(|w| distance_nm(w.position(), start) > ENDPOINT_EPSILON_NM).unwrap_or(true);
    if needs_start {
        out.push(Waypoint::from_point(start, raw.first().and_then(|w| w.time_hours).unwrap_or(0.0)));
    }
    out.extend_from_slice(raw);
    let needs_end = out.last().map(|w| distance_nm(w.position(), destination) > ENDPOINT_EPSILON_NM).unwrap_or(true);
    if needs_end {
        out.push(Waypoint::from_point(destination, out.last().and_then(|w| w.time_hours).unwrap_or(0.0)));
    }
    out
}

/// Splits any raw leg whose longitude delta exceeds 180 degrees at the
/// antimeridian (spec.md §4.1), inserting a `+180`/`-180` vertex pair so a
/// caller drawing `waypoints_raw` as a straight-line polyline never gets a
/// single segment that wraps the globe. The two inserted vertices share the
/// same interpolated latitude and time; their longitudes are left
/// un-normalized (`180.0` exactly, not wrapped to `-180.0`) so each half of
/// the split still has a small, correctly-signed longitude delta.
fn split_antimeridian_crossings(points: Vec<Waypoint>) -> Vec<Waypoint> {
    if points.len() < 2 {
        return points;
    }
    let mut out = Vec::with_capacity(points.len());
    out.push(points[0]);
    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if crosses_antimeridian(a.lon, b.lon) {
            let near = if a.lon > 0.0 { 180.0 } else { -180.0 };
            let far = -near;
            let b_unwrapped = b.lon + 2.0 * near;
            let t = (near - a.lon) / (b_unwrapped - a.lon);
            let lat = a.lat + (b.lat - a.lat) * t;
            let time_hours = match (a.time_hours, b.time_hours) {
                (Some(ta), Some(tb)) => Some(ta + (tb - ta) * t),
                (Some(ta), None) => Some(ta),
                (None, Some(tb)) => Some(tb),
                (None, None) => None,
            };
            out.push(Waypoint { lat, lon: near, time_hours, heading_deg: None, is_course_change: None, max_wave_height_m: None, hazard_flags: None });
            out.push(Waypoint { lat, lon: far, time_hours, heading_deg: None, is_course_change: None, max_wave_height_m: None, hazard_flags: None });
        }
        out.push(b);
    }
    out
}

/// Recursive Douglas-Peucker over `(waypoint, raw_index)` pairs, using
/// great-circle perpendicular distance as the deviation metric.
fn douglas_peucker(points: &[(Waypoint, usize)], tolerance_nm: f64) -> Vec<(Waypoint, usize)> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let chord = [points[0].0.position(), points[points.len() - 1].0.position()];
    let mut worst_distance = 0.0;
    let mut worst_index = 0;
    for (i, (wp, _)) in points.iter().enumerate().take(points.len() - 1).skip(1) {
        let d = distance_to_polyline_nm(wp.position(), &chord);
        if d > worst_distance {
            worst_distance = d;
            worst_index = i;
        }
    }

    if worst_distance > tolerance_nm {
        let mut left = douglas_peucker(&points[..=worst_index], tolerance_nm);
        let right = douglas_peucker(&points[worst_index..], tolerance_nm);
        left.pop();
        left.extend(right);
        left
    } else {
        vec![points[0], points[points.len() - 1]]
    }
}

/// Drops interior points whose distance from the last *kept* point falls
/// below `min_leg_nm`. Always keeps the first and last point.
fn apply_min_leg(points: Vec<(Waypoint, usize)>, min_leg_nm: f64) -> Vec<(Waypoint, usize)> {
    if points.len() <= 2 || min_leg_nm <= 0.0 {
        return points;
    }
    let mut kept = vec![points[0]];
    for &(wp, idx) in &points[1..points.len() - 1] {
        let last = kept.last().unwrap().0.position();
        if distance_nm(last, wp.position()) >= min_leg_nm {
            kept.push((wp, idx));
        }
    }
    kept.push(points[points.len() - 1]);
    kept
}

/// Drops interior points whose heading change (relative to the last kept
/// point and the following point) falls below `min_heading_deg`.
fn apply_min_heading(points: Vec<(Waypoint, usize)>, min_heading_deg: f64) -> Vec<(Waypoint, usize)> {
    if points.len() <= 2 || min_heading_deg <= 0.0 {
        return points;
    }
    let mut kept = vec![points[0]];
    for i in 1..points.len() - 1 {
        let prev = kept.last().unwrap().0.position();
        let curr = points[i].0.position();
        let next = points[i + 1].0.position();
        let bearing_in = initial_bearing_deg(prev, curr);
        let bearing_out = initial_bearing_deg(curr, next);
        if heading_difference(bearing_in, bearing_out) >= min_heading_deg {
            kept.push(points[i]);
        }
    }
    kept.push(points[points.len() - 1]);
    kept
}

/// Marks each interior point's `is_course_change` flag, comparing the
/// bearing of the leg into it against the bearing of the leg out of it.
fn mark_course_changes(points: &mut [(Waypoint, usize)]) {
    let len = points.len();
    if len < 3 {
        for (wp, _) in points.iter_mut() {
            wp.is_course_change = Some(false);
        }
        return;
    }
    for i in 0..len {
        let is_change = if i == 0 || i == len - 1 {
            false
        } else {
            let prev = points[i - 1].0.position();
            let curr = points[i].0.position();
            let next = points[i + 1].0.position();
            let bearing_in = initial_bearing_deg(prev, curr);
            let bearing_out = initial_bearing_deg(curr, next);
            heading_difference(bearing_in, bearing_out) > COURSE_CHANGE_EPSILON_DEG
        };
        points[i].0.is_course_change = Some(is_change);
    }
}

/// Runs the full post-processing pipeline (spec.md §4.8): endpoint
/// attachment, then Douglas-Peucker simplification, then the minimum-leg
/// and minimum-heading-change filters, then course-change marking.
pub fn postprocess(
    raw: &[Waypoint],
    start: GeoPoint,
    destination: GeoPoint,
    simplify_tolerance_nm: f64,
    min_leg_nm: f64,
    min_heading_deg: f64,
) -> PostprocessResult {
    let waypoints_raw = split_antimeridian_crossings(attach_endpoints(raw, start, destination));
    let indexed: Vec<(Waypoint, usize)> = waypoints_raw.iter().copied().enumerate().map(|(i, w)| (w, i)).collect();

    let simplified = douglas_peucker(&indexed, simplify_tolerance_nm.max(0.0));
    let leg_filtered = apply_min_leg(simplified, min_leg_nm.max(0.0));
    let mut final_points = apply_min_heading(leg_filtered, min_heading_deg.max(0.0));
    mark_course_changes(&mut final_points);

    let waypoints = final_points.iter().map(|(w, _)| *w).collect();
    let index_map = final_points.iter().map(|(_, idx)| *idx).collect();

    PostprocessResult { waypoints_raw, waypoints, index_map }
}
