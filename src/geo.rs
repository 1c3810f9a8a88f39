//! Great-circle geodesy on a spherical Earth.
//!
//! Grounded in the teacher's own hand-rolled bearing/distance/destination
//! helpers (`IsochroneRouter::calculate_{bearing,distance,destination}` in
//! the source project's `engine/router.rs`), generalized from meters to
//! nautical miles and extended with the longitude-wrapping helpers the
//! teacher never needed because its UI never crossed the antimeridian.

use crate::data::GeoPoint;

/// Mean Earth radius in nautical miles.
pub const EARTH_RADIUS_NM: f64 = 3440.065;

/// Great-circle distance between two points, in nautical miles.
pub fn distance_nm(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let sin_lat = (d_lat / 2.0).sin();
    let sin_lon = (d_lon / 2.0).sin();
    let h = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lon * sin_lon;
    let h = h.clamp(0.0, 1.0);
    2.0 * EARTH_RADIUS_NM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Initial bearing from `a` to `b`, degrees clockwise from true north, in [0, 360).
pub fn initial_bearing_deg(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let y = d_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();
    let theta = y.atan2(x).to_degrees();
    (theta + 360.0) % 360.0
}

/// Destination point from `origin`, travelling `distance_nm` along `bearing_deg`.
pub fn destination_point(origin: GeoPoint, bearing_deg: f64, distance_nm: f64) -> GeoPoint {
    let angular = distance_nm / EARTH_RADIUS_NM;
    let bearing = bearing_deg.to_radians();
    let lat1 = origin.lat.to_radians();
    let lon1 = origin.lon.to_radians();

    let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos()).asin();
    let lon2 = lon1
        + (bearing.sin() * angular.sin() * lat1.cos())
            .atan2(angular.cos() - lat1.sin() * lat2.sin());

    GeoPoint::new(lat2.to_degrees(), lon2.to_degrees())
}

/// Normalizes a longitude into `[-180, 180)`. Idempotent.
pub fn normalize_longitude(lon: f64) -> f64 {
    let wrapped = ((lon + 180.0).rem_euclid(360.0)) - 180.0;
    // rem_euclid can land exactly on -180.0 for inputs that are already
    // canonical; keep the half-open interval by nudging back into range.
    if wrapped < -180.0 { wrapped + 360.0 } else { wrapped }
}

/// True iff a segment between the two longitudes crosses the antimeridian,
/// i.e. the naive longitude delta is more than 180 degrees.
pub fn crosses_antimeridian(lon1: f64, lon2: f64) -> bool {
    (lon1 - lon2).abs() > 180.0
}

/// Smallest absolute angular difference between two headings, in `[0, 180]`.
pub fn heading_difference(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    if d > 180.0 { 360.0 - d } else { d }
}

/// Signed cross-track distance of `point` from the great-circle segment
/// `seg_start -> seg_end`, in nautical miles. Used by Douglas-Peucker
/// simplification (C8) and by the isochrone solver's corridor filter (C7).
pub fn cross_track_distance_nm(point: GeoPoint, seg_start: GeoPoint, seg_end: GeoPoint) -> f64 {
    let d13 = distance_nm(seg_start, point) / EARTH_RADIUS_NM;
    let theta13 = initial_bearing_deg(seg_start, point).to_radians();
    let theta12 = initial_bearing_deg(seg_start, seg_end).to_radians();
    (d13.sin() * (theta13 - theta12).sin()).asin() * EARTH_RADIUS_NM
}

/// Along-track distance from `seg_start` to the projection of `point` onto
/// the great-circle segment, in nautical miles. May fall outside
/// `[0, distance_nm(seg_start, seg_end)]` if the projection lies beyond
/// the segment's endpoints.
pub fn along_track_distance_nm(point: GeoPoint, seg_start: GeoPoint, seg_end: GeoPoint) -> f64 {
    let d13 = distance_nm(seg_start, point) / EARTH_RADIUS_NM;
    let xt = cross_track_distance_nm(point, seg_start, seg_end) / EARTH_RADIUS_NM;
    ((d13.cos() / xt.cos()).acos()) * EARTH_RADIUS_NM
}

/// Perpendicular distance from `point` to the nearest point on the
/// polyline `path`, in nautical miles. Falls back to endpoint distance
/// when the nearest projection lies beyond a segment's extent.
pub fn distance_to_polyline_nm(point: GeoPoint, path: &[GeoPoint]) -> f64 {
    if path.len() < 2 {
        return path.first().map(|p| distance_nm(point, *p)).unwrap_or(f64::MAX);
    }
    let mut best = f64::MAX;
    for seg in path.windows(2) {
        let seg_len = distance_nm(seg[0], seg[1]);
        if seg_len < 1e-9 {
            best = best.min(distance_nm(point, seg[0]));
            continue;
        }
        let along = along_track_distance_nm(point, seg[0], seg[1]);
        let d = if along < 0.0 {
            distance_nm(point, seg[0])
        } else if along > seg_len {
            distance_nm(point, seg[1])
        } else {
            cross_track_distance_nm(point, seg[0], seg[1]).abs()
        };
        best = best.min(d);
    }
    best
}
