//! `seapath`: a weather- and ocean-aware maritime voyage routing engine.
//!
//! Two solve backends share one façade (`engine::Engine`): a
//! time-dependent A* search over a fixed lat/lon grid (`astar`), and a
//! free-space isochrone expansion over discrete headings (`isochrone`).
//! Both consume the same land mask (`mask`), environment pack
//! (`environment`), vessel model (`vessel`), and external sampler hook
//! (`sampler`), and both produce routes through the same post-processing
//! pipeline (`postprocess`).

pub mod astar;
pub mod control;
pub mod data;
pub mod engine;
pub mod environment;
pub mod error;
pub mod geo;
pub mod grid;
pub mod io;
pub mod isochrone;
pub mod mask;
pub mod postprocess;
pub mod sampler;
pub mod vessel;

pub use data::{
    Diagnostics, EnvironmentSample, GeoPoint, GridDescriptor, HazardFlags, RouteResponse,
    SafetyCaps, SolveMode, VesselModel, Waypoint, HAZARD_HEADING_CAP, HAZARD_LAND_TOUCH,
    HAZARD_SAMPLER_FAILURE, HAZARD_SHALLOW, HAZARD_WAVE_CAP,
};
pub use engine::{Engine, IsochroneTunables, SolveRequest};
pub use error::{Result, RoutingError};
pub use sampler::EnvironmentSampler;
