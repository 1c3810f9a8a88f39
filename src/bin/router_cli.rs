//! Debug CLI (C13): solves one voyage from the command line and prints a
//! summary plus the waypoint table.
//!
//! Grounded in the teacher's own `src/bin/router_cli.rs` debugger (a
//! hardcoded start/destination, a step loop, `println!` progress) —
//! generalized here to take its parameters from flags or a `--config`
//! TOML file instead of hardcoded constants, clap-derive style borrowed
//! from the pack's own CLI binaries.

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use clap::Parser;
use log::info;
use serde::Deserialize;

use seapath::{Engine, GeoPoint, GridDescriptor, SafetyCaps, SolveMode, SolveRequest, VesselModel};

/// Solve a single voyage and print its route.
#[derive(Parser, Debug, Default, Deserialize)]
#[command(name = "router_cli", version, about)]
struct Cli {
    /// TOML file providing any of the below fields; CLI flags override it.
    #[arg(long)]
    #[serde(skip)]
    config: Option<PathBuf>,

    #[arg(long, allow_hyphen_values = true)]
    start_lat: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    start_lon: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    dest_lat: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    dest_lon: Option<f64>,

    /// Departure time as an RFC3339 timestamp. Defaults to the current time.
    #[arg(long)]
    depart: Option<String>,

    #[arg(long, value_enum)]
    mode: Option<CliSolveMode>,

    #[arg(long)]
    calm_speed_kts: Option<f64>,
    #[arg(long)]
    max_wave_height_m: Option<f64>,
    #[arg(long)]
    max_heading_change_deg: Option<f64>,
    #[arg(long)]
    draft_m: Option<f64>,

    /// Land mask raster, in spec.md §3's binary layout.
    #[arg(long)]
    land_mask: Option<PathBuf>,

    /// Grid bounds: lat0,lat1,lon0,lon1,dLat,dLon.
    #[arg(long, value_delimiter = ',')]
    grid: Option<Vec<f64>>,

    /// Print the full `RouteResponse` as JSON instead of the summary table.
    #[arg(long)]
    #[serde(skip)]
    json: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum CliSolveMode {
    Astar,
    Isochrone,
}

impl Cli {
    fn merged_with_config(mut self) -> Self {
        let Some(path) = self.config.clone() else { return self };
        let text = match fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) => {
                eprintln!("warning: could not read config {}: {e}", path.display());
                return self;
            }
        };
        let from_file: Cli = match toml::from_str(&text) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("warning: could not parse config {}: {e}", path.display());
                return self;
            }
        };
        macro_rules! fill {
            ($field:ident) => {
                if self.$field.is_none() {
                    self.$field = from_file.$field;
                }
            };
        }
        fill!(start_lat);
        fill!(start_lon);
        fill!(dest_lat);
        fill!(dest_lon);
        fill!(depart);
        fill!(mode);
        fill!(calm_speed_kts);
        fill!(max_wave_height_m);
        fill!(max_heading_change_deg);
        fill!(draft_m);
        fill!(land_mask);
        fill!(grid);
        self
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse().merged_with_config();

    let start = GeoPoint::new(cli.start_lat.unwrap_or(48.0), cli.start_lon.unwrap_or(-5.0));
    let destination = GeoPoint::new(cli.dest_lat.unwrap_or(40.0), cli.dest_lon.unwrap_or(-10.0));

    let depart_time_hours = cli
        .depart
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .map(hours_since_epoch)
        .unwrap_or(0.0);

    let grid_bounds = cli.grid.clone().unwrap_or_else(|| vec![25.0, 55.0, -20.0, 5.0, 0.5, 0.5]);
    let grid = GridDescriptor::new(grid_bounds[0], grid_bounds[1], grid_bounds[2], grid_bounds[3], grid_bounds[4], grid_bounds[5]);

    let mut engine = match Engine::create(grid) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    if let Some(path) = &cli.land_mask {
        match fs::read(path).map_err(|e| e.to_string()).and_then(|bytes| engine.load_land_mask(&bytes).map_err(|e| e.to_string())) {
            Ok(()) => info!("land mask loaded from {}", path.display()),
            Err(e) => eprintln!("warning: could not load land mask: {e}"),
        }
    }

    let ship = VesselModel {
        calm_speed_kts: cli.calm_speed_kts.unwrap_or(VesselModel::default().calm_speed_kts),
        draft_m: cli.draft_m.unwrap_or(VesselModel::default().draft_m),
        ..VesselModel::default()
    };
    let safety_caps = SafetyCaps {
        max_wave_height_m: cli.max_wave_height_m,
        max_heading_change_deg: cli.max_heading_change_deg,
        ..SafetyCaps::default()
    };

    let mode = match cli.mode {
        Some(CliSolveMode::Isochrone) => SolveMode::Isochrone,
        _ => SolveMode::AStar,
    };

    let abort = Arc::new(AtomicBool::new(false));
    let request = SolveRequest {
        mode,
        start,
        destination,
        depart_time_hours,
        ship,
        safety_caps,
        deadline: Some(Instant::now() + Duration::from_secs(30)),
        abort: Some(abort),
        ..SolveRequest::default()
    };

    if !cli.json {
        println!("--- seapath router CLI ---");
        println!("start:       {:.4}, {:.4}", start.lat, start.lon);
        println!("destination: {:.4}, {:.4}", destination.lat, destination.lon);
        println!("mode:        {:?}", mode);
    }

    let solve_start = Instant::now();
    match engine.solve(&request, None) {
        Ok(response) => {
            if cli.json {
                match serde_json::to_string_pretty(&response) {
                    Ok(text) => println!("{text}"),
                    Err(e) => {
                        eprintln!("error: could not serialize response: {e}");
                        std::process::exit(1);
                    }
                }
                return;
            }
            println!("solved in {:?}", solve_start.elapsed());
            println!("reached goal: {}", response.diagnostics.reached_goal);
            println!("eta (hours from depart): {:.2}", response.diagnostics.eta_hours - depart_time_hours);
            println!("total distance: {:.1} nm", response.diagnostics.total_distance_nm);
            println!("waypoints ({}):", response.waypoints.len());
            for w in &response.waypoints {
                println!(
                    "  {:>8.4}, {:>9.4}  t={:>7.2}h  course_change={}",
                    w.lat,
                    w.lon,
                    w.time_hours.unwrap_or(depart_time_hours),
                    w.is_course_change.unwrap_or(false)
                );
            }
        }
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}

fn hours_since_epoch(dt: DateTime<Utc>) -> f64 {
    dt.timestamp() as f64 / 3600.0
}
