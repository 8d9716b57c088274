//! Downloaded rides are kept as raw device images, one file per ride,
//! so they can be replayed into any tool that speaks the wire format.

use crate::error::NewtonError;
use crate::ride::NewtonRide;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// File name for a ride: `powerpod.<ISO8601-local-seconds>-<km>km.raw`.
pub fn ride_filename(ride: &NewtonRide) -> String {
    let start = ride
        .start_time
        .as_datetime()
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string())
        .unwrap_or_else(|| "unknown-time".to_string());
    format!(
        "powerpod.{}-{:.1}km.raw",
        start,
        ride.distance_metres() / 1000.0
    )
}

/// Write `ride` under `dir`, returning the path written.
pub fn save_ride(dir: &Path, ride: &NewtonRide) -> Result<PathBuf, NewtonError> {
    let path = dir.join(ride_filename(ride));
    fs::write(&path, ride.to_binary())?;
    info!(path = %path.display(), records = ride.records.len(), "saved ride");
    Ok(path)
}

/// Read a raw ride image back.
pub fn load_ride(path: &Path) -> Result<NewtonRide, NewtonError> {
    NewtonRide::from_binary(&fs::read(path)?)
}
