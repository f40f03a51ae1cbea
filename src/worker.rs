//! Background load tasks.
//!
//! DESIGN
//! ======
//! Fitting a georeference and parsing + indexing a drawing are variable-cost
//! CPU work, so each runs on tokio's blocking pool and publishes its result
//! through the shared handle on success. Readers keep using the previous
//! snapshot until the swap. There is no cancellation: a caller that no longer
//! wants a result drops the `JoinHandle` and starts a fresh load.
//!
//! Both functions must be called from inside a tokio runtime.

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::error::GeoError;
use crate::georef::GeoreferenceRecord;
use crate::pipeline::GeoTransformPipeline;
use crate::snap::{SnapIndex, SnapIndexHandle};
use crate::vector::{self, ParsedGeometry};

/// Fit `record` off the caller's thread and publish it into `pipeline`.
///
/// The task resolves to the result of [`GeoTransformPipeline::initialize`].
pub fn spawn_georeference_load(pipeline: GeoTransformPipeline, record: GeoreferenceRecord) -> JoinHandle<Result<(), GeoError>> {
    tokio::task::spawn_blocking(move || pipeline.initialize(&record))
}

/// Parse `text`, build its snap index with `config.snap_cell_size`, and
/// publish the index into `handle`.
///
/// The parsed geometry is handed back for rendering. On error the current
/// index stays published.
pub fn spawn_geometry_load(
    handle: SnapIndexHandle,
    text: String,
    config: &EngineConfig,
) -> JoinHandle<Result<ParsedGeometry, GeoError>> {
    let cell_size = config.snap_cell_size;
    tokio::task::spawn_blocking(move || {
        let parsed = vector::parse(&text);
        if !parsed.report.is_clean() {
            warn!(
                defaulted_fields = parsed.report.defaulted_fields,
                skipped_entities = parsed.report.skipped_entities,
                malformed_records = parsed.report.malformed_records,
                "geometry parsed with recoverable problems"
            );
        }
        let index = SnapIndex::from_entities(&parsed.entities, cell_size)?;
        info!(entities = parsed.entities.len(), cell_size, "geometry loaded");
        handle.publish(index);
        Ok(parsed)
    })
}
