//! Persisting a status run

use std::path::Path;

use crate::error::Result;
use crate::logs::{ReportHeader, write_logs};
use crate::state::write_state;
use crate::status::Status;

/// Filter `status` to the header's chart (if any), then write the log files
/// and the state snapshot into `logs_dir`
///
/// Returns the status as written.
pub fn save_report(logs_dir: &Path, mut status: Status, header: &ReportHeader) -> Result<Status> {
    if let Some(chart) = &header.chart {
        status.retain_chart(chart);
    }
    write_logs(logs_dir, &status, header)?;
    write_state(logs_dir, &status)?;
    tracing::info!(dir = %logs_dir.display(), "saved lifecycle report");
    Ok(status)
}
