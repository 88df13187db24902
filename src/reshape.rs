use crate::{
    error::{Error, Result},
    handler::{HandlerSettings, ReportHandler, backing_file},
    util::ensure_dir,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub name: String,
    pub reports: usize,
    pub observations: usize,
    pub undersized: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReshapeSummary {
    pub batches: Vec<BatchSummary>,
    /// Reports set aside as unbatchable remain under the failed-results directory.
    pub failed_results_kept: bool,
}

/// Splits the reports in `working_dir` into batch subdirectories named after
/// each batch's first `day_timestamp`, consuming the source files as it goes.
pub fn reshape_results(working_dir: &Path, settings: &HandlerSettings) -> Result<ReshapeSummary> {
    let mut handler = ReportHandler::with_settings(working_dir, settings)?;
    let minimum = handler.thresholds().minimum_observations;
    let mut summary = ReshapeSummary::default();

    handler.update_processable_reports()?;
    while !handler.processable_reports.is_empty() {
        let observations = ReportHandler::calculate_observations_quantity(&handler.processable_reports);
        let undersized = observations < minimum;
        let batch_dir = create_batch_dir(working_dir, &handler)?;
        let name = batch_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if undersized {
            warn!(
                batch = %name,
                observations,
                minimum,
                "flushing undersized batch"
            );
        } else {
            info!(batch = %name, reports = handler.processable_reports.len(), observations, "batch written");
        }
        summary.batches.push(BatchSummary {
            name,
            reports: handler.processable_reports.len(),
            observations,
            undersized,
        });

        handler.delete_unneeded_reports()?;
        handler.update_processable_reports()?;
    }

    summary.failed_results_kept = !remove_if_empty(&handler.failed_results_dir_path)?;
    if summary.failed_results_kept {
        warn!(
            dir = %handler.failed_results_dir_path.display(),
            "failed results directory is not empty; keeping it"
        );
    }
    remove_if_empty(&handler.back_up_reports_dir_path)?;

    Ok(summary)
}

/// Copies every processable report into a fresh batch directory and returns its path.
pub fn create_batch_dir(working_dir: &Path, handler: &ReportHandler) -> Result<PathBuf> {
    let day = handler
        .processable_reports
        .first()
        .and_then(|r| r.day_timestamp())
        .ok_or(Error::NoReports)?;
    let batch_dir = free_batch_path(working_dir, day);
    ensure_dir(&batch_dir)?;

    for report in &handler.processable_reports {
        let (src, file_name) = backing_file(report)?;
        let dst = batch_dir.join(file_name);
        std::fs::copy(src, &dst).map_err(|e| Error::fs(src, e))?;
    }
    Ok(batch_dir)
}

/// `<day>` or, when taken, `<day>-<n>` with the smallest free `n`.
fn free_batch_path(working_dir: &Path, day: i64) -> PathBuf {
    let base = working_dir.join(day.to_string());
    if !base.exists() {
        return base;
    }
    (1..)
        .map(|n| working_dir.join(format!("{day}-{n}")))
        .find(|p| !p.exists())
        .unwrap_or(base)
}

/// Removes `dir` when it has no entries. Returns whether it was removed.
fn remove_if_empty(dir: &Path) -> Result<bool> {
    let mut entries = std::fs::read_dir(dir).map_err(|e| Error::fs(dir, e))?;
    if entries.next().is_some() {
        return Ok(false);
    }
    std::fs::remove_dir(dir).map_err(|e| Error::fs(dir, e))?;
    Ok(true)
}
