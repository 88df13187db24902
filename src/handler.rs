use crate::{
    codec,
    error::{Error, Result},
    policy::{self, Admission, Selection, Thresholds},
    report::{Observation, Report},
    util::ensure_dir,
};
use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Directory names and thresholds a handler runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerSettings {
    pub back_up_dir_name: String,
    pub failed_results_dir_name: String,
    pub thresholds: Thresholds,
}

impl Default for HandlerSettings {
    fn default() -> Self {
        Self {
            back_up_dir_name: ReportHandler::BACK_UP_REPORTS_DIR_NAME.into(),
            failed_results_dir_name: ReportHandler::FAILED_RESULTS_DIR_NAME.into(),
            thresholds: Thresholds::default(),
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            minimum_observations: ReportHandler::MINIMUM_OBSERVATIONS_QTY,
            maximum_observations: ReportHandler::MAXIMUM_OBSERVATIONS_QTY,
            back_up_observations_threshold:
                ReportHandler::BACK_UP_OBSERVATIONS_QTY_PROCESSING_THRESHOLD,
            gap_threshold_seconds: ReportHandler::GAP_THRESHOLD,
        }
    }
}

/// Outcome of [`ReportHandler::select`].
#[derive(Debug, Clone)]
pub struct Pick {
    pub selection: Selection,
    /// Chosen reports in batch order.
    pub reports: Vec<Report>,
    /// Leading install reports larger than the maximum on their own.
    pub oversized: Vec<Report>,
}

/// Owns an installation directory plus its back-up and failed-results
/// subdirectories, and decides which reports form the next batch.
#[derive(Debug)]
pub struct ReportHandler {
    pub installation_dir_path: PathBuf,
    pub back_up_reports_dir_path: PathBuf,
    pub failed_results_dir_path: PathBuf,
    pub processable_reports: Vec<Report>,
    thresholds: Thresholds,
}

impl ReportHandler {
    pub const MINIMUM_OBSERVATIONS_QTY: usize = 4000;
    pub const MAXIMUM_OBSERVATIONS_QTY: usize = 5000;
    pub const BACK_UP_OBSERVATIONS_QTY_PROCESSING_THRESHOLD: usize = 1200;
    /// Seconds.
    pub const GAP_THRESHOLD: u64 = 300;
    pub const BACK_UP_REPORTS_DIR_NAME: &'static str = "back-up";
    pub const FAILED_RESULTS_DIR_NAME: &'static str = "failed-results";

    pub fn new(installation_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::with_settings(installation_dir, &HandlerSettings::default())
    }

    pub fn with_settings(installation_dir: impl Into<PathBuf>, settings: &HandlerSettings) -> Result<Self> {
        let t = settings.thresholds;
        if t.minimum_observations > t.maximum_observations {
            return Err(Error::InvalidThresholds {
                minimum: t.minimum_observations,
                maximum: t.maximum_observations,
            });
        }

        let installation_dir_path = installation_dir.into();
        let back_up_reports_dir_path = installation_dir_path.join(&settings.back_up_dir_name);
        let failed_results_dir_path = installation_dir_path.join(&settings.failed_results_dir_name);
        ensure_dir(&back_up_reports_dir_path)?;
        ensure_dir(&failed_results_dir_path)?;

        Ok(Self {
            installation_dir_path,
            back_up_reports_dir_path,
            failed_results_dir_path,
            processable_reports: Vec::new(),
            thresholds: t,
        })
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Reports forming the next batch. Reports too large to ever join one
    /// are moved into the failed-results directory on the way.
    pub fn get_processable_reports(&self) -> Result<Vec<Report>> {
        let pick = self.select()?;
        self.set_aside(&pick.oversized)?;
        Ok(pick.reports)
    }

    /// Loads both directories and applies the selection policy without
    /// touching any file.
    pub fn select(&self) -> Result<Pick> {
        let mut install = load_sorted(&self.installation_dir_path)?;
        let max = self.thresholds.maximum_observations;
        let leading = install
            .iter()
            .take_while(|r| r.observations.len() > max)
            .count();
        let oversized: Vec<Report> = install.drain(..leading).collect();
        let back_up = load_sorted(&self.back_up_reports_dir_path)?;

        let selection = policy::decide(&install, &back_up, &self.thresholds);
        debug!(
            install = install.len(),
            back_up = back_up.len(),
            oversized = oversized.len(),
            ?selection,
            "selection"
        );
        match selection.admission {
            Admission::BackUpTooLarge => info!(
                back_up_observations = Self::calculate_observations_quantity(&back_up),
                "back-up backlog over threshold; nothing processable"
            ),
            Admission::BackUpDiscontiguous => {
                info!("back-up reports are not contiguous with the install run; nothing processable")
            }
            Admission::BackUpNotEarlier => {
                info!("back-up reports are newer than the install run; nothing processable")
            }
            _ => {}
        }

        let reports = back_up
            .into_iter()
            .take(selection.back_up_len)
            .chain(install.into_iter().take(selection.install_len))
            .collect();
        Ok(Pick {
            selection,
            reports,
            oversized,
        })
    }

    /// Moves reports that exceed the maximum on their own into the
    /// failed-results directory.
    fn set_aside(&self, oversized: &[Report]) -> Result<()> {
        let max = self.thresholds.maximum_observations;
        for report in oversized {
            warn!(
                observations = report.observations.len(),
                max,
                path = ?report.file_path,
                "report exceeds maximum observations; moving to failed results"
            );
            move_into(report, &self.failed_results_dir_path)?;
        }
        Ok(())
    }

    pub fn calculate_observations_quantity(reports: &[Report]) -> usize {
        policy::observations_quantity(reports)
    }

    pub fn back_up_dir_is_empty(&self) -> Result<bool> {
        let mut entries = std::fs::read_dir(&self.back_up_reports_dir_path)
            .map_err(|e| Error::fs(&self.back_up_reports_dir_path, e))?;
        Ok(entries.next().is_none())
    }

    /// Defers reports to a later round by moving their files into the back-up directory.
    pub fn back_up_reports(&self, reports: &[Report]) -> Result<()> {
        for report in reports {
            move_into(report, &self.back_up_reports_dir_path)?;
        }
        info!(count = reports.len(), "reports moved to back-up");
        Ok(())
    }

    /// Deletes the files of the current processable reports, which the caller
    /// has already copied into a batch.
    pub fn delete_unneeded_reports(&mut self) -> Result<()> {
        for report in self.processable_reports.drain(..) {
            let (path, _) = backing_file(&report)?;
            std::fs::remove_file(path).map_err(|e| Error::fs(path, e))?;
            debug!(path = %path.display(), "deleted consumed report");
        }
        Ok(())
    }

    pub fn update_processable_reports(&mut self) -> Result<()> {
        self.processable_reports = self.get_processable_reports()?;
        Ok(())
    }

    /// Common endpoint of `reports` and the deduplicated union of their observations.
    pub fn collect_observations(reports: &[Report]) -> Result<(String, HashSet<Observation>)> {
        let first = reports.first().ok_or(Error::NoReports)?;
        let mut observations = HashSet::new();
        for report in reports {
            if report.from_dir != first.from_dir {
                return Err(Error::MixedEndpoints {
                    expected: first.from_dir.clone(),
                    found: report.from_dir.clone(),
                });
            }
            observations.extend(report.observations.iter().copied());
        }
        Ok((first.from_dir.clone(), observations))
    }
}

pub(crate) fn backing_file(report: &Report) -> Result<(&Path, &OsStr)> {
    let path = report.file_path.as_deref().ok_or(Error::NoBackingFile)?;
    let name = path.file_name().ok_or_else(|| {
        Error::fs(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "report path has no file name"),
        )
    })?;
    Ok((path, name))
}

/// Moves the report's file into `dir`, never replacing a file already there.
fn move_into(report: &Report, dir: &Path) -> Result<()> {
    let (src, name) = backing_file(report)?;
    let dst = free_file_path(dir, name);
    std::fs::rename(src, &dst).map_err(|e| Error::fs(src, e))?;
    debug!(from = %src.display(), to = %dst.display(), "moved report");
    Ok(())
}

/// `<dir>/<name>` or, when taken, `<dir>/<stem>-<n>.<ext>` with the smallest free `n`.
fn free_file_path(dir: &Path, name: &OsStr) -> PathBuf {
    let base = dir.join(name);
    if !base.exists() {
        return base;
    }
    let name = Path::new(name);
    let stem = name.file_stem().unwrap_or_default().to_string_lossy();
    let ext = name
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (1..)
        .map(|n| dir.join(format!("{stem}-{n}{ext}")))
        .find(|p| !p.exists())
        .unwrap_or(base)
}

/// Loads every regular file directly under `dir`, earliest first observation first.
fn load_sorted(dir: &Path) -> Result<Vec<Report>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| Error::fs(dir, e))? {
        let entry = entry.map_err(|e| Error::fs(dir, e))?;
        let file_type = entry.file_type().map_err(|e| Error::fs(entry.path(), e))?;
        if file_type.is_file() {
            paths.push(entry.path());
        }
    }
    paths.sort();

    let mut reports = paths
        .iter()
        .map(|p| codec::load(p))
        .collect::<Result<Vec<_>>>()?;
    reports.sort_by_key(|r| r.first_instant());
    debug!(dir = %dir.display(), count = reports.len(), "loaded reports");
    Ok(reports)
}
