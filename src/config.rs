use crate::{
    handler::{HandlerSettings, ReportHandler},
    policy::Thresholds,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: Global,
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub input: Input,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub logging: Logging,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }

    pub fn handler_settings(&self) -> HandlerSettings {
        HandlerSettings {
            back_up_dir_name: self.paths.back_up_dir_name.clone(),
            failed_results_dir_name: self.paths.failed_results_dir_name.clone(),
            thresholds: self.thresholds,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Global {
    /// Keep the working area after the archive is written.
    pub keep_work_dir: bool,
    pub print_summary: bool,
}
impl Default for Global {
    fn default() -> Self {
        Self {
            keep_work_dir: false,
            print_summary: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    /// Parent of the per-run working areas.
    pub work_dir: String,
    pub back_up_dir_name: String,
    pub failed_results_dir_name: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir().join("tix-reshape").display().to_string(),
            back_up_dir_name: ReportHandler::BACK_UP_REPORTS_DIR_NAME.into(),
            failed_results_dir_name: ReportHandler::FAILED_RESULTS_DIR_NAME.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Input {
    pub skip_empty_files: bool,
}
impl Default for Input {
    fn default() -> Self {
        Self {
            skip_empty_files: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Output {
    pub archive_filename: String,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            archive_filename: "batch-test-report.tar.gz".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
        }
    }
}
