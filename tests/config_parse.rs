use tix_reshape::{ReportHandler, config::Config};

#[test]
fn parse_example_config() {
    let raw = include_str!("../tix-reshape.example.toml");
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    assert!(cfg.thresholds.minimum_observations <= cfg.thresholds.maximum_observations);
    assert_eq!(cfg.output.archive_filename, "batch-test-report.tar.gz");
}

#[test]
fn empty_config_takes_handler_defaults() {
    let cfg: Config = toml::from_str("").expect("parse TOML");
    let settings = cfg.handler_settings();
    assert_eq!(
        settings.thresholds.minimum_observations,
        ReportHandler::MINIMUM_OBSERVATIONS_QTY
    );
    assert_eq!(settings.thresholds.gap_threshold_seconds, ReportHandler::GAP_THRESHOLD);
    assert_eq!(settings.back_up_dir_name, ReportHandler::BACK_UP_REPORTS_DIR_NAME);
}

#[test]
fn partial_sections_fill_omitted_keys_with_defaults() {
    let raw = "[thresholds]\ngap_threshold_seconds = 600\n\n[logging]\njson = true\n";
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    assert_eq!(cfg.thresholds.gap_threshold_seconds, 600);
    assert_eq!(
        cfg.thresholds.minimum_observations,
        ReportHandler::MINIMUM_OBSERVATIONS_QTY
    );
    assert_eq!(
        cfg.thresholds.maximum_observations,
        ReportHandler::MAXIMUM_OBSERVATIONS_QTY
    );
    assert!(cfg.logging.json);
    assert_eq!(cfg.logging.level, "info");
}
