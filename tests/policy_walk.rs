use time::{Duration, OffsetDateTime};
use tix_reshape::{
    Report,
    policy::{Admission, Stop, Thresholds, contiguous_run, decide},
    synth::Synthesizer,
};

const T: Thresholds = Thresholds {
    minimum_observations: 240,
    maximum_observations: 300,
    back_up_observations_threshold: 120,
    gap_threshold_seconds: 60,
};

/// `count` one-minute reports of 60 observations, back to back from `start`.
fn reports(start: i64, count: usize) -> Vec<Report> {
    let synth = Synthesizer::default();
    let t0 = OffsetDateTime::from_unix_timestamp(start).unwrap();
    (0..count)
        .map(|i| synth.report(t0 + Duration::minutes(i as i64)))
        .collect()
}

#[test]
fn run_stops_at_cap() {
    let rs = reports(1_700_000_000, 6);
    let run = contiguous_run(&rs, &T);
    assert_eq!(run.len, 5);
    assert_eq!(run.observations, 300);
    assert_eq!(run.stop, Stop::Cap);
}

#[test]
fn run_stops_at_gap() {
    let mut rs = reports(1_700_000_000, 2);
    rs.extend(reports(1_700_000_000 + 120 + 61, 2));
    let run = contiguous_run(&rs, &T);
    assert_eq!(run.len, 2);
    assert_eq!(run.stop, Stop::Gap);
}

#[test]
fn gap_equal_to_threshold_is_contiguous() {
    let mut rs = reports(1_700_000_000, 1);
    rs.extend(reports(1_700_000_000 + 59 + 60, 1));
    assert_eq!(Report::gap_between(&rs[1], &rs[0]), 60.0);
    assert_eq!(contiguous_run(&rs, &T).stop, Stop::Exhausted);
}

#[test]
fn sufficient_install_run_ignores_back_up() {
    let back_up = reports(1_700_000_000, 1);
    let install = reports(1_700_000_060, 4);
    let s = decide(&install, &back_up, &T);
    assert_eq!(s.admission, Admission::Sufficient);
    assert_eq!((s.back_up_len, s.install_len, s.observations), (0, 4, 240));
}

#[test]
fn small_back_up_supplements_short_run() {
    let back_up = reports(1_700_000_000, 2);
    let install = reports(1_700_000_120, 1);
    let s = decide(&install, &back_up, &T);
    assert_eq!(s.admission, Admission::SupplementedByBackUp);
    assert_eq!((s.back_up_len, s.install_len, s.observations), (2, 1, 180));
}

#[test]
fn combined_run_is_capped_after_back_up() {
    let t = Thresholds {
        minimum_observations: 300,
        back_up_observations_threshold: 180,
        ..T
    };
    let back_up = reports(1_700_000_000, 3);
    let install = reports(1_700_000_180, 4);
    let s = decide(&install, &back_up, &t);
    assert_eq!(s.admission, Admission::SupplementedByBackUp);
    assert_eq!((s.back_up_len, s.install_len, s.observations), (3, 2, 300));
}

#[test]
fn large_back_up_rejects_everything() {
    let back_up = reports(1_700_000_000, 3);
    let install = reports(1_700_000_180, 1);
    let s = decide(&install, &back_up, &T);
    assert_eq!(s.admission, Admission::BackUpTooLarge);
    assert!(s.is_empty());
}

#[test]
fn back_up_far_from_install_is_rejected() {
    let back_up = reports(1_700_000_000, 1);
    let install = reports(1_700_010_000, 1);
    let s = decide(&install, &back_up, &T);
    assert_eq!(s.admission, Admission::BackUpDiscontiguous);
    assert!(s.is_empty());
}

#[test]
fn short_run_without_back_up_is_undersized() {
    let install = reports(1_700_000_000, 2);
    let s = decide(&install, &[], &T);
    assert_eq!(s.admission, Admission::Undersized);
    assert_eq!(s.install_len, 2);
}

#[test]
fn nothing_to_select() {
    let s = decide(&[], &[], &T);
    assert_eq!(s.admission, Admission::Empty);
    assert!(s.is_empty());
}

#[test]
fn back_up_newer_than_install_is_rejected() {
    let install = reports(1_700_000_000, 1);
    let back_up = reports(1_700_000_060, 1);
    let s = decide(&install, &back_up, &T);
    assert_eq!(s.admission, Admission::BackUpNotEarlier);
    assert!(s.is_empty());
}
