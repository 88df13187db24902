use crate::report::Report;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub minimum_observations: usize,
    pub maximum_observations: usize,
    pub back_up_observations_threshold: usize,
    pub gap_threshold_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Admission {
    /// The install run alone meets the minimum.
    Sufficient,
    /// The install run is short; a small back-up backlog is flushed with it.
    SupplementedByBackUp,
    /// The install run is short and there is no backlog; it is flushed as is.
    Undersized,
    /// The install run is short and the backlog is over its threshold.
    BackUpTooLarge,
    /// The backlog cannot be joined to the install run without a gap.
    BackUpDiscontiguous,
    /// The backlog does not start before the install run.
    BackUpNotEarlier,
    /// Nothing to select.
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub admission: Admission,
    /// Leading back-up reports taken, in chronological order.
    pub back_up_len: usize,
    /// Leading install reports taken, in chronological order.
    pub install_len: usize,
    pub observations: usize,
}

impl Selection {
    fn rejected(admission: Admission) -> Self {
        Self {
            admission,
            back_up_len: 0,
            install_len: 0,
            observations: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.back_up_len + self.install_len == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stop {
    Exhausted,
    Gap,
    Cap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub len: usize,
    pub observations: usize,
    pub stop: Stop,
}

pub fn observations_quantity<'a>(reports: impl IntoIterator<Item = &'a Report>) -> usize {
    reports.into_iter().map(|r| r.observations.len()).sum()
}

/// Longest chronological prefix whose neighbours are at most `gap_threshold_seconds`
/// apart and whose observations stay within `maximum_observations`.
pub fn contiguous_run<'a>(reports: impl IntoIterator<Item = &'a Report>, t: &Thresholds) -> Run {
    let mut len = 0;
    let mut observations = 0;
    let mut prev: Option<&Report> = None;

    for report in reports {
        if let Some(prev) = prev {
            if Report::gap_between(report, prev) > t.gap_threshold_seconds as f64 {
                return Run {
                    len,
                    observations,
                    stop: Stop::Gap,
                };
            }
        }
        let next = observations + report.observations.len();
        if next > t.maximum_observations {
            return Run {
                len,
                observations,
                stop: Stop::Cap,
            };
        }
        observations = next;
        len += 1;
        prev = Some(report);
    }

    Run {
        len,
        observations,
        stop: Stop::Exhausted,
    }
}

/// Picks the batch to emit from chronologically sorted install and back-up reports.
pub fn decide(install: &[Report], back_up: &[Report], t: &Thresholds) -> Selection {
    let run = contiguous_run(install, t);
    if run.len > 0 && run.observations >= t.minimum_observations {
        return Selection {
            admission: Admission::Sufficient,
            back_up_len: 0,
            install_len: run.len,
            observations: run.observations,
        };
    }

    if observations_quantity(back_up) > t.back_up_observations_threshold {
        return Selection::rejected(Admission::BackUpTooLarge);
    }

    if let (Some(last), Some(first)) = (back_up.last(), install[..run.len].first()) {
        if last.first_instant() > first.first_instant() {
            return Selection::rejected(Admission::BackUpNotEarlier);
        }
    }

    let combined = contiguous_run(back_up.iter().chain(&install[..run.len]), t);
    let total = back_up.len() + run.len;
    if combined.len < total {
        match combined.stop {
            Stop::Gap => return Selection::rejected(Admission::BackUpDiscontiguous),
            Stop::Cap if combined.len < back_up.len() => {
                return Selection::rejected(Admission::BackUpTooLarge);
            }
            _ => {}
        }
    }

    if combined.len == 0 {
        return Selection::rejected(Admission::Empty);
    }

    let admission = if back_up.is_empty() {
        Admission::Undersized
    } else {
        Admission::SupplementedByBackUp
    };
    Selection {
        admission,
        back_up_len: back_up.len(),
        install_len: combined.len - back_up.len(),
        observations: combined.observations,
    }
}
