//! Synthetic report producer, used to seed installation directories.

use crate::{
    codec,
    error::Result,
    report::{NANOS_IN_A_DAY, Observation, Report},
};
use std::path::Path;
use time::{Duration, OffsetDateTime, Time};

pub const DEFAULT_FROM_DIR: &str = "127.0.0.1:4500";
pub const DEFAULT_TO_DIR: &str = "8.8.8.8:4500";

#[derive(Debug, Clone)]
pub struct Synthesizer {
    pub from_dir: String,
    pub to_dir: String,
    pub user_id: u64,
    pub installation_id: u64,
    /// Time covered by one report.
    pub report_span: Duration,
    /// Spacing between consecutive observations.
    pub observation_step: Duration,
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self {
            from_dir: DEFAULT_FROM_DIR.into(),
            to_dir: DEFAULT_TO_DIR.into(),
            user_id: 1,
            installation_id: 1,
            report_span: Duration::minutes(1),
            observation_step: Duration::seconds(1),
        }
    }
}

impl Synthesizer {
    pub fn observations(&self, start: OffsetDateTime) -> Vec<Observation> {
        let end = start + self.report_span;
        let mut current = start;
        let mut out = Vec::new();
        let mut i = 0u64;
        while current < end {
            let midnight = current.replace_time(Time::MIDNIGHT);
            let initial = (current - midnight).whole_nanoseconds() as u64 % NANOS_IN_A_DAY;
            // Deterministic stand-ins for network and processing delays.
            let transmission = 1_000_000 * (1 + i % 7);
            let processing = 10_000 * (1 + i % 3);
            let reception = (initial + transmission) % NANOS_IN_A_DAY;
            let sent = (reception + processing) % NANOS_IN_A_DAY;
            let final_ = (sent + transmission) % NANOS_IN_A_DAY;
            out.push(Observation {
                day_timestamp: current.unix_timestamp(),
                type_identifier: b'S',
                packet_size: 64,
                initial_timestamp: initial,
                reception_timestamp: reception,
                sent_timestamp: sent,
                final_timestamp: final_,
            });
            current += self.observation_step;
            i += 1;
        }
        out
    }

    pub fn report(&self, start: OffsetDateTime) -> Report {
        Report {
            observations: self.observations(start),
            ..empty_report(&self.from_dir, &self.to_dir, self.user_id, self.installation_id)
        }
    }

    /// Writes consecutive reports starting at `start` into `dir` until at least
    /// `total_observations` have been produced. Returns them in write order,
    /// each with its `file_path` set.
    pub fn write_reports(
        &self,
        dir: &Path,
        total_observations: usize,
        start: OffsetDateTime,
    ) -> Result<Vec<Report>> {
        let mut written = Vec::new();
        let mut produced = 0;
        let mut current = start;
        while produced < total_observations {
            let mut report = self.report(current);
            let day = report.day_timestamp().unwrap_or_default();
            let path = dir.join(format!("tix-report-{day}.json"));
            codec::save(&report, &path)?;
            report.file_path = Some(path);
            produced += report.observations.len();
            current += self.report_span;
            written.push(report);
        }
        Ok(written)
    }
}

/// Report carrying metadata only.
pub fn empty_report(from_dir: &str, to_dir: &str, user_id: u64, installation_id: u64) -> Report {
    Report {
        from_dir: from_dir.into(),
        to_dir: to_dir.into(),
        packet_type: b'S',
        initial_timestamp: 0,
        received_timestamp: 0,
        sent_timestamp: 0,
        final_timestamp: 0,
        public_key: "a".into(),
        signature: "a".into(),
        user_id,
        installation_id,
        observations: Vec::new(),
        file_path: None,
    }
}

#[cfg(test)]
pub(crate) fn blank_report() -> Report {
    empty_report(DEFAULT_FROM_DIR, DEFAULT_TO_DIR, 1, 1)
}

/// Instant a report following `report` back to back would start at.
pub fn next_start(report: &Report, step: Duration) -> Option<OffsetDateTime> {
    let last = report.last_instant()?;
    let at = OffsetDateTime::from_unix_timestamp_nanos(i128::from(last)).ok()?;
    Some(at + step)
}
