use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const NANOS_IN_A_SECOND: i64 = 1_000_000_000;
pub const SECONDS_IN_A_DAY: i64 = 24 * 60 * 60;
pub const NANOS_IN_A_DAY: u64 = (SECONDS_IN_A_DAY * NANOS_IN_A_SECOND) as u64;
/// Largest accepted day key. Instants up to here fit in i64 epoch nanoseconds.
pub const MAX_DAY_TIMESTAMP: i64 = 9_000_000_000;

/// One packet's timing sample. Timestamps are nanosecond offsets within the
/// day identified by `day_timestamp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Observation {
    pub day_timestamp: i64,
    #[serde(with = "byte_char")]
    pub type_identifier: u8,
    pub packet_size: u32,
    pub initial_timestamp: u64,
    pub reception_timestamp: u64,
    pub sent_timestamp: u64,
    pub final_timestamp: u64,
}

impl Observation {
    /// Epoch second at which the UTC day containing `day_timestamp` starts.
    pub fn day_start(&self) -> i64 {
        self.day_timestamp - self.day_timestamp.rem_euclid(SECONDS_IN_A_DAY)
    }

    fn offsets(&self) -> [u64; 4] {
        [
            self.initial_timestamp,
            self.reception_timestamp,
            self.sent_timestamp,
            self.final_timestamp,
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub from_dir: String,
    pub to_dir: String,
    #[serde(with = "byte_char")]
    pub packet_type: u8,
    pub initial_timestamp: u64,
    pub received_timestamp: u64,
    pub sent_timestamp: u64,
    pub final_timestamp: u64,
    pub public_key: String,
    pub signature: String,
    pub user_id: u64,
    pub installation_id: u64,
    pub observations: Vec<Observation>,
    #[serde(skip)]
    pub file_path: Option<PathBuf>,
}

impl PartialEq for Report {
    fn eq(&self, other: &Self) -> bool {
        self.from_dir == other.from_dir
            && self.to_dir == other.to_dir
            && self.packet_type == other.packet_type
            && self.initial_timestamp == other.initial_timestamp
            && self.received_timestamp == other.received_timestamp
            && self.sent_timestamp == other.sent_timestamp
            && self.final_timestamp == other.final_timestamp
            && self.public_key == other.public_key
            && self.signature == other.signature
            && self.user_id == other.user_id
            && self.installation_id == other.installation_id
            && self.observations == other.observations
    }
}

impl Eq for Report {}

impl Report {
    /// Day key of the report: `day_timestamp` of its first observation.
    pub fn day_timestamp(&self) -> Option<i64> {
        self.observations.first().map(|o| o.day_timestamp)
    }

    /// Absolute instants, in epoch nanoseconds, of every observation.
    ///
    /// An offset smaller than the previous one while the day key is unchanged
    /// belongs to the following day.
    pub fn observation_instants(&self) -> Vec<i64> {
        let mut out = Vec::with_capacity(self.observations.len());
        let mut prev: Option<(i64, u64)> = None;
        let mut wraps = 0i64;
        for obs in &self.observations {
            let day = obs.day_start();
            match prev {
                Some((prev_day, prev_off)) if prev_day == day => {
                    if obs.initial_timestamp < prev_off {
                        wraps += 1;
                    }
                }
                _ => wraps = 0,
            }
            prev = Some((day, obs.initial_timestamp));
            out.push(instant(day.saturating_add(wraps.saturating_mul(SECONDS_IN_A_DAY)), obs));
        }
        out
    }

    pub fn first_instant(&self) -> Option<i64> {
        self.observations
            .first()
            .map(|o| instant(o.day_start(), o))
    }

    pub fn last_instant(&self) -> Option<i64> {
        self.observation_instants().last().copied()
    }

    /// Seconds between the first and the last observation.
    pub fn report_gap(&self) -> f64 {
        match (self.first_instant(), self.last_instant()) {
            (Some(first), Some(last)) => nanos_to_seconds(last.saturating_sub(first)),
            _ => 0.0,
        }
    }

    /// Seconds from `earlier`'s last observation to `later`'s first one.
    /// Negative when the two reports overlap.
    pub fn gap_between(later: &Report, earlier: &Report) -> f64 {
        match (later.first_instant(), earlier.last_instant()) {
            (Some(first), Some(last)) => nanos_to_seconds(first.saturating_sub(last)),
            _ => 0.0,
        }
    }

    /// Every day key lies within `[0, MAX_DAY_TIMESTAMP]`.
    pub fn day_keys_in_range(&self) -> bool {
        self.observations
            .iter()
            .all(|o| (0..=MAX_DAY_TIMESTAMP).contains(&o.day_timestamp))
    }

    /// Every timestamp offset in the report lies within `[0, NANOS_IN_A_DAY)`.
    pub fn offsets_in_range(&self) -> bool {
        let header = [
            self.initial_timestamp,
            self.received_timestamp,
            self.sent_timestamp,
            self.final_timestamp,
        ];
        header
            .into_iter()
            .chain(self.observations.iter().flat_map(Observation::offsets))
            .all(|t| t < NANOS_IN_A_DAY)
    }
}

/// Epoch nanoseconds of `obs` taken on the day starting at `day_start`.
/// Saturates instead of overflowing for day keys past `MAX_DAY_TIMESTAMP`.
fn instant(day_start: i64, obs: &Observation) -> i64 {
    day_start
        .saturating_mul(NANOS_IN_A_SECOND)
        .saturating_add(obs.initial_timestamp as i64)
}

fn nanos_to_seconds(nanos: i64) -> f64 {
    nanos as f64 / NANOS_IN_A_SECOND as f64
}

/// Serializes a byte as a one-character string.
mod byte_char {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(b: &u8, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&char::from(*b).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u8, D::Error> {
        let raw = String::deserialize(d)?;
        let mut chars = raw.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => u8::try_from(u32::from(c))
                .map_err(|_| D::Error::custom(format!("not a single-byte character: {raw:?}"))),
            _ => Err(D::Error::custom(format!(
                "expected a one-character string, got {raw:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(day_timestamp: i64, offset_secs: u64) -> Observation {
        let t = offset_secs * NANOS_IN_A_SECOND as u64;
        Observation {
            day_timestamp,
            type_identifier: b'S',
            packet_size: 64,
            initial_timestamp: t,
            reception_timestamp: t,
            sent_timestamp: t,
            final_timestamp: t,
        }
    }

    #[test]
    fn day_start_floors_to_utc_midnight() {
        let o = obs(86_400 * 3 + 125, 125);
        assert_eq!(o.day_start(), 86_400 * 3);
    }

    #[test]
    fn offsets_wrap_into_next_day_when_day_key_is_fixed() {
        let day = 86_400 * 10;
        let mut r = crate::synth::blank_report();
        r.observations = vec![obs(day, 86_399), obs(day, 0), obs(day, 1)];
        assert_eq!(r.report_gap(), 2.0);
    }

    #[test]
    fn far_future_day_key_saturates() {
        let day = i64::MAX - 10;
        let mut r = crate::synth::blank_report();
        r.observations = vec![obs(day, 5), obs(day, 1)];
        assert!(!r.day_keys_in_range());
        assert_eq!(r.first_instant(), Some(i64::MAX));
        assert_eq!(r.report_gap(), 0.0);
    }
}
