use tix_reshape::{
    Error, Report,
    codec::{self, decode, encode},
    synth::Synthesizer,
};
use time::OffsetDateTime;

fn start() -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap()
}

fn sample() -> Report {
    Synthesizer::default().report(start())
}

#[test]
fn decode_inverts_encode() {
    let report = sample();
    let text = encode(&report).unwrap();
    let other = decode(&text).unwrap();
    assert_eq!(report, other);
    assert!(other.file_path.is_none());
}

#[test]
fn encoded_report_validates_against_schema() {
    let text = encode(&sample()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    codec::validate(&value).unwrap();
    assert_eq!(value["packet_type"], "S");
    assert_eq!(value["observations"][0]["type_identifier"], "S");
    assert!(value.get("file_path").is_none());
}

#[test]
fn load_sets_absolute_path() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = tmp.path().join("report.json");
    let original = sample();
    codec::save(&original, &path).unwrap();

    let mut loaded = Report::load(&path).unwrap();
    let file_path = loaded.file_path.clone().expect("file_path set");
    assert!(file_path.is_absolute());
    assert!(file_path.ends_with("report.json"));

    loaded.file_path = None;
    assert_eq!(original, loaded);
}

#[test]
fn load_reports_missing_file_as_file_system_error() {
    let tmp = tempfile::TempDir::new().unwrap();
    let err = codec::load(&tmp.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, Error::FileSystem { .. }));
}

#[test]
fn load_names_the_malformed_file() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = tmp.path().join("broken.json");
    std::fs::write(&path, "{\"from_dir\": 1}").unwrap();
    match codec::load(&path).unwrap_err() {
        Error::MalformedReport { path: Some(p), .. } => assert_eq!(p, path),
        other => panic!("unexpected error: {other}"),
    }
}

fn mutate(f: impl FnOnce(&mut serde_json::Value)) -> Result<Report, Error> {
    let mut value: serde_json::Value = serde_json::from_str(&encode(&sample()).unwrap()).unwrap();
    f(&mut value);
    decode(&value.to_string())
}

#[test]
fn rejects_out_of_range_offsets() {
    let err = mutate(|v| v["observations"][3]["final_timestamp"] = 86_400_000_000_000u64.into());
    assert!(matches!(err, Err(Error::MalformedReport { .. })));

    let err = mutate(|v| v["received_timestamp"] = (-1).into());
    assert!(matches!(err, Err(Error::MalformedReport { .. })));
}

#[test]
fn rejects_multi_character_byte_fields() {
    let err = mutate(|v| v["observations"][0]["type_identifier"] = "SS".into());
    assert!(matches!(err, Err(Error::MalformedReport { .. })));
}

#[test]
fn rejects_empty_observations() {
    let err = mutate(|v| v["observations"] = serde_json::json!([]));
    assert!(matches!(err, Err(Error::MalformedReport { .. })));
}

#[test]
fn accepts_largest_in_day_offset() {
    let report = mutate(|v| v["observations"][0]["sent_timestamp"] = 86_399_999_999_999u64.into())
        .unwrap();
    assert_eq!(report.observations[0].sent_timestamp, 86_399_999_999_999);
}

#[test]
fn rejects_day_keys_beyond_representable_instants() {
    let err = mutate(|v| {
        for o in v["observations"].as_array_mut().unwrap() {
            let day = o["day_timestamp"].as_i64().unwrap();
            o["day_timestamp"] = (day + 20_000_000_000).into();
        }
    });
    assert!(matches!(err, Err(Error::MalformedReport { .. })));

    let err = mutate(|v| v["observations"][0]["day_timestamp"] = (-1).into());
    assert!(matches!(err, Err(Error::MalformedReport { .. })));
}
