use std::{io::Write as _, path::PathBuf};

use flate2::{Compression as GzLevel, write::GzEncoder};
use wareplay::{
    Compression, Frame, Layout, Metrics, Trace, TraceLoadError, TraceSource, Worker, Zone,
    ZoneKind, decode_bytes, load, parse_trace_json,
};

const SAMPLE: &str = r#"{
  "layout": {
    "zones": [
      {"id": "A", "type": "storage", "x": 0, "y": 0, "w": 2, "h": 2, "capacity": 10},
      {"id": "IN", "type": "dock_in", "x": 3, "y": 0, "w": 1, "h": 1},
      {"id": "OUT", "type": "outbound", "x": 3, "y": 2}
    ]
  },
  "frames": [
    {"zones": {"A": 5}, "workers": [{"id": "W1", "zone_id": "A"}],
     "metrics": {"load_pct": 0.5, "otif_pct": 1, "util_workers": 0.8, "stockouts": 0, "incidents": 0}},
    {"zones": {}, "workers": [{"id": "W2", "zone_id": "NOWHERE"}], "metrics": {}}
  ]
}"#;

fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut enc = GzEncoder::new(Vec::new(), GzLevel::default());
    enc.write_all(bytes).unwrap();
    enc.finish().unwrap()
}

fn fixture_dir() -> PathBuf {
    let dir = PathBuf::from("target").join("decode_trace");
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn gzip_payload_decodes_with_defaults_and_aliases() {
    let trace = decode_bytes(&gzip(SAMPLE.as_bytes()), Compression::Gzip).unwrap();

    assert_eq!(trace.layout.len(), 3);
    assert_eq!(trace.frame_count(), 2);

    let out = trace.layout.get("OUT").unwrap();
    assert_eq!(out.kind, ZoneKind::DockOut);
    assert_eq!((out.w, out.h), (1.0, 1.0));
    assert_eq!(out.capacity, None);

    let f0 = trace.frame(0).unwrap();
    assert_eq!(f0.quantity("A"), 5.0);
    assert_eq!(f0.quantity("IN"), 0.0);
    assert_eq!(f0.metrics.load_pct, Some(0.5));
    assert_eq!(f0.metrics.dock_queue, None);

    assert_eq!(trace.frame(1).unwrap().metrics, Metrics::default());
    assert_eq!(trace.unresolved_workers(), 1);
}

#[test]
fn bare_and_wrapped_layouts_are_equivalent() {
    let wrapped = parse_trace_json(
        r#"{"layout": {"zones": [{"id": "A", "type": "buffer"}]}, "frames": []}"#,
    )
    .unwrap();
    let bare =
        parse_trace_json(r#"{"layout": [{"id": "A", "type": "buffer"}], "frames": []}"#).unwrap();
    assert_eq!(wrapped, bare);
}

#[test]
fn encoded_trace_decodes_to_an_equal_trace() {
    let layout = Layout::new(vec![Zone {
        id: "S1".to_string(),
        kind: ZoneKind::Storage,
        x: 1.0,
        y: 2.0,
        w: 3.0,
        h: 4.0,
        capacity: Some(100.0),
    }])
    .unwrap();
    let frame = Frame {
        zones: [("S1".to_string(), 42.0)].into_iter().collect(),
        workers: vec![Worker {
            id: "W7".to_string(),
            zone_id: "S1".to_string(),
        }],
        metrics: Metrics {
            throughput_lph: Some(123.45),
            dock_queue: Some(3.0),
            ..Metrics::default()
        },
    };
    let trace = Trace {
        layout,
        frames: vec![frame.clone(), frame],
    };

    let json = serde_json::to_vec(&trace).unwrap();
    let back = decode_bytes(&gzip(&json), Compression::Gzip).unwrap();
    assert_eq!(back, trace);
}

#[test]
fn failures_are_classified() {
    assert!(matches!(
        decode_bytes(b"definitely not gzip", Compression::Gzip),
        Err(TraceLoadError::Decompress(_))
    ));
    assert!(matches!(
        decode_bytes(&gzip(&[0xff, 0xfe, 0xfd]), Compression::Gzip),
        Err(TraceLoadError::Utf8(_))
    ));
    assert!(matches!(
        decode_bytes(&gzip(b"{\"layout\": "), Compression::Gzip),
        Err(TraceLoadError::Parse(_))
    ));
    assert!(matches!(
        parse_trace_json(r#"{"layout": [], "frames": []}"#),
        Err(TraceLoadError::Invalid(_))
    ));
    assert!(matches!(
        parse_trace_json(
            r#"{"layout": [{"id": "A", "type": "storage"}, {"id": "A", "type": "buffer"}]}"#
        ),
        Err(TraceLoadError::Invalid(_))
    ));
}

#[test]
fn null_worker_ids_and_zone_quantities_still_load() {
    let doc = r#"{
      "layout": [{"id": "A", "type": "storage", "capacity": 10}],
      "frames": [{"zones": {"A": null}, "workers": [{"id": null, "zone_id": "A"}]}]
    }"#;
    let trace = decode_bytes(&gzip(doc.as_bytes()), Compression::Gzip).unwrap();
    let f0 = trace.frame(0).unwrap();
    assert_eq!(f0.quantity("A"), 0.0);
    assert_eq!(f0.workers[0].id, "");
    assert_eq!(trace.unresolved_workers(), 0);
}

#[tokio::test]
async fn load_reads_gzip_and_plain_files() {
    let dir = fixture_dir();

    let gz_path = dir.join("run_dump.json.gz");
    std::fs::write(&gz_path, gzip(SAMPLE.as_bytes())).unwrap();
    let from_gz = load(&TraceSource::File(gz_path)).await.unwrap();

    let json_path = dir.join("run_dump.json");
    std::fs::write(&json_path, SAMPLE).unwrap();
    let source = TraceSource::parse(json_path.to_str().unwrap());
    assert_eq!(source.compression(), Compression::None);
    let from_json = load(&source).await.unwrap();

    assert_eq!(from_gz, from_json);
}

#[tokio::test]
async fn missing_source_reports_the_uri() {
    let source = TraceSource::File(fixture_dir().join("no_such_dump.json.gz"));
    match load(&source).await {
        Err(TraceLoadError::Fetch { source_uri, .. }) => {
            assert!(source_uri.ends_with("no_such_dump.json.gz"));
        }
        other => panic!("expected fetch error, got {other:?}"),
    }
}
