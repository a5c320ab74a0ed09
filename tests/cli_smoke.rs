use std::{io::Write as _, path::PathBuf, process::Command};

use flate2::{Compression, write::GzEncoder};

const TRACE_JSON: &str = r#"{
  "layout": [
    {"id": "A", "type": "storage", "x": 0, "y": 0, "w": 2, "h": 2, "capacity": 10},
    {"id": "D1", "type": "dock_in", "x": 3, "y": 0}
  ],
  "frames": [
    {"zones": {"A": 2}, "workers": [], "metrics": {"load_pct": 0.2}},
    {"zones": {"A": 5}, "workers": [{"id": "W1", "zone_id": "A"}, {"id": "W2", "zone_id": "X"}],
     "metrics": {"load_pct": 0.5, "otif_pct": 1, "throughput_lph": 12.25}}
  ]
}"#;

fn exe() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_wareplay"))
}

fn write_trace(dir: &std::path::Path) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join("run_dump.json.gz");
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(TRACE_JSON.as_bytes()).unwrap();
    std::fs::write(&path, enc.finish().unwrap()).unwrap();
    path
}

#[test]
fn cli_frame_writes_png_and_prints_metrics() {
    let dir = PathBuf::from("target").join("cli_smoke");
    let trace = write_trace(&dir);
    let out = dir.join("frame.png");
    let _ = std::fs::remove_file(&out);

    let output = Command::new(exe())
        .args(["frame", "--trace"])
        .arg(&trace)
        .args(["--frame", "99", "--width", "96", "--height", "64", "--out"])
        .arg(&out)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("frame 2/2"), "stdout: {stdout}");
    assert!(stdout.contains("50.0%"));
    assert!(stdout.contains("12.3"), "stdout: {stdout}");

    let img = image::open(&out).unwrap();
    assert_eq!((img.width(), img.height()), (96, 64));
}

#[test]
fn cli_info_summarizes_the_trace() {
    let dir = PathBuf::from("target").join("cli_smoke_info");
    let trace = write_trace(&dir);

    let output = Command::new(exe())
        .args(["info", "--trace"])
        .arg(&trace)
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("zones:              2"), "stdout: {stdout}");
    assert!(stdout.contains("frames:             2"));
    assert!(stdout.contains("unresolved workers: 1"));
}

#[test]
fn cli_fails_on_missing_trace() {
    let output = Command::new(exe())
        .args(["info", "--trace", "target/cli_smoke/does_not_exist.json.gz"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("does_not_exist"));
}
