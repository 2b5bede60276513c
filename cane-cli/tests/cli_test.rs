//! Runs the `cane` binary end to end

use std::path::PathBuf;
use std::process::Command;

fn cane() -> Command {
    Command::new(env!("CARGO_BIN_EXE_cane"))
}

fn scenario(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios").join(name)
}

#[test]
fn test_config_prints_defaults() {
    let output = cane().arg("config").output().unwrap();
    assert!(output.status.success());
    let text = String::from_utf8(output.stdout).unwrap();
    assert!(text.contains("[vision]"));
    assert!(text.contains("region_top_n = 20"));
    assert!(text.contains("[alerts]"));
}

#[test]
fn test_heatmap_writes_png() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("frame1.png");
    let status = cane()
        .args(["heatmap", "--frame", "1", "--out"])
        .arg(&out)
        .arg(scenario("doorway.toml"))
        .status()
        .unwrap();
    assert!(status.success());

    let img = image::open(&out).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (64, 48));
    // patch cell is nearer than the background
    let patch = img.get_pixel(30, 20).0;
    let background = img.get_pixel(0, 0).0;
    assert!(patch[0] > background[0]);
    assert_eq!(patch[3], 180);
}

#[test]
fn test_heatmap_rejects_frame_without_depth() {
    let dir = tempfile::tempdir().unwrap();
    let status = cane()
        .args(["heatmap", "--out"])
        .arg(dir.path().join("x.png"))
        .arg(scenario("no_depth.yaml"))
        .status()
        .unwrap();
    assert!(!status.success());
}

#[test]
fn test_simulate_prints_json_states() {
    let output = cane()
        .args(["simulate", "--fps", "120"])
        .arg(scenario("no_depth.yaml"))
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let last: serde_json::Value = serde_json::from_str(stdout.lines().last().unwrap()).unwrap();
    assert_eq!(last["description"], "no obstacle");
    assert_eq!(last["regions"][0]["label"], "person");
}

#[test]
fn test_models_verify_fails_without_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("cane.toml");
    std::fs::write(
        &config,
        format!("[vision.models]\nmodel_path = {:?}\n", dir.path().display().to_string()),
    )
    .unwrap();

    let output = cane()
        .args(["models", "verify", "--config"])
        .arg(&config)
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("missing"));
}
