//! Integration tests for the patchwire binary.
//!
//! Runs `patchwire units` and `patchwire render` end to end and reads the
//! rendered WAV back with hound.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

fn patchwire_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_patchwire"))
}

/// Voice 0 gates an envelope that opens a VCA on a 440 Hz oscillator.
const GATED_PATCH: &str = r#"{
  "modules": [
    {"id": "keys", "type": "voices", "params": {"voices": 2}},
    {"id": "osc", "type": "oscillator", "params": {"frequency": 440}},
    {"id": "env", "type": "envelope",
     "params": {"attack": 0.001, "decay": 0.01, "sustain": 1.0, "release": 0.001}},
    {"id": "vca", "type": "gain", "params": {"gain": 0.5}},
    {"id": "out", "type": "output"}
  ],
  "connections": [
    {"from": {"moduleId": "keys", "portId": "cv"}, "to": {"moduleId": "osc", "portId": "pitch"}, "kind": "cv"},
    {"from": {"moduleId": "keys", "portId": "gate"}, "to": {"moduleId": "env", "portId": "gate"}, "kind": "gate"},
    {"from": {"moduleId": "osc", "portId": "out"}, "to": {"moduleId": "vca", "portId": "in"}, "kind": "audio"},
    {"from": {"moduleId": "env", "portId": "out"}, "to": {"moduleId": "vca", "portId": "cv"}, "kind": "cv"},
    {"from": {"moduleId": "vca", "portId": "out"}, "to": {"moduleId": "out", "portId": "in"}, "kind": "audio"}
  ]
}"#;

fn write_patch(dir: &Path, json: &str) -> std::path::PathBuf {
    let path = dir.join("patch.json");
    std::fs::write(&path, json).unwrap();
    path
}

/// Reads a float WAV as per-channel sample vectors.
fn read_channels(path: &Path) -> (hound::WavSpec, Vec<Vec<f32>>) {
    let mut reader = hound::WavReader::open(path).unwrap();
    let spec = reader.spec();
    let channels = spec.channels as usize;
    let mut out = vec![Vec::new(); channels];
    for (i, s) in reader.samples::<f32>().enumerate() {
        out[i % channels].push(s.unwrap());
    }
    (spec, out)
}

// ---------------------------------------------------------------------------
// 1. `patchwire units`
// ---------------------------------------------------------------------------

#[test]
fn units_lists_every_type() {
    let output = patchwire_bin().arg("units").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for tag in [
        "oscillator",
        "envelope",
        "sequencer",
        "gain",
        "chorus",
        "voices",
        "controls",
        "input",
        "output",
        "monitor",
    ] {
        assert!(stdout.contains(tag), "listing should contain '{tag}'");
    }
}

#[test]
fn units_detail_shows_ports_and_params() {
    let output = patchwire_bin().args(["units", "oscillator"]).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("pitch (cv)"));
    assert!(stdout.contains("sync (sync)"));
    assert!(stdout.contains("frequency"));
    assert!(stdout.contains("waveform"));
}

#[test]
fn units_unknown_fails() {
    let output = patchwire_bin().args(["units", "wavetable"]).output().unwrap();
    assert!(!output.status.success());
}

// ---------------------------------------------------------------------------
// 2. `patchwire render`
// ---------------------------------------------------------------------------

#[test]
fn render_gated_voice() {
    let dir = TempDir::new().unwrap();
    let patch = write_patch(dir.path(), GATED_PATCH);
    let wav = dir.path().join("out.wav");

    let output = patchwire_bin()
        .arg("render")
        .arg(&patch)
        .arg(&wav)
        .args(["--seconds", "1", "--bit-depth", "32", "--gate", "keys:0@0.5"])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "render failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let (spec, channels) = read_channels(&wav);
    assert_eq!(spec.sample_rate, 48000);
    assert_eq!(channels.len(), 2);
    assert_eq!(channels[0].len(), 48000);

    let left = &channels[0];
    assert!(left[..24000].iter().all(|&s| s == 0.0), "silent before the gate");
    let peak = left[30000..].iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    assert!((peak - 0.5).abs() < 0.02, "peak {peak}");

    // voice 1 never opens
    assert!(channels[1].iter().all(|&s| s == 0.0));
}

#[test]
fn render_with_config_and_overrides() {
    let dir = TempDir::new().unwrap();
    let patch = write_patch(
        dir.path(),
        r#"{
          "modules": [
            {"id": "osc", "type": "oscillator"},
            {"id": "out", "type": "output"}
          ],
          "connections": [
            {"from": {"moduleId": "osc", "portId": "out"}, "to": {"moduleId": "out", "portId": "in"}, "kind": "audio"}
          ]
        }"#,
    );
    let config = dir.path().join("engine.toml");
    std::fs::write(&config, "sample_rate = 22050.0\nmax_block_frames = 64\n").unwrap();
    let wav = dir.path().join("out.wav");

    let output = patchwire_bin()
        .arg("render")
        .arg(&patch)
        .arg(&wav)
        .arg("--config")
        .arg(&config)
        .args([
            "--channels",
            "1",
            "--seconds",
            "0.5",
            "--param",
            "osc.waveform=pulse",
            "--bit-depth",
            "16",
        ])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "render failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let reader = hound::WavReader::open(&wav).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.sample_rate, 22050);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(reader.duration(), 11025);
}

#[test]
fn render_rejects_invalid_patch() {
    let dir = TempDir::new().unwrap();
    let patch = write_patch(
        dir.path(),
        r#"{"modules": [{"id": "x", "type": "wavetable"}], "connections": []}"#,
    );
    let wav = dir.path().join("out.wav");

    let output = patchwire_bin()
        .arg("render")
        .arg(&patch)
        .arg(&wav)
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(!wav.exists());
}

#[test]
fn render_rejects_bad_gate_syntax() {
    let dir = TempDir::new().unwrap();
    let patch = write_patch(dir.path(), GATED_PATCH);
    let output = patchwire_bin()
        .arg("render")
        .arg(&patch)
        .arg(dir.path().join("out.wav"))
        .args(["--gate", "keys0.5"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}
