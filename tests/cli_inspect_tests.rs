//! End-to-end tests for `zmk-kanata inspect`.
#![allow(unused_variables)] // Temp dirs must be kept alive even if not directly accessed

use std::process::Command;

mod fixtures;

use fixtures::*;

/// Path to the zmk-kanata binary
fn zmk_kanata_bin() -> &'static str {
    env!("CARGO_BIN_EXE_zmk-kanata")
}

#[test]
fn test_inspect_json() {
    let (keymap_path, keymap_temp) = create_temp_keymap(FULL_KEYMAP);

    let output = Command::new(zmk_kanata_bin())
        .args(["inspect", arg(&keymap_path), "--no-preprocess", "--json"])
        .output()
        .expect("Failed to execute command");

    assert_eq!(
        output.status.code(),
        Some(0),
        "Should succeed. stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    let result: serde_json::Value =
        serde_json::from_str(&stdout).expect("Should parse JSON output");

    let layers = result["config"]["layers"].as_array().unwrap();
    assert_eq!(layers.len(), 2);
    assert_eq!(layers[0]["name"], "default_layer");
    assert_eq!(layers[0]["bindings"].as_array().unwrap().len(), 6);
    assert_eq!(layers[1]["index"], 1);

    let behaviors = &result["config"]["behaviors"];
    assert_eq!(behaviors["hm"]["type"], "hold-tap");
    assert_eq!(behaviors["hm"]["flavor"], "balanced");
    assert_eq!(behaviors["td_esc"]["type"], "tap-dance");
    assert_eq!(behaviors["hello"]["type"], "macro");
    assert_eq!(behaviors["combo_esc"]["type"], "combo");

    assert_eq!(result["config"]["global_settings"]["tap_time_ms"], 200);
    assert!(result["error_report"]["total"].is_number());
}

#[test]
fn test_inspect_plain() {
    let (keymap_path, keymap_temp) = create_temp_keymap(BASIC_KEYMAP);

    let output = Command::new(zmk_kanata_bin())
        .args(["inspect", arg(&keymap_path), "--no-preprocess"])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(0));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Global settings: tap-time 200ms, hold-time 250ms"));
    assert!(stdout.contains("Layers (2):"));
    assert!(stdout.contains("default"));
    assert!(stdout.contains("\"Base\""));
    assert!(stdout.contains("6 keys, 2 rows"));
    assert!(stdout.contains("Behaviors (0):"));
    assert!(stdout.contains("Diagnostics: 0 total"));
}

#[test]
fn test_inspect_reports_diagnostics() {
    let (keymap_path, keymap_temp) = create_temp_keymap(UNKNOWN_BEHAVIOR_KEYMAP);

    let output = Command::new(zmk_kanata_bin())
        .args(["inspect", arg(&keymap_path), "--no-preprocess"])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Diagnostics: 1 total, 1 warnings"));
    assert!(stdout.contains("&bogus"));
}

#[test]
fn test_inspect_nonexistent_file() {
    let output = Command::new(zmk_kanata_bin())
        .args([
            "inspect",
            "/tmp/nonexistent_zmk_kanata_keymap_xyz.keymap",
            "--no-preprocess",
        ])
        .output()
        .expect("Failed to execute command");

    assert_eq!(
        output.status.code(),
        Some(1),
        "Nonexistent file should exit with code 1"
    );
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error:"));
}

#[test]
fn test_inspect_requires_input() {
    let output = Command::new(zmk_kanata_bin())
        .args(["inspect"])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(2), "clap usage errors exit with 2");
}
