use std::process::Command;

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "treasure-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

#[test]
fn cli_list_scenarios_writes_output() {
    let exe = env!("CARGO_BIN_EXE_treasure-tester");
    let output_path = temp_path("list");
    let status = Command::new(exe)
        .args(["--list-scenarios", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("Available scenarios"));
    assert!(content.contains("event-caps"));
}

#[test]
fn cli_runs_event_caps_with_json_report() {
    let exe = env!("CARGO_BIN_EXE_treasure-tester");
    let output_path = temp_path("run");
    let output = Command::new(exe)
        .args([
            "--report",
            "json",
            "--scenarios",
            "event-caps",
            "--iterations",
            "1",
            "--seeds",
            "1,2",
            "--output",
        ])
        .arg(&output_path)
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Treasure Automated Tester"));

    let content = std::fs::read_to_string(output_path).expect("read report");
    let json_end = content.rfind(']').expect("json array");
    let results: serde_json::Value =
        serde_json::from_str(&content[..=json_end]).expect("report parses");
    assert_eq!(results.as_array().map(Vec::len), Some(2));
    assert_eq!(results[0]["passed"], true);
}

#[test]
fn cli_rejects_bad_seed() {
    let exe = env!("CARGO_BIN_EXE_treasure-tester");
    let output = Command::new(exe)
        .args(["--seeds", "not-a-number"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
}
