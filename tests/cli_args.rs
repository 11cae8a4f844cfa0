//! CLI surface tests for the lanpulse binary.
use std::process::Command;

#[test]
fn help_lists_the_scanner_flags() {
    let output = Command::new(env!("CARGO_BIN_EXE_lanpulse"))
        .arg("--help")
        .output()
        .expect("run lanpulse --help");
    assert!(output.status.success());
    let text = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    for flag in
        ["--subnet", "--community", "--interval", "--once", "--api-url", "--api-key", "--config", "--verbose"]
    {
        assert!(text.contains(flag), "help text missing {flag}\n{text}");
    }
}

#[test]
fn rejects_unknown_flags() {
    let output = Command::new(env!("CARGO_BIN_EXE_lanpulse"))
        .arg("--frobnicate")
        .output()
        .expect("run lanpulse");
    assert!(!output.status.success());
}

#[test]
fn malformed_subnet_fails_before_the_loop_starts() {
    let output = Command::new(env!("CARGO_BIN_EXE_lanpulse"))
        .args(["--once", "--subnet", "not-a-subnet"])
        .output()
        .expect("run lanpulse");
    assert!(!output.status.success());
    let err = String::from_utf8_lossy(&output.stderr);
    assert!(err.contains("invalid subnet"), "unexpected stderr: {err}");
}
