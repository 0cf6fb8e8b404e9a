//! Snapshot tests for command output

use std::process::Command;

fn tfhelm_stdout(args: &[&str]) -> String {
    let output = Command::new(env!("CARGO_BIN_EXE_tfhelm"))
        .args(args)
        .env_remove("TFHELM_LOG")
        .output()
        .expect("Failed to execute tfhelm");
    assert!(output.status.success());
    String::from_utf8_lossy(&output.stdout).trim_end().to_string()
}

#[test]
fn test_values_json_output() {
    let out = tfhelm_stdout(&[
        "values",
        "--set",
        "app.name=web",
        "--set-sensitive",
        "app.token=abc123",
        "--json",
    ]);

    insta::assert_snapshot!(out, @r#"
    {
      "app": {
        "name": "web",
        "token": "(sensitive value)"
      }
    }
    "#);
}

#[test]
fn test_redact_text_output() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "token=secretValue").unwrap();

    let out = tfhelm_stdout(&["redact", path.to_str().unwrap(), "-s", "secretValue"]);
    insta::assert_snapshot!(out, @"token=(sensitive value 916925d896d4e9b9)");
}
