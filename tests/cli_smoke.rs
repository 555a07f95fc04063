//! Smoke tests for the `tacopt` binary's stdin/stdout contract.

use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use serde_json::Value;

fn tacopt_cmd() -> Command {
    Command::cargo_bin("tacopt").expect("binary built")
}

const DEAD_CODE_PROGRAM: &str = r#"{
    "functions": [
        {
            "name": "main",
            "instrs": [
                {"op": "const", "dest": "a", "type": "int", "value": 1},
                {"op": "const", "dest": "unused", "type": "int", "value": 2},
                {"op": "print", "args": ["a"]},
                {"op": "ret"}
            ]
        }
    ]
}"#;

#[test]
fn running_dce_trivial_drops_the_unused_constant_from_stdout() {
    tacopt_cmd()
        .arg("dce-trivial")
        .write_stdin(DEAD_CODE_PROGRAM)
        .assert()
        .success()
        .stdout(contains("\"unused\"").not());
}

#[test]
fn the_default_pipeline_produces_a_still_valid_program_document() {
    let output = tacopt_cmd()
        .arg("--pipeline")
        .arg("default")
        .write_stdin(DEAD_CODE_PROGRAM)
        .output()
        .expect("ran");
    assert!(output.status.success());
    let value: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert!(value["functions"][0]["instrs"].is_array());
}

#[test]
fn an_unknown_pass_name_is_rejected_with_a_nonzero_exit() {
    tacopt_cmd().arg("not-a-real-pass").write_stdin(DEAD_CODE_PROGRAM).assert().failure();
}

#[test]
fn malformed_input_exits_with_status_2() {
    tacopt_cmd()
        .arg("dce-trivial")
        .write_stdin(r#"{"functions":[{"name":"f","instrs":[{"op":"frobnicate"}]}]}"#)
        .assert()
        .code(2);
}

#[test]
fn pass_and_pipeline_flags_together_are_rejected_by_the_cli() {
    tacopt_cmd()
        .arg("lvn")
        .arg("--pipeline")
        .arg("default")
        .write_stdin(DEAD_CODE_PROGRAM)
        .assert()
        .failure();
}
