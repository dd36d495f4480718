use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

mod common;

#[test]
fn test_malformed_and_failing_commands_are_skipped() {
    let first = common::checkout_line(1, 1, 1, "10.00", "10.00");
    let mismatched = common::checkout_line(1, 1, 1, "10.00", "99.00");
    let unknown_product = common::checkout_line(1, 42, 1, "10.00", "10.00");
    let second = common::checkout_line(2, 2, 3, "5.00", "15.00");
    let commands = common::write_lines(&[
        &first,
        "{\"op\":\"launch_rocket\"}",
        &mismatched,
        "",
        &unknown_product,
        "{\"op\":\"pay\",\"user_id\":2,\"order_id\":1,\"token\":\"tok_visa\"}",
        "{\"op\":\"set_status\",\"admin_id\":1,\"order_id\":1,\"status\":\"LOST\"}",
        &second,
    ]);

    let mut cmd = Command::new(cargo_bin!("order-workflow"));
    cmd.arg(commands.path())
        .arg("--catalog")
        .arg(common::catalog_fixture());

    let output = cmd.output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let rows: Vec<&str> = stdout.lines().skip(1).collect();
    assert_eq!(rows.len(), 2);
    // The stranger's payment attempt never reached order 1.
    assert!(rows[0].starts_with("1,") && rows[0].contains(",1,PENDING,PENDING,10.00,1,"));
    assert!(rows[1].starts_with("2,") && rows[1].contains(",2,PENDING,PENDING,15.00,3,"));
}

#[test]
fn test_failures_are_logged_to_stderr() {
    let commands = common::write_lines(&["not json at all"]);

    let mut cmd = Command::new(cargo_bin!("order-workflow"));
    cmd.env_remove("RUST_LOG")
        .arg(commands.path())
        .arg("--catalog")
        .arg(common::catalog_fixture());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("id,order_number"))
        .stderr(predicate::str::contains("skipping unreadable command"));
}

#[test]
fn test_missing_input_file_fails() {
    let mut cmd = Command::new(cargo_bin!("order-workflow"));
    cmd.arg("tests/fixtures/does_not_exist.jsonl")
        .arg("--catalog")
        .arg(common::catalog_fixture());

    cmd.assert().failure();
}
