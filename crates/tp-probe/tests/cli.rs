//! End-to-end tests for the tp-probe binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn tp_probe() -> Command {
    Command::cargo_bin("tp-probe").unwrap()
}

#[test]
fn simple_probe_discovers_five_entities() {
    tp_probe()
        .args(["--probe", "simple", "discover"])
        .assert()
        .success()
        .stdout(predicate::str::contains("vm1-id"))
        .stdout(predicate::str::contains("dc1-id"));
}

#[test]
fn file_probe_discovers_a_toml_topology() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    write!(
        file,
        r#"
[[markets]]
main_market = true

[[markets.entities]]
type = "DataCenter"
uuid = "dc-1"
name = "east"

[[markets.entities.sold]]
type = "Space"
uuid = "c-1"
capacity = 300.0
used = 10.0

[[markets.entities]]
type = "PhysicalMachine"
uuid = "pm-1"
name = "host-a"

[[markets.entities.sold]]
type = "CPU"
uuid = "c-2"

[[markets.entities.bought]]
type = "Space"
consumes = "c-1"
"#
    )
    .unwrap();
    tp_probe()
        .args(["--probe", "file", "--target"])
        .arg(file.path())
        .arg("discover")
        .assert()
        .success()
        .stdout(predicate::str::contains("pm-1"))
        .stdout(predicate::str::contains("physical_machine"));
}

#[test]
fn file_probe_validates_a_readable_file() {
    let file = tempfile::Builder::new()
        .suffix(".json")
        .tempfile()
        .unwrap();
    tp_probe()
        .args(["--probe", "file", "--target"])
        .arg(file.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"ok\": true"));
}

#[test]
fn file_probe_validation_fails_for_missing_file() {
    tp_probe()
        .args([
            "--probe",
            "file",
            "--target",
            "/nonexistent/topology.toml",
            "validate",
        ])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("\"ok\": false"));
}

#[test]
fn discover_without_target_fails_for_file_probe() {
    tp_probe()
        .args(["--probe", "file", "discover"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("missing credential field"));
}

#[test]
fn supply_chain_lists_the_full_stack() {
    tp_probe()
        .args(["--probe", "file", "supply-chain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("virtual_machine"))
        .stdout(predicate::str::contains("disk_array"));
}

#[test]
fn account_definition_names_the_target_field() {
    tp_probe()
        .args(["--probe", "simple", "account-definition"])
        .assert()
        .success()
        .stdout(predicate::str::contains("targetIdentifier"))
        .stdout(predicate::str::contains("mandatory"));
}

#[test]
fn storage_probe_reads_properties_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("array-9.toml"), "lun_uuid = \"cafebabe\"\n").unwrap();
    tp_probe()
        .args(["--probe", "storage", "--target", "array-9", "--properties-dir"])
        .arg(dir.path())
        .arg("discover")
        .assert()
        .success()
        .stdout(predicate::str::contains("cafebabe"));
}
