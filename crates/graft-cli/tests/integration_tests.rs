//! Integration tests for the `graft` binary.

use std::{fs, path::PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const RULES: &str = r#"
[configuration]
date-format = "%Y-%m-%d"

[[types]]
name = "Person"
fields = [
    { name = "name", type = "string" },
    { name = "age", type = "string" },
    { name = "born", type = "date" },
    { name = "tags", type = "list<string>" },
]

[[types]]
name = "PersonDto"
fields = [
    { name = "fullName", type = "string" },
    { name = "age", type = "int" },
    { name = "born", type = "string" },
    { name = "tags", type = "list<string>" },
]

[[mappings]]
a = "Person"
b = "PersonDto"

[[mappings.fields]]
a = "name"
b = "fullName"
converter = "uppercase"
one-way = true
"#;

const BROKEN: &str = r#"
[[mappings]]
a = "Person"
b = "PersonDto"
map-id = "broken"

[[mappings.fields]]
a = "nickname"
b = "fullName"
"#;

const ADA: &str = r#"{ "name": "ada", "age": "36", "born": "1815-12-10", "tags": ["math"] }"#;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("people.toml"), RULES).unwrap();
        Self { dir }
    }

    fn rules(&self) -> PathBuf {
        self.dir.path().join("people.toml")
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }
}

fn graft() -> Command {
    let mut cmd = Command::cargo_bin("graft").unwrap();
    cmd.env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

fn stdout_json(output: &[u8]) -> serde_json::Value {
    serde_json::from_slice(output).unwrap()
}

// ── basics ────────────────────────────────────────────────────────────────────

#[test]
fn help_lists_commands() {
    graft()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("plans"))
        .stdout(predicate::str::contains("map"));
}

#[test]
fn version_flag() {
    graft()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn unknown_flag_is_usage_error() {
    graft().args(["check", "--bogus"]).assert().code(2);
}

// ── check ─────────────────────────────────────────────────────────────────────

#[test]
fn check_reports_both_directions() {
    let fx = Fixture::new();
    graft()
        .arg("check")
        .arg(fx.rules())
        .assert()
        .success()
        .stdout(predicate::str::contains("Person -> PersonDto"))
        .stdout(predicate::str::contains("PersonDto -> Person"));
}

#[test]
fn check_json_report() {
    let fx = Fixture::new();
    let output = graft()
        .args(["--output-format", "json", "check"])
        .arg(fx.rules())
        .output()
        .unwrap();
    assert!(output.status.success());

    let report = stdout_json(&output.stdout);
    assert_eq!(report["files"], 1);
    assert_eq!(report["mappings"].as_array().unwrap().len(), 2);
    assert_eq!(report["mappings"][0]["ok"], true);
}

#[test]
fn check_fails_on_unresolvable_mapping() {
    let fx = Fixture::new();
    fx.write("broken.toml", BROKEN);

    graft()
        .arg("check")
        .arg(fx.dir.path())
        .assert()
        .code(4)
        .stdout(predicate::str::contains("Person -> PersonDto"))
        .stderr(predicate::str::contains("nickname"))
        .stderr(predicate::str::contains("failed to resolve"));
}

#[test]
fn check_missing_rules_is_not_found() {
    graft()
        .args(["check", "/definitely/not/here"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn check_without_rules_suggests_config() {
    let fx = Fixture::new();
    let config = fx.write("config.toml", "");
    graft()
        .arg("--config")
        .arg(config)
        .arg("check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("GRAFT_MAPPING__RULES"));
}

#[test]
fn rules_path_from_environment() {
    let fx = Fixture::new();
    let config = fx.write("config.toml", "");
    graft()
        .env("GRAFT_MAPPING__RULES", fx.rules())
        .arg("--config")
        .arg(config)
        .arg("check")
        .assert()
        .success();
}

#[test]
fn invalid_mapping_file_names_the_file() {
    let fx = Fixture::new();
    fx.write("bad.toml", "[[mappings]\n");

    graft()
        .arg("check")
        .arg(fx.dir.path())
        .assert()
        .code(4)
        .stderr(predicate::str::contains("bad.toml"));
}

// ── plans ─────────────────────────────────────────────────────────────────────

#[test]
fn plans_print_bindings() {
    let fx = Fixture::new();
    graft()
        .arg("plans")
        .arg(fx.rules())
        .args(["--from", "Person", "--to", "PersonDto"])
        .assert()
        .success()
        .stdout(predicate::str::contains("converter=uppercase"))
        .stdout(predicate::str::contains("implicit"));
}

#[test]
fn plans_as_json() {
    let fx = Fixture::new();
    let output = graft()
        .args(["--output-format", "json", "plans"])
        .arg(fx.rules())
        .output()
        .unwrap();
    assert!(output.status.success());

    let plans = stdout_json(&output.stdout);
    let forward = &plans[0];
    assert_eq!(forward["source"], "Person");
    assert_eq!(forward["bindings"][0]["destination"], "fullName");
    assert_eq!(forward["bindings"][0]["converter"], "uppercase");

    // The reverse direction never writes back into `name`.
    let reverse = &plans[1];
    let destinations: Vec<_> = reverse["bindings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["destination"].as_str().unwrap().to_owned())
        .collect();
    assert!(!destinations.contains(&"name".to_owned()));
}

// ── map ───────────────────────────────────────────────────────────────────────

#[test]
fn map_file_input() {
    let fx = Fixture::new();
    let input = fx.write("ada.json", ADA);

    let output = graft()
        .arg("map")
        .arg(fx.rules())
        .args(["--from", "Person", "--to", "PersonDto", "--input"])
        .arg(input)
        .output()
        .unwrap();
    assert!(output.status.success());

    let dto = stdout_json(&output.stdout);
    assert_eq!(
        dto,
        serde_json::json!({ "fullName": "ADA", "age": 36, "born": "1815-12-10", "tags": ["math"] })
    );
}

#[test]
fn map_stdin_input_compact() {
    let fx = Fixture::new();
    graft()
        .arg("map")
        .arg(fx.rules())
        .args(["--from", "Person", "--to", "PersonDto", "--compact"])
        .write_stdin(ADA)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""fullName":"ADA""#));
}

#[test]
fn map_reverse_direction() {
    let fx = Fixture::new();
    let output = graft()
        .arg("map")
        .arg(fx.rules())
        .args(["--from", "PersonDto", "--to", "Person"])
        .write_stdin(r#"{ "fullName": "ADA", "age": 36 }"#)
        .output()
        .unwrap();
    assert!(output.status.success());

    let person = stdout_json(&output.stdout);
    assert_eq!(person["age"], "36");
    assert!(person["name"].is_null());
}

#[test]
fn map_conversion_failure_prints_partial_result() {
    let fx = Fixture::new();
    graft()
        .arg("map")
        .arg(fx.rules())
        .args(["--from", "Person", "--to", "PersonDto"])
        .write_stdin(r#"{ "name": "ada", "age": "thirty-six" }"#)
        .assert()
        .code(2)
        .stdout(predicate::str::contains("ADA"))
        .stderr(predicate::str::contains("age"));
}

#[test]
fn strict_flag_aborts_without_partial_output() {
    let fx = Fixture::new();
    graft()
        .arg("map")
        .arg(fx.rules())
        .args(["--from", "Person", "--to", "PersonDto", "--strict"])
        .write_stdin(r#"{ "name": "ada", "age": "thirty-six" }"#)
        .assert()
        .code(2)
        .stdout(predicate::str::contains("ADA").not())
        .stderr(predicate::str::contains("age"));
}

#[test]
fn strict_from_config_applies_to_map() {
    let fx = Fixture::new();
    let config = fx.write("config.toml", "[mapping]\nstrict = true\n");
    graft()
        .arg("--config")
        .arg(config)
        .arg("map")
        .arg(fx.rules())
        .args(["--from", "Person", "--to", "PersonDto"])
        .write_stdin(r#"{ "name": "ada", "age": "thirty-six" }"#)
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty());
}

#[test]
fn map_unknown_type_is_not_found() {
    let fx = Fixture::new();
    graft()
        .arg("map")
        .arg(fx.rules())
        .args(["--from", "Person", "--to", "Ghost"])
        .write_stdin(ADA)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Ghost"));
}

#[test]
fn map_rejects_fields_outside_the_type() {
    let fx = Fixture::new();
    graft()
        .arg("map")
        .arg(fx.rules())
        .args(["--from", "Person", "--to", "PersonDto"])
        .write_stdin(r#"{ "nickname": "ada" }"#)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("nickname"));
}

#[test]
fn map_empty_input_is_rejected() {
    let fx = Fixture::new();
    graft()
        .arg("map")
        .arg(fx.rules())
        .args(["--from", "Person", "--to", "PersonDto"])
        .write_stdin("   ")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("empty"));
}

// ── config & completions ──────────────────────────────────────────────────────

#[test]
fn config_get_reads_the_file() {
    let fx = Fixture::new();
    let config = fx.write("config.toml", "[mapping]\nrules = \"./mappings\"\n");
    graft()
        .arg("--config")
        .arg(config)
        .args(["config", "get", "mapping.rules"])
        .assert()
        .success()
        .stdout(predicate::str::contains("./mappings"));
}

#[test]
fn config_unknown_key_is_configuration_error() {
    let fx = Fixture::new();
    let config = fx.write("config.toml", "");
    graft()
        .arg("--config")
        .arg(config)
        .args(["config", "get", "nope"])
        .assert()
        .code(4);
}

#[test]
fn missing_explicit_config_file_fails() {
    graft()
        .args(["--config", "/definitely/not/here.toml", "config", "list"])
        .assert()
        .code(4);
}

#[test]
fn config_path_prints_a_path() {
    graft()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("toml"));
}

#[test]
fn completions_for_bash() {
    graft()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("graft"));
}
