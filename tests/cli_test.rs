//! CLI integration tests for sf-schema binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("sf-schema"))
}

// Helper to create a temp input file
fn write_temp_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

const USER_SCHEMA: &str = r#"{
    "type": "object",
    "properties": {
        "name": { "type": "string" },
        "role": { "type": "string", "enum": ["admin", "user"] },
        "notes": { "type": "string", "ui": { "hidden": true } }
    },
    "required": ["name", "notes"]
}"#;

mod resolve_command {
    use super::*;

    #[test]
    fn basic_resolve() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "schema.json", USER_SCHEMA);

        cmd()
            .args(["resolve", schema.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""required":["name"]"#))
            .stdout(predicate::str::contains(r#""$role":{"#))
            .stdout(predicate::str::contains(r#""widget":"select""#));
    }

    #[test]
    fn resolve_with_overlay() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "schema.json", USER_SCHEMA);
        let ui = write_temp_file(&dir, "ui.json", r#"{"$name": {"widget": "autocomplete"}}"#);

        let output = cmd()
            .args([
                "resolve",
                schema.to_str().unwrap(),
                "--ui",
                ui.to_str().unwrap(),
            ])
            .output()
            .unwrap();
        assert!(output.status.success());

        let resolved: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(resolved["ui"]["$name"]["widget"], "autocomplete");
        assert_eq!(resolved["ui"]["$role"]["widget"], "select");
    }

    #[test]
    fn resolve_with_pretty() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(
            &dir,
            "schema.json",
            r#"{"type":"object","properties":{"id":{"type":"string"}}}"#,
        );

        cmd()
            .args(["resolve", schema.to_str().unwrap(), "--pretty"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\n  "));
    }

    #[test]
    fn resolve_schema_only() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "schema.json", USER_SCHEMA);

        let output = cmd()
            .args(["resolve", schema.to_str().unwrap(), "--schema-only"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let resolved: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(resolved["type"], "object");
        assert!(resolved.get("ui").is_none());
        assert!(resolved["properties"]["notes"].get("ui").is_none());
    }

    #[test]
    fn resolve_vertical_layout() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "schema.json", USER_SCHEMA);

        let output = cmd()
            .args(["resolve", schema.to_str().unwrap(), "--layout", "vertical"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let resolved: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert!(resolved["ui"]["$name"].get("spanLabel").is_none());
        assert!(resolved["ui"]["$name"].get("spanControl").is_none());
    }

    #[test]
    fn resolve_invalid_layout() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "schema.json", USER_SCHEMA);

        cmd()
            .args(["resolve", schema.to_str().unwrap(), "--layout", "diagonal"])
            .assert()
            .failure();
    }

    #[test]
    fn resolve_with_data_selects_branch() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(
            &dir,
            "schema.json",
            r#"{
                "type": "object",
                "properties": { "kind": { "type": "string", "enum": ["person", "company"] } },
                "if": { "properties": { "kind": { "const": "company" } } },
                "then": { "properties": { "vat": { "type": "string" } } },
                "else": { "properties": { "birthday": { "type": "string", "format": "date" } } }
            }"#,
        );
        let data = write_temp_file(&dir, "data.json", r#"{"kind": "company"}"#);

        let output = cmd()
            .args([
                "resolve",
                schema.to_str().unwrap(),
                "--data",
                data.to_str().unwrap(),
            ])
            .output()
            .unwrap();
        assert!(output.status.success());

        let resolved: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert!(resolved["ui"].get("$vat").is_some());
        assert!(resolved["ui"].get("$birthday").is_none());
    }

    #[test]
    fn resolve_with_options_file() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "schema.json", USER_SCHEMA);
        let options = write_temp_file(&dir, "options.json", r#"{"onlyVisual": true}"#);

        let output = cmd()
            .args([
                "resolve",
                schema.to_str().unwrap(),
                "--options",
                options.to_str().unwrap(),
            ])
            .output()
            .unwrap();
        assert!(output.status.success());

        let resolved: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(resolved["ui"]["$name"]["onlyVisual"], true);
    }

    #[test]
    fn resolve_with_i18n_dictionary() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(
            &dir,
            "schema.json",
            r#"{"type":"object","properties":{"name":{"type":"string","ui":{"i18n":"user.name"}}}}"#,
        );
        let dict = write_temp_file(&dir, "en.json", r#"{"user.name": "Full name"}"#);

        let output = cmd()
            .args([
                "resolve",
                schema.to_str().unwrap(),
                "--i18n",
                dict.to_str().unwrap(),
                "--schema-only",
            ])
            .output()
            .unwrap();
        assert!(output.status.success());

        let resolved: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(resolved["properties"]["name"]["title"], "Full name");
    }

    #[test]
    fn resolve_to_output_file() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "schema.json", USER_SCHEMA);
        let out = dir.path().join("resolved.json");

        cmd()
            .args([
                "resolve",
                schema.to_str().unwrap(),
                "--output",
                out.to_str().unwrap(),
            ])
            .assert()
            .success();

        let content = fs::read_to_string(&out).unwrap();
        assert!(content.contains(r#""$name""#));
    }

    #[test]
    fn resolve_file_not_found() {
        cmd()
            .args(["resolve", "/nonexistent/form.json"])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("file not found"));
    }

    #[test]
    fn resolve_invalid_json() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "schema.json", "not json");

        cmd()
            .args(["resolve", schema.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("invalid JSON"));
    }

    #[test]
    fn resolve_missing_definition() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(
            &dir,
            "schema.json",
            r##"{"type":"object","properties":{"user":{"$ref":"#/definitions/user"}}}"##,
        );

        cmd()
            .args(["resolve", schema.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("#/definitions/user"));
    }

    #[test]
    fn resolve_bad_overlay_entry() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "schema.json", USER_SCHEMA);
        let ui = write_temp_file(&dir, "ui.json", r#"{"$name": 42}"#);

        cmd()
            .args([
                "resolve",
                schema.to_str().unwrap(),
                "--ui",
                ui.to_str().unwrap(),
            ])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("invalid overlay at /$name"));
    }

    #[test]
    fn verbose_logs_to_stderr() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "schema.json", USER_SCHEMA);

        cmd()
            .env_remove("RUST_LOG")
            .args(["-v", "resolve", schema.to_str().unwrap()])
            .assert()
            .success()
            .stderr(predicate::str::contains("resolved node"));
    }
}

mod validate_command {
    use super::*;

    #[test]
    fn validate_valid_data() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "schema.json", USER_SCHEMA);
        let data = write_temp_file(&dir, "data.json", r#"{"name": "Ada"}"#);

        cmd()
            .args([
                "validate",
                data.to_str().unwrap(),
                "--schema",
                schema.to_str().unwrap(),
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("Valid"));
    }

    #[test]
    fn validate_invalid_data() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "schema.json", USER_SCHEMA);
        let data = write_temp_file(&dir, "data.json", r#"{"role": "owner"}"#);

        cmd()
            .args([
                "validate",
                data.to_str().unwrap(),
                "--schema",
                schema.to_str().unwrap(),
            ])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Validation failed"));
    }

    #[test]
    fn validate_json_output() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "schema.json", USER_SCHEMA);
        let data = write_temp_file(&dir, "data.json", r#"{}"#);

        let output = cmd()
            .args([
                "validate",
                data.to_str().unwrap(),
                "--schema",
                schema.to_str().unwrap(),
                "--json",
            ])
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(1));

        let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(report["valid"], false);
        assert_eq!(report["errors"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn validate_hidden_by_overlay_not_required() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "schema.json", USER_SCHEMA);
        let ui = write_temp_file(&dir, "ui.json", r#"{"$name": {"hidden": true}}"#);
        let data = write_temp_file(&dir, "data.json", r#"{}"#);

        cmd()
            .args([
                "validate",
                data.to_str().unwrap(),
                "--schema",
                schema.to_str().unwrap(),
                "--ui",
                ui.to_str().unwrap(),
            ])
            .assert()
            .success();
    }

    #[test]
    fn validate_data_not_found() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "schema.json", USER_SCHEMA);

        cmd()
            .args([
                "validate",
                "/nonexistent/data.json",
                "--schema",
                schema.to_str().unwrap(),
                "--json",
            ])
            .assert()
            .code(3)
            .stdout(predicate::str::contains(r#""valid":false"#));
    }
}
