use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const BIN: &str = env!("CARGO_BIN_EXE_blocktree");

const DESCRIPTORS: &str = r#"[
  { "type": "text_literal", "category": "Text", "fields": ["TEXT"], "python_sample": "'abc'" },
  { "type": "text_print", "category": "Text", "python_sample": "" },
  { "type": "math_number", "fields": ["NUM"], "python_sample": "0" }
]"#;

const HELLO: &str = r#"{
  "type": "text_print",
  "value_inputs": { "TEXT": { "type": "text_literal", "fields": { "TEXT": "Hello" } } }
}"#;

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn schemas_file() -> PathBuf {
    fixtures_dir().join("schemas.json")
}

fn blocktree() -> Command {
    let mut cmd = Command::new(BIN);
    cmd.env_remove("BLOCKTREE_SCHEMAS").env_remove("RUST_LOG").arg("--no-color");
    cmd
}

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn assemble_writes_document() {
    let dir = tempfile::tempdir().unwrap();
    let tree = write(dir.path(), "tree.json", HELLO);
    let out = dir.path().join("nested/out.xml");

    let output = blocktree()
        .arg("assemble")
        .arg(&tree)
        .arg(&out)
        .arg("--schemas")
        .arg(schemas_file())
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let xml = std::fs::read_to_string(&out).unwrap();
    assert!(xml.starts_with("<xml xmlns=\"https://developers.google.com/blockly/xml\">"));
    assert!(xml.contains("<field name=\"TEXT\">Hello</field>"));
}

#[test]
fn assemble_rejects_unknown_type() {
    let dir = tempfile::tempdir().unwrap();
    let tree = write(dir.path(), "tree.json", r#"{ "type": "no_such_block" }"#);
    let out = dir.path().join("out.xml");

    let output = blocktree()
        .arg("assemble")
        .arg(&tree)
        .arg(&out)
        .arg("--schemas")
        .arg(schemas_file())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Unknown block type: no_such_block"));
    assert!(!out.exists());
}

#[test]
fn implicit_assemble_with_env_schemas() {
    let dir = tempfile::tempdir().unwrap();
    let tree = write(dir.path(), "tree.json", HELLO);
    let out = dir.path().join("out.xml");

    let output = Command::new(BIN)
        .env("BLOCKTREE_SCHEMAS", schemas_file())
        .env_remove("RUST_LOG")
        .arg(&tree)
        .arg(&out)
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(std::fs::read_to_string(&out).unwrap().contains("text_print"));
}

#[test]
fn implicit_assemble_after_schema_flag() {
    let dir = tempfile::tempdir().unwrap();
    let tree = write(dir.path(), "tree.json", HELLO);
    let out = dir.path().join("out.xml");

    let output = blocktree()
        .arg("--schemas")
        .arg(schemas_file())
        .arg(&tree)
        .arg(&out)
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(std::fs::read_to_string(&out).unwrap().contains("text_literal"));
}

#[test]
fn validate_json_report() {
    let dir = tempfile::tempdir().unwrap();
    let tree = write(
        dir.path(),
        "tree.json",
        r#"{ "type": "text_print", "fields": { "EXTRA": "x" } }"#,
    );

    let output = blocktree()
        .arg("validate")
        .arg(&tree)
        .arg("--schemas")
        .arg(schemas_file())
        .arg("--json")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["valid"], false);
    let kinds: Vec<&str> = report["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, ["ExtraField", "MissingValueInput"]);
    assert_eq!(report["errors"][1]["slot"], "TEXT");
}

#[test]
fn validate_with_raw_descriptors() {
    let dir = tempfile::tempdir().unwrap();
    let tree = write(dir.path(), "tree.json", HELLO);
    let descriptors = write(dir.path(), "descriptors.json", DESCRIPTORS);

    let output = blocktree()
        .arg("validate")
        .arg(&tree)
        .arg("--descriptors")
        .arg(&descriptors)
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("is valid"));
}

#[test]
fn validate_needs_a_schema_source() {
    let dir = tempfile::tempdir().unwrap();
    let tree = write(dir.path(), "tree.json", HELLO);

    let output = blocktree().arg("validate").arg(&tree).output().unwrap();

    assert!(!output.status.success());
}

#[test]
fn malformed_tree_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let tree = write(dir.path(), "tree.json", "{ \"type\": \"text_print\",\n  \"fields\": [1] }");

    let output = blocktree()
        .arg("validate")
        .arg(&tree)
        .arg("--schemas")
        .arg(schemas_file())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("cannot parse"));
}

#[test]
fn normalize_prints_schemas() {
    let dir = tempfile::tempdir().unwrap();
    let descriptors = write(dir.path(), "descriptors.json", DESCRIPTORS);

    let output = blocktree().arg("normalize").arg(&descriptors).output().unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let schemas: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let schemas = schemas.as_array().unwrap();
    assert_eq!(schemas.len(), 3);
    assert_eq!(schemas[0]["kind"], "expression");
    assert_eq!(schemas[0]["fields"]["TEXT"], "<value>");
    // Empty sample, but the override forces print to a statement with a TEXT input.
    assert_eq!(schemas[1]["kind"], "statement");
    assert_eq!(schemas[1]["value_inputs"]["TEXT"], "<expression>");
}

#[test]
fn normalize_output_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let descriptors = write(dir.path(), "descriptors.json", DESCRIPTORS);
    let schemas = dir.path().join("schemas.json");
    let tree = write(dir.path(), "tree.json", HELLO);

    let output = blocktree()
        .arg("normalize")
        .arg(&descriptors)
        .arg("-o")
        .arg(&schemas)
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let output = blocktree()
        .arg("validate")
        .arg(&tree)
        .arg("--schemas")
        .arg(&schemas)
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
}

#[test]
fn audit_flags_unknown_types() {
    let dir = tempfile::tempdir().unwrap();
    let markup = write(
        dir.path(),
        "program.xml",
        r#"<xml><block type="text_print"><value name="TEXT"><block type="mystery_block"></block></value></block></xml>"#,
    );

    let output = blocktree()
        .arg("audit")
        .arg(&markup)
        .arg("--schemas")
        .arg(schemas_file())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("unsupported block detected: mystery_block"));
}

#[test]
fn fixture_suite_passes() {
    let output = blocktree().arg("test").arg(fixtures_dir()).output().unwrap();

    let err = stderr(&output);
    assert!(output.status.success(), "fixture failures:\n{}", err);
    assert!(err.contains("0 failed"));
}

#[test]
fn fixture_category_filter() {
    let output = blocktree()
        .arg("test")
        .arg(fixtures_dir())
        .arg("--category")
        .arg("context")
        .output()
        .unwrap();

    let err = stderr(&output);
    assert!(output.status.success(), "fixture failures:\n{}", err);
    assert!(err.contains("context"));
    assert!(!err.contains("core"));
}
