use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use codespan_reporting::term::termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use serde::Deserialize;

use assembler::{Limits, MAX_DEPTH, StructuralError};
use blocks::{Context, SchemaRegistry};

const FIXTURE_SUFFIX: &str = ".test.json";
const DEFAULT_SCHEMAS: &str = "schemas.json";

#[derive(Debug, Deserialize)]
pub struct ExpectedError {
    /// Validation error kind, e.g. "MissingField".
    pub kind: String,

    /// Substring that must appear in the error message.
    #[serde(default)]
    pub contains: Option<String>,
}

/// TOML front matter of a `.test.json` fixture.
#[derive(Debug, Deserialize)]
pub struct FixtureConfig {
    #[serde(default)]
    pub description: Option<String>,

    /// Normalized schema file, relative to the fixture. When absent, the
    /// nearest `schemas.json` in the fixture's directory or above is used.
    #[serde(default)]
    pub schemas: Option<String>,

    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    #[serde(default)]
    pub expect_valid: Option<bool>,

    /// Exact validation errors, in order.
    #[serde(default)]
    pub expect_errors: Option<Vec<ExpectedError>>,

    /// Expected XML document (trimmed comparison).
    #[serde(default)]
    pub expect_xml: Option<String>,

    /// Serialization must fail with a message containing this substring.
    #[serde(default)]
    pub expect_structural_error: Option<String>,

    /// The tree JSON itself must fail to load.
    #[serde(default)]
    pub expect_load_error: bool,
}

fn default_max_depth() -> usize {
    MAX_DEPTH
}

/// Split a fixture into its front matter config and tree JSON.
fn parse_fixture(content: &str) -> Result<(FixtureConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}');

    let rest = content
        .strip_prefix("---")
        .ok_or("missing opening --- front matter delimiter")?;
    let rest = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest);

    let close = rest
        .find("\n---")
        .ok_or("missing closing --- front matter delimiter")?;
    let front = rest[..close].trim_end_matches('\r');
    let tree = &rest[close + 4..];

    let config: FixtureConfig =
        toml::from_str(front).map_err(|e| format!("TOML parse error: {}", e))?;
    Ok((config, tree))
}

fn find_schemas(fixture: &Path, config: &FixtureConfig) -> Result<PathBuf, String> {
    let dir = fixture.parent().unwrap_or_else(|| Path::new("."));
    if let Some(rel) = &config.schemas {
        return Ok(dir.join(rel));
    }
    dir.ancestors()
        .map(|d| d.join(DEFAULT_SCHEMAS))
        .find(|p| p.is_file())
        .ok_or_else(|| format!("no {} found for fixture", DEFAULT_SCHEMAS))
}

fn load_schemas(path: &Path) -> Result<SchemaRegistry, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read schemas '{}': {}", path.display(), e))?;
    SchemaRegistry::from_json(&text).map_err(|e| format!("bad schemas '{}': {}", path.display(), e))
}

pub struct FixtureResult {
    pub path: PathBuf,
    pub description: Option<String>,
    /// `None` on pass, the reason on failure.
    pub failure: Option<String>,
}

fn run_fixture(path: &Path) -> FixtureResult {
    let mut result = FixtureResult {
        path: path.to_path_buf(),
        description: None,
        failure: None,
    };

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            result.failure = Some(format!("cannot read file: {}", e));
            return result;
        }
    };
    let (config, tree_json) = match parse_fixture(&content) {
        Ok(pair) => pair,
        Err(e) => {
            result.failure = Some(format!("front matter error: {}", e));
            return result;
        }
    };
    result.description = config.description.clone();
    result.failure = check_fixture(path, &config, tree_json).err();
    result
}

/// Run every expectation the fixture declares; the first mismatch wins.
fn check_fixture(path: &Path, config: &FixtureConfig, tree_json: &str) -> Result<(), String> {
    let registry = load_schemas(&find_schemas(path, config)?)?;

    let tree = match (assembler::parse_tree(tree_json), config.expect_load_error) {
        (Ok(_), true) => return Err("expected the tree to fail to load, but it loaded".into()),
        (Err(_), true) => return Ok(()),
        (Err(e), false) => return Err(format!("unexpected load error: {}", e)),
        (Ok(tree), false) => tree,
    };

    let limits = Limits {
        max_depth: config.max_depth,
    };
    let errors = assembler::validate_in(&registry, &tree, Context::Root, limits);

    if let Some(expect_valid) = config.expect_valid {
        if expect_valid != errors.is_empty() {
            let actual: Vec<String> = errors.iter().map(|e| format!("  - {}", e)).collect();
            return Err(format!(
                "expected valid = {}, got {} error(s)\n{}",
                expect_valid,
                errors.len(),
                actual.join("\n")
            ));
        }
    }

    if let Some(expected) = &config.expect_errors {
        if expected.len() != errors.len() {
            let actual: Vec<String> = errors
                .iter()
                .map(|e| format!("  - {}: {}", e.kind, e))
                .collect();
            return Err(format!(
                "expected {} error(s), got {}\n{}",
                expected.len(),
                errors.len(),
                actual.join("\n")
            ));
        }
        for (i, (want, got)) in expected.iter().zip(&errors).enumerate() {
            if want.kind != got.kind.as_str() {
                return Err(format!("error[{}]: expected kind {}, got {}", i, want.kind, got.kind));
            }
            if let Some(needle) = &want.contains {
                if !got.message.contains(needle.as_str()) {
                    return Err(format!(
                        "error[{}]: expected message containing \"{}\", got: {}",
                        i, needle, got.message
                    ));
                }
            }
        }
    }

    if config.expect_xml.is_none() && config.expect_structural_error.is_none() {
        return Ok(());
    }

    match (assembler::serialize_with(&tree, limits), &config.expect_structural_error) {
        (Ok(_), Some(needle)) => Err(format!(
            "expected structural error containing \"{}\", but serialization succeeded",
            needle
        )),
        (Err(e), Some(needle)) => check_structural(&e, needle),
        (Err(e), None) => Err(format!("unexpected structural error: {}", e)),
        (Ok(xml), None) => match &config.expect_xml {
            Some(expected) if expected.trim() != xml.trim() => Err(format!(
                "XML mismatch\n  expected: {}\n  actual:   {}",
                expected.trim(),
                xml.trim()
            )),
            _ => Ok(()),
        },
    }
}

fn check_structural(error: &StructuralError, needle: &str) -> Result<(), String> {
    let message = error.to_string();
    if message.contains(needle) {
        Ok(())
    } else {
        Err(format!(
            "expected structural error containing \"{}\", got: {}",
            needle, message
        ))
    }
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Fixtures grouped by category (sub-directory relative to `root`, "" for
/// files directly in it). Categories and files are sorted.
fn discover(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect(root, root, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for path in entries.flatten().map(|entry| entry.path()) {
        if path.is_dir() {
            collect(&path, root, out);
            continue;
        }
        let is_fixture = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(FIXTURE_SUFFIX));
        if is_fixture {
            let category = path
                .parent()
                .and_then(|p| p.strip_prefix(root).ok())
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            out.entry(category).or_default().push(path);
        }
    }
}

pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }
    let categories = discover(path);
    if categories.is_empty() {
        eprintln!("no {} files found in {}", FIXTURE_SUFFIX, path.display());
        return;
    }
    eprintln!("available categories:");
    for (category, files) in &categories {
        let label = if category.is_empty() { "(root)" } else { category };
        eprintln!("  {} ({} fixtures)", label, files.len());
    }
}

// ---------------------------------------------------------------------------
// Running
// ---------------------------------------------------------------------------

fn select<'a>(
    all: &'a BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<&'a str, &'a Vec<PathBuf>> {
    if requested.is_empty() {
        return all.iter().map(|(k, v)| (k.as_str(), v)).collect();
    }
    let mut selected = BTreeMap::new();
    for req in requested {
        let req = req.trim_matches('/');
        let prefix = format!("{}/", req);
        let before = selected.len();
        for (category, files) in all {
            if category == req || category.starts_with(&prefix) {
                selected.insert(category.as_str(), files);
            }
        }
        if selected.len() == before {
            eprintln!("warning: category '{}' not found", req);
        }
    }
    selected
}

struct Console {
    out: StandardStream,
}

impl Console {
    fn new(no_color: bool) -> Self {
        let choice = if no_color {
            ColorChoice::Never
        } else {
            ColorChoice::Auto
        };
        Console {
            out: StandardStream::stderr(choice),
        }
    }

    fn styled(&mut self, text: &str, color: Option<Color>, bold: bool) {
        let mut spec = ColorSpec::new();
        spec.set_fg(color).set_bold(bold);
        let _ = self.out.set_color(&spec);
        let _ = write!(self.out, "{}", text);
        let _ = self.out.reset();
    }

    fn line(&mut self, text: &str) {
        let _ = writeln!(self.out, "{}", text);
    }

    fn outcome(&mut self, result: &FixtureResult) {
        let label = result.description.as_deref().unwrap_or_else(|| {
            result
                .path
                .file_name()
                .and_then(|s| s.to_str())
                .and_then(|s| s.strip_suffix(FIXTURE_SUFFIX))
                .unwrap_or("?")
        });
        let _ = write!(self.out, "  ");
        match result.failure {
            None => self.styled("PASS", Some(Color::Green), false),
            Some(_) => self.styled("FAIL", Some(Color::Red), false),
        }
        self.line(&format!("  {}", label));
    }
}

/// Run all fixtures under `path` (or a single fixture file). Returns the
/// process exit code: 0 when everything passes.
pub fn run_fixtures(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let mut console = Console::new(no_color);

    let all = if path.is_file() {
        BTreeMap::from([(String::new(), vec![path.to_path_buf()])])
    } else {
        discover(path)
    };
    if all.is_empty() {
        eprintln!("no {} files found in {}", FIXTURE_SUFFIX, path.display());
        return 1;
    }
    let selected = select(&all, categories);
    if selected.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    let mut passed = 0usize;
    let mut failures: Vec<FixtureResult> = Vec::new();

    for (category, files) in &selected {
        console.line("");
        let header = if category.is_empty() { "(root)" } else { category };
        console.styled(header, None, true);
        console.line("");

        for file in files.iter() {
            let result = run_fixture(file);
            console.outcome(&result);
            if result.failure.is_some() {
                failures.push(result);
            } else {
                passed += 1;
            }
        }
    }

    if !failures.is_empty() {
        console.line("");
        console.line("failures:");
        for failure in &failures {
            console.line("");
            console.line(&format!("  --- {} ---", failure.path.display()));
            for line in failure.failure.as_deref().unwrap_or("").lines() {
                console.line(&format!("  {}", line));
            }
        }
    }

    console.line("");
    let _ = write!(console.out, "fixture result: ");
    if failures.is_empty() {
        console.styled("ok", Some(Color::Green), false);
        console.line(&format!(". {} passed, 0 failed", passed));
        0
    } else {
        console.styled("FAILED", Some(Color::Red), false);
        console.line(&format!(
            ". {} passed, {} failed (of {})",
            passed,
            failures.len(),
            passed + failures.len()
        ));
        1
    }
}
