mod fixtures;
mod report;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use assembler::{AssembleError, Limits, MAX_DEPTH};
use blocks::{BlockSchema, ProgramNode, RawBlockDescriptor, SchemaRegistry};

use crate::report::Reporter;

const SUBCOMMANDS: &[&str] = &["normalize", "validate", "assemble", "audit", "test", "help"];

/// Flags that take a separate value, e.g. `--schemas s.json`.
const VALUE_FLAGS: &[&str] = &[
    "--schemas",
    "--descriptors",
    "--max-depth",
    "-o",
    "--output",
    "-c",
    "--category",
];

#[derive(Parser)]
#[command(
    name = "blocktree",
    version,
    about = "Block tree validator and Blockly XML assembler"
)]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Normalize raw block descriptors into a schema file
    Normalize(NormalizeArgs),

    /// Check a block tree against the schemas
    Validate(ValidateArgs),

    /// Validate a block tree and write it out as Blockly XML
    Assemble(AssembleArgs),

    /// Check that every block type in a Blockly XML file is known
    Audit(AuditArgs),

    /// Run .test.json fixtures
    Test(TestArgs),
}

#[derive(clap::Args)]
#[group(required = true, multiple = false)]
struct SchemaSource {
    /// Normalized schema file
    #[arg(long, env = "BLOCKTREE_SCHEMAS")]
    schemas: Option<PathBuf>,

    /// Raw block descriptor file, normalized on load
    #[arg(long)]
    descriptors: Option<PathBuf>,
}

#[derive(clap::Args)]
struct NormalizeArgs {
    /// JSON array of raw block descriptors
    descriptors: PathBuf,

    /// Write the schema file here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(clap::Args)]
struct ValidateArgs {
    /// Block tree JSON file
    tree: PathBuf,

    #[command(flatten)]
    source: SchemaSource,

    /// Print {"valid": ..., "errors": [...]} to stdout instead of diagnostics
    #[arg(long)]
    json: bool,

    /// Deepest permitted block nesting
    #[arg(long, default_value_t = MAX_DEPTH)]
    max_depth: usize,
}

#[derive(clap::Args)]
struct AssembleArgs {
    /// Block tree JSON file
    tree: PathBuf,

    /// Where to write the XML document
    output: PathBuf,

    #[command(flatten)]
    source: SchemaSource,

    /// Deepest permitted block nesting
    #[arg(long, default_value_t = MAX_DEPTH)]
    max_depth: usize,
}

#[derive(clap::Args)]
struct AuditArgs {
    /// Blockly XML file
    markup: PathBuf,

    #[command(flatten)]
    source: SchemaSource,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.json file or a directory containing them
    path: PathBuf,

    /// Run only fixtures in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    // `blocktree tree.json out.xml` is shorthand for `blocktree assemble tree.json out.xml`.
    let mut args: Vec<String> = std::env::args().collect();
    let implicit = first_positional(args.get(1..).unwrap_or(&[]))
        .is_some_and(|a| !SUBCOMMANDS.contains(&a));
    if implicit {
        args.insert(1, "assemble".to_string());
    }

    let cli = Cli::parse_from(&args);
    init_logging(cli.verbose, cli.no_color);

    let mut reporter = Reporter::new(cli.no_color);
    let code = match cli.command {
        Command::Normalize(args) => do_normalize(args, &mut reporter),
        Command::Validate(args) => do_validate(args, &mut reporter),
        Command::Assemble(args) => do_assemble(args, &mut reporter),
        Command::Audit(args) => do_audit(args, &mut reporter),
        Command::Test(args) => {
            if args.list_categories {
                fixtures::list_categories(&args.path);
                0
            } else {
                fixtures::run_fixtures(&args.path, cli.no_color, &args.category)
            }
        }
    };
    process::exit(code);
}

/// The first argument that is neither a flag nor a flag's value.
fn first_positional(args: &[String]) -> Option<&str> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if VALUE_FLAGS.contains(&arg.as_str()) {
            iter.next();
        } else if !arg.starts_with('-') {
            return Some(arg.as_str());
        }
    }
    None
}

fn init_logging(verbose: bool, no_color: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!no_color)
        .init();
}

fn do_normalize(args: NormalizeArgs, reporter: &mut Reporter) -> i32 {
    let Some(source) = read_file(&args.descriptors) else {
        return 1;
    };
    let descriptors: Vec<RawBlockDescriptor> = match serde_json::from_str(&source) {
        Ok(d) => d,
        Err(e) => {
            reporter.json_error(&args.descriptors, source, &e);
            return 1;
        }
    };
    let registry = match SchemaRegistry::build(&descriptors) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {}", e);
            return 1;
        }
    };

    let schemas: Vec<&BlockSchema> = registry.schemas().collect();
    let text = match serde_json::to_string_pretty(&schemas) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("error: cannot encode schemas: {}", e);
            return 1;
        }
    };

    match &args.output {
        Some(path) => {
            if !write_file(path, &text) {
                return 1;
            }
            info!(schemas = schemas.len(), path = %path.display(), "wrote schema file");
            eprintln!("ok: {} schemas written to {}", schemas.len(), path.display());
        }
        None => println!("{}", text),
    }
    0
}

fn do_validate(args: ValidateArgs, reporter: &mut Reporter) -> i32 {
    let Some(registry) = load_registry(&args.source, reporter) else {
        return 1;
    };
    let Some(tree) = load_tree(&args.tree, reporter) else {
        return 1;
    };

    let limits = Limits {
        max_depth: args.max_depth,
    };
    let errors = assembler::validate_in(&registry, &tree, blocks::Context::Root, limits);

    if args.json {
        let report = serde_json::json!({
            "valid": errors.is_empty(),
            "errors": errors,
        });
        println!("{}", report);
    } else if errors.is_empty() {
        eprintln!("ok: {} is valid", args.tree.display());
    } else {
        reporter.validation_errors(&errors);
    }

    if errors.is_empty() { 0 } else { 1 }
}

fn do_assemble(args: AssembleArgs, reporter: &mut Reporter) -> i32 {
    let Some(registry) = load_registry(&args.source, reporter) else {
        return 1;
    };
    let Some(tree) = load_tree(&args.tree, reporter) else {
        return 1;
    };

    let limits = Limits {
        max_depth: args.max_depth,
    };
    let xml = match assembler::assemble(&registry, &tree, limits) {
        Ok(xml) => xml,
        Err(AssembleError::Invalid(errors)) => {
            reporter.validation_errors(&errors);
            return 1;
        }
        Err(AssembleError::Structural(e)) => {
            reporter.structural_error(&e);
            return 1;
        }
    };

    if !write_file(&args.output, &xml) {
        return 1;
    }
    eprintln!("ok: XML written to {}", args.output.display());
    0
}

fn do_audit(args: AuditArgs, reporter: &mut Reporter) -> i32 {
    let Some(registry) = load_registry(&args.source, reporter) else {
        return 1;
    };
    let Some(markup) = read_file(&args.markup) else {
        return 1;
    };

    let unknown = assembler::unsupported_types(&registry, &markup);
    if unknown.is_empty() {
        eprintln!("ok: every block in {} is supported", args.markup.display());
        return 0;
    }
    for block_type in &unknown {
        reporter.unsupported_block(block_type);
    }
    1
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

fn load_registry(source: &SchemaSource, reporter: &mut Reporter) -> Option<SchemaRegistry> {
    let (path, raw) = match (&source.schemas, &source.descriptors) {
        (_, Some(path)) => (path, true),
        (Some(path), None) => (path, false),
        (None, None) => {
            eprintln!("error: no schema source given (use --schemas or --descriptors)");
            return None;
        }
    };
    let text = read_file(path)?;

    let loaded = if raw {
        SchemaRegistry::from_descriptor_json(&text)
    } else {
        SchemaRegistry::from_json(&text)
    };
    match loaded {
        Ok(registry) => {
            debug!(path = %path.display(), schemas = registry.len(), "loaded schemas");
            Some(registry)
        }
        Err(blocks::SchemaError::Json(e)) => {
            reporter.json_error(path, text, &e);
            None
        }
        Err(e) => {
            eprintln!("error: {}: {}", path.display(), e);
            None
        }
    }
}

fn load_tree(path: &Path, reporter: &mut Reporter) -> Option<ProgramNode> {
    let text = read_file(path)?;
    match ProgramNode::from_json(&text) {
        Ok(tree) => Some(tree),
        Err(e) => {
            reporter.json_error(path, text, &e);
            None
        }
    }
}

fn read_file(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(s) => Some(s),
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", path.display(), e);
            None
        }
    }
}

fn write_file(path: &Path, contents: &str) -> bool {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = std::fs::create_dir_all(parent) {
            eprintln!("error: cannot create '{}': {}", parent.display(), e);
            return false;
        }
    }
    match std::fs::write(path, contents) {
        Ok(()) => true,
        Err(e) => {
            eprintln!("error: cannot write '{}': {}", path.display(), e);
            false
        }
    }
}
