//! Schema Core CLI
//!
//! Command-line interface for bundling, framing and linting JSON Schemas.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use schema_core::{
    builtin_rules, bundle, fix, is_url, lint, load_schema_auto, official_resolver, official_walker,
    BundleOptions,
    FileResolver, FileStatus, Frame, LintOptions, Pointer, SchemaResolver, Severity,
};

#[derive(Parser)]
#[command(name = "schema-core")]
#[command(about = "Bundle, frame and lint JSON Schemas")]
#[command(version)]
struct Cli {
    /// Log resolution and bundling steps to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed every external schema a schema references
    Bundle {
        /// Schema source: file path or URL (http:// or https://)
        schema: String,

        /// Local directory to resolve external schemas from
        /// (default: the schema's directory)
        #[arg(long)]
        resolve_dir: Option<PathBuf>,

        /// URL prefix mapped onto --resolve-dir (e.g., https://example.com/schemas)
        #[arg(long, requires = "resolve_dir")]
        remote_base: Option<String>,

        /// Do not fetch schemas over the network
        #[arg(long)]
        offline: bool,

        /// Dialect assumed for schemas without $schema
        #[arg(long)]
        default_dialect: Option<String>,

        /// Identifier assumed for the root schema when it has none
        #[arg(long)]
        default_id: Option<String>,

        /// JSON Pointer to embed external schemas under (e.g., /$defs)
        #[arg(long)]
        destination: Option<String>,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Print the locations, identifiers and references of a schema as JSON
    Frame {
        /// Schema source: file path or URL (http:// or https://)
        schema: String,

        /// Dialect assumed for schemas without $schema
        #[arg(long)]
        default_dialect: Option<String>,
    },

    /// Lint schema files (syntax, dialect, broken references, rule matches)
    Lint {
        /// File or directory to lint
        path: PathBuf,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Rewrite files in place with the built-in rules before reporting
        #[arg(long)]
        fix: bool,

        /// Dialect assumed for schemas without $schema
        #[arg(long)]
        default_dialect: Option<String>,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,

        /// Suppress progress output, only show errors
        #[arg(long, short)]
        quiet: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Bundle {
            schema,
            resolve_dir,
            remote_base,
            offline,
            default_dialect,
            default_id,
            destination,
            output,
            pretty,
        } => run_bundle(BundleArgs {
            schema,
            resolve_dir,
            remote_base,
            offline,
            default_dialect,
            default_id,
            destination,
            output,
            pretty,
        }),

        Commands::Frame {
            schema,
            default_dialect,
        } => run_frame(&schema, default_dialect.as_deref().unwrap_or("")),

        Commands::Lint {
            path,
            format,
            fix,
            default_dialect,
            strict,
            quiet,
        } => {
            let options = LintOptions::new()
                .default_dialect(default_dialect.unwrap_or_default())
                .strict(strict);
            run_lint(&path, &format, fix, quiet, &options)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Files first, then the network, then the built-in official metaschemas.
struct CliResolver {
    files: FileResolver,
    #[cfg(feature = "remote")]
    http: Option<schema_core::HttpResolver>,
}

impl SchemaResolver for CliResolver {
    fn resolve(&self, uri: &str) -> Option<Value> {
        if let Some(schema) = self.files.resolve(uri) {
            return Some(schema);
        }
        #[cfg(feature = "remote")]
        {
            if let Some(schema) = self.http.as_ref().and_then(|http| http.resolve(uri)) {
                return Some(schema);
            }
        }
        official_resolver(uri)
    }
}

struct BundleArgs {
    schema: String,
    resolve_dir: Option<PathBuf>,
    remote_base: Option<String>,
    offline: bool,
    default_dialect: Option<String>,
    default_id: Option<String>,
    destination: Option<String>,
    output: Option<PathBuf>,
    pretty: bool,
}

fn run_bundle(args: BundleArgs) -> Result<(), u8> {
    let mut schema = load_schema_auto(&args.schema).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let source_dir = if is_url(&args.schema) {
        PathBuf::from(".")
    } else {
        Path::new(&args.schema)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    };
    let mut files = FileResolver::new(args.resolve_dir.unwrap_or(source_dir));
    if let Some(base) = args.remote_base {
        files = files.remote_base(base);
    }

    let resolver = CliResolver {
        files,
        #[cfg(feature = "remote")]
        http: if args.offline {
            None
        } else {
            Some(schema_core::HttpResolver::new().map_err(|e| {
                eprintln!("Error: {}", e);
                e.exit_code() as u8
            })?)
        },
    };
    #[cfg(not(feature = "remote"))]
    let _ = args.offline;

    let mut options = BundleOptions::new()
        .default_dialect(args.default_dialect.unwrap_or_default())
        .default_id(args.default_id.unwrap_or_default());
    if let Some(destination) = &args.destination {
        let pointer = Pointer::parse(destination).ok_or_else(|| {
            eprintln!("Error: invalid JSON Pointer: {}", destination);
            2u8
        })?;
        options = options.destination(pointer);
    }

    debug!(schema = %args.schema, default_id = %options.default_id, "bundling");
    bundle(&mut schema, &official_walker, &resolver, &options).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    write_json(&schema, args.pretty, args.output.as_deref())
}

fn run_frame(source: &str, default_dialect: &str) -> Result<(), u8> {
    let schema = load_schema_auto(source).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let resolver = FileResolver::new(
        Path::new(source)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    )
    .or(official_resolver);
    let frame = Frame::new(&schema, &official_walker, &resolver, default_dialect, "").map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let json_output = serde_json::to_string_pretty(&frame).map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;
    println!("{}", json_output);
    Ok(())
}

fn write_json(value: &Value, pretty: bool, output: Option<&Path>) -> Result<(), u8> {
    let json_output = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}

fn run_lint(
    path: &Path,
    format: &str,
    apply_fixes: bool,
    quiet: bool,
    options: &LintOptions,
) -> Result<(), u8> {
    if !path.exists() {
        eprintln!("Error: path not found: {}", path.display());
        return Err(3);
    }

    let rules = builtin_rules();
    if apply_fixes {
        for file in fix(path, &rules, options) {
            if !quiet && format != "json" {
                println!("Fixed {}", file.display());
            }
        }
    }

    let result = lint(path, &rules, options);
    let passed = result.is_ok() && result.warnings == 0;

    if format == "json" {
        let json_output = serde_json::to_string_pretty(&result).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?;
        println!("{}", json_output);
    } else {
        // Text output
        if !quiet {
            println!("Linting {} ...\n", path.display());
        }

        for file_result in &result.results {
            let status_icon = match file_result.status {
                FileStatus::Ok => "\x1b[32m✓\x1b[0m",
                FileStatus::Warning => "\x1b[33m⚠\x1b[0m",
                FileStatus::Error => "\x1b[31m✗\x1b[0m",
            };

            if !quiet || file_result.status != FileStatus::Ok {
                println!("  {} {}", status_icon, file_result.file.display());
            }

            for diag in &file_result.diagnostics {
                let (color, label) = match diag.severity {
                    Severity::Error => ("\x1b[31m", "error"),
                    Severity::Warning => ("\x1b[33m", "warning"),
                };
                if !quiet || diag.severity == Severity::Error {
                    println!(
                        "    {}{}[{}]\x1b[0m: {} - {}",
                        color, label, diag.code, diag.path, diag.message
                    );
                }
            }
        }

        println!();
        if passed {
            println!(
                "\x1b[32m✓ {} files checked, all passed\x1b[0m",
                result.files_checked
            );
        } else {
            println!(
                "\x1b[31m✗ {} files checked: {} passed, {} failed ({} errors, {} warnings)\x1b[0m",
                result.files_checked, result.passed, result.failed, result.errors, result.warnings
            );
        }
    }

    if passed {
        Ok(())
    } else {
        Err(1)
    }
}
