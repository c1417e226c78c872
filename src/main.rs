//! bzldoc: generate documentation for rules and macros defined in `.bzl` files.
//!
//! Supports two modes:
//!
//! - **stdin mode**: `bzldoc < defs.bzl` writes the rendering to stdout
//! - **file mode**: `bzldoc -o docs -f html rules/*.bzl` writes one output per input

use anyhow::{bail, Context, Result};
use bzldoc::{batch, extract_file, render};
use clap::Parser;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "bzldoc",
    about = "Generate documentation for rules and macros defined in .bzl files"
)]
struct Cli {
    /// Input files, directories or glob patterns. If omitted, reads from stdin.
    files: Vec<String>,

    /// Output directory, created if missing
    #[arg(short = 'o', long, default_value = ".")]
    output_dir: PathBuf,

    /// Output format: markdown (default), html, json, proto
    #[arg(short = 'f', long, default_value = "markdown")]
    format: String,

    /// Log every extraction decision (same as RUST_LOG=debug)
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let renderer = render::create_renderer(&cli.format)?;

    if cli.files.is_empty() {
        return stdin_mode(renderer.as_ref());
    }

    file_mode(&cli, renderer.as_ref())
}

/// Diagnostics go to stderr; `RUST_LOG` overrides the default level.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_ansi(false)
        .init();
}

/// stdin mode: read one source from stdin, write the rendering to stdout.
fn stdin_mode(renderer: &dyn render::Renderer) -> Result<()> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("failed to read stdin")?;

    let doc = extract_file(&input, "<stdin>")?;
    print!("{}", renderer.render("stdin", &doc));
    Ok(())
}

/// file mode: extract every input on its own, write `<ruleset>.<ext>` for
/// each success and fail at the end if anything failed.
fn file_mode(cli: &Cli, renderer: &dyn render::Renderer) -> Result<()> {
    let output_dir = cli.output_dir.as_path();
    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output directory: {}", output_dir.display()))?;

    let input_files = expand_globs(&cli.files)?;
    let ext = renderer.file_extension();

    let outcomes = batch::extract_paths(&input_files);
    let total = outcomes.len();
    let mut failed = 0;

    for outcome in outcomes {
        match outcome.result {
            Ok(doc) => {
                let out_path = output_dir.join(format!("{}.{}", outcome.ruleset, ext));
                match fs::write(&out_path, renderer.render(&outcome.ruleset, &doc)) {
                    Ok(()) => {
                        debug!(input = %outcome.path.display(), output = %out_path.display(), "wrote")
                    }
                    Err(e) => {
                        error!("failed to write {}: {}", out_path.display(), e);
                        failed += 1;
                    }
                }
            }
            Err(e) => {
                error!("{}", e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} files failed", failed, total);
    }
    Ok(())
}

/// File extensions picked up when scanning a directory.
const SUPPORTED_EXTENSIONS: &[&str] = &["bzl"];

/// Expand glob patterns into a list of real file paths.
/// Also handles bare directory paths by scanning for `.bzl` files.
fn expand_globs(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        let path = Path::new(pattern);
        if path.is_file() {
            files.push(path.to_path_buf());
            continue;
        }
        // Directories are scanned non-recursively
        if path.is_dir() {
            let entries = fs::read_dir(path)
                .with_context(|| format!("failed to read directory: {}", path.display()))?;
            for entry in entries.flatten() {
                let p = entry.path();
                if p.is_file() {
                    if let Some(ext) = p.extension().and_then(|e| e.to_str()) {
                        if SUPPORTED_EXTENSIONS.contains(&ext) {
                            files.push(p);
                        }
                    }
                }
            }
            continue;
        }
        let matches: Vec<_> = glob::glob(pattern)
            .with_context(|| format!("invalid glob pattern: {}", pattern))?
            .filter_map(|r| r.ok())
            .filter(|p| p.is_file())
            .collect();
        if matches.is_empty() {
            warn!("no files matched: {}", pattern);
        }
        files.extend(matches);
    }
    // Sort for deterministic output
    files.sort();
    files.dedup();
    Ok(files)
}
