//! Command-line front end.
//!
//! Interprets a single script file.  Program output and diagnostics go to
//! stdout; problems reading the script go to stderr.

use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use anyhow::anyhow;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tlox::Interpreter;

/// Largest script the driver will load.
const MAX_SOURCE_BYTES: u64 = 1 << 30;

#[derive(Parser, Debug)]
#[command(version, about = "Interpreter for a small scripting language")]
struct Args {
    /// Script to interpret.
    file: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let Some(path) = args.file else {
        println!("usage: tlox <script>");
        return Ok(());
    };

    let source = read_source(&path)?;
    let mut stdout = io::stdout();
    let mut interp = Interpreter::new(&mut stdout);
    if interp.run(&path.display().to_string(), &source).is_err() {
        // The diagnostics are already on stdout; only the status is left.
        std::process::exit(1);
    }
    Ok(())
}

fn read_source(path: &Path) -> anyhow::Result<String> {
    if let Ok(meta) = fs::metadata(path) {
        if meta.len() > MAX_SOURCE_BYTES {
            return Err(anyhow!("cannot read {}: file too big", path.display()));
        }
    }
    fs::read_to_string(path).map_err(|e| describe_read_error(path, &e))
}

fn describe_read_error(path: &Path, e: &io::Error) -> anyhow::Error {
    let what = match e.kind() {
        ErrorKind::NotFound => "no such file",
        ErrorKind::PermissionDenied => "access denied",
        ErrorKind::IsADirectory => "is a directory",
        _ => return anyhow!("cannot read {}: {}", path.display(), e),
    };
    anyhow!("cannot read {}: {}", path.display(), what)
}
