//! stitch CLI - fix the imports of a JavaScript or TypeScript file.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use stitch::RegistryManager;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "stitch", version, about = "Fix missing and stale imports")]
struct Cli {
    /// Source file to fix.
    file: PathBuf,

    /// Project dir used for dependency resolution; defaults to the file's
    /// parent directory.
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Rewrite the file in place instead of printing to stdout.
    #[arg(long)]
    write: bool,

    /// Show registry build and rewrite details.
    #[arg(short, long)]
    verbose: bool,

    /// Only report errors.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

/// The rewritten source goes to stdout, so diagnostics must not: everything
/// tracing emits is routed to stderr. `RUST_LOG` overrides the flag-derived
/// filter.
fn init_tracing(args: &Cli) {
    let directives = if args.quiet {
        "stitch=error"
    } else if args.verbose {
        "stitch=debug"
    } else {
        "stitch=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_tracing(&args);

    let file = args
        .file
        .canonicalize()
        .with_context(|| format!("cannot open {}", args.file.display()))?;
    let dir = match args.dir {
        Some(dir) => dir,
        None => file
            .parent()
            .map(PathBuf::from)
            .context("file has no parent directory")?,
    };

    let code = tokio::fs::read_to_string(&file)
        .await
        .with_context(|| format!("cannot read {}", file.display()))?;

    let manager = RegistryManager::new();
    let fixed = stitch::run(&manager, &dir, &code)
        .await
        .with_context(|| format!("failed to fix {}", file.display()))?;

    if args.write {
        tokio::fs::write(&file, &fixed)
            .await
            .with_context(|| format!("cannot write {}", file.display()))?;
    } else {
        print!("{fixed}");
    }
    Ok(())
}
