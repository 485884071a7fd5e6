//! # stitch
//!
//! Automatic import/require mending for JavaScript and TypeScript sources.
//!
//! Given a source file and a project dir, stitch parses the file, finds the
//! free identifiers nothing declares, looks each one up in a project-wide
//! registry of known exports (builtins, declared dependencies, project
//! files), and re-emits a single sorted import block in the file's own
//! style. Everything outside the import block keeps its original line
//! numbers.
//!
//! ```no_run
//! # async fn example() -> stitch::Result<()> {
//! use std::path::Path;
//! use stitch::RegistryManager;
//!
//! let manager = RegistryManager::new();
//! let fixed = stitch::run(&manager, Path::new("/project/src"), "fetchUsers();\n").await?;
//! print!("{fixed}");
//! # Ok(())
//! # }
//! ```

pub mod imports;
pub mod parse;
pub mod registry;
pub mod resolve;
pub mod source;
pub mod style;

use std::path::Path;

pub use imports::{ExistingImport, ImportBindings, LibsToAdd, LineSpan};
pub use registry::{
    DepInfo, DepPriority, ExportKind, Manifest, ManifestOverride, ProbeOptions, Registry,
    RegistryEntry, RegistryError, RegistryManager, RegistryOptions,
};
pub use style::StyleDescriptor;

use source::SourceView;

/// Error types for stitch operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input source does not parse. Lines are 1-indexed, columns
    /// 0-indexed.
    #[error("parse error at {line}:{column}: {message}")]
    Parse {
        message: String,
        line: u32,
        column: u32,
    },

    /// Registry construction failed (manifest unreadable or malformed).
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for stitch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Per-invocation knobs for [`run_with_options`].
#[derive(Debug, Clone, Default)]
pub struct FixOptions {
    /// Extra dependencies merged over the project manifest. Participates in
    /// the first registry build for the dir; later calls reuse the memoized
    /// registry.
    pub manifest_override: Option<ManifestOverride>,
    /// Skip style detection and use this descriptor.
    pub style: Option<StyleDescriptor>,
}

/// Fix the imports of `code` as a file living in `dir`.
///
/// The rewrite is all-or-nothing: any surfaced error means no output.
pub async fn run(manager: &RegistryManager, dir: &Path, code: &str) -> Result<String> {
    run_with_options(manager, dir, code, FixOptions::default()).await
}

/// [`run`] with explicit options.
pub async fn run_with_options(
    manager: &RegistryManager,
    dir: &Path,
    code: &str,
    options: FixOptions,
) -> Result<String> {
    let analysis = parse::analyze_source(code)?;
    let style = options
        .style
        .unwrap_or_else(|| StyleDescriptor::detect(code));

    let registry = manager.populate(dir, options.manifest_override).await?;
    let libs = resolve::imports_to_add(&analysis, &registry);
    let block = imports::compose::compose_block(&style, dir, &libs);

    tracing::debug!(
        existing = analysis.existing_imports.len(),
        undefined = analysis.undefined.len(),
        statements = block.lines().count(),
        "rewriting import block"
    );

    let view = SourceView::new(code);
    Ok(imports::rewrite::splice(
        &view,
        &analysis.existing_imports,
        analysis.directive.as_ref(),
        &block,
    ))
}
