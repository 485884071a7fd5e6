//! The dependency registry: identifier name → exporting module.
//!
//! Built once per project root from three sources, in order: platform
//! builtins, declared package dependencies, and project source files. Each
//! module id gets a [`RegistryEntry`] (reused from the on-disk cache when
//! its version still matches), and a reverse index maps every exported or
//! derived identifier to the winning module per the associate rule.

pub mod cache;
pub mod entry;
pub mod exports;
pub mod manifest;
pub mod probe;

use std::collections::VecDeque;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::Shared;
use rustc_hash::FxHashMap;
use tokio::sync::Mutex;

pub use entry::{DepInfo, DepPriority, ExportKind, RegistryEntry};
pub use manifest::{Manifest, ManifestOverride};
pub use probe::ProbeOptions;

/// Node's built-in module names. Registered with the runtime version string
/// so they win only when nothing closer to the project exports the name.
pub const NODE_BUILTINS: &[&str] = &[
    "assert",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "dns",
    "domain",
    "events",
    "fs",
    "http",
    "https",
    "module",
    "net",
    "os",
    "path",
    "punycode",
    "querystring",
    "readline",
    "repl",
    "stream",
    "string_decoder",
    "timers",
    "tls",
    "tty",
    "url",
    "util",
    "v8",
    "vm",
    "zlib",
];

/// Stand-in for the platform runtime version: the builtin table ships with
/// the crate, so the crate version invalidates cached builtin entries.
const RUNTIME_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Extensions of project files the registry scans.
const SOURCE_EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "cjs", "ts", "tsx"];

/// Registry build failure. Clone-able so it can flow through the shared
/// build future handed to every concurrent caller.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to read {path}: {message}")]
    Read { path: String, message: String },
    #[error("invalid manifest at {path}: {message}")]
    Manifest { path: String, message: String },
}

/// Options threaded into every registry build.
#[derive(Debug, Clone, Default)]
pub struct RegistryOptions {
    pub probe: ProbeOptions,
}

/// The populated registry for one project root.
pub struct Registry {
    project_root: Option<PathBuf>,
    entries: FxHashMap<String, RegistryEntry>,
    /// Module ids in registration order; `compute_deps` walks this so the
    /// first-inserted-wins tie rule is well-defined.
    order: Vec<String>,
    origins: FxHashMap<String, DepPriority>,
    deps: FxHashMap<String, DepInfo>,
}

impl Registry {
    /// Constant-time lookup of the module exporting `name`.
    pub fn search(&self, name: &str) -> Option<&DepInfo> {
        self.deps.get(name)
    }

    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    pub fn entry(&self, id: &str) -> Option<&RegistryEntry> {
        self.entries.get(id)
    }

    fn register(&mut self, id: String, priority: DepPriority, entry: RegistryEntry) {
        if self.entries.contains_key(&id) {
            return;
        }
        self.order.push(id.clone());
        self.origins.insert(id.clone(), priority);
        self.entries.insert(id, entry);
    }

    fn compute_deps(&mut self) {
        let mut deps: FxHashMap<String, DepInfo> = FxHashMap::default();
        for id in &self.order {
            let entry = &self.entries[id];
            let priority = self.origins[id];
            for name in &entry.idents {
                associate(&mut deps, name, id, priority, ExportKind::Ident);
            }
            for name in &entry.defaults {
                associate(&mut deps, name, id, priority, ExportKind::Default);
            }
            for name in &entry.props {
                associate(&mut deps, name, id, priority, ExportKind::Prop);
            }
        }
        self.deps = deps;
    }
}

#[cfg(test)]
impl Registry {
    pub(crate) fn empty_for_tests() -> Self {
        Self {
            project_root: None,
            entries: FxHashMap::default(),
            order: Vec::new(),
            origins: FxHashMap::default(),
            deps: FxHashMap::default(),
        }
    }

    pub(crate) fn insert_dep_for_tests(&mut self, name: &str, info: DepInfo) {
        self.deps.insert(name.to_string(), info);
    }
}

/// Insert-or-replace rule for the reverse index: replace when the slot is
/// empty, when the new candidate has a strictly better (lower) priority, or
/// when an ident/default displaces a prop. Equal-priority, equal-kind ties
/// keep the first inserted.
fn associate(
    deps: &mut FxHashMap<String, DepInfo>,
    name: &str,
    id: &str,
    priority: DepPriority,
    kind: ExportKind,
) {
    let replace = match deps.get(name) {
        None => true,
        Some(existing) => {
            existing.priority > priority
                || (existing.kind == ExportKind::Prop && kind != ExportKind::Prop)
        }
    };
    if replace {
        deps.insert(
            name.to_string(),
            DepInfo {
                id: id.to_string(),
                priority,
                kind,
            },
        );
    }
}

type SharedBuild =
    Shared<Pin<Box<dyn Future<Output = Result<Arc<Registry>, RegistryError>> + Send>>>;

/// Owns registry builds and memoizes them per project dir.
///
/// Concurrent callers of [`populate`](Self::populate) for the same dir share
/// one in-flight build: the handle goes into the map before any I/O starts.
pub struct RegistryManager {
    options: RegistryOptions,
    builds: Mutex<FxHashMap<PathBuf, SharedBuild>>,
}

impl Default for RegistryManager {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryManager {
    pub fn new() -> Self {
        Self::with_options(RegistryOptions::default())
    }

    pub fn with_options(options: RegistryOptions) -> Self {
        Self {
            options,
            builds: Mutex::new(FxHashMap::default()),
        }
    }

    /// Idempotent, memoized per `dir`.
    ///
    /// The manifest override participates only in the first build for a
    /// given dir; later callers get the memoized registry.
    pub async fn populate(
        &self,
        dir: &Path,
        override_: Option<ManifestOverride>,
    ) -> Result<Arc<Registry>, RegistryError> {
        let build = {
            let mut builds = self.builds.lock().await;
            match builds.get(dir) {
                Some(build) => build.clone(),
                None => {
                    let build =
                        build_registry(dir.to_path_buf(), override_, self.options.clone())
                            .boxed()
                            .shared();
                    builds.insert(dir.to_path_buf(), build.clone());
                    build
                }
            }
        };
        build.await
    }
}

async fn build_registry(
    dir: PathBuf,
    override_: Option<ManifestOverride>,
    options: RegistryOptions,
) -> Result<Arc<Registry>, RegistryError> {
    let located = manifest::locate(&dir).await?;
    let (project_root, manifest) = match located {
        Some((root, manifest)) => (Some(root), manifest),
        None => (None, Manifest::default()),
    };
    tracing::debug!(dir = %dir.display(), root = ?project_root, "building dependency registry");

    let cache_file = cache::cache_path(project_root.as_deref());
    let cached = cache::load(&cache_file).await;

    let mut registry = Registry {
        project_root: project_root.clone(),
        entries: FxHashMap::default(),
        order: Vec::new(),
        origins: FxHashMap::default(),
        deps: FxHashMap::default(),
    };

    for name in NODE_BUILTINS {
        register_source(
            &mut registry,
            &cached,
            name,
            RUNTIME_VERSION.to_string(),
            DepPriority::Builtin,
            project_root.as_deref(),
            &options,
        )
        .await;
    }

    for (name, version) in manifest.declared_dependencies(override_.as_ref()) {
        register_source(
            &mut registry,
            &cached,
            &name,
            version,
            DepPriority::Dependency,
            project_root.as_deref(),
            &options,
        )
        .await;
    }

    if let Some(root) = &project_root {
        for path in walk_project_files(root).await {
            let Some(version) = file_mtime_ms(&path).await else {
                continue;
            };
            let id = path.to_string_lossy().into_owned();
            register_source(
                &mut registry,
                &cached,
                &id,
                version.to_string(),
                DepPriority::ProjectFile,
                project_root.as_deref(),
                &options,
            )
            .await;
        }
    }

    cache::store(&cache_file, &registry.entries).await;
    registry.compute_deps();
    tracing::debug!(
        modules = registry.order.len(),
        identifiers = registry.deps.len(),
        "dependency registry ready"
    );
    Ok(Arc::new(registry))
}

async fn register_source(
    registry: &mut Registry,
    cached: &FxHashMap<String, RegistryEntry>,
    id: &str,
    version: String,
    priority: DepPriority,
    project_root: Option<&Path>,
    options: &RegistryOptions,
) {
    if let Some(hit) = cached.get(id) {
        if hit.version == version {
            registry.register(id.to_string(), priority, hit.clone());
            return;
        }
    }

    let mut entry = RegistryEntry::new(version);
    match priority {
        DepPriority::ProjectFile => fill_file_entry(&mut entry, id).await,
        DepPriority::Dependency | DepPriority::Builtin => {
            fill_package_entry(&mut entry, id, project_root, options).await;
        }
    }
    registry.register(id.to_string(), priority, entry);
}

/// External package: id-derived identifiers plus sandboxed introspection.
/// Probe failures keep the entry with the derivations only.
async fn fill_package_entry(
    entry: &mut RegistryEntry,
    id: &str,
    project_root: Option<&Path>,
    options: &RegistryOptions,
) {
    entry.idents.extend(entry::derived_idents(id));

    let Some(root) = project_root else {
        return;
    };
    let root = root.to_path_buf();
    let package = id.to_string();
    let probe_options = options.probe.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        probe::introspect_package(&root, &package, &probe_options)
    })
    .await;

    match outcome {
        Ok(Ok(found)) => {
            entry.props.extend(found.props);
            if found.has_default {
                entry.promote_defaults();
            }
        }
        Ok(Err(err)) => {
            tracing::debug!(package = id, error = %err, "package introspection failed");
        }
        Err(err) => {
            tracing::debug!(package = id, error = %err, "package introspection aborted");
        }
    }
}

/// Project file: static export analysis plus id-derived identifiers. Parse
/// failures keep the derivations only.
async fn fill_file_entry(entry: &mut RegistryEntry, id: &str) {
    let scan = match tokio::fs::read_to_string(id).await {
        Ok(source) => exports::analyze_exports(Path::new(id), &source),
        Err(err) => {
            tracing::debug!(file = id, error = %err, "project file unreadable");
            None
        }
    };
    let has_default = scan.as_ref().is_some_and(|scan| scan.has_default);
    if let Some(scan) = scan {
        entry.idents.extend(scan.idents);
        entry.props.extend(scan.props);
    } else {
        tracing::debug!(file = id, "export analysis failed, keeping derived idents");
    }
    entry.idents.extend(entry::derived_idents(id));
    if has_default {
        entry.promote_defaults();
    }
}

/// Breadth-first walk of the project tree in sorted order, skipping
/// dot-entries, `node_modules`, and `bower_components`.
async fn walk_project_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut pending = VecDeque::from([root.to_path_buf()]);

    while let Some(dir) = pending.pop_front() {
        let mut read_dir = match tokio::fs::read_dir(&dir).await {
            Ok(read_dir) => read_dir,
            Err(err) => {
                tracing::debug!(dir = %dir.display(), error = %err, "directory unreadable");
                continue;
            }
        };
        let mut entries = Vec::new();
        while let Ok(Some(dirent)) = read_dir.next_entry().await {
            entries.push(dirent);
        }
        entries.sort_by_key(|dirent| dirent.file_name());

        for dirent in entries {
            let name = dirent.file_name();
            let name = name.to_string_lossy();
            if name.starts_with('.') {
                continue;
            }
            let Ok(file_type) = dirent.file_type().await else {
                continue;
            };
            if file_type.is_dir() {
                if name == "node_modules" || name == "bower_components" {
                    continue;
                }
                pending.push_back(dirent.path());
            } else if file_type.is_file() {
                let path = dirent.path();
                let accepted = path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext));
                if accepted {
                    files.push(path);
                }
            }
        }
    }
    files
}

async fn file_mtime_ms(path: &Path) -> Option<u128> {
    let metadata = tokio::fs::metadata(path).await.ok()?;
    let modified = metadata.modified().ok()?;
    modified
        .duration_since(std::time::UNIX_EPOCH)
        .ok()
        .map(|elapsed| elapsed.as_millis())
}
