//! Sandboxed runtime introspection of installed packages.
//!
//! An external package's export surface cannot be recovered statically (it
//! may be built, bundled, or generated), so the registry loads it inside a
//! QuickJS sandbox and reads `Object.keys` off the result. The sandbox
//! exposes a single host-implemented CommonJS `require` confined to the
//! project's `node_modules`; configured builtin module names answer with
//! inert stubs. A memory limit and an interrupt deadline bound hostile or
//! runaway packages. Every failure stays inside the probe.

use std::cell::RefCell;
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};

use rquickjs::function::Func;
use rquickjs::{CatchResultExt, Context, Ctx, Exception, Function, Object, Runtime, Value};

/// Limits and builtin surface for one probe.
#[derive(Debug, Clone)]
pub struct ProbeOptions {
    pub timeout: Duration,
    pub memory_limit: usize,
    /// Module names resolved to empty stub objects instead of files.
    pub builtins: Vec<String>,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(2),
            memory_limit: 64 * 1024 * 1024,
            builtins: super::NODE_BUILTINS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// What the introspection script reports for a package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub props: Vec<String>,
    pub has_default: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("sandbox setup failed: {0}")]
    Setup(String),
    #[error("evaluation failed: {0}")]
    Eval(String),
}

const INTROSPECT: &str = r#"
(function () {
  var mod = require(__PROBE_ID__);
  var keys = [];
  if (mod !== null && (typeof mod === "object" || typeof mod === "function")) {
    keys = Object.keys(mod);
  }
  return {
    props: keys,
    hasDefault: mod !== null && mod !== undefined && mod["default"] !== undefined
  };
})()
"#;

/// Load `id` from `<project_root>/node_modules` in a sandbox and report its
/// exported property names and whether it has a `default`.
pub fn introspect_package(
    project_root: &Path,
    id: &str,
    options: &ProbeOptions,
) -> Result<ProbeOutcome, ProbeError> {
    let runtime = Runtime::new().map_err(|err| ProbeError::Setup(err.to_string()))?;
    runtime.set_memory_limit(options.memory_limit);
    runtime.set_max_stack_size(512 * 1024);
    let deadline = Instant::now() + options.timeout;
    runtime.set_interrupt_handler(Some(Box::new(move || Instant::now() >= deadline)));

    let context = Context::full(&runtime).map_err(|err| ProbeError::Setup(err.to_string()))?;
    let state = Rc::new(SandboxState {
        node_modules: project_root.join("node_modules"),
        builtins: options.builtins.clone(),
        dir_stack: RefCell::new(Vec::new()),
    });

    context.with(|ctx| {
        let outcome = (|| -> rquickjs::Result<ProbeOutcome> {
            let cache = Object::new(ctx.clone())?;
            ctx.globals().set("__stitch_modules__", cache)?;
            let sandbox = Rc::clone(&state);
            ctx.globals().set(
                "require",
                Func::from(move |ctx, id| sandbox_require(ctx, &sandbox, id)),
            )?;
            ctx.globals().set("__PROBE_ID__", id)?;

            let report: Object = ctx.eval(INTROSPECT)?;
            Ok(ProbeOutcome {
                props: report.get("props")?,
                has_default: report.get("hasDefault")?,
            })
        })();
        outcome
            .catch(&ctx)
            .map_err(|err| ProbeError::Eval(err.to_string()))
    })
}

struct SandboxState {
    node_modules: PathBuf,
    builtins: Vec<String>,
    /// Directory of the module currently being evaluated; relative requires
    /// resolve against the top of this stack.
    dir_stack: RefCell<Vec<PathBuf>>,
}

fn sandbox_require<'js>(
    ctx: Ctx<'js>,
    state: &SandboxState,
    id: String,
) -> rquickjs::Result<Value<'js>> {
    if state.builtins.iter().any(|builtin| *builtin == id) {
        return Ok(Object::new(ctx.clone())?.into_value());
    }

    let path = match state.resolve(&id) {
        Ok(path) => path,
        Err(message) => return Err(Exception::throw_message(&ctx, &message)),
    };
    let key = path.to_string_lossy().into_owned();

    let cache: Object = ctx.globals().get("__stitch_modules__")?;
    let hit: Value = cache.get(key.as_str())?;
    if !hit.is_undefined() {
        return Ok(hit);
    }

    let source = match std::fs::read_to_string(&path) {
        Ok(source) => source,
        Err(err) => {
            return Err(Exception::throw_message(
                &ctx,
                &format!("cannot read module '{id}': {err}"),
            ));
        }
    };

    if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
        let value: Value = ctx.json_parse(source)?;
        cache.set(key.as_str(), value.clone())?;
        return Ok(value);
    }

    let module = Object::new(ctx.clone())?;
    let exports = Object::new(ctx.clone())?;
    module.set("exports", exports.clone())?;
    // Seed the cache before evaluation so require cycles see the partial
    // exports object, CommonJS-style.
    cache.set(key.as_str(), exports.clone().into_value())?;

    let wrapper: Function = ctx.eval(format!(
        "(function (module, exports, require, __filename, __dirname) {{\n{source}\n}})"
    ))?;
    let require: Function = ctx.globals().get("require")?;
    let dirname = path
        .parent()
        .unwrap_or(&state.node_modules)
        .to_string_lossy()
        .into_owned();

    state
        .dir_stack
        .borrow_mut()
        .push(path.parent().unwrap_or(&state.node_modules).to_path_buf());
    let called: rquickjs::Result<Value> = wrapper.call((
        module.clone(),
        exports,
        require,
        key.as_str(),
        dirname.as_str(),
    ));
    state.dir_stack.borrow_mut().pop();
    called?;

    let final_exports: Value = module.get("exports")?;
    cache.set(key.as_str(), final_exports.clone())?;
    Ok(final_exports)
}

impl SandboxState {
    fn resolve(&self, id: &str) -> Result<PathBuf, String> {
        let candidate = if id.starts_with("./") || id.starts_with("../") {
            match self.dir_stack.borrow().last() {
                Some(dir) => dir.join(id),
                None => return Err(format!("relative require '{id}' outside a module")),
            }
        } else {
            // Bare specifiers resolve under node_modules; absolute paths
            // replace the base on join and fail the containment check below.
            self.node_modules.join(id)
        };

        let normalized = normalize(&candidate);
        if !normalized.starts_with(&self.node_modules) {
            return Err(format!("module '{id}' escapes the sandbox"));
        }
        self.resolve_file(normalized, 0)
            .ok_or_else(|| format!("cannot resolve module '{id}'"))
    }

    fn resolve_file(&self, path: PathBuf, depth: u8) -> Option<PathBuf> {
        if depth > 4 {
            return None;
        }
        if path.is_file() {
            return Some(path);
        }
        for ext in ["js", "json", "cjs"] {
            let mut with_ext = path.clone().into_os_string();
            with_ext.push(".");
            with_ext.push(ext);
            let with_ext = PathBuf::from(with_ext);
            if with_ext.is_file() {
                return Some(with_ext);
            }
        }
        if path.is_dir() {
            if let Some(main) = package_main(&path) {
                let target = normalize(&path.join(main));
                if target != path && target.starts_with(&self.node_modules) {
                    if let Some(found) = self.resolve_file(target, depth + 1) {
                        return Some(found);
                    }
                }
            }
            for index in ["index.js", "index.json"] {
                let candidate = path.join(index);
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }
        None
    }
}

fn package_main(dir: &Path) -> Option<String> {
    let bytes = std::fs::read(dir.join("package.json")).ok()?;
    let manifest: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    manifest
        .get("main")
        .and_then(|main| main.as_str())
        .map(str::to_string)
}

/// Lexical path normalization; no filesystem access, so symlinked layouts
/// are contained by where they are mounted, not where they point.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_module(root: &Path, relative: &str, source: &str) {
        let path = root.join("node_modules").join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, source).unwrap();
    }

    #[test]
    fn probes_object_exports() {
        let dir = TempDir::new().unwrap();
        write_module(
            dir.path(),
            "shapes/index.js",
            "module.exports = { circle: 1, square: 2 };",
        );

        let outcome =
            introspect_package(dir.path(), "shapes", &ProbeOptions::default()).unwrap();
        assert_eq!(outcome.props, vec!["circle", "square"]);
        assert!(!outcome.has_default);
    }

    #[test]
    fn probes_default_marker() {
        let dir = TempDir::new().unwrap();
        write_module(
            dir.path(),
            "esmish/index.js",
            "exports.default = function () {};\nexports.named = 1;",
        );

        let outcome =
            introspect_package(dir.path(), "esmish", &ProbeOptions::default()).unwrap();
        assert!(outcome.has_default);
        assert!(outcome.props.contains(&"named".to_string()));
    }

    #[test]
    fn follows_package_json_main_and_relative_requires() {
        let dir = TempDir::new().unwrap();
        write_module(dir.path(), "pkg/package.json", r#"{"main":"lib/entry.js"}"#);
        write_module(
            dir.path(),
            "pkg/lib/entry.js",
            "const extra = require('./extra');\nmodule.exports = { a: extra.a, b: 2 };",
        );
        write_module(dir.path(), "pkg/lib/extra.js", "exports.a = 1;");

        let outcome = introspect_package(dir.path(), "pkg", &ProbeOptions::default()).unwrap();
        assert_eq!(outcome.props, vec!["a", "b"]);
    }

    #[test]
    fn loads_json_modules() {
        let dir = TempDir::new().unwrap();
        write_module(dir.path(), "data/index.js", "module.exports = require('./table.json');");
        write_module(dir.path(), "data/table.json", r#"{"rows": 3, "cols": 4}"#);

        let outcome = introspect_package(dir.path(), "data", &ProbeOptions::default()).unwrap();
        assert_eq!(outcome.props, vec!["rows", "cols"]);
    }

    #[test]
    fn builtins_answer_with_stubs() {
        let dir = TempDir::new().unwrap();
        write_module(
            dir.path(),
            "uses-path/index.js",
            "const path = require('path');\nmodule.exports = { ok: typeof path === 'object' };",
        );

        let outcome =
            introspect_package(dir.path(), "uses-path", &ProbeOptions::default()).unwrap();
        assert_eq!(outcome.props, vec!["ok"]);
    }

    #[test]
    fn missing_package_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules")).unwrap();
        let err = introspect_package(dir.path(), "ghost", &ProbeOptions::default());
        assert!(err.is_err());
    }

    #[test]
    fn escape_attempts_are_rejected() {
        let dir = TempDir::new().unwrap();
        write_module(
            dir.path(),
            "sneaky/index.js",
            "module.exports = require('../../package.json');",
        );
        std::fs::write(dir.path().join("package.json"), "{}").unwrap();

        let err = introspect_package(dir.path(), "sneaky", &ProbeOptions::default());
        assert!(err.is_err());
    }

    #[test]
    fn runaway_packages_hit_the_deadline() {
        let dir = TempDir::new().unwrap();
        write_module(dir.path(), "spin/index.js", "while (true) {}");

        let options = ProbeOptions {
            timeout: Duration::from_millis(100),
            ..ProbeOptions::default()
        };
        let started = Instant::now();
        let err = introspect_package(dir.path(), "spin", &options);
        assert!(err.is_err());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn throwing_packages_fail_cleanly() {
        let dir = TempDir::new().unwrap();
        write_module(dir.path(), "angry/index.js", "throw new Error('no');");
        let err = introspect_package(dir.path(), "angry", &ProbeOptions::default());
        assert!(err.is_err());
    }

    #[test]
    fn require_cycles_resolve() {
        let dir = TempDir::new().unwrap();
        write_module(
            dir.path(),
            "cycle/index.js",
            "exports.name = 'a';\nconst b = require('./b');\nexports.viaB = b.name;",
        );
        write_module(
            dir.path(),
            "cycle/b.js",
            "const a = require('./index');\nexports.name = 'b';",
        );

        let outcome =
            introspect_package(dir.path(), "cycle", &ProbeOptions::default()).unwrap();
        assert!(outcome.props.contains(&"name".to_string()));
        assert!(outcome.props.contains(&"viaB".to_string()));
    }
}
