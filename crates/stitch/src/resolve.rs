//! Builds the merged target set of imports for the rewrite.
//!
//! The import block is conceptually removed first. Bindings the old block
//! introduced are re-added only when something in the file references them;
//! every remaining unresolved identifier is looked up in the registry.
//! Nothing outside the rewritten block is ever touched.

use crate::imports::LibsToAdd;
use crate::parse::SourceAnalysis;
use crate::registry::{ExportKind, Registry};

pub fn imports_to_add(analysis: &SourceAnalysis, registry: &Registry) -> LibsToAdd {
    let mut libs = LibsToAdd::default();

    for import in &analysis.existing_imports {
        let bindings = libs.entry(import.dep_id.clone()).or_default();
        for name in &import.idents {
            if analysis.used_bindings.contains(name) {
                bindings.idents.insert(name.clone());
            }
        }
        for name in &import.defaults {
            if analysis.used_bindings.contains(name) {
                bindings.defaults.insert(name.clone());
            }
        }
        for name in &import.props {
            if analysis.used_bindings.contains(name) {
                bindings.props.insert(name.clone());
            }
        }
    }

    for name in &analysis.undefined {
        let Some(dep) = registry.search(name) else {
            continue;
        };
        let bindings = libs.entry(dep.id.clone()).or_default();
        match dep.kind {
            ExportKind::Ident => bindings.idents.insert(name.clone()),
            ExportKind::Default => bindings.defaults.insert(name.clone()),
            ExportKind::Prop => bindings.props.insert(name.clone()),
        };
    }

    libs
}

/// True when the target set would emit at least one statement.
pub fn has_statements(libs: &LibsToAdd) -> bool {
    libs.values().any(|bindings| !bindings.is_empty())
}
