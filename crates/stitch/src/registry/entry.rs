//! Registry entry types and identifier derivation.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// How an imported name binds to the module that exports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExportKind {
    /// The module's whole value: `const x = require('mod')`.
    Ident,
    /// The module's default export: `import x from 'mod'`.
    Default,
    /// A named property: `const { x } = require('mod')`.
    Prop,
}

/// Where a module id was registered from. Lower wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DepPriority {
    ProjectFile = 1,
    Dependency = 2,
    Builtin = 3,
}

/// Resolution result for one identifier name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepInfo {
    pub id: String,
    pub priority: DepPriority,
    pub kind: ExportKind,
}

/// Everything the registry knows about one module.
///
/// Invariant at query time: when `defaults` is non-empty, `idents` is empty
/// (see [`RegistryEntry::promote_defaults`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub version: String,
    #[serde(default)]
    pub idents: BTreeSet<String>,
    #[serde(default)]
    pub defaults: BTreeSet<String>,
    #[serde(default)]
    pub props: BTreeSet<String>,
}

impl RegistryEntry {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..Self::default()
        }
    }

    /// Reclassify every ident as a default, forcing `import X from …` form.
    ///
    /// Runs after both id-derivation and export analysis have been merged in,
    /// so a name appearing as both ident and default ends up a default.
    pub fn promote_defaults(&mut self) {
        let promoted = std::mem::take(&mut self.idents);
        self.defaults.extend(promoted);
    }
}

/// Identifier candidates derived from a module id.
///
/// The base name is the id itself when it has no `/`, the basename for
/// package ids, and the extension-stripped basename for file ids. The base
/// (when it is already a valid identifier), its camelCase form, and its
/// PascalCase form all register, deduplicated.
pub fn derived_idents(id: &str) -> Vec<String> {
    let base = if Path::new(id).is_absolute() {
        Path::new(id)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    } else if let Some((_, basename)) = id.rsplit_once('/') {
        basename.to_string()
    } else {
        id.to_string()
    };

    let mut names = Vec::new();
    if is_valid_identifier(&base) {
        names.push(base.clone());
    }
    let camel = camel_case(&base);
    if is_valid_identifier(&camel) && !names.contains(&camel) {
        names.push(camel.clone());
    }
    let pascal = pascal_case(&base);
    if is_valid_identifier(&pascal) && !names.contains(&pascal) {
        names.push(pascal);
    }
    names
}

/// Letters, digits, `_`, `$`; no leading digit.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' || first == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// camelCase: split on runs of non-word characters and underscores,
/// lowercase the first token, TitleCase the rest.
pub fn camel_case(name: &str) -> String {
    let mut out = String::new();
    for token in tokens(name) {
        if out.is_empty() {
            out.push_str(&token.to_lowercase());
        } else {
            let mut chars = token.chars();
            if let Some(first) = chars.next() {
                out.extend(first.to_uppercase());
                out.push_str(chars.as_str());
            }
        }
    }
    out
}

/// PascalCase: camelCase with the first letter uppercased.
pub fn pascal_case(name: &str) -> String {
    let camel = camel_case(name);
    let mut chars = camel.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => camel,
    }
}

fn tokens(name: &str) -> impl Iterator<Item = &str> {
    name.split(|c: char| !(c.is_alphanumeric() || c == '$'))
        .flat_map(|run| run.split('_'))
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promote_moves_idents_into_defaults() {
        let mut entry = RegistryEntry::new("1.0.0");
        entry.idents.insert("foo".to_string());
        entry.defaults.insert("bar".to_string());
        entry.promote_defaults();
        assert!(entry.idents.is_empty());
        assert!(entry.defaults.contains("foo"));
        assert!(entry.defaults.contains("bar"));
    }

    #[test]
    fn priority_orders_lower_first() {
        assert!(DepPriority::ProjectFile < DepPriority::Dependency);
        assert!(DepPriority::Dependency < DepPriority::Builtin);
    }

    #[test]
    fn camel_and_pascal_case() {
        assert_eq!(camel_case("foo-bar"), "fooBar");
        assert_eq!(camel_case("foo_bar-baz"), "fooBarBaz");
        assert_eq!(camel_case("XML-parser"), "xmlParser");
        assert_eq!(pascal_case("foo-bar"), "FooBar");
        assert_eq!(camel_case("lodash.get"), "lodashGet");
    }

    #[test]
    fn derives_from_plain_package_id() {
        assert_eq!(derived_idents("lodash"), vec!["lodash", "Lodash"]);
    }

    #[test]
    fn derives_from_scoped_package_id() {
        // Base is the basename; dashes are camelized.
        assert_eq!(
            derived_idents("@scope/date-fns"),
            vec!["dateFns", "DateFns"]
        );
    }

    #[test]
    fn derives_from_file_id() {
        assert_eq!(
            derived_idents("/project/lib/my-utils.js"),
            vec!["myUtils", "MyUtils"]
        );
        assert_eq!(
            derived_idents("/project/lib/helper.js"),
            vec!["helper", "Helper"]
        );
    }

    #[test]
    fn skips_invalid_bases() {
        // "123-go" is not a valid identifier and neither is "123Go".
        assert!(derived_idents("123-go").is_empty());
    }

    #[test]
    fn dollar_is_identifier_material() {
        assert_eq!(derived_idents("$"), vec!["$"]);
        assert!(is_valid_identifier("$el"));
        assert!(!is_valid_identifier("1abc"));
    }
}
