//! Fixture table for the static export analyzer, plus the promotion rule
//! end of the pipeline (scan -> entry -> promote).

use std::collections::BTreeSet;
use std::path::Path;

use stitch::registry::entry::{derived_idents, RegistryEntry};
use stitch::registry::exports::{analyze_exports, ExportScan};

fn set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn scan(code: &str) -> ExportScan {
    analyze_exports(Path::new("fixture.js"), code).expect("fixture must parse")
}

#[test]
fn analyzer_fixtures() {
    struct Fixture {
        input: &'static str,
        idents: &'static [&'static str],
        props: &'static [&'static str],
        has_default: bool,
    }

    let fixtures = [
        Fixture {
            input: "module.exports = function foo() {};",
            idents: &["foo"],
            props: &[],
            has_default: true,
        },
        Fixture {
            input: "module.exports = { a: 3, b() {}, c: true };",
            idents: &[],
            props: &["a", "b", "c"],
            has_default: false,
        },
        Fixture {
            input: "const x = {};\nx.a = 3;\nx.b = () => {};\nx.c = true;\nmodule.exports = x;",
            idents: &["x"],
            props: &["a", "b", "c"],
            has_default: false,
        },
        Fixture {
            input: "const x = {};\nx.a = 3;\nx.b = () => {};\nx.c = true;\nx = { d: \"hi\" };\nconst y = x;\nmodule.exports = y;",
            idents: &["y"],
            props: &["d"],
            has_default: false,
        },
        Fixture {
            input: "exports.alpha = 1;\nexports.beta = 2;",
            idents: &[],
            props: &["alpha", "beta"],
            has_default: false,
        },
        Fixture {
            input: "export default class Widget {}",
            idents: &["Widget"],
            props: &[],
            has_default: true,
        },
        Fixture {
            input: "export const a = 1;\nexport { a as default };",
            idents: &["a"],
            props: &["a"],
            has_default: true,
        },
    ];

    for fixture in fixtures {
        let result = scan(fixture.input);
        assert_eq!(result.idents, set(fixture.idents), "idents for {:?}", fixture.input);
        assert_eq!(result.props, set(fixture.props), "props for {:?}", fixture.input);
        assert_eq!(
            result.has_default, fixture.has_default,
            "has_default for {:?}",
            fixture.input
        );
    }
}

#[test]
fn promotion_clears_idents_when_a_default_exists() {
    // Scenario A through the registry entry: the analyzer reports an ident
    // plus the default marker; after merging and promotion the entry holds
    // defaults only.
    let result = scan("module.exports = function foo() {};");
    let mut entry = RegistryEntry::new("fixture");
    entry.idents.extend(result.idents.clone());
    entry.props.extend(result.props.clone());
    if result.has_default {
        entry.promote_defaults();
    }
    assert!(entry.idents.is_empty());
    assert_eq!(entry.defaults, set(&["foo"]));
}

#[test]
fn ident_default_conflicts_resolve_to_default() {
    // The same name exported both ways: promotion runs last, so the default
    // wins and `idents` ends up empty.
    let result = scan("const foo = 1;\nexport { foo };\nexport default foo;");
    assert!(result.has_default);
    assert_eq!(result.idents, set(&["foo"]));
    assert_eq!(result.props, set(&["foo"]));

    let mut entry = RegistryEntry::new("fixture");
    entry.idents.extend(result.idents.clone());
    entry.props.extend(result.props.clone());
    entry.promote_defaults();
    assert!(entry.idents.is_empty());
    assert!(entry.defaults.contains("foo"));
    assert!(entry.props.contains("foo"));
}

#[test]
fn derived_idents_merge_with_scan_results() {
    // A file with a default export promotes its derived names too, so the
    // filename-based identifier imports as a default.
    let result = scan("export default 42;");
    let mut entry = RegistryEntry::new("fixture");
    entry.idents.extend(result.idents);
    entry
        .idents
        .extend(derived_idents("/project/lib/data-source.js"));
    if result.has_default {
        entry.promote_defaults();
    }
    assert!(entry.idents.is_empty());
    assert_eq!(entry.defaults, set(&["dataSource", "DataSource"]));
}
