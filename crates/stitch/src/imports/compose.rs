//! Builds the sorted, styled import block.
//!
//! Statements come out grouped external-then-local with one blank line
//! between the groups. Within a group, modules sort by basename then full
//! id; names within a statement sort lexicographically (the binding sets
//! are ordered). Absolute file ids are relativized against the target dir
//! and always emitted with `/` separators.

use std::path::Path;

use crate::style::{ImportKeyword, StyleDescriptor};

use super::{ImportBindings, LibsToAdd};

/// Longest a statement with a props destructure may be before it is
/// re-emitted with one prop per line.
const MAX_STATEMENT_LEN: usize = 76;

/// Compose the whole block. Empty string when nothing needs importing.
pub fn compose_block(style: &StyleDescriptor, dir: &Path, libs: &LibsToAdd) -> String {
    let mut externals: Vec<(String, &ImportBindings)> = Vec::new();
    let mut locals: Vec<(String, &ImportBindings)> = Vec::new();

    for (id, bindings) in libs {
        if bindings.is_empty() {
            continue;
        }
        let id = normalize_id(id, dir);
        if is_local_id(&id) {
            locals.push((id, bindings));
        } else {
            externals.push((id, bindings));
        }
    }

    for group in [&mut externals, &mut locals] {
        group.sort_by(|(a, _), (b, _)| {
            basename(a).cmp(basename(b)).then_with(|| a.cmp(b))
        });
    }

    let mut sections = Vec::new();
    for group in [&externals, &locals] {
        if group.is_empty() {
            continue;
        }
        let statements: Vec<String> = group
            .iter()
            .flat_map(|(id, bindings)| statements_for(style, id, bindings))
            .collect();
        sections.push(statements.join("\n"));
    }
    sections.join("\n\n")
}

/// Absolute file ids become dir-relative, `/`-separated, `./`-prefixed.
/// Ids read from source (package names, already-relative paths) pass
/// through untouched.
pub(crate) fn normalize_id(id: &str, dir: &Path) -> String {
    if !Path::new(id).is_absolute() {
        return id.to_string();
    }
    let relative = pathdiff::diff_paths(id, dir)
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| id.to_string());
    let mut text = relative.replace('\\', "/");
    if !text.starts_with('.') {
        text = format!("./{text}");
    }
    text
}

fn is_local_id(id: &str) -> bool {
    id.starts_with('.') || id.starts_with('/')
}

fn basename(id: &str) -> &str {
    id.rsplit('/').next().unwrap_or(id)
}

fn statements_for(style: &StyleDescriptor, id: &str, bindings: &ImportBindings) -> Vec<String> {
    match style.keyword {
        ImportKeyword::Require => require_statements(style, id, bindings),
        ImportKeyword::Import => import_statements(style, id, bindings),
    }
}

fn require_statements(style: &StyleDescriptor, id: &str, bindings: &ImportBindings) -> Vec<String> {
    let kind = style.kind.as_str();
    let q = style.quote.as_char();
    let semi = style.semi_str();
    let mut out = Vec::new();

    for name in &bindings.idents {
        out.push(format!("{kind} {name} = require({q}{id}{q}){semi}"));
    }
    for name in &bindings.defaults {
        out.push(format!("{kind} {name} = require({q}{id}{q}).default{semi}"));
    }
    if !bindings.props.is_empty() {
        let props: Vec<&String> = bindings.props.iter().collect();
        let joined = props
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let single = format!("{kind} {{ {joined} }} = require({q}{id}{q}){semi}");
        if single.chars().count() > MAX_STATEMENT_LEN {
            out.push(multiline_props(
                style,
                &format!("{kind} {{"),
                &props,
                &format!("}} = require({q}{id}{q}){semi}"),
            ));
        } else {
            out.push(single);
        }
    }
    out
}

/// Import form packs one default, at most one namespace, and at most one
/// props group per statement: the props group goes first (consuming the
/// first default), then remaining defaults pair with remaining namespaces.
fn import_statements(style: &StyleDescriptor, id: &str, bindings: &ImportBindings) -> Vec<String> {
    let q = style.quote.as_char();
    let semi = style.semi_str();
    let mut defaults = bindings.defaults.iter();
    let mut idents = bindings.idents.iter();
    let mut out = Vec::new();

    if !bindings.props.is_empty() {
        let props: Vec<&String> = bindings.props.iter().collect();
        let joined = props
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let head = defaults.next();
        let clause = match head {
            Some(default) => format!("{default}, {{ {joined} }}"),
            None => format!("{{ {joined} }}"),
        };
        let single = format!("import {clause} from {q}{id}{q}{semi}");
        if single.chars().count() > MAX_STATEMENT_LEN {
            let prefix = match head {
                Some(default) => format!("import {default}, {{"),
                None => "import {".to_string(),
            };
            out.push(multiline_props(
                style,
                &prefix,
                &props,
                &format!("}} from {q}{id}{q}{semi}"),
            ));
        } else {
            out.push(single);
        }
    }

    loop {
        let clause = match (defaults.next(), idents.next()) {
            (Some(default), Some(ident)) => format!("{default}, * as {ident}"),
            (Some(default), None) => default.to_string(),
            (None, Some(ident)) => format!("* as {ident}"),
            (None, None) => break,
        };
        out.push(format!("import {clause} from {q}{id}{q}{semi}"));
    }
    out
}

fn multiline_props(
    style: &StyleDescriptor,
    prefix: &str,
    props: &[&String],
    suffix: &str,
) -> String {
    let mut out = String::new();
    out.push_str(prefix);
    out.push('\n');
    for (i, prop) in props.iter().enumerate() {
        out.push_str(&style.tab);
        out.push_str(prop);
        if i + 1 < props.len() {
            out.push(',');
        } else {
            out.push_str(style.trailing_comma_str());
        }
        out.push('\n');
    }
    out.push_str(suffix);
    out
}
