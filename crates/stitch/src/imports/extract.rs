//! Collects existing import and require statements from the AST.
//!
//! Only statements that can be re-emitted losslessly become part of the
//! import block. Everything else (side-effect imports, aliased specifiers,
//! type-only imports, member requires other than `.default`, destructures
//! with defaults or rest) is left untouched where it stands.

use oxc_ast::ast::{
    Argument, BindingPatternKind, Expression, ImportDeclaration, ImportDeclarationSpecifier,
    ModuleExportName, ObjectPattern, Program, PropertyKey, Statement, VariableDeclaration,
    VariableDeclarator,
};

use crate::source::LineIndex;

use super::{ExistingImport, LineSpan};

/// Walk top-level statements and collect every recognized import.
pub(crate) fn collect_imports(program: &Program<'_>, index: &LineIndex) -> Vec<ExistingImport> {
    let mut found = Vec::new();
    for stmt in &program.body {
        match stmt {
            Statement::ImportDeclaration(decl) => {
                if let Some(import) = from_import_declaration(decl, index) {
                    found.push(import);
                }
            }
            Statement::VariableDeclaration(decl) => {
                found.extend(from_require_declaration(decl, index));
            }
            _ => {}
        }
    }
    found
}

fn line_span(start: u32, end: u32, index: &LineIndex) -> LineSpan {
    LineSpan {
        start: index.line_of(start),
        end: index.line_of(end),
    }
}

fn from_import_declaration(
    decl: &ImportDeclaration<'_>,
    index: &LineIndex,
) -> Option<ExistingImport> {
    if decl.import_kind.is_type() || decl.with_clause.is_some() {
        return None;
    }
    let specifiers = decl.specifiers.as_ref()?;
    if specifiers.is_empty() {
        return None;
    }

    let mut idents = Vec::new();
    let mut defaults = Vec::new();
    let mut props = Vec::new();

    for specifier in specifiers {
        match specifier {
            ImportDeclarationSpecifier::ImportDefaultSpecifier(spec) => {
                defaults.push(spec.local.name.to_string());
            }
            ImportDeclarationSpecifier::ImportNamespaceSpecifier(spec) => {
                idents.push(spec.local.name.to_string());
            }
            ImportDeclarationSpecifier::ImportSpecifier(spec) => {
                if spec.import_kind.is_type() {
                    return None;
                }
                let imported = match &spec.imported {
                    ModuleExportName::IdentifierName(name) => name.name.as_str(),
                    ModuleExportName::IdentifierReference(name) => name.name.as_str(),
                    ModuleExportName::StringLiteral(_) => return None,
                };
                // `{ a as b }` cannot round-trip through the prop set.
                if imported != spec.local.name.as_str() {
                    return None;
                }
                props.push(imported.to_string());
            }
        }
    }

    Some(ExistingImport {
        dep_id: decl.source.value.to_string(),
        idents,
        defaults,
        props,
        span: line_span(decl.span.start, decl.span.end, index),
    })
}

/// `const X = require('mod')` and friends. A declaration statement counts as
/// an import only when every one of its declarators is require-shaped;
/// otherwise the whole statement stays in place.
fn from_require_declaration(
    decl: &VariableDeclaration<'_>,
    index: &LineIndex,
) -> Vec<ExistingImport> {
    let span = line_span(decl.span.start, decl.span.end, index);
    let mut found = Vec::new();
    for declarator in &decl.declarations {
        match require_binding(declarator, span) {
            Some(import) => found.push(import),
            None => return Vec::new(),
        }
    }
    found
}

fn require_binding(declarator: &VariableDeclarator<'_>, span: LineSpan) -> Option<ExistingImport> {
    let init = declarator.init.as_ref()?;
    match &declarator.id.kind {
        BindingPatternKind::BindingIdentifier(local) => {
            if let Some(dep_id) = require_call(init) {
                return Some(ExistingImport {
                    dep_id,
                    idents: vec![local.name.to_string()],
                    defaults: Vec::new(),
                    props: Vec::new(),
                    span,
                });
            }
            if let Expression::StaticMemberExpression(member) = init {
                let dep_id = require_call(&member.object)?;
                if member.property.name == "default" {
                    return Some(ExistingImport {
                        dep_id,
                        idents: Vec::new(),
                        defaults: vec![local.name.to_string()],
                        props: Vec::new(),
                        span,
                    });
                }
            }
            None
        }
        BindingPatternKind::ObjectPattern(pattern) => {
            let dep_id = require_call(init)?;
            let props = shorthand_props(pattern)?;
            Some(ExistingImport {
                dep_id,
                idents: Vec::new(),
                defaults: Vec::new(),
                props,
                span,
            })
        }
        _ => None,
    }
}

/// Extract `{ a, b }` keys; anything fancier (rest, rename, default value,
/// computed key) disqualifies the pattern.
fn shorthand_props(pattern: &ObjectPattern<'_>) -> Option<Vec<String>> {
    if pattern.rest.is_some() {
        return None;
    }
    let mut props = Vec::new();
    for property in &pattern.properties {
        if property.computed {
            return None;
        }
        let key = match &property.key {
            PropertyKey::StaticIdentifier(name) => name.name.as_str(),
            _ => return None,
        };
        match &property.value.kind {
            BindingPatternKind::BindingIdentifier(binding) if binding.name == key => {}
            _ => return None,
        }
        props.push(key.to_string());
    }
    Some(props)
}

fn require_call(expr: &Expression<'_>) -> Option<String> {
    let Expression::CallExpression(call) = expr else {
        return None;
    };
    let Expression::Identifier(callee) = &call.callee else {
        return None;
    };
    if callee.name != "require" || call.arguments.len() != 1 {
        return None;
    }
    match call.arguments.first()? {
        Argument::StringLiteral(source) => Some(source.value.to_string()),
        _ => None,
    }
}
