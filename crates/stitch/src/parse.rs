//! Parser adapter over the oxc toolchain.
//!
//! Parsing and scope analysis are oxc's job; this module wraps one parse
//! into the owned facts the rest of the pipeline needs: the existing import
//! statements, the unresolved reference names that survive filtering, which
//! top-level bindings are actually referenced, and the location of a leading
//! string directive.

use std::collections::BTreeSet;

use oxc_allocator::Allocator;
use oxc_ast::AstKind;
use oxc_ast::ast::UnaryOperator;
use oxc_parser::Parser;
use oxc_semantic::{AstNodes, NodeId, SemanticBuilder};
use oxc_span::{GetSpan, SourceType};
use rustc_hash::FxHashSet;

use crate::imports::{ExistingImport, extract};
use crate::source::LineIndex;
use crate::{Error, Result};

/// Location of a leading string directive such as `"use strict"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveLoc {
    /// 1-indexed line the directive starts on.
    pub line: u32,
    /// Byte column just past the directive (including a trailing `;`),
    /// relative to the start of its line.
    pub end_column: usize,
    /// True when nothing but whitespace follows the directive on its line.
    pub owns_line: bool,
}

/// Everything the resolver and rewriter need from one parse.
#[derive(Debug)]
pub struct SourceAnalysis {
    pub existing_imports: Vec<ExistingImport>,
    /// Referenced-but-undeclared identifier names, deduplicated and sorted,
    /// with `typeof` operands and write-only references filtered out.
    pub undefined: Vec<String>,
    /// Names of top-level bindings that have at least one resolved
    /// reference. Used to decide which existing import bindings survive.
    pub used_bindings: FxHashSet<String>,
    pub directive: Option<DirectiveLoc>,
}

/// Parse the input and run scope analysis.
///
/// A parse failure aborts the whole invocation with location info; the
/// rewrite is all-or-nothing.
pub fn analyze_source(code: &str) -> Result<SourceAnalysis> {
    let allocator = Allocator::default();
    let index = LineIndex::new(code);
    let ret = Parser::new(&allocator, code, SourceType::jsx()).parse();

    if ret.panicked || !ret.errors.is_empty() {
        let (message, offset) = ret
            .errors
            .first()
            .map(|diagnostic| {
                let offset = diagnostic
                    .labels
                    .as_ref()
                    .and_then(|labels| labels.first())
                    .map(|label| label.offset() as u32)
                    .unwrap_or(0);
                (diagnostic.message.to_string(), offset)
            })
            .unwrap_or_else(|| ("failed to parse source".to_string(), 0));
        let (line, column) = line_column(&index, code, offset);
        return Err(Error::Parse {
            message,
            line,
            column,
        });
    }

    let semantic = SemanticBuilder::new().build(&ret.program).semantic;
    let scoping = semantic.scoping();
    let nodes = semantic.nodes();

    let mut undefined = BTreeSet::new();
    for (name, reference_ids) in scoping.root_unresolved_references() {
        for reference_id in reference_ids {
            let reference = scoping.get_reference(*reference_id);
            let flags = reference.flags();
            if flags.is_write() || !flags.is_read() {
                continue;
            }
            // `typeof missing` is legal without a binding.
            if is_typeof_operand(nodes, reference.node_id()) {
                continue;
            }
            undefined.insert(name.to_string());
            break;
        }
    }

    let root = scoping.root_scope_id();
    let mut used_bindings = FxHashSet::default();
    for symbol_id in scoping.symbol_ids() {
        if scoping.symbol_scope_id(symbol_id) != root {
            continue;
        }
        if scoping.get_resolved_reference_ids(symbol_id).is_empty() {
            continue;
        }
        used_bindings.insert(scoping.symbol_name(symbol_id).to_string());
    }

    let directive = ret.program.directives.first().map(|directive| {
        let span = directive.span();
        let line = index.line_of(span.start);
        let bytes = code.as_bytes();
        let mut end = span.end as usize;
        let mut cursor = end;
        while cursor < bytes.len() && (bytes[cursor] == b' ' || bytes[cursor] == b'\t') {
            cursor += 1;
        }
        if cursor < bytes.len() && bytes[cursor] == b';' {
            end = cursor + 1;
        }
        let line_end = code[end..]
            .find('\n')
            .map(|at| end + at)
            .unwrap_or(code.len());
        DirectiveLoc {
            line,
            end_column: end - index.line_start(line) as usize,
            owns_line: code[end..line_end].trim().is_empty(),
        }
    });

    let existing_imports = extract::collect_imports(&ret.program, &index);

    Ok(SourceAnalysis {
        existing_imports,
        undefined: undefined.into_iter().collect(),
        used_bindings,
        directive,
    })
}

/// 1-indexed line and 0-indexed character column for a byte offset.
/// Columns count characters, not bytes, so multibyte text earlier on the
/// line does not inflate them.
fn line_column(index: &LineIndex, code: &str, offset: u32) -> (u32, u32) {
    let line = index.line_of(offset);
    let start = index.line_start(line) as usize;
    let end = (offset as usize).min(code.len());
    let column = code
        .get(start..end)
        .map(|prefix| prefix.chars().count() as u32)
        .unwrap_or(0);
    (line, column)
}

fn is_typeof_operand(nodes: &AstNodes<'_>, node_id: NodeId) -> bool {
    matches!(
        nodes.parent_kind(node_id),
        Some(AstKind::UnaryExpression(unary)) if unary.operator == UnaryOperator::Typeof
    )
}
