//! Splices the composed import block back into the source.
//!
//! Works line by line: the lines spanned by the old import statements are
//! removed (with whitespace-only gaps between them coalesced), the new block
//! is inserted at the chosen target, and the result ends with exactly one
//! newline. When the file opens with a string directive that shares its line
//! with other code, the block is spliced into that line's text - the only
//! case where an edit happens inside a line rather than between lines.

use std::collections::BTreeSet;

use crate::parse::DirectiveLoc;
use crate::source::SourceView;

use super::ExistingImport;

pub fn splice(
    view: &SourceView,
    existing: &[ExistingImport],
    directive: Option<&DirectiveLoc>,
    block: &str,
) -> String {
    let has_block = !block.is_empty();

    let mut removed: BTreeSet<u32> = BTreeSet::new();
    for import in existing {
        for line in import.span.start..=import.span.end {
            removed.insert(line);
        }
    }

    // Coalesce: whitespace-only runs between two removed lines go too.
    let marks: Vec<u32> = removed.iter().copied().collect();
    for pair in marks.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if b > a + 1 && (a + 1..b).all(|line| view.is_blank(line)) {
            removed.extend(a + 1..b);
        }
    }

    // When the whole block vanishes, take the single blank line that
    // trailed it as well.
    if !has_block && !removed.is_empty() {
        if let Some(&last) = removed.iter().next_back() {
            let next = last + 1;
            if next <= view.line_count() && view.is_blank(next) {
                removed.insert(next);
            }
        }
    }

    // Pick where the block goes.
    let mut after_line: Option<u32> = None;
    let mut inline: Option<(u32, usize)> = None;
    let mut block_lines: Vec<String> = Vec::new();

    if let Some(first) = existing.iter().map(|import| import.span.start).min() {
        if has_block {
            after_line = Some(first);
            block_lines = block.lines().map(str::to_string).collect();
        }
    } else if has_block {
        match directive {
            Some(loc) if loc.owns_line => {
                after_line = Some(loc.line);
                block_lines.push(String::new());
                block_lines.extend(block.lines().map(str::to_string));
                block_lines.push(String::new());
            }
            Some(loc) => {
                inline = Some((loc.line, loc.end_column));
            }
            None => {
                after_line = Some(0);
                block_lines = block.lines().map(str::to_string).collect();
            }
        }
    }

    let mut out: Vec<String> = Vec::new();
    if after_line == Some(0) {
        out.extend(block_lines.iter().cloned());
    }
    for line in 1..=view.line_count() {
        if let Some((target, column)) = inline {
            if line == target {
                let text = view.line_text(line);
                let column = column.min(text.len());
                out.push(format!(
                    "{}\n\n{}\n\n{}",
                    &text[..column],
                    block,
                    &text[column..]
                ));
                continue;
            }
        }
        if !removed.contains(&line) {
            out.push(view.line_text(line).to_string());
        }
        if after_line == Some(line) {
            out.extend(block_lines.iter().cloned());
        }
    }

    let mut text = out.join("\n");
    while text.ends_with('\n') {
        text.pop();
    }
    text.push('\n');
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imports::LineSpan;

    fn import_at(start: u32, end: u32) -> ExistingImport {
        ExistingImport {
            dep_id: "mod".to_string(),
            idents: vec!["x".to_string()],
            defaults: Vec::new(),
            props: Vec::new(),
            span: LineSpan { start, end },
        }
    }

    #[test]
    fn no_imports_no_block_round_trips() {
        let view = SourceView::new("foo();\nbar();\n");
        assert_eq!(splice(&view, &[], None, ""), "foo();\nbar();\n");
    }

    #[test]
    fn block_replaces_existing_imports_in_place() {
        let view = SourceView::new("const a = require('a');\nfoo();\n");
        let out = splice(
            &view,
            &[import_at(1, 1)],
            None,
            "const b = require(\"b\");",
        );
        assert_eq!(out, "const b = require(\"b\");\nfoo();\n");
    }

    #[test]
    fn coalesces_blank_lines_between_removed_imports() {
        let view = SourceView::new("const a = require('a');\n\nconst b = require('b');\nfoo();\n");
        let out = splice(
            &view,
            &[import_at(1, 1), import_at(3, 3)],
            None,
            "const c = require(\"c\");",
        );
        assert_eq!(out, "const c = require(\"c\");\nfoo();\n");
    }

    #[test]
    fn removing_everything_takes_the_trailing_blank() {
        let view = SourceView::new("const a = require('a');\n\nfoo();\n");
        let out = splice(&view, &[import_at(1, 1)], None, "");
        assert_eq!(out, "foo();\n");
    }

    #[test]
    fn keeps_trailing_blank_when_block_remains() {
        let view = SourceView::new("const a = require('a');\n\nfoo();\n");
        let out = splice(
            &view,
            &[import_at(1, 1)],
            None,
            "const b = require(\"b\");",
        );
        assert_eq!(out, "const b = require(\"b\");\n\nfoo();\n");
    }

    #[test]
    fn directive_on_its_own_line_gets_blank_padding() {
        let view = SourceView::new("\"use strict\";\nfoo();\n");
        let directive = DirectiveLoc {
            line: 1,
            end_column: 13,
            owns_line: true,
        };
        let out = splice(&view, &[], Some(&directive), "const bar = require(\"bar\");");
        assert_eq!(
            out,
            "\"use strict\";\n\nconst bar = require(\"bar\");\n\nfoo();\n"
        );
    }

    #[test]
    fn directive_sharing_a_line_is_spliced_inside_it() {
        let view = SourceView::new("\"use strict\"; foo();\n");
        let directive = DirectiveLoc {
            line: 1,
            end_column: 13,
            owns_line: false,
        };
        let out = splice(&view, &[], Some(&directive), "const bar = require(\"bar\");");
        assert_eq!(
            out,
            "\"use strict\";\n\nconst bar = require(\"bar\");\n\n foo();\n"
        );
    }

    #[test]
    fn no_directive_prepends_at_the_top() {
        let view = SourceView::new("foo();\n");
        let out = splice(&view, &[], None, "const bar = require(\"bar\");");
        assert_eq!(out, "const bar = require(\"bar\");\nfoo();\n");
    }

    #[test]
    fn multiline_block_lands_intact() {
        let view = SourceView::new("foo();\n");
        let out = splice(&view, &[], None, "const a = require(\"a\");\nconst b = require(\"b\");");
        assert_eq!(
            out,
            "const a = require(\"a\");\nconst b = require(\"b\");\nfoo();\n"
        );
    }

    #[test]
    fn output_ends_with_exactly_one_newline() {
        let view = SourceView::new("foo();\n\n\n");
        assert_eq!(splice(&view, &[], None, ""), "foo();\n");
        let view = SourceView::new("foo();");
        assert_eq!(splice(&view, &[], None, ""), "foo();\n");
    }

    #[test]
    fn multi_line_import_spans_are_fully_removed() {
        let view = SourceView::new("const {\n  a,\n} = require('m');\nfoo();\n");
        let mut import = import_at(1, 3);
        import.props = vec!["a".to_string()];
        import.idents.clear();
        let out = splice(&view, &[import], None, "const { a } = require(\"m\");");
        assert_eq!(out, "const { a } = require(\"m\");\nfoo();\n");
    }
}
