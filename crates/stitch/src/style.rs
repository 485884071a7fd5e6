//! Formatting preferences for emitted import statements.
//!
//! The descriptor bundles everything the composer needs to match the file's
//! existing conventions. `detect` derives it from the input text with cheap
//! counts; callers that already know the style can construct one directly.

/// Which import statement family the file uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportKeyword {
    /// CommonJS `const x = require('mod')`.
    #[default]
    Require,
    /// ES `import x from 'mod'`.
    Import,
}

/// Declaration keyword for require-style statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeclKind {
    #[default]
    Const,
    Let,
    Var,
}

impl DeclKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Const => "const",
            Self::Let => "let",
            Self::Var => "var",
        }
    }
}

/// Quote character for module specifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quote {
    Single,
    #[default]
    Double,
}

impl Quote {
    pub fn as_char(&self) -> char {
        match self {
            Self::Single => '\'',
            Self::Double => '"',
        }
    }
}

/// Formatting options detected from (or imposed on) the input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleDescriptor {
    pub keyword: ImportKeyword,
    pub kind: DeclKind,
    pub quote: Quote,
    pub semi: bool,
    pub tab: String,
    pub trailing_comma: bool,
}

impl Default for StyleDescriptor {
    fn default() -> Self {
        Self {
            keyword: ImportKeyword::default(),
            kind: DeclKind::default(),
            quote: Quote::default(),
            semi: true,
            tab: "  ".to_string(),
            trailing_comma: false,
        }
    }
}

impl StyleDescriptor {
    /// Derive a descriptor from the source text.
    ///
    /// These are frequency heuristics, not a grammar: they only have to pick
    /// the same convention a human skimming the file would.
    pub fn detect(source: &str) -> Self {
        let lines: Vec<&str> = source.lines().collect();

        let import_count = lines
            .iter()
            .filter(|l| l.trim_start().starts_with("import "))
            .count();
        let require_count = source.matches("require(").count();
        let keyword = if import_count > require_count {
            ImportKeyword::Import
        } else {
            ImportKeyword::Require
        };

        let singles = source.matches('\'').count();
        let doubles = source.matches('"').count();
        let quote = if singles > doubles {
            Quote::Single
        } else {
            Quote::Double
        };

        let statement_lines = lines.iter().filter(|l| !l.trim().is_empty()).count();
        let semi_lines = lines.iter().filter(|l| l.trim_end().ends_with(';')).count();
        let semi = statement_lines == 0 || semi_lines > 0;

        let const_count = source.matches("const ").count();
        let let_count = source.matches("let ").count();
        let var_count = source.matches("var ").count();
        let kind = if var_count > const_count && var_count > let_count {
            DeclKind::Var
        } else if let_count > const_count {
            DeclKind::Let
        } else {
            DeclKind::Const
        };

        let tab = lines
            .iter()
            .find(|l| {
                !l.trim().is_empty() && (l.starts_with(' ') || l.starts_with('\t'))
            })
            .map(|l| {
                let run: String = l.chars().take_while(|c| c.is_whitespace()).collect();
                if run.contains('\t') { "\t".to_string() } else { run }
            })
            .unwrap_or_else(|| "  ".to_string());

        let trailing_comma = lines.windows(2).any(|pair| {
            pair[0].trim_end().ends_with(',') && pair[1].trim_start().starts_with('}')
        });

        Self {
            keyword,
            kind,
            quote,
            semi,
            tab,
            trailing_comma,
        }
    }

    pub fn semi_str(&self) -> &'static str {
        if self.semi { ";" } else { "" }
    }

    pub fn trailing_comma_str(&self) -> &'static str {
        if self.trailing_comma { "," } else { "" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_import_keyword() {
        let style = StyleDescriptor::detect("import a from 'a';\nimport b from 'b';\na();\n");
        assert_eq!(style.keyword, ImportKeyword::Import);
        assert_eq!(style.quote, Quote::Single);
    }

    #[test]
    fn detects_require_keyword() {
        let style = StyleDescriptor::detect("var a = require(\"a\");\na();\n");
        assert_eq!(style.keyword, ImportKeyword::Require);
        assert_eq!(style.kind, DeclKind::Var);
        assert_eq!(style.quote, Quote::Double);
    }

    #[test]
    fn detects_missing_semicolons() {
        let style = StyleDescriptor::detect("foo()\nbar()\n");
        assert!(!style.semi);
        let with = StyleDescriptor::detect("foo();\n");
        assert!(with.semi);
    }

    #[test]
    fn detects_indentation() {
        let style = StyleDescriptor::detect("function f() {\n    return 1;\n}\n");
        assert_eq!(style.tab, "    ");
        let tabs = StyleDescriptor::detect("function f() {\n\treturn 1;\n}\n");
        assert_eq!(tabs.tab, "\t");
    }

    #[test]
    fn detects_trailing_comma() {
        let style = StyleDescriptor::detect("const x = {\n  a: 1,\n};\n");
        assert!(style.trailing_comma);
        let without = StyleDescriptor::detect("const x = {\n  a: 1\n};\n");
        assert!(!without.trailing_comma);
    }

    #[test]
    fn directive_file_matches_double_quote_require() {
        // A bare file with one double-quoted directive keeps defaults that
        // emit `const bar = require("bar");`.
        let style = StyleDescriptor::detect("\"use strict\";\nfoo();\n");
        assert_eq!(style.keyword, ImportKeyword::Require);
        assert_eq!(style.quote, Quote::Double);
        assert!(style.semi);
    }
}
