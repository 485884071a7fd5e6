//! Line-indexed views over the input source.
//!
//! The rewriter works in whole lines so that everything outside the import
//! block keeps its original line numbers. `SourceView` is the 1-indexed line
//! table (index 0 is a sentinel), and `LineIndex` maps byte offsets from AST
//! spans back to line numbers with a binary search.

/// Byte-offset to line lookup over the starts of every line.
///
/// Line 1 always starts at offset 0 and each `\n` opens the next line, so
/// the table is never empty and every u32 offset lands on some line.
pub struct LineIndex {
    line_starts: Vec<u32>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(at, _)| (at + 1) as u32))
            .collect();
        Self { line_starts }
    }

    /// 1-indexed line containing the byte offset.
    ///
    /// A line owns every offset from its start up to and including its
    /// terminating `\n`, so the number of recorded starts at or before the
    /// offset is exactly the line number. The start at 0 keeps that count
    /// positive; offsets past the end belong to the last line.
    pub fn line_of(&self, offset: u32) -> u32 {
        self.line_starts.partition_point(|&start| start <= offset) as u32
    }

    /// Byte offset at which the given 1-indexed line begins. Out-of-range
    /// lines clamp to the last recorded start.
    pub fn line_start(&self, line: u32) -> u32 {
        let idx = (line.saturating_sub(1)) as usize;
        match self.line_starts.get(idx) {
            Some(&start) => start,
            None => self.line_starts.last().copied().unwrap_or(0),
        }
    }
}

/// 1-indexed, line-based view of the input text.
///
/// `lines[0]` is an empty sentinel so that line numbers from the parser can
/// be used directly as indices.
pub struct SourceView {
    lines: Vec<String>,
}

impl SourceView {
    pub fn new(source: &str) -> Self {
        let mut lines = vec![String::new()];
        lines.extend(source.split('\n').map(str::to_string));
        // A trailing newline produces an empty final element; drop it so the
        // view holds only real lines. Final-newline handling is the
        // rewriter's job.
        if source.ends_with('\n') {
            lines.pop();
        }
        Self { lines }
    }

    /// Number of real lines (the sentinel is not counted).
    pub fn line_count(&self) -> u32 {
        (self.lines.len() - 1) as u32
    }

    pub fn line_text(&self, line: u32) -> &str {
        self.lines
            .get(line as usize)
            .map(String::as_str)
            .unwrap_or("")
    }

    /// True when the line contains only whitespace.
    pub fn is_blank(&self, line: u32) -> bool {
        self.line_text(line).trim().is_empty()
    }
}
