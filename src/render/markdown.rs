//! Markdown-ish source text → classified blocks.
//!
//! The model's answer is only loosely markdown: headings, one-line paragraphs
//! and pipe tables that frequently lack the `| --- |` separator row. Parsing
//! runs in four passes over the line sequence:
//!
//! 1. entity decoding (`&amp;`, `&lt;`, …) on every line
//! 2. table detection: runs of two or more consecutive pipe rows
//! 3. separator synthesis for runs that lack one
//! 4. line classification and block assembly
//!
//! Nothing here can fail. Any line that is not a heading or part of a table
//! run becomes a paragraph, and blank lines are counted as skipped, so every
//! normalized line is accounted for by exactly one block or the skip count.

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

// ── Entities ─────────────────────────────────────────────────────────────────

/// Named entities decoded before classification. `&amp;` comes last so that
/// `&amp;lt;` decodes to the literal text `&lt;`.
const ENTITIES: [(&str, &str); 8] = [
    ("&nbsp;", "\u{a0}"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&apos;", "'"),
    ("&ndash;", "\u{2013}"),
    ("&mdash;", "\u{2014}"),
    ("&amp;", "&"),
];

/// Replace the supported named entities with their literal characters.
pub fn decode_entities(line: &str) -> String {
    if !line.contains('&') {
        return line.to_string();
    }
    ENTITIES
        .iter()
        .fold(line.to_string(), |acc, (from, to)| acc.replace(from, to))
}

// ── Table detection ──────────────────────────────────────────────────────────

/// `|` … `|` … `|`: outer pipes plus at least one interior pipe.
static RE_TABLE_ROW: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\|.*\|.*\|$").unwrap());

/// Cells made only of dashes and optional alignment colons.
static RE_SEPARATOR_ROW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\|(?:\s*:?-+:?\s*\|)+$").unwrap());

/// True for a line that could be a pipe-table row.
pub fn is_table_row(line: &str) -> bool {
    RE_TABLE_ROW.is_match(line.trim())
}

/// True for a `| --- | :---: |` style separator row.
pub fn is_separator_row(line: &str) -> bool {
    let trimmed = line.trim();
    is_table_row(trimmed) && RE_SEPARATOR_ROW.is_match(trimmed)
}

/// Ranges of consecutive table rows that are at least two lines long.
///
/// A lone pipe row is left out: it is prose that happens to contain pipes.
pub fn table_runs<S: AsRef<str>>(lines: &[S]) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut start: Option<usize> = None;

    for (i, line) in lines.iter().enumerate() {
        match (is_table_row(line.as_ref()), start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                if i - s >= 2 {
                    runs.push(s..i);
                }
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        if lines.len() - s >= 2 {
            runs.push(s..lines.len());
        }
    }
    runs
}

/// Build a separator row for a header row: one `---` cell per column.
fn separator_for(header: &str) -> String {
    let columns = header.trim().matches('|').count().saturating_sub(1).max(1);
    std::iter::once("|")
        .chain(std::iter::repeat_n(" --- |", columns))
        .collect()
}

/// Insert a separator row after the first row of every table run that has
/// none. All other lines pass through unchanged.
pub fn normalize_tables<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    let runs = table_runs(lines);
    let mut out = Vec::with_capacity(lines.len() + runs.len());
    let mut runs = runs.into_iter().peekable();

    for (i, line) in lines.iter().enumerate() {
        let line = line.as_ref();
        out.push(line.to_string());

        if let Some(run) = runs.peek() {
            if run.start == i {
                let has_separator = lines[run.clone()]
                    .iter()
                    .any(|l| is_separator_row(l.as_ref()));
                if !has_separator {
                    out.push(separator_for(line));
                }
                runs.next();
            }
        }
    }
    out
}

// ── Classification ───────────────────────────────────────────────────────────

/// Heading emphasis level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingLevel {
    H1,
    H2,
    H3,
}

/// What a single normalized line is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass {
    Heading { level: HeadingLevel, text: String },
    TableSeparator,
    TableRow,
    Paragraph,
}

/// Classify one line. `in_table_run` says whether table detection placed the
/// line inside a run; pipe rows outside a run are paragraphs.
///
/// Heading markers must start the line; an indented `# ` is prose.
pub fn classify_line(line: &str, in_table_run: bool) -> LineClass {
    let trimmed = line.trim();

    for (prefix, level) in [
        ("### ", HeadingLevel::H3),
        ("## ", HeadingLevel::H2),
        ("# ", HeadingLevel::H1),
    ] {
        if let Some(text) = line.trim_end().strip_prefix(prefix) {
            return LineClass::Heading {
                level,
                text: text.trim().to_string(),
            };
        }
    }

    if in_table_run && is_separator_row(trimmed) {
        LineClass::TableSeparator
    } else if in_table_run && is_table_row(trimmed) {
        LineClass::TableRow
    } else {
        LineClass::Paragraph
    }
}

// ── Blocks ───────────────────────────────────────────────────────────────────

/// A pipe table after assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableBlock {
    /// Column count, taken from the first data row.
    pub columns: usize,
    /// Whether the first row is a header (the run had a separator row).
    pub header: bool,
    /// Data rows; every row has exactly `columns` cells.
    pub rows: Vec<Vec<String>>,
}

impl TableBlock {
    /// Assemble a table from the lines of one run.
    ///
    /// Separator rows set `header` and are otherwise dropped. Rows are padded
    /// with empty cells or truncated to the first row's cell count.
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Self {
        let mut header = false;
        let mut rows: Vec<Vec<String>> = Vec::new();

        for line in lines {
            let line = line.as_ref();
            match classify_line(line, true) {
                LineClass::TableSeparator => header = true,
                LineClass::TableRow => rows.push(split_cells(line)),
                // A line without an interior pipe still becomes a short row.
                LineClass::Paragraph | LineClass::Heading { .. } => rows.push(split_cells(line)),
            }
        }

        let columns = rows.first().map(Vec::len).unwrap_or(0);
        for row in &mut rows {
            row.resize(columns, String::new());
        }

        Self {
            columns,
            header,
            rows,
        }
    }

    /// Number of rows styled as header rows (0 or 1).
    pub fn header_rows(&self) -> usize {
        usize::from(self.header && !self.rows.is_empty())
    }

    /// Number of body rows.
    pub fn body_rows(&self) -> usize {
        self.rows.len() - self.header_rows()
    }
}

/// Split a pipe row into trimmed cells, dropping the fragments outside the
/// outer pipes.
fn split_cells(line: &str) -> Vec<String> {
    let parts: Vec<&str> = line.trim().split('|').collect();
    if parts.len() < 2 {
        return vec![line.trim().to_string()];
    }
    parts[1..parts.len() - 1]
        .iter()
        .map(|c| c.trim().to_string())
        .collect()
}

/// A classified unit of the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: HeadingLevel, text: String },
    Table(TableBlock),
    Paragraph { text: String },
}

/// A block plus the normalized lines it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcedBlock {
    pub block: Block,
    pub lines: Range<usize>,
}

/// Result of parsing a report.
#[derive(Debug, Clone, Default)]
pub struct ParsedReport {
    /// Lines after entity decoding and table normalization.
    pub lines: Vec<String>,
    pub blocks: Vec<SourcedBlock>,
    /// Whitespace-only lines that produced no block.
    pub skipped_blank: usize,
}

impl ParsedReport {
    /// Lines consumed by blocks plus skipped blank lines.
    pub fn covered_lines(&self) -> usize {
        self.blocks.iter().map(|b| b.lines.len()).sum::<usize>() + self.skipped_blank
    }
}

/// Parse report text into blocks.
pub fn parse(text: &str) -> ParsedReport {
    let decoded: Vec<String> = text.lines().map(decode_entities).collect();
    let lines = normalize_tables(&decoded);
    let runs = table_runs(&lines);

    let mut blocks = Vec::new();
    let mut skipped_blank = 0;
    let mut runs = runs.into_iter().peekable();
    let mut i = 0;

    while i < lines.len() {
        if let Some(run) = runs.peek() {
            if run.start == i {
                let run = run.clone();
                runs.next();
                // A heading cannot start with a pipe, so the whole run is table.
                blocks.push(SourcedBlock {
                    block: Block::Table(TableBlock::from_lines(&lines[run.clone()])),
                    lines: run.clone(),
                });
                i = run.end;
                continue;
            }
        }

        let line = &lines[i];
        match classify_line(line, false) {
            LineClass::Heading { level, text } => blocks.push(SourcedBlock {
                block: Block::Heading { level, text },
                lines: i..i + 1,
            }),
            _ if line.trim().is_empty() => skipped_blank += 1,
            _ => blocks.push(SourcedBlock {
                block: Block::Paragraph {
                    text: line.trim().to_string(),
                },
                lines: i..i + 1,
            }),
        }
        i += 1;
    }

    tracing::debug!(
        "Parsed {} lines into {} blocks ({} blank)",
        lines.len(),
        blocks.len(),
        skipped_blank
    );

    ParsedReport {
        lines,
        blocks,
        skipped_blank,
    }
}
