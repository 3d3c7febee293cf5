//! Page-flow strategies.
//!
//! Two ways of laying report text onto pages:
//!
//! * [`MinimalFlow`]: every source line is greedily wrapped in one font and
//!   drawn line by line, 14 pt apart, with a page-break check before each
//!   line. No markdown is interpreted.
//! * [`RichFlow`]: the text is parsed into headings, paragraphs and tables
//!   (see [`crate::render::markdown`]) and each block is laid out in its own
//!   style with trailing spacers.
//!
//! They are kept separate on purpose: choose one with [`RenderMode`].

use crate::render::document::{DocumentBuilder, Element, PageGeometry, RenderedDocument, TextLine};
use crate::render::inline::parse_spans;
use crate::render::markdown::{self, Block, HeadingLevel};
use crate::render::metrics::FontFace;
use crate::render::table::{layout_table, TableStyle};
use crate::render::wrap::{wrap_line, wrap_spans, Fragment};
use serde::{Deserialize, Serialize};

/// Lays report text out onto pages.
pub trait PageFlowStrategy {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Lay `text` out onto pages of `geometry`.
    fn layout(&self, text: &str, geometry: PageGeometry) -> RenderedDocument;
}

// ── Minimal ──────────────────────────────────────────────────────────────────

/// Single-font line drawing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinimalFlow {
    pub face: FontFace,
    pub size: f64,
    pub line_advance: f64,
}

impl Default for MinimalFlow {
    fn default() -> Self {
        Self {
            face: FontFace::Regular,
            size: 11.0,
            line_advance: 14.0,
        }
    }
}

impl PageFlowStrategy for MinimalFlow {
    fn name(&self) -> &'static str {
        "minimal"
    }

    fn layout(&self, text: &str, geometry: PageGeometry) -> RenderedDocument {
        let mut builder = DocumentBuilder::new(geometry, self.face, self.size);
        let max_width = geometry.content_width();

        for raw in text.lines() {
            for line in wrap_line(raw, self.face, self.size, max_width) {
                if builder.cursor() > geometry.bottom() {
                    builder.new_page();
                }
                let y = builder.cursor();
                builder.push(Element::Text(TextLine {
                    y,
                    baseline: y,
                    x: geometry.margin,
                    size: self.size,
                    fragments: vec![Fragment {
                        face: self.face,
                        text: line,
                        offset: 0.0,
                    }],
                }));
                builder.advance(self.line_advance);
            }
        }
        builder.finish()
    }
}

// ── Rich ─────────────────────────────────────────────────────────────────────

/// Font, line spacing and trailing gap of one text style.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub face: FontFace,
    pub size: f64,
    pub leading: f64,
    pub space_after: f64,
}

/// Heading, paragraph and table styling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RichFlow {
    pub h1: TextStyle,
    pub h2: TextStyle,
    pub h3: TextStyle,
    pub body: TextStyle,
    pub table: TableStyle,
    pub table_space_after: f64,
}

impl Default for RichFlow {
    fn default() -> Self {
        Self {
            h1: TextStyle {
                face: FontFace::Bold,
                size: 18.0,
                leading: 22.0,
                space_after: 10.0,
            },
            h2: TextStyle {
                face: FontFace::Bold,
                size: 14.0,
                leading: 18.0,
                space_after: 8.0,
            },
            h3: TextStyle {
                face: FontFace::BoldOblique,
                size: 12.0,
                leading: 14.0,
                space_after: 6.0,
            },
            body: TextStyle {
                face: FontFace::Regular,
                size: 10.0,
                leading: 12.0,
                space_after: 6.0,
            },
            table: TableStyle::default(),
            table_space_after: 12.0,
        }
    }
}

impl RichFlow {
    fn heading_style(&self, level: HeadingLevel) -> &TextStyle {
        match level {
            HeadingLevel::H1 => &self.h1,
            HeadingLevel::H2 => &self.h2,
            HeadingLevel::H3 => &self.h3,
        }
    }

    /// Lay out blocks that were already parsed.
    pub fn layout_blocks(&self, blocks: &[Block], geometry: PageGeometry) -> RenderedDocument {
        let mut builder = DocumentBuilder::new(geometry, self.body.face, self.body.size);

        for block in blocks {
            match block {
                Block::Heading { level, text } => {
                    place_text(&mut builder, text, self.heading_style(*level));
                }
                Block::Paragraph { text } => place_text(&mut builder, text, &self.body),
                Block::Table(table) => {
                    if layout_table(&mut builder, table, &self.table) > 0 {
                        builder.space(self.table_space_after);
                    }
                }
            }
        }
        builder.finish()
    }
}

/// Wrap `text` in `style` and place it line by line, then add the trailing gap.
fn place_text(builder: &mut DocumentBuilder, text: &str, style: &TextStyle) {
    let max_width = builder.geometry().content_width();
    let x = builder.geometry().margin;

    for line in wrap_spans(&parse_spans(text), style.face, style.size, max_width) {
        builder.ensure_room(style.leading);
        let y = builder.cursor();
        builder.push(Element::Text(TextLine {
            y,
            baseline: y + style.size,
            x,
            size: style.size,
            fragments: line.fragments,
        }));
        builder.advance(style.leading);
    }
    builder.space(style.space_after);
}

impl PageFlowStrategy for RichFlow {
    fn name(&self) -> &'static str {
        "rich"
    }

    fn layout(&self, text: &str, geometry: PageGeometry) -> RenderedDocument {
        let parsed = markdown::parse(text);
        self.layout_blocks(&parsed.blocks.into_iter().map(|b| b.block).collect::<Vec<_>>(), geometry)
    }
}

// ── Mode selection ───────────────────────────────────────────────────────────

/// Which strategy renders the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Headings, styled paragraphs and shaded tables.
    #[default]
    Rich,
    /// One font, wrapped lines, no markdown.
    Minimal,
}

impl RenderMode {
    pub fn strategy(self) -> Box<dyn PageFlowStrategy + Send + Sync> {
        match self {
            RenderMode::Rich => Box::new(RichFlow::default()),
            RenderMode::Minimal => Box::new(MinimalFlow::default()),
        }
    }
}

impl std::str::FromStr for RenderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rich" => Ok(RenderMode::Rich),
            "minimal" | "simple" => Ok(RenderMode::Minimal),
            other => Err(format!("unknown render mode '{other}' (expected rich or minimal)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const G: PageGeometry = PageGeometry::A4;

    #[test]
    fn minimal_draws_each_wrapped_line_14pt_apart() {
        let doc = MinimalFlow::default().layout("first\n\nsecond", G);
        let els = doc.pages()[0].elements();
        assert_eq!(els.len(), 2);
        assert_eq!(els[0].y(), G.top());
        assert_eq!(els[1].y(), G.top() + 14.0);
    }

    #[test]
    fn minimal_does_not_interpret_markdown() {
        let doc = MinimalFlow::default().layout("# **Title**", G);
        assert_eq!(doc.text(), "# **Title**");
    }

    #[test]
    fn minimal_paginates() {
        let text = "line\n".repeat(80);
        let doc = MinimalFlow::default().layout(&text, G);
        assert!(doc.page_count() > 1);
        assert_eq!(doc.pages()[1].elements()[0].y(), G.top());
        let total: usize = doc.pages().iter().map(|p| p.elements().len()).sum();
        assert_eq!(total, 80);
    }

    #[test]
    fn rich_spacers() {
        let doc = RichFlow::default().layout("# A\n## B\n### C\ntext", G);
        let ys: Vec<f64> = doc.pages()[0].elements().iter().map(Element::y).collect();
        let top = G.top();
        assert_eq!(ys[0], top);
        assert_eq!(ys[1], top + 22.0 + 10.0);
        assert_eq!(ys[2], ys[1] + 18.0 + 8.0);
        assert_eq!(ys[3], ys[2] + 14.0 + 6.0);
    }

    #[test]
    fn rich_heading_faces() {
        let doc = RichFlow::default().layout("# A\n### C", G);
        let faces: Vec<FontFace> = doc.pages()[0]
            .elements()
            .iter()
            .map(|e| match e {
                Element::Text(t) => t.fragments[0].face,
                Element::Table(_) => panic!("no tables here"),
            })
            .collect();
        assert_eq!(faces, vec![FontFace::Bold, FontFace::BoldOblique]);
    }

    #[test]
    fn rich_blank_lines_add_no_space() {
        let a = RichFlow::default().layout("x\ny", G);
        let b = RichFlow::default().layout("x\n\n   \ny", G);
        assert_eq!(a, b);
    }

    #[test]
    fn rich_paginates_body_text() {
        let text = "A paragraph line.\n".repeat(60);
        let doc = RichFlow::default().layout(&text, G);
        assert!(doc.page_count() > 1);
        assert_eq!(doc.pages()[1].elements()[0].y(), G.top());
    }

    #[test]
    fn render_mode_parse() {
        assert_eq!("Rich".parse::<RenderMode>(), Ok(RenderMode::Rich));
        assert_eq!("minimal".parse::<RenderMode>(), Ok(RenderMode::Minimal));
        assert!("fancy".parse::<RenderMode>().is_err());
        assert_eq!(RenderMode::default().strategy().name(), "rich");
    }
}
