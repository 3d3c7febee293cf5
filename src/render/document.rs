//! Page geometry, placed elements, and the page-flow cursor.
//!
//! Coordinates are in points, measured from the top-left corner of the page
//! with `y` growing downwards. The PDF writer flips them when serialising.
//!
//! [`DocumentBuilder`] is the only mutable stage: strategies push elements and
//! advance its cursor, then [`DocumentBuilder::finish`] seals the pages into a
//! [`RenderedDocument`], which exposes read-only accessors.

use crate::render::metrics::FontFace;
use crate::render::wrap::Fragment;

/// Points per millimetre.
pub const PT_PER_MM: f64 = 72.0 / 25.4;

/// Physical page size and margins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f64,
    pub height: f64,
    pub margin: f64,
}

impl PageGeometry {
    /// 210×297 mm with 20 mm margins on every side.
    pub const A4: PageGeometry = PageGeometry {
        width: 210.0 * PT_PER_MM,
        height: 297.0 * PT_PER_MM,
        margin: 20.0 * PT_PER_MM,
    };

    /// Top margin: where the cursor starts on every page.
    pub fn top(&self) -> f64 {
        self.margin
    }

    /// Lowest cursor position content may reach.
    pub fn bottom(&self) -> f64 {
        self.height - self.margin
    }

    pub fn content_width(&self) -> f64 {
        self.width - 2.0 * self.margin
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::A4
    }
}

/// One line of text, possibly mixing faces.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    /// Cursor position when the line was placed.
    pub y: f64,
    /// Baseline position.
    pub baseline: f64,
    pub x: f64,
    pub size: f64,
    pub fragments: Vec<Fragment>,
}

impl TextLine {
    pub fn text(&self) -> String {
        self.fragments.iter().map(|f| f.text.as_str()).collect()
    }
}

/// A rectangle filled with a grey level (0 = black, 1 = white).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilledRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub gray: f64,
}

/// A straight stroked segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rule {
    pub from: (f64, f64),
    pub to: (f64, f64),
    pub line_width: f64,
}

/// One row of a placed table grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GridRow {
    /// Position of the row in the source table.
    pub index: usize,
    pub y: f64,
    pub height: f64,
    pub fill: Option<f64>,
    pub header: bool,
    /// Text lines of every cell, in absolute coordinates.
    pub lines: Vec<TextLine>,
}

/// The part of a table placed on one page.
#[derive(Debug, Clone, PartialEq)]
pub struct TableGrid {
    pub x: f64,
    pub y: f64,
    pub column_widths: Vec<f64>,
    pub rows: Vec<GridRow>,
    /// Inner grid stroke width.
    pub grid_width: f64,
    /// Outer border stroke width.
    pub border_width: f64,
}

impl TableGrid {
    pub fn width(&self) -> f64 {
        self.column_widths.iter().sum()
    }

    pub fn height(&self) -> f64 {
        self.rows.iter().map(|r| r.height).sum()
    }

    /// Background fills, one per shaded row.
    pub fn fills(&self) -> Vec<FilledRect> {
        self.rows
            .iter()
            .filter_map(|row| {
                row.fill.map(|gray| FilledRect {
                    x: self.x,
                    y: row.y,
                    width: self.width(),
                    height: row.height,
                    gray,
                })
            })
            .collect()
    }

    /// Every cell edge: horizontal rules between rows, vertical rules between
    /// columns. The outer border is drawn separately.
    pub fn inner_rules(&self) -> Vec<Rule> {
        let (left, right) = (self.x, self.x + self.width());
        let (top, bottom) = (self.y, self.y + self.height());
        let mut rules = Vec::new();

        let mut y = top;
        for row in self.rows.iter().take(self.rows.len().saturating_sub(1)) {
            y += row.height;
            rules.push(Rule {
                from: (left, y),
                to: (right, y),
                line_width: self.grid_width,
            });
        }

        let mut x = left;
        for width in self
            .column_widths
            .iter()
            .take(self.column_widths.len().saturating_sub(1))
        {
            x += width;
            rules.push(Rule {
                from: (x, top),
                to: (x, bottom),
                line_width: self.grid_width,
            });
        }
        rules
    }
}

/// Anything placed on a page.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Text(TextLine),
    Table(TableGrid),
}

impl Element {
    /// Cursor position when the element was placed.
    pub fn y(&self) -> f64 {
        match self {
            Element::Text(line) => line.y,
            Element::Table(grid) => grid.y,
        }
    }

    /// Visible text of the element, in reading order.
    pub fn text(&self) -> String {
        match self {
            Element::Text(line) => line.text(),
            Element::Table(grid) => grid
                .rows
                .iter()
                .flat_map(|r| r.lines.iter().map(TextLine::text))
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// A sealed page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Font selected at the start of the page.
    base_font: (FontFace, f64),
    elements: Vec<Element>,
}

impl Page {
    pub fn base_font(&self) -> (FontFace, f64) {
        self.base_font
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Pages produced by a flow strategy. Read-only once built.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDocument {
    geometry: PageGeometry,
    pages: Vec<Page>,
}

impl RenderedDocument {
    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Visible text of the whole document, one element per line.
    pub fn text(&self) -> String {
        self.pages
            .iter()
            .flat_map(|p| p.elements.iter().map(Element::text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Mutable page-flow state: the current page and its vertical cursor.
#[derive(Debug)]
pub struct DocumentBuilder {
    geometry: PageGeometry,
    base_font: (FontFace, f64),
    done: Vec<Page>,
    current: Vec<Element>,
    cursor: f64,
}

impl DocumentBuilder {
    pub fn new(geometry: PageGeometry, base_face: FontFace, base_size: f64) -> Self {
        Self {
            geometry,
            base_font: (base_face, base_size),
            done: Vec::new(),
            current: Vec::new(),
            cursor: geometry.top(),
        }
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    pub fn cursor(&self) -> f64 {
        self.cursor
    }

    /// Pages closed so far plus the open one.
    pub fn page_count(&self) -> usize {
        self.done.len() + 1
    }

    /// True when the open page holds no elements yet.
    pub fn page_is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// Whether `height` more points fit above the bottom margin.
    pub fn fits(&self, height: f64) -> bool {
        self.cursor + height <= self.geometry.bottom()
    }

    /// Close the open page and start a new one at the top margin.
    pub fn new_page(&mut self) {
        let elements = std::mem::take(&mut self.current);
        self.done.push(Page {
            base_font: self.base_font,
            elements,
        });
        self.cursor = self.geometry.top();
        tracing::trace!("Page break -> page {}", self.page_count());
    }

    /// Break the page if `height` does not fit, unless the page is still
    /// empty (an oversized unit is placed anyway rather than looping).
    pub fn ensure_room(&mut self, height: f64) {
        if !self.fits(height) && !self.page_is_empty() {
            self.new_page();
        }
    }

    /// Vertical gap. A gap that overflows clamps the cursor to the bottom
    /// margin so the next placed unit breaks the page; it never opens a page
    /// on its own.
    pub fn space(&mut self, height: f64) {
        self.cursor = (self.cursor + height).min(self.geometry.bottom());
    }

    /// Move the cursor down unconditionally.
    pub fn advance(&mut self, height: f64) {
        self.cursor += height;
    }

    pub fn push(&mut self, element: Element) {
        self.current.push(element);
    }

    /// Seal the document. The open page is always kept, so an empty input
    /// still yields one blank page.
    pub fn finish(mut self) -> RenderedDocument {
        let elements = std::mem::take(&mut self.current);
        self.done.push(Page {
            base_font: self.base_font,
            elements,
        });
        RenderedDocument {
            geometry: self.geometry,
            pages: self.done,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(y: f64) -> Element {
        Element::Text(TextLine {
            y,
            baseline: y,
            x: 0.0,
            size: 10.0,
            fragments: vec![],
        })
    }

    #[test]
    fn a4_geometry() {
        let g = PageGeometry::A4;
        assert!((g.width - 595.2756).abs() < 1e-3);
        assert!((g.height - 841.8898).abs() < 1e-3);
        assert!((g.content_width() - 170.0 * PT_PER_MM).abs() < 1e-9);
    }

    #[test]
    fn ensure_room_breaks_only_non_empty_pages() {
        let mut b = DocumentBuilder::new(PageGeometry::A4, FontFace::Regular, 10.0);
        b.ensure_room(10_000.0);
        assert_eq!(b.page_count(), 1);

        b.push(line(b.cursor()));
        b.ensure_room(10_000.0);
        assert_eq!(b.page_count(), 2);
        assert_eq!(b.cursor(), PageGeometry::A4.top());
    }

    #[test]
    fn space_clamps_and_never_opens_page() {
        let mut b = DocumentBuilder::new(PageGeometry::A4, FontFace::Regular, 10.0);
        b.push(line(b.cursor()));
        b.space(5_000.0);
        assert_eq!(b.cursor(), PageGeometry::A4.bottom());
        assert_eq!(b.finish().page_count(), 1);
    }

    #[test]
    fn empty_document_has_one_page() {
        let doc = DocumentBuilder::new(PageGeometry::A4, FontFace::Regular, 10.0).finish();
        assert_eq!(doc.page_count(), 1);
        assert!(doc.pages()[0].is_empty());
    }

    #[test]
    fn grid_rules_and_fills() {
        let grid = TableGrid {
            x: 10.0,
            y: 20.0,
            column_widths: vec![50.0, 50.0, 50.0],
            rows: (0..2)
                .map(|i| GridRow {
                    index: i,
                    y: 20.0 + 24.0 * i as f64,
                    height: 24.0,
                    fill: (i == 0).then_some(0.8),
                    header: i == 0,
                    lines: vec![],
                })
                .collect(),
            grid_width: 0.5,
            border_width: 1.0,
        };
        // one horizontal between 2 rows + two verticals between 3 columns
        assert_eq!(grid.inner_rules().len(), 3);
        assert_eq!(grid.fills().len(), 1);
        assert_eq!(grid.height(), 48.0);
        assert_eq!(grid.width(), 150.0);
    }
}
