//! Serialise a [`RenderedDocument`] to PDF bytes with `lopdf`.
//!
//! The output uses the four standard Helvetica faces (no embedded fonts) with
//! `WinAnsiEncoding`, one content stream per page, and no creation date or
//! document ID, so identical documents serialise to identical bytes.

use crate::render::document::{Element, Page, PageGeometry, RenderedDocument, TableGrid, TextLine};
use crate::render::metrics::FontFace;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::io::Cursor;
use thiserror::Error;

/// Serialisation failure. Parsing and layout cannot fail; only this step can.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to encode content stream for page {page}: {detail}")]
    ContentEncoding { page: usize, detail: String },

    #[error("Failed to write PDF: {0}")]
    Write(String),
}

/// A finished PDF report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPdf {
    bytes: Vec<u8>,
    page_count: usize,
}

impl RenderedPdf {
    /// MIME type for HTTP responses and downloads.
    pub const CONTENT_TYPE: &'static str = "application/pdf";

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Seekable reader over the bytes, positioned at the start.
    pub fn into_cursor(self) -> Cursor<Vec<u8>> {
        Cursor::new(self.bytes)
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// ── Text encoding ────────────────────────────────────────────────────────────

/// Encode text as WinAnsi bytes. Unmappable characters become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars().map(win_ansi_byte).collect()
}

fn win_ansi_byte(ch: char) -> u8 {
    match ch {
        '\u{20}'..='\u{7e}' | '\u{a0}'..='\u{ff}' => ch as u32 as u8,
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8a,
        '‹' => 0x8b,
        'Œ' => 0x8c,
        'Ž' => 0x8e,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9a,
        '›' => 0x9b,
        'œ' => 0x9c,
        'ž' => 0x9e,
        'Ÿ' => 0x9f,
        '\t' => b' ',
        _ => b'?',
    }
}

// ── Content streams ──────────────────────────────────────────────────────────

fn real(v: f64) -> Object {
    // Two decimals keep streams compact and stable.
    Object::from(((v * 100.0).round() / 100.0) as f32)
}

struct PageWriter {
    height: f64,
    ops: Vec<Operation>,
}

impl PageWriter {
    fn new(geometry: &PageGeometry) -> Self {
        Self {
            height: geometry.height,
            ops: Vec::new(),
        }
    }

    fn op(&mut self, operator: &str, operands: Vec<Object>) {
        self.ops.push(Operation::new(operator, operands));
    }

    fn set_font(&mut self, face: FontFace, size: f64) {
        self.op("Tf", vec![face.resource_name().into(), real(size)]);
    }

    fn text_line(&mut self, line: &TextLine) {
        let y = self.height - line.baseline;
        for fragment in &line.fragments {
            if fragment.text.is_empty() {
                continue;
            }
            self.op("BT", vec![]);
            self.set_font(fragment.face, line.size);
            self.op("Td", vec![real(line.x + fragment.offset), real(y)]);
            self.op(
                "Tj",
                vec![Object::String(
                    encode_win_ansi(&fragment.text),
                    StringFormat::Literal,
                )],
            );
            self.op("ET", vec![]);
        }
    }

    fn rect(&mut self, x: f64, top: f64, width: f64, height: f64) {
        self.op(
            "re",
            vec![real(x), real(self.height - top - height), real(width), real(height)],
        );
    }

    fn table(&mut self, grid: &TableGrid) {
        for fill in grid.fills() {
            self.op("g", vec![real(fill.gray)]);
            self.rect(fill.x, fill.y, fill.width, fill.height);
            self.op("f", vec![]);
        }
        self.op("g", vec![real(0.0)]);

        for row in &grid.rows {
            for line in &row.lines {
                self.text_line(line);
            }
        }

        self.op("G", vec![real(0.0)]);
        for rule in grid.inner_rules() {
            self.op("w", vec![real(rule.line_width)]);
            self.op("m", vec![real(rule.from.0), real(self.height - rule.from.1)]);
            self.op("l", vec![real(rule.to.0), real(self.height - rule.to.1)]);
            self.op("S", vec![]);
        }
        self.op("w", vec![real(grid.border_width)]);
        self.rect(grid.x, grid.y, grid.width(), grid.height());
        self.op("S", vec![]);
    }

    fn page(mut self, page: &Page) -> Content {
        let (face, size) = page.base_font();
        self.op("g", vec![real(0.0)]);
        self.op("BT", vec![]);
        self.set_font(face, size);
        self.op("ET", vec![]);

        for element in page.elements() {
            match element {
                Element::Text(line) => self.text_line(line),
                Element::Table(grid) => self.table(grid),
            }
        }
        Content {
            operations: self.ops,
        }
    }
}

// ── Document assembly ────────────────────────────────────────────────────────

fn font_resources(doc: &mut Document) -> Dictionary {
    let mut fonts = Dictionary::new();
    for face in FontFace::ALL {
        let id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => face.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(face.resource_name(), id);
    }
    fonts
}

/// Serialise the document to PDF bytes.
pub fn write_pdf(rendered: &RenderedDocument) -> Result<RenderedPdf, RenderError> {
    let geometry = rendered.geometry();
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let fonts = font_resources(&mut doc);
    let resources_id = doc.add_object(dictionary! { "Font" => fonts });

    let mut kids: Vec<ObjectId> = Vec::with_capacity(rendered.page_count());
    for (i, page) in rendered.pages().iter().enumerate() {
        let content = PageWriter::new(geometry).page(page);
        let encoded = content.encode().map_err(|e| RenderError::ContentEncoding {
            page: i + 1,
            detail: e.to_string(),
        })?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id);
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids.iter().map(|id| Object::from(*id)).collect::<Vec<_>>(),
            "Count" => kids.len() as i64,
            "MediaBox" => vec![real(0.0), real(0.0), real(geometry.width), real(geometry.height)],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| RenderError::Write(e.to_string()))?;

    tracing::debug!(
        "Serialised {} page(s) into {} bytes",
        rendered.page_count(),
        bytes.len()
    );

    Ok(RenderedPdf {
        bytes,
        page_count: rendered.page_count(),
    })
}
