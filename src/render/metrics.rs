//! Font faces and glyph metrics for the base-14 Helvetica family.
//!
//! Reports are set entirely in Helvetica, which every PDF viewer ships, so no
//! font program is embedded. Widths are the standard AFM advance widths in
//! 1/1000 em for the printable ASCII range; characters outside it fall back to
//! [`FALLBACK_WIDTH`].

use serde::{Deserialize, Serialize};

/// Advance width used for characters with no entry in the tables.
const FALLBACK_WIDTH: u16 = 556;

/// One of the four Helvetica faces used by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FontFace {
    Regular,
    Bold,
    Oblique,
    BoldOblique,
}

impl FontFace {
    /// All faces, in resource-name order.
    pub const ALL: [FontFace; 4] = [
        FontFace::Regular,
        FontFace::Bold,
        FontFace::Oblique,
        FontFace::BoldOblique,
    ];

    /// Pick a face from emphasis flags.
    pub fn from_style(bold: bool, italic: bool) -> Self {
        match (bold, italic) {
            (false, false) => FontFace::Regular,
            (true, false) => FontFace::Bold,
            (false, true) => FontFace::Oblique,
            (true, true) => FontFace::BoldOblique,
        }
    }

    /// PostScript name written into the font dictionary.
    pub fn base_font(self) -> &'static str {
        match self {
            FontFace::Regular => "Helvetica",
            FontFace::Bold => "Helvetica-Bold",
            FontFace::Oblique => "Helvetica-Oblique",
            FontFace::BoldOblique => "Helvetica-BoldOblique",
        }
    }

    /// Name of the font in the page resource dictionary.
    pub fn resource_name(self) -> &'static str {
        match self {
            FontFace::Regular => "F1",
            FontFace::Bold => "F2",
            FontFace::Oblique => "F3",
            FontFace::BoldOblique => "F4",
        }
    }

    fn is_bold(self) -> bool {
        matches!(self, FontFace::Bold | FontFace::BoldOblique)
    }

    /// Advance width of one character in 1/1000 em.
    pub fn char_units(self, ch: char) -> u16 {
        let table = if self.is_bold() {
            &HELVETICA_BOLD
        } else {
            &HELVETICA
        };
        match ch {
            ' '..='~' => table[(ch as usize) - 0x20],
            '\u{a0}' => table[0],
            _ => FALLBACK_WIDTH,
        }
    }

    /// Sum of advance widths of `text` in 1/1000 em.
    pub fn text_units(self, text: &str) -> u32 {
        text.chars().map(|c| u32::from(self.char_units(c))).sum()
    }

    /// Rendered width of `text` at `size` points.
    pub fn text_width(self, text: &str, size: f64) -> f64 {
        units_to_points(self.text_units(text), size)
    }
}

/// Convert 1/1000 em units to points at `size`.
pub fn units_to_points(units: u32, size: f64) -> f64 {
    f64::from(units) * size / 1000.0
}

// Printable ASCII 0x20..=0x7E.
#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];
