//! Inline emphasis: split a line into styled spans.
//!
//! Only the two markers models actually emit in these reports are honoured:
//! `**strong**` and `*emphasis*`. A marker opens only when a matching closer
//! exists later in the line and the next character is not whitespace, so list
//! bullets (`* item`) and arithmetic (`2 * 3`) stay literal.

use crate::render::metrics::FontFace;

/// A run of text sharing one emphasis style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
}

impl Span {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
            italic: false,
        }
    }

    /// The face this span is drawn with when the surrounding style uses `base`.
    pub fn face(&self, base: FontFace) -> FontFace {
        let bold = self.bold || matches!(base, FontFace::Bold | FontFace::BoldOblique);
        let italic = self.italic || matches!(base, FontFace::Oblique | FontFace::BoldOblique);
        FontFace::from_style(bold, italic)
    }
}

/// Parse emphasis markers in `text` into spans.
///
/// Adjacent spans with the same style are merged; empty spans are dropped.
pub fn parse_spans(text: &str) -> Vec<Span> {
    let mut spans: Vec<Span> = Vec::new();
    let mut buf = String::new();
    let mut bold = false;
    let mut italic = false;
    let mut i = 0;

    while i < text.len() {
        let rest = &text[i..];

        if rest.starts_with("**") && (bold || opens(&rest[2..], "**")) {
            flush(&mut spans, &mut buf, bold, italic);
            bold = !bold;
            i += 2;
            continue;
        }

        if rest.starts_with('*') && !rest.starts_with("**") && (italic || opens(&rest[1..], "*")) {
            flush(&mut spans, &mut buf, bold, italic);
            italic = !italic;
            i += 1;
            continue;
        }

        // `rest` is non-empty and starts on a char boundary.
        let ch = rest.chars().next().unwrap_or_default();
        buf.push(ch);
        i += ch.len_utf8();
    }

    flush(&mut spans, &mut buf, bold, italic);
    spans
}

/// Plain text of a span list, markers removed.
pub fn plain_text(spans: &[Span]) -> String {
    spans.iter().map(|s| s.text.as_str()).collect()
}

fn opens(after: &str, marker: &str) -> bool {
    match after.chars().next() {
        Some(c) if !c.is_whitespace() => after.contains(marker),
        _ => false,
    }
}

fn flush(spans: &mut Vec<Span>, buf: &mut String, bold: bool, italic: bool) {
    if buf.is_empty() {
        return;
    }
    let text = std::mem::take(buf);
    if let Some(last) = spans.last_mut() {
        if last.bold == bold && last.italic == italic {
            last.text.push_str(&text);
            return;
        }
    }
    spans.push(Span { text, bold, italic });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_line_is_one_span() {
        assert_eq!(parse_spans("Just text"), vec![Span::plain("Just text")]);
    }

    #[test]
    fn bold_and_italic() {
        let spans = parse_spans("a **b** *c* d");
        assert_eq!(spans.len(), 5);
        assert_eq!(spans[1].text, "b");
        assert!(spans[1].bold && !spans[1].italic);
        assert_eq!(spans[3].text, "c");
        assert!(spans[3].italic && !spans[3].bold);
        assert_eq!(plain_text(&spans), "a b c d");
    }

    #[test]
    fn unmatched_markers_stay_literal() {
        assert_eq!(plain_text(&parse_spans("**open only")), "**open only");
        assert_eq!(plain_text(&parse_spans("2 * 3 = 6")), "2 * 3 = 6");
        assert_eq!(plain_text(&parse_spans("* bullet")), "* bullet");
    }

    #[test]
    fn label_style_line() {
        let spans = parse_spans("**Vendor(s)**: Jean Tremblay");
        assert_eq!(spans[0].text, "Vendor(s)");
        assert!(spans[0].bold);
        assert_eq!(spans[1].text, ": Jean Tremblay");
        assert!(!spans[1].bold);
    }

    #[test]
    fn face_combines_with_base() {
        let s = Span {
            text: "x".into(),
            bold: false,
            italic: true,
        };
        assert_eq!(s.face(FontFace::Bold), FontFace::BoldOblique);
        assert_eq!(Span::plain("x").face(FontFace::Regular), FontFace::Regular);
    }

    #[test]
    fn multibyte_text_survives() {
        let spans = parse_spans("Éléments **clés** — ok");
        assert_eq!(plain_text(&spans), "Éléments clés — ok");
    }
}
