//! Greedy word wrapping.
//!
//! Words are accumulated onto a line while the rendered width of
//! `current + " " + word` stays within the limit; the first word that would
//! overflow starts a new line. This is first-fit, not a balanced wrap: the
//! last line of a paragraph can be much shorter than the rest.
//!
//! A single word wider than the limit is placed on its own line and allowed to
//! overflow; it is never broken mid-word and never preceded by an empty line.

use crate::render::inline::Span;
use crate::render::metrics::{units_to_points, FontFace};

/// Whitespace that may end a line. U+00A0 (`&nbsp;`) binds its neighbours.
fn is_break(ch: char) -> bool {
    ch.is_whitespace() && ch != '\u{a0}'
}

/// Wrap a single-font line of text to `max_width` points.
///
/// Whitespace runs collapse to single spaces. A blank line yields no lines.
pub fn wrap_line(line: &str, face: FontFace, size: f64, max_width: f64) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in line.split(is_break).filter(|w| !w.is_empty()) {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };

        if face.text_width(&candidate, size) <= max_width {
            current = candidate;
        } else {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            current = word.to_string();
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// A piece of a wrapped line drawn in one face.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub face: FontFace,
    pub text: String,
    /// Horizontal offset from the start of the line, in points.
    pub offset: f64,
}

/// One wrapped line of styled text.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StyledLine {
    pub fragments: Vec<Fragment>,
    pub width: f64,
}

impl StyledLine {
    pub fn text(&self) -> String {
        self.fragments.iter().map(|f| f.text.as_str()).collect()
    }
}

/// Wrap styled spans to `max_width` points.
///
/// Same greedy rule as [`wrap_line`]; a word may mix faces (`**bold**,`) and
/// its width is the sum of its pieces. Inter-word spaces take the face of the
/// surrounding `base` style.
pub fn wrap_spans(spans: &[Span], base: FontFace, size: f64, max_width: f64) -> Vec<StyledLine> {
    let words = split_words(spans, base);
    let space = base.text_units(" ");

    let mut lines = Vec::new();
    let mut current: Vec<&[(FontFace, String)]> = Vec::new();
    let mut current_units = 0u32;

    for word in &words {
        let word_units: u32 = word.iter().map(|(f, t)| f.text_units(t)).sum();
        if current.is_empty() {
            current.push(word.as_slice());
            current_units = word_units;
        } else if units_to_points(current_units + space + word_units, size) <= max_width {
            current.push(word.as_slice());
            current_units += space + word_units;
        } else {
            let width = units_to_points(current_units, size);
            lines.push(build_line(&current, base, size, width));
            current = vec![word.as_slice()];
            current_units = word_units;
        }
    }

    if !current.is_empty() {
        let width = units_to_points(current_units, size);
        lines.push(build_line(&current, base, size, width));
    }
    lines
}

/// Split spans into words; each word is a list of `(face, text)` pieces.
fn split_words(spans: &[Span], base: FontFace) -> Vec<Vec<(FontFace, String)>> {
    let mut words: Vec<Vec<(FontFace, String)>> = Vec::new();
    let mut word: Vec<(FontFace, String)> = Vec::new();

    for span in spans {
        let face = span.face(base);
        let mut piece = String::new();
        for ch in span.text.chars() {
            if is_break(ch) {
                if !piece.is_empty() {
                    word.push((face, std::mem::take(&mut piece)));
                }
                if !word.is_empty() {
                    words.push(std::mem::take(&mut word));
                }
            } else {
                piece.push(ch);
            }
        }
        if !piece.is_empty() {
            word.push((face, piece));
        }
    }
    if !word.is_empty() {
        words.push(word);
    }
    words
}

fn build_line(words: &[&[(FontFace, String)]], base: FontFace, size: f64, width: f64) -> StyledLine {
    let mut fragments: Vec<Fragment> = Vec::new();
    let mut offset = 0.0;

    for (i, word) in words.iter().enumerate() {
        if i > 0 {
            push_fragment(&mut fragments, base, " ", offset);
            offset += base.text_width(" ", size);
        }
        for (face, text) in word.iter() {
            push_fragment(&mut fragments, *face, text, offset);
            offset += face.text_width(text, size);
        }
    }

    StyledLine { fragments, width }
}

fn push_fragment(fragments: &mut Vec<Fragment>, face: FontFace, text: &str, offset: f64) {
    if let Some(last) = fragments.last_mut() {
        if last.face == face {
            last.text.push_str(text);
            return;
        }
    }
    fragments.push(Fragment {
        face,
        text: text.to_string(),
        offset,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::inline::parse_spans;

    const FACE: FontFace = FontFace::Regular;

    #[test]
    fn exact_fit_is_not_split() {
        let line = "the quick brown fox";
        let max = FACE.text_width(line, 11.0);
        assert_eq!(wrap_line(line, FACE, 11.0, max), vec![line.to_string()]);
    }

    #[test]
    fn one_unit_over_splits_before_last_word() {
        let line = "the quick brown fox";
        let max = FACE.text_width(line, 11.0) - 1.0;
        assert_eq!(
            wrap_line(line, FACE, 11.0, max),
            vec!["the quick brown".to_string(), "fox".to_string()]
        );
    }

    #[test]
    fn blank_line_yields_nothing() {
        assert!(wrap_line("   ", FACE, 11.0, 100.0).is_empty());
        assert!(wrap_line("", FACE, 11.0, 100.0).is_empty());
    }

    #[test]
    fn long_word_overflows_on_its_own_line() {
        let lines = wrap_line("a supercalifragilistic b", FACE, 11.0, 30.0);
        assert_eq!(lines, vec!["a", "supercalifragilistic", "b"]);
    }

    #[test]
    fn greedy_leaves_short_last_line() {
        let text = "aaaa aaaa aaaa a";
        let max = FACE.text_width("aaaa aaaa", 10.0);
        assert_eq!(wrap_line(text, FACE, 10.0, max), vec!["aaaa aaaa", "aaaa a"]);
    }

    #[test]
    fn non_breaking_space_is_kept_and_never_breaks() {
        let text = "Prix:\u{a0}100\u{a0}000 $";
        let max = FACE.text_width("Prix: 100", 10.0);
        assert_eq!(
            wrap_line(text, FACE, 10.0, max),
            vec!["Prix:\u{a0}100\u{a0}000", "$"]
        );
        let styled: Vec<String> = wrap_spans(&parse_spans(text), FACE, 10.0, max)
            .iter()
            .map(StyledLine::text)
            .collect();
        assert_eq!(styled, vec!["Prix:\u{a0}100\u{a0}000", "$"]);
    }

    #[test]
    fn styled_wrap_matches_plain_wrap_for_plain_text() {
        let text = "one two three four five six seven eight nine ten";
        let max = 80.0;
        let plain = wrap_line(text, FACE, 10.0, max);
        let styled: Vec<String> = wrap_spans(&parse_spans(text), FACE, 10.0, max)
            .iter()
            .map(StyledLine::text)
            .collect();
        assert_eq!(plain, styled);
    }

    #[test]
    fn styled_word_mixes_faces() {
        let lines = wrap_spans(&parse_spans("**Status**: ok"), FACE, 10.0, 500.0);
        assert_eq!(lines.len(), 1);
        let frags = &lines[0].fragments;
        assert_eq!(frags[0].face, FontFace::Bold);
        assert_eq!(frags[0].text, "Status");
        assert_eq!(frags[1].face, FontFace::Regular);
        assert_eq!(frags[1].text, ": ok");
        let expected = FontFace::Bold.text_width("Status", 10.0);
        assert!((frags[1].offset - expected).abs() < 1e-9);
    }
}
