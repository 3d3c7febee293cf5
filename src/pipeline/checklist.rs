//! Checklist loading: spreadsheet bytes → validated [`ChecklistRow`] records.
//!
//! The first worksheet is read with its first row as the header. Three
//! columns are required; they are located by header text (case- and
//! whitespace-insensitive), so column order and extra columns do not matter.
//!
//! | Field               | Header                   | Also accepted          |
//! |---------------------|--------------------------|------------------------|
//! | `clause_id`         | `Code form.`             | `code form`, `clause_id` |
//! | `clause_name`       | `Nom de la clause`       | `clause_name`          |
//! | `validation_points` | `Éléments de validation` | `elements de validation`, `validation_points` |

use crate::error::AnalyzerError;
use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use tracing::{debug, info};

pub const CLAUSE_ID_HEADER: &str = "Code form.";
pub const CLAUSE_NAME_HEADER: &str = "Nom de la clause";
pub const VALIDATION_POINTS_HEADER: &str = "Éléments de validation";

/// One checklist clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistRow {
    pub clause_id: String,
    pub clause_name: String,
    /// Dash-delimited list of phrases expected in the form.
    pub validation_points: String,
}

impl ChecklistRow {
    /// Split `validation_points` on `-` into trimmed, lower-cased, non-empty
    /// points.
    pub fn points(&self) -> Vec<String> {
        self.validation_points
            .split('-')
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect()
    }
}

/// Header text normalised for matching.
fn normalize_header(header: &str) -> String {
    header
        .trim()
        .trim_end_matches('.')
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn find_column(headers: &[String], canonical: &str, aliases: &[&str]) -> Result<usize, AnalyzerError> {
    let wanted: Vec<String> = std::iter::once(canonical)
        .chain(aliases.iter().copied())
        .map(normalize_header)
        .collect();

    headers
        .iter()
        .position(|h| wanted.contains(&normalize_header(h)))
        .ok_or_else(|| AnalyzerError::MissingColumn {
            column: canonical.to_string(),
            found: headers.join(", "),
        })
}

/// Text of a cell. Empty cells become the empty string.
pub fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                format!("{:.0}", f)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Data::DateTime(dt) => dt.to_string(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("#ERR:{:?}", e),
    }
}

/// Parse a header row plus data rows into checklist records.
///
/// Rows whose three fields are all empty are skipped.
pub fn rows_from_table(
    headers: &[String],
    rows: impl IntoIterator<Item = Vec<String>>,
) -> Result<Vec<ChecklistRow>, AnalyzerError> {
    let id_col = find_column(headers, CLAUSE_ID_HEADER, &["code form", "clause_id", "clause id"])?;
    let name_col = find_column(headers, CLAUSE_NAME_HEADER, &["clause_name", "clause name"])?;
    let points_col = find_column(
        headers,
        VALIDATION_POINTS_HEADER,
        &["elements de validation", "validation_points", "validation points"],
    )?;

    let cell = |row: &[String], i: usize| row.get(i).cloned().unwrap_or_default();

    Ok(rows
        .into_iter()
        .map(|row| ChecklistRow {
            clause_id: cell(&row, id_col),
            clause_name: cell(&row, name_col),
            validation_points: cell(&row, points_col),
        })
        .filter(|r| {
            !(r.clause_id.is_empty() && r.clause_name.is_empty() && r.validation_points.is_empty())
        })
        .collect())
}

fn rows_from_range(range: &Range<Data>) -> Result<Vec<ChecklistRow>, AnalyzerError> {
    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(cell_to_string).collect(),
        None => {
            return Err(AnalyzerError::Checklist {
                detail: "first worksheet is empty".into(),
            })
        }
    };
    debug!("Checklist headers: {:?}", headers);

    rows_from_table(
        &headers,
        rows.map(|r| r.iter().map(cell_to_string).collect::<Vec<_>>()),
    )
}

/// Load checklist rows from xlsx/xls/ods bytes.
pub fn load_checklist(bytes: &[u8]) -> Result<Vec<ChecklistRow>, AnalyzerError> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| AnalyzerError::Checklist {
            detail: format!("failed to open workbook: {e}"),
        })?;

    let first = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| AnalyzerError::Checklist {
            detail: "no sheets found in workbook".into(),
        })?;

    let range = workbook
        .worksheet_range(&first)
        .map_err(|e| AnalyzerError::Checklist {
            detail: format!("failed to read sheet '{first}': {e}"),
        })?;

    let rows = rows_from_range(&range)?;
    info!("Loaded {} checklist rows from sheet '{}'", rows.len(), first);
    Ok(rows)
}

/// Render rows as a pipe table for the prompt.
pub fn checklist_table(rows: &[ChecklistRow]) -> String {
    let clean = |s: &str| s.replace('|', "/").split_whitespace().collect::<Vec<_>>().join(" ");

    let mut out = format!(
        "| {} | {} | {} |\n| --- | --- | --- |\n",
        CLAUSE_ID_HEADER, CLAUSE_NAME_HEADER, VALIDATION_POINTS_HEADER
    );
    for row in rows {
        out.push_str(&format!(
            "| {} | {} | {} |\n",
            clean(&row.clause_id),
            clean(&row.clause_name),
            clean(&row.validation_points)
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(h: &[&str]) -> Vec<String> {
        h.iter().map(|s| s.to_string()).collect()
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn points_are_split_trimmed_lowercased() {
        let r = ChecklistRow {
            clause_id: "DV1".into(),
            clause_name: "Identification".into(),
            validation_points: " Nom du vendeur - Adresse -  - RAPPORT ".into(),
        };
        assert_eq!(r.points(), vec!["nom du vendeur", "adresse", "rapport"]);
    }

    #[test]
    fn columns_found_in_any_order_and_case() {
        let h = headers(&["Notes", "ÉLÉMENTS DE VALIDATION", "nom de la clause", "Code form."]);
        let rows = rows_from_table(&h, vec![row(&["x", "a - b", "Titre", "DV2"])]).unwrap();
        assert_eq!(
            rows,
            vec![ChecklistRow {
                clause_id: "DV2".into(),
                clause_name: "Titre".into(),
                validation_points: "a - b".into(),
            }]
        );
    }

    #[test]
    fn english_aliases_accepted() {
        let h = headers(&["clause_id", "clause_name", "validation_points"]);
        assert_eq!(rows_from_table(&h, vec![row(&["1", "n", "p"])]).unwrap().len(), 1);
    }

    #[test]
    fn missing_column_is_named() {
        let h = headers(&["Code form.", "Nom de la clause"]);
        let err = rows_from_table(&h, Vec::<Vec<String>>::new()).unwrap_err();
        match err {
            AnalyzerError::MissingColumn { column, found } => {
                assert_eq!(column, VALIDATION_POINTS_HEADER);
                assert!(found.contains("Nom de la clause"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn short_and_blank_rows() {
        let h = headers(&["Code form.", "Nom de la clause", "Éléments de validation"]);
        let rows = rows_from_table(&h, vec![row(&["DV3"]), row(&["", "", ""])]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].validation_points, "");
    }

    #[test]
    fn cell_formatting() {
        assert_eq!(cell_to_string(&Data::Empty), "");
        assert_eq!(cell_to_string(&Data::Float(3.0)), "3");
        assert_eq!(cell_to_string(&Data::Float(2.5)), "2.5");
        assert_eq!(cell_to_string(&Data::String("  DV1 ".into())), "DV1");
    }

    #[test]
    fn not_a_workbook() {
        let err = load_checklist(b"PK\x03\x04 truncated").unwrap_err();
        assert!(matches!(err, AnalyzerError::Checklist { .. }));
    }

    #[test]
    fn table_for_prompt() {
        let rows = vec![ChecklistRow {
            clause_id: "DV1".into(),
            clause_name: "A|B".into(),
            validation_points: "x -\n y".into(),
        }];
        let table = checklist_table(&rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], "| DV1 | A/B | x - y |");
    }
}
