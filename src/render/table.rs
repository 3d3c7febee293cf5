//! Table layout: cell wrapping, row heights, shading, and row-wise page breaks.

use crate::render::document::{DocumentBuilder, Element, GridRow, TableGrid, TextLine};
use crate::render::inline::parse_spans;
use crate::render::markdown::TableBlock;
use crate::render::metrics::FontFace;
use crate::render::wrap::{wrap_spans, StyledLine};

/// Visual parameters of a table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableStyle {
    pub font_size: f64,
    pub leading: f64,
    pub padding: f64,
    pub header_fill: f64,
    pub band_fill: f64,
    pub grid_width: f64,
    pub border_width: f64,
}

impl Default for TableStyle {
    fn default() -> Self {
        Self {
            font_size: 10.0,
            leading: 12.0,
            padding: 6.0,
            header_fill: 0.827,
            band_fill: 0.961,
            grid_width: 0.5,
            border_width: 1.0,
        }
    }
}

impl TableStyle {
    /// Background for the row at `index`: header grey on a header row, then
    /// a pale band on every second row from the second rendered row onward.
    pub fn row_fill(&self, index: usize, header: bool) -> Option<f64> {
        if index == 0 && header {
            Some(self.header_fill)
        } else if index >= 2 && index % 2 == 0 {
            Some(self.band_fill)
        } else {
            None
        }
    }
}

/// A row laid out in cell-relative coordinates, before placement.
struct MeasuredRow {
    index: usize,
    header: bool,
    height: f64,
    /// Per cell: wrapped lines.
    cells: Vec<Vec<StyledLine>>,
}

fn measure(table: &TableBlock, column_width: f64, style: &TableStyle) -> Vec<MeasuredRow> {
    let text_width = (column_width - 2.0 * style.padding).max(0.0);

    table
        .rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let header = index == 0 && table.header;
            let face = if header {
                FontFace::Bold
            } else {
                FontFace::Regular
            };
            let cells: Vec<_> = row
                .iter()
                .map(|cell| wrap_spans(&parse_spans(cell), face, style.font_size, text_width))
                .collect();
            let lines = cells.iter().map(Vec::len).max().unwrap_or(0).max(1);
            MeasuredRow {
                index,
                header,
                height: lines as f64 * style.leading + 2.0 * style.padding,
                cells,
            }
        })
        .collect()
}

/// Place a row at `y`, turning wrapped cell lines into absolute text lines.
fn place(row: MeasuredRow, x: f64, y: f64, column_width: f64, style: &TableStyle) -> GridRow {
    let mut lines = Vec::new();
    for (col, cell) in row.cells.into_iter().enumerate() {
        let cell_x = x + col as f64 * column_width + style.padding;
        for (i, styled) in cell.into_iter().enumerate() {
            let line_top = y + style.padding + i as f64 * style.leading;
            lines.push(TextLine {
                y: line_top,
                baseline: line_top + style.font_size,
                x: cell_x,
                size: style.font_size,
                fragments: styled.fragments,
            });
        }
    }
    GridRow {
        index: row.index,
        y,
        height: row.height,
        fill: style.row_fill(row.index, row.header),
        header: row.header,
        lines,
    }
}

/// Lay a table onto the document, splitting it between rows when it does not
/// fit. Each page gets its own grid with a full border. Returns the number
/// of grids placed.
pub fn layout_table(builder: &mut DocumentBuilder, table: &TableBlock, style: &TableStyle) -> usize {
    if table.rows.is_empty() || table.columns == 0 {
        return 0;
    }

    let x = builder.geometry().margin;
    let column_width = builder.geometry().content_width() / table.columns as f64;
    let column_widths = vec![column_width; table.columns];

    let new_grid = |y: f64| TableGrid {
        x,
        y,
        column_widths: column_widths.clone(),
        rows: Vec::new(),
        grid_width: style.grid_width,
        border_width: style.border_width,
    };

    let mut grids = 0;
    let mut grid = new_grid(builder.cursor());

    for row in measure(table, column_width, style) {
        if !builder.fits(row.height) && (!grid.rows.is_empty() || !builder.page_is_empty()) {
            if !grid.rows.is_empty() {
                builder.push(Element::Table(std::mem::replace(&mut grid, new_grid(0.0))));
                grids += 1;
            }
            builder.new_page();
            grid.y = builder.cursor();
        }
        let placed = place(row, x, builder.cursor(), column_width, style);
        builder.advance(placed.height);
        grid.rows.push(placed);
    }

    if !grid.rows.is_empty() {
        builder.push(Element::Table(grid));
        grids += 1;
    }
    grids
}
