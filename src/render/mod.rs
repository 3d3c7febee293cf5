//! Report text → paginated PDF.
//!
//! ```text
//! text
//!  │
//!  ├─ markdown  entity decoding, table detection + separator synthesis,
//!  │            line classification, block assembly
//!  ├─ flow      page-flow strategy (rich blocks or minimal wrapped lines)
//!  │   ├─ wrap      greedy word wrap over Helvetica metrics
//!  │   └─ table     row heights, shading, row-wise page breaks
//!  └─ pdf       lopdf serialisation → RenderedPdf
//! ```
//!
//! Rendering is synchronous and CPU-bound. Async callers should run it
//! through `tokio::task::spawn_blocking`, as [`crate::analyze`] does.

pub mod document;
pub mod flow;
pub mod inline;
pub mod markdown;
pub mod metrics;
pub mod pdf;
pub mod table;
pub mod wrap;

pub use document::{PageGeometry, RenderedDocument};
pub use flow::{MinimalFlow, PageFlowStrategy, RenderMode, RichFlow};
pub use markdown::{Block, HeadingLevel, TableBlock};
pub use pdf::{RenderError, RenderedPdf};

use std::time::Instant;
use tracing::info;

/// Lay `text` out with `strategy` on A4 pages and serialise it.
pub fn render_with(
    strategy: &dyn PageFlowStrategy,
    text: &str,
) -> Result<RenderedPdf, RenderError> {
    let start = Instant::now();
    let document = strategy.layout(text, PageGeometry::A4);
    let pdf = pdf::write_pdf(&document)?;
    info!(
        "Rendered {} chars with the {} layout: {} page(s), {} bytes in {}ms",
        text.len(),
        strategy.name(),
        pdf.page_count(),
        pdf.len(),
        start.elapsed().as_millis()
    );
    Ok(pdf)
}

/// Render report text to PDF in the given mode.
pub fn render_markdown(text: &str, mode: RenderMode) -> Result<RenderedPdf, RenderError> {
    render_with(mode.strategy().as_ref(), text)
}
