//! Progress-callback trait for analysis stage events.
//!
//! Inject an [`Arc<dyn AnalysisProgressCallback>`] via
//! [`crate::config::AnalyzerConfigBuilder::progress_callback`] to hear about
//! each stage as it starts and finishes. The CLI drives its spinner this way.
//!
//! # Example
//!
//! ```rust
//! use estate_compliance::{AnalysisProgressCallback, AnalyzerConfig, Stage};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl AnalysisProgressCallback for Printer {
//!     fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
//!         eprintln!("{} done in {}ms", stage, elapsed_ms);
//!     }
//! }
//!
//! let config = AnalyzerConfig::builder()
//!     .progress_callback(Arc::new(Printer) as Arc<dyn AnalysisProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Text extraction from the disclosure form.
    Extract,
    /// Loading the checklist workbook.
    Checklist,
    /// Local substring pre-check.
    Precheck,
    /// The chat-completion request.
    Llm,
    /// PDF rendering of the reply.
    Render,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Extract => "Extracting form text",
            Stage::Checklist => "Loading checklist",
            Stage::Precheck => "Pre-checking clauses",
            Stage::Llm => "Waiting for the model",
            Stage::Render => "Rendering report",
        };
        f.write_str(label)
    }
}

/// Called by the analysis pipeline at stage boundaries.
///
/// Implementations must be `Send + Sync`: when both reports are requested
/// the two LLM stages run concurrently. All methods default to no-ops.
pub trait AnalysisProgressCallback: Send + Sync {
    /// Called just before a stage begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage finishes successfully.
    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        let _ = (stage, elapsed_ms);
    }

    /// Called once when the whole analysis has produced its output.
    fn on_analysis_complete(&self, total_ms: u64) {
        let _ = total_ms;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AnalysisProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AnalyzerConfig`].
pub type ProgressCallback = Arc<dyn AnalysisProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct TrackingCallback {
        started: Mutex<Vec<Stage>>,
        completed: AtomicUsize,
        finished: AtomicUsize,
    }

    impl AnalysisProgressCallback for TrackingCallback {
        fn on_stage_start(&self, stage: Stage) {
            self.started.lock().unwrap().push(stage);
        }

        fn on_stage_complete(&self, _stage: Stage, _elapsed_ms: u64) {
            self.completed.fetch_add(1, Ordering::SeqCst);
        }

        fn on_analysis_complete(&self, _total_ms: u64) {
            self.finished.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_stage_start(Stage::Extract);
        cb.on_stage_complete(Stage::Extract, 3);
        cb.on_analysis_complete(10);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback {
            started: Mutex::new(Vec::new()),
            completed: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
        };
        for stage in [Stage::Extract, Stage::Checklist, Stage::Precheck] {
            tracker.on_stage_start(stage);
            tracker.on_stage_complete(stage, 1);
        }
        tracker.on_analysis_complete(5);

        assert_eq!(
            *tracker.started.lock().unwrap(),
            vec![Stage::Extract, Stage::Checklist, Stage::Precheck]
        );
        assert_eq!(tracker.completed.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.finished.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_stage_start(Stage::Llm);
        assert_eq!(Stage::Render.to_string(), "Rendering report");
    }
}
