//! Pipeline stages for checklist-driven form analysis.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and the LLM stage can be swapped for a canned client in tests.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ precheck ──▶ llm ──▶ postprocess ──▶ (render)
//!   │        (lopdf)        ▲       (HTTP)    (cleanup)
//!   └──────▶ checklist ─────┘
//!            (calamine)
//! ```
//!
//! 1. [`input`]     : load the form and the checklist from a path or URL
//! 2. [`extract`]   : lower-cased, whitespace-collapsed form text
//! 3. [`checklist`] : typed checklist rows from the first worksheet
//! 4. [`precheck`]  : substring check of each clause's validation points
//! 5. [`llm`]       : one chat-completion request; the only stage with
//!    network I/O besides URL inputs
//! 6. [`postprocess`] : deterministic cleanup of the reply

pub mod checklist;
pub mod extract;
pub mod input;
pub mod llm;
pub mod postprocess;
pub mod precheck;
