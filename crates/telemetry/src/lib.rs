//! Token counting, lifetime classification and session cost simulation.
//!
//! Every canonical layer has a lifetime (see [`icspec_core::Lifetime`]).
//! Over a session of N calls a naive client resends every layer every
//! time; a lifetime-aware client sends permanent layers once (and caches
//! them), resends the session layer only when it changes, and resends the
//! invocation layers every call. [`CostAnalyzer`] counts each layer with a
//! pluggable [`TokenCounter`] and reports both totals.
//!
//! ```
//! use icspec_telemetry::{CostAnalyzer, SessionSimulationParams};
//!
//! let doc = "###ICS:TASK_PAYLOAD###\nSummarise.\n###END:TASK_PAYLOAD###";
//! let report = CostAnalyzer::default()
//!     .analyze_text(doc, SessionSimulationParams::new(1, 1))
//!     .unwrap();
//! assert_eq!(report.tokens_saved(), 0);
//! ```

pub mod counter;
pub mod engine;
pub mod layout;
pub mod model;
pub mod report;

pub use counter::{
    ApproxCounter, CountingMethod, TokenCounter, WordBoundaryCounter, counter_for,
};
#[cfg(feature = "exact")]
pub use counter::ExactCounter;
pub use engine::{CostAnalyzer, DEFAULT_CACHE_MIN_TOKENS};
pub use layout::{PromptBlock, PromptLayout};
pub use model::{
    CostReport, LayerTokenCount, LifetimeBreakdown, SessionSimulation, SessionSimulationParams,
};
pub use report::render_text;

/// Errors from the cost analysis subsystem.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("invalid simulation parameters: {0}")]
    InvalidParams(String),

    #[error("document is malformed ({} structural error(s))", .0.len())]
    Malformed(Vec<String>),

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[error("serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}
