//! `migrecon-engine` — pre/post migration balance reconciliation engine.
//!
//! Pure engine crate: receives validated in-memory tables, returns an
//! exception report plus summary. File I/O stays in the caller; the only
//! side effect here is the injected diagnostics sink.

pub mod config;
pub mod diag;
pub mod engine;
pub mod error;
pub mod loader;
pub mod model;
pub mod report;
pub mod summary;

pub use config::{RunConfig, SourceKind};
pub use diag::{DiagnosticsSink, FileSink, MemorySink, NullSink};
pub use engine::{reconcile_login, reconcile_metric, run};
pub use error::ReconError;
pub use model::{ExceptionRow, MetricValue, RunInput, RunResult, Table};
pub use report::ExceptionReport;
pub use summary::{compute_summary, render_summary, RunSummary};
