//! Diagnostic summaries.

pub mod summary;

pub use summary::{ConsoleSink, CsvSink, NullSink, StepSummary, SummarySink};
