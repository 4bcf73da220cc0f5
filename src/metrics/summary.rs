//! Step summaries and their sinks.
//!
//! A summary is captured on the final optimizer sub-step of a step whose
//! index hits the configured frequency; capture never alters control
//! flow, only which additional outputs the engine is asked for.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Diagnostic record of one training step's final sub-step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepSummary {
    /// Worker-local step index.
    pub step: usize,
    /// Whether the step ran the inner (train) or outer (meta) branch.
    pub is_train: bool,
    /// Policy loss from the final sub-step.
    pub policy_loss: f32,
    /// Value loss from the final sub-step.
    pub value_loss: f32,
    /// Pre-clip gradient global norm, if the engine reports one.
    pub grad_norm: Option<f32>,
    /// Environment frames consumed by the step's batch.
    pub frames: usize,
    /// Mean rollout reward of the step's batch.
    pub mean_reward: f32,
}

impl StepSummary {
    /// Create a summary with zeroed losses.
    pub fn new(step: usize, is_train: bool) -> Self {
        Self {
            step,
            is_train,
            policy_loss: 0.0,
            value_loss: 0.0,
            grad_norm: None,
            frames: 0,
            mean_reward: 0.0,
        }
    }

    /// Set loss values.
    pub fn with_losses(mut self, policy_loss: f32, value_loss: f32) -> Self {
        self.policy_loss = policy_loss;
        self.value_loss = value_loss;
        self
    }

    /// Set the gradient norm.
    pub fn with_grad_norm(mut self, norm: f32) -> Self {
        self.grad_norm = Some(norm);
        self
    }

    /// Set batch-level stats.
    pub fn with_batch_stats(mut self, frames: usize, mean_reward: f32) -> Self {
        self.frames = frames;
        self.mean_reward = mean_reward;
        self
    }
}

/// Sink for captured summaries.
pub trait SummarySink: Send {
    /// Record one summary.
    fn write(&mut self, summary: &StepSummary);

    /// Flush any buffered output.
    fn flush(&mut self);
}

/// Sink that drops everything. Useful for workers that should stay
/// silent while others summarize.
#[derive(Debug, Default)]
pub struct NullSink;

impl SummarySink for NullSink {
    fn write(&mut self, _summary: &StepSummary) {}
    fn flush(&mut self) {}
}

/// Console sink with one fixed-width line per summary.
pub struct ConsoleSink {
    show_header: bool,
}

impl ConsoleSink {
    /// Create a console sink.
    pub fn new() -> Self {
        Self { show_header: true }
    }

    fn print_header() {
        println!(
            "{:>8} {:>6} {:>10} {:>10} {:>10} {:>8} {:>10}",
            "Step", "Branch", "Policy", "Value", "GradNorm", "Frames", "Reward"
        );
        println!("{}", "-".repeat(68));
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl SummarySink for ConsoleSink {
    fn write(&mut self, summary: &StepSummary) {
        if self.show_header {
            Self::print_header();
            self.show_header = false;
        }
        let branch = if summary.is_train { "train" } else { "meta" };
        let grad_norm = summary
            .grad_norm
            .map(|n| format!("{:.4}", n))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>8} {:>6} {:>10.4} {:>10.4} {:>10} {:>8} {:>10.2}",
            summary.step,
            branch,
            summary.policy_loss,
            summary.value_loss,
            grad_norm,
            summary.frames,
            summary.mean_reward
        );
    }

    fn flush(&mut self) {
        // stdout is line-buffered, nothing to do
    }
}

/// CSV file sink for offline analysis.
pub struct CsvSink {
    writer: BufWriter<File>,
}

impl CsvSink {
    /// Create a CSV sink, writing the header row.
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writeln!(
            writer,
            "step,is_train,policy_loss,value_loss,grad_norm,frames,mean_reward"
        )?;
        Ok(Self { writer })
    }
}

impl SummarySink for CsvSink {
    fn write(&mut self, summary: &StepSummary) {
        let grad_norm = summary
            .grad_norm
            .map(|n| n.to_string())
            .unwrap_or_default();
        let _ = writeln!(
            self.writer,
            "{},{},{:.6},{:.6},{},{},{:.4}",
            summary.step,
            summary.is_train as u8,
            summary.policy_loss,
            summary.value_loss,
            grad_norm,
            summary.frames,
            summary.mean_reward
        );
    }

    fn flush(&mut self) {
        let _ = self.writer.flush();
    }
}

impl Drop for CsvSink {
    fn drop(&mut self) {
        self.flush();
    }
}
