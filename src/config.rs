//! Worker configuration.

use serde::{Deserialize, Serialize};

/// Configuration for one training worker's control core.
///
/// Quotas and frequencies are per-worker; the same config is normally
/// broadcast to every worker, with the exploration-kernel fields
/// selecting which workers get overridden quotas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Train episodes drawn per cycle.
    pub num_train_episodes: usize,
    /// Test episodes drawn per cycle.
    pub num_test_episodes: usize,
    /// Train/test cycles run on a trial before a fresh trial is drawn.
    pub cycles_per_trial: usize,
    /// Optimizer sub-steps per training step.
    pub num_epochs: usize,
    /// Steps between model summary captures.
    pub model_summary_freq: usize,
    /// Worker indices pinned as exploration kernels.
    pub kernel_workers: Vec<usize>,
    /// Train-episode quota a kernel worker spends on one distribution.
    pub kernel_period: usize,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            num_train_episodes: 1,
            num_test_episodes: 1,
            cycles_per_trial: 1,
            num_epochs: 1,
            model_summary_freq: 100,
            kernel_workers: Vec::new(),
            kernel_period: 500,
        }
    }
}

impl TrainerConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the train-episode quota per cycle.
    pub fn with_train_episodes(mut self, n: usize) -> Self {
        self.num_train_episodes = n;
        self
    }

    /// Set the test-episode quota per cycle.
    pub fn with_test_episodes(mut self, n: usize) -> Self {
        self.num_test_episodes = n;
        self
    }

    /// Set the number of cycles before a trial is replaced.
    ///
    /// # Panics
    ///
    /// Panics if `cycles` is 0; the curriculum needs at least one cycle
    /// per trial.
    pub fn with_cycles_per_trial(mut self, cycles: usize) -> Self {
        assert!(cycles > 0, "cycles_per_trial must be > 0");
        self.cycles_per_trial = cycles;
        self
    }

    /// Set the optimizer sub-step count per training step.
    ///
    /// # Panics
    ///
    /// Panics if `epochs` is 0; every step runs at least one sub-step.
    pub fn with_num_epochs(mut self, epochs: usize) -> Self {
        assert!(epochs > 0, "num_epochs must be > 0");
        self.num_epochs = epochs;
        self
    }

    /// Set the model summary frequency.
    ///
    /// # Panics
    ///
    /// Panics if `freq` is 0. Use a positive value to capture every N steps.
    pub fn with_model_summary_freq(mut self, freq: usize) -> Self {
        assert!(freq > 0, "model_summary_freq must be > 0 to avoid division by zero");
        self.model_summary_freq = freq;
        self
    }

    /// Pin the given worker indices as exploration kernels.
    pub fn with_kernel_workers(mut self, workers: Vec<usize>) -> Self {
        self.kernel_workers = workers;
        self
    }

    /// Set the episode quota kernel workers spend on one distribution.
    pub fn with_kernel_period(mut self, period: usize) -> Self {
        self.kernel_period = period;
        self
    }

    /// Whether the given worker index is configured as an exploration
    /// kernel. Resolved once at construction, never re-checked.
    pub fn is_kernel_worker(&self, task: usize) -> bool {
        self.kernel_workers.contains(&task)
    }

    /// Validate the configuration and return any issues.
    ///
    /// Returns `Ok(())` if valid, or a message describing the issue.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.cycles_per_trial == 0 {
            return Err("cycles_per_trial must be > 0");
        }
        if self.num_epochs == 0 {
            return Err("num_epochs must be > 0");
        }
        if self.model_summary_freq == 0 {
            return Err("model_summary_freq must be > 0");
        }
        Ok(())
    }
}
