//! Nested curriculum state machine.
//!
//! Three levels: episodes are drawn from a trial, a cycle is one pass
//! through the train-then-test episode quotas, and a trial survives a
//! configured number of cycles before a fresh one is forced. The state
//! machine only compares counters — no division, no indexing — so zero
//! quotas fall straight through to the boundary branch on the first call.

use serde::{Deserialize, Serialize};

use crate::config::TrainerConfig;

/// Which data distribution an episode is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum SampleType {
    /// Train distribution.
    Train,
    /// Test (held-out) distribution.
    Test,
}

impl From<SampleType> for u8 {
    fn from(t: SampleType) -> u8 {
        match t {
            SampleType::Train => 0,
            SampleType::Test => 1,
        }
    }
}

impl TryFrom<u8> for SampleType {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(SampleType::Train),
            1 => Ok(SampleType::Test),
            other => Err(format!("sample_type must be 0 or 1, got {}", other)),
        }
    }
}

/// Sampling directive for the next episode draw.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpisodeConfig {
    /// Draw a fresh episode (`false` reuses the current one).
    pub get_new: bool,
    /// Distribution to draw from.
    pub sample_type: SampleType,
    /// Beta-distribution alpha for the draw position.
    pub b_alpha: f64,
    /// Beta-distribution beta for the draw position.
    pub b_beta: f64,
}

/// Sampling directive for the trial underneath the next episode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialConfig {
    /// Draw a fresh trial (`false` keeps the current one).
    pub get_new: bool,
    /// Distribution to draw from (always the train side for trials).
    pub sample_type: SampleType,
    /// Beta-distribution alpha for the draw position.
    pub b_alpha: f64,
    /// Beta-distribution beta for the draw position.
    pub b_beta: f64,
}

/// What the external data feed should sample next.
///
/// Produced fresh on every call to
/// [`CurriculumState::next_sample_config`]; consumed by the feed, never
/// stored by the core.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleConfig {
    /// Episode-level directive.
    pub episode_config: EpisodeConfig,
    /// Trial-level directive.
    pub trial_config: TrialConfig,
}

impl SampleConfig {
    fn compose(episode_type: SampleType, new_trial: bool) -> Self {
        Self {
            episode_config: EpisodeConfig {
                get_new: true,
                sample_type: episode_type,
                b_alpha: 1.0,
                b_beta: 1.0,
            },
            trial_config: TrialConfig {
                get_new: new_trial,
                sample_type: SampleType::Train,
                b_alpha: 1.0,
                b_beta: 1.0,
            },
        }
    }

    /// Fresh train episode from the current trial.
    pub fn train_episode() -> Self {
        Self::compose(SampleType::Train, false)
    }

    /// Fresh test episode from the current trial.
    pub fn test_episode() -> Self {
        Self::compose(SampleType::Test, false)
    }

    /// First (train) episode of a new cycle on the same trial.
    pub fn new_cycle() -> Self {
        Self::compose(SampleType::Train, false)
    }

    /// Force a fresh trial draw, opening with a train episode.
    pub fn new_trial() -> Self {
        Self::compose(SampleType::Train, true)
    }
}

/// The state the next emitted config will come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurriculumPhase {
    /// Train quota not yet exhausted.
    TrainEpisode,
    /// Train quota done, test quota not yet exhausted.
    TestEpisode,
    /// Both quotas done, more cycles left on this trial.
    CycleBoundary,
    /// Both quotas done, trial exhausted.
    TrialBoundary,
}

/// Per-worker curriculum counters.
///
/// Owned exclusively by one worker; mutated only through
/// [`next_sample_config`](Self::next_sample_config) and
/// [`record_trial`](Self::record_trial). Runs indefinitely — there is no
/// terminal state, trials loop forever.
#[derive(Debug, Clone)]
pub struct CurriculumState {
    current_train_episode: usize,
    current_test_episode: usize,
    num_train_episodes: usize,
    num_test_episodes: usize,
    cycles_counter: usize,
    cycles_per_trial: usize,
    current_trial_num: Vec<i64>,
}

impl CurriculumState {
    /// Create the state for one worker.
    ///
    /// The exploration-kernel override is resolved here, once: a worker
    /// listed in `kernel_workers` trains on `kernel_period` episodes per
    /// cycle with no test episodes, pinning it to one distribution for an
    /// extended stretch.
    pub fn new(config: &TrainerConfig, task: usize) -> Self {
        let (num_train, num_test) = if config.is_kernel_worker(task) {
            log::info!(
                "worker {} set as exploration kernel with period: {} episodes",
                task,
                config.kernel_period
            );
            (config.kernel_period, 0)
        } else {
            (config.num_train_episodes, config.num_test_episodes)
        };
        Self {
            current_train_episode: 0,
            current_test_episode: 0,
            num_train_episodes: num_train,
            num_test_episodes: num_test,
            cycles_counter: 1,
            cycles_per_trial: config.cycles_per_trial.max(1),
            current_trial_num: Vec::new(),
        }
    }

    /// Train episodes emitted so far this cycle.
    pub fn current_train_episode(&self) -> usize {
        self.current_train_episode
    }

    /// Test episodes emitted so far this cycle.
    pub fn current_test_episode(&self) -> usize {
        self.current_test_episode
    }

    /// Configured train quota per cycle.
    pub fn num_train_episodes(&self) -> usize {
        self.num_train_episodes
    }

    /// Configured test quota per cycle.
    pub fn num_test_episodes(&self) -> usize {
        self.num_test_episodes
    }

    /// Cycle currently running on this trial (1-based).
    pub fn cycles_counter(&self) -> usize {
        self.cycles_counter
    }

    /// Last trial identifier vector observed from the rollout batch,
    /// one element per parallel runner. Empty until the first
    /// [`record_trial`](Self::record_trial).
    pub fn current_trial_num(&self) -> &[i64] {
        &self.current_trial_num
    }

    /// Record the trial identifiers observed in the latest batch.
    pub fn record_trial(&mut self, trial_num: Vec<i64>) {
        self.current_trial_num = trial_num;
    }

    /// The state the next call to `next_sample_config` will act from.
    pub fn phase(&self) -> CurriculumPhase {
        if self.current_train_episode < self.num_train_episodes {
            CurriculumPhase::TrainEpisode
        } else if self.current_test_episode < self.num_test_episodes {
            CurriculumPhase::TestEpisode
        } else if self.cycles_counter < self.cycles_per_trial {
            CurriculumPhase::CycleBoundary
        } else {
            CurriculumPhase::TrialBoundary
        }
    }

    /// Emit the sampling directive for the next episode and advance the
    /// counters.
    ///
    /// Ordered checks: train quota, then test quota, then the boundary
    /// branch, which resets both episode counters and either opens a new
    /// cycle on the same trial or forces a fresh trial draw. The
    /// cycle-opening draw is itself a train episode and consumes the
    /// first train-quota slot; the trial-opening draw sits outside the
    /// quota accounting.
    pub fn next_sample_config(&mut self) -> SampleConfig {
        let config = if self.current_train_episode < self.num_train_episodes {
            self.current_train_episode += 1;
            log::info!(
                "training, c_train={}, c_test={}, type=0",
                self.current_train_episode,
                self.current_test_episode
            );
            SampleConfig::train_episode()
        } else if self.current_test_episode < self.num_test_episodes {
            self.current_test_episode += 1;
            log::info!(
                "meta-training, c_train={}, c_test={}, type=1",
                self.current_train_episode,
                self.current_test_episode
            );
            SampleConfig::test_episode()
        } else {
            // Single cycle end: reset episode counters.
            self.current_train_episode = 0;
            self.current_test_episode = 0;
            if self.cycles_counter < self.cycles_per_trial {
                self.cycles_counter += 1;
                if self.num_train_episodes > 0 {
                    self.current_train_episode = 1;
                }
                log::info!(
                    "training (new cycle), c_train={}, c_test={}, type=0",
                    self.current_train_episode,
                    self.current_test_episode
                );
                SampleConfig::new_cycle()
            } else {
                self.cycles_counter = 1;
                log::info!("new trial requested");
                SampleConfig::new_trial()
            }
        };

        debug_assert!(self.current_train_episode <= self.num_train_episodes);
        debug_assert!(self.current_test_episode <= self.num_test_episodes);
        debug_assert!(self.cycles_counter >= 1 && self.cycles_counter <= self.cycles_per_trial);
        config
    }
}
