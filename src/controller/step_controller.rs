//! Per-step orchestration of curriculum, sync and gradient selection.

use crate::config::TrainerConfig;
use crate::counters::SharedStepCounter;
use crate::curriculum::{CurriculumState, SampleConfig};
use crate::error::{FatalTrainingError, TrainingError};
use crate::feed::RolloutSource;
use crate::metrics::SummarySink;
use crate::params::{SharedParams, StoreError, SyncProtocol};
use crate::policy::{SyncOp, SyncPolicy};
use crate::rollout::{BatchClassifier, RolloutBatch};

use super::engine::UpdateEngine;

/// One worker's training-step controller.
///
/// Owns the worker's curriculum state and its `local`/`prime` parameter
/// snapshots; holds the shared `global` handle and the shared step
/// counter. One instance per worker, driven by a single logical thread
/// that alternates `get_sample_config` (indirectly, through the data
/// feed) and `step`. Every entry point is fail-fast: the first error
/// aborts the worker.
pub struct TrainingStepController {
    config: TrainerConfig,
    policy: SyncPolicy,
    sync: SyncProtocol,
    curriculum: CurriculumState,
    global_step: SharedStepCounter,
    sink: Box<dyn SummarySink>,
    local_steps: usize,
}

impl std::fmt::Debug for TrainingStepController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrainingStepController")
            .finish_non_exhaustive()
    }
}

impl TrainingStepController {
    /// Wire a controller for the worker with index `task`.
    ///
    /// Fails with a construction error if the config is invalid.
    pub fn new(
        config: TrainerConfig,
        policy: SyncPolicy,
        global: SharedParams,
        global_step: SharedStepCounter,
        sink: Box<dyn SummarySink>,
        task: usize,
    ) -> Result<Self, FatalTrainingError> {
        config.validate().map_err(|msg| {
            log::error!("controller construction failed: {}", msg);
            FatalTrainingError::Construction(TrainingError::Config(msg))
        })?;
        let curriculum = CurriculumState::new(&config, task);
        let sync = SyncProtocol::new(global);
        Ok(Self {
            config,
            policy,
            sync,
            curriculum,
            global_step,
            sink,
            local_steps: 0,
        })
    }

    /// The active variant.
    pub fn policy(&self) -> SyncPolicy {
        self.policy
    }

    /// The worker's curriculum state.
    pub fn curriculum(&self) -> &CurriculumState {
        &self.curriculum
    }

    /// The worker's parameter snapshots.
    pub fn sync(&self) -> &SyncProtocol {
        &self.sync
    }

    #[cfg(test)]
    pub(crate) fn sync_mut(&mut self) -> &mut SyncProtocol {
        &mut self.sync
    }

    /// Steps completed by this worker.
    pub fn local_steps(&self) -> usize {
        self.local_steps
    }

    /// Configuration for the next episode/trial to sample, consumed by
    /// the external data feed. Advances the curriculum.
    pub fn get_sample_config(&mut self) -> SampleConfig {
        self.curriculum.next_sample_config()
    }

    /// One-time initialization: sync `local` (and `prime`, where the
    /// variant checkpoints it) from `global`, then launch the runners.
    pub fn start(&mut self, feed: &mut dyn RolloutSource) -> Result<(), FatalTrainingError> {
        self.start_inner(feed).map_err(|e| {
            log::error!("start failed: {}", e);
            FatalTrainingError::Start(e)
        })
    }

    fn start_inner(&mut self, feed: &mut dyn RolloutSource) -> Result<(), TrainingError> {
        self.sync.sync_local_from_global()?;
        if self.policy.checkpoints_prime() {
            self.sync.sync_prime_from_local()?;
        }
        feed.launch()?;
        Ok(())
    }

    /// Run one training step over a collected batch.
    ///
    /// Classifies the batch, fires the variant's sync edges around the
    /// selected gradient update, runs the configured number of optimizer
    /// sub-steps, and advances the step counters — unconditionally, on
    /// the meta branch too.
    pub fn step<E: UpdateEngine>(
        &mut self,
        engine: &mut E,
        data: &RolloutBatch,
    ) -> Result<(), FatalTrainingError> {
        self.process(engine, data).map_err(|e| {
            log::error!("train step failed at local step {}: {}", self.local_steps, e);
            FatalTrainingError::Step(e)
        })
    }

    fn process<E: UpdateEngine>(
        &mut self,
        engine: &mut E,
        data: &RolloutBatch,
    ) -> Result<(), TrainingError> {
        let verdict = BatchClassifier::classify(data, self.curriculum.current_trial_num());

        // A new trial always starts from the latest global consensus.
        if verdict.trial_changed {
            self.sync.sync_local_from_global()?;
            log::debug!(
                "new trial {:?}, local<-global update at local step {}",
                verdict.trial_num,
                self.local_steps
            );
            self.curriculum.record_trial(verdict.trial_num.clone());
        }

        let write_summary = self.local_steps % self.config.model_summary_freq == 0;

        for op in self.policy.pre_update(verdict.is_train) {
            self.run_sync(*op)?;
        }

        // Optimizer sub-steps; only the final one may carry a summary.
        let mut request = self.policy.update_request(verdict.is_train, false);
        for _ in 1..self.config.num_epochs {
            engine.apply_update(&mut self.sync, data, &request)?;
        }
        request.want_summary = write_summary;
        let summary = engine.apply_update(&mut self.sync, data, &request)?;

        self.global_step.increment();

        for op in self.policy.post_update(verdict.is_train) {
            self.run_sync(*op)?;
        }

        if let Some(summary) = summary {
            let mut summary = summary.with_batch_stats(data.frames(), data.mean_reward());
            summary.step = self.local_steps;
            summary.is_train = verdict.is_train;
            self.sink.write(&summary);
        }

        self.local_steps += 1;
        Ok(())
    }

    fn run_sync(&mut self, op: SyncOp) -> Result<(), StoreError> {
        match op {
            SyncOp::LocalFromGlobal => {
                log::debug!("local<-global update at local step {}", self.local_steps);
                self.sync.sync_local_from_global()
            }
            SyncOp::PrimeFromLocal => {
                log::debug!("prime<-local update at local step {}", self.local_steps);
                self.sync.sync_prime_from_local()
            }
            SyncOp::LocalFromPrime => {
                log::debug!("local<-prime update at local step {}", self.local_steps);
                self.sync.sync_local_from_prime()
            }
        }
    }
}
