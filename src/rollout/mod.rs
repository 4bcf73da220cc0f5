//! Rollout batches and their per-step metadata.
//!
//! The core never generates rollouts; it only inspects the metadata the
//! data feed attaches to each parallel runner's rollout (episode type and
//! the trial-identifier chain) to classify the batch and detect trial
//! rollover.

pub mod classifier;

pub use classifier::{BatchClassifier, BatchVerdict};

use crate::curriculum::SampleType;

/// Whether an episode was drawn from the train or the test distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EpisodeType {
    /// Drawn from the train distribution.
    Train,
    /// Drawn from the held-out test distribution.
    Test,
}

impl EpisodeType {
    /// Whether this is a test-type episode.
    #[inline]
    pub fn is_test(&self) -> bool {
        matches!(self, EpisodeType::Test)
    }
}

impl From<SampleType> for EpisodeType {
    fn from(t: SampleType) -> Self {
        match t {
            SampleType::Train => EpisodeType::Train,
            SampleType::Test => EpisodeType::Test,
        }
    }
}

/// Per-rollout metadata attached by the data feed.
#[derive(Debug, Clone, PartialEq)]
pub struct RolloutMeta {
    /// Episode type tag of the episode this rollout came from.
    pub episode_type: EpisodeType,
    /// Trial identifiers recorded along the rollout; the last element is
    /// the trial the rollout ended in.
    pub trial_chain: Vec<i64>,
}

impl RolloutMeta {
    /// Create metadata for a rollout that stayed in one trial.
    pub fn new(episode_type: EpisodeType, trial: i64) -> Self {
        Self {
            episode_type,
            trial_chain: vec![trial],
        }
    }

    /// The trial this rollout most recently belonged to.
    pub fn current_trial(&self) -> Option<i64> {
        self.trial_chain.last().copied()
    }
}

/// One parallel runner's rollout.
///
/// The experience payload itself is opaque to this core; only the
/// metadata and the coarse counts used for summaries are carried.
#[derive(Debug, Clone, Default)]
pub struct Rollout {
    /// Feed-attached metadata; `None` if the feed produced a rollout
    /// without it (the classifier fails open in that case).
    pub meta: Option<RolloutMeta>,
    /// Environment frames in this rollout.
    pub frames: usize,
    /// Undiscounted reward summed over the rollout.
    pub total_reward: f32,
}

impl Rollout {
    /// Create a rollout with metadata.
    pub fn with_meta(meta: RolloutMeta) -> Self {
        Self {
            meta: Some(meta),
            ..Default::default()
        }
    }
}

/// One step's worth of rollouts, keyed by category.
///
/// Only the on-policy group is mandatory; that is the group the
/// classifier and the update request are built from.
#[derive(Debug, Clone, Default)]
pub struct RolloutBatch {
    /// One rollout per parallel runner.
    pub on_policy: Vec<Rollout>,
}

impl RolloutBatch {
    /// Create a batch from on-policy rollouts.
    pub fn new(on_policy: Vec<Rollout>) -> Self {
        Self { on_policy }
    }

    /// Total environment frames across the on-policy group.
    pub fn frames(&self) -> usize {
        self.on_policy.iter().map(|r| r.frames).sum()
    }

    /// Mean rollout reward across the on-policy group.
    pub fn mean_reward(&self) -> f32 {
        if self.on_policy.is_empty() {
            return 0.0;
        }
        let total: f32 = self.on_policy.iter().map(|r| r.total_reward).sum();
        total / self.on_policy.len() as f32
    }
}
