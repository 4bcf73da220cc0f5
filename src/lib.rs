//! # meta-rl: control core for distributed meta-RL training
//!
//! Decides, for each asynchronous worker and each training step, which
//! data distribution the worker's environment samples next and which of
//! three parameter snapshots is copied into which, in what order, to
//! realize a first-order meta-learning update that alternates task-level
//! adaptation with meta-level optimization.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                       One worker                               │
//! │                                                                │
//! │  CurriculumState ──► SampleConfig ──► (external data feed)     │
//! │        ▲                                     │                 │
//! │        │                                     ▼                 │
//! │        │                               RolloutBatch            │
//! │        │                                     │                 │
//! │        │                                     ▼                 │
//! │  TrainingStepController ◄──── BatchClassifier (verdict)        │
//! │        │                                                       │
//! │        ├──► SyncProtocol: global ⇄ local ⇄ prime copies        │
//! │        └──► UpdateEngine: selected gradient update             │
//! │                                                                │
//! │  `global` is shared across workers (last-writer-wins);         │
//! │  `local` and `prime` are worker-exclusive.                     │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The network, optimizer, environment runners and the outer training
//! loop are external collaborators behind the [`UpdateEngine`] and
//! [`RolloutSource`] traits. Everything here is fail-fast: the first
//! error aborts the worker — a crashed worker is recoverable, a silently
//! corrupted sync order is not.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use meta_rl::{
//!     shared_params, step_counter, ConsoleSink, SyncPolicy,
//!     TrainerConfig, TrainingStepController,
//! };
//!
//! let config = TrainerConfig::new()
//!     .with_train_episodes(2)
//!     .with_test_episodes(1)
//!     .with_cycles_per_trial(2);
//!
//! let mut controller = TrainingStepController::new(
//!     config,
//!     SyncPolicy::FirstOrder,
//!     global_params,
//!     step_counter(),
//!     Box::new(ConsoleSink::new()),
//!     worker_index,
//! )?;
//!
//! controller.start(&mut feed)?;
//! loop {
//!     let batch = feed.next_batch()?;
//!     controller.step(&mut engine, &batch)?;
//! }
//! ```

pub mod config;
pub mod controller;
pub mod counters;
pub mod curriculum;
pub mod error;
pub mod feed;
pub mod metrics;
pub mod params;
pub mod policy;
pub mod rollout;

pub use config::TrainerConfig;
pub use counters::{step_counter, SharedStepCounter, StepCounter};
pub use error::{FatalTrainingError, TrainingError, UpdateError};

pub use curriculum::{
    CurriculumPhase, CurriculumState, EpisodeConfig, SampleConfig, SampleType, TrialConfig,
};

pub use params::{
    shared_params, ParamBlock, ParamGroup, ParamSet, ParamSubset, SharedParams, StoreError,
    SyncProtocol, UpdateTarget,
};

pub use rollout::{BatchClassifier, BatchVerdict, EpisodeType, Rollout, RolloutBatch, RolloutMeta};

pub use policy::{SyncOp, SyncPolicy, UpdateRequest, GRAD_CLIP_NORM};

pub use controller::{TrainingStepController, UpdateEngine};

pub use feed::{rollout_channel, ChannelRolloutSource, FeedError, RolloutSource};

pub use metrics::{ConsoleSink, CsvSink, NullSink, StepSummary, SummarySink};
