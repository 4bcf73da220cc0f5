//! Episode/trial/cycle curriculum scheduling.
//!
//! Decides, per step, which data distribution the worker's environment
//! should sample next. The schedule is a three-level nested loop:
//! episodes inside a cycle (train quota, then test quota), cycles inside
//! a trial, trials forever.

pub mod scheduler;


pub use scheduler::{
    CurriculumPhase, CurriculumState, EpisodeConfig, SampleConfig, SampleType, TrialConfig,
};
