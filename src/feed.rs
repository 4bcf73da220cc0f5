//! Data-feed seam.
//!
//! The environment runners live outside this core; the controller only
//! needs a way to launch them and to pull one batch per step. The
//! channel-backed implementation covers the common case of runner
//! threads pushing batches over a bounded channel.

use std::fmt;

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::rollout::RolloutBatch;

/// Error from the rollout source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// `next_batch` was called before `launch`.
    NotLaunched,
    /// All producers hung up; no more batches will arrive.
    Disconnected,
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::NotLaunched => write!(f, "rollout source used before launch"),
            FeedError::Disconnected => write!(f, "rollout producers disconnected"),
        }
    }
}

impl std::error::Error for FeedError {}

/// Source of per-step rollout batches.
///
/// Both calls block from the worker's perspective; there is no
/// cooperative yielding inside a step.
pub trait RolloutSource {
    /// One-time start of the underlying runners.
    fn launch(&mut self) -> Result<(), FeedError>;

    /// Pull the next batch, blocking until one is available.
    fn next_batch(&mut self) -> Result<RolloutBatch, FeedError>;
}

/// Rollout source backed by a bounded crossbeam channel.
///
/// Runner threads hold the [`Sender`] side and push one
/// [`RolloutBatch`] per collection pass.
pub struct ChannelRolloutSource {
    rx: Receiver<RolloutBatch>,
    launched: bool,
}

impl ChannelRolloutSource {
    /// Wrap an existing receiver.
    pub fn new(rx: Receiver<RolloutBatch>) -> Self {
        Self { rx, launched: false }
    }
}

impl RolloutSource for ChannelRolloutSource {
    fn launch(&mut self) -> Result<(), FeedError> {
        self.launched = true;
        Ok(())
    }

    fn next_batch(&mut self) -> Result<RolloutBatch, FeedError> {
        if !self.launched {
            return Err(FeedError::NotLaunched);
        }
        self.rx.recv().map_err(|_| FeedError::Disconnected)
    }
}

/// Create a bounded rollout channel, returning the producer side and a
/// ready-to-launch source for the consumer side.
pub fn rollout_channel(capacity: usize) -> (Sender<RolloutBatch>, ChannelRolloutSource) {
    let (tx, rx) = bounded(capacity);
    (tx, ChannelRolloutSource::new(rx))
}
