//! Fail-fast error taxonomy for the training core.
//!
//! Every failure is terminal for the worker that raises it: a corrupted
//! sync or curriculum state silently poisons the meta-learning signal,
//! while a crashed worker is loud and recoverable by restarting the run.
//! Nothing in this crate retries or continues a partial step.

use std::fmt;

use crate::feed::FeedError;
use crate::params::StoreError;

/// Error raised by an [`UpdateEngine`](crate::controller::UpdateEngine)
/// implementation during a gradient sub-step.
///
/// The engine is an external collaborator; its failures are carried as an
/// opaque message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateError {
    message: String,
}

impl UpdateError {
    /// Create an update error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for UpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "update engine failed: {}", self.message)
    }
}

impl std::error::Error for UpdateError {}

/// Any failure inside one of the core's operations.
#[derive(Debug)]
pub enum TrainingError {
    /// Parameter store failure (shape or block mismatch during a sync).
    Store(StoreError),
    /// Gradient/optimizer collaborator failure.
    Update(UpdateError),
    /// Data feed failure.
    Feed(FeedError),
    /// Invalid configuration caught while wiring the worker.
    Config(&'static str),
}

impl fmt::Display for TrainingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainingError::Store(e) => write!(f, "parameter store error: {}", e),
            TrainingError::Update(e) => write!(f, "update error: {}", e),
            TrainingError::Feed(e) => write!(f, "data feed error: {}", e),
            TrainingError::Config(msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for TrainingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TrainingError::Store(e) => Some(e),
            TrainingError::Update(e) => Some(e),
            TrainingError::Feed(e) => Some(e),
            TrainingError::Config(_) => None,
        }
    }
}

impl From<StoreError> for TrainingError {
    fn from(e: StoreError) -> Self {
        TrainingError::Store(e)
    }
}

impl From<UpdateError> for TrainingError {
    fn from(e: UpdateError) -> Self {
        TrainingError::Update(e)
    }
}

impl From<FeedError> for TrainingError {
    fn from(e: FeedError) -> Self {
        TrainingError::Feed(e)
    }
}

/// Fatal worker condition, categorized by the operation that raised it.
///
/// Returned by [`TrainingStepController`](crate::controller::TrainingStepController)
/// entry points. The harness owns process termination; this core never
/// retries.
#[derive(Debug)]
pub enum FatalTrainingError {
    /// Failure while wiring optimizers, gradients or sync groups.
    Construction(TrainingError),
    /// Failure during initial sync or runner launch.
    Start(TrainingError),
    /// Failure during classification, sync or optimizer execution.
    Step(TrainingError),
}

impl FatalTrainingError {
    /// The underlying error, regardless of category.
    pub fn cause(&self) -> &TrainingError {
        match self {
            FatalTrainingError::Construction(e)
            | FatalTrainingError::Start(e)
            | FatalTrainingError::Step(e) => e,
        }
    }

    fn phase(&self) -> &'static str {
        match self {
            FatalTrainingError::Construction(_) => "construction",
            FatalTrainingError::Start(_) => "start",
            FatalTrainingError::Step(_) => "train step",
        }
    }
}

impl fmt::Display for FatalTrainingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed: {}; worker cannot continue, interrupt and restart the run",
            self.phase(),
            self.cause()
        )
    }
}

impl std::error::Error for FatalTrainingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.cause())
    }
}
