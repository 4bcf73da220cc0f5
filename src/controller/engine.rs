//! Gradient-update seam.
//!
//! The loss/feature builder and the optimizer live outside this core.
//! The controller hands them the sync protocol (for parameter access),
//! the raw batch and an [`UpdateRequest`] describing target, subset and
//! clipping; they hand back an optional summary.

use crate::error::UpdateError;
use crate::metrics::StepSummary;
use crate::params::SyncProtocol;
use crate::policy::UpdateRequest;
use crate::rollout::RolloutBatch;

/// External loss/gradient/optimizer collaborator.
///
/// One `apply_update` call is one optimizer sub-step. The engine must
/// honor the request exactly: write only to the requested target, touch
/// only the requested subset, clip at the requested norm, and return a
/// summary only when one is asked for. The controller stamps the step
/// index and batch stats onto any returned summary.
pub trait UpdateEngine {
    /// Run one gradient sub-step.
    fn apply_update(
        &mut self,
        sync: &mut SyncProtocol,
        batch: &RolloutBatch,
        request: &UpdateRequest,
    ) -> Result<Option<StepSummary>, UpdateError>;
}
