//! Variant strategies for the meta-training step.
//!
//! Each strategy answers two questions per step: which sync copies fire
//! around the gradient update, and which parameter subset the update
//! targets. The four variants are plain data — an enum consulted by the
//! controller — so each behavior table is testable without wiring a
//! worker.

use crate::params::{ParamSubset, UpdateTarget};

/// Global-norm clipping threshold for the restricted meta-critic
/// gradient updates.
pub const GRAD_CLIP_NORM: f64 = 40.0;

/// One copy primitive of the sync protocol, named by its edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOp {
    /// `global -> local`.
    LocalFromGlobal,
    /// `local -> prime`.
    PrimeFromLocal,
    /// `prime -> local`.
    LocalFromPrime,
}

/// Description of the gradient update a step should run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateRequest {
    /// Parameter set the update writes to.
    pub target: UpdateTarget,
    /// Parameter subset the gradients are restricted to.
    pub subset: ParamSubset,
    /// Global-norm clipping threshold, where the variant fixes one.
    pub clip_norm: Option<f64>,
    /// Verdict tag for the loss/feature builder; test batches get
    /// evaluation-shaped gradients unless the outer update consumes them.
    pub is_train: bool,
    /// Whether this sub-step should return a model summary.
    pub want_summary: bool,
}

/// Which meta-learning variant a worker runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPolicy {
    /// First-order meta update: inner steps adapt `local` and checkpoint
    /// to `prime`; the outer step restores `prime` and writes `global`.
    FirstOrder,
    /// [`FirstOrder`](Self::FirstOrder) plus a `local <- global` refresh
    /// after every outer update, so the next inner phase starts from
    /// fresh consensus instead of the just-used checkpoint.
    FirstOrderRefresh,
    /// Meta-critic: every step starts from `global`; train batches run
    /// the standard full-policy update, test batches update the critic
    /// subset only. `prime` is never touched — a pure outer-loop variant.
    MetaCritic,
    /// [`MetaCritic`](Self::MetaCritic) with the train-batch update
    /// restricted to the actor subset.
    MetaCriticActorOnly,
}

impl SyncPolicy {
    /// Sync ops to run before the gradient update.
    pub fn pre_update(&self, is_train: bool) -> &'static [SyncOp] {
        match (self, is_train) {
            (SyncPolicy::FirstOrder | SyncPolicy::FirstOrderRefresh, true) => &[],
            (SyncPolicy::FirstOrder | SyncPolicy::FirstOrderRefresh, false) => {
                &[SyncOp::LocalFromPrime]
            }
            (SyncPolicy::MetaCritic | SyncPolicy::MetaCriticActorOnly, _) => {
                &[SyncOp::LocalFromGlobal]
            }
        }
    }

    /// Sync ops to run after the gradient update.
    pub fn post_update(&self, is_train: bool) -> &'static [SyncOp] {
        match (self, is_train) {
            (SyncPolicy::FirstOrder | SyncPolicy::FirstOrderRefresh, true) => {
                &[SyncOp::PrimeFromLocal]
            }
            (SyncPolicy::FirstOrder, false) => &[],
            (SyncPolicy::FirstOrderRefresh, false) => &[SyncOp::LocalFromGlobal],
            (SyncPolicy::MetaCritic | SyncPolicy::MetaCriticActorOnly, _) => &[],
        }
    }

    /// The gradient update this variant runs for a train or meta batch.
    pub fn update_request(&self, is_train: bool, want_summary: bool) -> UpdateRequest {
        let (target, subset, clip_norm) = match (self, is_train) {
            // Inner step on the worker's own copy.
            (SyncPolicy::FirstOrder | SyncPolicy::FirstOrderRefresh, true) => {
                (UpdateTarget::Local, ParamSubset::Full, None)
            }
            // Outer step on the shared consensus set.
            (SyncPolicy::FirstOrder | SyncPolicy::FirstOrderRefresh, false) => {
                (UpdateTarget::Global, ParamSubset::Full, None)
            }
            (SyncPolicy::MetaCritic, true) => (UpdateTarget::Global, ParamSubset::Full, None),
            (SyncPolicy::MetaCriticActorOnly, true) => (
                UpdateTarget::Global,
                ParamSubset::ActorOnly,
                Some(GRAD_CLIP_NORM),
            ),
            (SyncPolicy::MetaCritic | SyncPolicy::MetaCriticActorOnly, false) => (
                UpdateTarget::Global,
                ParamSubset::CriticOnly,
                Some(GRAD_CLIP_NORM),
            ),
        };
        UpdateRequest {
            target,
            subset,
            clip_norm,
            is_train,
            want_summary,
        }
    }

    /// Whether `start()` checkpoints `prime` from `local` after the
    /// initial global sync.
    pub fn checkpoints_prime(&self) -> bool {
        matches!(self, SyncPolicy::FirstOrder | SyncPolicy::FirstOrderRefresh)
    }
}
