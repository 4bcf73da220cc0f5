//! Three-way parameter synchronization protocol.
//!
//! A worker holds three snapshots of the same parameter shape:
//!
//! - `global` — the shared cross-worker consensus set, mutated by every
//!   worker's outer update (last-writer-wins, no ordering across workers);
//! - `local` — this worker's working copy, used for forward/backward;
//! - `prime` — this worker's meta checkpoint, saved after an inner update
//!   and restored before an outer one.
//!
//! The protocol is the fixed order in which these copies fire around a
//! gradient update; the primitives themselves are blocking whole-set
//! assignments. Which copy fires when is dictated by
//! [`SyncPolicy`](crate::policy::SyncPolicy), not decided here.

use crate::params::store::{ParamSet, SharedParams, StoreError};

/// Which parameter set a gradient update writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateTarget {
    /// The worker's own working copy (inner/task-adaptation update).
    Local,
    /// The shared consensus set (outer/meta update).
    Global,
}

/// Copy primitives over the `global`/`local`/`prime` snapshots.
///
/// Owns `local` and `prime` exclusively; holds a handle to the shared
/// `global`. Every primitive either copies the entire set or fails with
/// the store's error, leaving the destination untouched.
#[derive(Debug)]
pub struct SyncProtocol {
    global: SharedParams,
    local: ParamSet,
    prime: ParamSet,
}

impl SyncProtocol {
    /// Create the protocol for one worker.
    ///
    /// `local` and `prime` are cloned from the current global contents so
    /// the three sets always share one shape; `start()` still performs
    /// the explicit initial syncs.
    pub fn new(global: SharedParams) -> Self {
        let snapshot = global.read().clone();
        Self {
            global,
            local: snapshot.clone(),
            prime: snapshot,
        }
    }

    /// Copy `global` into `local`, discarding local drift.
    pub fn sync_local_from_global(&mut self) -> Result<(), StoreError> {
        let global = self.global.read();
        self.local.assign_from(&global)
    }

    /// Copy `local` into `prime` (checkpoint after an inner update).
    pub fn sync_prime_from_local(&mut self) -> Result<(), StoreError> {
        self.prime.assign_from(&self.local)
    }

    /// Copy `prime` into `local` (restore before an outer update).
    pub fn sync_local_from_prime(&mut self) -> Result<(), StoreError> {
        self.local.assign_from(&self.prime)
    }

    /// The worker's working copy.
    pub fn local(&self) -> &ParamSet {
        &self.local
    }

    /// The worker's meta checkpoint.
    pub fn prime(&self) -> &ParamSet {
        &self.prime
    }

    /// A point-in-time copy of the shared consensus set.
    pub fn global_snapshot(&self) -> ParamSet {
        self.global.read().clone()
    }

    /// Run `f` with mutable access to the requested update target.
    ///
    /// For [`UpdateTarget::Global`] the write lock is held for the whole
    /// closure; a worker's outer update is atomic at that granularity and
    /// nothing finer.
    pub fn with_target_mut<R>(&mut self, target: UpdateTarget, f: impl FnOnce(&mut ParamSet) -> R) -> R {
        match target {
            UpdateTarget::Local => f(&mut self.local),
            UpdateTarget::Global => f(&mut self.global.write()),
        }
    }
}
