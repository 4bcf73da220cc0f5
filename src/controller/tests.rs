use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::TrainerConfig;
use crate::counters::{step_counter, SharedStepCounter};
use crate::error::{FatalTrainingError, UpdateError};
use crate::feed::rollout_channel;
use crate::metrics::{StepSummary, SummarySink};
use crate::params::{
    shared_params, ParamBlock, ParamGroup, ParamSet, ParamSubset, SharedParams, SyncProtocol,
    UpdateTarget,
};
use crate::policy::{SyncPolicy, UpdateRequest, GRAD_CLIP_NORM};
use crate::rollout::{EpisodeType, Rollout, RolloutBatch, RolloutMeta};

use super::{TrainingStepController, UpdateEngine};

/// Engine that adds a fixed delta to the requested subset of the
/// requested target and records every request it sees.
struct DeltaEngine {
    delta: f32,
    calls: Vec<UpdateRequest>,
    fail: bool,
}

impl DeltaEngine {
    fn new(delta: f32) -> Self {
        Self {
            delta,
            calls: Vec::new(),
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            delta: 0.0,
            calls: Vec::new(),
            fail: true,
        }
    }
}

impl UpdateEngine for DeltaEngine {
    fn apply_update(
        &mut self,
        sync: &mut SyncProtocol,
        _batch: &RolloutBatch,
        request: &UpdateRequest,
    ) -> Result<Option<StepSummary>, UpdateError> {
        if self.fail {
            return Err(UpdateError::new("forced failure"));
        }
        self.calls.push(*request);
        let delta = self.delta;
        sync.with_target_mut(request.target, |set| {
            set.for_each_in_subset(request.subset, |v| *v += delta)
        });
        Ok(request
            .want_summary
            .then(|| StepSummary::new(0, request.is_train).with_losses(0.5, 0.25)))
    }
}

struct VecSink(Arc<Mutex<Vec<StepSummary>>>);

impl SummarySink for VecSink {
    fn write(&mut self, summary: &StepSummary) {
        self.0.lock().push(summary.clone());
    }
    fn flush(&mut self) {}
}

fn global_set(actor: f32, critic: f32) -> SharedParams {
    shared_params(ParamSet::with_blocks(vec![
        ParamBlock::new("pi/w", ParamGroup::Actor, vec![actor; 2]),
        ParamBlock::new("vf/w", ParamGroup::Critic, vec![critic; 2]),
    ]))
}

struct Rig {
    controller: TrainingStepController,
    global: SharedParams,
    counter: SharedStepCounter,
    summaries: Arc<Mutex<Vec<StepSummary>>>,
}

fn rig_with(policy: SyncPolicy, config: TrainerConfig, actor: f32, critic: f32) -> Rig {
    let global = global_set(actor, critic);
    let counter = step_counter();
    let summaries = Arc::new(Mutex::new(Vec::new()));
    let controller = TrainingStepController::new(
        config,
        policy,
        global.clone(),
        counter.clone(),
        Box::new(VecSink(summaries.clone())),
        0,
    )
    .unwrap();
    Rig {
        controller,
        global,
        counter,
        summaries,
    }
}

fn rig(policy: SyncPolicy) -> Rig {
    rig_with(policy, TrainerConfig::default(), 0.0, 0.0)
}

fn start(rig: &mut Rig) {
    let (_tx, mut source) = rollout_channel(1);
    rig.controller.start(&mut source).unwrap();
}

fn batch_of(episode_type: EpisodeType, trial: i64) -> RolloutBatch {
    let rollout = || {
        let mut r = Rollout::with_meta(RolloutMeta::new(episode_type, trial));
        r.frames = 5;
        r.total_reward = 1.0;
        r
    };
    RolloutBatch::new(vec![rollout(), rollout()])
}

fn train_batch(trial: i64) -> RolloutBatch {
    batch_of(EpisodeType::Train, trial)
}

fn test_batch(trial: i64) -> RolloutBatch {
    batch_of(EpisodeType::Test, trial)
}

fn values(set: &ParamSet, name: &str) -> Vec<f32> {
    set.values(name).unwrap().to_vec()
}

#[test]
fn test_first_order_train_step_checkpoints_prime() {
    let mut rig = rig(SyncPolicy::FirstOrder);
    start(&mut rig);
    let mut engine = DeltaEngine::new(1.0);

    rig.controller.step(&mut engine, &train_batch(0)).unwrap();

    // Inner update moved local; the checkpoint followed it; global is
    // untouched on the train branch.
    assert_eq!(values(rig.controller.sync().local(), "pi/w"), vec![1.0; 2]);
    assert_eq!(values(rig.controller.sync().prime(), "pi/w"), vec![1.0; 2]);
    assert_eq!(values(&rig.global.read(), "pi/w"), vec![0.0; 2]);

    let request = engine.calls.last().unwrap();
    assert_eq!(request.target, UpdateTarget::Local);
    assert_eq!(request.subset, ParamSubset::Full);
    assert!(request.is_train);
}

#[test]
fn test_first_order_meta_step_restores_prime_and_writes_global() {
    let mut rig = rig(SyncPolicy::FirstOrder);
    start(&mut rig);
    let mut engine = DeltaEngine::new(1.0);

    rig.controller.step(&mut engine, &train_batch(0)).unwrap();
    // Local drifts past the checkpoint between steps.
    rig.controller.sync_mut().with_target_mut(UpdateTarget::Local, |set| {
        set.for_each_in_subset(ParamSubset::Full, |v| *v = 99.0)
    });

    rig.controller.step(&mut engine, &test_batch(0)).unwrap();

    // The drift was discarded: local was restored from prime (1.0), not
    // checkpointed into it.
    assert_eq!(values(rig.controller.sync().local(), "pi/w"), vec![1.0; 2]);
    assert_eq!(values(rig.controller.sync().prime(), "pi/w"), vec![1.0; 2]);
    // The outer update wrote global.
    assert_eq!(values(&rig.global.read(), "pi/w"), vec![1.0; 2]);
    assert_eq!(values(&rig.global.read(), "vf/w"), vec![1.0; 2]);

    let request = engine.calls.last().unwrap();
    assert_eq!(request.target, UpdateTarget::Global);
    assert!(!request.is_train);
}

#[test]
fn test_refresh_variant_resyncs_local_after_meta_step() {
    let mut rig = rig(SyncPolicy::FirstOrderRefresh);
    start(&mut rig);
    let mut engine = DeltaEngine::new(1.0);

    rig.controller.step(&mut engine, &train_batch(0)).unwrap();
    // Move the consensus away from the checkpoint so the two sources
    // are distinguishable.
    rig.global
        .write()
        .for_each_in_subset(ParamSubset::Full, |v| *v = 50.0);

    rig.controller.step(&mut engine, &test_batch(0)).unwrap();

    // After the outer update the next inner phase starts from fresh
    // global consensus (51.0), not from the just-used checkpoint (1.0).
    assert_eq!(values(&rig.global.read(), "pi/w"), vec![51.0; 2]);
    assert_eq!(values(rig.controller.sync().local(), "pi/w"), vec![51.0; 2]);
    assert_eq!(values(rig.controller.sync().prime(), "pi/w"), vec![1.0; 2]);
}

#[test]
fn test_meta_critic_train_step_runs_full_update_on_global() {
    let mut rig = rig_with(SyncPolicy::MetaCritic, TrainerConfig::default(), 5.0, 5.0);
    start(&mut rig);
    let mut engine = DeltaEngine::new(1.0);

    rig.controller.step(&mut engine, &train_batch(0)).unwrap();

    assert_eq!(values(&rig.global.read(), "pi/w"), vec![6.0; 2]);
    assert_eq!(values(&rig.global.read(), "vf/w"), vec![6.0; 2]);
    // Local was refreshed from global before the update ran.
    assert_eq!(values(rig.controller.sync().local(), "pi/w"), vec![5.0; 2]);
    // Prime is never part of the meta-critic protocol.
    assert_eq!(values(rig.controller.sync().prime(), "pi/w"), vec![5.0; 2]);

    let request = engine.calls.last().unwrap();
    assert_eq!(request.target, UpdateTarget::Global);
    assert_eq!(request.subset, ParamSubset::Full);
    assert_eq!(request.clip_norm, None);
}

#[test]
fn test_meta_critic_meta_step_touches_critic_only() {
    let mut rig = rig_with(SyncPolicy::MetaCritic, TrainerConfig::default(), 1.5, 2.5);
    start(&mut rig);
    let mut engine = DeltaEngine::new(1.0);

    rig.controller.step(&mut engine, &test_batch(0)).unwrap();

    assert_eq!(values(&rig.global.read(), "vf/w"), vec![3.5; 2]);
    // Actor parameters are bitwise unchanged.
    assert_eq!(values(&rig.global.read(), "pi/w"), vec![1.5; 2]);

    let request = engine.calls.last().unwrap();
    assert_eq!(request.subset, ParamSubset::CriticOnly);
    assert_eq!(request.clip_norm, Some(GRAD_CLIP_NORM));
}

#[test]
fn test_meta_critic_actor_only_train_leaves_critic_bitwise_unchanged() {
    let critic_fill = 0.123_456_7_f32;
    let mut rig = rig_with(
        SyncPolicy::MetaCriticActorOnly,
        TrainerConfig::default(),
        1.0,
        critic_fill,
    );
    start(&mut rig);
    let mut engine = DeltaEngine::new(1.0);

    rig.controller.step(&mut engine, &train_batch(0)).unwrap();

    assert_eq!(values(&rig.global.read(), "pi/w"), vec![2.0; 2]);
    assert_eq!(values(&rig.global.read(), "vf/w"), vec![critic_fill; 2]);

    let request = engine.calls.last().unwrap();
    assert_eq!(request.subset, ParamSubset::ActorOnly);
    assert_eq!(request.clip_norm, Some(GRAD_CLIP_NORM));
}

#[test]
fn test_trial_rollover_resyncs_local_from_global() {
    let mut rig = rig(SyncPolicy::FirstOrder);
    start(&mut rig);
    let mut engine = DeltaEngine::new(1.0);

    rig.controller.step(&mut engine, &train_batch(0)).unwrap();
    assert_eq!(rig.controller.curriculum().current_trial_num(), &[0, 0]);

    // Another worker moved the consensus set in the meantime.
    rig.global
        .write()
        .for_each_in_subset(ParamSubset::Full, |v| *v = 10.0);

    rig.controller.step(&mut engine, &train_batch(1)).unwrap();

    // The new trial started from the fresh consensus, then ran its inner
    // update on top of it.
    assert_eq!(values(rig.controller.sync().local(), "pi/w"), vec![11.0; 2]);
    assert_eq!(rig.controller.curriculum().current_trial_num(), &[1, 1]);
}

#[test]
fn test_epochs_run_and_only_last_carries_summary() {
    let config = TrainerConfig::default()
        .with_num_epochs(3)
        .with_model_summary_freq(1);
    let mut rig = rig_with(SyncPolicy::FirstOrder, config, 0.0, 0.0);
    start(&mut rig);
    let mut engine = DeltaEngine::new(1.0);

    rig.controller.step(&mut engine, &train_batch(0)).unwrap();

    assert_eq!(engine.calls.len(), 3);
    let flags: Vec<bool> = engine.calls.iter().map(|r| r.want_summary).collect();
    assert_eq!(flags, vec![false, false, true]);
    // Three sub-steps moved local three times.
    assert_eq!(values(rig.controller.sync().local(), "pi/w"), vec![3.0; 2]);
}

#[test]
fn test_summary_cadence_and_stamping() {
    let config = TrainerConfig::default().with_model_summary_freq(2);
    let mut rig = rig_with(SyncPolicy::FirstOrder, config, 0.0, 0.0);
    start(&mut rig);
    let mut engine = DeltaEngine::new(1.0);

    for _ in 0..4 {
        rig.controller.step(&mut engine, &train_batch(0)).unwrap();
    }

    let summaries = rig.summaries.lock();
    let steps: Vec<usize> = summaries.iter().map(|s| s.step).collect();
    assert_eq!(steps, vec![0, 2]);
    // Controller stamps batch stats onto the engine's summary.
    assert_eq!(summaries[0].frames, 10);
    assert_eq!(summaries[0].mean_reward, 1.0);
    assert!(summaries[0].is_train);
}

#[test]
fn test_step_counter_advances_on_both_branches() {
    let mut rig = rig(SyncPolicy::FirstOrder);
    start(&mut rig);
    let mut engine = DeltaEngine::new(1.0);

    rig.controller.step(&mut engine, &train_batch(0)).unwrap();
    rig.controller.step(&mut engine, &test_batch(0)).unwrap();

    assert_eq!(rig.counter.get(), 2);
    assert_eq!(rig.controller.local_steps(), 2);
}

#[test]
fn test_missing_metadata_runs_train_branch() {
    let mut rig = rig(SyncPolicy::FirstOrder);
    start(&mut rig);
    let mut engine = DeltaEngine::new(1.0);

    let bare = RolloutBatch::new(vec![Rollout::default(), Rollout::default()]);
    rig.controller.step(&mut engine, &bare).unwrap();

    assert!(engine.calls.last().unwrap().is_train);
    // No trial information: nothing recorded, no rollover triggered.
    assert!(rig.controller.curriculum().current_trial_num().is_empty());
}

#[test]
fn test_engine_failure_aborts_step() {
    let mut rig = rig(SyncPolicy::FirstOrder);
    start(&mut rig);
    let mut engine = DeltaEngine::failing();

    let err = rig.controller.step(&mut engine, &train_batch(0)).unwrap_err();
    assert!(matches!(err, FatalTrainingError::Step(_)));
    assert!(err.to_string().contains("interrupt and restart"));
    // The failed step did not advance the counters.
    assert_eq!(rig.controller.local_steps(), 0);
}

#[test]
fn test_invalid_config_is_construction_failure() {
    let mut config = TrainerConfig::default();
    config.cycles_per_trial = 0;
    let err = TrainingStepController::new(
        config,
        SyncPolicy::FirstOrder,
        global_set(0.0, 0.0),
        step_counter(),
        Box::new(VecSink(Arc::new(Mutex::new(Vec::new())))),
        0,
    )
    .unwrap_err();
    assert!(matches!(err, FatalTrainingError::Construction(_)));
}

#[test]
fn test_start_checkpoints_prime_only_where_policy_says_so() {
    for (policy, expect_prime) in [
        (SyncPolicy::FirstOrder, 4.0),
        (SyncPolicy::MetaCritic, 3.0),
    ] {
        let mut rig = rig_with(policy, TrainerConfig::default(), 3.0, 3.0);
        // Global moves between construction and start.
        rig.global
            .write()
            .for_each_in_subset(ParamSubset::Full, |v| *v = 4.0);
        start(&mut rig);

        // Local always picks up the fresh global; prime only follows for
        // the variants that checkpoint it.
        assert_eq!(values(rig.controller.sync().local(), "pi/w"), vec![4.0; 2]);
        assert_eq!(
            values(rig.controller.sync().prime(), "pi/w"),
            vec![expect_prime; 2],
            "policy {:?}",
            policy
        );
    }
}
