//! Train/test batch classification and trial-rollover detection.

use crate::rollout::RolloutBatch;

/// Verdict over one batch of parallel rollouts; derived per step, never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchVerdict {
    /// Whether the batch counts as a train (inner-update) batch.
    pub is_train: bool,
    /// Last-recorded trial identifier per parallel rollout.
    pub trial_num: Vec<i64>,
    /// Whether any runner has rolled over to a new trial since the last
    /// step.
    pub trial_changed: bool,
}

/// Inspects a rollout batch and decides how the step should treat it.
#[derive(Debug, Default)]
pub struct BatchClassifier;

impl BatchClassifier {
    /// Classify one batch against the last observed trial vector.
    ///
    /// A single test-type rollout poisons the whole minibatch: the
    /// gradient selection must treat it as a meta batch, so `is_train`
    /// is the NOR of the per-rollout test tags. If metadata is missing
    /// anywhere the classifier fails open to `is_train = true` and
    /// `trial_changed = false` — inability to classify never blocks the
    /// step.
    ///
    /// Trial rollover is component-wise: any element differing from the
    /// stored vector (or a length change) counts as a change.
    pub fn classify(batch: &RolloutBatch, current_trial_num: &[i64]) -> BatchVerdict {
        let metas: Option<Vec<_>> = batch
            .on_policy
            .iter()
            .map(|rollout| {
                rollout
                    .meta
                    .as_ref()
                    .and_then(|meta| meta.current_trial().map(|trial| (meta, trial)))
            })
            .collect();

        let Some(metas) = metas else {
            log::warn!("rollout metadata missing or malformed, treating batch as train");
            return BatchVerdict {
                is_train: true,
                trial_num: current_trial_num.to_vec(),
                trial_changed: false,
            };
        };

        let is_train = !metas.iter().any(|(meta, _)| meta.episode_type.is_test());
        let trial_num: Vec<i64> = metas.iter().map(|(_, trial)| *trial).collect();
        let trial_changed = trial_num.len() != current_trial_num.len()
            || trial_num
                .iter()
                .zip(current_trial_num.iter())
                .any(|(observed, stored)| observed != stored);

        BatchVerdict {
            is_train,
            trial_num,
            trial_changed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rollout::{EpisodeType, Rollout, RolloutMeta};

    fn batch(specs: &[(EpisodeType, i64)]) -> RolloutBatch {
        RolloutBatch::new(
            specs
                .iter()
                .map(|&(episode_type, trial)| Rollout::with_meta(RolloutMeta::new(episode_type, trial)))
                .collect(),
        )
    }

    #[test]
    fn test_all_train_is_train() {
        let batch = batch(&[(EpisodeType::Train, 0), (EpisodeType::Train, 0)]);
        let verdict = BatchClassifier::classify(&batch, &[0, 0]);
        assert!(verdict.is_train);
        assert!(!verdict.trial_changed);
        assert_eq!(verdict.trial_num, vec![0, 0]);
    }

    #[test]
    fn test_one_test_rollout_poisons_batch() {
        let batch = batch(&[
            (EpisodeType::Train, 0),
            (EpisodeType::Test, 0),
            (EpisodeType::Train, 0),
        ]);
        let verdict = BatchClassifier::classify(&batch, &[0, 0, 0]);
        assert!(!verdict.is_train);
    }

    #[test]
    fn test_missing_metadata_fails_open() {
        let batch = RolloutBatch::new(vec![Rollout::default(), Rollout::default()]);
        let verdict = BatchClassifier::classify(&batch, &[5, 5]);
        assert!(verdict.is_train);
        assert!(!verdict.trial_changed);
        assert_eq!(verdict.trial_num, vec![5, 5]);
    }

    #[test]
    fn test_partially_missing_metadata_fails_open() {
        // One runner without metadata makes the whole batch unclassifiable.
        let batch = RolloutBatch::new(vec![
            Rollout::with_meta(RolloutMeta::new(EpisodeType::Test, 7)),
            Rollout::default(),
        ]);
        let verdict = BatchClassifier::classify(&batch, &[7, 7]);
        assert!(verdict.is_train);
        assert!(!verdict.trial_changed);
    }

    #[test]
    fn test_empty_trial_chain_fails_open() {
        let mut rollout = Rollout::with_meta(RolloutMeta::new(EpisodeType::Train, 0));
        rollout.meta.as_mut().unwrap().trial_chain.clear();
        let batch = RolloutBatch::new(vec![rollout]);
        let verdict = BatchClassifier::classify(&batch, &[0]);
        assert!(verdict.is_train);
        assert!(!verdict.trial_changed);
    }

    #[test]
    fn test_trial_changed_componentwise() {
        let batch = batch(&[(EpisodeType::Train, 1), (EpisodeType::Train, 2)]);

        // Identical vector: unchanged.
        let verdict = BatchClassifier::classify(&batch, &[1, 2]);
        assert!(!verdict.trial_changed);

        // One component differs: changed.
        let verdict = BatchClassifier::classify(&batch, &[1, 3]);
        assert!(verdict.trial_changed);
        assert_eq!(verdict.trial_num, vec![1, 2]);
    }

    #[test]
    fn test_trial_changed_on_first_observation() {
        // Stored vector starts empty; any observation is a change.
        let batch = batch(&[(EpisodeType::Train, 0)]);
        let verdict = BatchClassifier::classify(&batch, &[]);
        assert!(verdict.trial_changed);
    }

    #[test]
    fn test_trial_uses_last_chain_element() {
        let mut rollout = Rollout::with_meta(RolloutMeta::new(EpisodeType::Train, 1));
        rollout.meta.as_mut().unwrap().trial_chain = vec![1, 2, 3];
        let batch = RolloutBatch::new(vec![rollout]);

        let verdict = BatchClassifier::classify(&batch, &[3]);
        assert!(!verdict.trial_changed);
        assert_eq!(verdict.trial_num, vec![3]);
    }
}
