//! Named parameter snapshots.
//!
//! A [`ParamSet`] is an ordered collection of named `f32` blocks, each
//! tagged with the part of the policy it belongs to so gradient updates
//! can be restricted to a subset. Three sets with identical shape play
//! the `global`/`local`/`prime` roles of the sync protocol; only the
//! global one is shared across workers.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

/// Which part of the policy a parameter block belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamGroup {
    /// Policy head and shared trunk parameters.
    Actor,
    /// Value head parameters.
    Critic,
}

/// Parameter subset a gradient update is allowed to touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamSubset {
    /// Every block.
    Full,
    /// Actor blocks only.
    ActorOnly,
    /// Critic blocks only.
    CriticOnly,
}

impl ParamSubset {
    /// Whether a block of the given group falls inside this subset.
    #[inline]
    pub fn contains(&self, group: ParamGroup) -> bool {
        match self {
            ParamSubset::Full => true,
            ParamSubset::ActorOnly => group == ParamGroup::Actor,
            ParamSubset::CriticOnly => group == ParamGroup::Critic,
        }
    }
}

/// One named, group-tagged block of parameter values.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamBlock {
    name: String,
    group: ParamGroup,
    values: Vec<f32>,
}

impl ParamBlock {
    /// Create a block.
    pub fn new(name: impl Into<String>, group: ParamGroup, values: Vec<f32>) -> Self {
        Self {
            name: name.into(),
            group,
            values,
        }
    }

    /// Block name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Policy part this block belongs to.
    pub fn group(&self) -> ParamGroup {
        self.group
    }

    /// Parameter values.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Mutable parameter values.
    pub fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }
}

/// Error from a bulk parameter copy.
///
/// A sync either copies the entire set or fails with one of these; there
/// are no partial-copy semantics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Source and destination hold different block layouts.
    BlockMismatch {
        /// Block count in the destination.
        expected: usize,
        /// Block count in the source.
        got: usize,
    },
    /// A block pair disagrees on name or length.
    ShapeMismatch {
        /// Name of the destination block.
        name: String,
        /// Length of the destination block.
        expected: usize,
        /// Length of the source block.
        got: usize,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::BlockMismatch { expected, got } => {
                write!(f, "block count mismatch: expected {}, got {}", expected, got)
            }
            StoreError::ShapeMismatch { name, expected, got } => {
                write!(
                    f,
                    "shape mismatch in block '{}': expected {}, got {}",
                    name, expected, got
                )
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// An ordered set of named parameter blocks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamSet {
    blocks: Vec<ParamBlock>,
}

impl ParamSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a set from blocks.
    pub fn with_blocks(blocks: Vec<ParamBlock>) -> Self {
        Self { blocks }
    }

    /// Append a block.
    pub fn push(&mut self, block: ParamBlock) {
        self.blocks.push(block);
    }

    /// Number of blocks.
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the set holds no blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Total number of scalar parameters across all blocks.
    pub fn num_params(&self) -> usize {
        self.blocks.iter().map(|b| b.values.len()).sum()
    }

    /// Iterate over blocks in order.
    pub fn blocks(&self) -> impl Iterator<Item = &ParamBlock> {
        self.blocks.iter()
    }

    /// Look up a block by name.
    pub fn block(&self, name: &str) -> Option<&ParamBlock> {
        self.blocks.iter().find(|b| b.name == name)
    }

    /// Values of a named block, if present.
    pub fn values(&self, name: &str) -> Option<&[f32]> {
        self.block(name).map(|b| b.values())
    }

    /// Bulk-assign every block of `src` into `self`.
    ///
    /// Shape-checked up front: nothing is written unless every block pair
    /// matches by position, name and length.
    pub fn assign_from(&mut self, src: &ParamSet) -> Result<(), StoreError> {
        if self.blocks.len() != src.blocks.len() {
            return Err(StoreError::BlockMismatch {
                expected: self.blocks.len(),
                got: src.blocks.len(),
            });
        }
        for (dst, s) in self.blocks.iter().zip(src.blocks.iter()) {
            if dst.name != s.name || dst.values.len() != s.values.len() {
                return Err(StoreError::ShapeMismatch {
                    name: dst.name.clone(),
                    expected: dst.values.len(),
                    got: s.values.len(),
                });
            }
        }
        for (dst, s) in self.blocks.iter_mut().zip(src.blocks.iter()) {
            dst.values.copy_from_slice(&s.values);
        }
        Ok(())
    }

    /// Apply `f` to every value in the given subset, leaving blocks
    /// outside the subset untouched.
    pub fn for_each_in_subset<F>(&mut self, subset: ParamSubset, mut f: F)
    where
        F: FnMut(&mut f32),
    {
        for block in self.blocks.iter_mut() {
            if subset.contains(block.group) {
                for v in block.values.iter_mut() {
                    f(v);
                }
            }
        }
    }
}

/// Thread-safe shared parameter set (the `global` role).
///
/// No ordering is provided between workers' writes: concurrent outer
/// updates interleave at the granularity of the write lock.
pub type SharedParams = Arc<RwLock<ParamSet>>;

/// Create a new shared parameter set.
pub fn shared_params(set: ParamSet) -> SharedParams {
    Arc::new(RwLock::new(set))
}
