//! Parameter snapshots and the three-way synchronization protocol.

pub mod store;
pub mod sync;

pub use store::{
    shared_params, ParamBlock, ParamGroup, ParamSet, ParamSubset, SharedParams, StoreError,
};
pub use sync::{SyncProtocol, UpdateTarget};
