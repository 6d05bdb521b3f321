// ============================================================================
// taskstate Library
// ============================================================================
//
// Observable, optimistic client-side store for CRUD resources. One
// `EntityStore` owns the collection of one resource, publishes it through
// replay-latest observables and reconciles optimistic mutations with a
// `RemoteResource` backend.

pub mod core;
pub mod observable;
pub mod remote;
pub mod store;
pub mod task;

// Re-export main types for convenience
pub use crate::core::{Entity, HasStatus, RemoteError, Result, Snapshot, StoreError};
pub use observable::Observable;
pub use remote::{HttpRemote, HttpRemoteConfig, InMemoryRemote, RemoteOp, RemoteResource};
pub use store::{
    CollectionObservable, DerivedView, EntityStore, LoadOutcome, Pending, StoreConfig,
};
pub use task::{Task, TaskDraft, TaskPatch, TaskStatus};

/// Store of tasks, the resource this crate was built around.
pub type TaskStore = EntityStore<Task>;
