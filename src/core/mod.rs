pub mod entity;
pub mod error;
pub mod snapshot;

pub use entity::{DEFAULT_TEMP_ID_PREFIX, Entity, HasStatus, TempIdGenerator};
pub use error::{RemoteError, RemoteResult, Result, StoreError};
pub use snapshot::Snapshot;
