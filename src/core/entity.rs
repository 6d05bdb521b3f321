use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

pub const DEFAULT_TEMP_ID_PREFIX: &str = "tmp-";

/// A record held by an `EntityStore`.
///
/// The store never inspects entity fields directly; everything it needs goes
/// through this trait so the same store works for any CRUD resource.
pub trait Entity: Clone + Debug + PartialEq + Send + Sync + 'static {
    /// Fields of a not-yet-persisted entity (no id).
    type Draft: Clone + Debug + Send + Sync + 'static;
    /// Partial field changes for an existing entity.
    type Patch: Clone + Debug + Send + Sync + 'static;

    fn id(&self) -> &str;

    /// Builds the provisional entity shown while a create is in flight.
    fn provisional(id: String, draft: &Self::Draft) -> Self;

    /// Merges `patch` into `self`, the same way the backend would.
    fn apply_patch(&mut self, patch: &Self::Patch);

    /// Text fields matched by `EntityStore::search`.
    fn search_fields(&self) -> Vec<&str> {
        Vec::new()
    }
}

/// Entities that carry a workflow status, enabling the status views.
pub trait HasStatus {
    type Status: Clone + Debug + PartialEq + Send + Sync + 'static;

    fn status(&self) -> &Self::Status;
}

/// Produces placeholder ids for optimistic creates.
///
/// Ids look like `tmp-<seq>-<uuid>`. The prefix alone does not mark an id
/// as provisional; the store tracks which placeholders are still unsettled.
#[derive(Debug)]
pub struct TempIdGenerator {
    prefix: String,
    next: AtomicU64,
}

impl TempIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn next_id(&self) -> String {
        let seq = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}{}-{}", self.prefix, seq, Uuid::new_v4().simple())
    }
}

impl Default for TempIdGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_TEMP_ID_PREFIX)
    }
}
