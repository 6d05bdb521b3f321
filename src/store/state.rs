// Pure bookkeeping behind `EntityStore`: no locking, no publishing, no I/O.
//
// The published collection is always `confirmed` with every unsettled
// operation replayed on top, in ticket order. Settling an operation folds
// its authoritative result into `confirmed` (or drops it on failure) and the
// view is recomputed, so a rollback only ever removes the failed operation's
// own effect.

use crate::core::{Entity, Snapshot};
use im::Vector;
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Clone)]
pub(crate) enum PendingOp<E: Entity> {
    Create { temp_id: String, provisional: E },
    Update { id: String, patch: E::Patch },
    Delete { id: String },
}

impl<E: Entity> PendingOp<E> {
    /// Existing entity the operation needs, if any.
    fn target_id(&self) -> Option<&str> {
        match self {
            Self::Create { .. } => None,
            Self::Update { id, .. } | Self::Delete { id } => Some(id.as_str()),
        }
    }

    fn replay(&self, items: &mut Vector<E>) {
        match self {
            Self::Create {
                temp_id,
                provisional,
            } => {
                if position(items, temp_id).is_none() {
                    items.push_back(provisional.clone());
                }
            }
            Self::Update { id, patch } => {
                if let Some(index) = position(items, id) {
                    let mut merged = items[index].clone();
                    merged.apply_patch(patch);
                    items.set(index, merged);
                }
            }
            Self::Delete { id } => {
                if let Some(index) = position(items, id) {
                    items.remove(index);
                }
            }
        }
    }
}

/// Authoritative outcome of a ticket.
#[derive(Debug)]
pub(crate) enum Settlement<E> {
    Created(E),
    Updated(E),
    Deleted(String),
    Loaded(Vec<E>),
    /// The remote call failed; the operation leaves no trace.
    Failed,
}

#[derive(Debug)]
pub(crate) struct StoreState<E: Entity> {
    confirmed: Vector<E>,
    pending: BTreeMap<u64, PendingOp<E>>,
    next_ticket: u64,
    version: u64,
    in_flight: usize,
    loading: bool,
}

impl<E: Entity> StoreState<E> {
    pub(crate) fn new() -> Self {
        Self {
            confirmed: Vector::new(),
            pending: BTreeMap::new(),
            next_ticket: 0,
            version: 0,
            in_flight: 0,
            loading: false,
        }
    }

    /// Confirmed collection with all unsettled operations applied.
    pub(crate) fn view(&self) -> Vector<E> {
        let mut items = self.confirmed.clone();
        for op in self.pending.values() {
            op.replay(&mut items);
        }
        items
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        position(&self.view(), id).is_some()
    }

    /// True if `id` is the placeholder of an unsettled create.
    pub(crate) fn is_provisional(&self, id: &str) -> bool {
        self.pending.values().any(|op| {
            matches!(op, PendingOp::Create { temp_id, .. } if temp_id.as_str() == id)
        })
    }

    pub(crate) fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    pub(crate) fn load_in_flight(&self) -> bool {
        self.loading
    }

    pub(crate) fn pending_mutations(&self) -> usize {
        self.pending.len()
    }

    /// Registers a mutation and returns its ticket.
    ///
    /// Returns `None` when the operation targets an id that is not in the
    /// current view; nothing is registered in that case.
    pub(crate) fn begin_mutation(&mut self, op: PendingOp<E>) -> Option<u64> {
        if let Some(target) = op.target_id() {
            if !self.contains(target) {
                return None;
            }
        }
        let ticket = self.issue_ticket();
        self.pending.insert(ticket, op);
        Some(ticket)
    }

    /// Registers a bulk load. Callers check `load_in_flight` first; only one
    /// load is ever unsettled.
    pub(crate) fn begin_load(&mut self) -> u64 {
        debug_assert!(!self.loading, "a load is already in flight");
        self.loading = true;
        self.issue_ticket()
    }

    pub(crate) fn settle(&mut self, ticket: u64, settlement: Settlement<E>) {
        let op = self.pending.remove(&ticket);
        if op.is_none() {
            self.loading = false;
        }
        self.in_flight = self.in_flight.saturating_sub(1);

        match settlement {
            Settlement::Created(entity) | Settlement::Updated(entity) => {
                let is_create = matches!(op, Some(PendingOp::Create { .. }));
                match position(&self.confirmed, entity.id()) {
                    Some(index) => {
                        self.confirmed.set(index, entity);
                    }
                    None if is_create => self.confirmed.push_back(entity),
                    None => {
                        warn!(
                            id = %entity.id(),
                            "updated entity is no longer in the confirmed collection"
                        );
                    }
                }
            }
            Settlement::Deleted(id) => {
                if let Some(index) = position(&self.confirmed, &id) {
                    self.confirmed.remove(index);
                }
            }
            Settlement::Loaded(items) => {
                self.confirmed = dedup_by_id(items);
            }
            Settlement::Failed => {}
        }
    }

    /// Builds the next snapshot to publish.
    pub(crate) fn next_snapshot(&mut self) -> Snapshot<E> {
        self.version += 1;
        Snapshot::new(self.version, self.view())
    }

    fn issue_ticket(&mut self) -> u64 {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.in_flight += 1;
        ticket
    }
}

fn position<E: Entity>(items: &Vector<E>, id: &str) -> Option<usize> {
    items.iter().position(|item| item.id() == id)
}

fn dedup_by_id<E: Entity>(items: Vec<E>) -> Vector<E> {
    let mut unique = Vector::new();
    for item in items {
        if position(&unique, item.id()).is_some() {
            warn!(id = %item.id(), "dropping duplicate id returned by the server");
            continue;
        }
        unique.push_back(item);
    }
    unique
}
