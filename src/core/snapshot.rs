use super::entity::Entity;
use im::Vector;

/// Immutable view of a collection at one point in time.
///
/// Backed by a persistent vector, so cloning a snapshot or deriving the next
/// one from it shares structure instead of copying every entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<E: Clone> {
    version: u64,
    items: Vector<E>,
}

impl<E: Clone> Snapshot<E> {
    pub fn empty() -> Self {
        Self {
            version: 0,
            items: Vector::new(),
        }
    }

    pub(crate) fn new(version: u64, items: Vector<E>) -> Self {
        Self { version, items }
    }

    /// Publish counter; strictly increases with every published snapshot.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn items(&self) -> &Vector<E> {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> im::vector::Iter<'_, E> {
        self.items.iter()
    }

    pub fn to_vec(&self) -> Vec<E> {
        self.items.iter().cloned().collect()
    }
}

impl<E: Entity> Snapshot<E> {
    pub fn get(&self, id: &str) -> Option<&E> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.id()).collect()
    }
}

impl<E: Clone> Default for Snapshot<E> {
    fn default() -> Self {
        Self::empty()
    }
}
