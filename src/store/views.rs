impl<E: Entity> EntityStore<E> {
    /// Entities matching `predicate`, recomputed from every snapshot.
    pub fn filtered<F>(&self, predicate: F) -> DerivedView<E, Vec<E>>
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        Observable::derived(
            &self.shared.collection,
            move |snapshot: &Snapshot<E>| {
                snapshot
                    .iter()
                    .filter(|entity| predicate(*entity))
                    .cloned()
                    .collect()
            },
        )
    }

    /// Number of entities in the collection.
    pub fn total_count(&self) -> DerivedView<E, usize> {
        Observable::derived(
            &self.shared.collection,
            |snapshot: &Snapshot<E>| snapshot.len(),
        )
    }

    /// Case-insensitive substring search over `Entity::search_fields`.
    ///
    /// A blank term matches everything.
    pub fn search(&self, term: &str) -> DerivedView<E, Vec<E>> {
        let needle = term.trim().to_lowercase();
        self.filtered(move |entity| matches_search(entity, &needle))
    }
}

impl<E> EntityStore<E>
where
    E: Entity + HasStatus,
{
    pub fn by_status(&self, status: E::Status) -> DerivedView<E, Vec<E>> {
        self.filtered(move |entity| *entity.status() == status)
    }

    pub fn count_by_status(&self, status: E::Status) -> DerivedView<E, usize> {
        Observable::derived(
            &self.shared.collection,
            move |snapshot: &Snapshot<E>| {
                snapshot
                    .iter()
                    .filter(|entity| *entity.status() == status)
                    .count()
            },
        )
    }
}

/// `needle` must already be trimmed and lowercased.
fn matches_search<E: Entity>(entity: &E, needle: &str) -> bool {
    needle.is_empty()
        || entity
            .search_fields()
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
}
