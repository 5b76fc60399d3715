//! Binding, consumer and filter registries shared by the two passes
//!
//! Entries are only ever added. Iteration follows insertion order, so reports
//! are deterministic for a given input.

use crate::scanner::records::{ConsumerDetail, FilterDetail};
use indexmap::{IndexMap, IndexSet};
use std::hash::Hash;

/// Insertion-ordered, content-deduplicated detail records for one entity
pub type DetailSet<D> = IndexSet<D, ahash::RandomState>;

/// A FilterToConsumerBinding discovered in the binding pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// `<consumer name>-<filter name>`
    pub id: String,
    pub consumer_name: Vec<u8>,
    pub filter_name: Vec<u8>,
    /// Source offset of the window the binding was first seen in
    pub first_seen_offset: u64,
}

impl Binding {
    pub fn new(consumer_name: &[u8], filter_name: &[u8], first_seen_offset: u64) -> Self {
        Self {
            id: binding_id(consumer_name, filter_name),
            consumer_name: consumer_name.to_vec(),
            filter_name: filter_name.to_vec(),
            first_seen_offset,
        }
    }
}

/// Binding id for a consumer/filter name pair
pub fn binding_id(consumer_name: &[u8], filter_name: &[u8]) -> String {
    format!(
        "{}-{}",
        String::from_utf8_lossy(consumer_name),
        String::from_utf8_lossy(filter_name)
    )
}

/// Bindings keyed by id; the first sighting wins
#[derive(Debug, Clone, Default)]
pub struct BindingRegistry {
    bindings: IndexMap<String, Binding, ahash::RandomState>,
}

impl BindingRegistry {
    /// Register a binding. Returns false when the id is already known.
    pub fn insert(&mut self, binding: Binding) -> bool {
        if self.bindings.contains_key(&binding.id) {
            return false;
        }
        self.bindings.insert(binding.id.clone(), binding);
        true
    }

    pub fn get(&self, id: &str) -> Option<&Binding> {
        self.bindings.get(id)
    }

    /// Bindings in discovery order
    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.values()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Entity name to detail records
#[derive(Debug, Clone)]
pub struct EntityRegistry<D> {
    entries: IndexMap<Vec<u8>, DetailSet<D>, ahash::RandomState>,
}

impl<D> Default for EntityRegistry<D> {
    fn default() -> Self {
        Self {
            entries: IndexMap::default(),
        }
    }
}

impl<D: Hash + Eq> EntityRegistry<D> {
    /// Make sure `name` is known, with an empty detail set if it is new.
    /// Returns true when the name was added.
    pub fn ensure(&mut self, name: &[u8]) -> bool {
        if self.entries.contains_key(name) {
            return false;
        }
        self.entries.insert(name.to_vec(), DetailSet::default());
        true
    }

    pub fn contains(&self, name: &[u8]) -> bool {
        self.entries.contains_key(name)
    }

    pub fn details(&self, name: &[u8]) -> Option<&DetailSet<D>> {
        self.entries.get(name)
    }

    /// Known names in discovery order
    pub fn names(&self) -> impl Iterator<Item = &[u8]> {
        self.entries.keys().map(Vec::as_slice)
    }

    pub(crate) fn entries_mut(&mut self) -> impl Iterator<Item = (&[u8], &mut DetailSet<D>)> {
        self.entries.iter_mut().map(|(name, set)| (name.as_slice(), set))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub type ConsumerRegistry = EntityRegistry<ConsumerDetail>;
pub type FilterRegistry = EntityRegistry<FilterDetail>;

/// All state accumulated over a scan
#[derive(Debug, Clone, Default)]
pub struct Registries {
    pub bindings: BindingRegistry,
    pub consumers: ConsumerRegistry,
    pub filters: FilterRegistry,
}

impl Registries {
    /// Record a consumer/filter pair seen together with a binding marker.
    /// Returns true when the binding id is new.
    pub fn register_binding(
        &mut self,
        consumer_name: &[u8],
        filter_name: &[u8],
        offset: u64,
    ) -> bool {
        self.consumers.ensure(consumer_name);
        self.filters.ensure(filter_name);
        self.bindings.insert(Binding::new(consumer_name, filter_name, offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(name: &str, query: &str) -> FilterDetail {
        FilterDetail {
            name: name.as_bytes().to_vec(),
            query: query.as_bytes().to_vec(),
        }
    }

    fn add(registry: &mut FilterRegistry, name: &[u8], detail: FilterDetail) -> bool {
        registry
            .entries_mut()
            .find(|(known, _)| *known == name)
            .map(|(_, details)| details.insert(detail))
            .unwrap_or(false)
    }

    #[test]
    fn test_binding_id() {
        assert_eq!(binding_id(b"Updater", b"Trigger"), "Updater-Trigger");
    }

    #[test]
    fn test_first_binding_wins() {
        let mut registry = BindingRegistry::default();
        assert!(registry.insert(Binding::new(b"A", b"B", 10)));
        assert!(!registry.insert(Binding::new(b"A", b"B", 99)));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("A-B").unwrap().first_seen_offset, 10);
    }

    #[test]
    fn test_register_binding_seeds_entities() {
        let mut registries = Registries::default();
        assert!(registries.register_binding(b"C", b"F", 0));

        assert!(registries.consumers.contains(b"C"));
        assert!(registries.filters.contains(b"F"));
        assert!(registries.consumers.details(b"C").unwrap().is_empty());
    }

    #[test]
    fn test_ensure_keeps_existing_details() {
        let mut registry = FilterRegistry::default();
        registry.ensure(b"F");
        add(&mut registry, b"F", filter("F", "q"));

        assert!(!registry.ensure(b"F"));
        assert_eq!(registry.details(b"F").unwrap().len(), 1);
    }

    #[test]
    fn test_details_deduplicate_by_content_in_order() {
        let mut registry = FilterRegistry::default();
        registry.ensure(b"F");

        assert!(add(&mut registry, b"F", filter("F", "q1")));
        assert!(add(&mut registry, b"F", filter("F", "q2")));
        assert!(!add(&mut registry, b"F", filter("F", "q1")));

        let queries: Vec<_> = registry
            .details(b"F")
            .unwrap()
            .iter()
            .map(|d| d.query.clone())
            .collect();
        assert_eq!(queries, vec![b"q1".to_vec(), b"q2".to_vec()]);
    }

    #[test]
    fn test_names_in_discovery_order() {
        let mut registry = ConsumerRegistry::default();
        registry.ensure(b"z");
        registry.ensure(b"a");
        registry.ensure(b"z");

        let names: Vec<&[u8]> = registry.names().collect();
        assert_eq!(names, vec![&b"z"[..], &b"a"[..]]);
    }
}
