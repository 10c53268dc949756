use slotmap::SecondaryMap;

use crate::dom::NodeId;

/// Records keyed by element identity, iterated in insertion order.
///
/// Entries are never dropped implicitly: callers purge them on removal
/// mutations or clear the whole cache on navigation.
#[derive(Debug, Clone)]
pub struct ElementCache<V> {
    order: Vec<NodeId>,
    entries: SecondaryMap<NodeId, V>,
}

impl<V> Default for ElementCache<V> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            entries: SecondaryMap::new(),
        }
    }
}

impl<V> ElementCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: NodeId) -> Option<&V> {
        self.entries.get(id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut V> {
        self.entries.get_mut(id)
    }

    /// Inserts or replaces. A replaced entry keeps its position.
    pub fn insert(&mut self, id: NodeId, value: V) {
        if self.entries.insert(id, value).is_none() {
            self.order.push(id);
        }
    }

    pub fn remove(&mut self, id: NodeId) -> Option<V> {
        let removed = self.entries.remove(id)?;
        self.order.retain(|&key| key != id);
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.entries.clear();
    }

    pub fn keys(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.order.iter().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &V)> + '_ {
        self.order
            .iter()
            .filter_map(|&id| self.entries.get(id).map(|value| (id, value)))
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, value)| value)
    }

    /// Stable sort of the iteration order by a key derived from each entry.
    pub fn sort_by_key<K, F>(&mut self, mut key: F)
    where
        K: Ord,
        F: FnMut(&V) -> K,
    {
        let entries = &self.entries;
        self.order.sort_by_key(|&id| entries.get(id).map(&mut key));
    }
}
