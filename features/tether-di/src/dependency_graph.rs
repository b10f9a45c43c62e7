use std::collections::{BTreeSet, HashMap};

use crate::key::Key;

/// Graph of every registered value and who depends on whom
///
/// Two indexes are kept in sync so both directions are a single lookup:
/// `dependencies[a]` contains `b` iff `dependents[b]` contains `a`.
/// Edges are only recorded between registered keys.
pub struct DependencyGraph<V> {
    values: HashMap<Key, DependencyGraphEntry<V>>,
    /// Keys a key depends on
    dependencies: HashMap<Key, BTreeSet<Key>>,
    /// Keys depending on a key
    dependents: HashMap<Key, BTreeSet<Key>>,
    sequence: u64,
}

struct DependencyGraphEntry<V> {
    value: V,
    registered: u64,
}

impl<V> Default for DependencyGraph<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> DependencyGraph<V> {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
            dependencies: HashMap::new(),
            dependents: HashMap::new(),
            sequence: 0,
        }
    }

    /// Inserts or overwrites the value for `key`, edges are left untouched
    ///
    /// Returns the previous value
    pub fn add(&mut self, key: Key, value: V) -> Option<V> {
        self.sequence += 1;
        let entry = DependencyGraphEntry {
            value,
            registered: self.sequence,
        };

        self.values.insert(key, entry).map(|previous| previous.value)
    }

    pub fn get(&self, key: &Key) -> Option<&V> {
        self.values.get(key).map(|entry| &entry.value)
    }

    pub fn lookup(&self, key: &Key) -> Option<(&Key, &V)> {
        self.values
            .get_key_value(key)
            .map(|(key, entry)| (key, &entry.value))
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.values.contains_key(key)
    }

    /// Returns the most recently registered value matching `predicate`
    pub fn find(&self, predicate: impl Fn(&Key, &V) -> bool) -> Option<(&Key, &V)> {
        self.values
            .iter()
            .filter(|(key, entry)| predicate(key, &entry.value))
            .max_by_key(|(_, entry)| entry.registered)
            .map(|(key, entry)| (key, &entry.value))
    }

    /// Records `key -> dependency` for every registered dependency
    pub fn add_dependencies<'a>(&mut self, key: &Key, dependencies: impl IntoIterator<Item = &'a Key>) {
        if !self.values.contains_key(key) {
            return;
        }

        for dependency in dependencies {
            if !self.values.contains_key(dependency) {
                continue;
            }

            let added = self
                .dependencies
                .entry(key.clone())
                .or_default()
                .insert(dependency.clone());
            self.dependents
                .entry(dependency.clone())
                .or_default()
                .insert(key.clone());

            if added {
                tracing::trace!("Recorded dependency {key} -> {dependency}");
            }
        }
    }

    /// Drops every edge leaving `key`, edges pointing at `key` stay
    pub fn remove_dependencies(&mut self, key: &Key) {
        for dependents in self.dependents.values_mut() {
            dependents.remove(key);
        }
        self.dependents.retain(|_, dependents| !dependents.is_empty());
        self.dependencies.remove(key);
    }

    /// Keys `key` depends on
    pub fn dependencies(&self, key: &Key) -> Vec<Key> {
        self.dependencies
            .get(key)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Keys depending on `key`
    pub fn dependents(&self, key: &Key) -> Vec<Key> {
        self.dependents
            .get(key)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Removes the value and every edge touching it
    pub fn remove(&mut self, key: &Key) -> Option<V> {
        for dependents in self.dependents.values_mut() {
            dependents.remove(key);
        }
        for dependencies in self.dependencies.values_mut() {
            dependencies.remove(key);
        }
        self.dependents.remove(key);
        self.dependencies.remove(key);
        self.dependents.retain(|_, keys| !keys.is_empty());
        self.dependencies.retain(|_, keys| !keys.is_empty());

        self.values.remove(key).map(|entry| entry.value)
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.values.keys()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::DependencyGraph;
    use crate::key::Key;

    fn keys(names: &[&str]) -> Vec<Key> {
        names.iter().map(|name| Key::from(*name)).collect()
    }

    fn graph_of(names: &[&str]) -> DependencyGraph<usize> {
        let mut graph = DependencyGraph::new();
        for (i, name) in names.iter().enumerate() {
            graph.add(Key::from(*name), i);
        }
        graph
    }

    #[test]
    fn it_adds_and_gets() {
        let mut graph = DependencyGraph::new();

        graph.add(Key::from("123"), 123);

        assert_eq!(graph.get(&Key::from("123")), Some(&123));
        assert_eq!(graph.get(&Key::from("456")), None);
    }

    #[test]
    fn it_overwrites_values_but_keeps_edges() {
        let mut graph = graph_of(&["a", "b"]);
        graph.add_dependencies(&Key::from("a"), &keys(&["b"]));

        let previous = graph.add(Key::from("a"), 10);

        assert_eq!(previous, Some(0));
        assert_eq!(graph.get(&Key::from("a")), Some(&10));
        assert_eq!(graph.dependencies(&Key::from("a")), keys(&["b"]));
    }

    #[test]
    fn it_tolerates_circular_dependencies() {
        let mut graph = graph_of(&["1", "2", "3"]);
        graph.add_dependencies(&Key::from("1"), &keys(&["2", "3"]));
        graph.add_dependencies(&Key::from("2"), &keys(&["3"]));

        graph.add_dependencies(&Key::from("3"), &keys(&["1"]));

        assert_eq!(graph.dependencies(&Key::from("1")), keys(&["2", "3"]));
        assert_eq!(graph.dependencies(&Key::from("2")), keys(&["3"]));
        assert_eq!(graph.dependencies(&Key::from("3")), keys(&["1"]));

        assert_eq!(graph.dependents(&Key::from("1")), keys(&["3"]));
        assert_eq!(graph.dependents(&Key::from("2")), keys(&["1"]));
        assert_eq!(graph.dependents(&Key::from("3")), keys(&["1", "2"]));
    }

    #[test]
    fn it_drops_edges_to_unregistered_keys() {
        let mut graph = graph_of(&["a"]);

        graph.add_dependencies(&Key::from("a"), &keys(&["missing"]));
        graph.add_dependencies(&Key::from("missing"), &keys(&["a"]));

        assert!(graph.dependencies(&Key::from("a")).is_empty());
        assert!(graph.dependents(&Key::from("a")).is_empty());
        assert!(graph.dependents(&Key::from("missing")).is_empty());
    }

    #[test]
    fn it_does_not_duplicate_edges() {
        let mut graph = graph_of(&["a", "b"]);

        graph.add_dependencies(&Key::from("a"), &keys(&["b", "b"]));
        graph.add_dependencies(&Key::from("a"), &keys(&["b"]));

        assert_eq!(graph.dependencies(&Key::from("a")), keys(&["b"]));
        assert_eq!(graph.dependents(&Key::from("b")), keys(&["a"]));
    }

    #[test]
    fn it_removes_outgoing_edges_only() {
        let mut graph = graph_of(&["a", "b", "c"]);
        graph.add_dependencies(&Key::from("a"), &keys(&["b"]));
        graph.add_dependencies(&Key::from("c"), &keys(&["a"]));

        graph.remove_dependencies(&Key::from("a"));

        assert!(graph.dependencies(&Key::from("a")).is_empty());
        assert!(graph.dependents(&Key::from("b")).is_empty());
        assert_eq!(graph.dependents(&Key::from("a")), keys(&["c"]));
        assert_eq!(graph.dependencies(&Key::from("c")), keys(&["a"]));
    }

    #[test]
    fn it_removes_a_node_and_all_its_edges() {
        let mut graph = graph_of(&["a", "b", "c"]);
        graph.add_dependencies(&Key::from("a"), &keys(&["b"]));
        graph.add_dependencies(&Key::from("c"), &keys(&["a"]));

        let removed = graph.remove(&Key::from("a"));

        assert_eq!(removed, Some(0));
        assert!(!graph.contains(&Key::from("a")));
        assert!(graph.dependents(&Key::from("b")).is_empty());
        assert!(graph.dependencies(&Key::from("c")).is_empty());
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn find_prefers_the_most_recent_registration() {
        let mut graph = graph_of(&["a", "b", "c"]);

        let found = graph.find(|_, value| *value < 2).map(|(key, _)| key.clone());
        assert_eq!(found, Some(Key::from("b")));

        graph.add(Key::from("a"), 0);
        let found = graph.find(|_, value| *value < 2).map(|(key, _)| key.clone());
        assert_eq!(found, Some(Key::from("a")));

        assert!(graph.find(|_, value| *value > 10).is_none());
    }
}
