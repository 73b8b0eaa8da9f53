use std::collections::HashSet;

use crate::model::Entry;

/// Destination for entries produced by a catalog walk.
pub trait EntrySink {
    /// Adds `entry` unless one with the same id was already accepted.
    fn try_add(&mut self, entry: Entry) -> bool;

    /// Called after each floor has been walked.
    fn flush(&mut self) {}
}

/// Insertion-ordered set of entries keyed by id. First entry for an id wins.
#[derive(Debug, Default)]
pub struct EntryStore {
    entries: Vec<Entry>,
    ids: HashSet<u32>,
}

impl EntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_add(&mut self, entry: Entry) -> bool {
        if !self.ids.insert(entry.id) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn all(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.ids.clear();
    }
}

impl EntrySink for EntryStore {
    fn try_add(&mut self, entry: Entry) -> bool {
        EntryStore::try_add(self, entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u32, name: &str) -> Entry {
        Entry::new(id, Some(name.to_string()), Some(format!("[&{id}]")))
    }

    #[test]
    fn first_entry_for_an_id_wins() {
        let mut store = EntryStore::new();
        assert!(store.try_add(entry(7, "Lion's Arch")));
        assert!(!store.try_add(entry(7, "Lion's Arch (duplicate floor)")));

        assert_eq!(store.len(), 1);
        assert_eq!(store.all()[0].name.as_deref(), Some("Lion's Arch"));
    }

    #[test]
    fn keeps_insertion_order() {
        let mut store = EntryStore::new();
        for (id, name) in [(30, "c"), (10, "a"), (20, "b"), (10, "a again")] {
            store.try_add(entry(id, name));
        }

        let ids: Vec<u32> = store.all().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![30, 10, 20]);
    }

    #[test]
    fn at_most_one_entry_per_id_over_many_adds() {
        let mut store = EntryStore::new();
        for i in 0..5_000u32 {
            store.try_add(entry(i % 1_250, &format!("wp {i}")));
        }

        assert_eq!(store.len(), 1_250);
        let unique: HashSet<u32> = store.all().iter().map(|e| e.id).collect();
        assert_eq!(unique.len(), store.len());
        assert!(store.all().iter().all(|e| e.name.as_deref() == Some(format!("wp {}", e.id).as_str())));
    }

    #[test]
    fn clear_forgets_ids() {
        let mut store = EntryStore::new();
        store.try_add(entry(1, "Pact Encampment"));
        store.clear();

        assert!(store.is_empty());
        assert!(store.try_add(entry(1, "Pact Encampment")));
    }

    #[test]
    fn sink_impl_deduplicates() {
        let mut store = EntryStore::new();
        let sink: &mut dyn EntrySink = &mut store;
        assert!(sink.try_add(entry(3, "Mistlock")));
        assert!(!sink.try_add(entry(3, "Mistlock")));
        sink.flush();
        assert_eq!(store.len(), 1);
    }
}
