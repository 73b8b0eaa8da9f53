use std::collections::HashSet;

use crate::error::FetchError;
use crate::model::Entry;
use crate::store::EntrySink;

pub mod catalog;
pub mod gw2;

pub use catalog::{Area, Floor, LoadOutcome};

/// Remote side of the catalog walk: one call per continent, one per floor.
pub trait CatalogFetcher {
    fn area(&self, area_id: u32) -> Result<Area, FetchError>;
    fn floor(&self, area_id: u32, floor_id: i32) -> Result<Floor, FetchError>;
}

/// Messages sent from the loader thread to the UI thread.
#[derive(Debug)]
pub enum LoadEvent {
    Entries(Vec<Entry>),
    Finished(LoadOutcome),
}

/// Sink used on the loader thread: remembers accepted ids and hands each
/// floor's newly accepted entries to `forward` as one batch.
pub struct ForwardingSink<F: FnMut(Vec<Entry>)> {
    seen: HashSet<u32>,
    pending: Vec<Entry>,
    forward: F,
}

impl<F: FnMut(Vec<Entry>)> ForwardingSink<F> {
    pub fn new(forward: F) -> Self {
        Self {
            seen: HashSet::new(),
            pending: Vec::new(),
            forward,
        }
    }
}

impl<F: FnMut(Vec<Entry>)> EntrySink for ForwardingSink<F> {
    fn try_add(&mut self, entry: Entry) -> bool {
        if !self.seen.insert(entry.id) {
            return false;
        }
        self.pending.push(entry);
        true
    }

    fn flush(&mut self) {
        if !self.pending.is_empty() {
            (self.forward)(std::mem::take(&mut self.pending));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwards_one_batch_per_flush_without_duplicates() {
        let mut batches: Vec<Vec<u32>> = Vec::new();
        {
            let mut sink = ForwardingSink::new(|batch: Vec<Entry>| {
                batches.push(batch.iter().map(|e| e.id).collect());
            });
            assert!(sink.try_add(Entry::new(1, Some("a".into()), None)));
            assert!(sink.try_add(Entry::new(2, Some("b".into()), None)));
            sink.flush();
            assert!(!sink.try_add(Entry::new(1, Some("a".into()), None)));
            sink.flush();
            assert!(sink.try_add(Entry::new(3, Some("c".into()), None)));
            sink.flush();
        }

        assert_eq!(batches, vec![vec![1, 2], vec![3]]);
    }
}
