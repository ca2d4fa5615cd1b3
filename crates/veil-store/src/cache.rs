//! Reveal cache: region id to revealed content, for the current session.
//!
//! Entries are write-once. Putting content for a region that is already
//! revealed is a no-op, not an error.

use std::collections::HashMap;

use veil_core::{RegionId, RevealedContent};

/// Result of putting content into the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutResult {
    /// Content was stored.
    Inserted,
    /// The region was already revealed; existing content kept.
    AlreadyRevealed,
}

/// Revealed content for the current session.
///
/// The owner clears it exactly once per session load, before any reveal for
/// the new session can start.
#[derive(Debug, Default)]
pub struct RevealCache {
    entries: HashMap<RegionId, RevealedContent>,
}

impl RevealCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, id: &RegionId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &RegionId) -> Option<&RevealedContent> {
        self.entries.get(id)
    }

    /// Store content for `id` unless it is already revealed.
    pub fn put(&mut self, id: RegionId, content: RevealedContent) -> PutResult {
        use std::collections::hash_map::Entry;

        match self.entries.entry(id) {
            Entry::Occupied(_) => PutResult::AlreadyRevealed,
            Entry::Vacant(slot) => {
                slot.insert(content);
                PutResult::Inserted
            }
        }
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Revealed region ids, in no particular order.
    pub fn region_ids(&self) -> impl Iterator<Item = &RegionId> {
        self.entries.keys()
    }
}
