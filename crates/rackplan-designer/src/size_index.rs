//! Unique size indexing.
//!
//! Every structurally distinct rack (or column) configuration gets a small
//! positive index shared by all shapes with the same signature. Indices are
//! reference counted; a freed index is handed out again before a new one is
//! allocated.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// One distinct configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeEntry<S> {
    pub index: usize,
    pub signature: S,
    pub refs: usize,
}

/// Reference counted table of signatures, kept sorted by index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeIndexTable<S> {
    entries: Vec<SizeEntry<S>>,
}

impl<S> Default for SizeIndexTable<S> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<S: Clone + PartialEq> SizeIndexTable<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[SizeEntry<S>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SizeEntry<S>> {
        self.entries.iter().find(|e| e.index == index)
    }

    pub fn index_of(&self, signature: &S) -> Option<usize> {
        self.entries
            .iter()
            .find(|e| e.signature == *signature)
            .map(|e| e.index)
    }

    /// True when `index` exists and holds `signature`.
    pub fn resolves(&self, index: usize, signature: &S) -> bool {
        self.get(index).is_some_and(|e| e.signature == *signature)
    }

    fn smallest_free_index(&self) -> usize {
        // Entries are sorted by index, so the first hole is the answer.
        let mut candidate = 1;
        for entry in &self.entries {
            if entry.index != candidate {
                break;
            }
            candidate += 1;
        }
        candidate
    }

    /// Returns the index for `signature`, adding a reference. Reuses an
    /// existing entry (even one that dropped to zero references during a
    /// batch) before allocating the smallest free index.
    pub fn acquire(&mut self, signature: S) -> usize {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.signature == signature) {
            entry.refs += 1;
            return entry.index;
        }
        let index = self.smallest_free_index();
        let position = self
            .entries
            .iter()
            .position(|e| e.index > index)
            .unwrap_or(self.entries.len());
        self.entries.insert(
            position,
            SizeEntry {
                index,
                signature,
                refs: 1,
            },
        );
        index
    }

    /// Drops one reference; the entry disappears with its last reference.
    /// Returns false for an unknown index.
    pub fn release(&mut self, index: usize) -> bool {
        if !self.decrement(index) {
            return false;
        }
        self.collect_garbage();
        true
    }

    fn decrement(&mut self, index: usize) -> bool {
        match self.entries.iter_mut().find(|e| e.index == index) {
            Some(entry) => {
                entry.refs = entry.refs.saturating_sub(1);
                true
            }
            None => false,
        }
    }

    fn collect_garbage(&mut self) {
        self.entries.retain(|e| e.refs > 0);
    }

    /// Re-indexes a batch of changed shapes.
    ///
    /// Each item is the shape's current index (if any) and its new signature.
    /// All old references are dropped first, then every shape re-acquires, so
    /// a shape keeping its configuration keeps its index and a configuration
    /// shared within the batch never gets two indices. Entries left without
    /// references are removed at the end. Returns the new indices in batch
    /// order plus the stale indices that no longer existed.
    pub fn recalc(&mut self, batch: Vec<(Option<usize>, S)>) -> (Vec<usize>, Vec<usize>) {
        let mut stale = Vec::new();
        let mut signatures = Vec::with_capacity(batch.len());
        for (old, signature) in batch {
            if let Some(index) = old {
                if !self.decrement(index) {
                    stale.push(index);
                }
            }
            signatures.push(signature);
        }

        // Signatures already in the table revive their entry first, then the
        // emptied entries are dropped so new signatures can take their index.
        let mut indices: Vec<Option<usize>> = signatures
            .iter()
            .map(|signature| {
                self.index_of(signature)
                    .map(|_| self.acquire(signature.clone()))
            })
            .collect();
        self.collect_garbage();
        for (slot, signature) in indices.iter_mut().zip(signatures) {
            if slot.is_none() {
                *slot = Some(self.acquire(signature));
            }
        }
        (indices.into_iter().flatten().collect(), stale)
    }

    /// Rebuilds reference counts from the indices actually in use, e.g. after
    /// loading a document. Entries nobody references are dropped.
    pub fn reconcile<I>(&mut self, live: I)
    where
        I: IntoIterator<Item = usize>,
    {
        for entry in &mut self.entries {
            entry.refs = 0;
        }
        let mut unknown = HashSet::new();
        for index in live {
            match self.entries.iter_mut().find(|e| e.index == index) {
                Some(entry) => entry.refs += 1,
                None => {
                    unknown.insert(index);
                }
            }
        }
        if !unknown.is_empty() {
            tracing::debug!("{} unknown size indices left for re-acquisition", unknown.len());
        }
        self.collect_garbage();
    }

    /// Replaces the table contents, sorting and dropping duplicate indices.
    pub fn from_entries(mut entries: Vec<SizeEntry<S>>) -> Self {
        entries.sort_by_key(|e| e.index);
        entries.dedup_by_key(|e| e.index);
        entries.retain(|e| e.index > 0);
        Self { entries }
    }
}
