//! Contacts ordered by normalized cost.
//!
//! A binary min-heap with lazy deletion: removing or re-costing a contact only
//! updates the `live` table, and heap entries whose version no longer matches
//! are discarded when they reach the top. The top of the heap is always live
//! (stale entries are pruned after every mutation), so peeking needs no
//! mutation.
//!
//! Equal costs are ordered by ascending contact id.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use hashbrown::HashMap;

use crate::types::ContactId;

/// A heap entry; stale once `version` differs from the live table.
#[derive(Debug, Clone, Copy)]
struct Entry {
    cost: f64,
    id: ContactId,
    version: u64,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the max-heap pops the lowest cost, then the lowest id.
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.id.cmp(&self.id))
            .then_with(|| other.version.cmp(&self.version))
    }
}

#[derive(Debug, Clone, Copy)]
struct Live {
    cost: f64,
    version: u64,
}

/// Priority structure over live contacts.
#[derive(Debug, Default)]
pub struct ContactQueue {
    heap: BinaryHeap<Entry>,
    live: HashMap<ContactId, Live>,
    next_version: u64,
}

impl ContactQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a queue from `(contact, normalized cost)` pairs.
    pub fn from_contacts(contacts: impl IntoIterator<Item = (ContactId, f64)>) -> Self {
        let mut queue = Self::new();
        for (id, cost) in contacts {
            queue.insert(id, cost);
        }
        queue
    }

    /// Number of live contacts.
    #[inline]
    pub fn len(&self) -> usize {
        self.live.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn contains(&self, id: ContactId) -> bool {
        self.live.contains_key(&id)
    }

    /// Current cost of a queued contact.
    pub fn cost(&self, id: ContactId) -> Option<f64> {
        self.live.get(&id).map(|live| live.cost)
    }

    /// Insert a contact, replacing its previous position if already queued.
    pub fn insert(&mut self, id: ContactId, cost: f64) {
        let version = self.next_version;
        self.next_version += 1;
        self.live.insert(id, Live { cost, version });
        self.heap.push(Entry { cost, id, version });
        self.prune();
    }

    /// Remove a contact. Returns whether it was queued.
    pub fn remove(&mut self, id: ContactId) -> bool {
        let removed = self.live.remove(&id).is_some();
        if removed {
            self.prune();
        }
        removed
    }

    /// Move a contact to the position of its new cost.
    pub fn update_and_reinsert(&mut self, id: ContactId, cost: f64) {
        self.remove(id);
        self.insert(id, cost);
    }

    /// The lowest-cost live contact.
    pub fn peek_lowest(&self) -> Option<(ContactId, f64)> {
        self.heap.peek().map(|entry| (entry.id, entry.cost))
    }

    /// Remove and return the lowest-cost live contact.
    pub fn pop_lowest(&mut self) -> Option<(ContactId, f64)> {
        let entry = self.heap.pop()?;
        self.live.remove(&entry.id);
        self.prune();
        Some((entry.id, entry.cost))
    }

    /// Live contacts in ascending order of cost, then id.
    pub fn sorted(&self) -> Vec<(ContactId, f64)> {
        let mut contacts: Vec<_> = self.live.iter().map(|(&id, live)| (id, live.cost)).collect();
        contacts.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        contacts
    }

    fn is_stale(&self, entry: &Entry) -> bool {
        self.live
            .get(&entry.id)
            .is_none_or(|live| live.version != entry.version)
    }

    /// Drop stale entries from the top, and rebuild the heap once tombstones
    /// outnumber live entries.
    fn prune(&mut self) {
        if self.heap.len() > 2 * self.live.len() + 64 {
            self.heap = self
                .live
                .iter()
                .map(|(&id, live)| Entry {
                    cost: live.cost,
                    id,
                    version: live.version,
                })
                .collect();
        }
        while let Some(top) = self.heap.peek() {
            if !self.is_stale(top) {
                break;
            }
            self.heap.pop();
        }
    }
}
