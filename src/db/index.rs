//! Primary-key indexes mapping a [`RowId`] to a row's position in the
//! backing file. Two implementations trade insertion flexibility for erase
//! behavior: [`LinearIndex`] requires strictly increasing keys but can
//! erase without touching array positions; [`MapIndex`] accepts any order
//! but always physically removes on erase.

use std::collections::BTreeMap;

use crate::db::key::RowId;

/// Common interface [`crate::db::table::Table`] drives both index
/// implementations through.
pub trait PrimaryIndex: Default {
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn clear(&mut self);
    fn reserve(&mut self, additional: usize);

    /// The row position for `key`, if present and not id-ambiguous.
    fn find(&self, key: RowId) -> Option<i64>;

    /// Insert `key` at row position `val`. Fails (returns `false`) if `val`
    /// isn't the next expected position or `key` already has an entry.
    fn insert(&mut self, key: RowId, val: i64) -> bool;

    /// Drop the index entry for `key`. [`LinearIndex`] keeps the array slot
    /// (tombstoning the stored key in place) unless `key` is the last
    /// entry; [`MapIndex`] always removes it outright.
    fn erase(&mut self, key: RowId);
}

/// A monotone array-backed index: entries are pushed in strictly increasing
/// key order, looked up by binary search.
#[derive(Debug, Clone, Default)]
pub struct LinearIndex {
    rows: Vec<RowId>,
    last_key: RowId,
}

impl LinearIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn lower_bound_pos(&self, key: RowId) -> usize {
        let target = key.lower();
        self.rows.partition_point(|r| *r < target)
    }

    pub fn lower_bound(&self, key: RowId) -> usize {
        self.lower_bound_pos(key)
    }

    pub fn upper_bound(&self, key: RowId) -> usize {
        self.lower_bound_pos(key.next())
    }
}

impl PrimaryIndex for LinearIndex {
    fn len(&self) -> usize {
        self.rows.len()
    }

    fn clear(&mut self) {
        self.rows.clear();
        self.last_key = RowId::default();
    }

    fn reserve(&mut self, additional: usize) {
        self.rows.reserve(additional);
    }

    fn find(&self, key: RowId) -> Option<i64> {
        let pos = self.lower_bound_pos(key);
        if pos < self.rows.len() && self.rows[pos] == key { Some(pos as i64) } else { None }
    }

    fn insert(&mut self, key: RowId, val: i64) -> bool {
        if val as usize == self.rows.len() && self.last_key < key {
            self.rows.push(key);
            self.last_key = key.upper();
            true
        } else {
            false
        }
    }

    fn erase(&mut self, key: RowId) {
        let Some(pos) = self.find(key) else { return };
        let pos = pos as usize;
        if pos + 1 != self.rows.len() {
            self.rows[pos].erase();
        } else {
            self.rows.pop();
            self.last_key = self.rows.last().copied().unwrap_or_default();
        }
    }
}

/// A balanced-tree-backed index: any insertion order, true physical removal
/// on erase.
#[derive(Debug, Clone)]
pub struct MapIndex {
    map: BTreeMap<RowId, i64>,
    last_value: i64,
}

impl Default for MapIndex {
    fn default() -> Self {
        Self { map: BTreeMap::new(), last_value: -1 }
    }
}

impl MapIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn lower_bound(&self, key: RowId) -> Option<(RowId, i64)> {
        self.map.range(key.lower()..).next().map(|(&k, &v)| (k, v))
    }
}

impl PrimaryIndex for MapIndex {
    fn len(&self) -> usize {
        self.map.len()
    }

    fn clear(&mut self) {
        self.map.clear();
        self.last_value = -1;
    }

    fn reserve(&mut self, _additional: usize) {}

    fn find(&self, key: RowId) -> Option<i64> {
        self.lower_bound(key).filter(|(k, _)| *k == key).map(|(_, v)| v)
    }

    fn insert(&mut self, key: RowId, val: i64) -> bool {
        if self.last_value + 1 != val {
            return false;
        }
        if self.find(key).is_some() {
            return false;
        }
        self.map.insert(key, val);
        self.last_value = val;
        true
    }

    fn erase(&mut self, key: RowId) {
        let Some((stored_key, val)) = self.lower_bound(key) else { return };
        if stored_key != key {
            return;
        }
        self.map.remove(&stored_key);
        if val == self.last_value {
            self.last_value -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::time::NanoTime;

    fn key_at(nanos: i64) -> RowId {
        let mut k = RowId::from_time(NanoTime(nanos));
        k.commit();
        k
    }

    #[test]
    fn linear_index_rejects_out_of_order_insert() {
        let mut idx = LinearIndex::new();
        let a = key_at(100);
        let b = key_at(50);
        assert!(idx.insert(a, 0));
        assert!(!idx.insert(b, 1), "b sorts before a, must be rejected");
    }

    #[test]
    fn linear_index_nonterminal_erase_keeps_slot() {
        let mut idx = LinearIndex::new();
        let a = key_at(10);
        let b = key_at(20);
        idx.insert(a, 0);
        idx.insert(b, 1);
        idx.erase(a);
        assert_eq!(idx.len(), 2, "erasing a non-terminal row keeps the array slot");
        assert!(idx.find(a).is_none());
        assert!(idx.find(b).is_some());
    }

    #[test]
    fn linear_index_terminal_erase_shrinks() {
        let mut idx = LinearIndex::new();
        let a = key_at(10);
        let b = key_at(20);
        idx.insert(a, 0);
        idx.insert(b, 1);
        idx.erase(b);
        assert_eq!(idx.len(), 1);
    }

    #[test]
    fn map_index_allows_any_order_but_requires_sequential_val() {
        let mut idx = MapIndex::new();
        let a = key_at(100);
        let b = key_at(50);
        assert!(idx.insert(a, 0));
        assert!(idx.insert(b, 1), "map index has no key-order constraint");
        assert_eq!(idx.len(), 2);
    }

    #[test]
    fn map_index_erase_is_physical() {
        let mut idx = MapIndex::new();
        let a = key_at(10);
        idx.insert(a, 0);
        idx.erase(a);
        assert_eq!(idx.len(), 0);
    }
}
