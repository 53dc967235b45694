// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Thread-safe unique-key index.
//!
//! Backs the store-level uniqueness constraints: vendor emails globally,
//! product and customer names per vendor. Claims are atomic, so two
//! concurrent creates with the same name cannot both succeed.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::hash::Hash;

/// An index that hands out each key at most once.
///
/// Uses the [`DashMap`] entry API for atomic check-and-insert; a claim either
/// takes the key or observes the existing owner, never both.
#[derive(Debug)]
pub(crate) struct UniqueIndex<K, V> {
    entries: DashMap<K, V>,
}

impl<K, V> UniqueIndex<K, V>
where
    K: Eq + Hash,
    V: Copy,
{
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Claims `key` for `value`. Returns `false` if the key is already taken.
    pub fn claim(&self, key: K, value: V) -> bool {
        match self.entries.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(value);
                true
            }
        }
    }

    /// Releases a previously claimed key.
    pub fn release(&self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|(_, value)| value)
    }

    /// Moves a claim from `old` to `new`. Returns `false` (and leaves the old
    /// claim in place) if `new` is already taken.
    pub fn reclaim(&self, old: &K, new: K, value: V) -> bool {
        if *old == new {
            return true;
        }
        if !self.claim(new, value) {
            return false;
        }
        self.release(old);
        true
    }
}

impl<K, V> Default for UniqueIndex<K, V>
where
    K: Eq + Hash,
    V: Copy,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_rejects_duplicates() {
        let index: UniqueIndex<(u32, String), u32> = UniqueIndex::new();
        assert!(index.claim((1, "arroz".to_string()), 10));
        assert!(!index.claim((1, "arroz".to_string()), 11));
        // Same name under a different scope is a different key
        assert!(index.claim((2, "arroz".to_string()), 12));
    }

    #[test]
    fn release_frees_the_key() {
        let index: UniqueIndex<(u32, String), u32> = UniqueIndex::new();
        assert!(index.claim((1, "café".to_string()), 10));
        assert_eq!(index.release(&(1, "café".to_string())), Some(10));
        assert!(index.claim((1, "café".to_string()), 11));
    }

    #[test]
    fn reclaim_moves_the_claim() {
        let index: UniqueIndex<(u32, String), u32> = UniqueIndex::new();
        assert!(index.claim((1, "pan".to_string()), 10));
        assert!(index.reclaim(&(1, "pan".to_string()), (1, "pan integral".to_string()), 10));
        // Old key is free again, new key is taken
        assert!(index.claim((1, "pan".to_string()), 11));
        assert!(!index.claim((1, "pan integral".to_string()), 12));
    }

    #[test]
    fn reclaim_to_taken_key_keeps_old_claim() {
        let index: UniqueIndex<(u32, String), u32> = UniqueIndex::new();
        assert!(index.claim((1, "pan".to_string()), 10));
        assert!(index.claim((1, "leche".to_string()), 11));
        assert!(!index.reclaim(&(1, "pan".to_string()), (1, "leche".to_string()), 10));
        // Old claim survives the failed rename
        assert!(!index.claim((1, "pan".to_string()), 12));
    }

    #[test]
    fn reclaim_same_key_is_noop() {
        let index: UniqueIndex<(u32, String), u32> = UniqueIndex::new();
        assert!(index.claim((1, "pan".to_string()), 10));
        assert!(index.reclaim(&(1, "pan".to_string()), (1, "pan".to_string()), 10));
        assert!(!index.claim((1, "pan".to_string()), 11));
    }
}
