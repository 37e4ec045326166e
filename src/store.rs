//! Artist data store for one map view session.
//!
//! The store is owned by the session and rebuilt on every fetch cycle. Map
//! features and list rows only carry identifiers; everything else is looked
//! up here.
//!
//! # Invariants
//! - Every identifier on screen resolves here while it is displayed.
//! - `replace_all` clears before inserting, so a repeated fetch never
//!   accumulates stale entries.

use crate::ArtistRecord;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct ArtistStore {
    records: HashMap<String, ArtistRecord>,
}

impl ArtistStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Insert, overwriting any record with the same identifier.
    pub fn insert(&mut self, record: ArtistRecord) {
        self.records.insert(record.id.clone(), record);
    }

    /// Drop everything, then load `records`.
    pub fn replace_all<I: IntoIterator<Item = ArtistRecord>>(&mut self, records: I) {
        self.clear();
        for record in records {
            self.insert(record);
        }
    }

    pub fn get(&self, id: &str) -> Option<&ArtistRecord> {
        self.records.get(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Resolve cluster leaves to records, dropping unknown ids, sorted by
    /// rank then name.
    pub fn resolve_ranked<'a, I>(&self, ids: I) -> Vec<ArtistRecord>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut resolved: Vec<ArtistRecord> = ids
            .into_iter()
            .filter_map(|id| {
                let found = self.get(id);
                if found.is_none() {
                    log::debug!("Cluster leaf {} has no record in the store", id);
                }
                found.cloned()
            })
            .collect();
        resolved.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.name.cmp(&b.name)));
        resolved
    }
}
