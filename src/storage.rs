//! Key/value persistence for the bookmark list.
//!
//! The shelf keeps its whole list as one JSON blob under [`ENTRIES_KEY`],
//! rewritten on every change. Other keys may live in the same namespace and
//! count against the shared capacity budget.

use std::collections::BTreeMap;

use diesel::prelude::*;
use diesel::SqliteConnection;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{Entry, StoredValue, StoredValueToInsert};
use crate::schema::local_storage;

/// Key holding the JSON encoded bookmark list.
pub const ENTRIES_KEY: &str = "texts";

/// Budget the capacity estimate is measured against.
pub const CAPACITY_BYTES: i64 = 5 * 1024 * 1024;

/// Revision of a key that has never been written.
pub const ABSENT: i64 = 0;

#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub value: String,
    pub revision: i64,
}

/// A flat string namespace with per-key revisions.
pub trait Namespace {
    fn get(&self, key: &str) -> Result<Option<Slot>>;

    /// Writes `value` if the key is still at `expected`, returning the new
    /// revision. Fails with [`Error::Conflict`] otherwise.
    fn compare_and_set(&mut self, key: &str, expected: i64, value: &str) -> Result<i64>;

    /// Every value currently stored, whatever its key.
    fn values(&self) -> Result<Vec<String>>;
}

pub struct SqliteNamespace {
    conn: SqliteConnection,
}

impl SqliteNamespace {
    pub fn new(conn: SqliteConnection) -> Self {
        SqliteNamespace { conn }
    }
}

impl Namespace for SqliteNamespace {
    fn get(&self, key: &str) -> Result<Option<Slot>> {
        let stored = local_storage::table
            .find(key)
            .first::<StoredValue>(&self.conn)
            .optional()?;
        Ok(stored.map(|s| Slot {
            value: s.value,
            revision: s.revision,
        }))
    }

    fn compare_and_set(&mut self, key: &str, expected: i64, value: &str) -> Result<i64> {
        let conn = &self.conn;
        // IMMEDIATE takes the write lock up front so the revision check and
        // the write cannot interleave with another process.
        conn.immediate_transaction::<_, Error, _>(|| {
            let found = local_storage::table
                .find(key)
                .select(local_storage::revision)
                .first::<i64>(conn)
                .optional()?
                .unwrap_or(ABSENT);
            if found != expected {
                return Err(Error::Conflict {
                    key: key.to_string(),
                    expected,
                    found,
                });
            }

            let next = found + 1;
            if found == ABSENT {
                diesel::insert_into(local_storage::table)
                    .values(&StoredValueToInsert {
                        key,
                        value,
                        revision: next,
                    })
                    .execute(conn)?;
            } else {
                diesel::update(local_storage::table.find(key))
                    .set((
                        local_storage::value.eq(value),
                        local_storage::revision.eq(next),
                    ))
                    .execute(conn)?;
            }
            Ok(next)
        })
    }

    fn values(&self) -> Result<Vec<String>> {
        Ok(local_storage::table
            .select(local_storage::value)
            .load::<String>(&self.conn)?)
    }
}

/// In-process namespace, handy wherever a real database is overkill.
#[derive(Debug, Default, Clone)]
pub struct MemoryNamespace {
    slots: BTreeMap<String, Slot>,
}

impl MemoryNamespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` unconditionally, bumping the key's revision.
    pub fn insert(&mut self, key: &str, value: &str) {
        let revision = self.slots.get(key).map_or(ABSENT, |s| s.revision) + 1;
        self.slots.insert(
            key.to_string(),
            Slot {
                value: value.to_string(),
                revision,
            },
        );
    }
}

impl Namespace for MemoryNamespace {
    fn get(&self, key: &str) -> Result<Option<Slot>> {
        Ok(self.slots.get(key).cloned())
    }

    fn compare_and_set(&mut self, key: &str, expected: i64, value: &str) -> Result<i64> {
        let found = self.slots.get(key).map_or(ABSENT, |s| s.revision);
        if found != expected {
            return Err(Error::Conflict {
                key: key.to_string(),
                expected,
                found,
            });
        }
        self.insert(key, value);
        Ok(found + 1)
    }

    fn values(&self) -> Result<Vec<String>> {
        Ok(self.slots.values().map(|s| s.value.clone()).collect())
    }
}

/// Approximate usage of the namespace against [`CAPACITY_BYTES`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capacity {
    pub used_bytes: i64,
    pub remaining_bytes: i64,
    pub percent_remaining: f64,
}

impl Capacity {
    /// Two bytes per UTF-16 code unit of every value.
    pub fn measure<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let used_bytes: i64 = values
            .into_iter()
            .map(|v| v.encode_utf16().count() as i64 * 2)
            .sum();
        let remaining_bytes = CAPACITY_BYTES - used_bytes;
        Capacity {
            used_bytes,
            remaining_bytes,
            percent_remaining: remaining_bytes as f64 / CAPACITY_BYTES as f64 * 100.0,
        }
    }

    pub fn full() -> Self {
        Self::measure(std::iter::empty())
    }
}

/// Key an unreadable list at `revision` is copied to before being replaced.
pub fn set_aside_key(revision: i64) -> String {
    format!("{}.corrupt.{}", ENTRIES_KEY, revision)
}

/// Reads and writes the bookmark list through a [`Namespace`].
pub struct LocalStore<N> {
    namespace: N,
    revision: i64,
    unreadable: Option<Slot>,
}

impl<N: Namespace> LocalStore<N> {
    pub fn new(namespace: N) -> Self {
        LocalStore {
            namespace,
            revision: ABSENT,
            unreadable: None,
        }
    }

    /// Loads the list. A missing key is an empty list; an undecodable blob is
    /// [`Error::Corrupt`]. The next `save` copies such a blob to
    /// [`set_aside_key`] before replacing it.
    pub fn load(&mut self) -> Result<Vec<Entry>> {
        self.unreadable = None;
        let slot = match self.namespace.get(ENTRIES_KEY)? {
            Some(slot) => slot,
            None => {
                self.revision = ABSENT;
                return Ok(Vec::new());
            }
        };
        self.revision = slot.revision;
        match serde_json::from_str::<Vec<Entry>>(&slot.value) {
            Ok(entries) => {
                debug!(count = entries.len(), revision = slot.revision, "loaded entries");
                Ok(entries)
            }
            Err(err) => {
                self.unreadable = Some(slot);
                Err(Error::Corrupt(err))
            }
        }
    }

    fn set_aside_unreadable(&mut self) -> Result<()> {
        let slot = match self.unreadable.take() {
            Some(slot) => slot,
            None => return Ok(()),
        };
        let key = set_aside_key(slot.revision);
        match self.namespace.compare_and_set(&key, ABSENT, &slot.value) {
            Ok(_) => {
                warn!(%key, "kept unreadable bookmark list");
                Ok(())
            }
            // Another writer already copied this revision.
            Err(Error::Conflict { .. }) => Ok(()),
            Err(err) => {
                self.unreadable = Some(slot);
                Err(err)
            }
        }
    }

    /// Overwrites the stored list, provided nobody else wrote it since our
    /// last load or save.
    pub fn save(&mut self, entries: &[Entry]) -> Result<()> {
        let blob = serde_json::to_string(entries)?;
        self.set_aside_unreadable()?;
        match self
            .namespace
            .compare_and_set(ENTRIES_KEY, self.revision, &blob)
        {
            Ok(revision) => {
                debug!(count = entries.len(), revision, "saved entries");
                self.revision = revision;
                Ok(())
            }
            Err(err @ Error::Conflict { .. }) => {
                warn!("{}", err);
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    pub fn remaining_capacity(&self) -> Result<Capacity> {
        let values = self.namespace.values()?;
        Ok(Capacity::measure(values.iter().map(String::as_str)))
    }

    pub fn namespace(&self) -> &N {
        &self.namespace
    }

    pub fn namespace_mut(&mut self) -> &mut N {
        &mut self.namespace
    }
}
