use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::metadata::{FetchOutcome, MetadataFetcher};
use crate::models::Entry;
use crate::storage::{Capacity, LocalStore, Namespace};

/// Attempts at persisting a change before a conflicting writer wins.
const MAX_COMMIT_ATTEMPTS: usize = 3;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Message meant for the person using the shelf.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub title: &'static str,
    pub description: &'static str,
}

impl Notice {
    pub const DELETED: Notice = Notice {
        title: "Attention!",
        description: "Your bookmark has been deleted.",
    };

    pub const DISCARDED: Notice = Notice {
        title: "Attention!",
        description: "Your saved bookmarks could not be read. A copy is kept aside when the list is next saved.",
    };
}

/// The bookmark list, kept in step with its store.
///
/// Every change is written to the store first and only then applied in
/// memory, so `entries()` always mirrors what was last persisted.
pub struct Shelf<N> {
    store: LocalStore<N>,
    fetcher: Box<dyn MetadataFetcher>,
    clock: Box<dyn Clock>,
    entries: Vec<Entry>,
    capacity: Capacity,
    notice: Option<Notice>,
}

impl<N: Namespace> Shelf<N> {
    pub fn open(store: LocalStore<N>, fetcher: Box<dyn MetadataFetcher>) -> Result<Self> {
        Self::with_clock(store, fetcher, Box::new(SystemClock))
    }

    pub fn with_clock(
        store: LocalStore<N>,
        fetcher: Box<dyn MetadataFetcher>,
        clock: Box<dyn Clock>,
    ) -> Result<Self> {
        let mut shelf = Shelf {
            store,
            fetcher,
            clock,
            entries: Vec::new(),
            capacity: Capacity::full(),
            notice: None,
        };
        shelf.entries = shelf.reload()?;
        shelf.refresh_capacity()?;
        Ok(shelf)
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn get(&self, id: i64) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn view(&self, filter: &Filter) -> Vec<&Entry> {
        filter.apply(&self.entries)
    }

    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    /// Set when opening found the stored list unreadable.
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn store(&self) -> &LocalStore<N> {
        &self.store
    }

    /// Looks up metadata for `text` and appends a new entry. Empty text is
    /// ignored. `category` replaces the looked-up category when given.
    pub async fn add_entry(&mut self, text: &str, category: Option<&str>) -> Result<Option<Entry>> {
        if text.is_empty() {
            return Ok(None);
        }

        let outcome = self.fetcher.fetch(text).await;
        if let FetchOutcome::Failure { reason } = &outcome {
            warn!(text, %reason, "metadata lookup failed, saving without preview");
        }
        let metadata = outcome.into_metadata_or_fallback();

        let now = self.clock.now();
        let category = category.map_or(metadata.category, str::to_string);
        let template = Entry {
            text: text.to_string(),
            id: now.timestamp_millis(),
            title: Some(metadata.title),
            favicon_url: Some(metadata.favicon_url),
            created_time: now,
            category,
        };

        self.commit(|entries| {
            let mut entry = template.clone();
            // Ids double as keys; keep them unique if the clock stalls.
            if let Some(newest) = entries.iter().map(|e| e.id).max() {
                entry.id = entry.id.max(newest + 1);
            }
            entries.push(entry);
            true
        })?;

        let added = self.entries.last().cloned();
        if let Some(entry) = &added {
            info!(id = entry.id, text = %entry.text, "added bookmark");
        }
        Ok(added)
    }

    /// Removes the entry with `id`. Unknown ids change nothing.
    pub fn delete_entry(&mut self, id: i64) -> Result<Option<Notice>> {
        let removed = self.commit(|entries| {
            let before = entries.len();
            entries.retain(|e| e.id != id);
            entries.len() != before
        })?;

        if removed {
            info!(id, "deleted bookmark");
            Ok(Some(Notice::DELETED))
        } else {
            debug!(id, "no bookmark to delete");
            Ok(None)
        }
    }

    /// Applies `mutate` to a copy of the list and persists it. On a
    /// concurrent write the list is reloaded and the mutation replayed.
    /// Returns whether `mutate` changed anything.
    fn commit<M>(&mut self, mutate: M) -> Result<bool>
    where
        M: Fn(&mut Vec<Entry>) -> bool,
    {
        let mut attempt = 1;
        loop {
            let mut next = self.entries.clone();
            if !mutate(&mut next) {
                self.refresh_capacity()?;
                return Ok(false);
            }

            match self.store.save(&next) {
                Ok(()) => {
                    self.entries = next;
                    self.refresh_capacity()?;
                    return Ok(true);
                }
                Err(Error::Conflict { .. }) if attempt < MAX_COMMIT_ATTEMPTS => {
                    attempt += 1;
                    self.entries = self.reload()?;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn reload(&mut self) -> Result<Vec<Entry>> {
        match self.store.load() {
            Ok(entries) => Ok(entries),
            Err(Error::Corrupt(err)) => {
                warn!(%err, "starting from an empty list, the unreadable one is kept on next save");
                self.notice = Some(Notice::DISCARDED);
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }

    fn refresh_capacity(&mut self) -> Result<()> {
        self.capacity = self.store.remaining_capacity()?;
        debug!(
            remaining = self.capacity.remaining_bytes,
            percent = self.capacity.percent_remaining,
            "storage capacity"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Metadata;
    use crate::storage::{set_aside_key, MemoryNamespace, Slot, ENTRIES_KEY};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct StubFetcher {
        outcome: FetchOutcome,
        calls: Arc<AtomicUsize>,
    }

    impl StubFetcher {
        fn returning(outcome: FetchOutcome) -> (Box<Self>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let fetcher = StubFetcher {
                outcome,
                calls: calls.clone(),
            };
            (Box::new(fetcher), calls)
        }
    }

    #[async_trait]
    impl MetadataFetcher for StubFetcher {
        async fn fetch(&self, _url: &str) -> FetchOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    /// Another writer that rewrites the list (unchanged) before every save.
    struct Contended(MemoryNamespace);

    impl Namespace for Contended {
        fn get(&self, key: &str) -> Result<Option<Slot>> {
            self.0.get(key)
        }

        fn compare_and_set(&mut self, key: &str, expected: i64, value: &str) -> Result<i64> {
            if let Some(current) = self.0.get(key)? {
                self.0.insert(key, &current.value);
            }
            self.0.compare_and_set(key, expected, value)
        }

        fn values(&self) -> Result<Vec<String>> {
            self.0.values()
        }
    }

    fn example() -> FetchOutcome {
        FetchOutcome::Success(Metadata {
            title: "Example".to_string(),
            favicon_url: String::new(),
            category: "default".to_string(),
        })
    }

    fn at(ms: i64) -> Box<FixedClock> {
        Box::new(FixedClock(Utc.timestamp_millis_opt(ms).unwrap()))
    }

    fn shelf_with(namespace: MemoryNamespace, outcome: FetchOutcome) -> Shelf<MemoryNamespace> {
        let (fetcher, _) = StubFetcher::returning(outcome);
        Shelf::with_clock(LocalStore::new(namespace), fetcher, at(1_000)).unwrap()
    }

    fn persisted(shelf: &Shelf<MemoryNamespace>) -> Vec<Entry> {
        let mut store = LocalStore::new(shelf.store().namespace().clone());
        store.load().unwrap()
    }

    #[tokio::test]
    async fn add_appends_fetched_entry() {
        let mut shelf = shelf_with(MemoryNamespace::new(), example());
        assert_eq!(shelf.capacity().percent_remaining, 100.0);

        let added = shelf.add_entry("example.com", None).await.unwrap().unwrap();

        assert_eq!(shelf.entries(), &[added.clone()]);
        assert_eq!(added.text, "example.com");
        assert_eq!(added.title(), "Example");
        assert_eq!(added.favicon_url(), "");
        assert_eq!(added.category, "default");
        assert_eq!(added.id, 1_000);
        assert!(shelf.capacity().percent_remaining < 100.0);
        assert_eq!(persisted(&shelf), shelf.entries());
    }

    #[tokio::test]
    async fn empty_text_is_ignored_without_fetching() {
        let (fetcher, calls) = StubFetcher::returning(example());
        let mut shelf = Shelf::open(LocalStore::new(MemoryNamespace::new()), fetcher).unwrap();

        assert_eq!(shelf.add_entry("", None).await.unwrap(), None);
        assert!(shelf.entries().is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(shelf.store().namespace().get(ENTRIES_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_lookup_falls_back_to_empty_metadata() {
        let mut shelf = shelf_with(MemoryNamespace::new(), FetchOutcome::failure("offline"));
        let added = shelf.add_entry("just a note", None).await.unwrap().unwrap();

        assert_eq!(added.title(), "");
        assert_eq!(added.favicon_url(), "");
        assert_eq!(added.category, "default");
    }

    #[tokio::test]
    async fn category_override_wins() {
        let mut shelf = shelf_with(MemoryNamespace::new(), example());
        let added = shelf.add_entry("example.com", Some("reading")).await.unwrap().unwrap();
        assert_eq!(added.category, "reading");
    }

    #[tokio::test]
    async fn ids_stay_unique_when_clock_stalls() {
        let mut shelf = shelf_with(MemoryNamespace::new(), example());
        shelf.add_entry("a.com", None).await.unwrap();
        shelf.add_entry("b.com", None).await.unwrap();

        let ids: Vec<i64> = shelf.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1_000, 1_001]);
    }

    #[tokio::test]
    async fn persisted_list_tracks_every_mutation() {
        let mut shelf = shelf_with(MemoryNamespace::new(), example());
        let mut ids = Vec::new();
        for text in &["a.com", "b.com", "c.com"] {
            let added = shelf.add_entry(text, None).await.unwrap().unwrap();
            ids.push(added.id);
            assert_eq!(persisted(&shelf), shelf.entries());
        }

        shelf.delete_entry(ids[1]).unwrap();
        assert_eq!(persisted(&shelf), shelf.entries());
        let texts: Vec<&str> = shelf.entries().iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["a.com", "c.com"]);
    }

    #[tokio::test]
    async fn delete_confirms_and_frees_space() {
        let mut shelf = shelf_with(MemoryNamespace::new(), example());
        let added = shelf.add_entry("example.com", None).await.unwrap().unwrap();
        let before = shelf.capacity();

        let notice = shelf.delete_entry(added.id).unwrap();

        assert_eq!(notice, Some(Notice::DELETED));
        assert!(shelf.entries().is_empty());
        assert!(shelf.capacity().remaining_bytes >= before.remaining_bytes);
    }

    #[tokio::test]
    async fn deleting_unknown_id_changes_nothing() {
        let mut shelf = shelf_with(MemoryNamespace::new(), example());
        shelf.add_entry("example.com", None).await.unwrap();
        let entries = shelf.entries().to_vec();
        let revision = shelf.store().namespace().get(ENTRIES_KEY).unwrap().unwrap().revision;

        assert_eq!(shelf.delete_entry(42).unwrap(), None);
        assert_eq!(shelf.entries(), entries.as_slice());
        assert_eq!(
            shelf.store().namespace().get(ENTRIES_KEY).unwrap().unwrap().revision,
            revision
        );
    }

    #[tokio::test]
    async fn capacity_moves_monotonically() {
        let mut shelf = shelf_with(MemoryNamespace::new(), example());
        let mut last = shelf.capacity().remaining_bytes;
        for text in &["a.com", "b.com", "c.com"] {
            shelf.add_entry(text, None).await.unwrap();
            assert!(shelf.capacity().remaining_bytes <= last);
            last = shelf.capacity().remaining_bytes;
        }
        let ids: Vec<i64> = shelf.entries().iter().map(|e| e.id).collect();
        for id in ids {
            shelf.delete_entry(id).unwrap();
            assert!(shelf.capacity().remaining_bytes >= last);
            last = shelf.capacity().remaining_bytes;
        }
    }

    #[test]
    fn unreadable_list_opens_empty_with_notice() {
        let mut namespace = MemoryNamespace::new();
        namespace.insert(ENTRIES_KEY, "[{\"text\":");
        let shelf = shelf_with(namespace, example());

        assert!(shelf.entries().is_empty());
        assert_eq!(shelf.notice(), Some(&Notice::DISCARDED));
    }

    #[tokio::test]
    async fn unreadable_list_survives_next_add() {
        let original = "[{\"text\":";
        let mut namespace = MemoryNamespace::new();
        namespace.insert(ENTRIES_KEY, original);
        let mut shelf = shelf_with(namespace, example());

        shelf.add_entry("new.com", None).await.unwrap();

        let kept = shelf.store().namespace().get(&set_aside_key(1)).unwrap().unwrap();
        assert_eq!(kept.value, original);
        assert_eq!(persisted(&shelf), shelf.entries());
        assert_eq!(shelf.entries().len(), 1);
    }

    #[test]
    fn null_category_does_not_discard_list() {
        let mut namespace = MemoryNamespace::new();
        namespace.insert(
            ENTRIES_KEY,
            r#"[{"text":"https://a.com","id":1,"title":"Alpha","createdTime":"2023-09-02T10:20:00Z","category":null}]"#,
        );
        let shelf = shelf_with(namespace, example());

        assert_eq!(shelf.notice(), None);
        assert_eq!(shelf.entries().len(), 1);
        assert_eq!(shelf.view(&Filter::new("news", "")).len(), 1);
    }

    #[tokio::test]
    async fn gives_up_after_repeated_conflicts() {
        let mut inner = MemoryNamespace::new();
        inner.insert(
            ENTRIES_KEY,
            r#"[{"text":"https://a.com","id":1,"title":"Alpha","createdTime":"2023-09-02T10:20:00Z","category":"news"}]"#,
        );
        let (fetcher, _) = StubFetcher::returning(example());
        let mut shelf =
            Shelf::with_clock(LocalStore::new(Contended(inner)), fetcher, at(1_000)).unwrap();
        let before = shelf.entries().to_vec();

        let added = shelf.add_entry("b.com", None).await;
        assert!(matches!(added, Err(Error::Conflict { .. })));
        assert_eq!(shelf.entries(), before.as_slice());

        let deleted = shelf.delete_entry(1);
        assert!(matches!(deleted, Err(Error::Conflict { .. })));
        assert_eq!(shelf.entries(), before.as_slice());
    }

    #[test]
    fn view_applies_filter() {
        let mut namespace = MemoryNamespace::new();
        namespace.insert(
            ENTRIES_KEY,
            r#"[{"text":"https://a.com","id":1,"title":"Alpha","createdTime":"2023-09-02T10:20:00Z","category":"news"},
                {"text":"https://b.com","id":2,"title":"Beta","createdTime":"2023-09-02T10:21:00Z","category":"tech"}]"#,
        );
        let shelf = shelf_with(namespace, example());

        let view = shelf.view(&Filter::new("tec", ""));
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].id, 2);
        assert_eq!(shelf.get(1).map(|e| e.title()), Some("Alpha"));
    }
}
