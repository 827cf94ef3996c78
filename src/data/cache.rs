//! Time-bounded memoisation in front of a [`CountrySource`].
//!
//! Country tables are cached by name and the index is cached once. Entries
//! older than the TTL are refetched. When the table cache is full the oldest
//! entry is evicted.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::data::source::{CountryEntry, CountrySource, lookup_country};
use crate::domain::ObservationTable;
use crate::error::AppError;

/// Default entry lifetime, in seconds.
pub const DEFAULT_TTL_SECS: u64 = 600;

/// Default number of country tables kept.
pub const DEFAULT_CAPACITY: usize = 16;

#[derive(Debug)]
struct Entry<T> {
    stored_at: Instant,
    /// Insertion order; `Instant`s can tie on coarse clocks.
    seq: u64,
    value: T,
}

impl<T> Entry<T> {
    fn new(value: T, seq: u64) -> Self {
        Self {
            stored_at: Instant::now(),
            seq,
            value,
        }
    }

    fn is_fresh(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() < ttl
    }
}

pub struct CachedSource<S> {
    inner: S,
    ttl: Duration,
    capacity: usize,
    next_seq: Cell<u64>,
    index: RefCell<Option<Entry<Vec<CountryEntry>>>>,
    tables: RefCell<HashMap<String, Entry<ObservationTable>>>,
}

impl<S: CountrySource> CachedSource<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self::with_capacity(inner, ttl, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(inner: S, ttl: Duration, capacity: usize) -> Self {
        Self {
            inner,
            ttl,
            capacity: capacity.max(1),
            next_seq: Cell::new(0),
            index: RefCell::new(None),
            tables: RefCell::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Drop every cached entry.
    pub fn clear(&self) {
        self.index.borrow_mut().take();
        self.tables.borrow_mut().clear();
    }

    fn seq(&self) -> u64 {
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        seq
    }

    fn evict_if_full(&self, tables: &mut HashMap<String, Entry<ObservationTable>>) {
        tables.retain(|_, e| e.is_fresh(self.ttl));
        while tables.len() >= self.capacity {
            let Some(oldest) = tables
                .iter()
                .min_by_key(|(_, e)| e.seq)
                .map(|(k, _)| k.clone())
            else {
                break;
            };
            debug!(country = %oldest, "evicting cached table");
            tables.remove(&oldest);
        }
    }
}

impl<S: CountrySource> CountrySource for CachedSource<S> {
    fn fetch_country_index(&self) -> Result<Vec<CountryEntry>, AppError> {
        if let Some(entry) = self.index.borrow().as_ref().filter(|e| e.is_fresh(self.ttl)) {
            debug!("country index cache hit");
            return Ok(entry.value.clone());
        }

        let index = self.inner.fetch_country_index()?;
        *self.index.borrow_mut() = Some(Entry::new(index.clone(), self.seq()));
        Ok(index)
    }

    fn fetch_country_observations(&self, country: &str) -> Result<ObservationTable, AppError> {
        if let Some(entry) = self.tables.borrow().get(country).filter(|e| e.is_fresh(self.ttl)) {
            debug!(country, "country table cache hit");
            return Ok(entry.value.clone());
        }

        // The lookup goes through the cached index; failures are not cached.
        let index = self.fetch_country_index()?;
        let entry = lookup_country(&index, country)?;
        let table = self.inner.fetch_entry_observations(entry)?;

        let mut tables = self.tables.borrow_mut();
        tables.remove(country);
        self.evict_if_full(&mut tables);
        tables.insert(country.to_string(), Entry::new(table.clone(), self.seq()));
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTED: [&str; 4] = ["Fiji", "Japan", "Laos", "Syria"];

    #[derive(Default)]
    struct CountingSource {
        index_calls: Cell<usize>,
        table_calls: Cell<usize>,
    }

    impl CountrySource for CountingSource {
        fn fetch_country_index(&self) -> Result<Vec<CountryEntry>, AppError> {
            self.index_calls.set(self.index_calls.get() + 1);
            Ok(LISTED
                .iter()
                .map(|name| CountryEntry {
                    country: name.to_string(),
                    iso3: String::new(),
                    dataset_id: format!("ds-{name}"),
                    start_date: None,
                    end_date: None,
                })
                .collect())
        }

        fn fetch_country_observations(&self, country: &str) -> Result<ObservationTable, AppError> {
            self.table_calls.set(self.table_calls.get() + 1);
            if country == "Syria" {
                return Err(AppError::fetch("download failed"));
            }
            Ok(ObservationTable::default())
        }
    }

    fn cached(ttl: Duration) -> CachedSource<CountingSource> {
        CachedSource::new(CountingSource::default(), ttl)
    }

    #[test]
    fn repeated_fetches_hit_the_cache() {
        let cached = cached(Duration::from_secs(600));
        cached.fetch_country_index().unwrap();
        cached.fetch_country_index().unwrap();
        cached.fetch_country_observations("Fiji").unwrap();
        cached.fetch_country_observations("Fiji").unwrap();
        assert_eq!(cached.inner().index_calls.get(), 1);
        assert_eq!(cached.inner().table_calls.get(), 1);
    }

    #[test]
    fn table_lookups_share_the_cached_index() {
        let cached = cached(Duration::from_secs(600));
        cached.fetch_country_observations("Fiji").unwrap();
        cached.fetch_country_observations("Japan").unwrap();
        cached.fetch_country_index().unwrap();
        assert_eq!(cached.inner().index_calls.get(), 1);
        assert_eq!(cached.inner().table_calls.get(), 2);
    }

    #[test]
    fn unlisted_country_fails_without_a_table_fetch() {
        let cached = cached(Duration::from_secs(600));
        assert_eq!(
            cached.fetch_country_observations("Atlantis").unwrap_err(),
            AppError::UnknownCountry("Atlantis".into())
        );
        assert_eq!(cached.inner().table_calls.get(), 0);
    }

    #[test]
    fn expired_entries_are_refetched() {
        let cached = cached(Duration::ZERO);
        cached.fetch_country_observations("Fiji").unwrap();
        cached.fetch_country_observations("Fiji").unwrap();
        assert_eq!(cached.inner().table_calls.get(), 2);
        assert_eq!(cached.inner().index_calls.get(), 2);
    }

    #[test]
    fn errors_are_not_cached() {
        let cached = cached(Duration::from_secs(600));
        assert!(cached.fetch_country_observations("Syria").is_err());
        assert!(cached.fetch_country_observations("Syria").is_err());
        assert_eq!(cached.inner().table_calls.get(), 2);
    }

    #[test]
    fn full_cache_evicts_oldest() {
        let cached = CachedSource::with_capacity(CountingSource::default(), Duration::from_secs(600), 2);
        cached.fetch_country_observations("Fiji").unwrap();
        cached.fetch_country_observations("Japan").unwrap();
        cached.fetch_country_observations("Laos").unwrap();
        assert_eq!(cached.inner().table_calls.get(), 3);

        cached.fetch_country_observations("Laos").unwrap();
        cached.fetch_country_observations("Japan").unwrap();
        assert_eq!(cached.inner().table_calls.get(), 3);
        cached.fetch_country_observations("Fiji").unwrap();
        assert_eq!(cached.inner().table_calls.get(), 4);
    }
}
