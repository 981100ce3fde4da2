//! In-memory registry client for tests and offline runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::client::RegistryClient;
use crate::error::RegistryError;
use crate::record::RegistryRecord;

/// Serves a fixed record list, with switchable outage and rate limiting.
#[derive(Default)]
pub struct StaticRegistryClient {
    records: Mutex<Vec<RegistryRecord>>,
    /// Index to remaining 429 responses.
    rate_limits: Mutex<HashMap<u64, u32>>,
    unavailable: AtomicBool,
    get_calls: AtomicUsize,
}

impl StaticRegistryClient {
    pub fn new(records: Vec<RegistryRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    pub fn set_records(&self, records: Vec<RegistryRecord>) {
        *lock(&self.records) = records;
    }

    /// Make `count()` fail with HTTP 503.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Answer the next `times` fetches of `index` with a rate limit.
    pub fn rate_limit(&self, index: u64, times: u32) {
        lock(&self.rate_limits).insert(index, times);
    }

    /// Number of `get()` calls made so far.
    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl RegistryClient for StaticRegistryClient {
    async fn count(&self) -> Result<u64, RegistryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RegistryError::HttpStatus(503));
        }
        Ok(lock(&self.records).len() as u64)
    }

    async fn get(&self, index: u64) -> Result<RegistryRecord, RegistryError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);

        {
            let mut limits = lock(&self.rate_limits);
            if let Some(remaining) = limits.get_mut(&index) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(RegistryError::RateLimited);
                }
            }
        }

        let records = lock(&self.records);
        index
            .checked_sub(1)
            .and_then(|i| records.get(i as usize))
            .cloned()
            .ok_or(RegistryError::HttpStatus(404))
    }
}
