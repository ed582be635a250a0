//! Time-to-live cache in front of an [`ElementProvider`].
//!
//! Entries are immutable `Arc<OrbitalElementSet>` values; a refresh swaps the
//! whole entry. Concurrent misses for one catalog id are coalesced: the first
//! caller becomes the leader and performs the fetch, later callers subscribe
//! to a broadcast channel and receive the leader's result, success or failure.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::broadcast;

use super::error::ElementError;
use super::provider::ElementProvider;
use super::types::{CachedElements, Freshness, OrbitalElementSet};

pub const DEFAULT_TTL: Duration = Duration::hours(1);
pub const DEFAULT_MAX_STALE: Duration = Duration::hours(24);
pub const DEFAULT_FETCH_TIMEOUT: StdDuration = StdDuration::from_secs(15);

type FetchResult = Result<CachedElements, ElementError>;

#[derive(Debug, Clone, Copy)]
pub struct CachePolicy {
    /// Maximum age of an entry served without refetching.
    pub ttl: Duration,
    /// Maximum age of an entry served when the provider is failing.
    pub max_stale: Duration,
    /// Deadline for a single provider call.
    pub fetch_timeout: StdDuration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            max_stale: DEFAULT_MAX_STALE,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

pub struct ElementCache<P> {
    provider: P,
    policy: CachePolicy,
    entries: Mutex<HashMap<u32, Arc<OrbitalElementSet>>>,
    in_flight: Mutex<HashMap<u32, broadcast::Sender<FetchResult>>>,
}

enum Role {
    Leader(broadcast::Sender<FetchResult>),
    Waiter(broadcast::Receiver<FetchResult>),
}

impl<P: ElementProvider> ElementCache<P> {
    pub fn new(provider: P, policy: CachePolicy) -> Self {
        Self {
            provider,
            policy,
            entries: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Element set for `catalog_id` as of `now`.
    ///
    /// Fetches when there is no entry or the entry is older than the TTL.
    /// When that fetch fails, an entry no older than `max_stale` is returned
    /// marked [`Freshness::Stale`]; otherwise the failure is returned.
    pub async fn get(&self, catalog_id: u32, now: DateTime<Utc>) -> FetchResult {
        if let Some(hit) = self.fresh_entry(catalog_id, now) {
            log::debug!("Element cache hit for {}", catalog_id);
            return Ok(hit);
        }

        let role = {
            let mut in_flight = self.in_flight.lock().unwrap();
            // A leader may have stored its result between the check above and here.
            if let Some(hit) = self.fresh_entry(catalog_id, now) {
                return Ok(hit);
            }
            match in_flight.get(&catalog_id) {
                Some(tx) => Role::Waiter(tx.subscribe()),
                None => {
                    let (tx, _) = broadcast::channel(1);
                    in_flight.insert(catalog_id, tx.clone());
                    Role::Leader(tx)
                }
            }
        };

        match role {
            Role::Waiter(mut rx) => {
                log::debug!("Waiting on in-flight fetch for {}", catalog_id);
                match rx.recv().await {
                    Ok(result) => result,
                    Err(_) => Err(ElementError::Abandoned(catalog_id)),
                }
            }
            Role::Leader(tx) => {
                let guard = InFlightGuard {
                    in_flight: &self.in_flight,
                    catalog_id,
                };
                let result = self.refresh(catalog_id, now).await;
                guard.release();
                // Waiters that subscribed before release all receive this.
                let _ = tx.send(result.clone());
                result
            }
        }
    }

    /// Drop the entry for `catalog_id`, forcing the next `get` to fetch.
    pub fn invalidate(&self, catalog_id: u32) {
        self.entries.lock().unwrap().remove(&catalog_id);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, catalog_id: u32) -> Option<Arc<OrbitalElementSet>> {
        self.entries.lock().unwrap().get(&catalog_id).cloned()
    }

    fn fresh_entry(&self, catalog_id: u32, now: DateTime<Utc>) -> Option<CachedElements> {
        let entry = self.entry(catalog_id)?;
        if now - entry.fetched_at < self.policy.ttl {
            Some(CachedElements {
                elements: entry,
                freshness: Freshness::Cached,
            })
        } else {
            None
        }
    }

    async fn refresh(&self, catalog_id: u32, now: DateTime<Utc>) -> FetchResult {
        match self.fetch(catalog_id, now).await {
            Ok(set) => {
                let set = Arc::new(set);
                self.entries
                    .lock()
                    .unwrap()
                    .insert(catalog_id, Arc::clone(&set));
                log::info!(
                    "Fetched elements for {} ({}), epoch {}",
                    catalog_id,
                    set.name,
                    set.epoch
                );
                Ok(CachedElements {
                    elements: set,
                    freshness: Freshness::Fetched,
                })
            }
            Err(err) => {
                let stale = self
                    .entry(catalog_id)
                    .filter(|entry| now - entry.fetched_at <= self.policy.max_stale);
                match stale {
                    Some(entry) => {
                        let age = now - entry.fetched_at;
                        log::warn!(
                            "Fetch for {} failed ({}); serving entry {}s old",
                            catalog_id,
                            err,
                            age.num_seconds()
                        );
                        Ok(CachedElements {
                            elements: entry,
                            freshness: Freshness::Stale {
                                age_seconds: age.num_seconds(),
                            },
                        })
                    }
                    None => {
                        log::warn!("Fetch for {} failed: {}", catalog_id, err);
                        Err(err)
                    }
                }
            }
        }
    }

    async fn fetch(
        &self,
        catalog_id: u32,
        now: DateTime<Utc>,
    ) -> Result<OrbitalElementSet, ElementError> {
        let raw = tokio::time::timeout(self.policy.fetch_timeout, self.provider.fetch(catalog_id))
            .await
            .map_err(|_| ElementError::Timeout {
                catalog_id,
                seconds: self.policy.fetch_timeout.as_secs(),
            })??;

        log::debug!(
            "Provider returned elements for {} retrieved at {}",
            catalog_id,
            raw.retrieved_at
        );

        OrbitalElementSet::parse(catalog_id, &raw.text, now)
    }
}

/// Removes the in-flight marker when the leader finishes or is dropped
/// mid-fetch. Dropping the sender closes the channel for any waiters.
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashMap<u32, broadcast::Sender<FetchResult>>>,
    catalog_id: u32,
}

impl InFlightGuard<'_> {
    fn release(self) {}
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = self.in_flight.lock() {
            in_flight.remove(&self.catalog_id);
        }
    }
}
