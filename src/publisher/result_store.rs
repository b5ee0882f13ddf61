use std::time::Instant;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::debug;
use tracing::trace;

use crate::DiscoveryEvent;
use crate::DiscoveryResult;
use crate::DiscoveryResultPublisher;
use crate::ThingUid;
use crate::DISCOVERY_EVENT_CHANNEL_CAPACITY;

#[derive(Debug, Clone)]
pub struct PublishedResult {
    pub result: DiscoveryResult,
    pub refreshed_at: Instant,
}

impl PublishedResult {
    fn is_expired(
        &self,
        now: Instant,
    ) -> bool {
        self.result
            .ttl()
            .is_some_and(|ttl| now.saturating_duration_since(self.refreshed_at) >= ttl)
    }

    fn represents_same_device(
        &self,
        other: &DiscoveryResult,
    ) -> bool {
        match (other.representation_property(), other.representation_value()) {
            (Some(key), Some(value)) => {
                self.result.representation_property() == Some(key)
                    && self.result.representation_value() == Some(value)
            }
            _ => false,
        }
    }
}

/// In-memory published result set.
///
/// Reads go straight to the map. Every mutation (publish, retract, cleanup)
/// holds `write_lock`, so a cleanup pass never interleaves with a publish and
/// duplicate reconciliation sees a stable set.
///
/// Changes are broadcast as [`DiscoveryEvent`]s; a subscriber that falls
/// more than the channel capacity behind misses events instead of blocking
/// publishers.
pub struct InMemoryResultStore {
    results: DashMap<ThingUid, PublishedResult>,
    write_lock: Mutex<()>,
    events: broadcast::Sender<DiscoveryEvent>,
}

impl std::fmt::Debug for InMemoryResultStore {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("InMemoryResultStore")
            .field("results", &self.results.len())
            .finish()
    }
}

impl Default for InMemoryResultStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(DISCOVERY_EVENT_CHANNEL_CAPACITY);
        Self {
            results: DashMap::new(),
            write_lock: Mutex::new(()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DiscoveryEvent> {
        self.events.subscribe()
    }

    pub fn get(
        &self,
        uid: &ThingUid,
    ) -> Option<PublishedResult> {
        self.results.get(uid).map(|r| r.value().clone())
    }

    pub fn contains(
        &self,
        uid: &ThingUid,
    ) -> bool {
        self.results.contains_key(uid)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Caller holds `write_lock`
    fn remove_all(
        &self,
        uids: &[ThingUid],
    ) {
        for uid in uids {
            if self.results.remove(uid).is_some() {
                trace!(uid = %uid, "result retracted");
                let _ = self.events.send(DiscoveryEvent::Removed(uid.clone()));
            }
        }
    }
}

impl DiscoveryResultPublisher for InMemoryResultStore {
    fn publish(
        &self,
        result: DiscoveryResult,
    ) {
        let _guard = self.write_lock.lock();

        let duplicates: Vec<ThingUid> = self
            .results
            .iter()
            .filter(|entry| entry.key() != result.thing_uid() && entry.value().represents_same_device(&result))
            .map(|entry| entry.key().clone())
            .collect();
        if !duplicates.is_empty() {
            debug!(
                uid = %result.thing_uid(),
                "replacing {} result(s) reported for the same device",
                duplicates.len()
            );
            self.remove_all(&duplicates);
        }

        let uid = result.thing_uid().clone();
        let refreshed = self
            .results
            .insert(
                uid.clone(),
                PublishedResult {
                    result: result.clone(),
                    refreshed_at: Instant::now(),
                },
            )
            .is_some();
        trace!(uid = %uid, refreshed, "result published");
        let _ = self.events.send(DiscoveryEvent::Discovered(result));
    }

    fn retract(
        &self,
        uid: &ThingUid,
    ) -> bool {
        let _guard = self.write_lock.lock();
        let removed = self.results.remove(uid).is_some();
        if removed {
            let _ = self.events.send(DiscoveryEvent::Removed(uid.clone()));
        }
        removed
    }

    fn retract_older_than(
        &self,
        instant: Instant,
    ) -> Vec<ThingUid> {
        let _guard = self.write_lock.lock();
        let stale: Vec<ThingUid> = self
            .results
            .iter()
            .filter(|entry| entry.value().refreshed_at < instant)
            .map(|entry| entry.key().clone())
            .collect();
        self.remove_all(&stale);
        stale
    }

    fn retract_expired(
        &self,
        now: Instant,
    ) -> Vec<ThingUid> {
        let _guard = self.write_lock.lock();
        let expired: Vec<ThingUid> = self
            .results
            .iter()
            .filter(|entry| entry.value().is_expired(now))
            .map(|entry| entry.key().clone())
            .collect();
        self.remove_all(&expired);
        expired
    }

    fn results_for_bridge(
        &self,
        bridge_uid: &ThingUid,
    ) -> Vec<ThingUid> {
        self.results
            .iter()
            .filter(|entry| entry.value().result.bridge_uid() == Some(bridge_uid))
            .map(|entry| entry.key().clone())
            .collect()
    }

    fn results(&self) -> Vec<DiscoveryResult> {
        self.results.iter().map(|entry| entry.value().result.clone()).collect()
    }
}
