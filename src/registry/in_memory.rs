use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::RwLock;
use tracing::debug;
use tracing::trace;

use super::same_listener;
use crate::Thing;
use crate::ThingRegistry;
use crate::ThingRegistryChangeListener;
use crate::ThingUid;

/// Thing registry kept in memory.
///
/// Listeners are notified after the change is applied and outside of the
/// things lock, so a listener may read the registry back.
pub struct InMemoryThingRegistry {
    things: RwLock<BTreeMap<ThingUid, Thing>>,
    listeners: ArcSwap<Vec<Arc<dyn ThingRegistryChangeListener>>>,
}

impl std::fmt::Debug for InMemoryThingRegistry {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("InMemoryThingRegistry")
            .field("things", &self.things.read().len())
            .field("listeners", &self.listeners.load().len())
            .finish()
    }
}

impl Default for InMemoryThingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryThingRegistry {
    pub fn new() -> Self {
        Self {
            things: RwLock::new(BTreeMap::new()),
            listeners: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Adds `thing`, or updates it when its uid is already known.
    pub fn add(
        &self,
        thing: Thing,
    ) {
        let previous = self.things.write().insert(thing.uid.clone(), thing.clone());
        match previous {
            Some(old) => {
                debug!(uid = %thing.uid, "thing replaced");
                self.for_each_listener(|l| l.updated(&old, &thing));
            }
            None => {
                debug!(uid = %thing.uid, "thing added");
                self.for_each_listener(|l| l.added(&thing));
            }
        }
    }

    /// Returns the previous version, `None` when the uid was unknown (no event).
    pub fn update(
        &self,
        thing: Thing,
    ) -> Option<Thing> {
        let old = {
            let mut things = self.things.write();
            if !things.contains_key(&thing.uid) {
                return None;
            }
            things.insert(thing.uid.clone(), thing.clone())
        }?;
        debug!(uid = %thing.uid, "thing updated");
        self.for_each_listener(|l| l.updated(&old, &thing));
        Some(old)
    }

    pub fn remove(
        &self,
        uid: &ThingUid,
    ) -> Option<Thing> {
        let removed = self.things.write().remove(uid)?;
        debug!(uid = %uid, "thing removed");
        self.for_each_listener(|l| l.removed(&removed));
        Some(removed)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.load().len()
    }

    fn for_each_listener<F>(
        &self,
        f: F,
    ) where
        F: Fn(&dyn ThingRegistryChangeListener),
    {
        let listeners = self.listeners.load_full();
        trace!("notifying {} registry listeners", listeners.len());
        for l in listeners.iter() {
            f(l.as_ref());
        }
    }
}

impl ThingRegistry for InMemoryThingRegistry {
    fn things(&self) -> Vec<Thing> {
        self.things.read().values().cloned().collect()
    }

    fn get(
        &self,
        uid: &ThingUid,
    ) -> Option<Thing> {
        self.things.read().get(uid).cloned()
    }

    fn add_registry_change_listener(
        &self,
        listener: Arc<dyn ThingRegistryChangeListener>,
    ) {
        self.listeners.rcu(|current| {
            if current.iter().any(|l| same_listener(l, &listener)) {
                return Arc::clone(current);
            }
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(Arc::clone(&listener));
            Arc::new(next)
        });
    }

    fn remove_registry_change_listener(
        &self,
        listener: &Arc<dyn ThingRegistryChangeListener>,
    ) {
        self.listeners.rcu(|current| {
            Arc::new(
                current
                    .iter()
                    .filter(|l| !same_listener(l, listener))
                    .cloned()
                    .collect::<Vec<_>>(),
            )
        });
    }
}
