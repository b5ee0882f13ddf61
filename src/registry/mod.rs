//! Parent registry boundary: the registry the service reads bridges from and
//! the change notifications it subscribes to.
mod in_memory;
pub use in_memory::*;


use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

use crate::Thing;
use crate::ThingUid;

/// Receives registry changes. Called synchronously on the thread that
/// mutated the registry, so implementations must return quickly.
#[cfg_attr(test, automock)]
pub trait ThingRegistryChangeListener: Send + Sync {
    fn added(
        &self,
        thing: &Thing,
    );

    fn removed(
        &self,
        thing: &Thing,
    );

    fn updated(
        &self,
        old_thing: &Thing,
        thing: &Thing,
    );
}

pub trait ThingRegistry: Send + Sync {
    /// All things currently registered
    fn things(&self) -> Vec<Thing>;

    fn get(
        &self,
        uid: &ThingUid,
    ) -> Option<Thing>;

    fn add_registry_change_listener(
        &self,
        listener: Arc<dyn ThingRegistryChangeListener>,
    );

    fn remove_registry_change_listener(
        &self,
        listener: &Arc<dyn ThingRegistryChangeListener>,
    );
}

pub(crate) fn same_listener(
    a: &Arc<dyn ThingRegistryChangeListener>,
    b: &Arc<dyn ThingRegistryChangeListener>,
) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}
