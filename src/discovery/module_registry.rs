use std::collections::HashSet;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::ChildDiscoveryModule;
use crate::ThingTypeUid;

pub type ModuleSnapshot = Arc<Vec<Arc<dyn ChildDiscoveryModule>>>;

/// Copy-on-write set of active discovery modules.
///
/// Readers take a [`ModuleSnapshot`] and iterate it without any lock; writers
/// publish a new vector. An iteration started before a concurrent `add` or
/// `remove` keeps seeing the set as it was when the snapshot was taken.
pub struct ModuleRegistry {
    modules: ArcSwap<Vec<Arc<dyn ChildDiscoveryModule>>>,
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let names: Vec<String> = self.snapshot().iter().map(|m| m.name().to_string()).collect();
        f.debug_struct("ModuleRegistry").field("modules", &names).finish()
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self {
            modules: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Returns `false` when the very same module instance is already registered.
    pub fn add(
        &self,
        module: Arc<dyn ChildDiscoveryModule>,
    ) -> bool {
        let mut added = false;
        self.modules.rcu(|current| {
            if current.iter().any(|m| same_module(m, &module)) {
                added = false;
                return Arc::clone(current);
            }
            added = true;
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(Arc::clone(&module));
            Arc::new(next)
        });
        added
    }

    /// Returns `false` when the module was not registered.
    pub fn remove(
        &self,
        module: &Arc<dyn ChildDiscoveryModule>,
    ) -> bool {
        let mut removed = false;
        self.modules.rcu(|current| {
            removed = current.iter().any(|m| same_module(m, module));
            if !removed {
                return Arc::clone(current);
            }
            Arc::new(
                current
                    .iter()
                    .filter(|m| !same_module(m, module))
                    .cloned()
                    .collect::<Vec<_>>(),
            )
        });
        removed
    }

    pub fn snapshot(&self) -> ModuleSnapshot {
        self.modules.load_full()
    }

    /// Union of the parent types of all registered modules
    pub fn supported_types(&self) -> HashSet<ThingTypeUid> {
        self.modules
            .load()
            .iter()
            .flat_map(|m| m.supported_parent_types())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.modules.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.load().is_empty()
    }
}

/// Identity is the allocation, not the value: two distinct instances of the
/// same module type are two registrations.
pub(crate) fn same_module(
    a: &Arc<dyn ChildDiscoveryModule>,
    b: &Arc<dyn ChildDiscoveryModule>,
) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}
