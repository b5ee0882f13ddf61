use std::collections::HashSet;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::child_result;
use crate::Bridge;
use crate::ChildDiscoveryCallback;
use crate::ChildDiscoveryModule;
use crate::ModuleError;
use crate::ModuleResult;
use crate::ThingTypeUid;
use crate::ThingUid;

/// What a [`StubModule`] does after reporting its children
#[derive(Debug, Clone, Copy)]
pub(crate) enum StubBehavior {
    Return,
    /// Blocks the calling thread before returning
    Hang(Duration),
    Fail,
    Panic,
}

/// Discovery module reporting one child per configured key
pub(crate) struct StubModule {
    name: String,
    supported: HashSet<ThingTypeUid>,
    child_keys: Mutex<Vec<String>>,
    behavior: StubBehavior,
    invocations: AtomicUsize,
    invoked_bridges: Mutex<Vec<ThingUid>>,
    /// Callback kept from the last invocation, for reports after return
    callback: Mutex<Option<Arc<dyn ChildDiscoveryCallback>>>,
}

impl StubModule {
    pub(crate) fn new(
        name: &str,
        supported: ThingTypeUid,
        child_keys: &[&str],
    ) -> Self {
        Self {
            name: name.to_string(),
            supported: HashSet::from([supported]),
            child_keys: Mutex::new(child_keys.iter().map(|k| k.to_string()).collect()),
            behavior: StubBehavior::Return,
            invocations: AtomicUsize::new(0),
            invoked_bridges: Mutex::new(Vec::new()),
            callback: Mutex::new(None),
        }
    }

    pub(crate) fn with_behavior(
        mut self,
        behavior: StubBehavior,
    ) -> Self {
        self.behavior = behavior;
        self
    }

    pub(crate) fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    pub(crate) fn invoked_bridges(&self) -> Vec<ThingUid> {
        self.invoked_bridges.lock().clone()
    }

    pub(crate) fn set_child_keys(
        &self,
        keys: &[&str],
    ) {
        *self.child_keys.lock() = keys.iter().map(|k| k.to_string()).collect();
    }

    /// Reports through the callback kept from the last invocation, the way
    /// a module with a live bridge subscription would.
    pub(crate) fn report_later(
        &self,
        bridge: &ThingUid,
        key: &str,
    ) -> bool {
        match self.callback.lock().as_ref() {
            Some(cb) => {
                cb.thing_discovered(child_result(bridge, key));
                true
            }
            None => false,
        }
    }

    pub(crate) fn remove_later(
        &self,
        child: &ThingUid,
    ) -> bool {
        match self.callback.lock().as_ref() {
            Some(cb) => {
                cb.thing_removed(child);
                true
            }
            None => false,
        }
    }
}

impl ChildDiscoveryModule for StubModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn supported_parent_types(&self) -> HashSet<ThingTypeUid> {
        self.supported.clone()
    }

    fn create_results(
        &self,
        bridge: &Bridge,
        callback: Arc<dyn ChildDiscoveryCallback>,
    ) -> ModuleResult {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        self.invoked_bridges.lock().push(bridge.uid.clone());
        *self.callback.lock() = Some(Arc::clone(&callback));

        let keys = self.child_keys.lock().clone();
        for key in keys {
            callback.thing_discovered(child_result(&bridge.uid, &key));
        }

        match self.behavior {
            StubBehavior::Return => Ok(()),
            StubBehavior::Hang(d) => {
                std::thread::sleep(d);
                Ok(())
            }
            StubBehavior::Fail => Err(ModuleError::BridgeUnavailable(bridge.uid.clone())),
            StubBehavior::Panic => panic!("stub module {} exploded", self.name),
        }
    }
}
