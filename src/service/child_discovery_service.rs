//! Aggregates registered [`ChildDiscoveryModule`]s into one discovery feed.
//!
//! ## Flow
//! ```text
//! start_scan / registry added|updated / add_module
//!     └─▶ for every (module, bridge) with a supported bridge type
//!           └─▶ SafeCaller::invoke(module, bridge, core, timeout)
//!                 └─▶ module reports through ChildDiscoveryCallback (the core)
//!                       └─▶ DiscoveryResultPublisher::publish / retract
//! ```
//!
//! ## Concurrency
//! - The module set is copy-on-write ([`ModuleRegistry`]); adding or removing
//!   modules never waits for a running scan.
//! - Invocations of one pass run concurrently and are each bounded by the
//!   module timeout; a hung or failing module only costs its own slot.
//! - Callback calls are accepted at any time, also outside of scans.
//! - Closing a scan session and the stale-result cleanup happen under one
//!   mutex, so two overlapping scans never clean up with different start times.
//!
//! ## Late-bound dependencies
//! The thing registry and the safe caller may be absent (not wired yet, or
//! already unwired). Every discovery path then does nothing instead of failing.

use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Weak;
use std::time::Instant;

use futures::future::join_all;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use parking_lot::RwLock;
use tokio::runtime::Handle;
use tracing::debug;
use tracing::info;
use tracing::trace;

use crate::discovery::supports;
use crate::Bridge;
use crate::ChildDiscoveryCallback;
use crate::ChildDiscoveryConfig;
use crate::ChildDiscoveryModule;
use crate::DiscoveryResult;
use crate::DiscoveryResultPublisher;
use crate::InvocationOutcome;
use crate::ModuleRegistry;
use crate::Result;
use crate::SafeCaller;
use crate::ScanSession;
use crate::ScanSummary;
use crate::SystemError;
use crate::Thing;
use crate::ThingRegistry;
use crate::ThingRegistryChangeListener;
use crate::ThingTypeUid;
use crate::ThingUid;

/// Shared state behind [`ChildDiscoveryService`].
///
/// The core is what modules and the thing registry hold on to: it is the
/// [`ChildDiscoveryCallback`] handed to modules and the
/// [`ThingRegistryChangeListener`] subscribed to the registry.
pub struct ServiceCore {
    config: ChildDiscoveryConfig,
    modules: ModuleRegistry,
    thing_registry: RwLock<Option<Arc<dyn ThingRegistry>>>,
    safe_caller: RwLock<Option<Arc<dyn SafeCaller>>>,
    publisher: Arc<dyn DiscoveryResultPublisher>,
    background_discovery: AtomicBool,
    /// Registry this core is registered on as listener. The lock is held
    /// across the registration call so the flag never drifts from it.
    subscription: Mutex<Option<Arc<dyn ThingRegistry>>>,
    scan_session: Mutex<Option<ScanSession>>,
    runtime: Handle,
    me: Weak<ServiceCore>,
}

impl std::fmt::Debug for ServiceCore {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ServiceCore")
            .field("config", &self.config)
            .field("modules", &self.modules)
            .field("background_discovery", &self.background_discovery.load(Ordering::Relaxed))
            .field("subscribed", &self.subscription.lock().is_some())
            .finish()
    }
}

impl ServiceCore {
    fn strong(&self) -> Option<Arc<ServiceCore>> {
        self.me.upgrade()
    }

    fn listener(&self) -> Option<Arc<dyn ThingRegistryChangeListener>> {
        self.strong().map(|core| core as Arc<dyn ThingRegistryChangeListener>)
    }

    fn callback(&self) -> Option<Arc<dyn ChildDiscoveryCallback>> {
        self.strong().map(|core| core as Arc<dyn ChildDiscoveryCallback>)
    }

    fn thing_registry(&self) -> Option<Arc<dyn ThingRegistry>> {
        self.thing_registry.read().clone()
    }

    /// All bridges currently known; `None` without a registry.
    fn bridges(&self) -> Option<Vec<Bridge>> {
        let registry = self.thing_registry()?;
        Some(registry.things().iter().filter_map(Thing::as_bridge).collect())
    }

    /// Guarded call of `module` for `bridge`, or `None` when the module does
    /// not handle this bridge type or no safe caller is wired.
    fn invocation(
        &self,
        module: &Arc<dyn ChildDiscoveryModule>,
        bridge: &Bridge,
    ) -> Option<BoxFuture<'static, InvocationOutcome>> {
        if !supports(module.as_ref(), bridge) {
            trace!(module = module.name(), bridge = %bridge.uid, "bridge type not supported by module");
            return None;
        }
        let Some(caller) = self.safe_caller.read().clone() else {
            debug!(module = module.name(), bridge = %bridge.uid, "no safe caller wired; skipping discovery");
            return None;
        };
        let callback = self.callback()?;
        debug!(module = module.name(), bridge = %bridge.uid, "discovering children");
        Some(caller.invoke(
            Arc::clone(module),
            bridge.clone(),
            callback,
            self.config.module_timeout(),
        ))
    }

    /// Invocations of every registered module against `bridges`.
    fn invocations_for(
        &self,
        bridges: &[Bridge],
    ) -> Vec<BoxFuture<'static, InvocationOutcome>> {
        let modules = self.modules.snapshot();
        modules
            .iter()
            .flat_map(|module| bridges.iter().filter_map(move |bridge| self.invocation(module, bridge)))
            .collect()
    }

    /// Runs discovery for a bridge reported by the registry without blocking
    /// the notifying thread.
    fn spawn_bridge_discovery(
        &self,
        bridge: Bridge,
    ) {
        let invocations = self.invocations_for(std::slice::from_ref(&bridge));
        if invocations.is_empty() {
            return;
        }
        self.runtime.spawn(async move {
            let outcomes = join_all(invocations).await;
            let summary = ScanSummary::from_outcomes(&outcomes);
            debug!(bridge = %bridge.uid, ?summary, "registry triggered discovery finished");
        });
    }

    fn subscribe(&self) {
        let Some(registry) = self.thing_registry() else {
            debug!("no thing registry wired; not subscribing to registry changes");
            return;
        };
        let Some(listener) = self.listener() else {
            return;
        };
        let mut subscription = self.subscription.lock();
        if subscription.is_none() {
            registry.add_registry_change_listener(listener);
            *subscription = Some(registry);
            debug!("subscribed to thing registry changes");
        }
    }

    fn unsubscribe(&self) {
        let mut subscription = self.subscription.lock();
        let Some(registry) = subscription.take() else {
            return;
        };
        if let Some(listener) = self.listener() {
            registry.remove_registry_change_listener(&listener);
            debug!("unsubscribed from thing registry changes");
        }
    }

    /// Subscribes while background discovery is enabled or a scan session
    /// is open, unsubscribes otherwise. Callers hold the `scan_session`
    /// lock, so the decision and the registration happen as one step.
    fn sync_subscription(
        &self,
        session: &Option<ScanSession>,
    ) {
        if self.background_discovery.load(Ordering::Acquire) || session.is_some() {
            self.subscribe();
        } else {
            self.unsubscribe();
        }
    }

    /// Both the thing registry and the safe caller are wired
    fn is_wired(&self) -> bool {
        self.thing_registry.read().is_some() && self.safe_caller.read().is_some()
    }

    fn retract_children_of(
        &self,
        bridge_uid: &ThingUid,
    ) {
        let children = self.publisher.results_for_bridge(bridge_uid);
        debug!(bridge = %bridge_uid, "bridge removed; retracting {} child result(s)", children.len());
        for child in &children {
            self.thing_removed(child);
        }
        // Results published under the bridge's own uid
        self.thing_removed(bridge_uid);
    }
}

impl ChildDiscoveryCallback for ServiceCore {
    fn thing_discovered(
        &self,
        result: DiscoveryResult,
    ) {
        trace!(uid = %result.thing_uid(), "thing discovered");
        self.publisher.publish(result);
    }

    fn thing_removed(
        &self,
        thing_uid: &ThingUid,
    ) {
        if self.publisher.retract(thing_uid) {
            trace!(uid = %thing_uid, "thing removed");
        }
    }
}

impl ThingRegistryChangeListener for ServiceCore {
    fn added(
        &self,
        thing: &Thing,
    ) {
        match thing.as_bridge() {
            Some(bridge) => self.spawn_bridge_discovery(bridge),
            None => trace!(uid = %thing.uid, "ignoring non-bridge thing"),
        }
    }

    fn removed(
        &self,
        thing: &Thing,
    ) {
        if thing.is_bridge() {
            self.retract_children_of(&thing.uid);
        }
    }

    /// Any update re-runs discovery, relevant or not
    fn updated(
        &self,
        _old_thing: &Thing,
        thing: &Thing,
    ) {
        self.added(thing);
    }
}

/// Discovery service finding children of bridges through pluggable modules.
///
/// Cheap to clone; all clones share one [`ServiceCore`].
///
/// ## Example
/// ```ignore
/// let store = Arc::new(InMemoryResultStore::new());
/// let service = ChildDiscoveryService::new(config.child, store.clone())?;
/// service.add_module(Arc::new(MyHueLights::default())).await;
/// let handle = service
///     .start(ServiceDependencies::new(registry, Arc::new(ThreadSafeCaller::new())))
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct ChildDiscoveryService {
    core: Arc<ServiceCore>,
}

impl ChildDiscoveryService {
    /// Must be called from within a tokio runtime; registry triggered
    /// discovery is spawned onto it.
    pub fn new(
        config: ChildDiscoveryConfig,
        publisher: Arc<dyn DiscoveryResultPublisher>,
    ) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| SystemError::RuntimeUnavailable)?;
        let background = config.background_discovery;
        let core = Arc::new_cyclic(|me| ServiceCore {
            config,
            modules: ModuleRegistry::new(),
            thing_registry: RwLock::new(None),
            safe_caller: RwLock::new(None),
            publisher,
            background_discovery: AtomicBool::new(background),
            subscription: Mutex::new(None),
            scan_session: Mutex::new(None),
            runtime,
            me: me.clone(),
        });
        Ok(Self { core })
    }

    pub fn config(&self) -> &ChildDiscoveryConfig {
        &self.core.config
    }

    pub fn publisher(&self) -> &Arc<dyn DiscoveryResultPublisher> {
        &self.core.publisher
    }

    /// The callback modules report through
    pub fn callback(&self) -> Arc<dyn ChildDiscoveryCallback> {
        Arc::clone(&self.core) as Arc<dyn ChildDiscoveryCallback>
    }

    /// The listener this service subscribes to the thing registry
    pub fn listener(&self) -> Arc<dyn ThingRegistryChangeListener> {
        Arc::clone(&self.core) as Arc<dyn ThingRegistryChangeListener>
    }

    //-----------------------------------------------------------
    // Late-bound dependencies

    pub fn set_thing_registry(
        &self,
        registry: Arc<dyn ThingRegistry>,
    ) {
        self.unset_thing_registry();
        *self.core.thing_registry.write() = Some(registry);
        let session = self.core.scan_session.lock();
        self.core.sync_subscription(&session);
    }

    pub fn unset_thing_registry(&self) {
        self.core.unsubscribe();
        *self.core.thing_registry.write() = None;
    }

    pub fn set_safe_caller(
        &self,
        caller: Arc<dyn SafeCaller>,
    ) {
        *self.core.safe_caller.write() = Some(caller);
    }

    pub fn unset_safe_caller(&self) {
        *self.core.safe_caller.write() = None;
    }

    //-----------------------------------------------------------
    // Modules

    /// Registers `module`. With background discovery enabled, the module is
    /// immediately run against every known bridge of a type it supports;
    /// the returned future resolves once those calls finished or timed out.
    ///
    /// Returns `false` if the module instance was already registered (no
    /// discovery is triggered then).
    pub async fn add_module(
        &self,
        module: Arc<dyn ChildDiscoveryModule>,
    ) -> bool {
        if !self.core.modules.add(Arc::clone(&module)) {
            debug!(module = module.name(), "module already registered");
            return false;
        }
        info!(module = module.name(), "discovery module registered");

        if !self.is_background_discovery_enabled() {
            return true;
        }
        let Some(bridges) = self.core.bridges() else {
            return true;
        };
        let invocations: Vec<_> = bridges
            .iter()
            .filter_map(|bridge| self.core.invocation(&module, bridge))
            .collect();
        let outcomes = join_all(invocations).await;
        debug!(
            module = module.name(),
            summary = ?ScanSummary::from_outcomes(&outcomes),
            "initial discovery for new module finished"
        );
        true
    }

    /// Stops asking `module`; results it already reported stay published.
    pub fn remove_module(
        &self,
        module: &Arc<dyn ChildDiscoveryModule>,
    ) -> bool {
        let removed = self.core.modules.remove(module);
        if removed {
            info!(module = module.name(), "discovery module unregistered");
        }
        removed
    }

    pub fn modules(&self) -> &ModuleRegistry {
        &self.core.modules
    }

    /// Union of the bridge types the registered modules support
    pub fn supported_thing_types(&self) -> HashSet<ThingTypeUid> {
        self.core.modules.supported_types()
    }

    //-----------------------------------------------------------
    // Scanning

    /// Opens a scan session (or joins the one already open), runs every
    /// module against every supported bridge and subscribes to registry
    /// changes while the session is open.
    ///
    /// Resolves once all invocations completed, failed or timed out. Without
    /// a wired thing registry and safe caller no session is opened, so the
    /// following `stop_scan` retracts nothing.
    pub async fn start_scan(&self) -> ScanSummary {
        if !self.core.is_wired() {
            debug!("thing registry or safe caller not wired; scan does nothing");
            return ScanSummary::default();
        }
        {
            let mut session = self.core.scan_session.lock();
            if session.is_some() {
                debug!("scan session already open; joining it");
            } else {
                *session = Some(ScanSession::begin());
            }
        }

        let Some(bridges) = self.core.bridges() else {
            debug!("thing registry unwired during scan start");
            return ScanSummary::default();
        };
        let invocations = self.core.invocations_for(&bridges);
        {
            let session = self.core.scan_session.lock();
            self.core.sync_subscription(&session);
        }

        debug!(
            bridges = bridges.len(),
            modules = self.core.modules.len(),
            "scan started with {} invocation(s)",
            invocations.len()
        );
        let outcomes = join_all(invocations).await;
        ScanSummary::from_outcomes(&outcomes)
    }

    /// Closes the open scan session and retracts every published result not
    /// refreshed since the session started. Unsubscribes from registry
    /// changes unless background discovery is enabled.
    ///
    /// Returns the retracted uids. Without an open session (no scan
    /// started, or the scan found its dependencies missing) nothing is
    /// retracted.
    pub fn stop_scan(&self) -> Vec<ThingUid> {
        let retracted = {
            let mut session = self.core.scan_session.lock();
            let retracted = match session.take() {
                Some(s) => {
                    let mut retracted = self.core.publisher.retract_older_than(s.started_at());
                    retracted.extend(self.core.publisher.retract_expired(Instant::now()));
                    retracted
                }
                None => {
                    debug!("stop_scan without open scan session");
                    Vec::new()
                }
            };
            self.core.sync_subscription(&session);
            retracted
        };

        if !retracted.is_empty() {
            info!("scan retracted {} stale result(s)", retracted.len());
        }
        retracted
    }

    /// Full manual scan: start, wait for the invocations and for the
    /// configured scan window, then stop.
    pub async fn scan(&self) -> ScanSummary {
        let started = Instant::now();
        let mut summary = self.start_scan().await;

        let window = self.core.config.scan_timeout();
        let elapsed = started.elapsed();
        if window > elapsed {
            tokio::time::sleep(window - elapsed).await;
        }

        summary.retracted = self.stop_scan().len();
        info!(?summary, "scan finished");
        summary
    }

    pub fn is_scanning(&self) -> bool {
        self.core.scan_session.lock().is_some()
    }

    //-----------------------------------------------------------
    // Background discovery

    pub fn start_background_discovery(&self) {
        self.core.background_discovery.store(true, Ordering::Release);
        let session = self.core.scan_session.lock();
        self.core.sync_subscription(&session);
        info!("background discovery started");
    }

    /// Keeps the registry subscription while a scan session is open; the
    /// scan's `stop_scan` drops it.
    pub fn stop_background_discovery(&self) {
        self.core.background_discovery.store(false, Ordering::Release);
        let session = self.core.scan_session.lock();
        self.core.sync_subscription(&session);
        info!("background discovery stopped");
    }

    pub fn is_background_discovery_enabled(&self) -> bool {
        self.core.background_discovery.load(Ordering::Acquire)
    }

    /// Whether this service currently listens to registry changes
    pub fn is_subscribed(&self) -> bool {
        self.core.subscription.lock().is_some()
    }

    /// Closes the open session without cleaning up stale results
    pub(crate) fn abandon_scan(&self) {
        if self.core.scan_session.lock().take().is_some() {
            debug!("scan session abandoned");
        }
    }

    pub(crate) fn force_unsubscribe(&self) {
        self.core.unsubscribe();
    }
}
