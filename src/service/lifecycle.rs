use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;
use tracing::warn;

use crate::ChildDiscoveryService;
use crate::Result;
use crate::SafeCaller;
use crate::ScanSummary;
use crate::ThingRegistry;

/// Collaborators wired into the service on start.
///
/// Both are optional: a service started without them stays idle (every
/// discovery path is a no-op) until they are provided through the setters on
/// [`ChildDiscoveryService`].
#[derive(Default, Clone)]
pub struct ServiceDependencies {
    pub thing_registry: Option<Arc<dyn ThingRegistry>>,
    pub safe_caller: Option<Arc<dyn SafeCaller>>,
}

impl std::fmt::Debug for ServiceDependencies {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ServiceDependencies")
            .field("thing_registry", &self.thing_registry.is_some())
            .field("safe_caller", &self.safe_caller.is_some())
            .finish()
    }
}

impl ServiceDependencies {
    pub fn new(
        thing_registry: Arc<dyn ThingRegistry>,
        safe_caller: Arc<dyn SafeCaller>,
    ) -> Self {
        Self {
            thing_registry: Some(thing_registry),
            safe_caller: Some(safe_caller),
        }
    }
}

/// A started [`ChildDiscoveryService`]. Dropping the handle does not stop
/// the service; call [`ServiceHandle::stop`].
#[derive(Debug)]
pub struct ServiceHandle {
    service: ChildDiscoveryService,
    initial_scan: Option<JoinHandle<ScanSummary>>,
}

impl ChildDiscoveryService {
    /// Wires `dependencies`, enables background discovery when configured
    /// and kicks off an initial scan in the background.
    pub async fn start(
        self,
        dependencies: ServiceDependencies,
    ) -> Result<ServiceHandle> {
        if let Some(caller) = dependencies.safe_caller {
            self.set_safe_caller(caller);
        }
        if let Some(registry) = dependencies.thing_registry {
            self.set_thing_registry(registry);
        } else {
            warn!("started without thing registry; discovery stays idle until one is set");
        }

        if self.config().background_discovery {
            self.start_background_discovery();
        }

        let scanner = self.clone();
        let initial_scan = tokio::spawn(async move { scanner.scan().await });

        info!(modules = self.modules().len(), "child discovery service started");
        Ok(ServiceHandle {
            service: self,
            initial_scan: Some(initial_scan),
        })
    }
}

impl ServiceHandle {
    pub fn service(&self) -> &ChildDiscoveryService {
        &self.service
    }

    /// Waits for the scan started by [`ChildDiscoveryService::start`].
    /// Returns `None` when it was already awaited or did not finish.
    pub async fn initial_scan(&mut self) -> Option<ScanSummary> {
        let handle = self.initial_scan.take()?;
        match handle.await {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!("initial scan did not finish: {}", e);
                None
            }
        }
    }

    /// Stops background discovery, drops the registry subscription and
    /// unwires the dependencies. Module calls still running are not
    /// interrupted.
    pub fn stop(mut self) {
        if let Some(scan) = self.initial_scan.take() {
            if !scan.is_finished() {
                scan.abort();
                self.service.abandon_scan();
            }
        }
        self.service.stop_background_discovery();
        self.service.force_unsubscribe();
        self.service.unset_thing_registry();
        self.service.unset_safe_caller();
        info!("child discovery service stopped");
    }
}
