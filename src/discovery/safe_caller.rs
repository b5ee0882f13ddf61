//! Timeout and fault isolation around [`ChildDiscoveryModule::create_results`].
//!
//! Module code is foreign to the service: it may block on a device that never
//! answers, return an error or panic. [`ThreadSafeCaller`] runs every call on
//! its own OS thread and races the result against a timer:
//!
//! - the caller never waits longer than the given timeout
//! - errors and panics are turned into [`InvocationOutcome::Failed`]
//! - callback invocations the module made before failing or timing out stay
//!   valid discovery events
//!
//! A timed out call is *not* cancelled. Its thread is detached and finishes
//! (or hangs) in the background; anything it reports later is still accepted.
//! Using detached threads instead of `spawn_blocking` keeps a hung module from
//! blocking runtime shutdown.
//!
//! A module that hangs forever therefore leaks one thread per invocation,
//! i.e. one per scan and per registry add/update of its bridges. The number
//! of calls still running is exposed by [`ThreadSafeCaller::outstanding`]
//! and logged with every timeout.

use std::any::Any;
use std::fmt;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
#[cfg(test)]
use mockall::automock;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::debug;
use tracing::warn;

use crate::Bridge;
use crate::ChildDiscoveryCallback;
use crate::ChildDiscoveryModule;
use crate::MODULE_THREAD_NAME;

/// How a guarded module call ended, from the caller's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationOutcome {
    Completed,
    /// The caller stopped waiting; the module may still be running
    TimedOut(Duration),
    /// The module returned an error or panicked
    Failed(String),
}

impl InvocationOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, InvocationOutcome::Completed)
    }
}

impl fmt::Display for InvocationOutcome {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            InvocationOutcome::Completed => write!(f, "completed"),
            InvocationOutcome::TimedOut(d) => write!(f, "timed out after {:?}", d),
            InvocationOutcome::Failed(cause) => write!(f, "failed: {}", cause),
        }
    }
}

#[cfg_attr(test, automock)]
pub trait SafeCaller: Send + Sync {
    /// Runs `module.create_results(bridge, callback)`; resolves after at most `timeout`.
    fn invoke(
        &self,
        module: Arc<dyn ChildDiscoveryModule>,
        bridge: Bridge,
        callback: Arc<dyn ChildDiscoveryCallback>,
        timeout: Duration,
    ) -> BoxFuture<'static, InvocationOutcome>;
}

/// [`SafeCaller`] backed by one detached OS thread per invocation.
///
/// Clones share the outstanding call counter.
#[derive(Debug, Default, Clone)]
pub struct ThreadSafeCaller {
    outstanding: Arc<AtomicUsize>,
}

impl ThreadSafeCaller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Module calls whose thread has not returned yet, including calls the
    /// caller already gave up on.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }
}

/// Decrements the outstanding counter when the module thread ends.
struct OutstandingGuard(Arc<AtomicUsize>);

impl Drop for OutstandingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl SafeCaller for ThreadSafeCaller {
    fn invoke(
        &self,
        module: Arc<dyn ChildDiscoveryModule>,
        bridge: Bridge,
        callback: Arc<dyn ChildDiscoveryCallback>,
        timeout_duration: Duration,
    ) -> BoxFuture<'static, InvocationOutcome> {
        let module_name = module.name().to_string();
        let bridge_uid = bridge.uid.clone();
        let (tx, rx) = oneshot::channel();
        let outstanding = Arc::clone(&self.outstanding);
        outstanding.fetch_add(1, Ordering::AcqRel);
        let guard = OutstandingGuard(Arc::clone(&outstanding));

        let spawned = thread::Builder::new()
            .name(MODULE_THREAD_NAME.to_string())
            .spawn(move || {
                let outcome = match panic::catch_unwind(AssertUnwindSafe(|| module.create_results(&bridge, callback))) {
                    Ok(Ok(())) => InvocationOutcome::Completed,
                    Ok(Err(e)) => InvocationOutcome::Failed(e.to_string()),
                    Err(payload) => InvocationOutcome::Failed(panic_message(payload.as_ref())),
                };
                drop(guard);
                // Receiver is gone once the caller timed out
                let _ = tx.send(outcome);
            });

        async move {
            if let Err(e) = spawned {
                warn!(module = %module_name, bridge = %bridge_uid, "failed to spawn module thread: {}", e);
                return InvocationOutcome::Failed(format!("failed to spawn module thread: {}", e));
            }

            let outcome = match timeout(timeout_duration, rx).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(_)) => InvocationOutcome::Failed("module thread exited without reporting".to_string()),
                Err(_) => InvocationOutcome::TimedOut(timeout_duration),
            };

            match &outcome {
                InvocationOutcome::Completed => {
                    debug!(module = %module_name, bridge = %bridge_uid, "create_results completed");
                }
                InvocationOutcome::TimedOut(_) => {
                    warn!(
                        module = %module_name,
                        bridge = %bridge_uid,
                        outstanding = outstanding.load(Ordering::Acquire),
                        "create_results {}; module thread left running",
                        outcome
                    );
                }
                InvocationOutcome::Failed(_) => {
                    warn!(module = %module_name, bridge = %bridge_uid, "create_results {}", outcome);
                }
            }
            outcome
        }
        .boxed()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}
