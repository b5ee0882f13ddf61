//! Downstream side: where discovered children are published to and retracted from.
mod result_store;
pub use result_store::*;


use std::time::Instant;

#[cfg(test)]
use mockall::automock;

use crate::DiscoveryResult;
use crate::ThingUid;

/// Change of the published result set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    /// New or refreshed result
    Discovered(DiscoveryResult),
    Removed(ThingUid),
}

#[cfg_attr(test, automock)]
pub trait DiscoveryResultPublisher: Send + Sync {
    /// Publishes `result`, replacing any result with the same thing uid.
    fn publish(
        &self,
        result: DiscoveryResult,
    );

    /// Returns `false` when nothing was published under `uid`.
    fn retract(
        &self,
        uid: &ThingUid,
    ) -> bool;

    /// Retracts every result last refreshed before `instant`.
    fn retract_older_than(
        &self,
        instant: Instant,
    ) -> Vec<ThingUid>;

    /// Retracts results whose ttl elapsed since their last refresh.
    fn retract_expired(
        &self,
        now: Instant,
    ) -> Vec<ThingUid>;

    /// Uids of published results whose bridge is `bridge_uid`
    fn results_for_bridge(
        &self,
        bridge_uid: &ThingUid,
    ) -> Vec<ThingUid>;

    fn results(&self) -> Vec<DiscoveryResult>;
}
