#[cfg(test)]
use mockall::automock;

use crate::DiscoveryResult;
use crate::ThingUid;

/// Sink a [`crate::ChildDiscoveryModule`] reports its findings into.
///
/// Implementations accept calls from any thread at any time, including long
/// after the `create_results` call that handed out the callback returned:
/// modules may keep it and report from their own bridge listeners.
#[cfg_attr(test, automock)]
pub trait ChildDiscoveryCallback: Send + Sync {
    /// A child was found, or an already reported child changed
    fn thing_discovered(
        &self,
        result: DiscoveryResult,
    );

    /// A previously reported child is gone
    fn thing_removed(
        &self,
        thing_uid: &ThingUid,
    );
}
