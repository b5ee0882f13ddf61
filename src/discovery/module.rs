use std::collections::HashSet;
use std::sync::Arc;

use crate::Bridge;
use crate::ChildDiscoveryCallback;
use crate::ModuleError;
use crate::ThingTypeUid;

pub type ModuleResult = std::result::Result<(), ModuleError>;

/// Enumerates the children of one kind of bridge.
///
/// `create_results` may block, report synchronously or hand the callback to
/// its own listeners and report later. It is called again for the same
/// bridge on every scan and every registry add/update of that bridge, so it
/// must tolerate repeated invocation.
pub trait ChildDiscoveryModule: Send + Sync {
    /// Used in logs only
    fn name(&self) -> &str;

    /// Bridge types this module knows how to query
    fn supported_parent_types(&self) -> HashSet<ThingTypeUid>;

    fn create_results(
        &self,
        bridge: &Bridge,
        callback: Arc<dyn ChildDiscoveryCallback>,
    ) -> ModuleResult;
}

/// Whether `module` should be asked about `bridge`.
pub(crate) fn supports(
    module: &dyn ChildDiscoveryModule,
    bridge: &Bridge,
) -> bool {
    module.supported_parent_types().contains(&bridge.thing_type_uid)
}
