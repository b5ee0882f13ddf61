use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use parking_lot::Mutex;

use crate::ChildDiscoveryCallback;
use crate::DiscoveryResult;
use crate::DiscoveryResultBuilder;
use crate::Thing;
use crate::ThingKind;
use crate::ThingTypeUid;
use crate::ThingUid;

pub(crate) fn bridge_type() -> ThingTypeUid {
    ThingTypeUid::new("hue", "bridge").unwrap()
}

pub(crate) fn other_bridge_type() -> ThingTypeUid {
    ThingTypeUid::new("zwave", "controller").unwrap()
}

pub(crate) fn light_type() -> ThingTypeUid {
    ThingTypeUid::new("hue", "0210").unwrap()
}

pub(crate) fn bridge_uid(id: &str) -> ThingUid {
    ThingUid::new(&bridge_type(), id).unwrap()
}

pub(crate) fn bridge_thing(id: &str) -> Thing {
    Thing::new(bridge_uid(id), ThingKind::Bridge).with_label(format!("Bridge {}", id))
}

pub(crate) fn bridge_thing_of_type(
    thing_type: &ThingTypeUid,
    id: &str,
) -> Thing {
    Thing::new(ThingUid::new(thing_type, id).unwrap(), ThingKind::Bridge)
}

/// A plain (non-bridge) thing
pub(crate) fn plain_thing(id: &str) -> Thing {
    Thing::new(ThingUid::new(&light_type(), id).unwrap(), ThingKind::Thing)
}

pub(crate) fn child_uid(
    bridge: &ThingUid,
    key: &str,
) -> ThingUid {
    ThingUid::child(&light_type(), bridge, key).unwrap()
}

pub(crate) fn child_result(
    bridge: &ThingUid,
    key: &str,
) -> DiscoveryResult {
    DiscoveryResultBuilder::create(child_uid(bridge, key))
        .with_bridge(bridge.clone())
        .with_property("lightId", key)
        .with_property("uniqueId", format!("{}-{}", bridge.id(), key))
        .with_representation_property("uniqueId")
        .with_label(format!("Light {}", key))
        .build()
}

/// Polls `condition` until it holds or `timeout` elapses.
pub(crate) async fn wait_until<F>(
    timeout: Duration,
    mut condition: F,
) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CallbackEvent {
    Discovered(ThingUid),
    Removed(ThingUid),
}

/// Callback that only records what it was told
#[derive(Debug, Default)]
pub(crate) struct RecordingCallback {
    events: Mutex<Vec<CallbackEvent>>,
}

impl RecordingCallback {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn discovered(&self) -> Vec<ThingUid> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                CallbackEvent::Discovered(uid) => Some(uid.clone()),
                CallbackEvent::Removed(_) => None,
            })
            .collect()
    }
}

impl ChildDiscoveryCallback for RecordingCallback {
    fn thing_discovered(
        &self,
        result: DiscoveryResult,
    ) {
        self.events
            .lock()
            .push(CallbackEvent::Discovered(result.thing_uid().clone()));
    }

    fn thing_removed(
        &self,
        thing_uid: &ThingUid,
    ) {
        self.events.lock().push(CallbackEvent::Removed(thing_uid.clone()));
    }
}
