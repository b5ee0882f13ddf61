use std::collections::BTreeMap;

use crate::ThingTypeUid;
use crate::ThingUid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThingKind {
    Thing,
    /// A thing that can own child things
    Bridge,
}

/// Registry-managed entity.
///
/// Owned by the [`crate::ThingRegistry`]; the discovery service only reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thing {
    pub uid: ThingUid,
    pub thing_type_uid: ThingTypeUid,
    pub label: Option<String>,
    /// Parent bridge, if this thing is itself a child
    pub bridge_uid: Option<ThingUid>,
    pub properties: BTreeMap<String, String>,
    pub kind: ThingKind,
}

impl Thing {
    pub fn new(
        uid: ThingUid,
        kind: ThingKind,
    ) -> Self {
        Self {
            thing_type_uid: uid.thing_type_uid(),
            uid,
            label: None,
            bridge_uid: None,
            properties: BTreeMap::new(),
            kind,
        }
    }

    pub fn with_label(
        mut self,
        label: impl Into<String>,
    ) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_bridge(
        mut self,
        bridge_uid: ThingUid,
    ) -> Self {
        self.bridge_uid = Some(bridge_uid);
        self
    }

    pub fn with_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn is_bridge(&self) -> bool {
        self.kind == ThingKind::Bridge
    }

    /// Parent view of this thing; `None` for things that can not own children.
    pub fn as_bridge(&self) -> Option<Bridge> {
        if !self.is_bridge() {
            return None;
        }
        Some(Bridge {
            uid: self.uid.clone(),
            thing_type_uid: self.thing_type_uid.clone(),
            label: self.label.clone(),
            properties: self.properties.clone(),
        })
    }
}

/// Parent entity handed to discovery modules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bridge {
    pub uid: ThingUid,
    pub thing_type_uid: ThingTypeUid,
    pub label: Option<String>,
    pub properties: BTreeMap<String, String>,
}

impl Bridge {
    pub fn property(
        &self,
        key: &str,
    ) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}
