use std::collections::BTreeMap;
use std::time::Duration;

use crate::ThingTypeUid;
use crate::ThingUid;

/// Immutable record describing one discovered child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryResult {
    thing_uid: ThingUid,
    thing_type_uid: ThingTypeUid,
    bridge_uid: Option<ThingUid>,
    properties: BTreeMap<String, String>,
    label: String,
    representation_property: Option<String>,
    ttl: Option<Duration>,
}

impl DiscoveryResult {
    pub fn thing_uid(&self) -> &ThingUid {
        &self.thing_uid
    }

    pub fn thing_type_uid(&self) -> &ThingTypeUid {
        &self.thing_type_uid
    }

    pub fn bridge_uid(&self) -> Option<&ThingUid> {
        self.bridge_uid.as_ref()
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn representation_property(&self) -> Option<&str> {
        self.representation_property.as_deref()
    }

    /// Value of the representation property, used to spot the same physical
    /// device reported under a different uid.
    pub fn representation_value(&self) -> Option<&str> {
        self.representation_property
            .as_ref()
            .and_then(|key| self.properties.get(key))
            .map(String::as_str)
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }
}

/// Fluent constructor for [`DiscoveryResult`].
///
/// ```ignore
/// let result = DiscoveryResultBuilder::create(uid)
///     .with_bridge(bridge.uid.clone())
///     .with_property("uniqueId", "00:17:88:01")
///     .with_representation_property("uniqueId")
///     .with_label("Kitchen")
///     .build();
/// ```
#[derive(Debug)]
pub struct DiscoveryResultBuilder {
    thing_uid: ThingUid,
    thing_type_uid: Option<ThingTypeUid>,
    bridge_uid: Option<ThingUid>,
    properties: BTreeMap<String, String>,
    label: Option<String>,
    representation_property: Option<String>,
    ttl: Option<Duration>,
}

impl DiscoveryResultBuilder {
    pub fn create(thing_uid: ThingUid) -> Self {
        Self {
            thing_uid,
            thing_type_uid: None,
            bridge_uid: None,
            properties: BTreeMap::new(),
            label: None,
            representation_property: None,
            ttl: None,
        }
    }

    pub fn with_thing_type(
        mut self,
        thing_type_uid: ThingTypeUid,
    ) -> Self {
        self.thing_type_uid = Some(thing_type_uid);
        self
    }

    pub fn with_properties<I, K, V>(
        mut self,
        properties: I,
    ) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.properties
            .extend(properties.into_iter().map(|(k, v)| (k.into(), v.into())));
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

    pub fn with_bridge(
        mut self,
        bridge_uid: ThingUid,
    ) -> Self {
        self.bridge_uid = Some(bridge_uid);
        self
    }

    pub fn with_label(
        mut self,
        label: impl Into<String>,
    ) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_representation_property(
        mut self,
        key: impl Into<String>,
    ) -> Self {
        self.representation_property = Some(key.into());
        self
    }

    pub fn with_ttl(
        mut self,
        ttl: Duration,
    ) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn build(self) -> DiscoveryResult {
        let thing_type_uid = self
            .thing_type_uid
            .unwrap_or_else(|| self.thing_uid.thing_type_uid());
        let label = self.label.unwrap_or_else(|| self.thing_uid.to_string());
        DiscoveryResult {
            thing_uid: self.thing_uid,
            thing_type_uid,
            bridge_uid: self.bridge_uid,
            properties: self.properties,
            label,
            representation_property: self.representation_property,
            ttl: self.ttl,
        }
    }
}
