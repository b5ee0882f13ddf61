use std::fmt;
use std::str::FromStr;

use crate::ModelError;

pub(crate) const SEPARATOR: char = ':';

fn validate_segment(segment: &str) -> Result<(), ModelError> {
    if segment.is_empty() || !segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(ModelError::InvalidSegment(segment.to_string()));
    }
    Ok(())
}

/// Type tag of a thing, `<binding>:<type>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThingTypeUid {
    binding_id: String,
    id: String,
}

impl ThingTypeUid {
    pub fn new(
        binding_id: &str,
        id: &str,
    ) -> Result<Self, ModelError> {
        validate_segment(binding_id)?;
        validate_segment(id)?;
        Ok(Self {
            binding_id: binding_id.to_string(),
            id: id.to_string(),
        })
    }

    pub fn binding_id(&self) -> &str {
        &self.binding_id
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for ThingTypeUid {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}{}{}", self.binding_id, SEPARATOR, self.id)
    }
}

impl FromStr for ThingTypeUid {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(SEPARATOR) {
            Some((binding, id)) if !id.contains(SEPARATOR) => {
                Self::new(binding, id).map_err(|_| ModelError::InvalidThingTypeUid(s.to_string()))
            }
            _ => Err(ModelError::InvalidThingTypeUid(s.to_string())),
        }
    }
}

/// Identifier of a thing: `<binding>:<type>[:<bridge ids>...]:<id>`
///
/// Children discovered through a bridge embed the bridge's own id segments,
/// so the same child key on two bridges yields two distinct uids and the
/// same child on the same bridge always yields the same uid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThingUid {
    segments: Vec<String>,
}

impl ThingUid {
    pub fn new(
        thing_type: &ThingTypeUid,
        id: &str,
    ) -> Result<Self, ModelError> {
        validate_segment(id)?;
        Ok(Self {
            segments: vec![
                thing_type.binding_id().to_string(),
                thing_type.id().to_string(),
                id.to_string(),
            ],
        })
    }

    /// Derives the uid of a child of `bridge_uid` from its module-local key.
    pub fn child(
        thing_type: &ThingTypeUid,
        bridge_uid: &ThingUid,
        child_key: &str,
    ) -> Result<Self, ModelError> {
        validate_segment(child_key)?;
        let mut segments = Vec::with_capacity(bridge_uid.segments.len() + 1);
        segments.push(thing_type.binding_id().to_string());
        segments.push(thing_type.id().to_string());
        segments.extend(bridge_uid.id_path().iter().cloned());
        segments.push(child_key.to_string());
        Ok(Self { segments })
    }

    pub fn binding_id(&self) -> &str {
        &self.segments[0]
    }

    /// Thing type derived from the first two segments
    pub fn thing_type_uid(&self) -> ThingTypeUid {
        ThingTypeUid {
            binding_id: self.segments[0].clone(),
            id: self.segments[1].clone(),
        }
    }

    /// Last segment
    pub fn id(&self) -> &str {
        &self.segments[self.segments.len() - 1]
    }

    /// Segments after `<binding>:<type>`
    pub fn id_path(&self) -> &[String] {
        &self.segments[2..]
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for ThingUid {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", SEPARATOR)?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

impl FromStr for ThingUid {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments: Vec<String> = s.split(SEPARATOR).map(str::to_string).collect();
        if segments.len() < 3 || segments.iter().any(|seg| validate_segment(seg).is_err()) {
            return Err(ModelError::InvalidThingUid(s.to_string()));
        }
        Ok(Self { segments })
    }
}
