//! Trip model

use serde::{Deserialize, Serialize};

use super::{Entity, EntityKind, EntityMeta};
use crate::{Error, Result};

/// Top-level grouping owned by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trip {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Trip {
    /// Create a new, not yet persisted trip
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            meta: EntityMeta::new_local(),
            name: name.into(),
            color: None,
        }
    }

    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// Partial update of a trip
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Entity for Trip {
    type Patch = TripPatch;

    const KIND: EntityKind = EntityKind::Trip;

    fn meta(&self) -> &EntityMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut EntityMeta {
        &mut self.meta
    }

    fn parent_id(&self) -> Option<&super::EntityId> {
        None
    }

    fn validate_relations(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("Trip name is required".to_string()));
        }
        Ok(())
    }

    fn validate_form(&self) -> Result<()> {
        self.validate_relations()
    }

    fn content_key(&self) -> String {
        format!("{}|{}", self.name, self.meta.created_at)
    }

    fn apply_patch(&mut self, patch: &TripPatch) {
        if let Some(name) = &patch.name {
            self.name.clone_from(name);
        }
        if let Some(color) = &patch.color {
            self.color = Some(color.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SyncState;

    #[test]
    fn test_trip_new() {
        let trip = Trip::new("Lisbon").with_color("#ff8800");
        assert_eq!(trip.name, "Lisbon");
        assert_eq!(trip.color.as_deref(), Some("#ff8800"));
        assert!(trip.meta.id.is_local());
        assert_eq!(trip.meta.sync_state, SyncState::LocalUnsynced);
        assert!(trip.meta.created_at > 0);
    }

    #[test]
    fn test_blank_name_is_rejected() {
        let trip = Trip::new("   ");
        assert!(matches!(trip.validate_form(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_apply_patch_keeps_unset_fields() {
        let mut trip = Trip::new("Lisbon").with_color("#ff8800");
        trip.apply_patch(&TripPatch {
            name: Some("Porto".to_string()),
            color: None,
        });
        assert_eq!(trip.name, "Porto");
        assert_eq!(trip.color.as_deref(), Some("#ff8800"));
    }

    #[test]
    fn test_flattened_serialization() {
        let trip = Trip::new("Lisbon");
        let value = serde_json::to_value(&trip).unwrap();
        assert_eq!(value["name"], "Lisbon");
        assert_eq!(value["sync_state"], "local_unsynced");
        assert!(value["id"].as_str().unwrap().starts_with("local-"));

        let back: Trip = serde_json::from_value(value).unwrap();
        assert_eq!(back, trip);
    }
}
