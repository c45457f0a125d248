//! Category model

use serde::{Deserialize, Serialize};

use super::entity::remap_id;
use super::{Entity, EntityId, EntityKind, EntityMeta, IdRemap};
use crate::{Error, Result};

/// Grouping of expenses within a trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(flatten)]
    pub meta: EntityMeta,
    /// Owning trip
    pub travel_id: EntityId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Category {
    #[must_use]
    pub fn new(travel_id: EntityId, name: impl Into<String>) -> Self {
        Self {
            meta: EntityMeta::new_local(),
            travel_id,
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

/// Partial update of a category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Entity for Category {
    type Patch = CategoryPatch;

    const KIND: EntityKind = EntityKind::Category;

    fn meta(&self) -> &EntityMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut EntityMeta {
        &mut self.meta
    }

    fn parent_id(&self) -> Option<&EntityId> {
        Some(&self.travel_id)
    }

    fn remap_references(&mut self, remap: &IdRemap) -> bool {
        remap_id(&mut self.travel_id, remap)
    }

    fn validate_relations(&self) -> Result<()> {
        if self.travel_id.value().trim().is_empty() {
            return Err(Error::Validation(
                "Category must have a travel_id".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_form(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("Category name is required".to_string()));
        }
        self.validate_relations()
    }

    fn content_key(&self) -> String {
        format!("{}|{}|{}", self.name, self.travel_id, self.meta.created_at)
    }

    fn apply_patch(&mut self, patch: &CategoryPatch) {
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

    #[test]
    fn test_remap_travel_id() {
        let trip_local = EntityId::new_local();
        let trip_remote = EntityId::remote("TtTtTtTtTtTtTtTtTtTt");
        let mut category = Category::new(trip_local.clone(), "Food");
        let before = category.content_key();

        let remap = IdRemap::from([(trip_local, trip_remote.clone())]);
        assert!(category.remap_references(&remap));
        assert_eq!(category.travel_id, trip_remote);
        assert!(!category.has_local_references());
        assert_ne!(category.content_key(), before);
    }

    #[test]
    fn test_form_requires_name() {
        let category = Category::new(EntityId::new_local(), "");
        assert!(matches!(category.validate_form(), Err(Error::Validation(_))));
        assert!(category.validate_relations().is_ok());
    }
}
