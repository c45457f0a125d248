//! Expense model

use serde::{Deserialize, Serialize};

use super::entity::remap_id;
use super::{Entity, EntityId, EntityKind, EntityMeta, IdRemap};
use crate::{Error, Result};

/// A monetary record within a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    #[serde(flatten)]
    pub meta: EntityMeta,
    /// Owning category
    pub category_id: EntityId,
    /// Trip the category belongs to, kept for trip-wide totals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_id: Option<EntityId>,
    pub description: String,
    pub amount: f64,
    /// ISO-4217 code of `amount`
    pub currency: String,
    /// Amount before conversion to the base currency
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_currency: Option<String>,
    /// Why a conversion to the base currency did not happen
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversion_error: Option<String>,
}

impl Expense {
    #[must_use]
    pub fn new(
        category_id: EntityId,
        description: impl Into<String>,
        amount: f64,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            meta: EntityMeta::new_local(),
            category_id,
            travel_id: None,
            description: description.into(),
            amount,
            currency: currency.into(),
            original_amount: None,
            original_currency: None,
            conversion_error: None,
        }
    }

    #[must_use]
    pub fn with_travel_id(mut self, travel_id: EntityId) -> Self {
        self.travel_id = Some(travel_id);
        self
    }

    /// Whether the amount was converted from another currency.
    #[must_use]
    pub const fn is_converted(&self) -> bool {
        self.original_amount.is_some()
    }
}

/// Partial update of an expense
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpensePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

impl Entity for Expense {
    type Patch = ExpensePatch;

    const KIND: EntityKind = EntityKind::Expense;

    fn meta(&self) -> &EntityMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut EntityMeta {
        &mut self.meta
    }

    fn parent_id(&self) -> Option<&EntityId> {
        Some(&self.category_id)
    }

    fn references(&self) -> Vec<&EntityId> {
        let mut references = vec![&self.category_id];
        references.extend(self.travel_id.as_ref());
        references
    }

    fn remap_references(&mut self, remap: &IdRemap) -> bool {
        let category_changed = remap_id(&mut self.category_id, remap);
        let travel_changed = self
            .travel_id
            .as_mut()
            .is_some_and(|travel_id| remap_id(travel_id, remap));
        category_changed || travel_changed
    }

    fn validate_relations(&self) -> Result<()> {
        if self.category_id.value().trim().is_empty() {
            return Err(Error::Validation(
                "Expense must have a category_id".to_string(),
            ));
        }
        if !self.amount.is_finite() {
            return Err(Error::Validation("Expense amount must be a number".to_string()));
        }
        if self.currency.trim().is_empty() {
            return Err(Error::Validation("Expense currency is required".to_string()));
        }
        Ok(())
    }

    fn validate_form(&self) -> Result<()> {
        if self.description.trim().is_empty() {
            return Err(Error::Validation(
                "Expense description is required".to_string(),
            ));
        }
        if !self.amount.is_finite() || self.amount.abs() < f64::EPSILON {
            return Err(Error::Validation("Invalid expense amount".to_string()));
        }
        self.validate_relations()
    }

    fn content_key(&self) -> String {
        format!(
            "{}|{}|{}",
            self.description, self.category_id, self.meta.created_at
        )
    }

    fn apply_patch(&mut self, patch: &ExpensePatch) {
        if let Some(description) = &patch.description {
            self.description.clone_from(description);
        }
        if let Some(amount) = patch.amount {
            self.amount = amount;
        }
        if let Some(currency) = &patch.currency {
            self.currency.clone_from(currency);
        }
    }
}
