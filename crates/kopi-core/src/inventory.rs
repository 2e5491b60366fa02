//! # Inventory Module
//!
//! Input for creating a new item template with variants.
//!
//! ```text
//! NewItemSpec "KOPI" (attribute "Size")
//!   ├── Small  → KOPI-S   $1.60  opening 20
//!   ├── Medium → KOPI-M   $1.80  opening 20
//!   └── Large  → KOPI-L   $2.20  opening 10
//! ```
//!
//! Validation runs before the first ERP call; the saga itself lives in
//! the orchestrator.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::Money;
use crate::validation::{
    validate_item_code, validate_price, validate_unique, ValidationResult,
};
use crate::MAX_ITEM_QUANTITY;

/// One variant of a template item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSpec {
    /// Attribute value, e.g. "Large".
    pub value: String,

    /// Abbreviation appended to the template code, e.g. "L".
    pub abbr: String,

    /// Selling price for the configured price list.
    pub price: Money,

    /// Opening stock received into the warehouse.
    #[serde(default)]
    pub opening_qty: i64,
}

/// A template item with its variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItemSpec {
    pub template_code: String,
    pub template_name: String,
    pub item_group: String,

    #[serde(default = "default_uom")]
    pub stock_uom: String,

    /// Attribute name, e.g. "Size". Created if the ERP lacks it.
    pub attribute: String,

    pub variants: Vec<VariantSpec>,
}

fn default_uom() -> String {
    "Nos".to_string()
}

impl NewItemSpec {
    /// ERP item code of a variant: `<template>-<abbr>`.
    pub fn variant_code(&self, variant: &VariantSpec) -> String {
        format!("{}-{}", self.template_code.trim(), variant.abbr.trim())
    }

    /// Variants with a positive opening quantity (stock entry lines).
    pub fn stocked_variants(&self) -> impl Iterator<Item = &VariantSpec> {
        self.variants.iter().filter(|v| v.opening_qty > 0)
    }

    /// Validates the whole item definition.
    ///
    /// ## Rules
    /// - Template code, name, group and attribute are present
    /// - At least one variant
    /// - Variant values and abbreviations are unique
    /// - Prices and opening quantities are not negative
    pub fn validate(&self) -> ValidationResult<()> {
        validate_item_code(&self.template_code)?;
        for (field, value) in [
            ("template_name", &self.template_name),
            ("item_group", &self.item_group),
            ("attribute", &self.attribute),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::Required {
                    field: field.to_string(),
                });
            }
        }

        if self.variants.is_empty() {
            return Err(ValidationError::Required {
                field: "variants".to_string(),
            });
        }
        validate_unique("variant", self.variants.iter().map(|v| v.value.as_str()))?;
        validate_unique("variant abbreviation", self.variants.iter().map(|v| v.abbr.as_str()))?;

        for variant in &self.variants {
            if variant.value.trim().is_empty() || variant.abbr.trim().is_empty() {
                return Err(ValidationError::Required {
                    field: "variant value".to_string(),
                });
            }
            validate_item_code(&self.variant_code(variant))?;
            validate_price(variant.price)?;
            if !(0..=MAX_ITEM_QUANTITY).contains(&variant.opening_qty) {
                return Err(ValidationError::OutOfRange {
                    field: "opening_qty".to_string(),
                    min: 0,
                    max: MAX_ITEM_QUANTITY,
                });
            }
        }

        Ok(())
    }
}
