//! # Item Template Saga
//!
//! Creates a template item and its variants in the ERP.
//!
//! ```text
//! validate (no I/O)
//!     │
//!     ▼
//! Item Attribute "Size" ──► Item "KOPI" (has_variants)
//!                                │
//!            ┌───────────────────┼───────────────────┐
//!            ▼                   ▼                   ▼
//!     Item KOPI-S + price  Item KOPI-M + price  Item KOPI-L + price
//!            └───────────────────┼───────────────────┘
//!                                ▼  (first failure wins)
//!                 Stock Entry (Material Receipt, stocked variants)
//! ```
//!
//! There is no rollback. A failure reports the step that broke; documents
//! created before it stay in the ERP.

use futures::future::try_join_all;
use serde::Serialize;
use tracing::{debug, error, info};

use kopi_core::{NewItemSpec, VariantSpec};
use kopi_gateway::{ErpGateway, NewItem, StockLine};

use crate::error::{CheckoutError, CheckoutResult};

/// Documents created by a successful saga.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryReport {
    pub attribute: String,
    pub template: String,
    /// `(item, price)` names, in the order of the input variants.
    pub variants: Vec<(String, String)>,
    /// `None` when no variant carries opening stock.
    pub stock_entry: Option<String>,
}

/// Creates the attribute, template, variants and opening stock for `spec`.
///
/// ## Errors
/// - `Rule` if the item definition is invalid (nothing is written)
/// - `Step` naming the first ERP call that failed
pub async fn create_item_with_variants(
    erp: &dyn ErpGateway,
    spec: &NewItemSpec,
) -> CheckoutResult<InventoryReport> {
    spec.validate()?;
    let template_code = spec.template_code.trim();
    info!(
        template = template_code,
        variants = spec.variants.len(),
        "Creating item template"
    );

    let values: Vec<(String, String)> = spec
        .variants
        .iter()
        .map(|v| (v.value.trim().to_string(), v.abbr.trim().to_string()))
        .collect();
    let attribute = erp
        .create_item_attribute(spec.attribute.trim(), &values)
        .await
        .map_err(|e| fail("create item attribute", e))?;
    debug!(%attribute, "Item attribute created");

    let template = NewItem {
        item_code: template_code.to_string(),
        item_name: spec.template_name.trim().to_string(),
        item_group: spec.item_group.clone(),
        stock_uom: spec.stock_uom.clone(),
        has_variants: true,
        variant_of: None,
        attributes: vec![(attribute.clone(), None)],
    };
    let template = erp
        .create_item(&template)
        .await
        .map_err(|e| fail("create template item", e))?;
    info!(%template, "Template item created");

    let variants = try_join_all(
        spec.variants
            .iter()
            .map(|variant| create_variant(erp, spec, &attribute, &template, variant)),
    )
    .await?;

    let lines: Vec<StockLine> = spec
        .stocked_variants()
        .map(|v| StockLine {
            item_code: spec.variant_code(v),
            qty: v.opening_qty,
        })
        .collect();
    let stock_entry = if lines.is_empty() {
        debug!(%template, "No opening stock, skipping stock entry");
        None
    } else {
        let entry = erp
            .create_stock_entry(&lines)
            .await
            .map_err(|e| fail("create stock entry", e))?;
        info!(%template, %entry, lines = lines.len(), "Opening stock received");
        Some(entry)
    };

    Ok(InventoryReport {
        attribute,
        template,
        variants,
        stock_entry,
    })
}

async fn create_variant(
    erp: &dyn ErpGateway,
    spec: &NewItemSpec,
    attribute: &str,
    template: &str,
    variant: &VariantSpec,
) -> CheckoutResult<(String, String)> {
    let code = spec.variant_code(variant);
    let item = NewItem {
        item_code: code.clone(),
        item_name: format!("{} {}", spec.template_name.trim(), variant.value.trim()),
        item_group: spec.item_group.clone(),
        stock_uom: spec.stock_uom.clone(),
        has_variants: false,
        variant_of: Some(template.to_string()),
        attributes: vec![(attribute.to_string(), Some(variant.value.trim().to_string()))],
    };
    let item = erp
        .create_item(&item)
        .await
        .map_err(|e| fail(format!("create variant {code}"), e))?;
    let price = erp
        .create_item_price(&item, variant.price)
        .await
        .map_err(|e| fail(format!("create price for {code}"), e))?;
    debug!(%item, %price, rate = %variant.price, "Variant created");
    Ok((item, price))
}

fn fail(step: impl ToString, source: kopi_gateway::GatewayError) -> CheckoutError {
    let status = source.status();
    let err = CheckoutError::step(step, source);
    error!(error = %err, ?status, "Item template saga aborted");
    err
}

// =============================================================================
// Unit Tests
// =============================================================================
