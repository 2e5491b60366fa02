//! # ERP Wire Format
//!
//! Serde shapes of the ERP REST resources Kopi reads and writes.
//!
//! ```text
//! GET  /api/resource/Sales Order/SAL-ORD-0001
//!  ◄── { "data": { "name": "SAL-ORD-0001", "items": [...], ... } }
//!
//! POST /api/resource/Sales Invoice   { ..., "docstatus": 1 }
//!  ◄── { "data": { "name": "ACC-SINV-0001", ... } }
//! ```
//!
//! Amounts on this side are decimal currency units. Conversion to and from
//! [`Money`] happens here and nowhere else.

use serde::{Deserialize, Serialize};

use kopi_core::{DiscountRate, Money, Order, OrderLine};

/// Custom check field marking the kitchen ticket as finalized.
pub const TICKET_COMPLETED_FIELD: &str = "custom_ticket_completed";

/// Custom check field marking invoice + payments as recorded.
pub const PAYMENT_COMPLETED_FIELD: &str = "custom_payment_completed";

/// Custom data field holding the comma-joined tender methods.
pub const PAYMENT_METHODS_FIELD: &str = "custom_payment_methods";

// =============================================================================
// Envelope
// =============================================================================

/// Every ERP resource response: `{"data": …}`.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// The part of a created document Kopi keeps: its name.
#[derive(Debug, Deserialize)]
pub struct NamedDoc {
    pub name: String,
}

/// Pulls the operator-facing message out of an ERP error body.
///
/// Preference: `_server_messages` (what the desk UI shows), then
/// `message`, then the last line of `exception`.
pub fn erp_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;

    if let Some(raw) = value.get("_server_messages").and_then(|v| v.as_str()) {
        let messages: Vec<String> = serde_json::from_str::<Vec<String>>(raw)
            .unwrap_or_default()
            .iter()
            .filter_map(|m| {
                serde_json::from_str::<serde_json::Value>(m)
                    .ok()
                    .and_then(|v| v.get("message").and_then(|s| s.as_str()).map(str::to_string))
            })
            .collect();
        if !messages.is_empty() {
            return Some(messages.join("; "));
        }
    }

    if let Some(message) = value.get("message").and_then(|v| v.as_str()) {
        if !message.trim().is_empty() {
            return Some(message.to_string());
        }
    }

    value
        .get("exception")
        .and_then(|v| v.as_str())
        .and_then(|e| e.lines().last())
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
}

// =============================================================================
// Sales Order
// =============================================================================

/// Frappe check fields arrive as 0/1.
fn is_set(flag: Option<i64>) -> bool {
    flag.unwrap_or(0) != 0
}

#[derive(Debug, Deserialize)]
pub struct SalesOrderItemDoc {
    pub item_code: String,
    #[serde(default)]
    pub item_name: Option<String>,
    #[serde(default)]
    pub qty: f64,
    #[serde(default)]
    pub rate: Option<f64>,
    #[serde(default)]
    pub price_list_rate: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct SalesOrderDoc {
    pub name: String,
    pub customer: String,
    #[serde(default)]
    pub items: Vec<SalesOrderItemDoc>,
    #[serde(default)]
    pub additional_discount_percentage: Option<f64>,
    #[serde(default)]
    pub custom_ticket_completed: Option<i64>,
    #[serde(default)]
    pub custom_payment_completed: Option<i64>,
}

impl SalesOrderDoc {
    /// Maps the ERP document to the domain order.
    ///
    /// A line's price is `rate`, falling back to `price_list_rate`; a line
    /// with neither keeps `None` and totals to zero.
    pub fn into_order(self) -> Order {
        Order {
            id: self.name,
            customer: self.customer,
            lines: self
                .items
                .into_iter()
                .map(|item| OrderLine {
                    item_code: item.item_code,
                    item_name: item.item_name,
                    qty: item.qty.round() as i64,
                    rate: item
                        .rate
                        .or(item.price_list_rate)
                        .map(Money::from_major_units),
                })
                .collect(),
            discount: DiscountRate::from_percentage(
                self.additional_discount_percentage.unwrap_or(0.0),
            ),
            completed: is_set(self.custom_ticket_completed),
            payment_completed: is_set(self.custom_payment_completed),
        }
    }
}

/// Row of the open-ticket listing.
#[derive(Debug, Clone, Deserialize)]
pub struct SalesOrderListRow {
    pub name: String,
    pub customer: String,
    #[serde(default)]
    pub grand_total: f64,
    #[serde(default)]
    pub transaction_date: Option<String>,
}

// =============================================================================
// Outgoing Documents
// =============================================================================

/// Line of a Sales Order / Sales Invoice body.
#[derive(Debug, Serialize)]
pub struct ItemRow<'a> {
    pub item_code: &'a str,
    pub qty: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warehouse: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sales_order: Option<&'a str>,
}

impl<'a> ItemRow<'a> {
    pub fn from_line(line: &'a OrderLine) -> Self {
        ItemRow {
            item_code: &line.item_code,
            qty: line.qty,
            rate: line.rate.map(|r| r.to_major_units()),
            warehouse: None,
            sales_order: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SalesOrderBody<'a> {
    pub customer: &'a str,
    pub company: &'a str,
    pub delivery_date: String,
    pub items: Vec<ItemRow<'a>>,
}

#[derive(Debug, Serialize)]
pub struct SalesInvoiceBody<'a> {
    pub customer: &'a str,
    pub company: &'a str,
    pub currency: &'a str,
    pub items: Vec<ItemRow<'a>>,
    pub additional_discount_percentage: f64,
    pub apply_discount_on: &'static str,
    pub docstatus: u8,
}

/// Link from a Payment Entry to the invoice it settles.
#[derive(Debug, Serialize)]
pub struct PaymentReferenceRow<'a> {
    pub reference_doctype: &'static str,
    pub reference_name: &'a str,
    pub total_amount: f64,
    pub outstanding_amount: f64,
    pub allocated_amount: f64,
}

#[derive(Debug, Serialize)]
pub struct PaymentEntryBody<'a> {
    pub payment_type: &'static str,
    pub party_type: &'static str,
    pub party: &'a str,
    pub company: &'a str,
    pub mode_of_payment: &'static str,
    pub paid_amount: f64,
    pub received_amount: f64,
    pub reference_no: &'a str,
    pub reference_date: String,
    pub references: Vec<PaymentReferenceRow<'a>>,
    pub docstatus: u8,
}

#[derive(Debug, Serialize)]
pub struct AttributeValueRow<'a> {
    pub attribute_value: &'a str,
    pub abbr: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ItemAttributeBody<'a> {
    pub attribute_name: &'a str,
    pub item_attribute_values: Vec<AttributeValueRow<'a>>,
}

#[derive(Debug, Serialize)]
pub struct ItemVariantAttributeRow<'a> {
    pub attribute: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute_value: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct ItemBody<'a> {
    pub item_code: &'a str,
    pub item_name: &'a str,
    pub item_group: &'a str,
    pub stock_uom: &'a str,
    pub is_stock_item: u8,
    pub has_variants: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_of: Option<&'a str>,
    pub attributes: Vec<ItemVariantAttributeRow<'a>>,
}

#[derive(Debug, Serialize)]
pub struct ItemPriceBody<'a> {
    pub item_code: &'a str,
    pub price_list: &'a str,
    pub price_list_rate: f64,
    pub currency: &'a str,
}

#[derive(Debug, Serialize)]
pub struct StockEntryRow<'a> {
    pub item_code: &'a str,
    pub qty: i64,
    pub t_warehouse: &'a str,
}

#[derive(Debug, Serialize)]
pub struct StockEntryBody<'a> {
    pub stock_entry_type: &'static str,
    pub company: &'a str,
    pub to_warehouse: &'a str,
    pub items: Vec<StockEntryRow<'a>>,
    pub docstatus: u8,
}

// =============================================================================
// Item
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ItemDoc {
    pub item_code: String,
    #[serde(default)]
    pub item_name: Option<String>,
    #[serde(default)]
    pub item_group: Option<String>,
    #[serde(default)]
    pub stock_uom: Option<String>,
    #[serde(default)]
    pub has_variants: Option<i64>,
    #[serde(default)]
    pub variant_of: Option<String>,
    #[serde(default)]
    pub standard_rate: Option<f64>,
    #[serde(default)]
    pub disabled: Option<i64>,
}

impl ItemDoc {
    pub fn has_variants(&self) -> bool {
        is_set(self.has_variants)
    }

    pub fn is_disabled(&self) -> bool {
        is_set(self.disabled)
    }
}
