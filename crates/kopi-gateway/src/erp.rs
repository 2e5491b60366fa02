//! # ERP Gateway
//!
//! One async method per ERP operation Kopi performs, behind the
//! [`ErpGateway`] trait so the orchestrator can run against a fake.
//!
//! ## Endpoints
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Operation              HTTP                                            │
//! │  ─────────────────────  ──────────────────────────────────────────────  │
//! │  get_sales_order        GET  /api/resource/Sales Order/{id}             │
//! │  list_open_orders       GET  /api/resource/Sales Order?filters=…        │
//! │  create_sales_order     POST /api/resource/Sales Order                  │
//! │  finalize_ticket        PUT  /api/resource/Sales Order/{id}             │
//! │  create_invoice         POST /api/resource/Sales Invoice                │
//! │  create_payment_entry   POST /api/resource/Payment Entry                │
//! │  mark_order_paid        PUT  /api/resource/Sales Order/{id}             │
//! │  get_item               GET  /api/resource/Item/{code}                  │
//! │  create_item_attribute  POST /api/resource/Item Attribute               │
//! │  create_item            POST /api/resource/Item                         │
//! │  create_item_price      POST /api/resource/Item Price                   │
//! │  create_stock_entry     POST /api/resource/Stock Entry                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Auth header: `Authorization: token <key>:<secret>`. Every response body
//! is wrapped in `{"data": …}`.

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};
use url::Url;

use kopi_core::{DiscountRate, Money, Order, OrderLine, PaymentMethod};

use crate::config::ErpSettings;
use crate::error::{GatewayError, GatewayResult};
use crate::http::{build_client, read_json, Remote};
use crate::wire::{self, Envelope, NamedDoc};

// =============================================================================
// Request / Response Types
// =============================================================================

/// An open ticket as listed for the cashier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSummary {
    pub id: String,
    pub customer: String,
    pub grand_total: Money,
    pub transaction_date: Option<String>,
}

/// A new sales order from the cashier's cart.
#[derive(Debug, Clone)]
pub struct NewSalesOrder {
    pub customer: String,
    pub lines: Vec<OrderLine>,
    pub delivery_date: NaiveDate,
}

/// Submitted invoice for one order.
#[derive(Debug, Clone)]
pub struct InvoiceRequest {
    pub order_id: String,
    pub customer: String,
    pub lines: Vec<OrderLine>,
    pub discount: DiscountRate,
}

/// One payment entry against an invoice.
#[derive(Debug, Clone)]
pub struct PaymentEntryRequest {
    pub invoice: String,
    pub customer: String,
    pub method: PaymentMethod,
    /// Applied amount; also the paid and received amount.
    pub allocated: Money,
    /// Invoice balance before this entry.
    pub outstanding: Money,
    /// Invoice grand total.
    pub total: Money,
    /// Unique per attempt and tender, e.g. `<attempt-uuid>-0`.
    pub reference_no: String,
}

/// Details of an existing item.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDetail {
    pub item_code: String,
    pub item_name: String,
    pub item_group: Option<String>,
    pub stock_uom: Option<String>,
    pub has_variants: bool,
    pub variant_of: Option<String>,
    pub standard_rate: Option<Money>,
    pub disabled: bool,
}

/// A template or variant item to create.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub item_code: String,
    pub item_name: String,
    pub item_group: String,
    pub stock_uom: String,
    /// Template flag.
    pub has_variants: bool,
    /// Template code, for variants.
    pub variant_of: Option<String>,
    /// `(attribute, value)`; the value is `None` on a template.
    pub attributes: Vec<(String, Option<String>)>,
}

/// One stock receipt line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockLine {
    pub item_code: String,
    pub qty: i64,
}

// =============================================================================
// Gateway Trait
// =============================================================================

/// Every ERP operation Kopi performs.
#[async_trait]
pub trait ErpGateway: Send + Sync {
    async fn get_sales_order(&self, order_id: &str) -> GatewayResult<Order>;

    /// Orders whose ticket is not yet finalized.
    async fn list_open_orders(&self) -> GatewayResult<Vec<OrderSummary>>;

    async fn create_sales_order(&self, order: &NewSalesOrder) -> GatewayResult<String>;

    /// Records discount and tender methods and sets the ticket-completed flag.
    async fn finalize_ticket(
        &self,
        order_id: &str,
        discount: DiscountRate,
        methods: &str,
    ) -> GatewayResult<()>;

    /// Creates a submitted Sales Invoice; returns its name.
    async fn create_invoice(&self, invoice: &InvoiceRequest) -> GatewayResult<String>;

    /// Creates a submitted Payment Entry; returns its name.
    async fn create_payment_entry(&self, entry: &PaymentEntryRequest) -> GatewayResult<String>;

    /// Sets the payment-completed flag.
    async fn mark_order_paid(&self, order_id: &str) -> GatewayResult<()>;

    async fn get_item(&self, item_code: &str) -> GatewayResult<ItemDetail>;

    /// Creates an Item Attribute with `(value, abbr)` pairs.
    async fn create_item_attribute(
        &self,
        name: &str,
        values: &[(String, String)],
    ) -> GatewayResult<String>;

    async fn create_item(&self, item: &NewItem) -> GatewayResult<String>;

    /// Creates an Item Price on the configured selling price list.
    async fn create_item_price(&self, item_code: &str, rate: Money) -> GatewayResult<String>;

    /// Creates a submitted Material Receipt into the configured warehouse.
    async fn create_stock_entry(&self, lines: &[StockLine]) -> GatewayResult<String>;
}

// =============================================================================
// REST Client
// =============================================================================

/// reqwest-backed ERP client. Built once from [`ErpSettings`].
#[derive(Debug, Clone)]
pub struct ErpClient {
    client: Client,
    settings: ErpSettings,
    base_url: Url,
}

impl ErpClient {
    pub fn new(settings: ErpSettings) -> GatewayResult<Self> {
        let client = build_client(settings.timeout())?;
        let base_url = Url::parse(&settings.base_url)?;
        Ok(ErpClient {
            client,
            settings,
            base_url,
        })
    }

    pub fn settings(&self) -> &ErpSettings {
        &self.settings
    }

    /// `<base>/api/resource/<segments…>`, each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> GatewayResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                GatewayError::InvalidUrl(format!("{} cannot carry a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(["api", "resource"])
            .extend(segments);
        Ok(url)
    }

    fn resource_url(&self, doctype: &str) -> GatewayResult<Url> {
        self.endpoint(&[doctype])
    }

    fn document_url(&self, doctype: &str, name: &str) -> GatewayResult<Url> {
        self.endpoint(&[doctype, name])
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> GatewayResult<T> {
        debug!(%url, "ERP GET");
        let response = self
            .client
            .get(url)
            .header(reqwest::header::AUTHORIZATION, self.settings.auth_header())
            .send()
            .await?;
        let envelope: Envelope<T> = read_json(response, Remote::Erp, wire::erp_error_message).await?;
        Ok(envelope.data)
    }

    async fn post<B: Serialize + ?Sized>(&self, doctype: &str, body: &B) -> GatewayResult<String> {
        let url = self.resource_url(doctype)?;
        debug!(%url, "ERP POST");
        let response = self
            .client
            .post(url)
            .header(reqwest::header::AUTHORIZATION, self.settings.auth_header())
            .json(body)
            .send()
            .await?;
        let envelope: Envelope<NamedDoc> =
            read_json(response, Remote::Erp, wire::erp_error_message).await?;
        Ok(envelope.data.name)
    }

    async fn put<B: Serialize + ?Sized>(
        &self,
        doctype: &str,
        name: &str,
        body: &B,
    ) -> GatewayResult<()> {
        let url = self.document_url(doctype, name)?;
        debug!(%url, "ERP PUT");
        let response = self
            .client
            .put(url)
            .header(reqwest::header::AUTHORIZATION, self.settings.auth_header())
            .json(body)
            .send()
            .await?;
        let _: Envelope<serde_json::Value> =
            read_json(response, Remote::Erp, wire::erp_error_message).await?;
        Ok(())
    }
}

fn today() -> String {
    Local::now().date_naive().format("%Y-%m-%d").to_string()
}

#[async_trait]
impl ErpGateway for ErpClient {
    async fn get_sales_order(&self, order_id: &str) -> GatewayResult<Order> {
        let doc: wire::SalesOrderDoc = self.get(self.document_url("Sales Order", order_id)?).await?;
        Ok(doc.into_order())
    }

    async fn list_open_orders(&self) -> GatewayResult<Vec<OrderSummary>> {
        let filters = json!([
            ["docstatus", "<", 2],
            [wire::TICKET_COMPLETED_FIELD, "=", 0]
        ])
        .to_string();
        let fields = json!(["name", "customer", "grand_total", "transaction_date"]).to_string();

        let url = self.resource_url("Sales Order")?;
        debug!(%url, "ERP GET open orders");
        let response = self
            .client
            .get(url)
            .header(reqwest::header::AUTHORIZATION, self.settings.auth_header())
            .query(&[
                ("filters", filters.as_str()),
                ("fields", fields.as_str()),
                ("order_by", "creation asc"),
                ("limit_page_length", "0"),
            ])
            .send()
            .await?;
        let envelope: Envelope<Vec<wire::SalesOrderListRow>> =
            read_json(response, Remote::Erp, wire::erp_error_message).await?;

        Ok(envelope
            .data
            .into_iter()
            .map(|row| OrderSummary {
                id: row.name,
                customer: row.customer,
                grand_total: Money::from_major_units(row.grand_total),
                transaction_date: row.transaction_date,
            })
            .collect())
    }

    async fn create_sales_order(&self, order: &NewSalesOrder) -> GatewayResult<String> {
        let body = wire::SalesOrderBody {
            customer: &order.customer,
            company: &self.settings.company,
            delivery_date: order.delivery_date.format("%Y-%m-%d").to_string(),
            items: order
                .lines
                .iter()
                .map(|line| wire::ItemRow {
                    warehouse: Some(&self.settings.warehouse),
                    ..wire::ItemRow::from_line(line)
                })
                .collect(),
        };
        let name = self.post("Sales Order", &body).await?;
        info!(order_id = %name, customer = %order.customer, "Sales order created");
        Ok(name)
    }

    async fn finalize_ticket(
        &self,
        order_id: &str,
        discount: DiscountRate,
        methods: &str,
    ) -> GatewayResult<()> {
        let body = json!({
            "additional_discount_percentage": discount.percentage(),
            (wire::PAYMENT_METHODS_FIELD): methods,
            (wire::TICKET_COMPLETED_FIELD): 1,
        });
        self.put("Sales Order", order_id, &body).await
    }

    async fn create_invoice(&self, invoice: &InvoiceRequest) -> GatewayResult<String> {
        let body = wire::SalesInvoiceBody {
            customer: &invoice.customer,
            company: &self.settings.company,
            currency: &self.settings.currency,
            items: invoice
                .lines
                .iter()
                .map(|line| wire::ItemRow {
                    sales_order: Some(&invoice.order_id),
                    ..wire::ItemRow::from_line(line)
                })
                .collect(),
            additional_discount_percentage: invoice.discount.percentage(),
            apply_discount_on: "Net Total",
            docstatus: 1,
        };
        self.post("Sales Invoice", &body).await
    }

    async fn create_payment_entry(&self, entry: &PaymentEntryRequest) -> GatewayResult<String> {
        let allocated = entry.allocated.to_major_units();
        let body = wire::PaymentEntryBody {
            payment_type: "Receive",
            party_type: "Customer",
            party: &entry.customer,
            company: &self.settings.company,
            mode_of_payment: entry.method.erp_name(),
            paid_amount: allocated,
            received_amount: allocated,
            reference_no: &entry.reference_no,
            reference_date: today(),
            references: vec![wire::PaymentReferenceRow {
                reference_doctype: "Sales Invoice",
                reference_name: &entry.invoice,
                total_amount: entry.total.to_major_units(),
                outstanding_amount: entry.outstanding.to_major_units(),
                allocated_amount: allocated,
            }],
            docstatus: 1,
        };
        self.post("Payment Entry", &body).await
    }

    async fn mark_order_paid(&self, order_id: &str) -> GatewayResult<()> {
        let body = json!({ (wire::PAYMENT_COMPLETED_FIELD): 1 });
        self.put("Sales Order", order_id, &body).await
    }

    async fn get_item(&self, item_code: &str) -> GatewayResult<ItemDetail> {
        let doc: wire::ItemDoc = self.get(self.document_url("Item", item_code)?).await?;
        Ok(ItemDetail {
            has_variants: doc.has_variants(),
            disabled: doc.is_disabled(),
            item_name: doc.item_name.unwrap_or_else(|| doc.item_code.clone()),
            item_code: doc.item_code,
            item_group: doc.item_group,
            stock_uom: doc.stock_uom,
            variant_of: doc.variant_of,
            standard_rate: doc.standard_rate.map(Money::from_major_units),
        })
    }

    async fn create_item_attribute(
        &self,
        name: &str,
        values: &[(String, String)],
    ) -> GatewayResult<String> {
        let body = wire::ItemAttributeBody {
            attribute_name: name,
            item_attribute_values: values
                .iter()
                .map(|(value, abbr)| wire::AttributeValueRow {
                    attribute_value: value,
                    abbr,
                })
                .collect(),
        };
        self.post("Item Attribute", &body).await
    }

    async fn create_item(&self, item: &NewItem) -> GatewayResult<String> {
        let body = wire::ItemBody {
            item_code: &item.item_code,
            item_name: &item.item_name,
            item_group: &item.item_group,
            stock_uom: &item.stock_uom,
            is_stock_item: 1,
            has_variants: u8::from(item.has_variants),
            variant_of: item.variant_of.as_deref(),
            attributes: item
                .attributes
                .iter()
                .map(|(attribute, value)| wire::ItemVariantAttributeRow {
                    attribute,
                    attribute_value: value.as_deref(),
                })
                .collect(),
        };
        self.post("Item", &body).await
    }

    async fn create_item_price(&self, item_code: &str, rate: Money) -> GatewayResult<String> {
        let body = wire::ItemPriceBody {
            item_code,
            price_list: &self.settings.price_list,
            price_list_rate: rate.to_major_units(),
            currency: &self.settings.currency,
        };
        self.post("Item Price", &body).await
    }

    async fn create_stock_entry(&self, lines: &[StockLine]) -> GatewayResult<String> {
        let body = wire::StockEntryBody {
            stock_entry_type: "Material Receipt",
            company: &self.settings.company,
            to_warehouse: &self.settings.warehouse,
            items: lines
                .iter()
                .map(|line| wire::StockEntryRow {
                    item_code: &line.item_code,
                    qty: line.qty,
                    t_warehouse: &self.settings.warehouse,
                })
                .collect(),
            docstatus: 1,
        };
        self.post("Stock Entry", &body).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(server: &MockServer) -> ErpClient {
        ErpClient::new(ErpSettings {
            base_url: server.base_url(),
            api_key: "key".into(),
            api_secret: "secret".into(),
            company: "Kopi Pte Ltd".into(),
            warehouse: "Stores - KOPI".into(),
            ..ErpSettings::default()
        })
        .unwrap()
    }

    fn settings(base_url: &str) -> ErpSettings {
        ErpSettings {
            base_url: base_url.into(),
            ..ErpSettings::default()
        }
    }

    #[test]
    fn test_document_url_encodes_names() {
        let erp = ErpClient::new(settings("https://erp.kopi.example")).unwrap();
        let url = erp.document_url("Sales Order", "SAL/ORD#1?x").unwrap();
        assert_eq!(
            url.as_str(),
            "https://erp.kopi.example/api/resource/Sales%20Order/SAL%2FORD%231%3Fx"
        );

        let erp = ErpClient::new(settings("https://kopi.example/erp/")).unwrap();
        let url = erp.resource_url("Item Price").unwrap();
        assert_eq!(url.as_str(), "https://kopi.example/erp/api/resource/Item%20Price");
    }

    #[test]
    fn test_base_url_must_carry_a_path() {
        let err = ErpClient::new(settings("mailto:erp@kopi.example"))
            .unwrap()
            .document_url("Item", "KOPI")
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_get_sales_order_sends_token_auth() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path_contains("SAL-ORD-0001")
                .header("authorization", "token key:secret");
            then.status(200).json_body(json!({
                "data": {
                    "name": "SAL-ORD-0001",
                    "customer": "Walk-in",
                    "items": [{"item_code": "KOPI-O", "qty": 2, "rate": 1.8}]
                }
            }));
        });

        let order = client(&server).get_sales_order("SAL-ORD-0001").await.unwrap();
        mock.assert();
        assert_eq!(order.id, "SAL-ORD-0001");
        assert_eq!(order.gross_total().cents(), 360);
    }

    #[tokio::test]
    async fn test_create_invoice_is_submitted_with_discount() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path_contains("Invoice")
                .json_body_partial(
                    r#"{"customer": "Walk-in", "additional_discount_percentage": 10.0, "docstatus": 1}"#,
                );
            then.status(200)
                .json_body(json!({"data": {"name": "ACC-SINV-0001"}}));
        });

        let name = client(&server)
            .create_invoice(&InvoiceRequest {
                order_id: "SAL-ORD-0001".into(),
                customer: "Walk-in".into(),
                lines: vec![OrderLine {
                    item_code: "NASI-LEMAK".into(),
                    item_name: None,
                    qty: 4,
                    rate: Some(Money::from_cents(850)),
                }],
                discount: DiscountRate::from_percentage(10.0),
            })
            .await
            .unwrap();
        mock.assert();
        assert_eq!(name, "ACC-SINV-0001");
    }

    #[tokio::test]
    async fn test_payment_entry_body() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path_contains("Payment").json_body_partial(
                r#"{
                    "payment_type": "Receive",
                    "party_type": "Customer",
                    "party": "Walk-in",
                    "mode_of_payment": "PayNow",
                    "paid_amount": 10.6,
                    "received_amount": 10.6,
                    "references": [{
                        "reference_doctype": "Sales Invoice",
                        "reference_name": "ACC-SINV-0001",
                        "total_amount": 30.6,
                        "outstanding_amount": 10.6,
                        "allocated_amount": 10.6
                    }]
                }"#,
            );
            then.status(200)
                .json_body(json!({"data": {"name": "ACC-PAY-0002"}}));
        });

        let name = client(&server)
            .create_payment_entry(&PaymentEntryRequest {
                invoice: "ACC-SINV-0001".into(),
                customer: "Walk-in".into(),
                method: PaymentMethod::PayNow,
                allocated: Money::from_cents(1060),
                outstanding: Money::from_cents(1060),
                total: Money::from_cents(3060),
                reference_no: "attempt-1".into(),
            })
            .await
            .unwrap();
        mock.assert();
        assert_eq!(name, "ACC-PAY-0002");
    }

    #[tokio::test]
    async fn test_finalize_and_mark_paid_flags() {
        let server = MockServer::start();
        let finalize = server.mock(|when, then| {
            when.method(PUT).path_contains("SAL-ORD-0001").json_body_partial(
                r#"{"custom_ticket_completed": 1, "custom_payment_methods": "Cash,PayNow"}"#,
            );
            then.status(200).json_body(json!({"data": {"name": "SAL-ORD-0001"}}));
        });
        let paid = server.mock(|when, then| {
            when.method(PUT)
                .path_contains("SAL-ORD-0001")
                .json_body_partial(r#"{"custom_payment_completed": 1}"#);
            then.status(200).json_body(json!({"data": {"name": "SAL-ORD-0001"}}));
        });

        let erp = client(&server);
        erp.finalize_ticket("SAL-ORD-0001", DiscountRate::from_bps(1000), "Cash,PayNow")
            .await
            .unwrap();
        erp.mark_order_paid("SAL-ORD-0001").await.unwrap();
        finalize.assert();
        paid.assert();
    }

    #[tokio::test]
    async fn test_list_open_orders() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path_contains("Order").query_param_exists("filters");
            then.status(200).json_body(json!({
                "data": [
                    {"name": "SAL-ORD-0003", "customer": "Walk-in", "grand_total": 12.4},
                    {"name": "SAL-ORD-0004", "customer": "Table 5", "grand_total": 7.0}
                ]
            }));
        });

        let orders = client(&server).list_open_orders().await.unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].grand_total.cents(), 1240);
        assert_eq!(orders[1].customer, "Table 5");
    }

    #[tokio::test]
    async fn test_erp_error_surfaces_message() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path_contains("Invoice");
            then.status(417).json_body(json!({
                "exc_type": "ValidationError",
                "_server_messages": "[\"{\\\"message\\\": \\\"Customer Walk-in is disabled\\\"}\"]"
            }));
        });

        let err = client(&server)
            .create_invoice(&InvoiceRequest {
                order_id: "SAL-ORD-0001".into(),
                customer: "Walk-in".into(),
                lines: vec![],
                discount: DiscountRate::zero(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Erp { status: 417, .. }));
        assert_eq!(err.to_string(), "Customer Walk-in is disabled");
    }

    #[tokio::test]
    async fn test_unauthorized() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET);
            then.status(401).body("Invalid token");
        });

        let err = client(&server).get_item("KOPI").await.unwrap_err();
        assert!(matches!(err, GatewayError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_stock_entry_is_material_receipt() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path_contains("Stock").json_body_partial(
                r#"{"stock_entry_type": "Material Receipt", "to_warehouse": "Stores - KOPI", "docstatus": 1}"#,
            );
            then.status(200)
                .json_body(json!({"data": {"name": "MAT-STE-0001"}}));
        });

        let name = client(&server)
            .create_stock_entry(&[StockLine {
                item_code: "KOPI-S".into(),
                qty: 20,
            }])
            .await
            .unwrap();
        mock.assert();
        assert_eq!(name, "MAT-STE-0001");
    }
}
