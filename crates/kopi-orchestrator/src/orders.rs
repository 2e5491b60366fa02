//! Order lookups and creation outside a checkout session.

use chrono::Local;
use futures::future::try_join_all;
use tracing::{debug, info};

use kopi_core::validation::{validate_customer, validate_order_lines};
use kopi_core::OrderLine;
use kopi_gateway::{ErpGateway, ItemDetail, NewSalesOrder, OrderSummary};

use crate::error::{CheckoutError, CheckoutResult};

/// Open tickets: orders whose ticket has not been finalized.
pub async fn open_orders(erp: &dyn ErpGateway) -> CheckoutResult<Vec<OrderSummary>> {
    let orders = erp.list_open_orders().await?;
    debug!(count = orders.len(), "Open tickets fetched");
    Ok(orders)
}

/// Creates a Sales Order for the cashier's cart, delivered today.
///
/// ## Errors
/// - `Rule` if the customer or lines are invalid (nothing is written)
/// - `Step` if the ERP rejects the order
pub async fn create_order(
    erp: &dyn ErpGateway,
    customer: &str,
    lines: Vec<OrderLine>,
) -> CheckoutResult<String> {
    validate_customer(customer)?;
    validate_order_lines(&lines)?;

    let order = NewSalesOrder {
        customer: customer.trim().to_string(),
        lines,
        delivery_date: Local::now().date_naive(),
    };
    let order_id = erp
        .create_sales_order(&order)
        .await
        .map_err(|e| CheckoutError::step("create sales order", e))?;
    info!(%order_id, customer = %order.customer, lines = order.lines.len(), "Sales order created");
    Ok(order_id)
}

/// Fetches details for every code concurrently. The first failure wins.
pub async fn fetch_item_details(
    erp: &dyn ErpGateway,
    item_codes: &[String],
) -> CheckoutResult<Vec<ItemDetail>> {
    let details = try_join_all(item_codes.iter().map(|code| erp.get_item(code))).await?;
    debug!(count = details.len(), "Item details fetched");
    Ok(details)
}
