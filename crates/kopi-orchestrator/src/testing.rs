//! In-memory gateway fakes for orchestrator tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use kopi_core::{DiscountRate, Money, Order, OrderLine, PaymentMethod};
use kopi_gateway::{
    CardCapture, ErpGateway, GatewayError, GatewayResult, IntentStatus, InvoiceRequest,
    ItemDetail, NewItem, NewSalesOrder, OrderSummary, PayNowIntent, PaymentEntryRequest,
    PaymentGateway, StockLine,
};

// =============================================================================
// ERP
// =============================================================================

/// One recorded ERP write.
#[derive(Debug, Clone, PartialEq)]
pub enum ErpCall {
    FinalizeTicket {
        order_id: String,
        discount: DiscountRate,
        methods: String,
    },
    CreateInvoice {
        order_id: String,
        discount: DiscountRate,
    },
    CreatePaymentEntry {
        invoice: String,
        method: PaymentMethod,
        allocated: Money,
        outstanding: Money,
        total: Money,
    },
    MarkOrderPaid(String),
    CreateSalesOrder(String),
    CreateItemAttribute(String),
    CreateItem {
        item_code: String,
        variant_of: Option<String>,
    },
    CreateItemPrice {
        item_code: String,
        rate: Money,
    },
    CreateStockEntry(Vec<StockLine>),
}

impl ErpCall {
    pub fn op(&self) -> &'static str {
        match self {
            ErpCall::FinalizeTicket { .. } => "finalize_ticket",
            ErpCall::CreateInvoice { .. } => "create_invoice",
            ErpCall::CreatePaymentEntry { .. } => "create_payment_entry",
            ErpCall::MarkOrderPaid(_) => "mark_order_paid",
            ErpCall::CreateSalesOrder(_) => "create_sales_order",
            ErpCall::CreateItemAttribute(_) => "create_item_attribute",
            ErpCall::CreateItem { .. } => "create_item",
            ErpCall::CreateItemPrice { .. } => "create_item_price",
            ErpCall::CreateStockEntry(_) => "create_stock_entry",
        }
    }
}

/// Recording ERP fake. Can be told to fail the n-th call of one operation.
pub struct FakeErp {
    order: Mutex<Option<Order>>,
    calls: Mutex<Vec<ErpCall>>,
    fail: Mutex<Option<(&'static str, usize)>>,
    counter: AtomicUsize,
}

impl FakeErp {
    pub fn new() -> Self {
        FakeErp {
            order: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            fail: Mutex::new(None),
            counter: AtomicUsize::new(0),
        }
    }

    pub fn with_order(order: Order) -> Self {
        let erp = FakeErp::new();
        *erp.order.lock().unwrap() = Some(order);
        erp
    }

    /// Fails the `nth` (0-based) call to `op` with an ERP 417.
    pub fn fail_on(&self, op: &'static str, nth: usize) {
        *self.fail.lock().unwrap() = Some((op, nth));
    }

    pub fn clear_failure(&self) {
        *self.fail.lock().unwrap() = None;
    }

    pub fn calls(&self) -> Vec<ErpCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn ops(&self) -> Vec<&'static str> {
        self.calls().iter().map(ErpCall::op).collect()
    }

    fn record(&self, call: ErpCall) -> GatewayResult<String> {
        let op = call.op();
        let mut calls = self.calls.lock().unwrap();
        let seen = calls.iter().filter(|c| c.op() == op).count();
        if let Some((fail_op, nth)) = *self.fail.lock().unwrap() {
            if fail_op == op && nth == seen {
                return Err(GatewayError::Erp {
                    status: 417,
                    message: format!("{op} rejected"),
                });
            }
        }
        calls.push(call);
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("DOC-{n:04}"))
    }
}

pub fn sample_order(id: &str, lines: &[(&str, i64, Option<i64>)]) -> Order {
    Order {
        id: id.to_string(),
        customer: "Walk-in".to_string(),
        lines: lines
            .iter()
            .map(|(code, qty, rate)| OrderLine {
                item_code: code.to_string(),
                item_name: None,
                qty: *qty,
                rate: rate.map(Money::from_cents),
            })
            .collect(),
        discount: DiscountRate::zero(),
        completed: false,
        payment_completed: false,
    }
}

#[async_trait]
impl ErpGateway for FakeErp {
    async fn get_sales_order(&self, order_id: &str) -> GatewayResult<Order> {
        self.order
            .lock()
            .unwrap()
            .clone()
            .filter(|o| o.id == order_id)
            .ok_or_else(|| GatewayError::Erp {
                status: 404,
                message: format!("Sales Order {order_id} not found"),
            })
    }

    async fn list_open_orders(&self) -> GatewayResult<Vec<OrderSummary>> {
        Ok(self
            .order
            .lock()
            .unwrap()
            .iter()
            .filter(|o| !o.completed)
            .map(|o| OrderSummary {
                id: o.id.clone(),
                customer: o.customer.clone(),
                grand_total: o.gross_total(),
                transaction_date: None,
            })
            .collect())
    }

    async fn create_sales_order(&self, order: &NewSalesOrder) -> GatewayResult<String> {
        self.record(ErpCall::CreateSalesOrder(order.customer.clone()))
    }

    async fn finalize_ticket(
        &self,
        order_id: &str,
        discount: DiscountRate,
        methods: &str,
    ) -> GatewayResult<()> {
        self.record(ErpCall::FinalizeTicket {
            order_id: order_id.to_string(),
            discount,
            methods: methods.to_string(),
        })
        .map(|_| ())
    }

    async fn create_invoice(&self, invoice: &InvoiceRequest) -> GatewayResult<String> {
        self.record(ErpCall::CreateInvoice {
            order_id: invoice.order_id.clone(),
            discount: invoice.discount,
        })
    }

    async fn create_payment_entry(&self, entry: &PaymentEntryRequest) -> GatewayResult<String> {
        self.record(ErpCall::CreatePaymentEntry {
            invoice: entry.invoice.clone(),
            method: entry.method,
            allocated: entry.allocated,
            outstanding: entry.outstanding,
            total: entry.total,
        })
    }

    async fn mark_order_paid(&self, order_id: &str) -> GatewayResult<()> {
        self.record(ErpCall::MarkOrderPaid(order_id.to_string()))
            .map(|_| ())
    }

    async fn get_item(&self, item_code: &str) -> GatewayResult<ItemDetail> {
        if item_code.starts_with("MISSING") {
            return Err(GatewayError::Erp {
                status: 404,
                message: format!("Item {item_code} not found"),
            });
        }
        Ok(ItemDetail {
            item_code: item_code.to_string(),
            item_name: item_code.to_lowercase(),
            item_group: Some("Beverages".into()),
            stock_uom: Some("Nos".into()),
            has_variants: false,
            variant_of: None,
            standard_rate: Some(Money::from_cents(180)),
            disabled: false,
        })
    }

    async fn create_item_attribute(
        &self,
        name: &str,
        _values: &[(String, String)],
    ) -> GatewayResult<String> {
        self.record(ErpCall::CreateItemAttribute(name.to_string()))
            .map(|_| name.to_string())
    }

    async fn create_item(&self, item: &NewItem) -> GatewayResult<String> {
        self.record(ErpCall::CreateItem {
            item_code: item.item_code.clone(),
            variant_of: item.variant_of.clone(),
        })
        .map(|_| item.item_code.clone())
    }

    async fn create_item_price(&self, item_code: &str, rate: Money) -> GatewayResult<String> {
        self.record(ErpCall::CreateItemPrice {
            item_code: item_code.to_string(),
            rate,
        })
    }

    async fn create_stock_entry(&self, lines: &[StockLine]) -> GatewayResult<String> {
        self.record(ErpCall::CreateStockEntry(lines.to_vec()))
    }
}

// =============================================================================
// Payments
// =============================================================================

#[derive(Debug, Clone)]
enum PollScript {
    SucceedAfter(usize),
    CancelAfter(usize),
    Never,
}

#[derive(Debug, Clone)]
pub enum CardScript {
    /// Capture this many cents regardless of the request.
    Capture(Option<i64>),
    Decline(&'static str),
    Unreachable,
}

/// Scripted payment gateway fake.
pub struct FakePayments {
    poll_script: PollScript,
    card_script: Mutex<CardScript>,
    polls: AtomicUsize,
    intents: AtomicUsize,
    fixed_intent_id: Option<&'static str>,
    requested: Mutex<Vec<Money>>,
    polled_ids: Mutex<Vec<String>>,
}

impl FakePayments {
    fn with_script(poll_script: PollScript) -> Self {
        FakePayments {
            poll_script,
            card_script: Mutex::new(CardScript::Capture(None)),
            polls: AtomicUsize::new(0),
            intents: AtomicUsize::new(0),
            fixed_intent_id: None,
            requested: Mutex::new(Vec::new()),
            polled_ids: Mutex::new(Vec::new()),
        }
    }

    /// `pending` polls, then succeeded.
    pub fn succeeding_after(pending: usize) -> Self {
        FakePayments::with_script(PollScript::SucceedAfter(pending))
    }

    pub fn never_succeeding() -> Self {
        FakePayments::with_script(PollScript::Never)
    }

    pub fn canceled_after(pending: usize) -> Self {
        FakePayments::with_script(PollScript::CancelAfter(pending))
    }

    /// Every intent comes back with the same id.
    pub fn reusing_intent_id(mut self, id: &'static str) -> Self {
        self.fixed_intent_id = Some(id);
        self
    }

    pub fn set_card(&self, script: CardScript) {
        *self.card_script.lock().unwrap() = script;
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn polled_ids(&self) -> Vec<String> {
        self.polled_ids.lock().unwrap().clone()
    }

    /// Amounts requested from the terminal or for intents, in order.
    pub fn requested(&self) -> Vec<Money> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for FakePayments {
    async fn collect_card_payment(
        &self,
        _method: PaymentMethod,
        amount: Money,
        _reference: &str,
    ) -> GatewayResult<CardCapture> {
        self.requested.lock().unwrap().push(amount);
        match self.card_script.lock().unwrap().clone() {
            CardScript::Capture(cents) => Ok(CardCapture {
                succeeded: true,
                amount: cents.map(Money::from_cents).unwrap_or(amount),
                reference: Some("ch_1".into()),
                message: None,
            }),
            CardScript::Decline(message) => Ok(CardCapture {
                succeeded: false,
                amount: Money::zero(),
                reference: None,
                message: Some(message.to_string()),
            }),
            CardScript::Unreachable => Err(GatewayError::ConnectionFailed(
                "terminal offline".into(),
            )),
        }
    }

    async fn create_paynow_intent(
        &self,
        amount: Money,
        _reference: &str,
    ) -> GatewayResult<PayNowIntent> {
        self.requested.lock().unwrap().push(amount);
        let n = self.intents.fetch_add(1, Ordering::SeqCst) + 1;
        let id = self
            .fixed_intent_id
            .map(str::to_string)
            .unwrap_or_else(|| format!("pi_{n}"));
        Ok(PayNowIntent {
            id,
            qr_payload: Some("000201".into()),
            hosted_url: None,
        })
    }

    async fn paynow_status(&self, intent_id: &str) -> GatewayResult<IntentStatus> {
        self.polled_ids.lock().unwrap().push(intent_id.to_string());
        let n = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(match self.poll_script {
            PollScript::SucceedAfter(pending) if n > pending => IntentStatus::Succeeded,
            PollScript::CancelAfter(pending) if n > pending => IntentStatus::Canceled,
            _ => IntentStatus::Pending,
        })
    }
}
