//! End-to-end submission tests against in-memory collaborator fakes.
//!
//! Every fake records the calls it receives so the tests can assert not
//! just the outcome but *which* side effects happened, and that rejected
//! submissions happened before any of them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;

use meridian_checkout::{
    Assembler, CatalogSource, CheckoutError, CheckoutState, Collaborators, CustomerDetails,
    CustomerDirectory, ExternalError, InventorySource, InvoiceDraft, InvoiceHeaderPatch,
    InvoiceStore, LoyaltyLedger, NewCustomer, PostCommitHook, PromoDirectory, PromoResolution,
    PromoSlot, PromoValidation,
};
use meridian_core::{
    Cart, CoreError, CustomerRef, InventoryBatch, InventoryItem, InventorySnapshot, Invoice,
    Money, PaymentType, Product, PromoCode, Rate, Selection, ValidationError,
};

// =============================================================================
// Fakes
// =============================================================================

#[derive(Default)]
struct FakeInventory {
    batches: Mutex<HashMap<String, Vec<InventoryBatch>>>,
}

impl FakeInventory {
    fn stock(&self, batch: InventoryBatch) {
        self.batches
            .lock()
            .unwrap()
            .entry(batch.product_id.clone())
            .or_default()
            .push(batch);
    }

    fn set_quantity(&self, product_id: &str, batch_number: &str, quantity: i64) {
        let mut batches = self.batches.lock().unwrap();
        if let Some(list) = batches.get_mut(product_id) {
            for b in list.iter_mut().filter(|b| b.batch_number == batch_number) {
                b.quantity = quantity;
            }
        }
    }
}

#[async_trait]
impl InventorySource for FakeInventory {
    async fn batches(&self, product_id: &str) -> Result<Vec<InventoryBatch>, ExternalError> {
        Ok(self
            .batches
            .lock()
            .unwrap()
            .get(product_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Default)]
struct FakeCatalog {
    products: Mutex<HashMap<String, Product>>,
}

impl FakeCatalog {
    fn add(&self, product: Product) {
        self.products
            .lock()
            .unwrap()
            .insert(product.id.clone(), product);
    }
}

#[async_trait]
impl CatalogSource for FakeCatalog {
    async fn product(&self, product_id: &str) -> Result<Option<Product>, ExternalError> {
        Ok(self.products.lock().unwrap().get(product_id).cloned())
    }
}

#[derive(Default)]
struct FakeCustomers {
    by_mobile: Mutex<HashMap<String, CustomerRef>>,
    created: Mutex<Vec<NewCustomer>>,
    taken_email: Mutex<Option<String>>,
}

#[async_trait]
impl CustomerDirectory for FakeCustomers {
    async fn find_by_mobile(&self, mobile: &str) -> Result<Option<CustomerRef>, ExternalError> {
        Ok(self.by_mobile.lock().unwrap().get(mobile).cloned())
    }

    async fn create(&self, customer: NewCustomer) -> Result<CustomerRef, ExternalError> {
        if let Some(taken) = self.taken_email.lock().unwrap().as_ref() {
            if customer.email.as_deref() == Some(taken.as_str()) {
                return Err(ExternalError::DuplicateEmail { email: taken.clone() });
            }
        }
        self.created.lock().unwrap().push(customer.clone());
        Ok(CustomerRef {
            id: format!("cust-{}", customer.mobile),
            name: customer.name,
            mobile: customer.mobile,
            email: customer.email,
        })
    }
}

#[derive(Default)]
struct FakeInvoiceStore {
    created: Mutex<Vec<Invoice>>,
    patches: Mutex<Vec<(String, InvoiceHeaderPatch)>>,
    deleted: Mutex<Vec<String>>,
    fail_create: AtomicBool,
}

#[async_trait]
impl InvoiceStore for FakeInvoiceStore {
    async fn create(&self, mut invoice: Invoice) -> Result<Invoice, ExternalError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(ExternalError::Storage("disk full".into()));
        }
        let mut created = self.created.lock().unwrap();
        invoice.number = format!("INV-{:04}", created.len() + 1);
        created.push(invoice.clone());
        Ok(invoice)
    }

    async fn update(
        &self,
        invoice_number: &str,
        patch: InvoiceHeaderPatch,
    ) -> Result<(), ExternalError> {
        self.patches
            .lock()
            .unwrap()
            .push((invoice_number.to_string(), patch));
        Ok(())
    }

    async fn delete(&self, invoice_number: &str) -> Result<(), ExternalError> {
        self.deleted.lock().unwrap().push(invoice_number.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct FakeLoyalty {
    credits: Mutex<Vec<(String, i64)>>,
    fail: AtomicBool,
}

#[async_trait]
impl LoyaltyLedger for FakeLoyalty {
    async fn credit(&self, customer_id: &str, coins: i64) -> Result<(), ExternalError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ExternalError::Network("ledger unreachable".into()));
        }
        self.credits
            .lock()
            .unwrap()
            .push((customer_id.to_string(), coins));
        Ok(())
    }
}

struct FakeHook {
    hook_name: &'static str,
    fail: bool,
    runs: Mutex<Vec<String>>,
}

impl FakeHook {
    fn new(hook_name: &'static str, fail: bool) -> Self {
        FakeHook {
            hook_name,
            fail,
            runs: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PostCommitHook for FakeHook {
    fn name(&self) -> &str {
        self.hook_name
    }

    async fn run(&self, invoice: &Invoice) -> Result<(), ExternalError> {
        self.runs.lock().unwrap().push(invoice.number.clone());
        if self.fail {
            return Err(ExternalError::Network("gateway timeout".into()));
        }
        Ok(())
    }
}

struct FakePromoDirectory {
    answers: HashMap<String, PromoValidation>,
}

#[async_trait]
impl PromoDirectory for FakePromoDirectory {
    async fn validate(&self, code: &str) -> Result<PromoValidation, ExternalError> {
        Ok(self
            .answers
            .get(code)
            .cloned()
            .unwrap_or(PromoValidation::Invalid {
                message: "Promo code not found".into(),
            }))
    }
}

// =============================================================================
// Test Rig
// =============================================================================

struct Rig {
    inventory: Arc<FakeInventory>,
    catalog: Arc<FakeCatalog>,
    customers: Arc<FakeCustomers>,
    invoices: Arc<FakeInvoiceStore>,
    loyalty: Arc<FakeLoyalty>,
    hooks: Vec<Arc<FakeHook>>,
}

impl Rig {
    fn new() -> Self {
        init_tracing();
        Rig {
            inventory: Arc::new(FakeInventory::default()),
            catalog: Arc::new(FakeCatalog::default()),
            customers: Arc::new(FakeCustomers::default()),
            invoices: Arc::new(FakeInvoiceStore::default()),
            loyalty: Arc::new(FakeLoyalty::default()),
            hooks: Vec::new(),
        }
    }

    fn with_hook(mut self, hook: FakeHook) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    fn assembler(&self) -> Assembler {
        Assembler::new(Collaborators {
            inventory: self.inventory.clone(),
            catalog: self.catalog.clone(),
            customers: self.customers.clone(),
            invoices: self.invoices.clone(),
            loyalty: self.loyalty.clone(),
            post_commit: self
                .hooks
                .iter()
                .map(|h| Arc::clone(h) as Arc<dyn PostCommitHook>)
                .collect(),
        })
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn paracetamol() -> Product {
    Product {
        id: "p1".to_string(),
        name: "Paracetamol 500mg".to_string(),
        hsn_code: "3004".to_string(),
        barcode: None,
        price: Money::from_cents(11800), // ₹118.00 incl. 18%
        discount: Rate::zero(),
        tax_slab: Rate::from_bps(1800),
        category: "Analgesics".to_string(),
    }
}

fn fresh_batch(qty: i64) -> InventoryBatch {
    InventoryBatch {
        product_id: "p1".to_string(),
        batch_number: "B-01".to_string(),
        quantity: qty,
        expiry_date: day(2027, 6, 30),
    }
}

/// Stocks the rig and returns a cart holding `qty` units of paracetamol.
fn stocked_cart(rig: &Rig, qty: i64) -> Cart {
    let batch = fresh_batch(qty);
    rig.inventory.stock(batch.clone());

    let snapshot = InventorySnapshot::from_items([InventoryItem {
        product_id: "p1".to_string(),
        batches: vec![batch.clone()],
    }]);

    let mut cart = Cart::new();
    cart.select_batch(&paracetamol(), &batch, &snapshot).unwrap();
    cart.update_quantity("p1", "B-01", qty, &snapshot).unwrap();
    cart
}

fn draft() -> InvoiceDraft {
    InvoiceDraft {
        customer: CustomerDetails {
            name: "Asha Rao".to_string(),
            mobile: "9876543210".to_string(),
            email: Some("asha@example.com".to_string()),
        },
        payment_type: PaymentType::Upi,
        remarks: None,
    }
}

// =============================================================================
// Submission
// =============================================================================

#[tokio::test]
async fn submit_persists_invoice_and_credits_loyalty() {
    let rig = Rig::new();
    let mut cart = stocked_cart(&rig, 10);
    let mut assembler = rig.assembler();

    let receipt = assembler.submit(draft(), &mut cart, None).await.unwrap();

    assert_eq!(receipt.invoice.number, "INV-0001");
    assert!(receipt.warnings.is_empty());
    assert_eq!(assembler.state(), CheckoutState::Completed);

    // 10 × ₹118.00 incl. 18%: base ₹1000, tax ₹180 split into twins
    let totals = &receipt.invoice.totals;
    assert_eq!(totals.grand_total.cents(), 118000);
    assert_eq!(totals.base_value.cents(), 100000);
    assert_eq!(totals.tax.cents(), 18000);
    assert_eq!(totals.cgst().cents(), 9000);
    assert_eq!(totals.sgst().cents(), 9000);
    assert_eq!(totals.loyalty_coins, 10); // floor(1000 / 100)

    // Coins hit the ledger for the resolved customer
    let credits = rig.loyalty.credits.lock().unwrap();
    assert_eq!(credits.as_slice(), &[("cust-9876543210".to_string(), 10)]);

    // The cart is ready for the next sale
    assert!(cart.is_empty());
}

#[tokio::test]
async fn submit_rejects_empty_cart_before_any_side_effect() {
    let rig = Rig::new();
    let mut cart = Cart::new();
    let mut assembler = rig.assembler();

    let err = assembler.submit(draft(), &mut cart, None).await.unwrap_err();
    assert!(matches!(
        err,
        CheckoutError::Validation(ValidationError::EmptyCart)
    ));
    assert_eq!(assembler.state(), CheckoutState::Rejected);

    assert!(rig.invoices.created.lock().unwrap().is_empty());
    assert!(rig.customers.created.lock().unwrap().is_empty());
    assert!(rig.loyalty.credits.lock().unwrap().is_empty());
}

#[tokio::test]
async fn submit_rejects_bad_mobile_before_any_side_effect() {
    let rig = Rig::new();
    let mut cart = stocked_cart(&rig, 2);
    let mut assembler = rig.assembler();

    let mut bad = draft();
    bad.customer.mobile = "12345".to_string();

    let err = assembler.submit(bad, &mut cart, None).await.unwrap_err();
    assert!(matches!(err, CheckoutError::Validation(_)));
    assert_eq!(assembler.state(), CheckoutState::Rejected);
    assert!(rig.invoices.created.lock().unwrap().is_empty());
    assert!(!cart.is_empty()); // the operator can fix the form and retry
}

#[tokio::test]
async fn submit_catches_stock_depleted_by_another_terminal() {
    let rig = Rig::new();
    // Cart holds 10 against the snapshot it was built with...
    let mut cart = stocked_cart(&rig, 10);
    // ...but the shelf has since been sold down to 3
    rig.inventory.set_quantity("p1", "B-01", 3);

    let mut assembler = rig.assembler();
    let err = assembler.submit(draft(), &mut cart, None).await.unwrap_err();

    match err {
        CheckoutError::Stock(CoreError::InsufficientStock {
            available,
            requested,
            ..
        }) => {
            assert_eq!(available, 3);
            assert_eq!(requested, 10);
        }
        other => panic!("expected stale-stock rejection, got {:?}", other),
    }
    assert_eq!(assembler.state(), CheckoutState::Rejected);
    assert!(rig.invoices.created.lock().unwrap().is_empty());
}

// =============================================================================
// Product Picks
// =============================================================================

const PICK_ID: &str = "550e8400-e29b-41d4-a716-446655440000";

#[tokio::test]
async fn pick_product_auto_binds_single_eligible_batch() {
    let rig = Rig::new();
    rig.catalog.add(Product {
        id: PICK_ID.to_string(),
        ..paracetamol()
    });
    rig.inventory.stock(InventoryBatch {
        product_id: PICK_ID.to_string(),
        batch_number: "B-01".to_string(),
        quantity: 4,
        expiry_date: day(2027, 6, 30),
    });
    // An expired batch is never offered
    rig.inventory.stock(InventoryBatch {
        product_id: PICK_ID.to_string(),
        batch_number: "B-00".to_string(),
        quantity: 9,
        expiry_date: day(2025, 1, 1),
    });

    let assembler = rig.assembler();
    let (product, selection, snapshot) = assembler
        .pick_product(PICK_ID, day(2026, 8, 31))
        .await
        .unwrap();

    assert_eq!(product.name, "Paracetamol 500mg");
    match selection {
        Selection::AutoBind(b) => assert_eq!(b.batch_number, "B-01"),
        other => panic!("expected auto-bind, got {:?}", other),
    }
    // The snapshot the pick was resolved against is handed back for the
    // subsequent cart mutation
    assert_eq!(snapshot.available_quantity(PICK_ID, "B-01"), 4);
}

#[tokio::test]
async fn pick_product_rejects_malformed_and_unknown_ids() {
    let rig = Rig::new();
    let assembler = rig.assembler();

    let err = assembler
        .pick_product("not-a-uuid", day(2026, 8, 31))
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::Validation(_)));

    let err = assembler
        .pick_product(PICK_ID, day(2026, 8, 31))
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::UnknownProduct { .. }));
}

// =============================================================================
// Customer Resolution
// =============================================================================

#[tokio::test]
async fn submit_reuses_customer_found_by_mobile() {
    let rig = Rig::new();
    rig.customers.by_mobile.lock().unwrap().insert(
        "9876543210".to_string(),
        CustomerRef {
            id: "cust-existing".to_string(),
            name: "Asha Rao".to_string(),
            mobile: "9876543210".to_string(),
            email: None,
        },
    );
    let mut cart = stocked_cart(&rig, 1);
    let mut assembler = rig.assembler();

    let receipt = assembler.submit(draft(), &mut cart, None).await.unwrap();

    assert_eq!(receipt.invoice.customer.id, "cust-existing");
    assert!(rig.customers.created.lock().unwrap().is_empty());
}

#[tokio::test]
async fn submit_creates_customer_when_mobile_is_new() {
    let rig = Rig::new();
    let mut cart = stocked_cart(&rig, 1);
    let mut assembler = rig.assembler();

    let receipt = assembler.submit(draft(), &mut cart, None).await.unwrap();

    assert_eq!(receipt.invoice.customer.id, "cust-9876543210");
    let created = rig.customers.created.lock().unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].mobile, "9876543210");
}

#[tokio::test]
async fn submit_rejects_duplicate_email_without_persisting() {
    let rig = Rig::new();
    *rig.customers.taken_email.lock().unwrap() = Some("asha@example.com".to_string());
    let mut cart = stocked_cart(&rig, 1);
    let mut assembler = rig.assembler();

    let err = assembler.submit(draft(), &mut cart, None).await.unwrap_err();
    assert!(matches!(
        err,
        CheckoutError::External(ExternalError::DuplicateEmail { .. })
    ));
    assert_eq!(assembler.state(), CheckoutState::Rejected);
    assert!(rig.invoices.created.lock().unwrap().is_empty());
}

// =============================================================================
// Persistence Failure & Post-Commit
// =============================================================================

#[tokio::test]
async fn persist_failure_returns_to_idle_with_cart_intact() {
    let rig = Rig::new();
    rig.invoices.fail_create.store(true, Ordering::SeqCst);
    let mut cart = stocked_cart(&rig, 2);
    let mut assembler = rig.assembler();

    let err = assembler.submit(draft(), &mut cart, None).await.unwrap_err();
    assert!(matches!(
        err,
        CheckoutError::External(ExternalError::Storage(_))
    ));
    assert_eq!(assembler.state(), CheckoutState::Idle);

    // Nothing downstream of the failed create ran
    assert!(rig.loyalty.credits.lock().unwrap().is_empty());
    assert!(!cart.is_empty());
}

#[tokio::test]
async fn post_commit_failures_become_warnings_not_errors() {
    let rig = Rig::new()
        .with_hook(FakeHook::new("receipt-pdf", false))
        .with_hook(FakeHook::new("sms", true));
    rig.loyalty.fail.store(true, Ordering::SeqCst);

    let mut cart = stocked_cart(&rig, 10);
    let mut assembler = rig.assembler();

    let receipt = assembler.submit(draft(), &mut cart, None).await.unwrap();

    // The invoice is committed despite both failures
    assert_eq!(assembler.state(), CheckoutState::Completed);
    assert_eq!(rig.invoices.created.lock().unwrap().len(), 1);

    assert_eq!(receipt.warnings.len(), 2);
    assert!(receipt.warnings[0].contains("loyalty credit failed"));
    assert!(receipt.warnings[1].contains("sms failed"));

    // Every hook ran, including the one after the failing ledger
    assert_eq!(rig.hooks[0].runs.lock().unwrap().len(), 1);
    assert_eq!(rig.hooks[1].runs.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn no_loyalty_credit_when_no_coins_accrue() {
    let rig = Rig::new();
    // One unit: base ₹100.00 → exactly 1 coin; use a cheaper product instead
    let cheap = Product {
        price: Money::from_cents(1180), // base ₹10 → 0 coins
        ..paracetamol()
    };
    let batch = fresh_batch(5);
    rig.inventory.stock(batch.clone());
    let snapshot = InventorySnapshot::from_items([InventoryItem {
        product_id: "p1".to_string(),
        batches: vec![batch.clone()],
    }]);
    let mut cart = Cart::new();
    cart.select_batch(&cheap, &batch, &snapshot).unwrap();

    let mut assembler = rig.assembler();
    let receipt = assembler.submit(draft(), &mut cart, None).await.unwrap();

    assert_eq!(receipt.invoice.totals.loyalty_coins, 0);
    assert!(rig.loyalty.credits.lock().unwrap().is_empty());
}

// =============================================================================
// Promo Flow
// =============================================================================

#[tokio::test]
async fn valid_promo_reduces_grand_total_at_submission() {
    let directory = FakePromoDirectory {
        answers: HashMap::from([(
            "FESTIVE10".to_string(),
            PromoValidation::Valid {
                promo_code: PromoCode {
                    code: "FESTIVE10".to_string(),
                    discount: Rate::from_bps(1000),
                    description: "Festive season offer".to_string(),
                },
            },
        )]),
    };

    let mut slot = PromoSlot::new();
    let outcome = slot.validate_and_apply("FESTIVE10", &directory).await.unwrap();
    assert!(matches!(outcome, PromoResolution::Applied(_)));

    let rig = Rig::new();
    let mut cart = stocked_cart(&rig, 10);
    let mut assembler = rig.assembler();

    let receipt = assembler
        .submit(draft(), &mut cart, slot.applied())
        .await
        .unwrap();

    // ₹1180.00 less 10% promo, 18% backed out of the discounted amount
    let totals = &receipt.invoice.totals;
    assert_eq!(totals.promo_discount.cents(), 11800);
    assert_eq!(totals.grand_total.cents(), 106200);
    assert_eq!(totals.base_value.cents(), 90000);
    assert_eq!(totals.loyalty_coins, 9);
}

#[tokio::test]
async fn rejected_promo_leaves_submission_unaffected() {
    let directory = FakePromoDirectory { answers: HashMap::new() };

    let mut slot = PromoSlot::new();
    let outcome = slot.validate_and_apply("GHOST", &directory).await.unwrap();
    assert!(matches!(outcome, PromoResolution::Rejected(_)));
    assert!(slot.applied().is_none());

    let rig = Rig::new();
    let mut cart = stocked_cart(&rig, 10);
    let mut assembler = rig.assembler();

    // Submission proceeds at full price
    let receipt = assembler
        .submit(draft(), &mut cart, slot.applied())
        .await
        .unwrap();
    assert_eq!(receipt.invoice.totals.promo_discount.cents(), 0);
    assert_eq!(receipt.invoice.totals.grand_total.cents(), 118000);
}

// =============================================================================
// Header Edits & Deletion
// =============================================================================

#[tokio::test]
async fn update_header_forwards_patch_to_store() {
    let rig = Rig::new();
    let assembler = rig.assembler();

    assembler
        .update_header(
            "INV-0001",
            InvoiceHeaderPatch {
                payment_type: Some(PaymentType::Card),
                remarks: Some("corrected payment mode".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let patches = rig.invoices.patches.lock().unwrap();
    assert_eq!(patches.len(), 1);
    assert_eq!(patches[0].0, "INV-0001");
    assert_eq!(patches[0].1.payment_type, Some(PaymentType::Card));
}

#[tokio::test]
async fn delete_invoice_forwards_to_store() {
    let rig = Rig::new();
    let assembler = rig.assembler();

    assembler.delete_invoice("INV-0042").await.unwrap();
    assert_eq!(
        rig.invoices.deleted.lock().unwrap().as_slice(),
        &["INV-0042".to_string()]
    );
}
