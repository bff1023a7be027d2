//! End-to-end checkout, drawer and layaway scenarios against an in-memory
//! database.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use vega_core::cart::{Cart, CartLine};
use vega_core::layaway::LayawayStatus;
use vega_core::promotion::{Promotion, PromotionKind};
use vega_core::session::CashVariance;
use vega_core::tender::Tender;
use vega_core::{Clock, CoreError, FixedClock, Money, PaymentMethod, ReferenceType, SaleCustomer};
use vega_db::{
    CashRegister, CommitRequest, Database, DbConfig, DbError, LayawayLedger, PosConfig, SaleCommitEngine,
};

const STORE: &str = "default-store";

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 17, 10, 0, 0).unwrap()
}

struct Harness {
    db: Database,
    engine: SaleCommitEngine,
    register: CashRegister,
    ledger: LayawayLedger,
}

async fn harness(tax_bps: u32) -> Harness {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();

    let mut config = PosConfig::default();
    config.tax.rate_bps = tax_bps;
    config.tax.enabled = tax_bps > 0;

    let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(now()));
    Harness {
        engine: SaleCommitEngine::new(db.clone(), config.clone(), clock.clone()),
        register: CashRegister::new(db.clone(), clock.clone()),
        ledger: LayawayLedger::new(db.clone(), config, clock),
        db,
    }
}

fn tee_cart(unit_cents: i64, qty: i64) -> Cart {
    Cart::from_lines([CartLine::new("tee", "TEE-M", "TEE-M", "Basic Tee M", unit_cents, qty)]).unwrap()
}

fn request(cart: Cart, tender: Tender, session_id: Option<String>) -> CommitRequest {
    CommitRequest {
        cart,
        tender,
        customer: SaleCustomer::Anonymous,
        session_id,
        cashier_id: "ana".to_string(),
    }
}

async fn count(db: &Database, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(db.pool())
        .await
        .unwrap()
}

// =============================================================================
// Scenario A: no promotion, 16% tax
// =============================================================================

#[tokio::test]
async fn scenario_a_plain_sale_with_tax() {
    let h = harness(1_600).await;
    h.db.inventory().set_stock("TEE-M", STORE, 5, "seed", now()).await.unwrap();

    let quote = h.engine.quote(&tee_cart(10_000, 2)).await.unwrap();
    assert_eq!(quote.totals.subtotal, Money::from_cents(20_000));
    assert_eq!(quote.totals.tax, Money::from_cents(3_200));
    assert_eq!(quote.totals.total, Money::from_cents(23_200));

    let committed = h
        .engine
        .commit(request(tee_cart(10_000, 2), Tender::exact(PaymentMethod::Card, Money::from_cents(23_200)), None))
        .await
        .unwrap();

    let sale = &committed.sale;
    assert_eq!(sale.number, "20261017-01-0001");
    assert_eq!(sale.total_cents, 23_200);
    assert!(sale.totals_consistent());
    assert_eq!(h.db.sales().total_paid(&sale.id).await.unwrap(), sale.total());

    let record = h.db.inventory().get("TEE-M", STORE).await.unwrap().unwrap();
    assert_eq!(record.quantity, 3);

    let movements = h
        .db
        .inventory()
        .movements_for_reference(ReferenceType::Sale, &sale.id)
        .await
        .unwrap();
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].quantity_before, 5);
    assert_eq!(movements[0].quantity_after, 3);
    assert_eq!(movements[0].quantity_delta, -2);
}

// =============================================================================
// Scenario B: 10% promotion
// =============================================================================

#[tokio::test]
async fn scenario_b_percentage_promotion() {
    let h = harness(0).await;
    h.db.inventory().set_stock("TEE-M", STORE, 5, "seed", now()).await.unwrap();
    h.db.promotions()
        .insert(&Promotion::new("promo-10", "10% off", PromotionKind::Percentage, 1_000, 1, now()))
        .await
        .unwrap();

    let committed = h
        .engine
        .commit(request(tee_cart(10_000, 2), Tender::exact(PaymentMethod::Card, Money::from_cents(18_000)), None))
        .await
        .unwrap();
    assert_eq!(committed.sale.discount_cents, 2_000);
    assert_eq!(committed.sale.promotion_id.as_deref(), Some("promo-10"));
}

#[tokio::test]
async fn scenario_b_promotion_with_tax() {
    let h = harness(1_600).await;
    h.db.inventory().set_stock("TEE-M", STORE, 5, "seed", now()).await.unwrap();
    h.db.promotions()
        .insert(&Promotion::new("promo-10", "10% off", PromotionKind::Percentage, 1_000, 1, now()))
        .await
        .unwrap();

    // Tax is charged on the pre-discount subtotal: 200.00 + 32.00 - 20.00.
    let quote = h.engine.quote(&tee_cart(10_000, 2)).await.unwrap();
    assert_eq!(quote.totals.discount, Money::from_cents(2_000));
    assert_eq!(quote.totals.total, Money::from_cents(21_200));
}

// =============================================================================
// Scenario C: insufficient stock
// =============================================================================

#[tokio::test]
async fn scenario_c_insufficient_stock_writes_nothing() {
    let h = harness(0).await;
    h.db.inventory().set_stock("TEE-M", STORE, 1, "seed", now()).await.unwrap();
    let movements_before = count(&h.db, "inventory_movements").await;

    let err = h
        .engine
        .commit(request(tee_cart(10_000, 2), Tender::exact(PaymentMethod::Cash, Money::from_cents(20_000)), None))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DbError::Domain(CoreError::InsufficientStock { available: 1, requested: 2, .. })
    ));

    assert_eq!(count(&h.db, "sales").await, 0);
    assert_eq!(count(&h.db, "sale_items").await, 0);
    assert_eq!(count(&h.db, "payments").await, 0);
    assert_eq!(count(&h.db, "inventory_movements").await, movements_before);
    assert_eq!(h.db.inventory().get("TEE-M", STORE).await.unwrap().unwrap().quantity, 1);
}

// =============================================================================
// Scenario D: drawer close
// =============================================================================

#[tokio::test]
async fn scenario_d_drawer_balances() {
    let h = harness(0).await;
    h.db.inventory().set_stock("TEE-M", STORE, 20, "seed", now()).await.unwrap();

    let session = h.register.open_session("REG-01", "ana", Money::from_cents(50_000)).await.unwrap();

    for cents in [15_000, 7_500] {
        h.engine
            .commit(request(
                tee_cart(cents, 1),
                Tender::cash(Money::from_cents(cents), Money::from_cents(cents)),
                Some(session.id.clone()),
            ))
            .await
            .unwrap();
    }

    // Card takings do not belong in the drawer.
    h.engine
        .commit(request(
            tee_cart(9_900, 1),
            Tender::exact(PaymentMethod::Card, Money::from_cents(9_900)),
            Some(session.id.clone()),
        ))
        .await
        .unwrap();

    assert_eq!(h.db.sales().list_by_session(&session.id).await.unwrap().len(), 3);
    assert_eq!(h.register.expected_cash(&session.id).await.unwrap(), Money::from_cents(72_500));

    let closed = h.register.close_session(&session.id, Money::from_cents(72_500)).await.unwrap();
    assert_eq!(closed.session.expected_cash_cents, Some(72_500));
    assert_eq!(closed.session.difference_cents, Some(0));
    assert_eq!(closed.variance, CashVariance::Balanced);

    // A closed session takes no more sales.
    let err = h
        .engine
        .commit(request(
            tee_cart(1_000, 1),
            Tender::exact(PaymentMethod::Cash, Money::from_cents(1_000)),
            Some(session.id.clone()),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::InvalidSessionStatus { .. })));
}

// =============================================================================
// Scenario E: layaway
// =============================================================================

#[tokio::test]
async fn scenario_e_layaway_paid_off() {
    let h = harness(0).await;
    let customer = h.db.customers().insert("Lucía", Money::zero(), now()).await.unwrap();

    let layaway = h
        .ledger
        .create(
            &customer.id,
            "JEANS-32",
            Money::from_cents(100_000),
            Money::from_cents(30_000),
            PaymentMethod::Cash,
            "ana",
        )
        .await
        .unwrap();
    assert_eq!(layaway.balance_cents, 70_000);
    assert_eq!(layaway.status, LayawayStatus::Active);
    assert_eq!(layaway.number, "L-20261017-0001");

    let layaway = h
        .ledger
        .add_payment(&layaway.id, Money::from_cents(70_000), PaymentMethod::Card, None)
        .await
        .unwrap();
    assert_eq!(layaway.balance_cents, 0);
    assert_eq!(layaway.status, LayawayStatus::Paid);
    assert_eq!(layaway.paid_at, Some(now()));

    let history = h.ledger.history(&layaway.id).await.unwrap();
    let paid: Money = history.iter().map(|p| p.amount()).sum();
    assert_eq!(paid, layaway.amount_paid());
}

// =============================================================================
// Properties
// =============================================================================

#[tokio::test]
async fn expected_cash_is_independent_of_sale_order() {
    let amounts = [1_250, 8_000, 300, 4_450];

    let mut totals = Vec::new();
    for order in [amounts.to_vec(), amounts.iter().rev().copied().collect::<Vec<_>>()] {
        let h = harness(0).await;
        h.db.inventory().set_stock("TEE-M", STORE, 50, "seed", now()).await.unwrap();
        let session = h.register.open_session("REG-01", "ana", Money::from_cents(10_000)).await.unwrap();

        for cents in order {
            h.engine
                .commit(request(
                    tee_cart(cents, 1),
                    Tender::cash(Money::from_cents(cents), Money::from_cents(cents + 50)),
                    Some(session.id.clone()),
                ))
                .await
                .unwrap();
        }
        totals.push(h.register.expected_cash(&session.id).await.unwrap());
    }

    let expected = Money::from_cents(10_000 + amounts.iter().sum::<i64>());
    assert!(totals.iter().all(|total| *total == expected));
}

#[tokio::test]
async fn layaway_balance_tracks_ledger_after_every_payment() {
    let h = harness(0).await;
    let customer = h.db.customers().insert("Jorge", Money::zero(), now()).await.unwrap();
    let mut layaway = h
        .ledger
        .create(&customer.id, "HOODIE-M", Money::from_cents(45_000), Money::zero(), PaymentMethod::Cash, "ana")
        .await
        .unwrap();

    for cents in [5_000, 12_500, 7_500, 20_000] {
        layaway = h
            .ledger
            .add_payment(&layaway.id, Money::from_cents(cents), PaymentMethod::Cash, None)
            .await
            .unwrap();

        let ledger_total: Money = h
            .ledger
            .history(&layaway.id)
            .await
            .unwrap()
            .iter()
            .map(|p| p.amount())
            .sum();
        assert_eq!(layaway.amount_paid(), ledger_total);
        assert_eq!(layaway.balance(), layaway.total_price() - layaway.amount_paid());
    }
    assert_eq!(layaway.status, LayawayStatus::Paid);
}

#[tokio::test]
async fn store_credit_sale_debits_exactly_the_total() {
    let h = harness(1_600).await;
    h.db.inventory().set_stock("TEE-M", STORE, 5, "seed", now()).await.unwrap();
    let customer = h.db.customers().insert("María", Money::from_cents(30_000), now()).await.unwrap();

    let mut req = request(
        tee_cart(10_000, 2),
        Tender::exact(PaymentMethod::StoreCredit, Money::from_cents(23_200)),
        None,
    );
    req.customer = SaleCustomer::Registered(customer.id.clone());
    h.engine.commit(req.clone()).await.unwrap();

    let after = h.db.customers().get_by_id(&customer.id).await.unwrap().unwrap();
    assert_eq!(after.store_credit_cents, 30_000 - 23_200);

    // 68.00 left; a second identical sale is refused and writes nothing.
    let err = h.engine.commit(req).await.unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::InsufficientCredit { .. })));
    assert_eq!(count(&h.db, "sales").await, 1);
    assert_eq!(h.db.inventory().get("TEE-M", STORE).await.unwrap().unwrap().quantity, 3);
}
