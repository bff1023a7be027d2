//! # Customer Repository
//!
//! Registered customers and their store credit.
//!
//! Store credit only goes down through [`debit_store_credit`], a conditional
//! update that refuses to take the balance below zero.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use vega_core::validation::{validate_non_negative_cents, validate_payment_amount, validate_required};
use vega_core::{CoreError, Customer, Money};

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Creates a customer with an opening store-credit balance.
    pub async fn insert(&self, name: &str, store_credit: Money, now: DateTime<Utc>) -> DbResult<Customer> {
        validate_required("name", name)?;
        validate_non_negative_cents("store credit", store_credit.cents())?;

        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            store_credit_cents: store_credit.cents(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO customers (id, name, store_credit_cents, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(customer.store_credit_cents)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await?;

        debug!(id = %customer.id, "Customer created");
        Ok(customer)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, name, store_credit_cents, created_at, updated_at
            FROM customers
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Adds credit (refund to credit, gift card load). Returns the new balance.
    pub async fn add_store_credit(&self, id: &str, amount: Money, now: DateTime<Utc>) -> DbResult<Money> {
        validate_payment_amount(amount.cents())?;

        let balance: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE customers
               SET store_credit_cents = store_credit_cents + ?2, updated_at = ?3
             WHERE id = ?1
            RETURNING store_credit_cents
            "#,
        )
        .bind(id)
        .bind(amount.cents())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        let balance = balance.ok_or_else(|| DbError::not_found("Customer", id))?;
        info!(customer_id = %id, added = %amount, balance, "Store credit added");
        Ok(Money::from_cents(balance))
    }
}

/// Takes `amount` from a customer's store credit. Returns the new balance.
pub(crate) async fn debit_store_credit(
    conn: &mut SqliteConnection,
    customer_id: &str,
    amount: Money,
    now: DateTime<Utc>,
) -> DbResult<Money> {
    let balance: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE customers
           SET store_credit_cents = store_credit_cents - ?2, updated_at = ?3
         WHERE id = ?1 AND store_credit_cents >= ?2
        RETURNING store_credit_cents
        "#,
    )
    .bind(customer_id)
    .bind(amount.cents())
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?;

    match balance {
        Some(balance) => {
            debug!(customer_id = %customer_id, debited = %amount, balance, "Store credit debited");
            Ok(Money::from_cents(balance))
        }
        None => {
            let available: Option<i64> =
                sqlx::query_scalar("SELECT store_credit_cents FROM customers WHERE id = ?1")
                    .bind(customer_id)
                    .fetch_optional(&mut *conn)
                    .await?;

            match available {
                Some(available) => Err(CoreError::InsufficientCredit {
                    customer_id: customer_id.to_string(),
                    available_cents: available,
                    required_cents: amount.cents(),
                }
                .into()),
                None => Err(DbError::not_found("Customer", customer_id)),
            }
        }
    }
}

/// Fails with NotFound unless the customer exists.
pub(crate) async fn require_exists(conn: &mut SqliteConnection, customer_id: &str) -> DbResult<()> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM customers WHERE id = ?1")
        .bind(customer_id)
        .fetch_optional(&mut *conn)
        .await?;

    found
        .map(|_| ())
        .ok_or_else(|| DbError::not_found("Customer", customer_id))
}
