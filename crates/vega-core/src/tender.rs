//! # Tender
//!
//! The payment a cashier takes for a sale, checked against the priced total
//! before anything is written.
//!
//! Commits are single-tender: the amount must equal the sale total. Split
//! payments are not supported.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{PaymentMethod, SaleCustomer};
use crate::validation::validate_payment_amount;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Tender {
    pub method: PaymentMethod,
    pub amount: Money,
    /// Cash handed over by the customer. Cash only; defaults to `amount`.
    pub tendered: Option<Money>,
    /// Card authorization code, transfer id.
    pub reference: Option<String>,
}

/// What a validated tender settles to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub amount: Money,
    pub tendered: Option<Money>,
    pub change: Option<Money>,
}

impl Tender {
    pub fn cash(amount: Money, tendered: Money) -> Self {
        Tender {
            method: PaymentMethod::Cash,
            amount,
            tendered: Some(tendered),
            reference: None,
        }
    }

    pub fn exact(method: PaymentMethod, amount: Money) -> Self {
        Tender {
            method,
            amount,
            tendered: None,
            reference: None,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Checks the tender against the sale total and customer.
    ///
    /// ```rust
    /// use vega_core::money::Money;
    /// use vega_core::tender::Tender;
    /// use vega_core::types::SaleCustomer;
    ///
    /// let tender = Tender::cash(Money::from_cents(23_200), Money::from_cents(25_000));
    /// let settled = tender
    ///     .settle(Money::from_cents(23_200), &SaleCustomer::Anonymous)
    ///     .unwrap();
    /// assert_eq!(settled.change, Some(Money::from_cents(1_800)));
    /// ```
    pub fn settle(&self, total: Money, customer: &SaleCustomer) -> CoreResult<Settlement> {
        validate_payment_amount(self.amount.cents())?;

        if self.amount != total {
            return Err(CoreError::invalid_payment(format!(
                "amount {} does not match sale total {}",
                self.amount, total
            )));
        }

        match self.method {
            PaymentMethod::Cash => {
                let tendered = self.tendered.unwrap_or(self.amount);
                if tendered < self.amount {
                    return Err(CoreError::invalid_payment(format!(
                        "tendered {} is less than amount {}",
                        tendered, self.amount
                    )));
                }
                Ok(Settlement {
                    amount: self.amount,
                    tendered: Some(tendered),
                    change: Some(tendered - self.amount),
                })
            }
            method => {
                if self.tendered.is_some() {
                    return Err(CoreError::invalid_payment(
                        "tendered amount only applies to cash",
                    ));
                }
                // Store credit draws on a registered customer's balance.
                if method == PaymentMethod::StoreCredit && customer.customer_id().is_none() {
                    return Err(ValidationError::required("customer").into());
                }
                Ok(Settlement {
                    amount: self.amount,
                    tendered: None,
                    change: None,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total() -> Money {
        Money::from_cents(23_200)
    }

    #[test]
    fn test_cash_with_change() {
        let settled = Tender::cash(total(), Money::from_cents(30_000))
            .settle(total(), &SaleCustomer::Anonymous)
            .unwrap();
        assert_eq!(settled.tendered, Some(Money::from_cents(30_000)));
        assert_eq!(settled.change, Some(Money::from_cents(6_800)));
    }

    #[test]
    fn test_exact_cash_defaults_tendered() {
        let settled = Tender::exact(PaymentMethod::Cash, total())
            .settle(total(), &SaleCustomer::Anonymous)
            .unwrap();
        assert_eq!(settled.tendered, Some(total()));
        assert_eq!(settled.change, Some(Money::zero()));
    }

    #[test]
    fn test_amount_must_equal_total() {
        let err = Tender::exact(PaymentMethod::Card, Money::from_cents(20_000))
            .settle(total(), &SaleCustomer::Anonymous)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidPayment { .. }));
    }

    #[test]
    fn test_zero_amount_rejected() {
        let err = Tender::exact(PaymentMethod::Card, Money::zero())
            .settle(Money::zero(), &SaleCustomer::Anonymous)
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_short_cash_rejected() {
        assert!(Tender::cash(total(), Money::from_cents(20_000))
            .settle(total(), &SaleCustomer::Anonymous)
            .is_err());
    }

    #[test]
    fn test_store_credit_needs_registered_customer() {
        let tender = Tender::exact(PaymentMethod::StoreCredit, total());
        for customer in [SaleCustomer::Anonymous, SaleCustomer::Quick("Ana".to_string())] {
            let err = tender.settle(total(), &customer).unwrap_err();
            assert!(matches!(
                err,
                CoreError::Validation(ValidationError::Required { ref field }) if field == "customer"
            ));
        }
        assert!(tender
            .settle(total(), &SaleCustomer::Registered("c1".to_string()))
            .is_ok());
    }

    #[test]
    fn test_card_with_tendered_rejected() {
        let mut tender = Tender::exact(PaymentMethod::Card, total()).with_reference("AUTH-1");
        tender.tendered = Some(total());
        assert!(tender.settle(total(), &SaleCustomer::Anonymous).is_err());
    }
}
