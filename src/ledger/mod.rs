//! Pure stock ledger rules.
//!
//! Everything in here works on plain values so the services can run it inside
//! a transaction and the tests can run it without a database.

pub mod alerts;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use utoipa::ToSchema;

use crate::entities::{product, stock_movement, MovementType};
use crate::errors::ServiceError;
use crate::validation::MAX_AMOUNT;

pub use alerts::{alerts_for, AlertKind, AlertSeverity, StockAlert};

pub const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("quantity for a {movement_type} movement must be {expected}, got {quantity}")]
    InvalidQuantity {
        movement_type: MovementType,
        quantity: Decimal,
        expected: &'static str,
    },

    #[error("available {available}, requested {requested}")]
    InsufficientStock {
        available: Decimal,
        requested: Decimal,
    },

    #[error("stock of {current} plus {quantity} exceeds the limit of {limit}")]
    StockLimitExceeded {
        current: Decimal,
        quantity: Decimal,
        limit: Decimal,
    },
}

impl From<LedgerError> for ServiceError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InvalidQuantity { .. } | LedgerError::StockLimitExceeded { .. } => {
                ServiceError::ValidationError(err.to_string())
            }
            LedgerError::InsufficientStock { .. } => {
                ServiceError::InsufficientStock(err.to_string())
            }
        }
    }
}

impl MovementType {
    /// Types that take stock out of the clinic.
    pub fn is_outflow(self) -> bool {
        matches!(self, Self::Out | Self::Expired | Self::Loss)
    }

    pub fn all() -> [MovementType; 5] {
        [
            Self::In,
            Self::Out,
            Self::Adjustment,
            Self::Expired,
            Self::Loss,
        ]
    }
}

/// Rejects quantities a movement of `movement_type` cannot carry.
pub fn validate_quantity(movement_type: MovementType, quantity: Decimal) -> Result<(), LedgerError> {
    let ok = match movement_type {
        MovementType::Adjustment => quantity >= Decimal::ZERO,
        _ => quantity > Decimal::ZERO,
    };
    if ok {
        Ok(())
    } else {
        Err(LedgerError::InvalidQuantity {
            movement_type,
            quantity,
            expected: if movement_type == MovementType::Adjustment {
                "zero or positive"
            } else {
                "positive"
            },
        })
    }
}

/// Stock level after applying one movement to `current`.
///
/// Adjustments carry the counted absolute level, not a delta. Stock never
/// rises above [`MAX_AMOUNT`].
pub fn apply(
    current: Decimal,
    movement_type: MovementType,
    quantity: Decimal,
) -> Result<Decimal, LedgerError> {
    validate_quantity(movement_type, quantity)?;

    match movement_type {
        MovementType::In => current
            .checked_add(quantity)
            .filter(|next| *next <= MAX_AMOUNT)
            .ok_or(LedgerError::StockLimitExceeded {
                current,
                quantity,
                limit: MAX_AMOUNT,
            }),
        MovementType::Adjustment => Ok(quantity),
        MovementType::Out | MovementType::Expired | MovementType::Loss => {
            if quantity > current {
                return Err(LedgerError::InsufficientStock {
                    available: current,
                    requested: quantity,
                });
            }
            Ok(current - quantity)
        }
    }
}

/// Stock level after undoing `movement` from `current`.
///
/// Inflows are clamped at zero since stock may have been consumed since.
/// Adjustments restore the level recorded before them.
pub fn reverse(current: Decimal, movement: &stock_movement::Model) -> Decimal {
    match movement.movement_type {
        MovementType::In => (current - movement.quantity).max(Decimal::ZERO),
        MovementType::Out | MovementType::Expired | MovementType::Loss => {
            current.saturating_add(movement.quantity)
        }
        MovementType::Adjustment => movement.previous_stock,
    }
}

/// Totals of a set of movements, grouped by type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MovementSummary {
    pub total_in: Decimal,
    pub total_out: Decimal,
    pub total_adjustments: Decimal,
    pub total_expired: Decimal,
    pub total_loss: Decimal,
    /// `total_in` minus every outflow. Adjustments do not count.
    pub net_movement: Decimal,
    pub movement_count: u64,
    #[schema(value_type = Object)]
    pub movements_by_type: BTreeMap<MovementType, u64>,
}

impl MovementSummary {
    /// Folds in `count` movements of one type whose quantities add up to `total`.
    pub fn record(&mut self, movement_type: MovementType, total: Decimal, count: u64) {
        match movement_type {
            MovementType::In => self.total_in += total,
            MovementType::Out => self.total_out += total,
            MovementType::Adjustment => self.total_adjustments += total,
            MovementType::Expired => self.total_expired += total,
            MovementType::Loss => self.total_loss += total,
        }
        self.movement_count += count;
        *self.movements_by_type.entry(movement_type).or_insert(0) += count;
        self.net_movement = self.total_in - self.total_outflow();
    }

    pub fn total_outflow(&self) -> Decimal {
        self.total_out + self.total_expired + self.total_loss
    }
}

pub fn summarize<'a, I>(movements: I) -> MovementSummary
where
    I: IntoIterator<Item = &'a stock_movement::Model>,
{
    let mut summary = MovementSummary::default();
    for m in movements {
        summary.record(m.movement_type, m.quantity, 1);
    }
    summary
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CategoryValuation {
    pub total_value: Decimal,
    pub total_quantity: Decimal,
    pub product_count: u64,
}

/// Value of stock on hand at cost price.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StockValuation {
    pub total_value: Decimal,
    pub total_quantity: Decimal,
    pub average_cost_per_unit: Decimal,
    #[schema(value_type = Object)]
    pub products_by_category: BTreeMap<String, CategoryValuation>,
}

pub fn valuation<'a, I>(products: I) -> StockValuation
where
    I: IntoIterator<Item = &'a product::Model>,
{
    let mut out = StockValuation::default();
    for p in products {
        let value = p.stock_value();
        out.total_value += value;
        out.total_quantity += p.current_stock;

        let key = p
            .category
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(UNCATEGORIZED)
            .to_string();
        let group = out.products_by_category.entry(key).or_default();
        group.total_value += value;
        group.total_quantity += p.current_stock;
        group.product_count += 1;
    }
    if out.total_quantity > Decimal::ZERO {
        out.average_cost_per_unit = (out.total_value / out.total_quantity).round_dp(4);
    }
    out
}

/// Headline numbers for the stock dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StockSummary {
    pub total_products: u64,
    pub total_value: Decimal,
    pub low_stock_count: u64,
    pub expired_count: u64,
    pub expiring_soon_count: u64,
    pub categories: Vec<String>,
}

pub fn stock_summary<'a, I>(products: I, today: NaiveDate, window_days: i64) -> StockSummary
where
    I: IntoIterator<Item = &'a product::Model>,
{
    let mut out = StockSummary::default();
    for p in products {
        out.total_products += 1;
        out.total_value += p.stock_value();
        if p.is_low_stock() {
            out.low_stock_count += 1;
        }
        if p.is_expired(today) {
            out.expired_count += 1;
        }
        if p.is_expiring_within(today, window_days) {
            out.expiring_soon_count += 1;
        }
        if let Some(category) = p.category.as_ref().filter(|c| !c.trim().is_empty()) {
            if !out.categories.contains(category) {
                out.categories.push(category.clone());
            }
        }
    }
    out.categories.sort();
    out
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn inflow_adds_and_outflows_subtract() {
        assert_eq!(apply(dec!(5), MovementType::In, dec!(3)).unwrap(), dec!(8));
        assert_eq!(apply(dec!(5), MovementType::Out, dec!(3)).unwrap(), dec!(2));
        assert_eq!(apply(dec!(5), MovementType::Expired, dec!(5)).unwrap(), dec!(0));
        assert_eq!(apply(dec!(5), MovementType::Loss, dec!(1)).unwrap(), dec!(4));
    }

    #[test]
    fn adjustment_sets_absolute_level() {
        assert_eq!(apply(dec!(12), MovementType::Adjustment, dec!(7)).unwrap(), dec!(7));
        assert_eq!(apply(dec!(12), MovementType::Adjustment, dec!(0)).unwrap(), dec!(0));
    }

    #[test]
    fn outflow_beyond_stock_is_rejected() {
        assert_matches!(
            apply(dec!(2), MovementType::Out, dec!(5)),
            Err(LedgerError::InsufficientStock { available, requested })
                if available == dec!(2) && requested == dec!(5)
        );
    }

    #[test]
    fn zero_quantity_only_allowed_for_adjustment() {
        assert_matches!(
            apply(dec!(2), MovementType::In, dec!(0)),
            Err(LedgerError::InvalidQuantity { .. })
        );
        assert_matches!(
            apply(dec!(2), MovementType::Loss, dec!(-1)),
            Err(LedgerError::InvalidQuantity { .. })
        );
        assert_matches!(
            apply(dec!(2), MovementType::Adjustment, dec!(-1)),
            Err(LedgerError::InvalidQuantity { .. })
        );
    }

    #[test]
    fn inflow_past_the_stock_limit_is_rejected() {
        assert_eq!(
            apply(MAX_AMOUNT - dec!(1), MovementType::In, dec!(1)).unwrap(),
            MAX_AMOUNT
        );
        assert_matches!(
            apply(MAX_AMOUNT, MovementType::In, dec!(1)),
            Err(LedgerError::StockLimitExceeded { .. })
        );
        let huge = dec!(70000000000000000000000000000);
        let err: ServiceError = apply(huge, MovementType::In, huge).unwrap_err().into();
        assert_matches!(err, ServiceError::ValidationError(_));
    }

    #[test]
    fn ledger_errors_map_to_service_errors() {
        let err: ServiceError = LedgerError::InsufficientStock {
            available: dec!(1),
            requested: dec!(2),
        }
        .into();
        assert_matches!(err, ServiceError::InsufficientStock(_));
    }

    #[test]
    fn reverse_undoes_each_type() {
        let inflow = movement(MovementType::In, dec!(4), dec!(1), dec!(5));
        assert_eq!(reverse(dec!(5), &inflow), dec!(1));
        assert_eq!(reverse(dec!(2), &inflow), dec!(0));

        let out = movement(MovementType::Out, dec!(3), dec!(5), dec!(2));
        assert_eq!(reverse(dec!(2), &out), dec!(5));

        let adj = movement(MovementType::Adjustment, dec!(9), dec!(4), dec!(9));
        assert_eq!(reverse(dec!(9), &adj), dec!(4));
    }

    #[test]
    fn scenario_in_out_adjustment_loss() {
        let ledger = vec![
            movement(MovementType::In, dec!(10), dec!(0), dec!(10)),
            movement(MovementType::Out, dec!(3), dec!(10), dec!(7)),
            movement(MovementType::Adjustment, dec!(0), dec!(7), dec!(0)),
            movement(MovementType::Loss, dec!(2), dec!(2), dec!(0)),
        ];

        let summary = summarize(&ledger);
        assert_eq!(summary.total_in, dec!(10));
        assert_eq!(summary.total_outflow(), dec!(5));
        assert_eq!(summary.net_movement, dec!(5));
        assert_eq!(summary.movement_count, 4);
        assert_eq!(summary.movements_by_type[&MovementType::Adjustment], 1);
    }

    #[test]
    fn valuation_groups_uncategorized() {
        let mut a = product("Botox", dec!(2), dec!(1));
        a.cost_price = dec!(100);
        a.category = Some("Toxins".into());
        let mut b = product("Gauze", dec!(10), dec!(1));
        b.cost_price = dec!(1.5);

        let v = valuation([&a, &b]);
        assert_eq!(v.total_value, dec!(215));
        assert_eq!(v.total_quantity, dec!(12));
        assert_eq!(v.products_by_category["Toxins"].total_value, dec!(200));
        assert_eq!(v.products_by_category[UNCATEGORIZED].product_count, 1);
    }

    #[test]
    fn valuation_of_empty_stock_has_zero_average() {
        let v = valuation(std::iter::empty());
        assert_eq!(v.average_cost_per_unit, Decimal::ZERO);
    }

    #[test]
    fn stock_summary_counts_flags() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let mut low = product("Low", dec!(1), dec!(5));
        low.category = Some("B".into());
        let mut expired = product("Old", dec!(10), dec!(1));
        expired.expiry_date = NaiveDate::from_ymd_opt(2024, 5, 1);
        expired.category = Some("A".into());
        let mut soon = product("Soon", dec!(10), dec!(1));
        soon.expiry_date = NaiveDate::from_ymd_opt(2024, 6, 20);
        soon.category = Some("A".into());

        let s = stock_summary([&low, &expired, &soon], today, 30);
        assert_eq!(s.total_products, 3);
        assert_eq!(s.low_stock_count, 1);
        assert_eq!(s.expired_count, 1);
        assert_eq!(s.expiring_soon_count, 1);
        assert_eq!(s.categories, vec!["A".to_string(), "B".to_string()]);
    }

    fn movement_type() -> impl Strategy<Value = MovementType> {
        prop::sample::select(MovementType::all().to_vec())
    }

    proptest! {
        #[test]
        fn summary_reconciles_with_its_parts(
            entries in prop::collection::vec((movement_type(), 0u32..1000), 0..60)
        ) {
            let ledger: Vec<_> = entries
                .iter()
                .map(|(t, q)| movement(*t, Decimal::from(*q), Decimal::ZERO, Decimal::ZERO))
                .collect();
            let s = summarize(&ledger);

            prop_assert_eq!(s.net_movement, s.total_in - s.total_out - s.total_expired - s.total_loss);
            prop_assert_eq!(s.movement_count as usize, ledger.len());
            prop_assert_eq!(s.movements_by_type.values().sum::<u64>(), s.movement_count);
        }

        #[test]
        fn applying_then_reversing_restores_stock(
            start in 0u32..500,
            t in movement_type(),
            q in 1u32..500,
        ) {
            let start = Decimal::from(start);
            let q = Decimal::from(q);
            if let Ok(after) = apply(start, t, q) {
                let m = movement(t, q, start, after);
                prop_assert_eq!(reverse(after, &m), start);
            }
        }
    }
}
