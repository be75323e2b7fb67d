//! Day-by-day cash-flow projection.

use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;
use utoipa::ToSchema;
use validator::Validate;

use crate::errors::ServiceError;

/// Longest projection window accepted from callers.
pub const MAX_PERIOD_DAYS: u32 = 3660;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("projection window runs past the last supported date")]
    DateOutOfRange,
    #[error("cash-flow totals exceed the supported range")]
    AmountOverflow,
}

impl From<ProjectionError> for ServiceError {
    fn from(err: ProjectionError) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

fn add(a: Decimal, b: Decimal) -> Result<Decimal, ProjectionError> {
    a.checked_add(b).ok_or(ProjectionError::AmountOverflow)
}

fn sub(a: Decimal, b: Decimal) -> Result<Decimal, ProjectionError> {
    a.checked_sub(b).ok_or(ProjectionError::AmountOverflow)
}

/// `start` plus `days`, or an error past `NaiveDate::MAX`.
pub fn shift_date(start: NaiveDate, days: i64) -> Result<NaiveDate, ProjectionError> {
    start
        .checked_add_signed(Duration::days(days))
        .ok_or(ProjectionError::DateOutOfRange)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntryType {
    Income,
    Expense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntryStatus {
    Confirmed,
    #[default]
    Projected,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct CashFlowEntry {
    pub date: NaiveDate,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    pub entry_type: EntryType,
    #[validate(custom = "crate::validation::validate_amount")]
    pub amount: Decimal,
    #[serde(default)]
    pub status: EntryStatus,
    /// Informational only; recurring entries are not repeated.
    #[serde(default)]
    pub is_recurring: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Granularity {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DailyProjection {
    pub date: NaiveDate,
    pub income: Decimal,
    pub expenses: Decimal,
    pub balance: Decimal,
    pub cumulative_balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProjectionBucket {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub income: Decimal,
    pub expenses: Decimal,
    pub balance: Decimal,
    pub cumulative_balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CashFlowProjection {
    pub seed_balance: Decimal,
    pub days: Vec<DailyProjection>,
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub net_cash_flow: Decimal,
    pub final_balance: Decimal,
    pub days_with_negative_balance: u32,
    pub days_with_income: u32,
    pub days_with_expenses: u32,
    pub has_negative_balance: bool,
}

/// Projects `period_days` days starting at `start`, seeded with `seed_balance`.
pub fn project(
    seed_balance: Decimal,
    entries: &[CashFlowEntry],
    start: NaiveDate,
    period_days: u32,
) -> Result<CashFlowProjection, ProjectionError> {
    shift_date(start, i64::from(period_days))?;

    let mut days = Vec::with_capacity(period_days as usize);
    let mut cumulative = seed_balance;
    let mut total_income = Decimal::ZERO;
    let mut total_expenses = Decimal::ZERO;

    for offset in 0..period_days {
        let date = shift_date(start, i64::from(offset))?;
        let (income, expenses) = entries.iter().filter(|e| e.date == date).try_fold(
            (Decimal::ZERO, Decimal::ZERO),
            |(inc, exp), e| match e.entry_type {
                EntryType::Income => Ok((add(inc, e.amount)?, exp)),
                EntryType::Expense => Ok((inc, add(exp, e.amount)?)),
            },
        )?;
        let balance = sub(income, expenses)?;
        cumulative = add(cumulative, balance)?;
        total_income = add(total_income, income)?;
        total_expenses = add(total_expenses, expenses)?;
        days.push(DailyProjection {
            date,
            income,
            expenses,
            balance,
            cumulative_balance: cumulative,
        });
    }

    let days_with_negative_balance = count(&days, |d| d.cumulative_balance < Decimal::ZERO);

    Ok(CashFlowProjection {
        seed_balance,
        final_balance: cumulative,
        total_income,
        total_expenses,
        net_cash_flow: sub(total_income, total_expenses)?,
        days_with_negative_balance,
        days_with_income: count(&days, |d| d.income > Decimal::ZERO),
        days_with_expenses: count(&days, |d| d.expenses > Decimal::ZERO),
        has_negative_balance: days_with_negative_balance > 0,
        days,
    })
}

fn count(days: &[DailyProjection], pred: impl Fn(&DailyProjection) -> bool) -> u32 {
    days.iter().filter(|d| pred(d)).count() as u32
}

impl CashFlowProjection {
    /// Regroups the daily rows. Weeks are 7-day windows from the first day;
    /// months follow the calendar and are clipped to the projection window.
    pub fn buckets(&self, granularity: Granularity) -> Vec<ProjectionBucket> {
        let mut out: Vec<ProjectionBucket> = Vec::new();
        let Some(first) = self.days.first() else {
            return out;
        };

        for day in &self.days {
            let key_changed = match (granularity, out.last()) {
                (_, None) => true,
                (Granularity::Daily, Some(_)) => true,
                (Granularity::Weekly, Some(_)) => (day.date - first.date).num_days() % 7 == 0,
                (Granularity::Monthly, Some(b)) => {
                    (day.date.year(), day.date.month())
                        != (b.period_start.year(), b.period_start.month())
                }
            };

            if key_changed {
                out.push(ProjectionBucket {
                    period_start: day.date,
                    period_end: day.date,
                    income: Decimal::ZERO,
                    expenses: Decimal::ZERO,
                    balance: Decimal::ZERO,
                    cumulative_balance: day.cumulative_balance,
                });
            }
            if let Some(bucket) = out.last_mut() {
                bucket.period_end = day.date;
                bucket.income += day.income;
                bucket.expenses += day.expenses;
                bucket.balance += day.balance;
                bucket.cumulative_balance = day.cumulative_balance;
            }
        }
        out
    }
}
