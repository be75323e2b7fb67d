pub mod appointments;
pub mod campaigns;
pub mod cash_flow;
pub mod clients;
pub mod procedures;
pub mod products;
pub mod stock;

use chrono::{NaiveDate, Utc};

/// Today's date in UTC; stock alerts and expiry checks are day-granular.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Empty or whitespace-only strings become `None`.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
