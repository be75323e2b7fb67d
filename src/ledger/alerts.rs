use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::Display;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::product;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AlertKind {
    LowStock,
    Expired,
    ExpiringSoon,
}

/// Ordered most urgent first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AlertSeverity {
    Critical,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StockAlert {
    pub product_id: Uuid,
    pub product_name: String,
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub current_stock: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_stock: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_until_expiry: Option<i64>,
}

fn low_stock_severity(current: Decimal, min: Decimal) -> AlertSeverity {
    if current.is_zero() {
        AlertSeverity::Critical
    } else if current <= min / Decimal::TWO {
        AlertSeverity::High
    } else {
        AlertSeverity::Medium
    }
}

fn expiring_severity(days_left: i64) -> AlertSeverity {
    if days_left <= 7 {
        AlertSeverity::High
    } else if days_left <= 15 {
        AlertSeverity::Medium
    } else {
        AlertSeverity::Low
    }
}

/// Builds every alert raised by `product` on `today`.
pub fn product_alerts(product: &product::Model, today: NaiveDate, window_days: i64) -> Vec<StockAlert> {
    let mut alerts = Vec::new();
    let base = |kind, severity| StockAlert {
        product_id: product.id,
        product_name: product.name.clone(),
        kind,
        severity,
        current_stock: product.current_stock,
        min_stock: None,
        expiry_date: None,
        days_until_expiry: None,
    };

    if product.is_low_stock() {
        alerts.push(StockAlert {
            min_stock: Some(product.min_stock),
            ..base(
                AlertKind::LowStock,
                low_stock_severity(product.current_stock, product.min_stock),
            )
        });
    }

    if let Some(days_left) = product.days_until_expiry(today) {
        let expiry = |kind, severity| StockAlert {
            expiry_date: product.expiry_date,
            days_until_expiry: Some(days_left),
            ..base(kind, severity)
        };
        if days_left < 0 {
            alerts.push(expiry(AlertKind::Expired, AlertSeverity::Critical));
        } else if days_left <= window_days {
            alerts.push(expiry(AlertKind::ExpiringSoon, expiring_severity(days_left)));
        }
    }

    alerts
}

/// Alerts for a set of products, most severe first and then by product name.
pub fn alerts_for<'a, I>(products: I, today: NaiveDate, window_days: i64) -> Vec<StockAlert>
where
    I: IntoIterator<Item = &'a product::Model>,
{
    let mut alerts: Vec<StockAlert> = products
        .into_iter()
        .flat_map(|p| product_alerts(p, today, window_days))
        .collect();
    alerts.sort_by(|a, b| {
        a.severity
            .cmp(&b.severity)
            .then_with(|| a.product_name.cmp(&b.product_name))
    });
    alerts
}
