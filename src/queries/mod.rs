//! Read-side queries. Each one composes order-independent filters into a
//! sea-orm condition scoped to the caller's session.

pub mod movement_queries;
pub mod product_queries;

use async_trait::async_trait;
use sea_orm::{
    sea_query::{Alias, Expr, Func, IntoColumnRef, LikeExpr, SimpleExpr},
    DatabaseConnection, Order,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::ServiceError;

pub use movement_queries::{
    ListMovementsQuery, MovementFilter, MovementQuery, MovementSort, MovementSummaryQuery,
    MovementWithProduct,
};
pub use product_queries::{ListProductsQuery, ProductFilter, ProductQuery, ProductSort};

#[async_trait]
pub trait Query: Send + Sync {
    type Result: Send + Sync;

    async fn execute(&self, db_pool: &DatabaseConnection) -> Result<Self::Result, ServiceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl From<SortDirection> for Order {
    fn from(dir: SortDirection) -> Self {
        match dir {
            SortDirection::Asc => Order::Asc,
            SortDirection::Desc => Order::Desc,
        }
    }
}

/// One page of a listing, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u64,
    pub per_page: u64,
}

impl PageWindow {
    /// Clamps caller input: page starts at 1, `per_page` within `1..=max`.
    pub fn new(page: Option<u64>, per_page: Option<u64>, default_per_page: u64, max_per_page: u64) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(default_per_page).clamp(1, max_per_page.max(1)),
        }
    }

    /// Rows to skip, saturating at the largest offset SQL accepts.
    pub fn offset(&self) -> u64 {
        self.page
            .saturating_sub(1)
            .saturating_mul(self.per_page)
            .min(i64::MAX as u64)
    }
}

impl Default for PageWindow {
    fn default() -> Self {
        Self { page: 1, per_page: 20 }
    }
}

/// Trimmed, lowercased search term; `None` when blank.
pub fn search_term(raw: &str) -> Option<String> {
    let term = raw.trim().to_lowercase();
    (!term.is_empty()).then_some(term)
}

const LIKE_ESCAPE: char = '!';

/// `%term%` with the LIKE wildcards in `term` taken literally.
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Uppercase forms of the non-ASCII letters in a lowercased term, paired
/// with the letter they fold to. SQLite's `lower()` only folds ASCII.
fn unicode_folds(term: &str) -> Vec<(String, String)> {
    let mut folds: Vec<(String, String)> = Vec::new();
    for c in term.chars().filter(|c| !c.is_ascii()) {
        let mut upper = c.to_uppercase();
        if let (Some(u), None) = (upper.next(), upper.next()) {
            let pair = (u.to_string(), c.to_string());
            if u != c && !folds.contains(&pair) {
                folds.push(pair);
            }
        }
    }
    folds
}

/// Case-insensitive substring match on a column, the SQL side of
/// [`text_contains`].
pub fn lower_contains<C: IntoColumnRef>(column: C, term: &str) -> SimpleExpr {
    let folded = unicode_folds(term).into_iter().fold(
        SimpleExpr::from(Func::lower(Expr::col(column))),
        |expr, (from, to)| {
            Func::cust(Alias::new("replace"))
                .arg(expr)
                .arg(Expr::val(from))
                .arg(Expr::val(to))
                .into()
        },
    );
    Expr::expr(folded).like(LikeExpr::new(contains_pattern(term)).escape(LIKE_ESCAPE))
}

/// In-memory twin of [`lower_contains`].
pub fn text_contains(haystack: Option<&str>, term: &str) -> bool {
    haystack
        .map(|h| h.to_lowercase().contains(term))
        .unwrap_or(false)
}
