use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{queries::PageWindow, ApiResponse, AppState};

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(ApiResponse::success(data))).into_response()
}

/// Standard no content response
pub fn no_content_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// An outbound link the client opens itself
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LinkResponse {
    pub url: String,
}

/// Pagination parameters for list operations
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// 1-based page number
    pub page: Option<u64>,
    /// Defaults to the configured page size; clamped to the configured maximum
    pub per_page: Option<u64>,
}

impl PaginationParams {
    pub fn window(&self, state: &AppState) -> PageWindow {
        PageWindow::new(
            self.page,
            self.per_page,
            state.config.api_default_page_size,
            state.config.api_max_page_size,
        )
    }
}

/// Standard pagination response metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaginationMeta {
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl PaginationMeta {
    pub fn new(window: PageWindow, total: u64) -> Self {
        Self {
            page: window.page,
            per_page: window.per_page,
            total,
            total_pages: total.div_ceil(window.per_page.max(1)),
        }
    }
}

/// Standard paginated response wrapper
#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, window: PageWindow, total: u64) -> Self {
        Self {
            data,
            pagination: PaginationMeta::new(window, total),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_listing_has_no_pages() {
        let meta = PaginationMeta::new(PageWindow::default(), 0);
        assert_eq!(meta.total_pages, 0);
    }

    proptest! {
        #[test]
        fn page_count_and_last_page_size(total in 0u64..5_000, per_page in 1u64..200) {
            let meta = PaginationMeta::new(PageWindow { page: 1, per_page }, total);
            prop_assert_eq!(meta.total_pages, (total + per_page - 1) / per_page);

            if total > 0 {
                let last = PageWindow { page: meta.total_pages, per_page };
                let on_last = total - last.offset();
                let expected = if total % per_page == 0 { per_page } else { total % per_page };
                prop_assert_eq!(on_last, expected);
            }
        }
    }
}
