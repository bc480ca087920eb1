//! Shared API data structures for the Skill Swap backend

use serde::{Deserialize, Serialize};

/// Pagination parameters accepted by list endpoints
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PaginationParams {
    pub page: Option<i32>,
    pub limit: Option<i32>,
}

impl PaginationParams {
    /// Normalized page number (1-based)
    pub fn page(&self) -> i32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Normalized page size, clamped to 1..=100
    pub fn limit(&self) -> i32 {
        self.limit.unwrap_or(20).clamp(1, 100)
    }

    /// Row offset for the normalized page, widened so huge page numbers
    /// cannot overflow before reaching the query
    pub fn offset(&self) -> i64 {
        (self.page() as i64 - 1) * self.limit() as i64
    }
}

/// Paginated response envelope
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: i32,
    pub limit: i32,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total: i64, params: &PaginationParams) -> Self {
        Self {
            data,
            total,
            page: params.page(),
            limit: params.limit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        let params = PaginationParams::default();
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), 20);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_pagination_clamping() {
        let params = PaginationParams {
            page: Some(-3),
            limit: Some(1000),
        };
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), 100);

        let params = PaginationParams {
            page: Some(3),
            limit: Some(10),
        };
        assert_eq!(params.offset(), 20);

        let params = PaginationParams {
            page: Some(i32::MAX),
            limit: Some(100),
        };
        assert_eq!(params.offset(), (i32::MAX as i64 - 1) * 100);
    }
}
