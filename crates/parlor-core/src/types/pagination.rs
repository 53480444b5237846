//! Pagination request/response types.

use serde::{Deserialize, Serialize};

/// A page request parsed from query parameters.
///
/// `page` is 1-based. Out-of-range values are clamped rather than rejected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PageRequest {
    /// 1-based page number.
    #[serde(default = "default_page")]
    pub page: u32,
    /// Number of items per page (capped at [`PageRequest::MAX_PAGE_SIZE`]).
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    20
}

impl PageRequest {
    /// Upper bound on page size.
    pub const MAX_PAGE_SIZE: u32 = 100;

    /// Create a page request, clamping out-of-range values.
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }.clamped(default_page_size())
    }

    /// Return a copy with `page` and `page_size` clamped to valid ranges,
    /// falling back to `fallback_size` for a zero page size.
    pub fn clamped(self, fallback_size: u32) -> Self {
        let page = self.page.max(1);
        let page_size = if self.page_size < 1 {
            fallback_size
        } else {
            self.page_size.min(Self::MAX_PAGE_SIZE)
        };
        Self { page, page_size }
    }

    /// SQL OFFSET for this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.max(1) - 1) * u64::from(self.page_size)
    }

    /// SQL LIMIT for this page.
    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

/// A page of results with pagination metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResponse<T> {
    /// Items in this page.
    pub items: Vec<T>,
    /// 1-based page number.
    pub page: u32,
    /// Page size used for the query.
    pub page_size: u32,
    /// Total number of items across all pages.
    pub total: u64,
    /// Total number of pages.
    pub total_pages: u64,
}

impl<T> PageResponse<T> {
    /// Build a page response from items plus the request that produced them.
    pub fn new(items: Vec<T>, page: u32, page_size: u32, total: u64) -> Self {
        let total_pages = if page_size == 0 {
            0
        } else {
            total.div_ceil(u64::from(page_size))
        };
        Self {
            items,
            page,
            page_size,
            total,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_page_and_size() {
        let page = PageRequest { page: 0, page_size: 500 }.clamped(20);
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, PageRequest::MAX_PAGE_SIZE);

        let page = PageRequest { page: 3, page_size: 0 }.clamped(50);
        assert_eq!(page.page_size, 50);
        assert_eq!(page.offset(), 100);
    }

    #[test]
    fn total_pages_rounds_up() {
        let resp = PageResponse::<u8>::new(vec![], 1, 20, 41);
        assert_eq!(resp.total_pages, 3);
    }
}
