//! Pagination request and response contract.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page size accepted unless configured otherwise.
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

/// A page request could not be accepted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageError {
    /// Page index below zero.
    #[error("page must be greater than or equal to 0")]
    NegativePage,
    /// Page size of zero or below.
    #[error("size must be greater than 0")]
    NonPositiveSize,
    /// Page size above the configured maximum.
    #[error("size must be less than or equal to {max}")]
    SizeTooLarge {
        /// Configured maximum.
        max: u32,
    },
    /// `page * size` does not fit in a row offset.
    #[error("page offset is out of range")]
    OffsetOverflow,
}

/// A validated zero-based page index and page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    size: u32,
}

impl PageRequest {
    /// Validate raw caller input against `max_size`.
    pub fn try_new(page: i64, size: i64, max_size: u32) -> Result<Self, PageError> {
        if page < 0 {
            return Err(PageError::NegativePage);
        }
        if size <= 0 {
            return Err(PageError::NonPositiveSize);
        }
        let size = u32::try_from(size)
            .ok()
            .filter(|s| *s <= max_size)
            .ok_or(PageError::SizeTooLarge { max: max_size })?;
        let page = u32::try_from(page).ok().ok_or(PageError::OffsetOverflow)?;
        Ok(Self { page, size })
    }

    /// Zero-based page index.
    pub const fn page(self) -> u32 {
        self.page
    }

    /// Rows per page.
    pub const fn size(self) -> u32 {
        self.size
    }

    /// Rows to skip: `page * size`.
    pub fn offset(self) -> u64 {
        // Both factors fit in u32, so the product never saturates.
        u64::from(self.page).saturating_mul(u64::from(self.size))
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// A listing annotated with pagination metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct PagedResponse<T> {
    /// Items of the requested page.
    pub content: Vec<T>,
    /// Zero-based page index.
    pub page: u32,
    /// Requested page size.
    pub size: u32,
    /// Rows matching the query across all pages.
    #[ts(type = "number")]
    pub total_elements: u64,
    /// `ceil(total_elements / size)`, 0 for an empty result.
    #[ts(type = "number")]
    pub total_pages: u64,
    /// Whether a later page exists.
    pub has_next: bool,
    /// Whether an earlier page exists.
    pub has_previous: bool,
}

impl<T> PagedResponse<T> {
    /// Assemble a page from its content and the matching row count.
    pub fn of(content: Vec<T>, request: PageRequest, total_elements: u64) -> Self {
        let size = u64::from(request.size());
        let total_pages = total_elements.div_ceil(size.max(1));
        let page = u64::from(request.page());
        Self {
            content,
            page: request.page(),
            size: request.size(),
            total_elements,
            total_pages,
            has_next: page.checked_add(1).is_some_and(|next| next < total_pages),
            has_previous: page > 0,
        }
    }

    /// Convert the content while keeping the metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResponse<U> {
        PagedResponse {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
            has_next: self.has_next,
            has_previous: self.has_previous,
        }
    }
}
