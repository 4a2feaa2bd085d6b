//! Pagination envelopes shared by listing endpoints.

use serde::{Deserialize, Serialize};

fn default_page() -> i64 {
    1
}

fn default_size() -> i64 {
    10
}

/// Query-string pagination parameters, 1-based.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageRequest {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_size")]
    pub size: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, size: 10 }
    }
}

impl PageRequest {
    /// Clamp to sane bounds; page >= 1, 1 <= size <= 100.
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            size: self.size.clamp(1, 100),
        }
    }

    pub fn offset(self) -> i64 {
        let normalized = self.normalized();
        (normalized.page - 1) * normalized.size
    }

    pub fn limit(self) -> i64 {
        self.normalized().size
    }
}

/// One page of results plus totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub size: i64,
    pub pages: i64,
}

impl<T> PageResponse<T> {
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        let request = request.normalized();
        let pages = if total == 0 {
            0
        } else {
            (total + request.size - 1) / request.size
        };
        Self {
            items,
            total,
            page: request.page,
            size: request.size,
            pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResponse<U> {
        PageResponse {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            size: self.size,
            pages: self.pages,
        }
    }
}
