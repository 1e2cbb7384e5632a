//! Request DTOs for the sample API
//!
//! Defines the query strings accepted by the person endpoints.

use serde::Deserialize;

/// Default number of persons per page
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Largest accepted page size
pub const MAX_PAGE_SIZE: usize = 500;

/// Query string for `GET /persons`
///
/// # Fields
/// - `page`: zero-based page index (default 0)
/// - `page_size`: entries per page (default 20)
#[derive(Debug, Clone, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageQuery {
    /// Validates the query
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.page_size == 0 {
            return Some("Page size must be greater than zero".to_string());
        }
        if self.page_size > MAX_PAGE_SIZE {
            return Some(format!(
                "Page size exceeds maximum of {}",
                MAX_PAGE_SIZE
            ));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_query_defaults() {
        let query: PageQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.page, 0);
        assert_eq!(query.page_size, DEFAULT_PAGE_SIZE);
        assert!(query.validate().is_none());
    }

    #[test]
    fn test_page_query_explicit() {
        let query: PageQuery = serde_json::from_str(r#"{"page": 3, "page_size": 5}"#).unwrap();
        assert_eq!(query.page, 3);
        assert_eq!(query.page_size, 5);
    }

    #[test]
    fn test_validate_page_size_bounds() {
        let zero = PageQuery {
            page: 0,
            page_size: 0,
        };
        assert!(zero.validate().is_some());

        let huge = PageQuery {
            page: 0,
            page_size: MAX_PAGE_SIZE + 1,
        };
        assert!(huge.validate().is_some());
    }
}
