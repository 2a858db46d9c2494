//! Common API types

use serde::Deserialize;

/// Pagination query parameters shared by list endpoints
#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    10
}

impl Default for PaginationQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        let query: PaginationQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, 10);
    }

    #[test]
    fn test_pagination_explicit_values() {
        let query: PaginationQuery = serde_json::from_str(r#"{"page":3,"limit":25}"#).unwrap();
        assert_eq!(query.page, 3);
        assert_eq!(query.limit, 25);
    }
}
