//! User registry document
//!
//! The registry is a single JSON object mapping platform usernames to their
//! record: the chat channel they registered from and the ordered list of
//! host names they own. Insertion order of `hostList` is display order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Hosts shown per page when browsing a user's host list.
pub const PAGE_SIZE: usize = 5;

/// The persisted username → record mapping.
pub type Registry = BTreeMap<String, UserRecord>;

/// A registered user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Chat channel the user registered from.
    pub chat_id: i64,

    /// Host names owned by the user, in insertion order, no duplicates.
    #[serde(default)]
    pub host_list: Vec<String>,
}

impl UserRecord {
    /// Create a record with an empty host list.
    pub fn new(chat_id: i64) -> Self {
        Self {
            chat_id,
            host_list: Vec::new(),
        }
    }
}

/// Number of pages needed to show `hosts`, zero for an empty list.
pub fn total_pages(hosts: &[String]) -> usize {
    hosts.len().div_ceil(PAGE_SIZE)
}

/// The window of hosts on zero-based `page`.
///
/// An out-of-range page yields an empty slice, never an error.
pub fn page(hosts: &[String], page: usize) -> &[String] {
    let start = page.saturating_mul(PAGE_SIZE).min(hosts.len());
    let end = start.saturating_add(PAGE_SIZE).min(hosts.len());
    &hosts[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hosts(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("host{}", i)).collect()
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(&hosts(0)), 0);
        assert_eq!(total_pages(&hosts(1)), 1);
        assert_eq!(total_pages(&hosts(5)), 1);
        assert_eq!(total_pages(&hosts(6)), 2);
        assert_eq!(total_pages(&hosts(12)), 3);
    }

    #[test]
    fn test_page_windows() {
        let all = hosts(12);
        assert_eq!(page(&all, 0).len(), 5);
        assert_eq!(page(&all, 1).len(), 5);
        assert_eq!(page(&all, 2).len(), 2);
        assert_eq!(page(&all, 3).len(), 0);
        assert_eq!(page(&all, 0)[0], "host0");
        assert_eq!(page(&all, 2)[1], "host11");
    }

    #[test]
    fn test_page_out_of_range_is_empty() {
        let all = hosts(3);
        assert!(page(&all, 1).is_empty());
        assert!(page(&all, usize::MAX).is_empty());
    }

    #[test]
    fn test_record_layout() {
        let mut registry = Registry::new();
        registry.insert(
            "akio".to_string(),
            UserRecord {
                chat_id: 42,
                host_list: vec!["My-Host".to_string()],
            },
        );

        let json = serde_json::to_string(&registry).unwrap();
        assert!(json.contains("\"chatId\":42"));
        assert!(json.contains("\"hostList\":[\"My-Host\"]"));

        let back: Registry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, registry);
    }
}
