//! Read-only queries against the call-sign store.

use std::collections::HashSet;
use std::ops::ControlFlow;

use crate::error::Result;
use crate::models::{normalize_call_sign, CallsignLookupResult, PopulationMarker};
use crate::store::{StoreHandle, DATA_LOADED_KEY};

/// Default cap on partial-search results.
pub const DEFAULT_MAX_RESULTS: usize = 50;

/// Exact, case-insensitive lookup. A miss is `Ok(None)`.
pub async fn lookup_exact(store: &StoreHandle, call_sign: &str) -> Result<Option<CallsignLookupResult>> {
    let key = normalize_call_sign(call_sign);
    let entry = store.get_by_key(key).await?;
    Ok(entry.map(CallsignLookupResult::from))
}

/// Partial search: call signs starting with `term` first, in key order,
/// then call signs merely containing it, in storage order.
pub async fn search_partial(
    store: &StoreHandle,
    term: &str,
    max_results: usize,
) -> Result<Vec<CallsignLookupResult>> {
    if max_results == 0 {
        return Ok(Vec::new());
    }

    let term = normalize_call_sign(term);
    let prefix_matches = store.range_by_prefix(term.clone(), max_results).await?;
    if prefix_matches.len() >= max_results {
        return Ok(prefix_matches
            .into_iter()
            .take(max_results)
            .map(CallsignLookupResult::from)
            .collect());
    }

    let seen: HashSet<String> = prefix_matches.iter().map(|e| e.call_sign.clone()).collect();
    let remaining = max_results - prefix_matches.len();

    let contains_matches = store
        .run(move |store| {
            let mut found = Vec::new();
            store.scan_all(&mut |entry| {
                if !seen.contains(&entry.call_sign) && entry.call_sign.contains(&term) {
                    found.push(entry);
                    if found.len() >= remaining {
                        return ControlFlow::Break(());
                    }
                }
                ControlFlow::Continue(())
            })?;
            Ok(found)
        })
        .await?;

    Ok(prefix_matches
        .into_iter()
        .chain(contains_matches)
        .map(CallsignLookupResult::from)
        .collect())
}

/// Whether a complete dataset load has been recorded.
pub async fn is_populated(store: &StoreHandle) -> Result<bool> {
    let marker: Option<PopulationMarker> = store.get_meta(DATA_LOADED_KEY).await?;
    Ok(marker.is_some_and(|m| m.loaded))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::CallsignEntry;
    use crate::store::SqliteStore;

    async fn store_with(calls: &[&str]) -> StoreHandle {
        let store = StoreHandle::new(Arc::new(SqliteStore::in_memory()));
        store.open().await.unwrap();
        let entries = calls
            .iter()
            .map(|c| CallsignEntry::new(c, "Jane", "Doe"))
            .collect();
        store.write_batch(entries).await.unwrap();
        store
    }

    fn calls(results: &[CallsignLookupResult]) -> Vec<&str> {
        results.iter().map(|r| r.call_sign.as_str()).collect()
    }

    #[tokio::test]
    async fn test_lookup_exact_any_case() {
        let store = store_with(&["W1AW"]).await;

        let found = lookup_exact(&store, "w1aw").await.unwrap().unwrap();
        assert_eq!(found.call_sign, "W1AW");
        assert_eq!(found.full_name, "Doe, Jane");
        assert!(lookup_exact(&store, "W1AX").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_prefix_before_contains() {
        let store = store_with(&["XABC99", "ABC123", "AB9"]).await;

        let results = search_partial(&store, "ab", 10).await.unwrap();
        assert_eq!(calls(&results), vec!["AB9", "ABC123", "XABC99"]);
    }

    #[tokio::test]
    async fn test_search_respects_cap() {
        let store = store_with(&["AB1", "AB2", "AB3", "XAB1", "XAB2"]).await;

        assert_eq!(search_partial(&store, "AB", 2).await.unwrap().len(), 2);
        assert_eq!(calls(&search_partial(&store, "AB", 2).await.unwrap()), vec!["AB1", "AB2"]);

        let four = search_partial(&store, "AB", 4).await.unwrap();
        assert_eq!(four.len(), 4);
        assert_eq!(calls(&four[..3]), vec!["AB1", "AB2", "AB3"]);
        assert!(four[3].call_sign.starts_with("XAB"));

        assert!(search_partial(&store, "AB", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_contains_does_not_repeat_prefix_matches() {
        let store = store_with(&["ABAB", "XAB"]).await;

        let results = search_partial(&store, "AB", 10).await.unwrap();
        assert_eq!(calls(&results), vec!["ABAB", "XAB"]);
    }

    #[tokio::test]
    async fn test_search_without_matches_is_empty() {
        let store = store_with(&["W1AW"]).await;
        assert!(search_partial(&store, "ZZ", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_is_populated_follows_marker() {
        let store = store_with(&["W1AW"]).await;
        assert!(!is_populated(&store).await.unwrap());

        store
            .set_meta(DATA_LOADED_KEY, &PopulationMarker::loaded(1))
            .await
            .unwrap();
        assert!(is_populated(&store).await.unwrap());
    }
}
