//! Bounded-concurrency fan-out for independent reads.
//!
//! Results come back in input order. A limit of 1 (or 0) runs the reads one
//! after another without building a stream.

use std::future::Future;

use futures_util::stream::{self, StreamExt};

/// Run `fetch` for every key with at most `limit` reads in flight.
pub async fn fetch_ordered<K, T, F, Fut>(keys: Vec<K>, limit: usize, fetch: F) -> Vec<(K, T)>
where
    K: Copy,
    F: Fn(K) -> Fut,
    Fut: Future<Output = T>,
{
    if limit <= 1 {
        let mut results = Vec::with_capacity(keys.len());
        for key in keys {
            results.push((key, fetch(key).await));
        }
        return results;
    }

    let fetch = &fetch;
    stream::iter(keys)
        .map(|key| async move { (key, fetch(key).await) })
        .buffered(limit)
        .collect()
        .await
}
