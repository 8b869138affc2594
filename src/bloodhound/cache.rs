//! Response cache scoped to a single agent turn.
//!
//! The agent loop runs each turn inside [`scope`]. Read-only requests made
//! within that future share one cache; requests made outside any scope (for
//! example directly through the MCP surface) are never cached. Nothing
//! survives past the end of the turn, so sessions cannot observe each other.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use serde_json::Value;

tokio::task_local! {
    static TURN_CACHE: TurnCache;
}

#[derive(Debug, Default)]
struct TurnCache {
    entries: Mutex<HashMap<String, Value>>,
}

/// Run `fut` with a fresh, empty turn cache.
pub async fn scope<F: Future>(fut: F) -> F::Output {
    TURN_CACHE.scope(TurnCache::default(), fut).await
}

/// Whether the current task is running inside a turn scope.
pub fn in_scope() -> bool {
    TURN_CACHE.try_with(|_| ()).is_ok()
}

pub(crate) fn lookup(key: &str) -> Option<Value> {
    TURN_CACHE
        .try_with(|cache| {
            cache
                .entries
                .lock()
                .ok()
                .and_then(|entries| entries.get(key).cloned())
        })
        .ok()
        .flatten()
}

pub(crate) fn store(key: &str, value: &Value) {
    let _ = TURN_CACHE.try_with(|cache| {
        if let Ok(mut entries) = cache.entries.lock() {
            entries.insert(key.to_string(), value.clone());
        }
    });
}
