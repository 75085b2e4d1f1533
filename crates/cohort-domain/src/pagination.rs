//! Limit/offset windows for list endpoints.

use serde::{Deserialize, Serialize};

/// Default number of rows returned when `limit` is absent.
pub const DEFAULT_LIMIT: u64 = 50;

/// Upper bound on `limit`.
pub const MAX_LIMIT: u64 = 100;

/// Raw `?limit=&offset=` query, as sent by the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Normalized window.
///
/// - `limit`: non-positive values become 1, absent becomes [`DEFAULT_LIMIT`], capped at [`MAX_LIMIT`]
/// - `offset`: negative or absent becomes 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub limit: u64,
    pub offset: u64,
}

impl Default for Window {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl From<WindowQuery> for Window {
    fn from(q: WindowQuery) -> Self {
        let limit = match q.limit {
            None => DEFAULT_LIMIT,
            Some(l) if l <= 0 => 1,
            Some(l) => (l as u64).min(MAX_LIMIT),
        };
        let offset = q.offset.filter(|o| *o > 0).map_or(0, |o| o as u64);
        Self { limit, offset }
    }
}
