use sea_orm::sea_query::SelectStatement;
use serde_json::Value;

/// A resolved page request.
///
/// `limit` falls back to the resource default when absent or not positive and is
/// clamped to the configured maximum. `page` is 1-based, values below 1 read as 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
}

impl Pagination {
    #[must_use]
    pub fn resolve(
        limit: Option<i64>,
        page: Option<i64>,
        default_limit: u64,
        max_limit: Option<u64>,
    ) -> Self {
        let limit = limit
            .and_then(|limit| u64::try_from(limit).ok())
            .filter(|&limit| limit > 0)
            .unwrap_or(default_limit);
        let limit = max_limit.map_or(limit, |max| limit.min(max));
        let page = page
            .and_then(|page| u64::try_from(page).ok())
            .filter(|&page| page > 0)
            .unwrap_or(1);

        Self { page, limit }
    }

    /// Read `limit` and `page` from a request body. Numbers and numeric strings
    /// are accepted, anything else counts as absent.
    #[must_use]
    pub fn from_request(raw: &Value, default_limit: u64, max_limit: Option<u64>) -> Self {
        Self::resolve(
            integer(raw.get("limit")),
            integer(raw.get("page")),
            default_limit,
            max_limit,
        )
    }

    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// `LIMIT` / `OFFSET` for this page.
    pub fn apply(&self, select: &mut SelectStatement) {
        select.limit(self.limit).offset(self.offset());
    }
}

fn integer(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
