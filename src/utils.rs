use serde::{Deserialize, Deserializer};

// Default page size for list endpoints
const DEFAULT_PAGE_LIMIT: u64 = 25;
// Max page size to prevent excessive requests
const MAX_PAGE_LIMIT: u64 = 100;

/// 1-based page/limit query parameters, as used by the comment tree and the
/// post list endpoints.
#[derive(Debug, Deserialize, Default, Clone, Copy)]
pub struct PageParams {
    #[serde(default, deserialize_with = "lenient_u64")]
    page: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    limit: u64,
}

/// Accepts both numbers and numeric strings. Query-string values arrive as
/// strings when this struct is flattened into another (serde buffers the
/// fields), and as parseable parts when deserialized directly.
fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    struct LenientU64;

    impl serde::de::Visitor<'_> for LenientU64 {
        type Value = u64;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("a non-negative integer")
        }

        fn visit_u64<E>(self, v: u64) -> Result<u64, E> {
            Ok(v)
        }

        fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<u64, E> {
            u64::try_from(v).map_err(E::custom)
        }

        fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<u64, E> {
            v.parse().map_err(E::custom)
        }
    }

    deserializer.deserialize_any(LenientU64)
}

impl PageParams {
    pub fn new(page: u64, limit: u64) -> Self {
        Self { page, limit }
    }

    pub fn page(&self) -> u64 {
        self.page.max(1)
    }

    pub fn limit(&self) -> u64 {
        if self.limit == 0 {
            DEFAULT_PAGE_LIMIT
        } else {
            self.limit.min(MAX_PAGE_LIMIT)
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page() - 1) * self.limit()
    }

    /// Total page count for `total` matching items.
    pub fn pages(&self, total: u64) -> u64 {
        total.div_ceil(self.limit())
    }
}
