pub mod error;
pub mod ids;
pub mod notification;
pub mod pull_request;
pub mod query;
pub mod repo;
pub mod rule;
pub mod sync_state;
pub mod tag;
pub mod thread;
pub mod user;
pub mod view;

/// A page of results over simple `page`/`page_size` offsets rather than
/// opaque tokens. `page=0`/non-positive `page_size` defaulting is a caller
/// concern (§8 boundary behaviors), not the store's.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// `page=0` is treated as `1`; a non-positive `page_size` defaults to
/// [`DEFAULT_PAGE_SIZE`] (§8).
pub fn normalize_paging(page: i64, page_size: i64) -> (i64, i64) {
    let page = if page < 1 { 1 } else { page };
    let page_size = if page_size < 1 { DEFAULT_PAGE_SIZE } else { page_size };
    (page, page_size)
}

pub fn offset_for(page: i64, page_size: i64) -> i64 {
    (page - 1) * page_size
}
