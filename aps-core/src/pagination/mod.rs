//! Pagination engines for APS list endpoints.
//!
//! Two page models are in use across the APIs:
//! - offset/limit (`?offset=&limit=`), walked by [`OffsetPaginator`]
//! - opaque cursors (`?cursorState=`), walked by [`CursorPaginator`]
//!
//! Both engines are pull-based: a page is fetched only when the caller asks
//! for an item past the end of the current page, and dropping the paginator
//! stops all further requests. The envelope types below decode the common
//! response shapes.

mod cursor;
mod offset;

use serde::Deserialize;

pub use cursor::{CURSOR_STATE_PARAM, CursorPage, CursorPaginator, cursor_from_next_url};
pub use offset::OffsetPaginator;

/// Pagination block of an offset/limit response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OffsetPagination {
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub limit: usize,
    #[serde(default)]
    pub total_results: usize,
}

/// Response envelope of an offset/limit list endpoint.
///
/// `results` stays optional: some endpoints send `null` instead of `[]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct OffsetPage<T> {
    #[serde(default)]
    pub pagination: Option<OffsetPagination>,
    #[serde(default)]
    pub results: Option<Vec<T>>,
}

/// Pagination block of a cursor response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorPagination {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub total_results: Option<usize>,
    #[serde(default)]
    pub next_url: Option<String>,
}

/// Response envelope of a cursor-paginated list endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct CursorEnvelope<T> {
    #[serde(default)]
    pub pagination: Option<CursorPagination>,
    #[serde(default)]
    pub results: Option<Vec<T>>,
}

impl<T> CursorEnvelope<T> {
    /// Convert into a [`CursorPage`], extracting the next cursor from `nextUrl`.
    ///
    /// Returns `None` if the response carried no `results` or no `pagination`.
    pub fn into_page(self) -> Option<CursorPage<T>> {
        let pagination = self.pagination?;
        let results = self.results?;
        Some(CursorPage::from_next_url(results, pagination.next_url.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_page_with_null_results() {
        let page: OffsetPage<u32> =
            serde_json::from_str(r#"{"pagination":{"offset":0,"limit":20,"totalResults":0},"results":null}"#)
                .unwrap();
        assert!(page.results.is_none());
        assert_eq!(page.pagination.unwrap().limit, 20);
    }

    #[test]
    fn test_cursor_envelope_into_page() {
        let envelope: CursorEnvelope<u32> = serde_json::from_str(
            r#"{"pagination":{"limit":2,"totalResults":5,"nextUrl":"/items?cursorState=abc"},"results":[1,2]}"#,
        )
        .unwrap();

        let page = envelope.into_page().unwrap();
        assert_eq!(page.results, vec![1, 2]);
        assert_eq!(page.next_cursor.as_deref(), Some("abc"));
    }

    #[test]
    fn test_cursor_envelope_without_results() {
        let envelope: CursorEnvelope<u32> =
            serde_json::from_str(r#"{"pagination":{"nextUrl":null}}"#).unwrap();
        assert!(envelope.into_page().is_none());
    }
}
