//! Cursor pagination.

use std::collections::VecDeque;
use std::future::Future;

use futures::Stream;
use url::Url;

/// Query parameter carrying the continuation token in `nextUrl` links.
pub const CURSOR_STATE_PARAM: &str = "cursorState";

/// One page of a cursor-paginated listing.
#[derive(Debug, Clone, PartialEq)]
pub struct CursorPage<T> {
    /// Items of this page, in server order.
    pub results: Vec<T>,

    /// Opaque token for the following page; `None` on the last page.
    pub next_cursor: Option<String>,
}

impl<T> CursorPage<T> {
    /// A page followed by `next_cursor`.
    pub fn new(results: Vec<T>, next_cursor: Option<String>) -> Self {
        Self {
            results,
            next_cursor,
        }
    }

    /// The last page of a listing.
    pub fn last(results: Vec<T>) -> Self {
        Self::new(results, None)
    }

    /// A page whose continuation is given as a `nextUrl` link.
    pub fn from_next_url(results: Vec<T>, next_url: Option<&str>) -> Self {
        Self::new(results, next_url.and_then(cursor_from_next_url))
    }
}

/// Extract the `cursorState` value from a continuation link.
///
/// Accepts absolute or relative links. Returns `None` when the link carries no
/// cursor or an empty one. The value is returned as-is, never interpreted.
pub fn cursor_from_next_url(next_url: &str) -> Option<String> {
    let base = Url::parse("http://localhost/").ok()?;
    let url = Url::options().base_url(Some(&base)).parse(next_url).ok()?;

    url.query_pairs()
        .find(|(key, _)| key == CURSOR_STATE_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

/// Lazily walks a cursor-paginated list endpoint.
///
/// The first page is requested with an empty cursor. After the items of a page
/// are consumed, the page's `next_cursor` is replayed verbatim; a missing or
/// empty cursor ends the sequence. Error and laziness semantics match
/// [`OffsetPaginator`](super::OffsetPaginator).
pub struct CursorPaginator<T, F> {
    fetch_page: F,
    next_cursor: Option<String>,
    buffer: VecDeque<T>,
}

impl<T, E, F, Fut> CursorPaginator<T, F>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<CursorPage<T>, E>>,
{
    /// Create a paginator positioned before the first page.
    pub fn new(fetch_page: F) -> Self {
        Self {
            fetch_page,
            next_cursor: Some(String::new()),
            buffer: VecDeque::new(),
        }
    }

    /// Pull the next item, fetching a page if the buffer is empty.
    pub async fn next(&mut self) -> Option<Result<T, E>> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(Ok(item));
            }

            let cursor = self.next_cursor.take()?;
            tracing::debug!("Fetching page (first page: {})", cursor.is_empty());

            let page = match (self.fetch_page)(cursor).await {
                Ok(page) => page,
                Err(e) => return Some(Err(e)),
            };

            self.next_cursor = page.next_cursor.filter(|c| !c.is_empty());
            self.buffer.extend(page.results);
        }
    }

    /// Turn the paginator into a [`Stream`].
    pub fn into_stream(self) -> impl Stream<Item = Result<T, E>> {
        futures::stream::unfold(self, |mut pager| async move {
            let item = pager.next().await?;
            Some((item, pager))
        })
    }
}
