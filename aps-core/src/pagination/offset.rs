//! Offset/limit pagination.

use std::collections::VecDeque;
use std::future::Future;

use futures::Stream;

/// Lazily walks an offset/limit list endpoint.
///
/// Pages are fetched one at a time, only when the buffered items of the
/// previous page have been consumed. A page shorter than `page_size` ends the
/// sequence; an empty page ends it immediately. A page *longer* than
/// `page_size` is accepted and treated as "might have more".
///
/// The first error returned by `fetch_page` is handed to the caller and the
/// sequence is finished afterwards. Nothing is retried here.
///
/// ```rust
/// # async fn example() {
/// use aps_core::pagination::OffsetPaginator;
///
/// let mut pager = OffsetPaginator::new(
///     |offset, limit| async move {
///         let items: Vec<usize> = (offset..(offset + limit).min(45)).collect();
///         Ok::<_, std::convert::Infallible>(items)
///     },
///     20,
/// );
///
/// let mut count = 0;
/// while let Some(item) = pager.next().await {
///     item.unwrap();
///     count += 1;
/// }
/// assert_eq!(count, 45);
/// # }
/// ```
pub struct OffsetPaginator<T, F> {
    fetch_page: F,
    page_size: usize,
    next_offset: Option<usize>,
    buffer: VecDeque<T>,
}

impl<T, E, F, Fut> OffsetPaginator<T, F>
where
    F: FnMut(usize, usize) -> Fut,
    Fut: Future<Output = Result<Vec<T>, E>>,
{
    /// Create a paginator starting at offset 0.
    ///
    /// A `page_size` of zero is raised to one.
    pub fn new(fetch_page: F, page_size: usize) -> Self {
        Self {
            fetch_page,
            page_size: page_size.max(1),
            next_offset: Some(0),
            buffer: VecDeque::new(),
        }
    }

    /// Page size requested from the endpoint.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Offset of the next page to fetch, or `None` once the end is known.
    pub fn next_offset(&self) -> Option<usize> {
        self.next_offset
    }

    /// Pull the next item, fetching a page if the buffer is empty.
    pub async fn next(&mut self) -> Option<Result<T, E>> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(Ok(item));
            }

            let offset = self.next_offset.take()?;
            tracing::debug!("Fetching page at offset {} (limit {})", offset, self.page_size);

            let page = match (self.fetch_page)(offset, self.page_size).await {
                Ok(page) => page,
                Err(e) => return Some(Err(e)),
            };

            if page.is_empty() {
                return None;
            }

            if page.len() >= self.page_size {
                self.next_offset = Some(offset + page.len());
            }
            self.buffer.extend(page);
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

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Fetcher serving pages of the given sizes and recording requested offsets.
    fn pages(
        sizes: Vec<usize>,
        calls: Arc<Mutex<Vec<(usize, usize)>>>,
    ) -> impl FnMut(usize, usize) -> futures::future::Ready<Result<Vec<usize>, String>> {
        move |offset, limit| {
            let index = calls.lock().len();
            calls.lock().push((offset, limit));
            let size = sizes.get(index).copied().unwrap_or(0);
            futures::future::ready(Ok((offset..offset + size).collect()))
        }
    }

    #[tokio::test]
    async fn test_exhausts_all_pages_in_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let pager = OffsetPaginator::new(pages(vec![20, 20, 20, 10], calls.clone()), 20);

        let items: Vec<usize> = pager.into_stream().try_collect().await.unwrap();

        assert_eq!(items.len(), 70);
        assert_eq!(items, (0..70).collect::<Vec<_>>());
        assert_eq!(*calls.lock(), vec![(0, 20), (20, 20), (40, 20), (60, 20)]);
    }

    #[tokio::test]
    async fn test_empty_first_page() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let pager = OffsetPaginator::new(pages(vec![], calls.clone()), 20);

        let items: Vec<usize> = pager.into_stream().try_collect().await.unwrap();

        assert!(items.is_empty());
        assert_eq!(calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_exact_last_page_needs_trailing_call() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let pager = OffsetPaginator::new(pages(vec![20, 20], calls.clone()), 20);

        let items: Vec<usize> = pager.into_stream().try_collect().await.unwrap();

        assert_eq!(items.len(), 40);
        assert_eq!(*calls.lock(), vec![(0, 20), (20, 20), (40, 20)]);
    }

    #[tokio::test]
    async fn test_oversized_page_advances_by_actual_count() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let pager = OffsetPaginator::new(pages(vec![25, 5], calls.clone()), 20);

        let items: Vec<usize> = pager.into_stream().try_collect().await.unwrap();

        assert_eq!(items.len(), 30);
        assert_eq!(*calls.lock(), vec![(0, 20), (25, 20)]);
    }

    #[tokio::test]
    async fn test_error_surfaces_at_page_boundary() {
        let mut calls = 0;
        let mut pager = OffsetPaginator::new(
            move |offset, _limit| {
                calls += 1;
                let result = if calls == 1 {
                    Ok(vec![offset, offset + 1])
                } else {
                    Err("boom")
                };
                async move { result }
            },
            2,
        );

        assert_eq!(pager.next().await, Some(Ok(0)));
        assert_eq!(pager.next().await, Some(Ok(1)));
        assert_eq!(pager.next().await, Some(Err("boom")));
        assert_eq!(pager.next().await, None);
    }

    #[tokio::test]
    async fn test_early_stop_issues_no_more_fetches() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut pager = OffsetPaginator::new(pages(vec![20, 20, 20], calls.clone()), 20);

        for _ in 0..5 {
            pager.next().await.unwrap().unwrap();
        }
        drop(pager);

        assert_eq!(calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_zero_page_size_is_raised() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let pager = OffsetPaginator::new(pages(vec![1, 1, 0], calls.clone()), 0);
        assert_eq!(pager.page_size(), 1);

        let items: Vec<usize> = pager.into_stream().try_collect().await.unwrap();
        assert_eq!(items, vec![0, 1]);
    }
}
