//! Cursor-based pagination.
//!
//! A list operation returns a page carrying `next.href`; the `start` query
//! parameter of that URL is the opaque cursor for the following page. A
//! [`Pager`] threads the cursor through a [`PageFetcher`] until a page comes
//! back without one.

use async_trait::async_trait;
use futures::stream::{self, Stream, TryStreamExt};
use reqwest::Url;
use tracing::debug;

use crate::context::CallContext;
use crate::error::Error;

/// Query parameter carrying the cursor.
pub const START_PARAM: &str = "start";

/// One page of items and the link to the next one.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_href: Option<String>,
}

impl<T> Page<T> {
    /// A decoded page result, or a final empty page when the body was empty.
    pub fn from_result<P>(result: Option<P>) -> Self
    where
        P: PagedResult<Item = T>,
    {
        match result {
            Some(page) => Self {
                next_href: page.next_href().map(str::to_owned),
                items: page.into_items(),
            },
            None => Self {
                items: Vec::new(),
                next_href: None,
            },
        }
    }
}

/// A page model returned by a list operation.
pub trait PagedResult {
    type Item;

    /// `next.href`, if the server sent one.
    fn next_href(&self) -> Option<&str>;

    /// Consume the page, keeping its items.
    fn into_items(self) -> Vec<Self::Item>;
}

/// Fetches one page of a list operation.
#[async_trait]
pub trait PageFetcher: Send {
    type Item: Send;

    /// Fetch the page starting at `start` (the first page when `None`).
    async fn fetch(
        &mut self,
        ctx: &CallContext,
        start: Option<&str>,
    ) -> Result<Page<Self::Item>, Error>;
}

/// Extract the `start` cursor from a `next.href` URL.
///
/// Relative references are accepted. A URL without a non-empty `start`
/// parameter yields `None`.
pub fn next_start(href: &str) -> Result<Option<String>, Error> {
    let base = Url::parse("https://localhost/")
        .map_err(|e| Error::Pagination(format!("invalid base URL: {e}")))?;
    let url = Url::options()
        .base_url(Some(&base))
        .parse(href)
        .map_err(|e| Error::Pagination(format!("malformed next URL '{href}': {e}")))?;
    Ok(url
        .query_pairs()
        .find(|(name, _)| name == START_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty()))
}

/// Lazily walks every page of a list operation, in order.
#[derive(Debug)]
pub struct Pager<F> {
    fetcher: F,
    cursor: Option<String>,
    has_next: bool,
    pages_fetched: usize,
}

impl<F> Pager<F>
where
    F: PageFetcher,
{
    /// A pager positioned before the first page.
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            cursor: None,
            has_next: true,
            pages_fetched: 0,
        }
    }

    /// Whether another page may be fetched.
    pub fn has_next(&self) -> bool {
        self.has_next
    }

    /// Pages fetched so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Fetch the next page under the background scope.
    pub async fn get_next(&mut self) -> Result<Vec<F::Item>, Error> {
        self.get_next_with_context(&CallContext::background()).await
    }

    /// Fetch the next page.
    ///
    /// A failed fetch leaves the pager where it was, so the call can be
    /// repeated.
    pub async fn get_next_with_context(
        &mut self,
        ctx: &CallContext,
    ) -> Result<Vec<F::Item>, Error> {
        if !self.has_next {
            return Err(Error::Pagination("no more results available".to_owned()));
        }

        let page = self.fetcher.fetch(ctx, self.cursor.as_deref()).await?;
        let next = page.next_href.as_deref().map(next_start).transpose()?.flatten();

        self.pages_fetched += 1;
        self.has_next = next.is_some();
        self.cursor = next;
        debug!(
            page = self.pages_fetched,
            items = page.items.len(),
            has_next = self.has_next,
            "fetched page"
        );
        Ok(page.items)
    }

    /// Fetch every remaining page under the background scope.
    pub async fn get_all(&mut self) -> Result<Vec<F::Item>, Error> {
        self.get_all_with_context(&CallContext::background()).await
    }

    /// Fetch every remaining page and concatenate the items.
    pub async fn get_all_with_context(
        &mut self,
        ctx: &CallContext,
    ) -> Result<Vec<F::Item>, Error> {
        let mut all = Vec::new();
        while self.has_next {
            all.extend(self.get_next_with_context(ctx).await?);
        }
        Ok(all)
    }

    /// Items of every remaining page as a stream, under the background scope.
    pub fn into_stream(self) -> impl Stream<Item = Result<F::Item, Error>> {
        self.into_stream_with_context(CallContext::background())
    }

    /// Items of every remaining page as a stream. Pages are fetched only as
    /// the stream is polled.
    pub fn into_stream_with_context(
        self,
        ctx: CallContext,
    ) -> impl Stream<Item = Result<F::Item, Error>> {
        stream::try_unfold((self, ctx), |(mut pager, ctx)| async move {
            if !pager.has_next() {
                return Ok::<_, Error>(None);
            }
            let items = pager.get_next_with_context(&ctx).await?;
            let page = stream::iter(items.into_iter().map(Ok::<_, Error>));
            Ok(Some((page, (pager, ctx))))
        })
        .try_flatten()
    }
}
