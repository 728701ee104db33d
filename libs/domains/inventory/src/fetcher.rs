//! Aggregated, paginated listing as a lazy stream.
//!
//! Aggregated listings return one page at a time, each page holding records
//! grouped by scope (`zones/us-central1-a`, `regions/us-east1`, ...). The
//! cursor is inherently sequential, so pages are fetched one after another;
//! records are yielded as soon as their page arrives.

use async_trait::async_trait;
use futures::Stream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{FetchError, FetchResult};
use crate::models::AccountContext;

/// Records of one scope within a page
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeBucket<R> {
    pub scope: String,
    pub records: Vec<R>,
}

/// One page of an aggregated listing
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedPage<R> {
    pub buckets: Vec<ScopeBucket<R>>,
    /// Cursor for the next page; `None` or empty when exhausted
    pub next_page_token: Option<String>,
}

impl<R> AggregatedPage<R> {
    pub fn last(buckets: Vec<ScopeBucket<R>>) -> Self {
        Self {
            buckets,
            next_page_token: None,
        }
    }

    pub fn with_next(buckets: Vec<ScopeBucket<R>>, token: impl Into<String>) -> Self {
        Self {
            buckets,
            next_page_token: Some(token.into()),
        }
    }

    fn next_token(&mut self) -> Option<String> {
        self.next_page_token.take().filter(|t| !t.is_empty())
    }
}

/// Paginated aggregated listing of one resource type
#[async_trait]
pub trait AggregatedLister: Send + Sync {
    type Record: Send;

    /// Fetch a single page; `page_token` is `None` for the first page
    async fn list_page(
        &self,
        account: &AccountContext,
        page_token: Option<String>,
    ) -> FetchResult<AggregatedPage<Self::Record>>;
}

/// Stream every record of a listing.
///
/// The stream ends (`None`) once the cursor is exhausted. A page failure or
/// cancellation is yielded as the final `Err` item; records from earlier
/// pages have already been yielded by then. Each call re-runs the listing.
pub fn fetch_aggregated<'a, L>(
    lister: &'a L,
    account: &'a AccountContext,
    cancel: &'a CancellationToken,
) -> impl Stream<Item = FetchResult<L::Record>> + Send + 'a
where
    L: AggregatedLister,
    L::Record: 'a,
{
    async_stream::try_stream! {
        let mut page_token: Option<String> = None;
        let mut page_number = 0usize;

        loop {
            if cancel.is_cancelled() {
                Err::<(), _>(FetchError::Cancelled)?;
            }

            page_number += 1;
            let mut page = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(FetchError::Cancelled),
                page = lister.list_page(account, page_token.take()) => page,
            }?;
            let next_token = page.next_token();

            for bucket in page.buckets {
                if bucket.records.is_empty() {
                    debug!(scope = %bucket.scope, page = page_number, "Skipping empty scope");
                    continue;
                }
                for record in bucket.records {
                    yield record;
                }
            }

            match next_token {
                Some(token) => page_token = Some(token),
                None => {
                    debug!(pages = page_number, "Aggregated listing exhausted");
                    break;
                }
            }
        }
    }
}
