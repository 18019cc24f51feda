//! ACC Data Connector requests.

use aps_core::endpoints::resource_url;
use aps_core::pagination::{OffsetPage, OffsetPaginator};
use aps_core::{ApsError, HttpRequest, Pipeline};
use futures::StreamExt;
use futures::stream::BoxStream;

use crate::Result;
use crate::types::DataRequest;

/// Page size used when listing requests.
pub const REQUESTS_PAGE_SIZE: usize = 20;

/// Manager for Data Connector requests.
#[derive(Debug, Clone)]
pub struct DataConnectorManager {
    pipeline: Pipeline,
    base_url: String,
}

impl DataConnectorManager {
    pub(crate) fn new(pipeline: Pipeline, base_url: String) -> Self {
        Self { pipeline, base_url }
    }

    /// Every data request of `account_id`, 20 per page.
    pub fn list_requests(&self, account_id: &str) -> BoxStream<'static, Result<DataRequest>> {
        let manager = self.clone();
        let account_id = account_id.to_string();

        OffsetPaginator::new(
            move |offset, limit| {
                let manager = manager.clone();
                let account_id = account_id.clone();
                async move { manager.requests_page(&account_id, offset, limit).await }
            },
            REQUESTS_PAGE_SIZE,
        )
        .into_stream()
        .boxed()
    }

    /// One page of data requests.
    ///
    /// A response without `results` is an empty page, which ends a listing.
    pub async fn requests_page(
        &self,
        account_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<DataRequest>> {
        let url = resource_url(
            &self.base_url,
            &["data-connector", "v1", "accounts", account_id, "requests"],
        )?;
        let request = HttpRequest::get(url)
            .query([("offset", offset.to_string()), ("limit", limit.to_string())]);

        let page: Option<OffsetPage<DataRequest>> = self.pipeline.send_json(request).await?;
        Ok(page.and_then(|p| p.results).unwrap_or_default())
    }

    /// A single data request.
    pub async fn get_request(&self, account_id: &str, request_id: &str) -> Result<DataRequest> {
        let url = resource_url(
            &self.base_url,
            &["data-connector", "v1", "accounts", account_id, "requests", request_id],
        )?;

        self.pipeline
            .send_json(HttpRequest::get(url))
            .await?
            .ok_or_else(|| ApsError::empty_response("get data request"))
    }
}
