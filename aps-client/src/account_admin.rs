//! ACC Account Admin: projects and account users.

use aps_core::endpoints::resource_url;
use aps_core::pagination::{OffsetPage, OffsetPaginator};
use aps_core::{ApsError, HttpRequest, Pipeline};
use futures::StreamExt;
use futures::stream::BoxStream;

use crate::Result;
use crate::types::{AccountUser, Project};

/// Default page size of the projects listing.
pub const PROJECTS_PAGE_SIZE: usize = 20;

/// Largest page the projects endpoint accepts.
pub const PROJECTS_MAX_PAGE_SIZE: usize = 200;

/// Default page size of the account users listing.
pub const USERS_PAGE_SIZE: usize = 100;

/// Request context shared by Account Admin calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// `Region` header, for accounts outside the US data center.
    pub region: Option<String>,

    /// `User-Id` header, acting on behalf of a user with a two-legged token.
    pub user_id: Option<String>,
}

impl RequestContext {
    fn apply(&self, mut request: HttpRequest) -> Result<HttpRequest> {
        if let Some(region) = self.region.as_deref().filter(|r| !r.is_empty()) {
            request = request.header_str("Region", region)?;
        }
        if let Some(user_id) = self.user_id.as_deref().filter(|u| !u.is_empty()) {
            request = request.header_str("User-Id", user_id)?;
        }
        Ok(request)
    }
}

/// Filters of [`ProjectsManager::list_projects`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListProjectsOptions {
    /// Only projects whose name contains this text.
    pub filter_name: Option<String>,

    /// Only projects with one of these statuses.
    pub filter_status: Vec<String>,

    /// Fields to include in each project.
    pub fields: Vec<String>,

    /// Sort order, e.g. `name asc`.
    pub sort: Vec<String>,

    /// Page size; clamped to `1..=200`.
    pub page_size: Option<usize>,

    pub context: RequestContext,
}

impl ListProjectsOptions {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(name) = &self.filter_name {
            pairs.push(("filter[name]", name.clone()));
        }
        if !self.filter_status.is_empty() {
            pairs.push(("filter[status]", self.filter_status.join(",")));
        }
        if !self.fields.is_empty() {
            pairs.push(("fields", self.fields.join(",")));
        }
        if !self.sort.is_empty() {
            pairs.push(("sort", self.sort.join(",")));
        }
        pairs
    }

    fn page_size(&self) -> usize {
        self.page_size
            .unwrap_or(PROJECTS_PAGE_SIZE)
            .clamp(1, PROJECTS_MAX_PAGE_SIZE)
    }
}

/// Manager for ACC projects.
#[derive(Debug, Clone)]
pub struct ProjectsManager {
    pipeline: Pipeline,
    base_url: String,
}

impl ProjectsManager {
    pub(crate) fn new(pipeline: Pipeline, base_url: String) -> Self {
        Self { pipeline, base_url }
    }

    /// Every project of `account_id`, fetched page by page as the stream is polled.
    pub fn list_projects(
        &self,
        account_id: &str,
        options: &ListProjectsOptions,
    ) -> BoxStream<'static, Result<Project>> {
        let manager = self.clone();
        let account_id = account_id.to_string();
        let options = options.clone();
        let page_size = options.page_size();

        OffsetPaginator::new(
            move |offset, limit| {
                let manager = manager.clone();
                let account_id = account_id.clone();
                let options = options.clone();
                async move { manager.projects_page(&account_id, &options, offset, limit).await }
            },
            page_size,
        )
        .into_stream()
        .boxed()
    }

    /// One page of the projects listing.
    pub async fn projects_page(
        &self,
        account_id: &str,
        options: &ListProjectsOptions,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Project>> {
        let url = resource_url(
            &self.base_url,
            &["construction", "admin", "v1", "accounts", account_id, "projects"],
        )?;

        let request = HttpRequest::get(url)
            .query(options.query_pairs())
            .query([("offset", offset.to_string()), ("limit", limit.to_string())]);
        let request = options.context.apply(request)?;

        let page: Option<OffsetPage<Project>> = self.pipeline.send_json(request).await?;
        page.and_then(|p| p.results)
            .ok_or_else(|| ApsError::empty_response("list projects"))
    }

    /// A single project.
    pub async fn get_project(
        &self,
        project_id: &str,
        fields: &[String],
        context: &RequestContext,
    ) -> Result<Project> {
        let url = resource_url(
            &self.base_url,
            &["construction", "admin", "v1", "projects", project_id],
        )?;

        let mut request = HttpRequest::get(url);
        if !fields.is_empty() {
            request = request.query([("fields", fields.join(","))]);
        }
        let request = context.apply(request)?;

        self.pipeline
            .send_json(request)
            .await?
            .ok_or_else(|| ApsError::empty_response("get project"))
    }
}

/// Filters of [`AccountUsersManager::list_users`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListUsersOptions {
    /// Sort fields, e.g. `name`.
    pub sort: Vec<String>,

    /// Fields to include in each user.
    pub field: Vec<String>,

    /// Page size; clamped to `1..=100`.
    pub page_size: Option<usize>,

    /// `Region` header.
    pub region: Option<String>,
}

/// Manager for the account user directory.
#[derive(Debug, Clone)]
pub struct AccountUsersManager {
    pipeline: Pipeline,
    base_url: String,
}

impl AccountUsersManager {
    pub(crate) fn new(pipeline: Pipeline, base_url: String) -> Self {
        Self { pipeline, base_url }
    }

    /// Every user of `account_id`.
    pub fn list_users(
        &self,
        account_id: &str,
        options: &ListUsersOptions,
    ) -> BoxStream<'static, Result<AccountUser>> {
        let manager = self.clone();
        let account_id = account_id.to_string();
        let options = options.clone();
        let page_size = options.page_size.unwrap_or(USERS_PAGE_SIZE).clamp(1, USERS_PAGE_SIZE);

        OffsetPaginator::new(
            move |offset, limit| {
                let manager = manager.clone();
                let account_id = account_id.clone();
                let options = options.clone();
                async move { manager.users_page(&account_id, &options, offset, limit).await }
            },
            page_size,
        )
        .into_stream()
        .boxed()
    }

    /// One page of the user directory.
    ///
    /// This endpoint answers with a bare JSON array rather than an envelope.
    pub async fn users_page(
        &self,
        account_id: &str,
        options: &ListUsersOptions,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<AccountUser>> {
        let url = resource_url(&self.base_url, &["hq", "v1", "accounts", account_id, "users"])?;

        let mut request = HttpRequest::get(url)
            .query([("offset", offset.to_string()), ("limit", limit.to_string())]);
        if !options.sort.is_empty() {
            request = request.query([("sort", options.sort.join(","))]);
        }
        if !options.field.is_empty() {
            request = request.query([("field", options.field.join(","))]);
        }
        if let Some(region) = options.region.as_deref().filter(|r| !r.is_empty()) {
            request = request.header_str("Region", region)?;
        }

        self.pipeline
            .send_json(request)
            .await?
            .ok_or_else(|| ApsError::empty_response("list users"))
    }

    /// A single user.
    pub async fn get_user(&self, account_id: &str, user_id: &str) -> Result<AccountUser> {
        let url = resource_url(
            &self.base_url,
            &["hq", "v1", "accounts", account_id, "users", user_id],
        )?;

        self.pipeline
            .send_json(HttpRequest::get(url))
            .await?
            .ok_or_else(|| ApsError::empty_response("get user"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_query_pairs() {
        let options = ListProjectsOptions {
            filter_name: Some("Tower".to_string()),
            filter_status: vec!["active".to_string(), "pending".to_string()],
            sort: vec!["name asc".to_string()],
            ..Default::default()
        };

        assert_eq!(
            options.query_pairs(),
            vec![
                ("filter[name]", "Tower".to_string()),
                ("filter[status]", "active,pending".to_string()),
                ("sort", "name asc".to_string()),
            ]
        );
    }

    #[test]
    fn test_project_page_size_is_clamped() {
        let mut options = ListProjectsOptions::default();
        assert_eq!(options.page_size(), 20);

        options.page_size = Some(1000);
        assert_eq!(options.page_size(), 200);

        options.page_size = Some(0);
        assert_eq!(options.page_size(), 1);
    }
}
