//! Google Directory REST Client
//!
//! Native REST implementation for the Admin SDK Directory API v1.
//! Uses reqwest for HTTP requests and an already issued OAuth2 access token.
//!
//! References:
//! - [Directory API](https://developers.google.com/admin-sdk/directory/reference/rest)

use anyhow::{Context, Result};
use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use zeroize::Zeroizing;

use super::responses::{
    DirectoryGroup, DirectoryMember, DirectoryUser, GoogleErrorResponse, GroupsPage, MembersPage,
    Page, UsersPage,
};
use crate::constants;

/// Customer alias for the account the token belongs to
pub const MY_CUSTOMER: &str = "my_customer";

/// Google Directory REST client
pub struct DirectoryClient {
    http_client: Client,
    base_url: String,
    access_token: Zeroizing<String>,
    customer: String,
}

impl std::fmt::Debug for DirectoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryClient")
            .field("base_url", &self.base_url)
            .field("customer", &self.customer)
            .finish_non_exhaustive()
    }
}

impl DirectoryClient {
    /// Create a new Directory client
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built
    pub fn new(base_url: &str, access_token: Zeroizing<String>, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(constants::USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self::with_http_client(http_client, base_url, access_token))
    }

    pub fn with_http_client(
        http_client: Client,
        base_url: &str,
        access_token: Zeroizing<String>,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token,
            customer: MY_CUSTOMER.to_string(),
        }
    }

    /// Use a specific customer id instead of `my_customer`
    #[must_use]
    pub fn with_customer(mut self, customer: impl Into<String>) -> Self {
        self.customer = customer.into();
        self
    }

    /// Every group of the customer, optionally narrowed by a Directory query
    pub async fn list_groups(&self, query: Option<&str>) -> Result<Vec<DirectoryGroup>> {
        let mut params = vec![
            ("customer", self.customer.clone()),
            ("maxResults", constants::GWS_PAGE_SIZE.to_string()),
        ];
        if let Some(query) = query {
            params.push(("query", query.to_string()));
        }
        self.get_all_pages::<GroupsPage>("/groups", params)
            .await
            .with_context(|| format!("Failed to list Google groups (query: {query:?})"))
    }

    /// Direct members of a group
    pub async fn list_group_members(&self, group_key: &str) -> Result<Vec<DirectoryMember>> {
        let params = vec![("maxResults", constants::GWS_PAGE_SIZE.to_string())];
        self.get_all_pages::<MembersPage>(&format!("/groups/{group_key}/members"), params)
            .await
            .with_context(|| format!("Failed to list members of Google group {group_key}"))
    }

    /// Every user of the customer, optionally narrowed by a Directory query
    pub async fn list_users(&self, query: Option<&str>) -> Result<Vec<DirectoryUser>> {
        let mut params = vec![
            ("customer", self.customer.clone()),
            ("maxResults", constants::GWS_PAGE_SIZE.to_string()),
        ];
        if let Some(query) = query {
            params.push(("query", query.to_string()));
        }
        self.get_all_pages::<UsersPage>("/users", params)
            .await
            .with_context(|| format!("Failed to list Google users (query: {query:?})"))
    }

    /// A single user by id or primary email
    pub async fn get_user(&self, user_key: &str) -> Result<DirectoryUser> {
        self.get_json(&format!("/users/{user_key}"), &[])
            .await
            .with_context(|| format!("Failed to get Google user {user_key}"))
    }

    /// Follow `nextPageToken` until the last page
    async fn get_all_pages<P>(
        &self,
        path: &str,
        params: Vec<(&'static str, String)>,
    ) -> Result<Vec<P::Item>>
    where
        P: Page + DeserializeOwned,
    {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = params.clone();
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }

            let page: P = self.get_json(path, &query).await?;
            let (page_items, next) = page.into_parts();
            debug!(path, count = page_items.len(), "Fetched Directory page");
            items.extend(page_items);

            match next {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(items)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .http_client
            .get(&url)
            .bearer_auth(self.access_token.as_str())
            .header(header::ACCEPT, "application/json");
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request
            .send()
            .await
            .context("Failed to send Directory API request")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Self::error_response(status, &error_text));
        }

        response
            .json()
            .await
            .context("Failed to parse Directory API response")
    }

    /// Handle Google API error responses
    fn error_response(status: StatusCode, error_text: &str) -> anyhow::Error {
        if let Ok(error_response) = serde_json::from_str::<GoogleErrorResponse>(error_text) {
            anyhow::anyhow!(
                "Google API error: {} (code: {}, status: {})",
                error_response.error.message,
                error_response.error.code,
                error_response.error.status
            )
        } else {
            anyhow::anyhow!("HTTP {} (status: {}): {}", status.as_u16(), status, error_text)
        }
    }
}
