//! AWS SSO SCIM REST Client
//!
//! Typed wrapper over the AWS SSO SCIM endpoint.
//! Uses reqwest for HTTP requests and a bearer token for authentication.
//!
//! Every call is retried with Fibonacci backoff when the endpoint throttles
//! (429), fails server side (5xx) or the connection fails.
//!
//! References:
//! - [AWS SSO SCIM implementation](https://docs.aws.amazon.com/singlesignon/latest/developerguide/what-is-scim.html)

use reqwest::{header, Client, Method, Response, Url};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use super::requests::{
    escape_filter_value, CreateGroupRequest, CreateUserRequest, PatchGroupRequest,
    PatchUserRequest, PutUserRequest,
};
use super::responses::{
    ApiErrorResponse, CreateGroupResponse, CreateUserResponse, GroupResponse, ListGroupsResponse,
    ListUsersResponse, PutUserResponse, ServiceProviderConfig, UserResponse,
};
use super::ScimError;
use crate::backoff::FibonacciBackoff;
use crate::constants;
use crate::observability::metrics;

/// Retry settings for [`AwsScimClient`]
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: FibonacciBackoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: constants::DEFAULT_MAX_RETRIES,
            backoff: FibonacciBackoff::default(),
        }
    }
}

/// AWS SSO SCIM client
pub struct AwsScimClient {
    http_client: Client,
    base_url: String,
    bearer_token: Zeroizing<String>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for AwsScimClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsScimClient")
            .field("base_url", &self.base_url)
            .field("max_retries", &self.retry.max_retries)
            .finish_non_exhaustive()
    }
}

impl AwsScimClient {
    /// Create a client for the given SCIM endpoint
    ///
    /// # Errors
    /// Returns an error if the endpoint is empty or not a valid URL, or the
    /// HTTP client cannot be built
    pub fn new(
        endpoint: &str,
        bearer_token: Zeroizing<String>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, ScimError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(constants::USER_AGENT)
            .build()?;
        Self::with_http_client(http_client, endpoint, bearer_token, retry)
    }

    /// Create a client around an existing `reqwest::Client`
    pub fn with_http_client(
        http_client: Client,
        endpoint: &str,
        bearer_token: Zeroizing<String>,
        retry: RetryPolicy,
    ) -> Result<Self, ScimError> {
        if endpoint.is_empty() {
            return Err(ScimError::UrlEmpty);
        }
        Url::parse(endpoint).map_err(|e| ScimError::InvalidUrl {
            url: endpoint.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            http_client,
            base_url: endpoint.trim_end_matches('/').to_string(),
            bearer_token,
            retry,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // Users

    /// `POST /Users`
    pub async fn create_user(
        &self,
        mut request: CreateUserRequest,
    ) -> Result<CreateUserResponse, ScimError> {
        request.validate()?;
        let response = self
            .send(Method::POST, "/Users", &[], Some(&request))
            .await?;
        Self::decode(response).await
    }

    /// `PUT /Users/{id}`
    pub async fn put_user(&self, mut request: PutUserRequest) -> Result<PutUserResponse, ScimError> {
        request.validate()?;
        let path = format!("/Users/{}", request.id);
        let response = self.send(Method::PUT, &path, &[], Some(&request)).await?;
        Self::decode(response).await
    }

    /// `PATCH /Users/{id}`
    pub async fn patch_user(&self, request: &PatchUserRequest) -> Result<(), ScimError> {
        request.validate()?;
        let path = format!("/Users/{}", request.user_id);
        self.send(Method::PATCH, &path, &[], Some(&request.patch))
            .await?;
        Ok(())
    }

    /// `DELETE /Users/{id}`
    pub async fn delete_user(&self, id: &str) -> Result<(), ScimError> {
        if id.is_empty() {
            return Err(ScimError::UserIdEmpty);
        }
        self.send::<()>(Method::DELETE, &format!("/Users/{id}"), &[], None)
            .await?;
        Ok(())
    }

    /// One page of `GET /Users`
    pub async fn list_users(
        &self,
        filter: Option<&str>,
        start_index: usize,
        count: u32,
    ) -> Result<ListUsersResponse, ScimError> {
        let query = list_query(filter, start_index, count);
        let response = self.send::<()>(Method::GET, "/Users", &query, None).await?;
        Self::decode(response).await
    }

    /// Every page of `GET /Users`
    pub async fn list_all_users(&self, filter: Option<&str>) -> Result<Vec<UserResponse>, ScimError> {
        let mut users = Vec::new();
        loop {
            let page = self
                .list_users(filter, users.len() + 1, constants::SCIM_PAGE_SIZE)
                .await?;
            let received = page.resources.len();
            users.extend(page.resources);
            if received == 0 || users.len() >= page.total_results {
                break;
            }
        }
        Ok(users)
    }

    /// Find a user by `userName`
    pub async fn find_user_by_user_name(
        &self,
        user_name: &str,
    ) -> Result<Option<UserResponse>, ScimError> {
        let filter = format!("userName eq \"{}\"", escape_filter_value(user_name));
        let page = self.list_users(Some(&filter), 1, 1).await?;
        Ok(page.resources.into_iter().next())
    }

    // Groups

    /// `POST /Groups`
    pub async fn create_group(
        &self,
        request: &CreateGroupRequest,
    ) -> Result<CreateGroupResponse, ScimError> {
        request.validate()?;
        let response = self
            .send(Method::POST, "/Groups", &[], Some(request))
            .await?;
        Self::decode(response).await
    }

    /// `PATCH /Groups/{id}`
    pub async fn patch_group(&self, request: &PatchGroupRequest) -> Result<(), ScimError> {
        request.validate()?;
        let path = format!("/Groups/{}", request.group_id);
        self.send(Method::PATCH, &path, &[], Some(&request.patch))
            .await?;
        Ok(())
    }

    /// `DELETE /Groups/{id}`
    pub async fn delete_group(&self, id: &str) -> Result<(), ScimError> {
        if id.is_empty() {
            return Err(ScimError::GroupIdEmpty);
        }
        self.send::<()>(Method::DELETE, &format!("/Groups/{id}"), &[], None)
            .await?;
        Ok(())
    }

    /// One page of `GET /Groups`
    pub async fn list_groups(
        &self,
        filter: Option<&str>,
        start_index: usize,
        count: u32,
    ) -> Result<ListGroupsResponse, ScimError> {
        let query = list_query(filter, start_index, count);
        let response = self.send::<()>(Method::GET, "/Groups", &query, None).await?;
        Self::decode(response).await
    }

    /// Every page of `GET /Groups`
    pub async fn list_all_groups(
        &self,
        filter: Option<&str>,
    ) -> Result<Vec<GroupResponse>, ScimError> {
        let mut groups = Vec::new();
        loop {
            let page = self
                .list_groups(filter, groups.len() + 1, constants::SCIM_PAGE_SIZE)
                .await?;
            let received = page.resources.len();
            groups.extend(page.resources);
            if received == 0 || groups.len() >= page.total_results {
                break;
            }
        }
        Ok(groups)
    }

    /// Find a group by `externalId`
    pub async fn find_group_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<GroupResponse>, ScimError> {
        let filter = format!("externalId eq \"{}\"", escape_filter_value(external_id));
        let page = self.list_groups(Some(&filter), 1, 1).await?;
        Ok(page.resources.into_iter().next())
    }

    /// Every group that has the given user as a member
    pub async fn list_groups_with_member(
        &self,
        user_id: &str,
    ) -> Result<Vec<GroupResponse>, ScimError> {
        let filter = format!("members eq \"{}\"", escape_filter_value(user_id));
        self.list_all_groups(Some(&filter)).await
    }

    // Discovery

    /// `GET /ServiceProviderConfig`
    pub async fn service_provider_config(&self) -> Result<ServiceProviderConfig, ScimError> {
        let response = self
            .send::<()>(Method::GET, "/ServiceProviderConfig", &[], None)
            .await?;
        Self::decode(response).await
    }

    // HTTP plumbing

    /// Send a request, retrying retryable failures with Fibonacci backoff
    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<Response, ScimError> {
        let url = format!("{}{}", self.base_url, path);
        let mut backoff = self.retry.backoff.clone();
        backoff.reset();
        let mut attempt: u32 = 0;

        loop {
            debug!(method = %method, url = %url, attempt = attempt + 1, "SCIM request");

            let mut request = self
                .http_client
                .request(method.clone(), &url)
                .bearer_auth(self.bearer_token.as_str())
                .header(header::ACCEPT, "application/json");
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let result = match request.send().await {
                Ok(response) => Self::check_response(response).await,
                Err(e) => Err(ScimError::Transport(e)),
            };

            match result {
                Err(error) if error.is_retryable() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    let delay = backoff.next_backoff();
                    warn!(
                        method = %method,
                        url = %url,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %error,
                        "Retrying SCIM request"
                    );
                    metrics::increment_scim_retries();
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }

    /// Turn non-2xx responses into [`ScimError::Api`]
    async fn check_response(response: Response) -> Result<Response, ScimError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ApiErrorResponse>(&body)
            .ok()
            .and_then(|error| error.detail)
            .unwrap_or(body);

        Err(ScimError::Api {
            status: status.as_u16(),
            detail,
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ScimError> {
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

fn list_query(filter: Option<&str>, start_index: usize, count: u32) -> Vec<(&'static str, String)> {
    let mut query = Vec::with_capacity(3);
    if let Some(filter) = filter {
        query.push(("filter", filter.to_string()));
    }
    query.push(("startIndex", start_index.to_string()));
    query.push(("count", count.to_string()));
    query
}
