use reqwest::{Method, header};
use serde::Serialize;
use serde_json::Value;
use tallyboard_core::{AccessToken, AppError, AppResult};
use tracing::debug;
use url::Url;

use crate::envelope::{parse_body, status_error};

mod payments;
mod rbac;

/// reqwest-backed client for the dashboard REST API.
///
/// Implements both the payments and RBAC ports. The bearer token is supplied
/// by the caller and attached to every request.
#[derive(Clone)]
pub struct HttpDashboardApi {
    http_client: reqwest::Client,
    base_url: Url,
    access_token: AccessToken,
}

impl HttpDashboardApi {
    /// Creates a client for the API rooted at `base_url`.
    #[must_use]
    pub fn new(http_client: reqwest::Client, base_url: &Url, access_token: AccessToken) -> Self {
        Self {
            http_client,
            base_url: base_url.clone(),
            access_token,
        }
    }

    /// Appends `segments` to the base path, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> AppResult<Url> {
        let mut endpoint = self.base_url.clone();
        endpoint
            .path_segments_mut()
            .map_err(|()| {
                AppError::Internal(format!(
                    "dashboard api base url '{}' cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(endpoint)
    }

    async fn get(&self, segments: &[&str]) -> AppResult<Value> {
        self.send::<()>(Method::GET, segments, None).await
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> AppResult<Value> {
        let endpoint = self.endpoint(segments)?;
        let mut request = self
            .http_client
            .request(method.clone(), endpoint.as_str())
            .header(header::AUTHORIZATION, self.access_token.bearer_header())
            .header(header::ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|error| {
            AppError::Transport(format!("failed to call {method} {endpoint}: {error}"))
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|error| {
            AppError::Transport(format!(
                "failed to read response body from {method} {endpoint}: {error}"
            ))
        })?;

        debug!(
            method = %method,
            endpoint = %endpoint,
            status = status.as_u16(),
            "dashboard api call finished"
        );

        if !status.is_success() {
            return Err(status_error(status.as_u16(), &text));
        }

        parse_body(&text)
    }
}
