use std::time::Duration;

use anyhow::Context;
use luminair_common::ContentTypeId;
use luminair_common::identity::RemoteId;
use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;

use crate::domain::ContentApi;
use crate::domain::error::ApiError;

/// Configuration for the HTTP client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpClientConfig<'a> {
    pub base_url: &'a str,
    pub timeout: Duration,
}

/// [`ContentApi`] over the JSON REST endpoints `{base_url}/api/{collection}[/{id}]`.
#[derive(Debug, Clone)]
pub struct HttpContentApi {
    client: Client,
    base_url: String,
}

impl HttpContentApi {
    pub fn new(config: HttpClientConfig<'_>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build the HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
        })
    }

    fn url(&self, collection: &ContentTypeId, id: Option<&RemoteId>) -> String {
        match id {
            Some(id) => format!("{}/api/{}/{}", self.base_url, collection, id),
            None => format!("{}/api/{}", self.base_url, collection),
        }
    }

    async fn send(
        &self,
        method: Method,
        url: String,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        tracing::debug!("{} {}", method, url);

        let mut request: RequestBuilder = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(format!("failed to reach {}: {}", url, e)))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(format!("failed to read response of {}: {}", url, e)))?;

        if !status.is_success() {
            let error = ApiError::from_response(status.as_u16(), &text);
            tracing::debug!("{} answered {}: {}", url, status, error);
            return Err(error);
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

impl ContentApi for HttpContentApi {
    async fn create(&self, collection: &ContentTypeId, body: &Value) -> Result<Value, ApiError> {
        self.send(Method::POST, self.url(collection, None), Some(body)).await
    }

    async fn update(
        &self,
        collection: &ContentTypeId,
        id: &RemoteId,
        body: &Value,
    ) -> Result<Value, ApiError> {
        self.send(Method::PUT, self.url(collection, Some(id)), Some(body)).await
    }

    async fn get_by_id(&self, collection: &ContentTypeId, id: &RemoteId) -> Result<Value, ApiError> {
        self.send(Method::GET, self.url(collection, Some(id)), None).await
    }

    async fn list(&self, collection: &ContentTypeId) -> Result<Value, ApiError> {
        self.send(Method::GET, self.url(collection, None), None).await
    }

    async fn remove(&self, collection: &ContentTypeId, id: &RemoteId) -> Result<Value, ApiError> {
        self.send(Method::DELETE, self.url(collection, Some(id)), None).await
    }
}
