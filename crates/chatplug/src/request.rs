//! One-shot queries and mutations over HTTP.

use chatplug_protocol::{
    decode_field, Codec, GraphQlRequest, GraphQlResponse, JsonCodec,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::{ClientConfig, ClientError};

/// Header carrying the access token. The core reads `Authentication`,
/// not `Authorization`.
pub const AUTHENTICATION_HEADER: &str = "Authentication";

/// Sends GraphQL requests to the core's HTTP endpoint.
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct RequestClient {
    http: reqwest::Client,
    url: String,
    token: String,
}

impl RequestClient {
    /// Builds a client for `config.http_url`.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            url: config.http_url.clone(),
            token: config.access_token.clone(),
        })
    }

    /// The endpoint requests are posted to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// POSTs `request` and returns the response's `data` object.
    ///
    /// # Errors
    /// - `Http` if the request could not be sent or read.
    /// - `GraphQl` if the body carries a non-empty `errors` list.
    /// - `HttpStatus` for a non-success status without a GraphQL body.
    /// - `Protocol` if a success response is not a GraphQL body.
    pub async fn request(
        &self,
        request: &GraphQlRequest,
    ) -> Result<Map<String, Value>, ClientError> {
        let response = self
            .http
            .post(&self.url)
            .header(AUTHENTICATION_HEADER, &self.token)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        tracing::debug!(status = status.as_u16(), len = bytes.len(), "graphql response");

        let body: GraphQlResponse = match JsonCodec.decode(&bytes) {
            Ok(body) => body,
            Err(_) if !status.is_success() => {
                return Err(ClientError::HttpStatus {
                    status: status.as_u16(),
                    body: String::from_utf8_lossy(&bytes).into_owned(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        if !body.errors.is_empty() {
            return Err(ClientError::GraphQl(body.errors));
        }
        if !status.is_success() {
            return Err(ClientError::HttpStatus {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }
        Ok(body.data.unwrap_or_default())
    }

    /// Like [`request`](Self::request), then decodes `data.<field>` as `T`.
    pub async fn request_field<T: DeserializeOwned>(
        &self,
        request: &GraphQlRequest,
        field: &str,
    ) -> Result<T, ClientError> {
        let data = self.request(request).await?;
        Ok(decode_field(&data, field)?)
    }
}
