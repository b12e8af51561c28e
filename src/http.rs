// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};

use crate::error::HttpError;

/// A streaming response body
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, HttpError>> + Send>>;

/// HTTP response with status, content type, and body stream
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Content-Type header value, if present
    pub content_type: Option<String>,
    /// Content-Length header value, if present
    pub content_length: Option<u64>,
    /// Response body as a stream of bytes
    pub body: ByteStream,
}

impl HttpResponse {
    /// Collect the body stream into a single buffer.
    ///
    /// Intended for small bodies such as cover images; episode audio
    /// is consumed chunk by chunk instead.
    pub async fn bytes(mut self) -> Result<Bytes, HttpError> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }
}

/// HTTP client abstraction for testability
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Fetch the entire response body as bytes, regardless of status
    async fn get_bytes(&self, url: &str) -> Result<Bytes, HttpError>;

    /// Get a full response with status and headers for downloads
    async fn get(&self, url: &str) -> Result<HttpResponse, HttpError>;
}

/// Default HTTP client implementation using reqwest
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Create a new ReqwestClient with default settings
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Create a new ReqwestClient with a custom reqwest::Client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get_bytes(&self, url: &str) -> Result<Bytes, HttpError> {
        Ok(self.client.get(url).send().await?.bytes().await?)
    }

    async fn get(&self, url: &str) -> Result<HttpResponse, HttpError> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let content_length = response.content_length();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(String::from);

        let body: ByteStream =
            Box::pin(response.bytes_stream().map(|result| result.map_err(HttpError::from)));

        Ok(HttpResponse {
            status,
            content_type,
            content_length,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reqwest_client_can_be_created() {
        let _client = ReqwestClient::new();
        let _client_default = ReqwestClient::default();
    }

    #[test]
    fn reqwest_client_can_be_cloned() {
        let client = ReqwestClient::new();
        let _cloned = client.clone();
    }

    #[tokio::test]
    async fn response_bytes_collects_all_chunks() {
        let stream: ByteStream = Box::pin(futures::stream::iter(vec![
            Ok(Bytes::from_static(b"hello ")),
            Ok(Bytes::from_static(b"world")),
        ]));

        let response = HttpResponse {
            status: 200,
            content_type: None,
            content_length: None,
            body: stream,
        };

        assert_eq!(response.bytes().await.unwrap(), Bytes::from_static(b"hello world"));
    }

    #[tokio::test]
    async fn response_bytes_surfaces_stream_errors() {
        let stream: ByteStream = Box::pin(futures::stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(HttpError::Other("connection reset".to_string())),
        ]));

        let response = HttpResponse {
            status: 200,
            content_type: None,
            content_length: None,
            body: stream,
        };

        assert!(response.bytes().await.is_err());
    }
}
