//! Where the raw call-sign dataset comes from.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::{LookupError, Result};

/// HTTP request timeout in seconds.
/// The dataset is a few megabytes; 30s is enough on slow links.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Something that can produce the dataset as one text body.
///
/// Implementations do not retry; a failed fetch leaves the cache unpopulated
/// and the next initialization tries again.
#[async_trait]
pub trait DatasetSource: Send + Sync + 'static {
    async fn fetch_raw(&self) -> Result<String>;
}

/// Downloads the dataset over HTTPS.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpDatasetSource {
    client: Client,
    url: String,
}

impl HttpDatasetSource {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(LookupError::from_status(status, &body))
        }
    }
}

#[async_trait]
impl DatasetSource for HttpDatasetSource {
    async fn fetch_raw(&self) -> Result<String> {
        debug!(url = %self.url, "Fetching callsign dataset");

        let response = self.client.get(&self.url).send().await?;
        let response = Self::check_response(response).await?;
        let body = response.text().await?;

        debug!(bytes = body.len(), "Fetched callsign dataset");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    /// Serve one canned HTTP response on a local port and return its URL.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{}/people.csv", addr)
    }

    #[tokio::test]
    async fn test_fetch_returns_body_on_success() {
        let url = serve_once("200 OK", "callsign,first,last\nW1AW,Hiram,Maxim\n").await;
        let source = HttpDatasetSource::new(url).unwrap();

        let body = source.fetch_raw().await.unwrap();
        assert!(body.contains("W1AW,Hiram,Maxim"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_fetch_failure() {
        let url = serve_once("404 Not Found", "no such file").await;
        let source = HttpDatasetSource::new(url).unwrap();

        match source.fetch_raw().await.unwrap_err() {
            LookupError::FetchFailed { status, reason } => {
                assert_eq!(status, Some(404));
                assert!(reason.contains("no such file"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_host_is_fetch_failure() {
        // Bind then drop a listener so the port is known to be closed
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let source = HttpDatasetSource::new(format!("http://{}/people.csv", addr)).unwrap();
        let err = source.fetch_raw().await.unwrap_err();
        assert!(err.is_fetch_failure());
    }
}
