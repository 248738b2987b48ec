use std::time::Duration;

use anyhow::Context;
use reqwest::{StatusCode, blocking::Client};

use crate::{
    cache::models::{Fetcher, read_with_progress},
    foundation::error::{DepthFlowError, DepthFlowResult},
};

/// Connect timeout used by [`HttpFetcher::new`].
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Downloads weights over HTTP(S), streaming the body in chunks.
///
/// Progress is reported only when the server sends a `Content-Length`. Model files are large, so
/// only connecting is bounded by a timeout.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Fetcher with [`DEFAULT_CONNECT_TIMEOUT`].
    pub fn new() -> DepthFlowResult<Self> {
        Self::with_connect_timeout(DEFAULT_CONNECT_TIMEOUT)
    }

    /// Fetcher that gives up connecting after `timeout`.
    pub fn with_connect_timeout(timeout: Duration) -> DepthFlowResult<Self> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(None::<Duration>)
            .user_agent(concat!("depthflow/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build http client")?;
        Ok(Self { client })
    }

    /// Fetcher using a caller-configured client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, on_progress: &mut dyn FnMut(f32)) -> DepthFlowResult<Vec<u8>> {
        let mut response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("request {url}"))?;

        let status = response.status();
        if matches!(status, StatusCode::NOT_FOUND | StatusCode::GONE) {
            return Err(DepthFlowError::resource_missing(format!(
                "model at {url} (HTTP status {status})"
            )));
        }
        if !status.is_success() {
            return Err(anyhow::anyhow!("download {url} failed: HTTP status {status}").into());
        }

        let total = response.content_length();
        tracing::debug!(url, ?total, "downloading");
        read_with_progress(&mut response, total, on_progress, url)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/cache/http.rs"]
mod tests;
