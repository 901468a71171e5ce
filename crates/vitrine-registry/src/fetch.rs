//! Reading stored source files
//! Provides an HTTP fetcher for public storage URLs and an in-memory map

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::FetchError;

/// GET of a stored text file.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError>;
}

/// Fetches files over HTTP. Non-success statuses are errors.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Builds a fetcher. Without a timeout, requests rely on network defaults.
    pub fn new(timeout: Option<Duration>) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceFetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }
}

/// Serves files from a fixed URL -> content map.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    files: HashMap<String, String>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: impl Into<String>, content: impl Into<String>) {
        self.files.insert(url.into(), content.into());
    }

    pub fn with_file(mut self, url: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(url, content);
        self
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FromIterator<(String, String)> for StaticFetcher {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}

#[async_trait]
impl SourceFetcher for StaticFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        self.files.get(url).cloned().ok_or_else(|| FetchError::Missing {
            url: url.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_fetcher() {
        let fetcher = StaticFetcher::new().with_file("mem://a.tsx", "export const A = 1;");

        assert_eq!(fetcher.fetch_text("mem://a.tsx").await.unwrap(), "export const A = 1;");
        assert!(matches!(
            fetcher.fetch_text("mem://b.tsx").await,
            Err(FetchError::Missing { .. })
        ));
    }

    #[test]
    fn test_http_fetcher_builds_with_timeout() {
        assert!(HttpFetcher::new(Some(Duration::from_secs(5))).is_ok());
        assert!(HttpFetcher::new(None).is_ok());
    }
}
