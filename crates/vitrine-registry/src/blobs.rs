//! Text blob storage behind public URLs

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{FetchError, RegistryError, Result};
use crate::fetch::SourceFetcher;

/// Writes a text file and returns the URL it can be read back from.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put_text(&self, key: &str, content: &str) -> Result<String>;
}

/// In-process blob store. Stored files are readable through
/// [`SourceFetcher`] under the returned `mem://` URL.
#[derive(Debug, Default)]
pub struct MemoryBlobs {
    bucket: String,
    files: RwLock<HashMap<String, String>>,
}

impl MemoryBlobs {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            files: RwLock::new(HashMap::new()),
        }
    }

    pub fn url_for(&self, key: &str) -> String {
        format!("mem://{}/{}", self.bucket, key.trim_start_matches('/'))
    }

    pub fn get(&self, url: &str) -> Option<String> {
        self.files.read().ok()?.get(url).cloned()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobs {
    async fn put_text(&self, key: &str, content: &str) -> Result<String> {
        let url = self.url_for(key);
        let mut files = self
            .files
            .write()
            .map_err(|e| RegistryError::upstream("blob write", e))?;
        // upsert
        files.insert(url.clone(), content.to_string());
        Ok(url)
    }
}

#[async_trait]
impl SourceFetcher for MemoryBlobs {
    async fn fetch_text(&self, url: &str) -> std::result::Result<String, FetchError> {
        self.get(url).ok_or_else(|| FetchError::Missing {
            url: url.to_string(),
        })
    }
}
