//! JSON snapshots of a registry for offline runs
//!
//! ```json
//! {
//!   "listings": [{ "component": { .. }, "demo": { .. }, "extra_demos": [] }],
//!   "files": { "mem://alice/button/code.tsx": "export function Button() {}" }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use vitrine_registry::{Component, Demo, Listing, MemoryStore, StaticFetcher};

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("Failed to read fixture: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse fixture: {0}")]
    ParseError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureEntry {
    pub component: Component,
    pub demo: Demo,
    /// Further demos of the same component
    #[serde(default)]
    pub extra_demos: Vec<Demo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub listings: Vec<FixtureEntry>,
    /// Stored file contents by URL
    #[serde(default)]
    pub files: BTreeMap<String, String>,
}

impl Fixture {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, FixtureError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Seeds a fresh store and fetcher with this snapshot.
    pub fn into_backend(self) -> (MemoryStore, StaticFetcher) {
        let store = MemoryStore::new();
        for entry in self.listings {
            let seeded = store.seed(Listing {
                component: entry.component,
                demo: entry.demo,
            });
            for mut demo in entry.extra_demos {
                demo.component_id = seeded.component.id;
                store.seed_demo(demo);
            }
        }

        let fetcher: StaticFetcher = self.files.into_iter().collect();
        debug!(files = fetcher.len(), "Loaded fixture");
        (store, fetcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_registry::{ComponentStore, SourceFetcher};

    const FIXTURE: &str = r#"{
        "listings": [{
            "component": {
                "author": "alice",
                "component_slug": "button",
                "name": "Button",
                "code": "mem://alice/button/code.tsx"
            },
            "demo": {
                "name": "Default",
                "demo_code": "mem://alice/button/default/demo.tsx"
            },
            "extra_demos": [{
                "demo_slug": "outline",
                "name": "Outline",
                "demo_code": "mem://alice/button/outline/demo.tsx"
            }]
        }],
        "files": {
            "mem://alice/button/code.tsx": "export function Button() {}"
        }
    }"#;

    #[tokio::test]
    async fn test_fixture_seeds_store_and_fetcher() {
        let fixture: Fixture = serde_json::from_str(FIXTURE).unwrap();
        let (store, fetcher) = fixture.into_backend();

        let component = store.component("alice", "button").await.unwrap().unwrap();
        let demos = store.demos_of(component.id).await.unwrap();
        let slugs: Vec<_> = demos.iter().map(|d| d.demo_slug.as_str()).collect();
        assert_eq!(slugs, vec!["default", "outline"]);

        let code = fetcher.fetch_text("mem://alice/button/code.tsx").await.unwrap();
        assert_eq!(code, "export function Button() {}");
    }

    #[test]
    fn test_load_reports_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Fixture::load(&path), Err(FixtureError::ParseError(_))));
    }
}
