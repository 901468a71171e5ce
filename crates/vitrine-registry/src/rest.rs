//! Store over a PostgREST-style HTTP API

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::catalog::{CatalogQuery, FilterCount};
use crate::edit::{ComponentPatch, DemoPatch};
use crate::error::{RegistryError, Result};
use crate::model::{Component, Demo, Listing, Tag};
use crate::store::ComponentStore;

/// Talks to `{base_url}/rest/v1` with an API key.
#[derive(Debug, Clone)]
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct FilteredDemoRow {
    #[serde(flatten)]
    demo: Demo,
    component_data: Component,
}

#[derive(Deserialize)]
struct DemoTagRow {
    tag: Tag,
}

impl RestStore {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| RegistryError::upstream("build http client", e))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/rest/v1/{}", self.base_url, path))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn send(&self, context: &str, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| RegistryError::upstream(context, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::upstream(context, format!("{}: {}", status, body)));
        }
        Ok(response)
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        context: &str,
        request: RequestBuilder,
    ) -> Result<T> {
        let response = self.send(context, request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| RegistryError::upstream(context, e))
    }

    async fn first<T: DeserializeOwned>(
        &self,
        context: &str,
        request: RequestBuilder,
    ) -> Result<Option<T>> {
        let rows: Vec<T> = self.fetch_json(context, request).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_returning<T: DeserializeOwned>(
        &self,
        context: &str,
        table: &str,
        body: serde_json::Value,
    ) -> Result<T> {
        let request = self
            .request(Method::POST, table)
            .header("Prefer", "return=representation")
            .json(&body);
        self.first(context, request)
            .await?
            .ok_or_else(|| RegistryError::upstream(context, "insert returned no row"))
    }

    async fn demo_tags(&self, demo_id: i64) -> Result<Vec<Tag>> {
        let rows: Vec<DemoTagRow> = self
            .fetch_json(
                "load demo tags",
                self.request(Method::GET, "demo_tags").query(&[
                    ("select", "tag:tags(*)".to_string()),
                    ("demo_id", format!("eq.{}", demo_id)),
                ]),
            )
            .await?;
        Ok(rows.into_iter().map(|row| row.tag).collect())
    }
}

fn to_row<T: serde::Serialize>(context: &str, value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| RegistryError::upstream(context, e))
}

#[async_trait]
impl ComponentStore for RestStore {
    async fn component(&self, author: &str, slug: &str) -> Result<Option<Component>> {
        debug!(author, slug, "Fetching component row");
        self.first(
            "load component",
            self.request(Method::GET, "components").query(&[
                ("select", "*".to_string()),
                ("author", format!("eq.{}", author)),
                ("component_slug", format!("eq.{}", slug)),
                ("limit", "1".to_string()),
            ]),
        )
        .await
    }

    async fn demo(&self, component_id: i64, demo_slug: &str) -> Result<Option<Demo>> {
        let demo: Option<Demo> = self
            .first(
                "load demo",
                self.request(Method::GET, "demos").query(&[
                    ("select", "*".to_string()),
                    ("component_id", format!("eq.{}", component_id)),
                    ("demo_slug", format!("eq.{}", demo_slug)),
                    ("limit", "1".to_string()),
                ]),
            )
            .await?;

        match demo {
            Some(mut demo) => {
                demo.tags = self.demo_tags(demo.id).await?;
                Ok(Some(demo))
            }
            None => Ok(None),
        }
    }

    async fn demos_of(&self, component_id: i64) -> Result<Vec<Demo>> {
        self.fetch_json(
            "load component demos",
            self.request(Method::GET, "demos").query(&[
                ("select", "*".to_string()),
                ("component_id", format!("eq.{}", component_id)),
                ("order", "created_at.asc".to_string()),
            ]),
        )
        .await
    }

    async fn insert_component(&self, component: Component) -> Result<Component> {
        let row = to_row("insert component", &component)?;
        self.insert_returning("insert component", "components", row).await
    }

    async fn insert_demo(&self, demo: Demo) -> Result<Demo> {
        let mut row = to_row("insert demo", &demo)?;
        if let Some(object) = row.as_object_mut() {
            // tags live in the junction table
            object.remove("tags");
        }
        self.insert_returning("insert demo", "demos", row).await
    }

    /// Demos go with their component through the foreign key cascade.
    async fn delete_component(&self, id: i64) -> Result<()> {
        self.send(
            "delete component",
            self.request(Method::DELETE, "components")
                .query(&[("id", format!("eq.{}", id))]),
        )
        .await?;
        Ok(())
    }

    async fn update_component(&self, id: i64, patch: &ComponentPatch) -> Result<()> {
        self.send(
            "update component",
            self.request(Method::PATCH, "components")
                .query(&[("id", format!("eq.{}", id))])
                .json(patch),
        )
        .await?;
        Ok(())
    }

    async fn update_demo(&self, id: i64, patch: &DemoPatch) -> Result<()> {
        self.send(
            "update demo",
            self.request(Method::PATCH, "demos")
                .query(&[("id", format!("eq.{}", id))])
                .json(patch),
        )
        .await?;
        Ok(())
    }

    async fn tag_by_slug(&self, slug: &str) -> Result<Option<Tag>> {
        self.first(
            "load tag",
            self.request(Method::GET, "tags").query(&[
                ("select", "*".to_string()),
                ("slug", format!("eq.{}", slug)),
            ]),
        )
        .await
    }

    async fn insert_tag(&self, name: &str, slug: &str) -> Result<Tag> {
        self.insert_returning("insert tag", "tags", json!({ "name": name, "slug": slug }))
            .await
    }

    async fn link_demo_tag(&self, demo_id: i64, tag_id: i64) -> Result<()> {
        self.send(
            "link tag",
            self.request(Method::POST, "demo_tags")
                .json(&json!({ "demo_id": demo_id, "tag_id": tag_id })),
        )
        .await?;
        Ok(())
    }

    async fn replace_demo_tags(&self, demo_id: i64, tags: &[Tag]) -> Result<()> {
        self.send(
            "clear demo tags",
            self.request(Method::DELETE, "demo_tags")
                .query(&[("demo_id", format!("eq.{}", demo_id))]),
        )
        .await?;

        if tags.is_empty() {
            return Ok(());
        }

        let rows: Vec<serde_json::Value> = tags
            .iter()
            .map(|tag| json!({ "demo_id": demo_id, "tag_id": tag.id }))
            .collect();
        self.send(
            "link demo tags",
            self.request(Method::POST, "demo_tags").json(&rows),
        )
        .await?;
        Ok(())
    }

    async fn list_demos(&self, query: &CatalogQuery) -> Result<Vec<Listing>> {
        let rows: Vec<FilteredDemoRow> = self
            .fetch_json(
                "get_filtered_demos",
                self.request(Method::POST, "rpc/get_filtered_demos").json(&json!({
                    "p_quick_filter": query.quick_filter,
                    "p_sort_by": query.sort,
                    "p_offset": query.offset,
                    "p_limit": query.limit,
                })),
            )
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| Listing {
                component: row.component_data,
                demo: row.demo,
            })
            .collect())
    }

    async fn filter_counts(&self) -> Result<Vec<FilterCount>> {
        self.fetch_json(
            "get_components_counts",
            self.request(Method::POST, "rpc/get_components_counts").json(&json!({})),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_normalized() {
        let store = RestStore::new("https://db.example.test/", "key", None).unwrap();
        assert_eq!(store.base_url, "https://db.example.test");
    }

    #[test]
    fn test_filtered_row_decodes() {
        let row: FilteredDemoRow = serde_json::from_value(serde_json::json!({
            "id": 4,
            "component_id": 2,
            "name": "Default",
            "demo_code": "https://cdn.test/demo.tsx",
            "component_data": {
                "id": 2,
                "author": "alice",
                "component_slug": "button",
                "name": "Button",
                "code": "https://cdn.test/code.tsx"
            },
            "user_data": { "username": "alice" }
        }))
        .unwrap();

        assert_eq!(row.demo.demo_slug, "default");
        assert_eq!(row.component_data.component_slug, "button");
    }
}
