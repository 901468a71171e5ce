//! Component store seam and the in-memory implementation

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use tracing::warn;

use crate::catalog::{self, CatalogQuery, FilterCount};
use crate::edit::{ComponentPatch, DemoPatch};
use crate::error::{RegistryError, Result};
use crate::model::{Component, Demo, Listing, Tag};

/// Row-level access to components, demos and tags.
///
/// Lookups return `Ok(None)` for missing rows; `Err` is reserved for store
/// failures.
#[async_trait]
pub trait ComponentStore: Send + Sync {
    async fn component(&self, author: &str, slug: &str) -> Result<Option<Component>>;

    async fn demo(&self, component_id: i64, demo_slug: &str) -> Result<Option<Demo>>;

    async fn demos_of(&self, component_id: i64) -> Result<Vec<Demo>>;

    async fn slug_exists(&self, author: &str, slug: &str) -> Result<bool> {
        Ok(self.component(author, slug).await?.is_some())
    }

    /// Inserts a component; the store assigns its id.
    async fn insert_component(&self, component: Component) -> Result<Component>;

    /// Inserts a demo; the store assigns its id.
    async fn insert_demo(&self, demo: Demo) -> Result<Demo>;

    /// Removes a component row together with its demos.
    async fn delete_component(&self, id: i64) -> Result<()>;

    /// Inserts a component and its first demo, both or neither.
    ///
    /// The default inserts the component, then the demo, and deletes the
    /// component again when the demo insert fails.
    async fn insert_listing(&self, component: Component, mut demo: Demo) -> Result<Listing> {
        let component = self.insert_component(component).await?;
        demo.component_id = component.id;

        match self.insert_demo(demo).await {
            Ok(demo) => Ok(Listing { component, demo }),
            Err(e) => {
                if let Err(cleanup) = self.delete_component(component.id).await {
                    warn!(
                        component = %component.reference(),
                        "Failed to remove component after demo insert failed: {}",
                        cleanup
                    );
                }
                Err(e)
            }
        }
    }

    async fn update_component(&self, id: i64, patch: &ComponentPatch) -> Result<()>;

    async fn update_demo(&self, id: i64, patch: &DemoPatch) -> Result<()>;

    async fn tag_by_slug(&self, slug: &str) -> Result<Option<Tag>>;

    async fn insert_tag(&self, name: &str, slug: &str) -> Result<Tag>;

    async fn link_demo_tag(&self, demo_id: i64, tag_id: i64) -> Result<()>;

    async fn replace_demo_tags(&self, demo_id: i64, tags: &[Tag]) -> Result<()>;

    async fn list_demos(&self, query: &CatalogQuery) -> Result<Vec<Listing>>;

    async fn filter_counts(&self) -> Result<Vec<FilterCount>>;
}

#[derive(Debug, Default)]
struct Tables {
    components: Vec<Component>,
    demos: Vec<Demo>,
    tags: Vec<Tag>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn listing(&self, demo: &Demo) -> Option<Listing> {
        self.components
            .iter()
            .find(|c| c.id == demo.component_id)
            .map(|component| Listing {
                component: component.clone(),
                demo: demo.clone(),
            })
    }
}

/// Store backed by in-process tables. Used by tests and CLI fixtures.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a component with one demo, assigning fresh ids to both.
    pub fn seed(&self, listing: Listing) -> Listing {
        let Listing {
            mut component,
            mut demo,
        } = listing;

        if let Ok(mut tables) = self.tables.write() {
            component.id = tables.next_id();
            demo.id = tables.next_id();
            demo.component_id = component.id;
            for tag in demo.tags.iter_mut() {
                if let Some(existing) = tables.tags.iter().find(|t| t.slug == tag.slug) {
                    tag.id = existing.id;
                } else {
                    tag.id = tables.next_id();
                    tables.tags.push(tag.clone());
                }
            }
            tables.components.push(component.clone());
            tables.demos.push(demo.clone());
        }

        Listing { component, demo }
    }

    /// Adds another demo to an already seeded component.
    pub fn seed_demo(&self, mut demo: Demo) -> Demo {
        if let Ok(mut tables) = self.tables.write() {
            demo.id = tables.next_id();
            tables.demos.push(demo.clone());
        }
        demo
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|e| RegistryError::upstream("memory store", e))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|e| RegistryError::upstream("memory store", e))
    }
}

#[async_trait]
impl ComponentStore for MemoryStore {
    async fn component(&self, author: &str, slug: &str) -> Result<Option<Component>> {
        let tables = self.read()?;
        Ok(tables
            .components
            .iter()
            .find(|c| c.author == author && c.component_slug == slug)
            .cloned())
    }

    async fn demo(&self, component_id: i64, demo_slug: &str) -> Result<Option<Demo>> {
        let tables = self.read()?;
        Ok(tables
            .demos
            .iter()
            .find(|d| d.component_id == component_id && d.demo_slug == demo_slug)
            .cloned())
    }

    async fn demos_of(&self, component_id: i64) -> Result<Vec<Demo>> {
        let tables = self.read()?;
        Ok(tables
            .demos
            .iter()
            .filter(|d| d.component_id == component_id)
            .cloned()
            .collect())
    }

    async fn insert_component(&self, mut component: Component) -> Result<Component> {
        let mut tables = self.write()?;
        if tables
            .components
            .iter()
            .any(|c| c.author == component.author && c.component_slug == component.component_slug)
        {
            return Err(RegistryError::upstream(
                "insert component",
                format!("duplicate key {}", component.reference()),
            ));
        }
        component.id = tables.next_id();
        tables.components.push(component.clone());
        Ok(component)
    }

    async fn insert_demo(&self, mut demo: Demo) -> Result<Demo> {
        let mut tables = self.write()?;
        if tables
            .demos
            .iter()
            .any(|d| d.component_id == demo.component_id && d.demo_slug == demo.demo_slug)
        {
            return Err(RegistryError::upstream(
                "insert demo",
                format!("duplicate demo slug {}", demo.demo_slug),
            ));
        }
        demo.id = tables.next_id();
        tables.demos.push(demo.clone());
        Ok(demo)
    }

    async fn delete_component(&self, id: i64) -> Result<()> {
        let mut tables = self.write()?;
        tables.components.retain(|c| c.id != id);
        tables.demos.retain(|d| d.component_id != id);
        Ok(())
    }

    async fn insert_listing(&self, mut component: Component, mut demo: Demo) -> Result<Listing> {
        let mut tables = self.write()?;
        if tables
            .components
            .iter()
            .any(|c| c.author == component.author && c.component_slug == component.component_slug)
        {
            return Err(RegistryError::upstream(
                "insert component",
                format!("duplicate key {}", component.reference()),
            ));
        }
        component.id = tables.next_id();
        demo.id = tables.next_id();
        demo.component_id = component.id;
        tables.components.push(component.clone());
        tables.demos.push(demo.clone());
        Ok(Listing { component, demo })
    }

    async fn update_component(&self, id: i64, patch: &ComponentPatch) -> Result<()> {
        let mut tables = self.write()?;
        let component = tables
            .components
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| {
                RegistryError::upstream("update component", format!("no row with id {}", id))
            })?;

        if let Some(name) = &patch.name {
            component.name = name.clone();
        }
        if let Some(description) = &patch.description {
            component.description = description.clone();
        }
        if let Some(license) = &patch.license {
            component.license = license.clone();
        }
        if let Some(website_url) = &patch.website_url {
            component.website_url = Some(website_url.clone()).filter(|url| !url.is_empty());
        }
        Ok(())
    }

    async fn update_demo(&self, id: i64, patch: &DemoPatch) -> Result<()> {
        let mut tables = self.write()?;
        let demo = tables
            .demos
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| {
                RegistryError::upstream("update demo", format!("no row with id {}", id))
            })?;

        if let Some(preview_url) = &patch.preview_url {
            demo.preview_url = Some(preview_url.clone());
        }
        if let Some(video_url) = &patch.video_url {
            demo.video_url = Some(video_url.clone());
        }
        Ok(())
    }

    async fn tag_by_slug(&self, slug: &str) -> Result<Option<Tag>> {
        let tables = self.read()?;
        Ok(tables.tags.iter().find(|t| t.slug == slug).cloned())
    }

    async fn insert_tag(&self, name: &str, slug: &str) -> Result<Tag> {
        let mut tables = self.write()?;
        if tables.tags.iter().any(|t| t.slug == slug) {
            return Err(RegistryError::upstream(
                "insert tag",
                format!("duplicate tag slug {}", slug),
            ));
        }
        let tag = Tag {
            id: tables.next_id(),
            name: name.to_string(),
            slug: slug.to_string(),
        };
        tables.tags.push(tag.clone());
        Ok(tag)
    }

    async fn link_demo_tag(&self, demo_id: i64, tag_id: i64) -> Result<()> {
        let mut tables = self.write()?;
        let tag = tables
            .tags
            .iter()
            .find(|t| t.id == tag_id)
            .cloned()
            .ok_or_else(|| {
                RegistryError::upstream("link tag", format!("no tag with id {}", tag_id))
            })?;
        let demo = tables
            .demos
            .iter_mut()
            .find(|d| d.id == demo_id)
            .ok_or_else(|| {
                RegistryError::upstream("link tag", format!("no demo with id {}", demo_id))
            })?;

        if !demo.tags.iter().any(|t| t.id == tag.id) {
            demo.tags.push(tag);
        }
        Ok(())
    }

    async fn replace_demo_tags(&self, demo_id: i64, tags: &[Tag]) -> Result<()> {
        let mut tables = self.write()?;
        let demo = tables
            .demos
            .iter_mut()
            .find(|d| d.id == demo_id)
            .ok_or_else(|| {
                RegistryError::upstream("replace tags", format!("no demo with id {}", demo_id))
            })?;
        demo.tags = tags.to_vec();
        Ok(())
    }

    async fn list_demos(&self, query: &CatalogQuery) -> Result<Vec<Listing>> {
        let tables = self.read()?;
        let listings: Vec<Listing> = tables
            .demos
            .iter()
            .filter_map(|demo| tables.listing(demo))
            .collect();
        Ok(catalog::select_listings(listings, query, Utc::now()))
    }

    async fn filter_counts(&self) -> Result<Vec<FilterCount>> {
        let tables = self.read()?;
        let listings: Vec<Listing> = tables
            .demos
            .iter()
            .filter_map(|demo| tables.listing(demo))
            .collect();
        Ok(catalog::count_listings(&listings, Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::listing;

    #[tokio::test]
    async fn test_seed_and_lookup() {
        let store = MemoryStore::new();
        let seeded = store.seed(listing("alice", "button"));
        assert!(seeded.component.id > 0);
        assert_eq!(seeded.demo.component_id, seeded.component.id);

        let found = store.component("alice", "button").await.unwrap();
        assert_eq!(found, Some(seeded.component.clone()));
        assert!(store.component("alice", "card").await.unwrap().is_none());
        assert!(store.slug_exists("alice", "button").await.unwrap());
        assert!(!store.slug_exists("bob", "button").await.unwrap());

        let demo = store.demo(seeded.component.id, "default").await.unwrap();
        assert_eq!(demo.map(|d| d.id), Some(seeded.demo.id));
    }

    #[tokio::test]
    async fn test_duplicate_component_rejected() {
        let store = MemoryStore::new();
        let seeded = store.seed(listing("alice", "button"));
        let err = store.insert_component(seeded.component).await.unwrap_err();
        assert!(matches!(err, RegistryError::Upstream { .. }));
    }

    #[tokio::test]
    async fn test_insert_listing_and_delete() {
        let store = MemoryStore::new();
        let Listing { component, demo } = listing("alice", "button");

        let inserted = store.insert_listing(component.clone(), demo.clone()).await.unwrap();
        assert_eq!(inserted.demo.component_id, inserted.component.id);
        assert!(store.insert_listing(component, demo).await.is_err());
        assert_eq!(store.demos_of(inserted.component.id).await.unwrap().len(), 1);

        store.delete_component(inserted.component.id).await.unwrap();
        assert!(!store.slug_exists("alice", "button").await.unwrap());
        assert!(store.demos_of(inserted.component.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tags() {
        let store = MemoryStore::new();
        let seeded = store.seed(listing("alice", "button"));

        let tag = store.insert_tag("Buttons", "buttons").await.unwrap();
        assert!(store.insert_tag("Buttons", "buttons").await.is_err());
        store.link_demo_tag(seeded.demo.id, tag.id).await.unwrap();
        store.link_demo_tag(seeded.demo.id, tag.id).await.unwrap();

        let demo = store.demo(seeded.component.id, "default").await.unwrap().unwrap();
        assert_eq!(demo.tags, vec![tag.clone()]);

        store.replace_demo_tags(seeded.demo.id, &[]).await.unwrap();
        let demo = store.demo(seeded.component.id, "default").await.unwrap().unwrap();
        assert!(demo.tags.is_empty());
        assert_eq!(store.tag_by_slug("buttons").await.unwrap(), Some(tag));
    }
}
