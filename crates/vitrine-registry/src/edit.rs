//! Partial updates computed from an edit form

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::model::{Component, Listing, Tag};
use crate::store::ComponentStore;

/// Values submitted from the edit form.
///
/// `preview_url` and `video_url` carry freshly uploaded media only; `None`
/// means the author kept the current file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EditForm {
    pub name: String,
    pub description: String,
    pub license: String,
    pub website_url: String,
    pub demo_tags: Vec<Tag>,
    pub preview_url: Option<String>,
    pub video_url: Option<String>,
}

impl EditForm {
    /// Form prefilled with the current values of a listing.
    pub fn from_listing(listing: &Listing) -> Self {
        Self {
            name: listing.component.name.clone(),
            description: listing.component.description.clone(),
            license: listing.component.license.clone(),
            website_url: listing.component.website_url.clone().unwrap_or_default(),
            demo_tags: listing.demo.tags.clone(),
            preview_url: None,
            video_url: None,
        }
    }
}

/// Changed fields only. Serializes to an object holding just those keys.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ComponentUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demo_tags: Option<Vec<Tag>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

/// Component row columns of an update.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ComponentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website_url: Option<String>,
}

/// Demo row columns of an update.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DemoPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

impl ComponentPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Patch writing back `original`'s values for the fields this one sets.
    pub fn restoring(&self, original: &Component) -> ComponentPatch {
        ComponentPatch {
            name: self.name.as_ref().map(|_| original.name.clone()),
            description: self.description.as_ref().map(|_| original.description.clone()),
            license: self.license.as_ref().map(|_| original.license.clone()),
            website_url: self
                .website_url
                .as_ref()
                .map(|_| original.website_url.clone().unwrap_or_default()),
        }
    }
}

impl DemoPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

impl ComponentUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Names of the fields this update sets.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.name.is_some() {
            fields.push("name");
        }
        if self.description.is_some() {
            fields.push("description");
        }
        if self.license.is_some() {
            fields.push("license");
        }
        if self.website_url.is_some() {
            fields.push("website_url");
        }
        if self.demo_tags.is_some() {
            fields.push("demo_tags");
        }
        if self.preview_url.is_some() {
            fields.push("preview_url");
        }
        if self.video_url.is_some() {
            fields.push("video_url");
        }
        fields
    }

    pub fn component_patch(&self) -> ComponentPatch {
        ComponentPatch {
            name: self.name.clone(),
            description: self.description.clone(),
            license: self.license.clone(),
            website_url: self.website_url.clone(),
        }
    }

    pub fn demo_patch(&self) -> DemoPatch {
        DemoPatch {
            preview_url: self.preview_url.clone(),
            video_url: self.video_url.clone(),
        }
    }
}

/// Compares form values against the listing they were loaded from.
///
/// An empty website URL in the form equals a missing one on the row.
pub fn diff_component(original: &Listing, form: &EditForm) -> ComponentUpdate {
    let component = &original.component;
    let mut update = ComponentUpdate::default();

    if form.name != component.name {
        update.name = Some(form.name.clone());
    }
    if form.description != component.description {
        update.description = Some(form.description.clone());
    }
    if form.license != component.license {
        update.license = Some(form.license.clone());
    }
    if form.website_url != component.website_url.clone().unwrap_or_default() {
        update.website_url = Some(form.website_url.clone());
    }
    if form.demo_tags != original.demo.tags {
        update.demo_tags = Some(form.demo_tags.clone());
    }

    let uploaded = |url: &Option<String>, current: &Option<String>| {
        url.as_ref().filter(|u| !u.is_empty() && Some(*u) != current.as_ref()).cloned()
    };
    update.preview_url = uploaded(&form.preview_url, &original.demo.preview_url);
    update.video_url = uploaded(&form.video_url, &original.demo.video_url);

    update
}

/// Writes an update to the store. Returns `false` without touching the
/// store when there is nothing to write.
///
/// Component columns are written first, then demo tags, then demo media.
/// When a later write fails, the earlier ones are put back to the values
/// in `original` before the error is returned.
pub async fn apply_update(
    store: &dyn ComponentStore,
    original: &Listing,
    update: &ComponentUpdate,
) -> Result<bool> {
    if update.is_empty() {
        info!(
            component = %original.component.reference(),
            "No changes were made"
        );
        return Ok(false);
    }

    debug!(fields = ?update.changed_fields(), "Applying component update");

    let component_patch = update.component_patch();
    if !component_patch.is_empty() {
        store
            .update_component(original.component.id, &component_patch)
            .await?;
    }

    if let Err(e) = write_demo_changes(store, original, update).await {
        if !component_patch.is_empty() {
            let restore = component_patch.restoring(&original.component);
            if let Err(revert) = store.update_component(original.component.id, &restore).await {
                warn!(
                    component = %original.component.reference(),
                    "Failed to revert component update: {}",
                    revert
                );
            }
        }
        return Err(e);
    }

    info!(
        component = %original.component.reference(),
        "Component updated successfully"
    );
    Ok(true)
}

async fn write_demo_changes(
    store: &dyn ComponentStore,
    original: &Listing,
    update: &ComponentUpdate,
) -> Result<()> {
    if let Some(tags) = &update.demo_tags {
        store.replace_demo_tags(original.demo.id, tags).await?;
    }

    let demo_patch = update.demo_patch();
    if demo_patch.is_empty() {
        return Ok(());
    }

    let result = store.update_demo(original.demo.id, &demo_patch).await;
    if result.is_err() && update.demo_tags.is_some() {
        if let Err(revert) = store
            .replace_demo_tags(original.demo.id, &original.demo.tags)
            .await
        {
            warn!(demo = original.demo.id, "Failed to restore demo tags: {}", revert);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ComponentStore, MemoryStore};
    use crate::error::RegistryError;
    use crate::test_support::{listing, FlakyStore};

    #[test]
    fn test_only_description_changed() {
        let original = listing("alice", "button");
        let mut form = EditForm::from_listing(&original);
        form.description = "A nicer button".to_string();

        let update = diff_component(&original, &form);
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            serde_json::json!({ "description": "A nicer button" })
        );
    }

    #[test]
    fn test_unchanged_form_is_empty() {
        let original = listing("alice", "button");
        let form = EditForm::from_listing(&original);

        let update = diff_component(&original, &form);
        assert!(update.is_empty());
        assert_eq!(serde_json::to_string(&update).unwrap(), "{}");
    }

    #[test]
    fn test_tags_and_media_changes() {
        let original = listing("alice", "button");
        let mut form = EditForm::from_listing(&original);
        form.demo_tags.push(Tag {
            id: 3,
            name: "Forms".to_string(),
            slug: "forms".to_string(),
        });
        form.video_url = Some("mem://media/alice/button/default/video.mp4".to_string());

        let update = diff_component(&original, &form);
        assert_eq!(update.changed_fields(), vec!["demo_tags", "video_url"]);
        assert!(update.component_patch().is_empty());
    }

    #[tokio::test]
    async fn test_apply_update() {
        let store = MemoryStore::new();
        let original = store.seed(listing("alice", "button"));

        let empty = ComponentUpdate::default();
        assert!(!apply_update(&store, &original, &empty).await.unwrap());

        let update = ComponentUpdate {
            description: Some("Updated".to_string()),
            preview_url: Some("mem://media/preview.png".to_string()),
            ..Default::default()
        };
        assert!(apply_update(&store, &original, &update).await.unwrap());

        let component = store.component("alice", "button").await.unwrap().unwrap();
        assert_eq!(component.description, "Updated");
        assert_eq!(component.name, original.component.name);

        let demo = store
            .demo(component.id, "default")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(demo.preview_url.as_deref(), Some("mem://media/preview.png"));
    }

    #[tokio::test]
    async fn test_failed_media_write_reverts_update() {
        let store = FlakyStore::failing("update_demo");
        let mut seeded = listing("alice", "button");
        seeded.demo.tags = vec![Tag {
            id: 0,
            name: "Buttons".to_string(),
            slug: "buttons".to_string(),
        }];
        let original = store.inner.seed(seeded);

        let update = ComponentUpdate {
            description: Some("Updated".to_string()),
            website_url: Some("https://button.test".to_string()),
            demo_tags: Some(Vec::new()),
            video_url: Some("mem://media/video.mp4".to_string()),
            ..Default::default()
        };
        let err = apply_update(&store, &original, &update).await.unwrap_err();
        assert!(matches!(err, RegistryError::Upstream { .. }));

        let component = store.inner.component("alice", "button").await.unwrap().unwrap();
        assert_eq!(component, original.component);

        let demo = store
            .inner
            .demo(component.id, "default")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(demo.tags, original.demo.tags);
        assert_eq!(demo.video_url, None);
    }

    #[tokio::test]
    async fn test_failed_tag_write_reverts_component() {
        let store = FlakyStore::failing("replace_demo_tags");
        let original = store.inner.seed(listing("alice", "button"));

        let update = ComponentUpdate {
            name: Some("Fancy Button".to_string()),
            demo_tags: Some(Vec::new()),
            ..Default::default()
        };
        assert!(apply_update(&store, &original, &update).await.is_err());

        let component = store.inner.component("alice", "button").await.unwrap().unwrap();
        assert_eq!(component.name, original.component.name);
    }
}
