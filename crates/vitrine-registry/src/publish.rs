//! Publishing a component with its first demo

use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::Utc;
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use vitrine_scan::{
    extract_component_names, extract_demo_component_name, parse_dependencies_with,
    parse_internal_dependencies, remove_component_imports, rewrite_internal_imports, VersionTable,
    COMPONENT_MODULE,
};

use crate::blobs::BlobStore;
use crate::error::{RegistryError, Result, ValidationError};
use crate::model::{
    is_valid_username, Component, ComponentRef, Demo, Listing, Tag, DEFAULT_DEMO_SLUG,
    DEFAULT_REGISTRY,
};
use crate::store::ComponentStore;

fn slug_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").ok())
        .as_ref()
}

/// Lowercases `name` and joins its alphanumeric runs with `-`.
pub fn generate_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

pub fn is_valid_slug(slug: &str) -> bool {
    slug_pattern().is_some_and(|pattern| pattern.is_match(slug))
}

/// `HoverCard` -> `Hover Card`.
pub fn format_component_name(name: &str) -> String {
    let mut formatted = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() && !formatted.is_empty() {
            formatted.push(' ');
        }
        formatted.push(c);
    }
    formatted.trim().to_string()
}

/// First free slug for `author` derived from `base_name`: the plain slug,
/// then `-1`, `-2`, ...
pub async fn generate_unique_slug(
    store: &dyn ComponentStore,
    author: &str,
    base_name: &str,
) -> Result<String> {
    let base = generate_slug(base_name);
    if base.is_empty() {
        return Err(ValidationError::MissingField { field: "name" }.into());
    }

    let mut candidate = base.clone();
    let mut suffix = 1;
    while store.slug_exists(author, &candidate).await? {
        candidate = format!("{}-{}", base, suffix);
        suffix += 1;
    }
    Ok(candidate)
}

/// A tag picked in the form: an existing tag, or a new name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagInput {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
}

/// Everything the author submits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublishDraft {
    pub author: String,
    /// Display name; derived from the first export when empty
    #[serde(default)]
    pub name: String,
    /// Generated from the name when absent
    #[serde(default)]
    pub component_slug: Option<String>,
    #[serde(default)]
    pub description: String,
    pub code: String,
    pub demo_code: String,
    #[serde(default)]
    pub demo_name: Option<String>,
    #[serde(default)]
    pub demo_slug: Option<String>,
    #[serde(default)]
    pub registry: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub website_url: Option<String>,
    #[serde(default)]
    pub is_public: Option<bool>,
    #[serde(default)]
    pub tags: Vec<TagInput>,
    /// Internal import specifier -> `author/slug` it stands for
    #[serde(default)]
    pub internal_dependencies: IndexMap<String, Option<String>>,
    #[serde(default)]
    pub tailwind_config: Option<String>,
    #[serde(default)]
    pub global_css: Option<String>,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
}

/// Rows created by a publish.
#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub component: Component,
    pub demo: Demo,
    /// Demo imports of the component's own names that were stripped
    pub removed_imports: Vec<String>,
    pub tags: Vec<Tag>,
}

/// Resolved internal imports of one file.
struct InternalTargets {
    /// specifier -> `<registry>/<slug>` for rewriting
    rewrites: IndexMap<String, String>,
    /// specifier -> `author/slug`
    declared: IndexMap<String, String>,
    /// distinct targets in order of appearance
    direct: Vec<String>,
}

pub struct Publisher<'a> {
    store: &'a dyn ComponentStore,
    blobs: &'a dyn BlobStore,
    versions: VersionTable,
}

impl<'a> Publisher<'a> {
    pub fn new(store: &'a dyn ComponentStore, blobs: &'a dyn BlobStore) -> Self {
        Self {
            store,
            blobs,
            versions: VersionTable::default(),
        }
    }

    /// Versions used for npm packages found in submitted code.
    pub fn with_versions(mut self, versions: VersionTable) -> Self {
        self.versions = versions;
        self
    }

    pub async fn publish(&self, draft: PublishDraft) -> Result<Published> {
        require(&draft.author, "author")?;
        require(&draft.code, "code")?;
        require(&draft.demo_code, "demo_code")?;
        if !is_valid_username(&draft.author) {
            return Err(ValidationError::MalformedRef {
                reference: draft.author.clone(),
            }
            .into());
        }

        let name = if draft.name.trim().is_empty() {
            extract_component_names(&draft.code)
                .first()
                .map(|first| format_component_name(first))
                .ok_or(ValidationError::MissingField { field: "name" })?
        } else {
            draft.name.trim().to_string()
        };

        let component_slug = match &draft.component_slug {
            Some(slug) => {
                if !is_valid_slug(slug) {
                    return Err(ValidationError::MalformedSlug { slug: slug.clone() }.into());
                }
                if self.store.slug_exists(&draft.author, slug).await? {
                    return Err(ValidationError::DuplicateSlug { slug: slug.clone() }.into());
                }
                slug.clone()
            }
            None => generate_unique_slug(self.store, &draft.author, &name).await?,
        };

        let demo_slug = draft
            .demo_slug
            .clone()
            .unwrap_or_else(|| DEFAULT_DEMO_SLUG.to_string());
        if !is_valid_slug(&demo_slug) {
            return Err(ValidationError::MalformedSlug { slug: demo_slug }.into());
        }

        let registry = draft
            .registry
            .clone()
            .unwrap_or_else(|| DEFAULT_REGISTRY.to_string());
        if !is_valid_slug(&registry) {
            return Err(ValidationError::MalformedSlug { slug: registry }.into());
        }

        // demo imports of the component itself are dropped before mapping
        let component_names = extract_component_names(&draft.code);
        let removal = remove_component_imports(&draft.demo_code, &component_names);
        if !removal.removed_imports.is_empty() {
            debug!(
                removed = removal.removed_imports.len(),
                "Stripped component imports from demo code"
            );
        }

        let code_targets = self.internal_targets(&draft, &draft.code).await?;
        let demo_targets = self.internal_targets(&draft, &removal.modified_code).await?;

        let code = rewrite_internal_imports(&draft.code, &code_targets.rewrites);
        let demo_code = rewrite_internal_imports(&removal.modified_code, &demo_targets.rewrites);

        let demo_component_name = extract_demo_component_name(&demo_code);
        let dependencies = parse_dependencies_with(&code, &self.versions);
        let demo_dependencies = parse_dependencies_with(&demo_code, &self.versions);

        let folder = format!("{}/{}", draft.author, component_slug);
        let code_url = self.blobs.put_text(&format!("{}/code.tsx", folder), &code).await?;
        let demo_url = self
            .blobs
            .put_text(&format!("{}/{}/demo.tsx", folder, demo_slug), &demo_code)
            .await?;
        let tailwind_url = self
            .store_optional(
                &format!("{}/tailwind.config.js", folder),
                draft.tailwind_config.as_deref(),
            )
            .await?;
        let css_url = self
            .store_optional(&format!("{}/globals.css", folder), draft.global_css.as_deref())
            .await?;

        let now = Utc::now();
        let component = Component {
            id: 0,
            author: draft.author.clone(),
            component_slug: component_slug.clone(),
            name: name.clone(),
            description: draft.description.clone(),
            code: code_url,
            tailwind_config_extension: tailwind_url,
            global_css_extension: css_url,
            component_names,
            dependencies,
            direct_registry_dependencies: code_targets.direct,
            internal_dependencies: code_targets.declared,
            registry,
            license: draft.license.clone().unwrap_or_else(|| "mit".to_string()),
            website_url: draft.website_url.clone().filter(|url| !url.is_empty()),
            is_public: draft.is_public.unwrap_or(true),
            downloads_count: 0,
            likes_count: 0,
            created_at: now,
        };
        let demo = Demo {
            id: 0,
            component_id: 0,
            demo_slug,
            name: draft.demo_name.clone().unwrap_or_else(|| name.clone()),
            demo_code: demo_url,
            demo_component_name,
            demo_dependencies,
            demo_direct_registry_dependencies: demo_targets.direct,
            demo_internal_dependencies: demo_targets.declared,
            compiled_css: None,
            preview_url: draft.preview_url.clone(),
            video_url: draft.video_url.clone(),
            tags: Vec::new(),
            created_at: now,
        };
        let Listing {
            component,
            mut demo,
        } = self.store.insert_listing(component, demo).await?;

        let tags = self.attach_tags(demo.id, &draft.tags).await;
        demo.tags = tags.clone();

        info!(
            component = %component.reference(),
            demo = %demo.demo_slug,
            tags = tags.len(),
            "Published component"
        );

        Ok(Published {
            component,
            demo,
            removed_imports: removal.removed_imports,
            tags,
        })
    }

    /// Maps each internal import of `source` to the component it names.
    async fn internal_targets(
        &self,
        draft: &PublishDraft,
        source: &str,
    ) -> Result<InternalTargets> {
        let mut targets = InternalTargets {
            rewrites: IndexMap::new(),
            declared: IndexMap::new(),
            direct: Vec::new(),
        };

        let specifiers = parse_internal_dependencies(source)
            .into_keys()
            .filter(|specifier| specifier != COMPONENT_MODULE);
        for specifier in specifiers {
            let mapped = draft
                .internal_dependencies
                .get(&specifier)
                .cloned()
                .flatten()
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| ValidationError::UnmappedDependency {
                    path: specifier.clone(),
                })?;

            let reference: ComponentRef = mapped.parse()?;
            let target = self
                .store
                .component(&reference.author, &reference.slug)
                .await?
                .ok_or_else(|| RegistryError::not_found(reference.component_key()))?;

            let key = reference.component_key();
            targets.rewrites.insert(
                specifier.clone(),
                format!("{}/{}", target.registry, target.component_slug),
            );
            targets.declared.insert(specifier, key.clone());
            if !targets.direct.contains(&key) {
                targets.direct.push(key);
            }
        }

        Ok(targets)
    }

    async fn store_optional(&self, key: &str, content: Option<&str>) -> Result<Option<String>> {
        match content.filter(|c| !c.trim().is_empty()) {
            Some(content) => Ok(Some(self.blobs.put_text(key, content).await?)),
            None => Ok(None),
        }
    }

    /// Links tags to a demo, reusing existing tags by slug. Failures are
    /// logged and the tag is skipped.
    async fn attach_tags(&self, demo_id: i64, inputs: &[TagInput]) -> Vec<Tag> {
        let mut attached: Vec<Tag> = Vec::new();

        for input in inputs {
            let tag = match self.find_or_create_tag(input).await {
                Ok(tag) => tag,
                Err(e) => {
                    warn!(tag = %input.name, "Error inserting tag: {}", e);
                    continue;
                }
            };

            if attached.iter().any(|t| t.id == tag.id) {
                continue;
            }

            match self.store.link_demo_tag(demo_id, tag.id).await {
                Ok(()) => attached.push(tag),
                Err(e) => warn!(tag = %tag.slug, "Error linking tag to demo: {}", e),
            }
        }

        attached
    }

    async fn find_or_create_tag(&self, input: &TagInput) -> Result<Tag> {
        let slug = generate_slug(&input.name);
        if let Some(id) = input.id {
            return Ok(Tag {
                id,
                name: input.name.clone(),
                slug,
            });
        }
        if slug.is_empty() {
            return Err(ValidationError::MalformedSlug {
                slug: input.name.clone(),
            }
            .into());
        }
        match self.store.tag_by_slug(&slug).await? {
            Some(tag) => Ok(tag),
            None => self.store.insert_tag(input.name.trim(), &slug).await,
        }
    }
}

fn require(value: &str, field: &'static str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField { field }.into());
    }
    Ok(())
}

/// Shorthand for [`Publisher::publish`] with the built-in version table.
pub async fn publish(
    store: &dyn ComponentStore,
    blobs: &dyn BlobStore,
    draft: PublishDraft,
) -> Result<Published> {
    Publisher::new(store, blobs).publish(draft).await
}

/// npm dependencies of a draft without publishing it: component first,
/// then demo, first-seen-wins.
pub fn preview_dependencies(
    draft: &PublishDraft,
    versions: &VersionTable,
) -> BTreeMap<String, String> {
    let mut merged = parse_dependencies_with(&draft.code, versions);
    let demo = parse_dependencies_with(&draft.demo_code, versions);
    vitrine_scan::merge_dependencies(&mut merged, &demo);
    merged
}
