//! Registry rows and references.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::publish::is_valid_slug;

/// Demo slug used when a reference names no demo.
pub const DEFAULT_DEMO_SLUG: &str = "default";

/// File namespace used when a component declares none.
pub const DEFAULT_REGISTRY: &str = "ui";

/// `author/component_slug`, optionally `author/component_slug/demo_slug`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ComponentRef {
    pub author: String,
    pub slug: String,
    pub demo: Option<String>,
}

impl ComponentRef {
    pub fn new(author: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            slug: slug.into(),
            demo: None,
        }
    }

    pub fn with_demo(mut self, demo: impl Into<String>) -> Self {
        self.demo = Some(demo.into());
        self
    }

    /// `author/slug`, the identity of the component row.
    pub fn component_key(&self) -> String {
        format!("{}/{}", self.author, self.slug)
    }

    /// The same reference without a demo segment.
    pub fn component(&self) -> ComponentRef {
        ComponentRef::new(self.author.clone(), self.slug.clone())
    }

    pub fn demo_slug(&self) -> &str {
        self.demo.as_deref().unwrap_or(DEFAULT_DEMO_SLUG)
    }
}

impl fmt::Display for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.author, self.slug)?;
        if let Some(demo) = &self.demo {
            write!(f, "/{}", demo)?;
        }
        Ok(())
    }
}

impl FromStr for ComponentRef {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ValidationError::MalformedRef {
            reference: s.to_string(),
        };

        let parts: Vec<&str> = s.split('/').collect();
        let (author, slug, demo) = match parts.as_slice() {
            [author, slug] => (*author, *slug, None),
            [author, slug, demo] => (*author, *slug, Some(*demo)),
            _ => return Err(malformed()),
        };

        if !is_valid_username(author) || !is_valid_slug(slug) {
            return Err(malformed());
        }
        if let Some(demo) = demo {
            if !is_valid_slug(demo) {
                return Err(malformed());
            }
        }

        Ok(Self {
            author: author.to_string(),
            slug: slug.to_string(),
            demo: demo.map(str::to_string),
        })
    }
}

impl TryFrom<String> for ComponentRef {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ComponentRef> for String {
    fn from(reference: ComponentRef) -> Self {
        reference.to_string()
    }
}

/// Usernames follow the slug rule but may also contain `_` and `.`.
pub fn is_valid_username(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'))
}

fn default_registry() -> String {
    DEFAULT_REGISTRY.to_string()
}

fn default_license() -> String {
    "mit".to_string()
}

fn default_demo_slug() -> String {
    DEFAULT_DEMO_SLUG.to_string()
}

fn default_true() -> bool {
    true
}

fn is_unassigned(id: &i64) -> bool {
    *id == 0
}

/// A published component. Code and style fields hold storage URLs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Assigned by the store; zero until inserted
    #[serde(default, skip_serializing_if = "is_unassigned")]
    pub id: i64,
    pub author: String,
    pub component_slug: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub code: String,
    #[serde(default)]
    pub tailwind_config_extension: Option<String>,
    #[serde(default)]
    pub global_css_extension: Option<String>,
    /// Exported names found in the component code at publish time
    #[serde(default)]
    pub component_names: Vec<String>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub direct_registry_dependencies: Vec<String>,
    /// Import specifier as written -> `author/slug`
    #[serde(default)]
    pub internal_dependencies: IndexMap<String, String>,
    #[serde(default = "default_registry")]
    pub registry: String,
    #[serde(default = "default_license")]
    pub license: String,
    #[serde(default)]
    pub website_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_public: bool,
    #[serde(default)]
    pub downloads_count: u64,
    #[serde(default)]
    pub likes_count: u64,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Component {
    pub fn reference(&self) -> ComponentRef {
        ComponentRef::new(self.author.clone(), self.component_slug.clone())
    }

    /// Path of this component inside a resolved file set.
    pub fn file_path(&self) -> String {
        format!("/components/{}/{}.tsx", self.registry, self.component_slug)
    }

    /// Components this one pulls in: direct registry dependencies first,
    /// then internal import targets, without duplicates.
    pub fn registry_targets(&self) -> Result<Vec<ComponentRef>, ValidationError> {
        collect_refs(
            self.direct_registry_dependencies
                .iter()
                .chain(self.internal_dependencies.values()),
        )
    }
}

/// An example usage of a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Demo {
    #[serde(default, skip_serializing_if = "is_unassigned")]
    pub id: i64,
    #[serde(default)]
    pub component_id: i64,
    #[serde(default = "default_demo_slug")]
    pub demo_slug: String,
    pub name: String,
    pub demo_code: String,
    /// Symbol the preview entry renders
    #[serde(default)]
    pub demo_component_name: Option<String>,
    #[serde(default)]
    pub demo_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub demo_direct_registry_dependencies: Vec<String>,
    /// Demo import specifier as written -> `author/slug`
    #[serde(default)]
    pub demo_internal_dependencies: IndexMap<String, String>,
    #[serde(default)]
    pub compiled_css: Option<String>,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Demo {
    /// Path of this demo inside a resolved file set.
    pub fn file_path(&self, component: &Component) -> String {
        format!(
            "/demos/{}/{}/{}.tsx",
            component.registry, component.component_slug, self.demo_slug
        )
    }

    /// Same order as [`Component::registry_targets`].
    pub fn registry_targets(&self) -> Result<Vec<ComponentRef>, ValidationError> {
        collect_refs(
            self.demo_direct_registry_dependencies
                .iter()
                .chain(self.demo_internal_dependencies.values()),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    #[serde(default, skip_serializing_if = "is_unassigned")]
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// A demo together with the component it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub component: Component,
    pub demo: Demo,
}

fn collect_refs<'a>(
    raw: impl Iterator<Item = &'a String>,
) -> Result<Vec<ComponentRef>, ValidationError> {
    let mut refs: Vec<ComponentRef> = Vec::new();
    for value in raw {
        let reference = value.parse::<ComponentRef>()?.component();
        if !refs.contains(&reference) {
            refs.push(reference);
        }
    }
    Ok(refs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_component_ref() {
        let r: ComponentRef = "alice/button".parse().unwrap();
        assert_eq!(r, ComponentRef::new("alice", "button"));
        assert_eq!(r.demo_slug(), "default");

        let r: ComponentRef = "alice.dev/hover-card/with-icon".parse().unwrap();
        assert_eq!(r.author, "alice.dev");
        assert_eq!(r.demo.as_deref(), Some("with-icon"));
        assert_eq!(r.to_string(), "alice.dev/hover-card/with-icon");
        assert_eq!(r.component_key(), "alice.dev/hover-card");
    }

    #[test]
    fn test_reject_malformed_refs() {
        for bad in [
            "",
            "alice",
            "alice/",
            "/button",
            "alice/Button",
            "a/b/c/d",
            "alice/my_button",
        ] {
            assert!(bad.parse::<ComponentRef>().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_component_defaults_from_json() {
        let component: Component = serde_json::from_value(serde_json::json!({
            "id": 7,
            "author": "alice",
            "component_slug": "button",
            "name": "Button",
            "code": "mem://alice/button/code.tsx",
            "internal_dependencies": { "@/components/icon": "alice/icon" },
            "direct_registry_dependencies": ["alice/icon", "bob/badge"]
        }))
        .unwrap();

        assert_eq!(component.registry, "ui");
        assert!(component.is_public);
        assert_eq!(component.file_path(), "/components/ui/button.tsx");
        assert_eq!(
            component.registry_targets().unwrap(),
            vec![ComponentRef::new("alice", "icon"), ComponentRef::new("bob", "badge")]
        );
    }

    #[test]
    fn test_demo_targets_include_internal_map() {
        let demo: Demo = serde_json::from_value(serde_json::json!({
            "name": "Default",
            "demo_code": "mem://alice/button/default/demo.tsx",
            "demo_direct_registry_dependencies": ["alice/icon"],
            "demo_internal_dependencies": {
                "@/components/icon": "alice/icon",
                "@/components/ui/card": "bob/card"
            }
        }))
        .unwrap();

        assert_eq!(demo.demo_slug, "default");
        assert_eq!(
            demo.registry_targets().unwrap(),
            vec![ComponentRef::new("alice", "icon"), ComponentRef::new("bob", "card")]
        );
    }

    #[test]
    fn test_unassigned_id_not_serialized() {
        let tag = Tag {
            id: 0,
            name: "Buttons".to_string(),
            slug: "buttons".to_string(),
        };
        let value = serde_json::to_value(&tag).unwrap();
        assert!(value.get("id").is_none());
    }
}
