//! Everything a component page needs to render a live preview

use futures::try_join;
use serde::Serialize;
use tracing::info;

use vitrine_scan::extract_demo_component_names;

use crate::error::{file_name_of, RegistryError, Result};
use crate::fetch::SourceFetcher;
use crate::model::{Component, ComponentRef, Demo};
use crate::resolver::{RegistryDependencyTree, Resolver};
use crate::store::ComponentStore;

/// A component with one of its demos, sources fetched and registry
/// dependencies resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Showcase {
    pub component: Component,
    pub demo: Demo,
    /// Every demo of the component, for the demo switcher
    pub demos: Vec<Demo>,
    pub code: String,
    pub demo_code: String,
    pub demo_component_names: Vec<String>,
    pub tailwind_config: Option<String>,
    pub global_css: Option<String>,
    pub compiled_css: Option<String>,
    pub registry: RegistryDependencyTree,
}

/// Loads the component and demo named by `reference`, their files and the
/// registry closure of the component plus the demo's own registry
/// dependencies. All fetches run together; the first failure wins.
pub async fn load_showcase(
    store: &dyn ComponentStore,
    fetcher: &dyn SourceFetcher,
    reference: &ComponentRef,
) -> Result<Showcase> {
    let component = store
        .component(&reference.author, &reference.slug)
        .await?
        .ok_or_else(|| RegistryError::not_found(reference.component_key()))?;

    let demo_slug = reference.demo_slug();
    let demo = store
        .demo(component.id, demo_slug)
        .await?
        .ok_or_else(|| {
            RegistryError::not_found(format!("{}/{}", reference.component_key(), demo_slug))
        })?;

    let mut roots = vec![reference.component().with_demo(demo_slug)];
    roots.extend(demo.registry_targets()?);

    let resolver = Resolver::new(store, fetcher);
    let (demos, code, demo_code, tailwind_config, global_css, compiled_css, registry) = try_join!(
        store.demos_of(component.id),
        fetch(fetcher, &component.code),
        fetch(fetcher, &demo.demo_code),
        fetch_optional(fetcher, component.tailwind_config_extension.as_deref()),
        fetch_optional(fetcher, component.global_css_extension.as_deref()),
        fetch_optional(fetcher, demo.compiled_css.as_deref()),
        resolver.resolve(&roots, true),
    )?;

    let demo_component_names = extract_demo_component_names(&demo_code);

    info!(
        component = %reference,
        registry_files = registry.files_with_registry.len(),
        "Loaded component showcase"
    );

    Ok(Showcase {
        component,
        demo,
        demos,
        code,
        demo_code,
        demo_component_names,
        tailwind_config,
        global_css,
        compiled_css,
        registry,
    })
}

async fn fetch(fetcher: &dyn SourceFetcher, url: &str) -> Result<String> {
    fetcher
        .fetch_text(url)
        .await
        .map_err(|source| RegistryError::Fetch {
            file: file_name_of(url),
            source,
        })
}

async fn fetch_optional(fetcher: &dyn SourceFetcher, url: Option<&str>) -> Result<Option<String>> {
    match url {
        Some(url) => fetch(fetcher, url).await.map(Some),
        None => Ok(None),
    }
}
