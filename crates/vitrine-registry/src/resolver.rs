//! Registry dependency resolution
//!
//! Starting from a set of component references, walks the graph of
//! registry dependencies breadth first. Each level loads its component
//! (and requested demo) rows concurrently, then fetches every code file
//! of the level concurrently. Any failure aborts the whole walk.

use std::collections::{BTreeMap, HashSet};

use futures::future::try_join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use vitrine_scan::merge_dependencies;

use crate::error::{file_name_of, RegistryError, Result};
use crate::fetch::SourceFetcher;
use crate::model::{Component, ComponentRef, Demo};
use crate::store::ComponentStore;

/// One resolved file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub code: String,
    /// File namespace of the owning component
    pub registry: String,
    /// Component (or component/demo) the file came from
    pub origin: ComponentRef,
}

/// Two nodes resolved to the same path; the later one was kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathCollision {
    pub path: String,
    pub previous: ComponentRef,
    pub replaced_by: ComponentRef,
}

/// Transitive closure of a set of components.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistryDependencyTree {
    pub files_with_registry: BTreeMap<String, FileEntry>,
    pub npm_dependencies: BTreeMap<String, String>,
    pub collisions: Vec<PathCollision>,
    /// Components in the order they were resolved
    pub resolved: Vec<ComponentRef>,
}

impl RegistryDependencyTree {
    /// Path -> code, dropping origin information.
    pub fn files(&self) -> BTreeMap<String, String> {
        self.files_with_registry
            .iter()
            .map(|(path, entry)| (path.clone(), entry.code.clone()))
            .collect()
    }

    fn record(&mut self, path: String, entry: FileEntry) {
        if let Some(previous) = self.files_with_registry.get(&path) {
            warn!(
                path = %path,
                previous = %previous.origin,
                replaced_by = %entry.origin,
                "Two registry nodes resolved to the same file path"
            );
            self.collisions.push(PathCollision {
                path: path.clone(),
                previous: previous.origin.clone(),
                replaced_by: entry.origin.clone(),
            });
        }
        self.files_with_registry.insert(path, entry);
    }
}

/// A frontier entry: a component plus the demos requested for it.
#[derive(Debug, Clone)]
struct Pending {
    reference: ComponentRef,
    demos: Vec<String>,
}

struct LoadedNode {
    reference: ComponentRef,
    component: Component,
    demos: Vec<Demo>,
}

struct PendingFile {
    path: String,
    url: String,
    registry: String,
    origin: ComponentRef,
    npm: BTreeMap<String, String>,
}

pub struct Resolver<'a> {
    store: &'a dyn ComponentStore,
    fetcher: &'a dyn SourceFetcher,
}

impl<'a> Resolver<'a> {
    pub fn new(store: &'a dyn ComponentStore, fetcher: &'a dyn SourceFetcher) -> Self {
        Self { store, fetcher }
    }

    /// Resolves `source_refs` and everything they depend on.
    ///
    /// With `include_demo_dependencies`, each requested reference also
    /// loads its demo (the demo segment of the reference, or `default`).
    /// Components reached through dependencies contribute only their own
    /// code file.
    pub async fn resolve(
        &self,
        source_refs: &[ComponentRef],
        include_demo_dependencies: bool,
    ) -> Result<RegistryDependencyTree> {
        info!(
            roots = source_refs.len(),
            include_demo_dependencies, "Resolving registry dependencies"
        );

        let mut tree = RegistryDependencyTree::default();
        let mut visited: HashSet<String> = HashSet::new();
        let mut frontier: Vec<Pending> = Vec::new();

        for reference in source_refs {
            let key = reference.component_key();
            if visited.insert(key.clone()) {
                frontier.push(Pending {
                    reference: reference.component(),
                    demos: Vec::new(),
                });
            }
            if include_demo_dependencies {
                let demo_slug = reference.demo_slug().to_string();
                if let Some(pending) = frontier
                    .iter_mut()
                    .find(|p| p.reference.component_key() == key)
                {
                    if !pending.demos.contains(&demo_slug) {
                        pending.demos.push(demo_slug);
                    }
                }
            }
        }

        let mut level = 0usize;
        while !frontier.is_empty() {
            debug!(level, nodes = frontier.len(), "Resolving dependency level");

            let nodes =
                try_join_all(frontier.iter().map(|pending| self.load_node(pending))).await?;

            let files = pending_files(&nodes);
            let codes = try_join_all(files.iter().map(|file| self.fetch(file))).await?;

            for (file, code) in files.into_iter().zip(codes) {
                merge_dependencies(&mut tree.npm_dependencies, &file.npm);
                tree.record(
                    file.path,
                    FileEntry {
                        code,
                        registry: file.registry,
                        origin: file.origin,
                    },
                );
            }

            let mut next = Vec::new();
            for node in &nodes {
                tree.resolved.push(node.reference.clone());

                let mut targets = node.component.registry_targets()?;
                for demo in &node.demos {
                    targets.extend(demo.registry_targets()?);
                }

                for target in targets {
                    // mark at enqueue time so cycles cannot re-enter
                    if visited.insert(target.component_key()) {
                        debug!(
                            from = %node.reference,
                            to = %target,
                            "Queued registry dependency"
                        );
                        next.push(Pending {
                            reference: target,
                            demos: Vec::new(),
                        });
                    }
                }
            }

            frontier = next;
            level += 1;
        }

        info!(
            files = tree.files_with_registry.len(),
            npm = tree.npm_dependencies.len(),
            collisions = tree.collisions.len(),
            "Resolved registry dependencies"
        );
        Ok(tree)
    }

    async fn load_node(&self, pending: &Pending) -> Result<LoadedNode> {
        let reference = &pending.reference;
        let component = self
            .store
            .component(&reference.author, &reference.slug)
            .await?
            .ok_or_else(|| RegistryError::not_found(reference.component_key()))?;

        let demos = try_join_all(pending.demos.iter().map(|demo_slug| {
            let component_id = component.id;
            async move {
                self.store
                    .demo(component_id, demo_slug)
                    .await?
                    .ok_or_else(|| {
                        let key = format!("{}/{}", reference.component_key(), demo_slug);
                        RegistryError::not_found(key)
                    })
            }
        }))
        .await?;

        debug!(component = %reference, demos = demos.len(), "Loaded registry node");

        Ok(LoadedNode {
            reference: reference.clone(),
            component,
            demos,
        })
    }

    async fn fetch(&self, file: &PendingFile) -> Result<String> {
        self.fetcher
            .fetch_text(&file.url)
            .await
            .map_err(|source| RegistryError::Fetch {
                file: file_name_of(&file.url),
                source,
            })
    }
}

/// Files of one level in traversal order: each component before its demos.
fn pending_files(nodes: &[LoadedNode]) -> Vec<PendingFile> {
    let mut files = Vec::new();
    for node in nodes {
        let component = &node.component;
        files.push(PendingFile {
            path: component.file_path(),
            url: component.code.clone(),
            registry: component.registry.clone(),
            origin: node.reference.clone(),
            npm: component.dependencies.clone(),
        });

        for demo in &node.demos {
            files.push(PendingFile {
                path: demo.file_path(component),
                url: demo.demo_code.clone(),
                registry: component.registry.clone(),
                origin: node.reference.clone().with_demo(demo.demo_slug.clone()),
                npm: demo.demo_dependencies.clone(),
            });
        }
    }
    files
}

/// Shorthand for [`Resolver::resolve`].
pub async fn resolve(
    store: &dyn ComponentStore,
    fetcher: &dyn SourceFetcher,
    source_refs: &[ComponentRef],
    include_demo_dependencies: bool,
) -> Result<RegistryDependencyTree> {
    Resolver::new(store, fetcher)
        .resolve(source_refs, include_demo_dependencies)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::StaticFetcher;
    use crate::store::MemoryStore;
    use crate::test_support::listing;

    #[tokio::test]
    async fn test_collision_is_recorded() {
        let store = MemoryStore::new();
        let mut a = listing("alice", "button");
        a.component.direct_registry_dependencies = vec!["bob/button".to_string()];
        store.seed(a);
        store.seed(listing("bob", "button"));

        let fetcher = StaticFetcher::new()
            .with_file("mem://alice/button/code.tsx", "export const A = 1;")
            .with_file("mem://bob/button/code.tsx", "export const B = 1;");

        let roots = [ComponentRef::new("alice", "button")];
        let tree = resolve(&store, &fetcher, &roots, false).await.unwrap();

        assert_eq!(tree.files_with_registry.len(), 1);
        let entry = &tree.files_with_registry["/components/ui/button.tsx"];
        assert_eq!(entry.origin, ComponentRef::new("bob", "button"));
        assert_eq!(
            tree.collisions,
            vec![PathCollision {
                path: "/components/ui/button.tsx".to_string(),
                previous: ComponentRef::new("alice", "button"),
                replaced_by: ComponentRef::new("bob", "button"),
            }]
        );
    }

    #[tokio::test]
    async fn test_missing_demo_is_not_found() {
        let store = MemoryStore::new();
        store.seed(listing("alice", "button"));
        let fetcher = StaticFetcher::new();

        let err = resolve(
            &store,
            &fetcher,
            &[ComponentRef::new("alice", "button").with_demo("missing")],
            true,
        )
        .await
        .unwrap_err();

        match err {
            RegistryError::NotFound { slug } => assert_eq!(slug, "alice/button/missing"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_failure_names_file() {
        let store = MemoryStore::new();
        store.seed(listing("alice", "button"));
        let fetcher = StaticFetcher::new();

        let roots = [ComponentRef::new("alice", "button")];
        let err = resolve(&store, &fetcher, &roots, false).await.unwrap_err();

        match err {
            RegistryError::Fetch { file, .. } => assert_eq!(file, "code.tsx"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
