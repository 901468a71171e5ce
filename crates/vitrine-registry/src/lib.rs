//! Vitrine component registry
//!
//! Data model and storage seams for published components, plus the
//! operations built on them: dependency-tree resolution, publishing,
//! edit diffing and catalog browsing.

pub mod blobs;
pub mod catalog;
pub mod edit;
pub mod error;
pub mod fetch;
pub mod model;
pub mod publish;
pub mod resolver;
pub mod rest;
pub mod showcase;
pub mod store;

pub use blobs::{BlobStore, MemoryBlobs};
pub use catalog::{browse, tab_counts, CatalogQuery, FilterCount, QuickFilter, SortOption};
pub use edit::{apply_update, diff_component, ComponentUpdate, EditForm};
pub use error::{FetchError, RegistryError, Result, ValidationError};
pub use fetch::{HttpFetcher, SourceFetcher, StaticFetcher};
pub use model::{Component, ComponentRef, Demo, Listing, Tag};
pub use publish::{
    generate_slug, generate_unique_slug, is_valid_slug, publish, PublishDraft, Published,
};
pub use resolver::{resolve, FileEntry, PathCollision, RegistryDependencyTree, Resolver};
pub use rest::RestStore;
pub use showcase::{load_showcase, Showcase};
pub use store::{ComponentStore, MemoryStore};
