//! Vitrine preview
//!
//! Assembles the virtual file set a browser sandbox needs to render a
//! component demo, and caches the hover-preview media loaded while
//! browsing the catalog.

pub mod bundle;
pub mod media;

pub use bundle::{
    assemble, BundleError, PreviewBundle, PreviewInput, DEFAULT_REACT_VERSION, ENTRY_PATH,
};
pub use media::MediaLoadCache;
