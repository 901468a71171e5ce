//! Error types for registry operations.

use thiserror::Error;

/// Errors surfaced by store lookups, file fetches and the publish flow.
///
/// Every failure is single-attempt: nothing in this crate retries.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Component or demo row missing for a reference
    #[error("component '{slug}' not found")]
    NotFound { slug: String },

    /// Stored source file could not be read
    #[error("failed to fetch file {file}: {source}")]
    Fetch {
        file: String,
        #[source]
        source: FetchError,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Backing store rejected or failed a query
    #[error("{context}: {message}")]
    Upstream { context: String, message: String },
}

impl RegistryError {
    pub fn not_found(slug: impl Into<String>) -> Self {
        Self::NotFound { slug: slug.into() }
    }

    pub fn upstream(context: impl Into<String>, message: impl ToString) -> Self {
        Self::Upstream {
            context: context.into(),
            message: message.to_string(),
        }
    }
}

/// Why reading a stored file failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server answered {status}")]
    Status { status: u16 },

    #[error("no content stored at {url}")]
    Missing { url: String },
}

/// Rejected publish or edit input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid slug format: '{slug}'")]
    MalformedSlug { slug: String },

    #[error("slug '{slug}' is already taken")]
    DuplicateSlug { slug: String },

    #[error("missing required field '{field}'")]
    MissingField { field: &'static str },

    #[error("internal import '{path}' is not mapped to a component")]
    UnmappedDependency { path: String },

    #[error("invalid component reference '{reference}'")]
    MalformedRef { reference: String },
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// File name used in fetch errors: last path segment of the URL.
pub(crate) fn file_name_of(url: &str) -> String {
    url.rsplit('/').next().unwrap_or(url).to_string()
}
