//! Dependency discovery from import specifiers
//!
//! Specifiers fall into four classes:
//! - builtin Node modules (`fs`, `node:path`), never bundled
//! - internal paths: the `@/` project alias or relative `./` / `../`
//! - npm packages: everything else, reduced to the package name
//! - the bundled `@/lib/utils` helper, which the preview always provides

use std::collections::{BTreeMap, HashMap};

use indexmap::IndexMap;
use serde::Deserialize;

use crate::module::ModuleSummary;
use crate::scanner::Scanner;

/// Alias that maps to the project root inside the preview sandbox.
pub const PROJECT_ALIAS: &str = "@/";

/// Helper module every preview ships with.
pub const BUNDLED_UTILS: &str = "@/lib/utils";

/// Version range used for packages missing from the version table.
pub const DEFAULT_VERSION: &str = "latest";

const KNOWN_VERSIONS: &[(&str, &str)] = &[
    ("react", "^18.2.0"),
    ("react-dom", "^18.2.0"),
    ("framer-motion", "^11.0.0"),
    ("motion", "^11.0.0"),
    ("lucide-react", "^0.460.0"),
    ("clsx", "^2.1.1"),
    ("tailwind-merge", "^2.5.0"),
    ("class-variance-authority", "^0.7.0"),
    ("@radix-ui/react-slot", "^1.1.0"),
    ("@radix-ui/react-dialog", "^1.1.2"),
    ("@radix-ui/react-dropdown-menu", "^2.1.2"),
    ("@radix-ui/react-tooltip", "^1.1.3"),
    ("@radix-ui/react-tabs", "^1.1.1"),
    ("@radix-ui/react-popover", "^1.1.2"),
    ("@radix-ui/react-label", "^2.1.0"),
    ("@radix-ui/react-icons", "^1.3.0"),
    ("react-hook-form", "^7.53.0"),
    ("zod", "^3.23.8"),
    ("date-fns", "^3.6.0"),
    ("sonner", "^1.5.0"),
    ("next-themes", "^0.3.0"),
];

/// What an import specifier points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecifierKind {
    /// Node builtin, e.g. `fs` or `node:path`
    Builtin,
    /// The helper module bundled into every preview
    BundledUtils,
    /// Project-internal path with alias or `./` stripped
    Internal(String),
    /// npm package name (scope-aware, subpath removed)
    Package(String),
}

/// Lookup of package name to version range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionTable {
    versions: HashMap<String, String>,
}

#[derive(Deserialize)]
struct PackageManifest {
    #[serde(default)]
    dependencies: HashMap<String, String>,
    #[serde(default, rename = "devDependencies")]
    dev_dependencies: HashMap<String, String>,
}

impl VersionTable {
    pub fn empty() -> Self {
        Self {
            versions: HashMap::new(),
        }
    }

    /// Builds a table from the `dependencies` and `devDependencies` of a
    /// package.json document. Runtime dependencies take precedence.
    pub fn from_package_json(content: &str) -> Result<Self, serde_json::Error> {
        let manifest: PackageManifest = serde_json::from_str(content)?;
        let mut versions = manifest.dev_dependencies;
        versions.extend(manifest.dependencies);
        Ok(Self { versions })
    }

    /// Adds entries from `other` that this table lacks.
    pub fn with_fallback(mut self, other: &VersionTable) -> Self {
        for (name, version) in &other.versions {
            self.versions
                .entry(name.clone())
                .or_insert_with(|| version.clone());
        }
        self
    }

    pub fn version_of(&self, package: &str) -> &str {
        self.versions
            .get(package)
            .map(String::as_str)
            .unwrap_or(DEFAULT_VERSION)
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

impl Default for VersionTable {
    fn default() -> Self {
        Self {
            versions: KNOWN_VERSIONS
                .iter()
                .map(|(name, version)| (name.to_string(), version.to_string()))
                .collect(),
        }
    }
}

/// Classifies an import specifier.
pub fn classify_specifier(specifier: &str) -> SpecifierKind {
    if is_builtin(specifier) {
        return SpecifierKind::Builtin;
    }

    if specifier == BUNDLED_UTILS {
        return SpecifierKind::BundledUtils;
    }

    if let Some(path) = specifier.strip_prefix(PROJECT_ALIAS) {
        return SpecifierKind::Internal(path.to_string());
    }

    if let Some(path) = specifier.strip_prefix("./") {
        return SpecifierKind::Internal(path.to_string());
    }

    if specifier.starts_with("../") || specifier.starts_with('/') {
        return SpecifierKind::Internal(specifier.to_string());
    }

    let (package, _) = split_package_specifier(specifier);
    SpecifierKind::Package(package.to_string())
}

/// Check if a specifier is a Node builtin module
fn is_builtin(specifier: &str) -> bool {
    if specifier.starts_with("node:") {
        return true;
    }
    matches!(
        specifier,
        "fs" | "path" | "http" | "https" | "os" | "process" | "events"
            | "url" | "crypto" | "util" | "stream" | "buffer"
            | "child_process" | "net" | "tls" | "dns" | "querystring"
            | "assert" | "zlib"
    )
}

/// Split a package specifier into package name and subpath
///
/// Examples:
/// - "lodash" → ("lodash", None)
/// - "lodash/fp" → ("lodash", Some("fp"))
/// - "@radix-ui/react-slot" → ("@radix-ui/react-slot", None)
/// - "@scope/pkg/sub/path" → ("@scope/pkg", Some("sub/path"))
pub fn split_package_specifier(specifier: &str) -> (&str, Option<&str>) {
    let skip = if specifier.starts_with('@') { 1 } else { 0 };

    match specifier.match_indices('/').nth(skip) {
        Some((pos, _)) => (&specifier[..pos], Some(&specifier[pos + 1..])),
        None => (specifier, None),
    }
}

/// npm packages imported by `source`, mapped to version ranges from the
/// built-in version table.
pub fn parse_dependencies(source: &str) -> BTreeMap<String, String> {
    parse_dependencies_with(source, &VersionTable::default())
}

pub fn parse_dependencies_with(source: &str, versions: &VersionTable) -> BTreeMap<String, String> {
    let summary = Scanner::from_source(source).scan();
    dependencies_of(&summary, versions)
}

/// npm dependencies of an already scanned module. Type-only imports
/// are skipped since they leave nothing behind at runtime.
pub fn dependencies_of(
    summary: &ModuleSummary,
    versions: &VersionTable,
) -> BTreeMap<String, String> {
    let mut dependencies = BTreeMap::new();
    for import in &summary.imports {
        if import.is_type_only() {
            continue;
        }
        if let SpecifierKind::Package(name) = classify_specifier(&import.source) {
            if name.is_empty() {
                continue;
            }
            let version = versions.version_of(&name).to_string();
            dependencies.entry(name).or_insert(version);
        }
    }
    dependencies
}

/// Internal import specifiers of `source`, in order of appearance, mapped
/// to their path relative to the project root.
pub fn parse_internal_dependencies(source: &str) -> IndexMap<String, String> {
    let summary = Scanner::from_source(source).scan();
    internal_dependencies_of(&summary)
}

pub fn internal_dependencies_of(summary: &ModuleSummary) -> IndexMap<String, String> {
    let mut internal = IndexMap::new();
    for import in &summary.imports {
        if let SpecifierKind::Internal(path) = classify_specifier(&import.source) {
            internal.entry(import.source.clone()).or_insert(path);
        }
    }
    internal
}

/// Merges `from` into `into`, keeping entries already present.
///
/// First-seen-wins makes the merged map independent of how many times a
/// given map is merged, and stable for a fixed merge order.
pub fn merge_dependencies(into: &mut BTreeMap<String, String>, from: &BTreeMap<String, String>) {
    for (name, version) in from {
        if !into.contains_key(name) {
            into.insert(name.clone(), version.clone());
        }
    }
}
