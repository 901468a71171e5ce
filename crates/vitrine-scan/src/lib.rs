//! Vitrine source scanner
//!
//! Recovers import and export statements from TSX/JS component source
//! and derives what the registry needs from them: exported component
//! names, npm dependencies and internal (project path) dependencies.
//!
//! The scanner is a heuristic over a token stream, not a parser. It never
//! fails; malformed or half-typed code simply yields fewer results.

pub mod deps;
pub mod module;
pub mod rewrite;
pub mod scanner;

pub use deps::{
    classify_specifier, merge_dependencies, parse_dependencies, parse_dependencies_with,
    parse_internal_dependencies, split_package_specifier, SpecifierKind, VersionTable,
};
pub use module::{ExportItem, ExportKind, ImportBinding, ImportDecl, ModuleSummary};
pub use rewrite::{
    apply_edits, remove_component_imports, rewrite_internal_imports, Edit, ImportRemoval,
    COMPONENT_MODULE,
};
pub use scanner::Scanner;

/// Scans `source` for module items.
pub fn scan(source: &str) -> ModuleSummary {
    Scanner::from_source(source).scan()
}

/// Named runtime exports of a component file, in order of first
/// appearance, without duplicates.
pub fn extract_component_names(source: &str) -> Vec<String> {
    scan(source).value_export_names()
}

/// Named runtime exports of a demo file.
pub fn extract_demo_component_names(source: &str) -> Vec<String> {
    extract_component_names(source)
}

/// The symbol a demo renders: the local name behind `export default`
/// when there is one, otherwise the first named export.
pub fn extract_demo_component_name(source: &str) -> Option<String> {
    let summary = scan(source);
    let default_local = summary.default_export().and_then(|item| match &item.kind {
        ExportKind::Default { local } => local.clone(),
        _ => None,
    });

    default_local.or_else(|| summary.value_export_names().into_iter().next())
}
