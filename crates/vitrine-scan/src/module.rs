//! Module-level items recovered from a source file

use vitrine_lexer::Span;

/// One `import ... from "x"` (or `export ... from "x"`) statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDecl {
    /// Module specifier exactly as written, without quotes
    pub source: String,
    pub bindings: Vec<ImportBinding>,
    /// `import type { .. }`
    pub type_only: bool,
    /// `export { .. } from "x"` / `export * from "x"`
    pub reexport: bool,
    /// Whole statement, including a trailing semicolon when present
    pub span: Span,
    /// The string literal holding the specifier, quotes included
    pub source_span: Span,
}

impl ImportDecl {
    /// Local names bound by this import that exist at runtime.
    pub fn value_locals(&self) -> impl Iterator<Item = &str> {
        let type_only = self.type_only;
        self.bindings.iter().filter_map(move |binding| match binding {
            _ if type_only => None,
            ImportBinding::Named { type_only: true, .. } => None,
            other => Some(other.local()),
        })
    }

    /// Runtime bindings of this import.
    pub fn value_bindings(&self) -> impl Iterator<Item = &ImportBinding> {
        let type_only = self.type_only;
        self.bindings
            .iter()
            .filter(move |binding| !type_only && !binding.is_type_only())
    }

    /// True when every binding is type-only (nothing survives compilation).
    pub fn is_type_only(&self) -> bool {
        self.type_only
            || (!self.bindings.is_empty()
                && self
                    .bindings
                    .iter()
                    .all(|b| matches!(b, ImportBinding::Named { type_only: true, .. })))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportBinding {
    /// import name from "module"
    Default(String),

    /// import * as name from "module"
    Namespace(String),

    /// import { name } from "module" or import { name as alias } from "module"
    Named {
        imported: String,
        local: String,
        type_only: bool,
    },
}

impl ImportBinding {
    pub fn local(&self) -> &str {
        match self {
            ImportBinding::Default(name) | ImportBinding::Namespace(name) => name,
            ImportBinding::Named { local, .. } => local,
        }
    }

    /// The name the exporting module knows this binding by. Default and
    /// namespace imports have none, so their local name stands in.
    pub fn source_name(&self) -> &str {
        match self {
            ImportBinding::Default(name) | ImportBinding::Namespace(name) => name,
            ImportBinding::Named { imported, .. } => imported,
        }
    }

    pub fn is_type_only(&self) -> bool {
        matches!(self, ImportBinding::Named { type_only: true, .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportKind {
    /// Runtime value: function, class, variable, enum
    Value,
    /// Type alias, interface, namespace, `export type { .. }`
    Type,
    /// `export default ..`; carries the local name when there is one
    Default { local: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportItem {
    /// Exported name (`"default"` for default exports)
    pub name: String,
    pub kind: ExportKind,
    pub span: Span,
}

/// Everything the scanner recovered from one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleSummary {
    pub imports: Vec<ImportDecl>,
    pub exports: Vec<ExportItem>,
}

impl ModuleSummary {
    /// Named runtime exports in order of first appearance, deduplicated.
    pub fn value_export_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for export in &self.exports {
            if export.kind == ExportKind::Value && !names.contains(&export.name) {
                names.push(export.name.clone());
            }
        }
        names
    }

    pub fn default_export(&self) -> Option<&ExportItem> {
        self.exports
            .iter()
            .find(|e| matches!(e.kind, ExportKind::Default { .. }))
    }

    pub fn has_default_export(&self) -> bool {
        self.default_export().is_some()
    }
}
