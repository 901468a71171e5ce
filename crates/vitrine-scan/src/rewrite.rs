//! Source rewrites driven by scanned import spans

use indexmap::IndexMap;
use vitrine_lexer::Span;

use crate::module::{ImportBinding, ImportDecl};
use crate::scanner::Scanner;

/// Result of stripping component imports out of demo code.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImportRemoval {
    pub modified_code: String,
    /// Original text of every statement that was dropped or narrowed
    pub removed_imports: Vec<String>,
}

/// A replacement of `span` in the original text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub span: Span,
    pub replacement: String,
}

impl Edit {
    pub fn new(span: Span, replacement: impl Into<String>) -> Self {
        Self {
            span,
            replacement: replacement.into(),
        }
    }
}

/// Applies non-overlapping edits. Edits are applied back to front so
/// earlier spans stay valid; overlapping or out-of-range edits are dropped.
pub fn apply_edits(source: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by(|a, b| b.span.start.cmp(&a.span.start));

    let mut output = source.to_string();
    let mut floor = source.len();
    for edit in edits {
        let Span { start, end } = edit.span;
        if start > end
            || end > floor
            || !output.is_char_boundary(start)
            || !output.is_char_boundary(end)
        {
            continue;
        }
        output.replace_range(start..end, &edit.replacement);
        floor = start;
    }
    output
}

/// Module the preview serves the component from.
pub const COMPONENT_MODULE: &str = "./Component";

/// Drops imports in demo code that bring in the component's own exports.
///
/// Bindings match on the name the component exports, so `Button as B`
/// counts as `Button`. A statement whose runtime bindings are all
/// component names goes away completely; one that mixes in other names is
/// narrowed to the bindings that remain. Aliased component bindings are
/// re-imported from [`COMPONENT_MODULE`] so the local name stays bound.
/// Type-only imports, re-exports and imports already pointing at
/// [`COMPONENT_MODULE`] are left alone.
pub fn remove_component_imports(demo_source: &str, component_names: &[String]) -> ImportRemoval {
    if component_names.is_empty() {
        return ImportRemoval {
            modified_code: demo_source.to_string(),
            removed_imports: Vec::new(),
        };
    }

    let summary = Scanner::from_source(demo_source).scan();
    let is_component = |name: &str| component_names.iter().any(|c| c == name);

    let mut edits = Vec::new();
    let mut removed_imports = Vec::new();

    for import in &summary.imports {
        if import.reexport || import.is_type_only() || import.source == COMPONENT_MODULE {
            continue;
        }

        let (dropped, kept): (Vec<&ImportBinding>, Vec<&ImportBinding>) =
            import.bindings.iter().partition(|binding| {
                !binding.is_type_only() && is_component(binding.source_name())
            });

        if dropped.is_empty() {
            continue;
        }

        removed_imports.push(statement_text(demo_source, import).to_string());

        let aliases: Vec<&ImportBinding> = dropped
            .into_iter()
            .filter(|binding| binding.source_name() != binding.local())
            .collect();
        let mut statements = Vec::new();
        if kept.iter().any(|b| !b.is_type_only()) {
            let quoted = statement_text_at(demo_source, import.source_span);
            statements.push(render_import(&kept, quoted));
        }
        if !aliases.is_empty() {
            statements.push(render_import(&aliases, &format!("\"{}\"", COMPONENT_MODULE)));
        }

        if statements.is_empty() {
            edits.push(Edit::new(
                extend_over_line_break(demo_source, import.span),
                String::new(),
            ));
        } else {
            edits.push(Edit::new(import.span, statements.join("\n")));
        }
    }

    ImportRemoval {
        modified_code: apply_edits(demo_source, edits),
        removed_imports,
    }
}

/// Points internal import specifiers at their published location.
///
/// `targets` maps a specifier exactly as written (for example
/// `@/components/icon`) to `<registry>/<slug>`; matching imports and
/// re-exports are rewritten to `"@/components/<registry>/<slug>"`.
pub fn rewrite_internal_imports(source: &str, targets: &IndexMap<String, String>) -> String {
    if targets.is_empty() {
        return source.to_string();
    }

    let summary = Scanner::from_source(source).scan();
    let edits = summary
        .imports
        .iter()
        .filter_map(|import| {
            targets
                .get(&import.source)
                .map(|target| Edit::new(import.source_span, format!("\"@/components/{}\"", target)))
        })
        .collect();

    apply_edits(source, edits)
}

fn statement_text<'a>(source: &'a str, import: &ImportDecl) -> &'a str {
    statement_text_at(source, import.span)
}

fn statement_text_at(source: &str, span: Span) -> &str {
    source.get(span.start..span.end).unwrap_or_default()
}

fn extend_over_line_break(source: &str, span: Span) -> Span {
    let rest = &source[span.end.min(source.len())..];
    let extra = if rest.starts_with("\r\n") {
        2
    } else if rest.starts_with('\n') {
        1
    } else {
        0
    };
    Span::new(span.start, span.end + extra)
}

fn render_import(bindings: &[&ImportBinding], quoted_source: &str) -> String {
    let mut clauses = Vec::new();
    let mut named = Vec::new();

    for binding in bindings {
        match binding {
            ImportBinding::Default(local) => clauses.insert(0, local.clone()),
            ImportBinding::Namespace(local) => clauses.push(format!("* as {}", local)),
            ImportBinding::Named {
                imported,
                local,
                type_only,
            } => {
                let prefix = if *type_only { "type " } else { "" };
                if imported == local {
                    named.push(format!("{}{}", prefix, local));
                } else {
                    named.push(format!("{}{} as {}", prefix, imported, local));
                }
            }
        }
    }

    if !named.is_empty() {
        clauses.push(format!("{{ {} }}", named.join(", ")));
    }

    format!("import {} from {};", clauses.join(", "), quoted_source)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_removes_whole_component_import() {
        let demo = "import { Button } from \"@/components/ui/button\";\nimport { useState } from \"react\";\n\nexport function Demo() { return <Button /> }\n";

        let removal = remove_component_imports(demo, &names(&["Button"]));
        assert_eq!(
            removal.removed_imports,
            vec!["import { Button } from \"@/components/ui/button\";".to_string()]
        );
        assert_eq!(
            removal.modified_code,
            "import { useState } from \"react\";\n\nexport function Demo() { return <Button /> }\n"
        );
    }

    #[test]
    fn test_narrows_mixed_import() {
        let demo = "import { Button, buttonVariants as variants, helper } from './button'\nexport default function Demo() {}";

        let removal = remove_component_imports(demo, &names(&["Button", "buttonVariants"]));
        assert_eq!(removal.removed_imports.len(), 1);
        assert_eq!(
            removal.modified_code,
            "import { helper } from './button';\nimport { buttonVariants as variants } from \"./Component\";\nexport default function Demo() {}"
        );
    }

    #[test]
    fn test_keeps_unrelated_and_type_imports() {
        let demo = "import type { Button } from \"./button\";\nimport React from \"react\";\n";
        let removal = remove_component_imports(demo, &names(&["Button", "Card"]));
        assert!(removal.removed_imports.is_empty());
        assert_eq!(removal.modified_code, demo);
    }

    #[test]
    fn test_no_component_names_is_identity() {
        let demo = "import { Button } from \"./button\";";
        let removal = remove_component_imports(demo, &[]);
        assert_eq!(removal.modified_code, demo);
        assert!(removal.removed_imports.is_empty());
    }

    #[test]
    fn test_default_import_of_component_removed() {
        let demo = "import Button from \"./button\";\nexport function Demo() {}";
        let removal = remove_component_imports(demo, &names(&["Button"]));
        assert_eq!(removal.modified_code, "export function Demo() {}");
    }

    #[test]
    fn test_aliased_component_import_points_at_component_module() {
        let demo = "import { Button as B } from \"@/components/ui/button\";\nexport function Demo() { return <B /> }\n";

        let removal = remove_component_imports(demo, &names(&["Button"]));
        assert_eq!(removal.removed_imports.len(), 1);
        assert_eq!(
            removal.modified_code,
            "import { Button as B } from \"./Component\";\nexport function Demo() { return <B /> }\n"
        );

        // running again leaves the component module import alone
        let again = remove_component_imports(&removal.modified_code, &names(&["Button"]));
        assert!(again.removed_imports.is_empty());
        assert_eq!(again.modified_code, removal.modified_code);
    }

    #[test]
    fn test_alias_mixed_with_other_names() {
        let demo = "import { Button as B, useToast } from \"./button\";\n";
        let removal = remove_component_imports(demo, &names(&["Button"]));
        assert_eq!(
            removal.modified_code,
            "import { useToast } from \"./button\";\nimport { Button as B } from \"./Component\";\n"
        );
    }

    #[test]
    fn test_rewrite_internal_imports() {
        let source = "import { Icon } from '@/components/icon';\nimport { cn } from \"@/lib/utils\";\nexport * from \"./shared\";\n";
        let mut targets = IndexMap::new();
        targets.insert("@/components/icon".to_string(), "ui/icon".to_string());
        targets.insert("./shared".to_string(), "ui/shared".to_string());

        let rewritten = rewrite_internal_imports(source, &targets);
        assert_eq!(
            rewritten,
            "import { Icon } from \"@/components/ui/icon\";\nimport { cn } from \"@/lib/utils\";\nexport * from \"@/components/ui/shared\";\n"
        );
    }

    #[test]
    fn test_apply_edits_skips_overlaps() {
        let edits = vec![
            Edit::new(Span::new(0, 5), "hi"),
            Edit::new(Span::new(3, 8), "??"),
            Edit::new(Span::new(9, 11), "!"),
        ];
        // (0, 5) overlaps (3, 8), which is applied first
        assert_eq!(apply_edits("hello big world", edits), "hel??g!orld");
    }
}
