//! Pre-publish checks on a component/demo pair, rendered with ariadne

use std::fmt;
use std::io;
use std::ops::Range;

use ariadne::{Color, Config, IndexType, Label, Report, ReportKind, Source};
use indexmap::IndexMap;

use vitrine_lexer::{Lexer, Span, TokenKind};
use vitrine_scan::{
    classify_specifier, extract_component_names, scan, SpecifierKind, COMPONENT_MODULE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFile {
    Component,
    Demo,
}

impl fmt::Display for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFile::Component => f.write_str("component"),
            SourceFile::Demo => f.write_str("demo"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: &'static str,
    pub severity: Severity,
    pub file: SourceFile,
    pub title: String,
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    fn warning(
        code: &'static str,
        file: SourceFile,
        title: &str,
        message: String,
        span: Span,
    ) -> Self {
        Self {
            code,
            severity: Severity::Warning,
            file,
            title: title.to_string(),
            message,
            span,
        }
    }

    fn error(
        code: &'static str,
        file: SourceFile,
        title: &str,
        message: String,
        span: Span,
    ) -> Self {
        Self {
            severity: Severity::Error,
            ..Self::warning(code, file, title, message, span)
        }
    }
}

/// Checks a component and its demo the way publishing will treat them.
///
/// `mapped` holds internal specifiers already assigned to a registry
/// component; any other `@/` import is reported.
pub fn check_sources(code: &str, demo: &str, mapped: &IndexMap<String, String>) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    diagnostics.extend(lexical_warnings(code, SourceFile::Component));
    diagnostics.extend(lexical_warnings(demo, SourceFile::Demo));

    let component_names = extract_component_names(code);
    if component_names.is_empty() {
        diagnostics.push(Diagnostic::warning(
            "W0003",
            SourceFile::Component,
            "No exports",
            "component has no named exports; the demo cannot import anything".to_string(),
            Span::new(0, 0),
        ));
    }

    let component = scan(code);
    for import in &component.imports {
        if let SpecifierKind::Internal(_) = classify_specifier(&import.source) {
            if !mapped.contains_key(&import.source) {
                diagnostics.push(unmapped(
                    SourceFile::Component,
                    &import.source,
                    import.source_span,
                ));
            }
        }
    }

    let summary = scan(demo);
    for import in &summary.imports {
        if import.reexport || import.is_type_only() || import.source == COMPONENT_MODULE {
            continue;
        }

        let values: Vec<&str> = import.value_bindings().map(|b| b.source_name()).collect();
        let own: Vec<&str> = values
            .iter()
            .copied()
            .filter(|value| component_names.iter().any(|name| name == value))
            .collect();

        if !own.is_empty() {
            diagnostics.push(Diagnostic::warning(
                "W0001",
                SourceFile::Demo,
                "Component import",
                format!(
                    "import of {} is removed; the preview provides the component itself",
                    own.iter().map(|n| format!("`{}`", n)).collect::<Vec<_>>().join(", ")
                ),
                import.span,
            ));
        }

        // fully removed imports never reach the mapping step
        if !values.is_empty() && own.len() == values.len() {
            continue;
        }

        if let SpecifierKind::Internal(_) = classify_specifier(&import.source) {
            if !mapped.contains_key(&import.source) {
                diagnostics.push(unmapped(SourceFile::Demo, &import.source, import.source_span));
            }
        }
    }

    if summary.value_export_names().is_empty() && !summary.has_default_export() {
        diagnostics.push(Diagnostic::error(
            "E0002",
            SourceFile::Demo,
            "Nothing to render",
            "demo has neither a named nor a default export".to_string(),
            Span::new(0, 0),
        ));
    }

    diagnostics
}

fn lexical_warnings(source: &str, file: SourceFile) -> Vec<Diagnostic> {
    Lexer::new(source)
        .tokenize()
        .into_iter()
        .filter(|t| t.kind == TokenKind::Error)
        .map(|t| {
            Diagnostic::warning(
                "W0000",
                file,
                "Lexical warning",
                format!("{}; imports and exports here may be missed", t.value),
                t.span,
            )
        })
        .collect()
}

fn unmapped(file: SourceFile, specifier: &str, span: Span) -> Diagnostic {
    Diagnostic::warning(
        "W0002",
        file,
        "Unmapped internal import",
        format!("`{}` must be mapped to a registry component before publishing", specifier),
        span,
    )
}

pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(|d| d.severity == Severity::Error)
}

/// Lexer spans are byte offsets.
fn report_config() -> Config {
    Config::default().with_index_type(IndexType::Byte)
}

fn build_report<'a>(
    diagnostic: &Diagnostic,
    filename: &'a str,
    source: &str,
    config: Config,
) -> Report<'a, (&'a str, Range<usize>)> {
    let (kind, color) = match diagnostic.severity {
        Severity::Error => (ReportKind::Error, Color::Red),
        Severity::Warning => (ReportKind::Warning, Color::Yellow),
    };

    let end = diagnostic.span.end.min(source.len());
    let start = diagnostic.span.start.min(end);
    let span = (filename, start..end);

    Report::build(kind, span.clone())
        .with_config(config)
        .with_code(diagnostic.code)
        .with_message(&diagnostic.title)
        .with_label(
            Label::new(span)
                .with_message(&diagnostic.message)
                .with_color(color),
        )
        .finish()
}

/// Prints one diagnostic to stderr against its source text.
pub fn report(diagnostic: &Diagnostic, filename: &str, source: &str) -> io::Result<()> {
    build_report(diagnostic, filename, source, report_config())
        .eprint((filename, Source::from(source)))
}
