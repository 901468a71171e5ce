//! Token-stream scanner for import and export statements.
//!
//! This is a heuristic, not a compiler front end: it looks for `import`
//! and `export` keywords and reads the shape that follows. Anything it
//! does not recognise is skipped, so half-written code yields whatever
//! statements are still well formed.

use vitrine_lexer::{Lexer, Span, Token, TokenKind};

use crate::module::{ExportItem, ExportKind, ImportBinding, ImportDecl, ModuleSummary};

pub struct Scanner {
    tokens: Vec<Token>,
    current: usize,
}

impl Scanner {
    /// Creates a scanner over an already tokenized file.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.kind != TokenKind::Eof).unwrap_or(true) {
            let end = tokens.last().map(|t| t.span.end).unwrap_or(0);
            tokens.push(Token {
                kind: TokenKind::Eof,
                span: Span::new(end, end),
                value: String::new(),
            });
        }
        Self { tokens, current: 0 }
    }

    pub fn from_source(source: &str) -> Self {
        Self::new(Lexer::new(source).tokenize())
    }

    /// Walks the whole token stream and collects module items.
    pub fn scan(&mut self) -> ModuleSummary {
        let mut summary = ModuleSummary::default();

        while !self.is_at_end() {
            let after_dot = self.previous_kind() == Some(&TokenKind::Dot);
            match self.current_token().kind {
                TokenKind::Import if !after_dot => {
                    if let Some(import) = self.scan_import() {
                        summary.imports.push(import);
                    }
                }
                TokenKind::Export if !after_dot => {
                    self.scan_export(&mut summary);
                }
                _ => {
                    self.advance();
                }
            }
        }

        summary
    }

    // =========================================================================
    // Imports
    // =========================================================================

    fn scan_import(&mut self) -> Option<ImportDecl> {
        let start = self.advance().span;

        // import("x") and import.meta
        if self.check(&TokenKind::LParen) || self.check(&TokenKind::Dot) {
            return None;
        }

        let type_only = if self.check(&TokenKind::Type)
            && !matches!(
                self.peek_kind(1),
                Some(TokenKind::Comma) | Some(TokenKind::From)
            ) {
            self.advance();
            true
        } else {
            false
        };

        let mut bindings = Vec::new();

        // import "module"
        if self.check(&TokenKind::StringLiteral) {
            let literal = self.advance().clone();
            return Some(self.finish_import(start, literal, bindings, type_only, false));
        }

        // import defaultName [, ...] from "module"
        if self.check_name() {
            let name = self.advance().value.clone();
            bindings.push(ImportBinding::Default(name));
            if self.check(&TokenKind::Comma) {
                self.advance();
            }
        }

        if self.check(&TokenKind::Star) {
            self.advance();
            self.eat(TokenKind::As)?;
            let name = self.take_name()?;
            bindings.push(ImportBinding::Namespace(name));
        } else if self.check(&TokenKind::LBrace) {
            self.advance();
            for (imported, local, spec_type_only) in self.scan_specifier_list()? {
                bindings.push(ImportBinding::Named {
                    imported,
                    local,
                    type_only: spec_type_only,
                });
            }
        }

        self.eat(TokenKind::From)?;
        let literal = self.eat(TokenKind::StringLiteral)?;
        Some(self.finish_import(start, literal, bindings, type_only, false))
    }

    fn finish_import(
        &mut self,
        start: Span,
        literal: Token,
        bindings: Vec<ImportBinding>,
        type_only: bool,
        reexport: bool,
    ) -> ImportDecl {
        let mut end = literal.span;
        if self.check(&TokenKind::Semicolon) {
            end = self.advance().span;
        }
        ImportDecl {
            source: literal.value,
            bindings,
            type_only,
            reexport,
            span: start.merge(&end),
            source_span: literal.span,
        }
    }

    /// Reads `a, type b, c as d }` after the opening brace.
    /// Yields `(name, alias_or_name, type_only)` triples.
    fn scan_specifier_list(&mut self) -> Option<Vec<(String, String, bool)>> {
        let mut specifiers = Vec::new();

        while !self.check(&TokenKind::RBrace) {
            let spec_type_only = if self.check(&TokenKind::Type)
                && self.peek_kind(1).map(|k| k.is_word() && *k != TokenKind::As) == Some(true)
            {
                self.advance();
                true
            } else {
                false
            };

            let name = self.take_name()?;
            let alias = if self.check(&TokenKind::As) {
                self.advance();
                self.take_name()?
            } else {
                name.clone()
            };
            specifiers.push((name, alias, spec_type_only));

            if self.check(&TokenKind::Comma) {
                self.advance();
            } else if !self.check(&TokenKind::RBrace) {
                return None;
            }
        }

        self.advance();
        Some(specifiers)
    }

    // =========================================================================
    // Exports
    // =========================================================================

    fn scan_export(&mut self, summary: &mut ModuleSummary) -> Option<()> {
        let start = self.advance().span;

        match self.current_token().kind {
            TokenKind::Default => {
                self.advance();
                let local = self.scan_default_target();
                summary.exports.push(ExportItem {
                    name: "default".to_string(),
                    kind: ExportKind::Default { local },
                    span: start.merge(&self.previous_token().span),
                });
            }
            TokenKind::Star => {
                self.advance();
                let mut bindings = Vec::new();
                if self.check(&TokenKind::As) {
                    self.advance();
                    let name = self.take_name()?;
                    summary.exports.push(ExportItem {
                        name: name.clone(),
                        kind: ExportKind::Value,
                        span: start.merge(&self.previous_token().span),
                    });
                    bindings.push(ImportBinding::Namespace(name));
                }
                self.eat(TokenKind::From)?;
                let literal = self.eat(TokenKind::StringLiteral)?;
                let import = self.finish_import(start, literal, bindings, false, true);
                summary.imports.push(import);
            }
            TokenKind::LBrace => {
                self.advance();
                self.scan_export_list(start, false, summary)?;
            }
            TokenKind::Type if self.peek_kind(1) == Some(&TokenKind::LBrace) => {
                self.advance();
                self.advance();
                self.scan_export_list(start, true, summary)?;
            }
            TokenKind::Type | TokenKind::Interface | TokenKind::Namespace => {
                self.advance();
                let name = self.take_name()?;
                summary.exports.push(ExportItem {
                    name,
                    kind: ExportKind::Type,
                    span: start.merge(&self.previous_token().span),
                });
            }
            TokenKind::Declare => {
                self.advance();
                while matches!(
                    self.current_token().kind,
                    TokenKind::Const
                        | TokenKind::Let
                        | TokenKind::Var
                        | TokenKind::Function
                        | TokenKind::Class
                        | TokenKind::Enum
                        | TokenKind::Abstract
                        | TokenKind::Namespace
                        | TokenKind::Async
                ) {
                    self.advance();
                }
                let name = self.take_name()?;
                summary.exports.push(ExportItem {
                    name,
                    kind: ExportKind::Type,
                    span: start.merge(&self.previous_token().span),
                });
            }
            TokenKind::Async | TokenKind::Function => {
                self.eat(TokenKind::Async);
                self.eat(TokenKind::Function)?;
                self.eat(TokenKind::Star);
                let name = self.take_name()?;
                summary.exports.push(ExportItem {
                    name,
                    kind: ExportKind::Value,
                    span: start.merge(&self.previous_token().span),
                });
            }
            TokenKind::Abstract | TokenKind::Class | TokenKind::Enum => {
                self.eat(TokenKind::Abstract);
                self.advance();
                let name = self.take_name()?;
                summary.exports.push(ExportItem {
                    name,
                    kind: ExportKind::Value,
                    span: start.merge(&self.previous_token().span),
                });
            }
            TokenKind::Const if self.peek_kind(1) == Some(&TokenKind::Enum) => {
                // const enums are erased at compile time
                self.advance();
                self.advance();
                let name = self.take_name()?;
                summary.exports.push(ExportItem {
                    name,
                    kind: ExportKind::Type,
                    span: start.merge(&self.previous_token().span),
                });
            }
            TokenKind::Const | TokenKind::Let | TokenKind::Var => {
                self.advance();
                for (name, span) in self.scan_declarators() {
                    summary.exports.push(ExportItem {
                        name,
                        kind: ExportKind::Value,
                        span: start.merge(&span),
                    });
                }
            }
            _ => {}
        }

        Some(())
    }

    /// After `export default`: the local name being exported, if any.
    fn scan_default_target(&mut self) -> Option<String> {
        match self.current_token().kind {
            TokenKind::Async | TokenKind::Function => {
                self.eat(TokenKind::Async);
                self.eat(TokenKind::Function)?;
                self.eat(TokenKind::Star);
                if self.check(&TokenKind::Identifier) {
                    Some(self.advance().value.clone())
                } else {
                    None
                }
            }
            TokenKind::Abstract | TokenKind::Class => {
                self.eat(TokenKind::Abstract);
                self.advance();
                if self.check(&TokenKind::Identifier) {
                    Some(self.advance().value.clone())
                } else {
                    None
                }
            }
            TokenKind::Identifier => {
                let is_reference = !matches!(
                    self.peek_kind(1),
                    Some(TokenKind::LParen)
                        | Some(TokenKind::Dot)
                        | Some(TokenKind::Punct)
                        | Some(TokenKind::Lt)
                );
                if is_reference {
                    let name = self.advance().value.clone();
                    self.eat(TokenKind::Semicolon);
                    Some(name)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    fn scan_export_list(
        &mut self,
        start: Span,
        type_only: bool,
        summary: &mut ModuleSummary,
    ) -> Option<()> {
        let specifiers = self.scan_specifier_list()?;

        let reexport_source = if self.check(&TokenKind::From) {
            self.advance();
            Some(self.eat(TokenKind::StringLiteral)?)
        } else {
            self.eat(TokenKind::Semicolon);
            None
        };

        let span = start.merge(&self.previous_token().span);
        for (local, exported, spec_type_only) in &specifiers {
            let kind = if type_only || *spec_type_only {
                ExportKind::Type
            } else if exported == "default" {
                let local =
                    (reexport_source.is_none() && local != "default").then(|| local.clone());
                ExportKind::Default { local }
            } else {
                ExportKind::Value
            };
            summary.exports.push(ExportItem {
                name: exported.clone(),
                kind,
                span,
            });
        }

        if let Some(literal) = reexport_source {
            let bindings = specifiers
                .into_iter()
                .map(|(imported, local, spec_type_only)| ImportBinding::Named {
                    imported,
                    local,
                    type_only: spec_type_only,
                })
                .collect();
            let import = self.finish_import(start, literal, bindings, type_only, true);
            summary.imports.push(import);
        }

        Some(())
    }

    /// Reads `a = .., b = .., { c, d: e } = ..` after `const`/`let`/`var`.
    fn scan_declarators(&mut self) -> Vec<(String, Span)> {
        let mut names = Vec::new();
        let mut first = true;

        loop {
            match self.current_token().kind {
                TokenKind::LBrace | TokenKind::LBracket => {
                    names.extend(self.scan_binding_pattern());
                }
                _ if self.check_name() => {
                    let token = self.current_token().clone();
                    let follows_declarator = matches!(
                        self.peek_kind(1),
                        Some(TokenKind::Eq)
                            | Some(TokenKind::Colon)
                            | Some(TokenKind::Comma)
                            | Some(TokenKind::Semicolon)
                            | Some(TokenKind::Eof)
                    );
                    if !first && !follows_declarator {
                        return names;
                    }
                    self.advance();
                    names.push((token.value, token.span));
                }
                _ => return names,
            }
            first = false;

            if !self.skip_initializer() {
                return names;
            }
        }
    }

    /// Skips to the next top-level comma. Returns false when the statement
    /// ended instead.
    fn skip_initializer(&mut self) -> bool {
        let mut depth = 0usize;
        loop {
            match self.current_token().kind {
                TokenKind::LParen | TokenKind::LBrace | TokenKind::LBracket => depth += 1,
                TokenKind::RParen | TokenKind::RBrace | TokenKind::RBracket => {
                    if depth == 0 {
                        return false;
                    }
                    depth -= 1;
                }
                TokenKind::Comma if depth == 0 => {
                    self.advance();
                    return true;
                }
                TokenKind::Semicolon if depth == 0 => {
                    self.advance();
                    return false;
                }
                TokenKind::Import
                | TokenKind::Export
                | TokenKind::Const
                | TokenKind::Let
                | TokenKind::Var
                | TokenKind::Function
                | TokenKind::Class
                | TokenKind::Interface
                | TokenKind::Enum
                | TokenKind::Type
                    if depth == 0 =>
                {
                    return false;
                }
                TokenKind::Eof => return false,
                _ => {}
            }
            self.advance();
        }
    }

    /// Collects bound names from a destructuring pattern.
    fn scan_binding_pattern(&mut self) -> Vec<(String, Span)> {
        let mut names = Vec::new();
        let mut depth = 0usize;

        loop {
            let kind = self.current_token().kind.clone();
            match kind {
                TokenKind::LBrace | TokenKind::LBracket => depth += 1,
                TokenKind::RBrace | TokenKind::RBracket => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.advance();
                        return names;
                    }
                }
                TokenKind::Identifier => {
                    let bound = matches!(
                        self.peek_kind(1),
                        Some(TokenKind::Comma)
                            | Some(TokenKind::RBrace)
                            | Some(TokenKind::RBracket)
                            | Some(TokenKind::Eq)
                    ) && self.previous_kind() != Some(&TokenKind::Eq);
                    if bound {
                        let token = self.current_token();
                        names.push((token.value.clone(), token.span));
                    }
                }
                TokenKind::Eof | TokenKind::Semicolon => return names,
                _ => {}
            }
            self.advance();
        }
    }

    // =========================================================================
    // Token helpers
    // =========================================================================

    fn current_token(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn previous_token(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1).min(self.tokens.len() - 1)]
    }

    fn previous_kind(&self) -> Option<&TokenKind> {
        if self.current == 0 {
            None
        } else {
            self.tokens.get(self.current - 1).map(|t| &t.kind)
        }
    }

    fn peek_kind(&self, n: usize) -> Option<&TokenKind> {
        self.tokens.get(self.current + n).map(|t| &t.kind)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.current_token().kind == kind
    }

    /// Binding names may be contextual keywords (`type`, `as`, `from`, ...)
    /// but never `import`/`export`, which start a new statement.
    fn check_name(&self) -> bool {
        let kind = &self.current_token().kind;
        kind.is_word() && !matches!(kind, TokenKind::Import | TokenKind::Export)
    }

    fn take_name(&mut self) -> Option<String> {
        if self.check_name() {
            Some(self.advance().value.clone())
        } else {
            None
        }
    }

    fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        if self.check(&kind) {
            Some(self.advance().clone())
        } else {
            None
        }
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous_token()
    }

    fn is_at_end(&self) -> bool {
        self.current_token().kind == TokenKind::Eof
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(source: &str) -> ModuleSummary {
        Scanner::from_source(source).scan()
    }

    #[test]
    fn test_import_shapes() {
        let summary = scan(
            r#"
            import React, { useState as useLocalState, type FC } from "react";
            import * as Dialog from '@radix-ui/react-dialog'
            import "./globals.css";
            import type { VariantProps } from "class-variance-authority";
            "#,
        );

        assert_eq!(summary.imports.len(), 4);

        let react = &summary.imports[0];
        assert_eq!(react.source, "react");
        assert_eq!(react.bindings[0], ImportBinding::Default("React".to_string()));
        assert_eq!(
            react.bindings[1],
            ImportBinding::Named {
                imported: "useState".to_string(),
                local: "useLocalState".to_string(),
                type_only: false,
            }
        );
        assert_eq!(
            react.value_locals().collect::<Vec<_>>(),
            vec!["React", "useLocalState"]
        );

        assert_eq!(
            summary.imports[1].bindings,
            vec![ImportBinding::Namespace("Dialog".to_string())]
        );
        assert!(summary.imports[2].bindings.is_empty());
        assert!(summary.imports[3].is_type_only());
    }

    #[test]
    fn test_import_span_includes_semicolon() {
        let source = "import { a } from \"b\";\nconst x = 1;";
        let summary = scan(source);
        let span = summary.imports[0].span;
        assert_eq!(&source[span.start..span.end], "import { a } from \"b\";");
    }

    #[test]
    fn test_dynamic_import_skipped() {
        let summary = scan("const Lazy = React.lazy(() => import(\"./Heavy\"));");
        assert!(summary.imports.is_empty());
    }

    #[test]
    fn test_export_declarations() {
        let summary = scan(
            r#"
            export function Button() {}
            export async function load() {}
            export const Card = () => <div>Hello, world</div>
            export class Store {}
            export enum Size { Sm, Lg }
            export type Props = { a: string };
            export interface Theme {}
            export let a = 1, b = [1, 2], { c, d: e } = obj;
            "#,
        );

        let values = summary.value_export_names();
        assert_eq!(
            values,
            vec!["Button", "load", "Card", "Store", "Size", "a", "b", "c", "e"]
        );
        assert!(summary
            .exports
            .iter()
            .any(|e| e.name == "Props" && e.kind == ExportKind::Type));
        assert!(summary
            .exports
            .iter()
            .any(|e| e.name == "Theme" && e.kind == ExportKind::Type));
    }

    #[test]
    fn test_export_list_and_default() {
        let summary = scan(
            r#"
            const Button = () => null;
            const Badge = () => null;
            export { Button, Badge as Pill };
            export type { Props };
            export default Button;
            "#,
        );

        assert_eq!(summary.value_export_names(), vec!["Button", "Pill"]);
        assert_eq!(
            summary.default_export().map(|e| e.kind.clone()),
            Some(ExportKind::Default {
                local: Some("Button".to_string())
            })
        );
    }

    #[test]
    fn test_default_function_and_anonymous() {
        let named = scan("export default function DemoPage() { return null }");
        assert_eq!(
            named.default_export().map(|e| e.kind.clone()),
            Some(ExportKind::Default {
                local: Some("DemoPage".to_string())
            })
        );

        let anonymous = scan("export default () => <div />;");
        assert_eq!(
            anonymous.default_export().map(|e| e.kind.clone()),
            Some(ExportKind::Default { local: None })
        );

        let wrapped = scan("export default memo(Button);");
        assert_eq!(
            wrapped.default_export().map(|e| e.kind.clone()),
            Some(ExportKind::Default { local: None })
        );
    }

    #[test]
    fn test_reexports_recorded_as_imports() {
        let summary = scan(
            r#"
            export * from "lucide-react";
            export { Slot as Root } from "@radix-ui/react-slot";
            "#,
        );

        assert_eq!(summary.imports.len(), 2);
        assert!(summary.imports.iter().all(|i| i.reexport));
        assert_eq!(summary.imports[1].source, "@radix-ui/react-slot");
        assert_eq!(summary.value_export_names(), vec!["Root"]);
    }

    #[test]
    fn test_partial_code_does_not_panic() {
        let inputs = [
            "",
            "import",
            "import {",
            "import { a, ",
            "export",
            "export const",
            "export default",
            "export { a as",
            "import x from",
            "export const { a, ",
            "}}}{{{",
        ];
        for input in inputs {
            let _ = scan(input);
        }
    }

    #[test]
    fn test_broken_import_does_not_swallow_next_statement() {
        let summary = scan("import { a, from\nexport const Button = 1;");
        assert_eq!(summary.value_export_names(), vec!["Button"]);
    }

    #[test]
    fn test_property_named_import_ignored() {
        let summary = scan("config.export = 1; loader.import(\"x\");");
        assert!(summary.imports.is_empty());
        assert!(summary.exports.is_empty());
    }
}
