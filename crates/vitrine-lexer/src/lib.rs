//! # Vitrine Lexer
//!
//! Tolerant tokenizer for component and demo source files (TSX, JSX, TS, JS).
//! Only module-level structure is modelled; everything else is punctuation.

pub mod token;
pub mod lexer;

pub use token::{Span, Token, TokenKind};
pub use lexer::Lexer;
