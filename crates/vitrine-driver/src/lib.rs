//! Vitrine Driver Library
//!
//! Configuration, fixture loading and source diagnostics behind the
//! `vitrine` command line tool.

pub mod config;
pub mod diagnostics;
pub mod fixture;

pub use config::{ConfigError, StoreKind, VitrineConfig};
pub use diagnostics::{check_sources, Diagnostic, Severity, SourceFile};
pub use fixture::{Fixture, FixtureError};
