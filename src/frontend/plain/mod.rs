//! Plain: a small reference language for the loader
//!
//! Implements every collaborator the loader needs, so the crate can load and
//! run real source graphs from the CLI, tests and benches. See [`syntax`] for
//! the grammar.

pub mod analyzer;
pub mod executor;
pub mod syntax;
pub mod transformer;

use std::fmt;

use crate::frontend::module::{SourceFile, UnitKind};
use crate::frontend::toolchain::{Grammar, Language, Serializer, SpecifierVisitor, Toolchain};
use crate::util::diagnostic::Reporter;

pub use analyzer::PlainAnalyzer;
pub use executor::PlainExecutor;
pub use syntax::Program;
pub use transformer::PlainTransformer;

/// The plain language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Plain;

impl Language for Plain {
    type Tree = Program;
    type Value = Value;
}

/// Runtime value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Unit,
    Int(i64),
    Str(String),
}

impl fmt::Display for Value {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Int(value) => write!(f, "{}", value),
            Value::Str(value) => write!(f, "{}", value),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlainGrammar;

impl Grammar<Plain> for PlainGrammar {
    fn parse(
        &self,
        source: &SourceFile,
        kind: UnitKind,
        reporter: &Reporter,
    ) -> Program {
        syntax::parse_source(source, kind, reporter)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlainSpecifiers;

impl SpecifierVisitor<Plain> for PlainSpecifiers {
    fn module_specifiers(
        &self,
        tree: &Program,
    ) -> Vec<String> {
        tree.specifiers()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlainWriter;

impl Serializer<Plain> for PlainWriter {
    fn write(
        &self,
        tree: &Program,
    ) -> String {
        syntax::write_program(tree)
    }
}

/// All plain collaborators
pub fn toolchain() -> Toolchain<Plain> {
    Toolchain::new(
        PlainGrammar,
        PlainSpecifiers,
        PlainAnalyzer,
        PlainTransformer,
        PlainWriter,
        PlainExecutor,
    )
}
