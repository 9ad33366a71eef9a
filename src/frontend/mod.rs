//! Frontend compilation pipeline
//!
//! This module contains the loader orchestration core and the collaborators it drives.
//! Units are fetched, parsed, analyzed as a whole graph, transformed and executed.

pub mod compiler;
pub mod module;
pub mod pipeline;
pub mod plain;
pub mod toolchain;

pub use compiler::Compiler;
pub use pipeline::{Phase, PhaseStats};
pub use toolchain::{
    AnalysisTarget, Analyzer, Executor, Grammar, Language, Namespace, Serializer, SharedNamespace,
    SpecifierVisitor, Toolchain, TransformContext, Transformer,
};
