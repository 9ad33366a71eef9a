//! Recording collaborators shared by the integration tests
//!
//! Each wrapper delegates to the plain implementation and appends what it
//! saw to a shared journal.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use codeloader::frontend::module::{MemoryFetcher, Project, SourceFile, UnitKind};
use codeloader::frontend::plain::{
    Plain, PlainAnalyzer, PlainExecutor, PlainGrammar, PlainSpecifiers, PlainTransformer,
    PlainWriter, Program, Value,
};
use codeloader::frontend::toolchain::{
    AnalysisTarget, Analyzer, Executor, Grammar, Namespace, Toolchain, TransformContext,
    Transformer,
};
use codeloader::util::diagnostic::Reporter;

/// One collaborator call
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Parse(String),
    Analyze(Vec<String>),
    Transform(String),
    Execute(Value),
}

pub type Journal = Rc<RefCell<Vec<Event>>>;

pub fn journal() -> Journal {
    Rc::new(RefCell::new(Vec::new()))
}

/// Parsed addresses in call order
pub fn parses(journal: &Journal) -> Vec<String> {
    journal
        .borrow()
        .iter()
        .filter_map(|e| match e {
            Event::Parse(address) => Some(address.clone()),
            _ => None,
        })
        .collect()
}

pub fn analyses(journal: &Journal) -> Vec<Vec<String>> {
    journal
        .borrow()
        .iter()
        .filter_map(|e| match e {
            Event::Analyze(addresses) => Some(addresses.clone()),
            _ => None,
        })
        .collect()
}

pub fn transforms(journal: &Journal) -> Vec<String> {
    journal
        .borrow()
        .iter()
        .filter_map(|e| match e {
            Event::Transform(address) => Some(address.clone()),
            _ => None,
        })
        .collect()
}

pub fn executions(journal: &Journal) -> Vec<Value> {
    journal
        .borrow()
        .iter()
        .filter_map(|e| match e {
            Event::Execute(value) => Some(value.clone()),
            _ => None,
        })
        .collect()
}

struct RecordingGrammar(Journal);

impl Grammar<Plain> for RecordingGrammar {
    fn parse(
        &self,
        source: &SourceFile,
        kind: UnitKind,
        reporter: &Reporter,
    ) -> Program {
        self.0.borrow_mut().push(Event::Parse(source.name.clone()));
        PlainGrammar.parse(source, kind, reporter)
    }
}

struct RecordingAnalyzer(Journal);

impl Analyzer<Plain> for RecordingAnalyzer {
    fn analyze_trees(
        &self,
        targets: &[AnalysisTarget<'_, Plain>],
        project: &mut Project,
        reporter: &Reporter,
    ) {
        let addresses = targets.iter().map(|t| t.address.to_string()).collect();
        self.0.borrow_mut().push(Event::Analyze(addresses));
        PlainAnalyzer.analyze_trees(targets, project, reporter);
    }
}

struct RecordingTransformer(Journal);

impl Transformer<Plain> for RecordingTransformer {
    fn transform(
        &self,
        tree: &Program,
        context: &TransformContext<'_>,
        reporter: &Reporter,
    ) -> Program {
        self.0
            .borrow_mut()
            .push(Event::Transform(context.address.to_string()));
        PlainTransformer.transform(tree, context, reporter)
    }
}

struct RecordingExecutor(Journal);

impl Executor<Plain> for RecordingExecutor {
    fn execute(
        &self,
        code: &str,
        namespace: &mut Namespace<Value>,
    ) -> Result<Value, String> {
        let result = PlainExecutor.execute(code, namespace);
        if let Ok(value) = &result {
            self.0.borrow_mut().push(Event::Execute(value.clone()));
        }
        result
    }
}

/// Plain toolchain whose calls land in `journal`
pub fn recording_toolchain(journal: &Journal) -> Toolchain<Plain> {
    Toolchain::new(
        RecordingGrammar(Rc::clone(journal)),
        PlainSpecifiers,
        RecordingAnalyzer(Rc::clone(journal)),
        RecordingTransformer(Rc::clone(journal)),
        PlainWriter,
        RecordingExecutor(Rc::clone(journal)),
    )
}

/// The four-unit diamond: main imports a and b, both import c
///
/// Every unit ends with a string naming itself so executions can be told apart.
pub fn diamond() -> MemoryFetcher {
    MemoryFetcher::new()
        .with_source(
            "/main",
            "import x from \"/a\"\nimport y from \"/b\"\nx + y + \"MAIN\"",
        )
        .with_source("/a", "import v from \"/c\"\nexport x = v + 1\n\"A\"")
        .with_source("/b", "import v from \"/c\"\nexport y = v + 2\n\"B\"")
        .with_source("/c", "export v = 10\n\"C\"")
}
