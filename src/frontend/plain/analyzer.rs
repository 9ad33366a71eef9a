//! Whole-graph analysis for plain programs
//!
//! Runs in two passes over the batch: first every module's exports are
//! recorded on its symbol, then every named import is checked against the
//! symbol of the module it resolves to. Modules completed in earlier batches
//! keep their symbols in the project, so later batches can import from them.

use crate::frontend::module::{Project, UnitKind};
use crate::frontend::toolchain::{AnalysisTarget, Analyzer};
use crate::util::diagnostic::{Diagnostic, DiagnosticCode, Reporter};

use super::syntax::Stmt;
use super::Plain;

#[derive(Debug, Clone, Copy, Default)]
pub struct PlainAnalyzer;

impl Analyzer<Plain> for PlainAnalyzer {
    fn analyze_trees(
        &self,
        targets: &[AnalysisTarget<'_, Plain>],
        project: &mut Project,
        reporter: &Reporter,
    ) {
        for target in targets {
            let symbol = project.add_external_module(target.address);
            if target.kind != UnitKind::Module {
                continue;
            }
            for (line, name) in target.tree.exports() {
                if !symbol.add_export(name) {
                    reporter.report(
                        Diagnostic::error(
                            DiagnosticCode::Analysis,
                            format!("duplicate export '{}'", name),
                        )
                        .at(target.address)
                        .on_line(line),
                    );
                }
            }
        }

        for target in targets {
            for line in &target.tree.lines {
                let Stmt::Import { names, specifier } = &line.stmt else {
                    continue;
                };
                let resolved = project.resolve(specifier, target.address);
                for name in names {
                    if let Err(message) = project.resolve_export(&resolved, name) {
                        reporter.report(
                            Diagnostic::error(DiagnosticCode::Analysis, message)
                                .at(target.address)
                                .on_line(line.number),
                        );
                    }
                }
            }
        }
    }
}
