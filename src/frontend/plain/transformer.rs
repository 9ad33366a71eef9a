//! Rewrites module syntax into executable statements
//!
//! | Source | Executable |
//! |--------|------------|
//! | `import "spec"` | removed |
//! | `import a from "spec"` | `let a = @"addr".a` |
//! | `export a = e` | `let a = e` then `publish "addr" a` |
//!
//! `addr` is the import specifier resolved against the unit's address, or the
//! unit's own address for exports.

use crate::frontend::toolchain::{TransformContext, Transformer};
use crate::util::diagnostic::{Diagnostic, DiagnosticCode, Reporter};

use super::syntax::{Expr, Line, Program, Stmt};
use super::Plain;

#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTransformer;

impl Transformer<Plain> for PlainTransformer {
    fn transform(
        &self,
        tree: &Program,
        context: &TransformContext<'_>,
        reporter: &Reporter,
    ) -> Program {
        let mut output = Program::new(tree.kind);

        for line in &tree.lines {
            let number = line.number;
            match &line.stmt {
                Stmt::Import { names, specifier } => {
                    if names.is_empty() {
                        continue;
                    }
                    let address = context.project.resolve(specifier, context.address);
                    if !context.project.has_module(&address) {
                        reporter.report(
                            Diagnostic::error(
                                DiagnosticCode::Transform,
                                format!("module '{}' is not loaded", address),
                            )
                            .at(context.address)
                            .on_line(number),
                        );
                        continue;
                    }
                    for name in names {
                        output.lines.push(Line {
                            number,
                            stmt: Stmt::Let {
                                name: name.clone(),
                                value: Expr::ModuleRef {
                                    address: address.clone(),
                                    name: name.clone(),
                                },
                            },
                        });
                    }
                }
                Stmt::Export { name, value } => {
                    output.lines.push(Line {
                        number,
                        stmt: Stmt::Let {
                            name: name.clone(),
                            value: value.clone(),
                        },
                    });
                    output.lines.push(Line {
                        number,
                        stmt: Stmt::Publish {
                            address: context.address.to_string(),
                            name: name.clone(),
                        },
                    });
                }
                other => output.lines.push(Line {
                    number,
                    stmt: other.clone(),
                }),
            }
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::module::{PathResolver, Project, UnitKind};
    use crate::frontend::plain::syntax::{parse_program, write_program, Goal};

    #[test]
    fn test_rewrites_imports_and_exports() {
        let (tree, errors) = parse_program(
            "import \"./side\"\nimport v from \"../c\"\nexport w = v + 1\nw",
            UnitKind::Module,
            Goal::Module,
        );
        assert!(errors.is_empty());

        let mut project = Project::new("/", Box::new(PathResolver::new()));
        project.add_external_module("/c");
        let reporter = Reporter::new();
        let context = TransformContext {
            address: "/lib/a",
            kind: UnitKind::Module,
            project: &project,
        };

        let output = PlainTransformer.transform(&tree, &context, &reporter);
        assert!(!reporter.had_error());
        assert_eq!(
            write_program(&output),
            "let v = @\"/c\".v\nlet w = v + 1\npublish \"/lib/a\" w\nw\n"
        );
    }

    #[test]
    fn test_unknown_module_is_reported() {
        let (tree, _) = parse_program("import v from \"/nowhere\"", UnitKind::Script, Goal::Script);
        let project = Project::new("/", Box::new(PathResolver::new()));
        let reporter = Reporter::new();
        let context = TransformContext {
            address: "/main",
            kind: UnitKind::Script,
            project: &project,
        };

        PlainTransformer.transform(&tree, &context, &reporter);
        assert_eq!(reporter.error_count(), 1);
    }
}
