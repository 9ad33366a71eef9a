//! Tree-walking interpreter for executable plain code
//!
//! Published bindings live in the shared namespace under `addr::name`, next
//! to ordinary globals.

use crate::frontend::toolchain::{Executor, Namespace};
use crate::frontend::module::UnitKind;

use super::syntax::{parse_program, Expr, Goal, Stmt};
use super::{Plain, Value};

/// Namespace key of a binding published by `address`
pub fn published_key(
    address: &str,
    name: &str,
) -> String {
    format!("{}::{}", address, name)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlainExecutor;

impl PlainExecutor {
    fn eval(
        expr: &Expr,
        namespace: &Namespace<Value>,
    ) -> Result<Value, String> {
        match expr {
            Expr::Int(value) => Ok(Value::Int(*value)),
            Expr::Str(value) => Ok(Value::Str(value.clone())),
            Expr::Name(name) => namespace
                .get(name)
                .cloned()
                .ok_or_else(|| format!("'{}' is not defined", name)),
            Expr::ModuleRef { address, name } => namespace
                .get(&published_key(address, name))
                .cloned()
                .ok_or_else(|| format!("'{}' has not published '{}'", address, name)),
            Expr::Add(left, right) => {
                let left = Self::eval(left, namespace)?;
                let right = Self::eval(right, namespace)?;
                match (left, right) {
                    (Value::Int(a), Value::Int(b)) => a
                        .checked_add(b)
                        .map(Value::Int)
                        .ok_or_else(|| format!("integer overflow in {} + {}", a, b)),
                    (Value::Unit, _) | (_, Value::Unit) => Err("cannot add '()'".to_string()),
                    (a, b) => Ok(Value::Str(format!("{}{}", a, b))),
                }
            }
        }
    }
}

impl Executor<Plain> for PlainExecutor {
    fn exported_value(
        &self,
        address: &str,
        name: &str,
        namespace: &Namespace<Value>,
    ) -> Option<Value> {
        namespace.get(&published_key(address, name)).cloned()
    }

    fn execute(
        &self,
        code: &str,
        namespace: &mut Namespace<Value>,
    ) -> Result<Value, String> {
        let (program, errors) = parse_program(code, UnitKind::Script, Goal::Executable);
        if let Some(error) = errors.first() {
            return Err(format!("malformed executable code: {}", error));
        }

        let mut completion = Value::Unit;
        for line in &program.lines {
            match &line.stmt {
                Stmt::Let { name, value } => {
                    let value = Self::eval(value, namespace)?;
                    namespace.define(name.clone(), value);
                }
                Stmt::Publish { address, name } => {
                    let value = namespace
                        .get(name)
                        .cloned()
                        .ok_or_else(|| format!("'{}' is not defined", name))?;
                    namespace.define(published_key(address, name), value);
                }
                Stmt::Throw(value) => {
                    let value = Self::eval(value, namespace)?;
                    return Err(format!("uncaught {}", value));
                }
                Stmt::Expr(value) => completion = Self::eval(value, namespace)?,
                Stmt::Import { .. } | Stmt::Export { .. } => {
                    return Err(format!("line {}: module syntax in executable code", line.number));
                }
            }
        }
        Ok(completion)
    }
}
