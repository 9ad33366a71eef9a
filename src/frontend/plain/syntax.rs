//! Plain syntax: tokens, tree, parser and writer
//!
//! The language is line oriented. Each line holds zero or more statements
//! separated by `;`, and `#` starts a comment that runs to the end of the line.
//!
//! ```text
//! import "./side-effect"
//! import a, b from "./lib"
//! export answer = a + 40        # modules only
//! let greeting = "hi " + b
//! throw "boom"
//! greeting                      # completion value
//! ```
//!
//! Transformed programs use two further forms that only the executable goal
//! accepts: `@"addr".name` reads a published binding, and `publish "addr" name`
//! publishes one.

use std::fmt;

use crate::frontend::module::{SourceFile, UnitKind};
use crate::util::diagnostic::{Diagnostic, DiagnosticCode, Reporter};

/// Keywords that cannot be used as binding names
const KEYWORDS: [&str; 6] = ["import", "from", "export", "let", "throw", "publish"];

/// Token kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Ident(String),
    Int(i64),
    Str(String),
    Eq,
    Plus,
    Comma,
    At,
    Dot,
    Semi,
}

impl fmt::Display for Token {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Token::Ident(name) => write!(f, "'{}'", name),
            Token::Int(value) => write!(f, "'{}'", value),
            Token::Str(value) => write!(f, "string {:?}", value),
            Token::Eq => write!(f, "'='"),
            Token::Plus => write!(f, "'+'"),
            Token::Comma => write!(f, "','"),
            Token::At => write!(f, "'@'"),
            Token::Dot => write!(f, "'.'"),
            Token::Semi => write!(f, "';'"),
        }
    }
}

fn is_identifier_start(c: char) -> bool {
    c == '_' || c == '$' || unicode_ident::is_xid_start(c)
}

fn is_identifier_char(c: char) -> bool {
    c == '$' || unicode_ident::is_xid_continue(c)
}

/// Tokenize one line
pub fn tokenize_line(line: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\r' => {
                chars.next();
            }
            '#' => break,
            '=' => {
                chars.next();
                tokens.push(Token::Eq);
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '@' => {
                chars.next();
                tokens.push(Token::At);
            }
            '.' => {
                chars.next();
                tokens.push(Token::Dot);
            }
            ';' => {
                chars.next();
                tokens.push(Token::Semi);
            }
            '"' => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some('n') => value.push('\n'),
                            Some('t') => value.push('\t'),
                            Some('"') => value.push('"'),
                            Some('\\') => value.push('\\'),
                            Some(other) => return Err(format!("invalid escape '\\{}'", other)),
                            None => return Err("unterminated string".to_string()),
                        },
                        Some(other) => value.push(other),
                        None => return Err("unterminated string".to_string()),
                    }
                }
                tokens.push(Token::Str(value));
            }
            c if c.is_ascii_digit() => {
                let mut digits = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '_' {
                        if d != '_' {
                            digits.push(d);
                        }
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = digits
                    .parse::<i64>()
                    .map_err(|_| format!("integer literal '{}' is out of range", digits))?;
                tokens.push(Token::Int(value));
            }
            c if is_identifier_start(c) => {
                let mut name = String::new();
                while let Some(&d) = chars.peek() {
                    if is_identifier_char(d) {
                        name.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(name));
            }
            other => return Err(format!("unexpected character '{}'", other)),
        }
    }
    Ok(tokens)
}

/// Expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Int(i64),
    Str(String),
    Name(String),
    /// Binding published by another unit
    ModuleRef { address: String, name: String },
    Add(Box<Expr>, Box<Expr>),
}

/// Statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    /// `import "spec"` when `names` is empty, otherwise `import a, b from "spec"`
    Import { names: Vec<String>, specifier: String },
    Export { name: String, value: Expr },
    Let { name: String, value: Expr },
    Publish { address: String, name: String },
    Throw(Expr),
    Expr(Expr),
}

/// A statement with its 1-based source line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub number: usize,
    pub stmt: Stmt,
}

/// Parse tree of one unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub kind: UnitKind,
    pub lines: Vec<Line>,
}

impl Program {
    pub fn new(kind: UnitKind) -> Self {
        Self {
            kind,
            lines: Vec::new(),
        }
    }

    /// Import specifiers in declaration order
    pub fn specifiers(&self) -> Vec<String> {
        self.lines
            .iter()
            .filter_map(|line| match &line.stmt {
                Stmt::Import { specifier, .. } => Some(specifier.clone()),
                _ => None,
            })
            .collect()
    }

    /// Exported names in declaration order
    pub fn exports(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.lines.iter().filter_map(|line| match &line.stmt {
            Stmt::Export { name, .. } => Some((line.number, name.as_str())),
            _ => None,
        })
    }
}

/// What the parser accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Goal {
    Script,
    Module,
    /// Output of the transformer
    Executable,
}

impl From<UnitKind> for Goal {
    fn from(kind: UnitKind) -> Self {
        match kind {
            UnitKind::Script => Goal::Script,
            UnitKind::Module => Goal::Module,
        }
    }
}

/// A syntax error on one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for SyntaxError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// Parse a whole source text
///
/// Lines with errors are skipped and parsing resumes on the next line.
pub fn parse_program(
    source: &str,
    kind: UnitKind,
    goal: Goal,
) -> (Program, Vec<SyntaxError>) {
    let mut program = Program::new(kind);
    let mut errors = Vec::new();

    for (index, text) in source.lines().enumerate() {
        let number = index + 1;
        let result = tokenize_line(text).and_then(|tokens| parse_line(&tokens, goal));
        match result {
            Ok(statements) => program
                .lines
                .extend(statements.into_iter().map(|stmt| Line { number, stmt })),
            Err(message) => errors.push(SyntaxError {
                line: number,
                message,
            }),
        }
    }
    (program, errors)
}

/// Parse a source file, reporting every syntax error as a diagnostic
pub fn parse_source(
    source: &SourceFile,
    kind: UnitKind,
    reporter: &Reporter,
) -> Program {
    let (program, errors) = parse_program(&source.contents, kind, Goal::from(kind));
    for error in errors {
        reporter.report(
            Diagnostic::error(DiagnosticCode::Parse, error.message)
                .at(&source.name)
                .on_line(error.line),
        );
    }
    program
}

fn parse_line(
    tokens: &[Token],
    goal: Goal,
) -> Result<Vec<Stmt>, String> {
    tokens
        .split(|token| *token == Token::Semi)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut parser = Parser {
                tokens: part,
                pos: 0,
                goal,
            };
            let stmt = parser.statement()?;
            match parser.peek() {
                Some(token) => Err(format!("unexpected {} after statement", token)),
                None => Ok(stmt),
            }
        })
        .collect()
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    goal: Goal,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn peek_keyword(&self) -> Option<&'a str> {
        match self.peek() {
            Some(Token::Ident(name)) if KEYWORDS.contains(&name.as_str()) => Some(name.as_str()),
            _ => None,
        }
    }

    fn expect(
        &mut self,
        expected: Token,
    ) -> Result<(), String> {
        match self.next() {
            Some(token) if *token == expected => Ok(()),
            Some(token) => Err(format!("expected {}, found {}", expected, token)),
            None => Err(format!("expected {}, found end of line", expected)),
        }
    }

    fn expect_keyword(
        &mut self,
        keyword: &str,
    ) -> Result<(), String> {
        match self.next() {
            Some(Token::Ident(name)) if name == keyword => Ok(()),
            Some(token) => Err(format!("expected '{}', found {}", keyword, token)),
            None => Err(format!("expected '{}', found end of line", keyword)),
        }
    }

    fn name(&mut self) -> Result<String, String> {
        match self.next() {
            Some(Token::Ident(name)) if KEYWORDS.contains(&name.as_str()) => {
                Err(format!("'{}' is a reserved word", name))
            }
            Some(Token::Ident(name)) => Ok(name.clone()),
            Some(token) => Err(format!("expected a name, found {}", token)),
            None => Err("expected a name, found end of line".to_string()),
        }
    }

    fn string(&mut self) -> Result<String, String> {
        match self.next() {
            Some(Token::Str(value)) => Ok(value.clone()),
            Some(token) => Err(format!("expected a string, found {}", token)),
            None => Err("expected a string, found end of line".to_string()),
        }
    }

    fn statement(&mut self) -> Result<Stmt, String> {
        match self.peek_keyword() {
            Some("import") => {
                if self.goal == Goal::Executable {
                    return Err("'import' is not allowed in executable code".to_string());
                }
                self.pos += 1;
                self.import()
            }
            Some("export") => {
                if self.goal != Goal::Module {
                    return Err("'export' is only allowed in modules".to_string());
                }
                self.pos += 1;
                let name = self.name()?;
                self.expect(Token::Eq)?;
                let value = self.expression()?;
                Ok(Stmt::Export { name, value })
            }
            Some("let") => {
                self.pos += 1;
                let name = self.name()?;
                self.expect(Token::Eq)?;
                let value = self.expression()?;
                Ok(Stmt::Let { name, value })
            }
            Some("throw") => {
                self.pos += 1;
                Ok(Stmt::Throw(self.expression()?))
            }
            Some("publish") => {
                if self.goal != Goal::Executable {
                    return Err("'publish' is reserved".to_string());
                }
                self.pos += 1;
                let address = self.string()?;
                let name = self.name()?;
                Ok(Stmt::Publish { address, name })
            }
            Some(other) => Err(format!("unexpected '{}'", other)),
            None => Ok(Stmt::Expr(self.expression()?)),
        }
    }

    fn import(&mut self) -> Result<Stmt, String> {
        if let Some(Token::Str(_)) = self.peek() {
            let specifier = self.string()?;
            return Ok(Stmt::Import {
                names: Vec::new(),
                specifier,
            });
        }

        let mut names = vec![self.name()?];
        while self.peek() == Some(&Token::Comma) {
            self.pos += 1;
            names.push(self.name()?);
        }
        self.expect_keyword("from")?;
        let specifier = self.string()?;
        Ok(Stmt::Import { names, specifier })
    }

    fn expression(&mut self) -> Result<Expr, String> {
        let mut left = self.term()?;
        while self.peek() == Some(&Token::Plus) {
            self.pos += 1;
            let right = self.term()?;
            left = Expr::Add(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Expr, String> {
        match self.peek() {
            Some(Token::Int(value)) => {
                self.pos += 1;
                Ok(Expr::Int(*value))
            }
            Some(Token::Str(value)) => {
                self.pos += 1;
                Ok(Expr::Str(value.clone()))
            }
            Some(Token::Ident(_)) => Ok(Expr::Name(self.name()?)),
            Some(Token::At) if self.goal == Goal::Executable => {
                self.pos += 1;
                let address = self.string()?;
                self.expect(Token::Dot)?;
                let name = self.name()?;
                Ok(Expr::ModuleRef { address, name })
            }
            Some(token) => Err(format!("unexpected {}", token)),
            None => Err("expected an expression, found end of line".to_string()),
        }
    }
}

fn write_string(
    out: &mut String,
    value: &str,
) {
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
}

fn write_expr(
    out: &mut String,
    expr: &Expr,
) {
    match expr {
        Expr::Int(value) => out.push_str(&value.to_string()),
        Expr::Str(value) => write_string(out, value),
        Expr::Name(name) => out.push_str(name),
        Expr::ModuleRef { address, name } => {
            out.push('@');
            write_string(out, address);
            out.push('.');
            out.push_str(name);
        }
        Expr::Add(left, right) => {
            write_expr(out, left);
            out.push_str(" + ");
            write_expr(out, right);
        }
    }
}

/// Render one statement
pub fn write_stmt(
    out: &mut String,
    stmt: &Stmt,
) {
    match stmt {
        Stmt::Import { names, specifier } => {
            out.push_str("import ");
            if !names.is_empty() {
                out.push_str(&names.join(", "));
                out.push_str(" from ");
            }
            write_string(out, specifier);
        }
        Stmt::Export { name, value } => {
            out.push_str("export ");
            out.push_str(name);
            out.push_str(" = ");
            write_expr(out, value);
        }
        Stmt::Let { name, value } => {
            out.push_str("let ");
            out.push_str(name);
            out.push_str(" = ");
            write_expr(out, value);
        }
        Stmt::Publish { address, name } => {
            out.push_str("publish ");
            write_string(out, address);
            out.push(' ');
            out.push_str(name);
        }
        Stmt::Throw(value) => {
            out.push_str("throw ");
            write_expr(out, value);
        }
        Stmt::Expr(value) => write_expr(out, value),
    }
}

/// Render a program, one statement per line
pub fn write_program(program: &Program) -> String {
    let mut out = String::new();
    for line in &program.lines {
        write_stmt(&mut out, &line.stmt);
        out.push('\n');
    }
    out
}
