//! 统一诊断系统
//!
//! 会话内共享的诊断收集器。获取、解析、分析、转换、执行各阶段产生的诊断
//! 都汇入同一个 [`Reporter`]，流水线通过检查点判断"本阶段是否出错"。
//!
//! # 示例
//!
//! ```
//! use codeloader::util::diagnostic::{Diagnostic, DiagnosticCode, Reporter};
//!
//! let reporter = Reporter::new();
//! let checkpoint = reporter.checkpoint();
//! reporter.report(Diagnostic::error(DiagnosticCode::Parse, "unexpected token").at("/main"));
//! assert!(reporter.had_error_since(checkpoint));
//! ```

use std::fmt;

use parking_lot::RwLock;

/// 诊断严重级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    /// 检查是否为错误级别
    pub fn is_error(&self) -> bool {
        matches!(self, Severity::Error)
    }
}

impl fmt::Display for Severity {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// 诊断码，按流水线阶段划分
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    /// 获取源文本失败
    Fetch,
    /// 语法错误
    Parse,
    /// 跨模块绑定无法解析
    Analysis,
    /// 转换失败
    Transform,
    /// 执行时抛出
    Execution,
}

impl DiagnosticCode {
    /// 错误码字符串
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::Fetch => "E0100",
            DiagnosticCode::Parse => "E0200",
            DiagnosticCode::Analysis => "E0300",
            DiagnosticCode::Transform => "E0400",
            DiagnosticCode::Execution => "E0500",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 诊断信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 严重级别
    pub severity: Severity,
    /// 错误码
    pub code: DiagnosticCode,
    /// 产生诊断的单元地址
    pub address: Option<String>,
    /// 行号（从 1 开始）
    pub line: Option<usize>,
    /// 消息
    pub message: String,
}

impl Diagnostic {
    /// 创建错误诊断
    pub fn error(
        code: DiagnosticCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Error,
            code,
            address: None,
            line: None,
            message: message.into(),
        }
    }

    /// 创建警告诊断
    pub fn warning(
        code: DiagnosticCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(code, message)
        }
    }

    /// 附加单元地址
    pub fn at(
        mut self,
        address: impl Into<String>,
    ) -> Self {
        self.address = Some(address.into());
        self
    }

    /// 附加行号
    pub fn on_line(
        mut self,
        line: usize,
    ) -> Self {
        self.line = Some(line);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}[{}]: ", self.severity, self.code)?;
        match (&self.address, self.line) {
            (Some(address), Some(line)) => write!(f, "{}:{}: ", address, line)?,
            (Some(address), None) => write!(f, "{}: ", address)?,
            _ => {}
        }
        f.write_str(&self.message)
    }
}

/// 诊断检查点
///
/// 记录某一时刻已收集的诊断数量，用于判断之后是否新增了错误。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Checkpoint(usize);

/// 诊断报告器
///
/// 同一加载会话内的所有协作者共享一个实例。只追加，不清除。
#[derive(Debug, Default)]
pub struct Reporter {
    diagnostics: RwLock<Vec<Diagnostic>>,
}

impl Reporter {
    /// 创建空报告器
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一条诊断
    pub fn report(
        &self,
        diagnostic: Diagnostic,
    ) {
        tracing::debug!("{}", diagnostic);
        self.diagnostics.write().push(diagnostic);
    }

    /// 记录一条错误
    pub fn report_error(
        &self,
        code: DiagnosticCode,
        address: &str,
        message: impl Into<String>,
    ) {
        self.report(Diagnostic::error(code, message).at(address));
    }

    /// 当前检查点
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.diagnostics.read().len())
    }

    /// 是否记录过任何错误
    pub fn had_error(&self) -> bool {
        self.diagnostics.read().iter().any(|d| d.severity.is_error())
    }

    /// 检查点之后是否记录过错误
    pub fn had_error_since(
        &self,
        checkpoint: Checkpoint,
    ) -> bool {
        self.diagnostics
            .read()
            .iter()
            .skip(checkpoint.0)
            .any(|d| d.severity.is_error())
    }

    /// 检查点之后记录的错误
    pub fn errors_since(
        &self,
        checkpoint: Checkpoint,
    ) -> Vec<Diagnostic> {
        self.diagnostics
            .read()
            .iter()
            .skip(checkpoint.0)
            .filter(|d| d.severity.is_error())
            .cloned()
            .collect()
    }

    /// 错误数量
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .read()
            .iter()
            .filter(|d| d.severity.is_error())
            .count()
    }

    /// 所有诊断的快照
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_scopes_errors() {
        let reporter = Reporter::new();
        reporter.report_error(DiagnosticCode::Parse, "/a", "bad token");

        let cp = reporter.checkpoint();
        assert!(reporter.had_error());
        assert!(!reporter.had_error_since(cp));

        reporter.report(Diagnostic::warning(DiagnosticCode::Analysis, "unused import"));
        assert!(!reporter.had_error_since(cp));

        reporter.report_error(DiagnosticCode::Analysis, "/b", "missing export");
        assert!(reporter.had_error_since(cp));
        let errors = reporter.errors_since(cp);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].address.as_deref(), Some("/b"));
        assert_eq!(reporter.error_count(), 2);
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::error(DiagnosticCode::Parse, "unterminated string literal")
            .at("/main")
            .on_line(3);
        assert_eq!(
            diag.to_string(),
            "error[E0200]: /main:3: unterminated string literal"
        );

        let bare = Diagnostic::warning(DiagnosticCode::Fetch, "slow");
        assert_eq!(bare.to_string(), "warning[E0100]: slow");
    }
}
