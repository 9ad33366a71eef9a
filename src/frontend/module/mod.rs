//! 模块加载系统
//!
//! 加载相互依赖的源单元（脚本与模块），解析导入图，驱动它们依次经过
//! 解析 → 分析 → 转换 → 执行，并把结果或失败交付给调用方。
//!
//! # 模块结构
//!
//! - [`unit`] - 编译单元状态机
//! - [`cache`] - 单元缓存（按地址与种类去重）
//! - [`resolver`] - 地址解析
//! - [`fetch`] - 源文本获取
//! - [`registry`] - 全图项目上下文与模块符号
//! - [`loader`] - 顶层编排：依赖发现、屏障、整体中止、执行
//!
//! # 设计目标
//!
//! 1. 同一会话内 `(地址, 种类)` 只对应一个单元，只获取一次
//! 2. 所有单元共享一个完成屏障，批量分析、转换、执行
//! 3. 任何失败都中止整个批次，不做部分成功，也不重试

pub mod cache;
pub mod fetch;
pub mod loader;
pub mod registry;
pub mod resolver;
pub mod unit;

#[cfg(test)]
mod tests;

pub use cache::{CacheStats, UnitCache, UnitId, UnitKey};
pub use fetch::{
    FetchCompletion, FetchError, FetchHandle, FetchResponder, Fetcher, FileFetcher, MemoryFetcher,
};
pub use loader::{Loader, LoaderBuilder, LoaderStats, TranslateHook, WeakLoader};
pub use registry::{ModuleSymbol, Project, SourceFile};
pub use resolver::{AddressResolver, PathResolver};
pub use unit::{ListenerPair, Outcome, Unit, UnitKind, UnitOrigin, UnitState};

use crate::frontend::pipeline::Phase;

/// 交付给监听者的加载错误
///
/// 错误会交付给批次内每个受影响单元的监听者，而不只是出错的那个单元。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// 获取失败
    #[error("failed to load '{address}': {reason}")]
    Fetch { address: String, reason: String },

    /// 语法错误
    #[error("parse error in '{address}': {message}")]
    Parse { address: String, message: String },

    /// 跨模块绑定无法解析或非法
    #[error("analysis of '{address}' failed: {message}")]
    Analysis { address: String, message: String },

    /// 转换失败
    #[error("transform of '{address}' failed: {message}")]
    Transform { address: String, message: String },

    /// 执行时抛出
    #[error("evaluation of '{address}' threw: {message}")]
    Execution { address: String, message: String },

    /// 依赖的单元已经失败
    #[error("'{address}' depends on failed unit '{dependency}'")]
    Dependency { address: String, dependency: String },

    /// 因同批次中其他单元失败而被中止
    #[error("'{address}' aborted: {cause}")]
    Aborted {
        address: String,
        cause: Box<LoadError>,
    },
}

impl LoadError {
    /// 按阶段构造错误
    pub fn for_phase(
        phase: Phase,
        address: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let address = address.into();
        let message = message.into();
        match phase {
            Phase::Fetch => LoadError::Fetch {
                address,
                reason: message,
            },
            Phase::Parse => LoadError::Parse { address, message },
            Phase::Analyze => LoadError::Analysis { address, message },
            Phase::Transform => LoadError::Transform { address, message },
            Phase::Evaluate => LoadError::Execution { address, message },
        }
    }

    /// 错误所属单元的地址
    pub fn address(&self) -> &str {
        match self {
            LoadError::Fetch { address, .. }
            | LoadError::Parse { address, .. }
            | LoadError::Analysis { address, .. }
            | LoadError::Transform { address, .. }
            | LoadError::Execution { address, .. }
            | LoadError::Dependency { address, .. }
            | LoadError::Aborted { address, .. } => address,
        }
    }

    /// 沿中止链找到最初的错误
    pub fn root_cause(&self) -> &LoadError {
        let mut current = self;
        while let LoadError::Aborted { cause, .. } = current {
            current = cause;
        }
        current
    }

    /// 是否因其他单元失败而中止
    pub fn is_aborted(&self) -> bool {
        matches!(self, LoadError::Aborted { .. })
    }
}

/// 加载器 API 误用或请求无法完成
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoaderError {
    /// 状态回退
    #[error("invalid state change for '{address}': {from} -> {to}")]
    InvalidTransition {
        address: String,
        from: UnitState,
        to: UnitState,
    },

    /// 单元已完成或已失败，不能再注册监听者
    #[error("'{address}' is already settled")]
    AlreadySettled { address: String },

    /// 依赖列表只能设置一次
    #[error("dependencies of '{address}' are already fixed")]
    DependenciesFrozen { address: String },

    /// 同步求值时仍有未加载的外部模块
    #[error("'{address}' has unresolved module references: {}", pending.join(", "))]
    Unresolved {
        address: String,
        pending: Vec<String>,
    },

    /// 单元加载失败
    #[error(transparent)]
    Failed(#[from] LoadError),

    /// 未知单元
    #[error("unknown unit {0}")]
    UnknownUnit(UnitId),

    /// 选择了共享命名空间却没有提供
    #[error("shared namespace scope selected but no namespace was supplied")]
    MissingNamespace,
}
