//! 编译单元状态机
//!
//! 一个单元代表一个源产物（按地址获取，或内联提供），沿固定生命周期前进：
//!
//! ```text
//! NotStarted → Loading → Loaded → Parsed → Transformed → Complete
//!      └──────────┴─────────┴────────┴──────────┴──→ Error
//! ```
//!
//! 状态只增不减；`Error` 可从任何未终结状态到达，且本身是终结状态。

use std::fmt;

use smallvec::SmallVec;

use super::cache::UnitId;
use super::fetch::FetchHandle;
use super::{LoadError, LoaderError};
use crate::frontend::toolchain::Language;

/// 单元状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UnitState {
    /// 尚未开始
    NotStarted,
    /// 正在获取源文本
    Loading,
    /// 源文本已就绪
    Loaded,
    /// 解析完成，依赖列表已确定
    Parsed,
    /// 转换完成
    Transformed,
    /// 执行完成，结果已交付
    Complete,
    /// 失败
    Error,
}

impl UnitState {
    /// 已完成或已失败
    #[inline]
    pub fn is_settled(self) -> bool {
        self >= UnitState::Complete
    }
}

impl fmt::Display for UnitState {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            UnitState::NotStarted => write!(f, "not-started"),
            UnitState::Loading => write!(f, "loading"),
            UnitState::Loaded => write!(f, "loaded"),
            UnitState::Parsed => write!(f, "parsed"),
            UnitState::Transformed => write!(f, "transformed"),
            UnitState::Complete => write!(f, "complete"),
            UnitState::Error => write!(f, "error"),
        }
    }
}

/// 单元种类，决定解析模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UnitKind {
    /// 脚本
    Script,
    /// 模块
    Module,
}

impl fmt::Display for UnitKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            UnitKind::Script => write!(f, "script"),
            UnitKind::Module => write!(f, "module"),
        }
    }
}

/// 单元来源
///
/// 不同来源的差异只在初始状态与依赖解析的基准地址，用数据表达。
/// 两种来源解析成功后都会注册外部模块符号。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitOrigin {
    /// 由 `load`/`import` 按地址获取
    Load,
    /// 由 `eval`/`eval_async` 内联提供源文本
    Eval,
}

impl UnitOrigin {
    /// 初始状态
    pub fn initial_state(self) -> UnitState {
        match self {
            UnitOrigin::Load => UnitState::NotStarted,
            UnitOrigin::Eval => UnitState::Loaded,
        }
    }

    /// 依赖说明符是否相对于加载器基地址解析，而不是单元自身地址
    pub fn resolves_against_base(self) -> bool {
        matches!(self, UnitOrigin::Eval)
    }
}

/// 单元结算结果
#[derive(Debug)]
pub enum Outcome<L: Language> {
    /// 执行完成
    Complete(L::Value),
    /// 失败
    Failed(LoadError),
}

impl<L: Language> Clone for Outcome<L> {
    fn clone(&self) -> Self {
        match self {
            Outcome::Complete(value) => Outcome::Complete(value.clone()),
            Outcome::Failed(error) => Outcome::Failed(error.clone()),
        }
    }
}

type SuccessCallback<L> = Box<dyn FnOnce(&<L as Language>::Value)>;
type ErrorCallback = Box<dyn FnOnce(&LoadError)>;

/// 一对监听回调
///
/// 消费式调用保证每对回调最多触发一次，且只触发成功或失败之一。
pub struct ListenerPair<L: Language> {
    on_success: SuccessCallback<L>,
    on_error: ErrorCallback,
}

impl<L: Language> ListenerPair<L> {
    /// 创建监听对
    pub fn new(
        on_success: impl FnOnce(&L::Value) + 'static,
        on_error: impl FnOnce(&LoadError) + 'static,
    ) -> Self {
        Self {
            on_success: Box::new(on_success),
            on_error: Box::new(on_error),
        }
    }

    /// 按结果触发其中一个回调
    pub fn fire(
        self,
        outcome: &Outcome<L>,
    ) {
        match outcome {
            Outcome::Complete(value) => (self.on_success)(value),
            Outcome::Failed(error) => (self.on_error)(error),
        }
    }
}

impl<L: Language> fmt::Debug for ListenerPair<L> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str("ListenerPair")
    }
}

/// 编译单元
#[derive(Debug)]
pub struct Unit<L: Language> {
    id: UnitId,
    address: String,
    kind: UnitKind,
    origin: UnitOrigin,
    state: UnitState,
    text: Option<String>,
    tree: Option<L::Tree>,
    /// 非拥有引用，可能成环；到达 `Parsed` 时设置一次
    dependencies: Option<SmallVec<[UnitId; 4]>>,
    transformed: Option<L::Tree>,
    result: Option<L::Value>,
    error: Option<LoadError>,
    listeners: Vec<ListenerPair<L>>,
    abort: Option<FetchHandle>,
}

impl<L: Language> Unit<L> {
    pub(crate) fn new(
        id: UnitId,
        address: String,
        kind: UnitKind,
        origin: UnitOrigin,
    ) -> Self {
        Self {
            id,
            address,
            kind,
            origin,
            state: origin.initial_state(),
            text: None,
            tree: None,
            dependencies: None,
            transformed: None,
            result: None,
            error: None,
            listeners: Vec::new(),
            abort: None,
        }
    }

    #[inline]
    pub fn id(&self) -> UnitId {
        self.id
    }

    #[inline]
    pub fn address(&self) -> &str {
        &self.address
    }

    #[inline]
    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    #[inline]
    pub fn origin(&self) -> UnitOrigin {
        self.origin
    }

    #[inline]
    pub fn state(&self) -> UnitState {
        self.state
    }

    /// 原始源文本（执行后释放）
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// 解析树
    pub fn tree(&self) -> Option<&L::Tree> {
        self.tree.as_ref()
    }

    /// 转换后的树（执行后释放）
    pub fn transformed(&self) -> Option<&L::Tree> {
        self.transformed.as_ref()
    }

    /// 依赖单元，按排序后的说明符顺序
    pub fn dependencies(&self) -> &[UnitId] {
        self.dependencies.as_deref().unwrap_or(&[])
    }

    /// 依赖列表是否已确定
    pub fn has_dependencies(&self) -> bool {
        self.dependencies.is_some()
    }

    /// 执行结果
    pub fn result(&self) -> Option<&L::Value> {
        self.result.as_ref()
    }

    /// 记录的错误
    pub fn error(&self) -> Option<&LoadError> {
        self.error.as_ref()
    }

    /// 已注册且尚未触发的监听者数量
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// 推进状态
    ///
    /// 设置更小的状态会失败；终结状态之间不能互相转换；相同状态视为无操作。
    pub fn set_state(
        &mut self,
        state: UnitState,
    ) -> Result<(), LoaderError> {
        let invalid = state < self.state
            || (self.state == UnitState::Complete && state == UnitState::Error);
        if invalid {
            return Err(LoaderError::InvalidTransition {
                address: self.address.clone(),
                from: self.state,
                to: state,
            });
        }
        if state != self.state {
            tracing::debug!(unit = %self.address, from = %self.state, to = %state, "state change");
            self.state = state;
        }
        Ok(())
    }

    /// 注册监听对
    ///
    /// 单元已结算时注册属于编程错误。
    pub fn add_listener(
        &mut self,
        listener: ListenerPair<L>,
    ) -> Result<(), LoaderError> {
        if self.state.is_settled() {
            return Err(LoaderError::AlreadySettled {
                address: self.address.clone(),
            });
        }
        self.listeners.push(listener);
        Ok(())
    }

    /// 取出并清空监听者，派发前先快照
    pub(crate) fn take_listeners(&mut self) -> Vec<ListenerPair<L>> {
        std::mem::take(&mut self.listeners)
    }

    /// 记录错误但不改变状态；已记录的第一个错误保留
    pub(crate) fn record_error(
        &mut self,
        error: LoadError,
    ) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// 标记失败
    ///
    /// 已结算的单元保持原样并返回 `false`。
    pub(crate) fn fail(
        &mut self,
        error: LoadError,
    ) -> bool {
        if self.state.is_settled() {
            return false;
        }
        self.record_error(error);
        tracing::debug!(unit = %self.address, from = %self.state, "state change -> error");
        self.state = UnitState::Error;
        true
    }

    pub(crate) fn set_text(
        &mut self,
        text: String,
    ) {
        self.text = Some(text);
    }

    pub(crate) fn set_tree(
        &mut self,
        tree: L::Tree,
    ) {
        self.tree = Some(tree);
    }

    pub(crate) fn set_transformed(
        &mut self,
        tree: L::Tree,
    ) {
        self.transformed = Some(tree);
    }

    pub(crate) fn set_result(
        &mut self,
        value: L::Value,
    ) {
        self.result = Some(value);
    }

    pub(crate) fn set_dependencies(
        &mut self,
        dependencies: SmallVec<[UnitId; 4]>,
    ) -> Result<(), LoaderError> {
        if self.dependencies.is_some() {
            return Err(LoaderError::DependenciesFrozen {
                address: self.address.clone(),
            });
        }
        self.dependencies = Some(dependencies);
        Ok(())
    }

    pub(crate) fn set_abort(
        &mut self,
        handle: FetchHandle,
    ) {
        self.abort = Some(handle);
    }

    pub(crate) fn take_abort(&mut self) -> Option<FetchHandle> {
        self.abort.take()
    }

    /// 执行后释放源文本与转换产物，只保留结果
    pub(crate) fn release_artifacts(&mut self) {
        self.text = None;
        self.transformed = None;
    }
}
