//! 模块加载器
//!
//! 顶层编排：解析地址、获取源文本、发现依赖并递归加载，待整个缓存到达屏障后
//! 批量执行 分析 → 转换 → 执行，最后把结果或错误交付给监听者。
//!
//! # 屏障
//!
//! 每次加载或依赖发现之后都重新检查：缓存中的每个单元都至少到达 `Parsed`，
//! 且至少有一个单元恰好处于 `Parsed`。条件成立时处理的是整个缓存，而不只是
//! 触发检查的单元所在子图，因此共享同一加载器的并发请求会汇入同一个批次。
//!
//! # 整体中止
//!
//! 获取、解析、分析、转换、执行任何一步失败，都会取消所有进行中的获取，把所有
//! 未结算的单元标记为 `Error`，并通知整个缓存中已注册的监听者。不做部分成功，
//! 不重试。
//!
//! # 重入
//!
//! 会话状态借用期间从不调用监听者：通知先进入发件箱，公开方法在释放借用后统一
//! 派发。监听者可以持有 [`Loader`] 的克隆并在回调中再次调用 `load`/`eval`。

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};

use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use hashbrown::{HashMap, HashSet};
use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::{debug, info, warn};

use super::cache::{CacheStats, UnitCache, UnitId};
use super::fetch::{FetchCompletion, FetchError, FetchResponder, Fetcher, FileFetcher};
use super::registry::Project;
use super::resolver::{AddressResolver, PathResolver};
use super::unit::{ListenerPair, Outcome, Unit, UnitKind, UnitState};
use super::{LoadError, LoaderError};
use crate::frontend::compiler::Compiler;
use crate::frontend::pipeline::PhaseStats;
use crate::frontend::toolchain::{Language, Namespace, SharedNamespace, Toolchain};
use crate::util::config::{LoaderConfig, NamespaceScope};
use crate::util::diagnostic::{Diagnostic, DiagnosticCode};

/// 源文本转换钩子，作用于获取到的文本
pub type TranslateHook = fn(String) -> String;

/// 加载器统计信息
#[derive(Debug, Clone)]
pub struct LoaderStats {
    /// 缓存统计
    pub cache: CacheStats,
    /// 各阶段调用次数与耗时
    pub phases: PhaseStats,
    /// 进行中的获取
    pub pending_fetches: usize,
}

/// 待派发的通知
struct Notification<L: Language> {
    listeners: Vec<ListenerPair<L>>,
    outcome: Outcome<L>,
}

/// 一个加载会话的全部状态
struct Session<L: Language> {
    base_address: String,
    sync: bool,
    compiler: Compiler<L>,
    cache: UnitCache<L>,
    fetcher: Box<dyn Fetcher>,
    translate: Option<TranslateHook>,
    namespace: SharedNamespace<L::Value>,
    sender: Sender<FetchCompletion>,
    receiver: Receiver<FetchCompletion>,
    /// 进行中的获取及其开始时间
    pending: HashMap<UnitId, Instant>,
    outbox: Vec<Notification<L>>,
}

impl<L: Language> Session<L> {
    fn normalize(
        &self,
        address: &str,
    ) -> String {
        self.compiler.project().resolve(address, &self.base_address)
    }

    fn request(
        &mut self,
        address: &str,
        kind: UnitKind,
    ) -> UnitId {
        let address = self.normalize(address);
        self.cache.get_or_insert(&address, kind).0
    }

    fn set_state(
        &mut self,
        id: UnitId,
        state: UnitState,
    ) {
        if let Err(e) = self.cache[id].set_state(state) {
            warn!("{}", e);
        }
    }

    /// 开始获取；只有尚未开始的单元会被处理
    fn load_unit(
        &mut self,
        id: UnitId,
    ) {
        if self.cache[id].state() != UnitState::NotStarted {
            return;
        }
        self.set_state(id, UnitState::Loading);
        let address = self.cache[id].address().to_string();
        debug!(unit = %address, sync = self.sync, "fetch");

        if self.sync {
            let started = Instant::now();
            let result = self.fetcher.fetch_sync(&address);
            self.compiler.record_fetch(started);
            self.handle_fetched(id, result);
        } else {
            self.pending.insert(id, Instant::now());
            let responder = FetchResponder::new(id, address.clone(), self.sender.clone());
            let handle = self.fetcher.fetch(&address, responder);
            self.cache[id].set_abort(handle);
        }
    }

    /// 处理一次异步获取的结果
    fn complete_fetch(
        &mut self,
        completion: FetchCompletion,
    ) {
        let id = completion.unit;
        let loading = self
            .cache
            .get(id)
            .is_some_and(|unit| unit.state() == UnitState::Loading);
        let started = match self.pending.remove(&id) {
            Some(started) if loading => started,
            _ => {
                warn!(unit = %completion.address, "discarding late fetch completion");
                return;
            }
        };
        debug!(unit = %completion.address, ok = completion.result.is_ok(), "fetch complete");
        self.compiler.record_fetch(started);
        self.cache[id].take_abort();
        self.handle_fetched(id, completion.result);
    }

    fn handle_fetched(
        &mut self,
        id: UnitId,
        result: Result<String, FetchError>,
    ) {
        match result {
            Ok(text) => {
                let text = match self.translate {
                    Some(translate) => translate(text),
                    None => text,
                };
                self.cache[id].set_text(text);
                self.set_state(id, UnitState::Loaded);
                self.handle_loaded(id);
            }
            Err(error) => {
                let address = self.cache[id].address().to_string();
                self.compiler.reporter().report(
                    Diagnostic::error(DiagnosticCode::Fetch, error.to_string()).at(&address),
                );
                let error = LoadError::Fetch {
                    address,
                    reason: error.to_string(),
                };
                self.cache[id].fail(error.clone());
                self.abort_all(error);
            }
        }
    }

    /// 解析单元并发现依赖
    fn handle_loaded(
        &mut self,
        id: UnitId,
    ) {
        let address = self.cache[id].address().to_string();
        let checkpoint = self.compiler.reporter().checkpoint();
        if !self.compiler.parse(&mut self.cache[id]) {
            let error = LoadError::Parse {
                address,
                message: self.compiler.error_message_since(checkpoint),
            };
            self.cache[id].record_error(error.clone());
            self.abort_all(error);
            return;
        }

        self.set_state(id, UnitState::Parsed);
        self.compiler.add_external_module(&self.cache[id]);

        // 排序保证解析与加载顺序与声明顺序无关
        let mut specifiers = self.compiler.module_specifiers(&self.cache[id]);
        specifiers.sort();

        let referrer = if self.cache[id].origin().resolves_against_base() {
            self.base_address.clone()
        } else {
            address.clone()
        };
        let mut dependencies: SmallVec<[UnitId; 4]> = SmallVec::new();
        for specifier in &specifiers {
            let resolved = self.compiler.project().resolve(specifier, &referrer);
            let (dependency, _) = self.cache.get_or_insert(&resolved, UnitKind::Module);
            if !dependencies.contains(&dependency) {
                dependencies.push(dependency);
            }
        }
        debug!(unit = %address, dependencies = dependencies.len(), "parsed");
        if let Err(e) = self.cache[id].set_dependencies(dependencies.clone()) {
            warn!("{}", e);
        }

        let failed = dependencies
            .iter()
            .copied()
            .find(|&dependency| self.cache[dependency].state() == UnitState::Error);
        if let Some(failed) = failed {
            let error = LoadError::Dependency {
                address,
                dependency: self.cache[failed].address().to_string(),
            };
            self.cache[id].fail(error.clone());
            self.abort_all(error);
            return;
        }

        for dependency in dependencies {
            self.load_unit(dependency);
        }
        self.check_barrier();
    }

    fn check_barrier(&mut self) {
        let ready = self.cache.are_all(|state| state >= UnitState::Parsed)
            && self.cache.any(|state| state == UnitState::Parsed);
        if !ready {
            debug!(units = self.cache.len(), "barrier not reached");
            return;
        }

        let ids: Vec<UnitId> = self.cache.ids().collect();
        debug!(units = ids.len(), "barrier reached");
        if let Err(failed) = self.compiler.analyze_dependencies(&mut self.cache, &ids) {
            self.abort_failed_phase(&failed);
            return;
        }
        if let Err(failed) = self.compiler.transform_dependencies(&mut self.cache, &ids) {
            self.abort_failed_phase(&failed);
            return;
        }
        self.evaluate();
    }

    fn abort_failed_phase(
        &mut self,
        failed: &[UnitId],
    ) {
        let cause = failed
            .iter()
            .find_map(|&id| self.cache[id].error().map(|e| e.root_cause().clone()));
        match cause {
            Some(cause) => self.abort_all(cause),
            None => self.notify_failures(),
        }
    }

    /// 整体中止
    fn abort_all(
        &mut self,
        cause: LoadError,
    ) {
        warn!(cause = %cause, "aborting batch");

        let outstanding: Vec<UnitId> = self.pending.drain().map(|(id, _)| id).collect();
        for id in outstanding {
            if let Some(mut handle) = self.cache[id].take_abort() {
                handle.cancel();
            }
        }

        let root = cause.root_cause().clone();
        let ids: Vec<UnitId> = self.cache.ids().collect();
        for id in ids {
            let unit = &mut self.cache[id];
            if unit.state().is_settled() {
                continue;
            }
            let error = LoadError::Aborted {
                address: unit.address().to_string(),
                cause: Box::new(root.clone()),
            };
            unit.fail(error);
        }
        self.notify_failures();
    }

    /// 把所有失败单元的监听者放入发件箱
    fn notify_failures(&mut self) {
        let ids: Vec<UnitId> = self.cache.ids().collect();
        for id in ids {
            let unit = &mut self.cache[id];
            if unit.state() != UnitState::Error || unit.listener_count() == 0 {
                continue;
            }
            let error = unit.error().cloned().unwrap_or_else(|| LoadError::Aborted {
                address: unit.address().to_string(),
                cause: Box::new(LoadError::Execution {
                    address: unit.address().to_string(),
                    message: "batch aborted".to_string(),
                }),
            });
            let listeners = unit.take_listeners();
            self.outbox.push(Notification {
                listeners,
                outcome: Outcome::Failed(error),
            });
        }
    }

    /// 执行顺序：缓存上的深度优先后序遍历，已访问集合保证环形依赖也能终止
    fn evaluation_order(&self) -> Vec<UnitId> {
        let mut seen = HashSet::new();
        let mut order = Vec::with_capacity(self.cache.len());
        for root in self.cache.ids() {
            if !seen.insert(root) {
                continue;
            }
            let mut stack: Vec<(UnitId, usize)> = vec![(root, 0)];
            while let Some(top) = stack.last_mut() {
                let (id, next) = *top;
                let dependencies = self.cache[id].dependencies();
                if next < dependencies.len() {
                    top.1 += 1;
                    let dependency = dependencies[next];
                    if seen.insert(dependency) {
                        stack.push((dependency, 0));
                    }
                } else {
                    order.push(id);
                    stack.pop();
                }
            }
        }
        order
    }

    fn evaluate(&mut self) {
        let order = self.evaluation_order();
        let namespace = Rc::clone(&self.namespace);
        let Ok(mut namespace) = namespace.try_borrow_mut() else {
            let error = LoadError::Execution {
                address: self.base_address.clone(),
                message: "execution namespace is already borrowed".to_string(),
            };
            self.abort_all(error);
            return;
        };

        let mut evaluated = Vec::new();
        for id in order {
            if self.cache[id].state() != UnitState::Transformed {
                continue;
            }
            match self.compiler.execute(&self.cache[id], &mut namespace) {
                Ok(value) => {
                    let unit = &mut self.cache[id];
                    unit.set_result(value);
                    unit.release_artifacts();
                    evaluated.push(id);
                }
                Err(message) => {
                    drop(namespace);
                    let address = self.cache[id].address().to_string();
                    self.compiler
                        .reporter()
                        .report_error(DiagnosticCode::Execution, &address, message.clone());
                    let error = LoadError::Execution { address, message };
                    self.cache[id].fail(error.clone());
                    self.abort_all(error);
                    return;
                }
            }
        }
        drop(namespace);

        // 全部执行成功后才标记完成，监听者看到的总是一致的缓存
        for &id in &evaluated {
            self.set_state(id, UnitState::Complete);
        }
        for &id in &evaluated {
            let unit = &mut self.cache[id];
            if unit.listener_count() == 0 {
                continue;
            }
            let Some(value) = unit.result().cloned() else {
                continue;
            };
            let listeners = unit.take_listeners();
            self.outbox.push(Notification {
                listeners,
                outcome: Outcome::Complete(value),
            });
        }
        info!(units = evaluated.len(), "batch complete");
    }

    /// 新建内联求值单元并开始处理
    fn eval_unit(
        &mut self,
        code: String,
        listener: Option<ListenerPair<L>>,
    ) -> UnitId {
        let id = self
            .cache
            .insert_eval(&self.base_address, UnitKind::Script);
        let unit = &mut self.cache[id];
        unit.set_text(code);
        if let Some(listener) = listener {
            if let Err(e) = unit.add_listener(listener) {
                warn!("{}", e);
            }
        }
        self.handle_loaded(id);
        id
    }

    /// 尚未解析的单元地址
    fn unresolved(&self) -> Vec<String> {
        self.cache
            .iter()
            .filter(|unit| unit.state() < UnitState::Parsed)
            .map(|unit| unit.address().to_string())
            .collect()
    }

    fn settled_value(
        &self,
        id: UnitId,
    ) -> Result<L::Value, LoaderError> {
        let unit = &self.cache[id];
        match unit.state() {
            UnitState::Complete => unit
                .result()
                .cloned()
                .ok_or(LoaderError::UnknownUnit(id)),
            UnitState::Error => Err(LoaderError::Failed(unit.error().cloned().unwrap_or_else(
                || LoadError::Execution {
                    address: unit.address().to_string(),
                    message: "unit failed".to_string(),
                },
            ))),
            _ => Err(LoaderError::Unresolved {
                address: unit.address().to_string(),
                pending: self.unresolved(),
            }),
        }
    }
}

/// 加载器
///
/// 可廉价克隆的句柄，所有克隆共享同一个会话。单线程使用；
/// 异步获取的结果只在 [`Loader::poll`] 与 [`Loader::run_until_idle`] 中处理。
pub struct Loader<L: Language> {
    session: Rc<RefCell<Session<L>>>,
}

impl<L: Language> Clone for Loader<L> {
    fn clone(&self) -> Self {
        Self {
            session: Rc::clone(&self.session),
        }
    }
}

/// 不持有会话的加载器句柄，供回调闭包捕获
pub struct WeakLoader<L: Language> {
    session: Weak<RefCell<Session<L>>>,
}

impl<L: Language> Clone for WeakLoader<L> {
    fn clone(&self) -> Self {
        Self {
            session: Weak::clone(&self.session),
        }
    }
}

impl<L: Language> WeakLoader<L> {
    /// 会话仍存活时取回强句柄
    pub fn upgrade(&self) -> Option<Loader<L>> {
        self.session.upgrade().map(|session| Loader { session })
    }
}

impl<L: Language> std::fmt::Debug for Loader<L> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self.session.try_borrow() {
            Ok(session) => f
                .debug_struct("Loader")
                .field("base_address", &session.base_address)
                .field("sync", &session.sync)
                .field("units", &session.cache.len())
                .field("pending", &session.pending.len())
                .finish(),
            Err(_) => f.write_str("Loader { .. }"),
        }
    }
}

impl<L: Language> Loader<L> {
    /// 使用默认配置创建
    pub fn new(toolchain: Toolchain<L>) -> Self {
        Self::assemble(
            toolchain,
            LoaderConfig::default(),
            Box::new(FileFetcher::new()),
            Box::new(PathResolver::new()),
            Namespace::shared(),
            None,
        )
    }

    pub fn builder(toolchain: Toolchain<L>) -> LoaderBuilder<L> {
        LoaderBuilder::new(toolchain)
    }

    fn assemble(
        toolchain: Toolchain<L>,
        config: LoaderConfig,
        fetcher: Box<dyn Fetcher>,
        resolver: Box<dyn AddressResolver>,
        namespace: SharedNamespace<L::Value>,
        translate: Option<TranslateHook>,
    ) -> Self {
        let (sender, receiver) = unbounded();
        let project = Project::new(config.base_address.clone(), resolver);
        let session = Session {
            base_address: config.base_address,
            sync: config.sync,
            compiler: Compiler::new(toolchain, project),
            cache: UnitCache::new(),
            fetcher,
            translate,
            namespace,
            sender,
            receiver,
            pending: HashMap::new(),
            outbox: Vec::new(),
        };
        Self {
            session: Rc::new(RefCell::new(session)),
        }
    }

    pub fn downgrade(&self) -> WeakLoader<L> {
        WeakLoader {
            session: Rc::downgrade(&self.session),
        }
    }

    /// 派发发件箱中的通知；必须在释放会话借用之后调用
    fn flush(&self) {
        loop {
            let batch = std::mem::take(&mut self.session.borrow_mut().outbox);
            if batch.is_empty() {
                break;
            }
            for notification in batch {
                for listener in notification.listeners {
                    listener.fire(&notification.outcome);
                }
            }
        }
    }

    /// 加载地址对应的单元
    ///
    /// 地址相对于基地址规范化。同一 `(地址, 种类)` 重复请求返回同一个单元，不会重复获取。
    pub fn load(
        &self,
        address: &str,
        kind: UnitKind,
    ) -> UnitId {
        let id = {
            let mut session = self.session.borrow_mut();
            let id = session.request(address, kind);
            session.load_unit(id);
            id
        };
        self.flush();
        id
    }

    /// 先注册监听者再加载，同步模式下也不会错过结算
    pub fn load_with_listener(
        &self,
        address: &str,
        kind: UnitKind,
        listener: ListenerPair<L>,
    ) -> Result<UnitId, LoaderError> {
        let id = {
            let mut session = self.session.borrow_mut();
            let id = session.request(address, kind);
            session.cache[id].add_listener(listener)?;
            session.load_unit(id);
            id
        };
        self.flush();
        Ok(id)
    }

    /// 以同步获取方式加载并返回完成值
    ///
    /// 本次请求期间获取会阻塞；状态机与缓存与异步模式相同。
    pub fn load_sync(
        &self,
        address: &str,
        kind: UnitKind,
    ) -> Result<L::Value, LoaderError> {
        let id = {
            let mut session = self.session.borrow_mut();
            let previous = std::mem::replace(&mut session.sync, true);
            let id = session.request(address, kind);
            session.load_unit(id);
            session.sync = previous;
            id
        };
        self.flush();
        self.session.borrow().settled_value(id)
    }

    /// 求值内联源文本
    ///
    /// 仍有外部模块未加载完成时返回 [`LoaderError::Unresolved`]。
    pub fn eval(
        &self,
        code: impl Into<String>,
    ) -> Result<L::Value, LoaderError> {
        let id = self.session.borrow_mut().eval_unit(code.into(), None);
        self.flush();
        self.session.borrow().settled_value(id)
    }

    /// 求值内联源文本，结果交付给监听者
    pub fn eval_async(
        &self,
        code: impl Into<String>,
        listener: ListenerPair<L>,
    ) -> UnitId {
        let id = self
            .session
            .borrow_mut()
            .eval_unit(code.into(), Some(listener));
        self.flush();
        id
    }

    /// 为单元注册监听者；已结算的单元返回 [`LoaderError::AlreadySettled`]
    pub fn add_listener(
        &self,
        id: UnitId,
        listener: ListenerPair<L>,
    ) -> Result<(), LoaderError> {
        let mut session = self.session.borrow_mut();
        let unit = session
            .cache
            .get_mut(id)
            .ok_or(LoaderError::UnknownUnit(id))?;
        unit.add_listener(listener)
    }

    /// 在执行命名空间中预先定义全局绑定
    pub fn define_global(
        &self,
        name: impl Into<String>,
        value: L::Value,
    ) {
        let session = self.session.borrow();
        session.namespace.borrow_mut().define(name, value);
    }

    /// 处理已到达的获取结果，不阻塞；返回处理的数量
    pub fn poll(&self) -> usize {
        let mut processed = 0;
        loop {
            let completion = self.session.borrow().receiver.try_recv();
            let Ok(completion) = completion else {
                break;
            };
            self.session.borrow_mut().complete_fetch(completion);
            self.flush();
            processed += 1;
        }
        processed
    }

    /// 处理获取结果直到没有进行中的获取
    pub fn run_until_idle(&self) -> usize {
        let mut processed = self.poll();
        while self.pending_fetches() > 0 {
            let receiver = self.session.borrow().receiver.clone();
            let Ok(completion) = receiver.recv() else {
                break;
            };
            self.session.borrow_mut().complete_fetch(completion);
            self.flush();
            processed += 1 + self.poll();
        }
        processed
    }

    /// 同 [`Loader::run_until_idle`]，但每次等待最多 `timeout`；超时返回 `false`
    pub fn run_until_idle_timeout(
        &self,
        timeout: Duration,
    ) -> bool {
        self.poll();
        while self.pending_fetches() > 0 {
            let receiver = self.session.borrow().receiver.clone();
            match receiver.recv_timeout(timeout) {
                Ok(completion) => {
                    self.session.borrow_mut().complete_fetch(completion);
                    self.flush();
                    self.poll();
                }
                Err(RecvTimeoutError::Timeout) => return false,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        true
    }

    /// 进行中的获取数量
    pub fn pending_fetches(&self) -> usize {
        self.session.borrow().pending.len()
    }

    pub fn is_idle(&self) -> bool {
        self.pending_fetches() == 0
    }

    pub fn base_address(&self) -> String {
        self.session.borrow().base_address.clone()
    }

    /// 相对于基地址规范化地址
    pub fn resolve_address(
        &self,
        address: &str,
    ) -> String {
        self.session.borrow().normalize(address)
    }

    /// 只读访问单元
    pub fn with_unit<R>(
        &self,
        id: UnitId,
        f: impl FnOnce(&Unit<L>) -> R,
    ) -> Option<R> {
        self.session.borrow().cache.get(id).map(f)
    }

    pub fn state(
        &self,
        id: UnitId,
    ) -> Option<UnitState> {
        self.with_unit(id, Unit::state)
    }

    pub fn address(
        &self,
        id: UnitId,
    ) -> Option<String> {
        self.with_unit(id, |unit| unit.address().to_string())
    }

    pub fn kind(
        &self,
        id: UnitId,
    ) -> Option<UnitKind> {
        self.with_unit(id, Unit::kind)
    }

    pub fn dependencies(
        &self,
        id: UnitId,
    ) -> Vec<UnitId> {
        self.with_unit(id, |unit| unit.dependencies().to_vec())
            .unwrap_or_default()
    }

    pub fn result(
        &self,
        id: UnitId,
    ) -> Option<L::Value> {
        self.with_unit(id, |unit| unit.result().cloned()).flatten()
    }

    pub fn error(
        &self,
        id: UnitId,
    ) -> Option<LoadError> {
        self.with_unit(id, |unit| unit.error().cloned()).flatten()
    }

    /// 所有单元，按插入顺序
    pub fn unit_ids(&self) -> Vec<UnitId> {
        self.session.borrow().cache.ids().collect()
    }

    /// 按地址查找单元，地址相对于基地址规范化
    pub fn lookup(
        &self,
        address: &str,
        kind: UnitKind,
    ) -> Option<UnitId> {
        let session = self.session.borrow();
        let address = session.normalize(address);
        session.cache.lookup(&address, kind)
    }

    /// 当前缓存的执行顺序
    pub fn evaluation_order(&self) -> Vec<UnitId> {
        self.session.borrow().evaluation_order()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.session.borrow().compiler.reporter().diagnostics()
    }

    pub fn stats(&self) -> LoaderStats {
        let session = self.session.borrow();
        LoaderStats {
            cache: session.cache.stats(),
            phases: session.compiler.stats().clone(),
            pending_fetches: session.pending.len(),
        }
    }

    /// 执行命名空间句柄
    pub fn namespace(&self) -> SharedNamespace<L::Value> {
        Rc::clone(&self.session.borrow().namespace)
    }

    /// 模块发布到命名空间的导出值，按导出声明顺序
    ///
    /// 地址相对于基地址规范化。模块未解析或尚未执行时返回空表。
    pub fn module_exports(
        &self,
        address: &str,
    ) -> IndexMap<String, L::Value> {
        let session = self.session.borrow();
        let address = session.normalize(address);
        let namespace = session.namespace.borrow();
        session.compiler.module_exports(&address, &namespace)
    }
}

/// 加载器构建器
pub struct LoaderBuilder<L: Language> {
    toolchain: Toolchain<L>,
    config: LoaderConfig,
    fetcher: Option<Box<dyn Fetcher>>,
    resolver: Option<Box<dyn AddressResolver>>,
    namespace: Option<SharedNamespace<L::Value>>,
    translate: Option<TranslateHook>,
    globals: Vec<(String, L::Value)>,
}

impl<L: Language> LoaderBuilder<L> {
    pub fn new(toolchain: Toolchain<L>) -> Self {
        Self {
            toolchain,
            config: LoaderConfig::default(),
            fetcher: None,
            resolver: None,
            namespace: None,
            translate: None,
            globals: Vec::new(),
        }
    }

    pub fn config(
        mut self,
        config: LoaderConfig,
    ) -> Self {
        self.config = config;
        self
    }

    pub fn base_address(
        mut self,
        base_address: impl Into<String>,
    ) -> Self {
        self.config.base_address = base_address.into();
        self
    }

    pub fn sync(
        mut self,
        sync: bool,
    ) -> Self {
        self.config.sync = sync;
        self
    }

    /// 获取策略，默认为 [`FileFetcher`]
    pub fn fetcher(
        mut self,
        fetcher: impl Fetcher + 'static,
    ) -> Self {
        self.fetcher = Some(Box::new(fetcher));
        self
    }

    /// 地址解析策略，默认为 [`PathResolver`]
    pub fn resolver(
        mut self,
        resolver: impl AddressResolver + 'static,
    ) -> Self {
        self.resolver = Some(Box::new(resolver));
        self
    }

    /// 使用与其他加载器共享的命名空间
    pub fn namespace(
        mut self,
        namespace: SharedNamespace<L::Value>,
    ) -> Self {
        self.config.namespace = NamespaceScope::Shared;
        self.namespace = Some(namespace);
        self
    }

    pub fn translate(
        mut self,
        translate: TranslateHook,
    ) -> Self {
        self.translate = Some(translate);
        self
    }

    /// 预先定义全局绑定
    pub fn define_global(
        mut self,
        name: impl Into<String>,
        value: L::Value,
    ) -> Self {
        self.globals.push((name.into(), value));
        self
    }

    pub fn build(self) -> Result<Loader<L>, LoaderError> {
        let namespace = match (self.config.namespace, self.namespace) {
            (NamespaceScope::Shared, Some(namespace)) => namespace,
            (NamespaceScope::Shared, None) => return Err(LoaderError::MissingNamespace),
            (NamespaceScope::Loader, _) => Namespace::shared(),
        };
        for (name, value) in self.globals {
            namespace.borrow_mut().define(name, value);
        }

        Ok(Loader::assemble(
            self.toolchain,
            self.config,
            self.fetcher.unwrap_or_else(|| Box::new(FileFetcher::new())),
            self.resolver
                .unwrap_or_else(|| Box::new(PathResolver::new())),
            namespace,
            self.translate,
        ))
    }
}
