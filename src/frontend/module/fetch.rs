//! 源文本获取
//!
//! 获取器把地址变成源文本，支持两种调用约定：
//!
//! - 异步：[`Fetcher::fetch`] 立即返回取消句柄，结果稍后经 [`FetchResponder`]
//!   投递到加载器的通道，由加载器在自己的线程上处理
//! - 同步：[`Fetcher::fetch_sync`] 阻塞直到得到结果
//!
//! 获取器在构造加载器时注入，没有全局默认值。

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam::channel::Sender;
use parking_lot::Mutex;

use super::cache::UnitId;

/// 获取错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("no source at '{0}'")]
    NotFound(String),

    #[error("cannot read '{address}': {message}")]
    Io { address: String, message: String },

    #[error("fetch of '{0}' was cancelled")]
    Cancelled(String),

    #[error("fetch of '{0}' was dropped without a response")]
    Abandoned(String),
}

/// 一次异步获取的结果
#[derive(Debug)]
pub struct FetchCompletion {
    pub unit: UnitId,
    pub address: String,
    pub result: Result<String, FetchError>,
}

/// 异步获取的应答端
///
/// 可以跨线程移动。请求被取消后应答会被静默丢弃，加载器已经销毁时也一样。
/// 未应答就被丢弃时交付 [`FetchError::Abandoned`]，加载器不会一直等待。
pub struct FetchResponder {
    unit: UnitId,
    address: String,
    sender: Option<Sender<FetchCompletion>>,
    cancelled: Arc<AtomicBool>,
}

impl FetchResponder {
    pub(crate) fn new(
        unit: UnitId,
        address: String,
        sender: Sender<FetchCompletion>,
    ) -> Self {
        Self {
            unit,
            address,
            sender: Some(sender),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 请求的地址
    pub fn address(&self) -> &str {
        &self.address
    }

    /// 请求是否已被取消
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// 与本应答端共享取消标志的句柄
    pub fn handle(&self) -> FetchHandle {
        FetchHandle {
            cancelled: Arc::clone(&self.cancelled),
            hook: None,
        }
    }

    /// 交付源文本
    pub fn resolve(
        mut self,
        text: String,
    ) {
        self.send(Ok(text));
    }

    /// 交付失败
    pub fn reject(
        mut self,
        error: FetchError,
    ) {
        self.send(Err(error));
    }

    fn send(
        &mut self,
        result: Result<String, FetchError>,
    ) {
        let Some(sender) = self.sender.take() else {
            return;
        };
        if self.is_cancelled() {
            tracing::trace!(address = %self.address, "dropping response to cancelled fetch");
            return;
        }
        // 接收端已销毁说明加载器不再关心结果
        let _ = sender.send(FetchCompletion {
            unit: self.unit,
            address: self.address.clone(),
            result,
        });
    }
}

impl Drop for FetchResponder {
    fn drop(&mut self) {
        if self.sender.is_some() {
            let address = self.address.clone();
            self.send(Err(FetchError::Abandoned(address)));
        }
    }
}

impl fmt::Debug for FetchResponder {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("FetchResponder")
            .field("unit", &self.unit)
            .field("address", &self.address)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// 进行中获取的取消句柄
pub struct FetchHandle {
    cancelled: Arc<AtomicBool>,
    hook: Option<Box<dyn FnOnce() + Send>>,
}

impl FetchHandle {
    /// 附加取消时运行的钩子（例如中断底层传输）
    pub fn with_hook(
        mut self,
        hook: impl FnOnce() + Send + 'static,
    ) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    /// 取消获取；重复调用无效果
    pub fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        if let Some(hook) = self.hook.take() {
            hook();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl fmt::Debug for FetchHandle {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("FetchHandle")
            .field("cancelled", &self.is_cancelled())
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

/// 获取策略
pub trait Fetcher {
    /// 发起异步获取
    ///
    /// 实现可以立即应答，也可以把应答端移到其他线程稍后应答。
    fn fetch(
        &self,
        address: &str,
        responder: FetchResponder,
    ) -> FetchHandle;

    /// 阻塞获取
    fn fetch_sync(
        &self,
        address: &str,
    ) -> Result<String, FetchError>;
}

impl<F: Fetcher + ?Sized> Fetcher for Arc<F> {
    fn fetch(
        &self,
        address: &str,
        responder: FetchResponder,
    ) -> FetchHandle {
        (**self).fetch(address, responder)
    }

    fn fetch_sync(
        &self,
        address: &str,
    ) -> Result<String, FetchError> {
        (**self).fetch_sync(address)
    }
}

impl<F: Fetcher + ?Sized> Fetcher for Rc<F> {
    fn fetch(
        &self,
        address: &str,
        responder: FetchResponder,
    ) -> FetchHandle {
        (**self).fetch(address, responder)
    }

    fn fetch_sync(
        &self,
        address: &str,
    ) -> Result<String, FetchError> {
        (**self).fetch_sync(address)
    }
}

/// 内存获取器
///
/// 地址到源文本的映射，记录每个地址被请求的次数与请求顺序。
/// 延迟模式下异步请求先挂起，由 [`MemoryFetcher::release`] 按调用方选择的顺序应答，
/// 用来模拟乱序完成。
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    sources: Mutex<HashMap<String, String>>,
    counts: Mutex<HashMap<String, usize>>,
    log: Mutex<Vec<String>>,
    deferred: bool,
    parked: Mutex<Vec<FetchResponder>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 异步请求挂起直到显式释放
    pub fn deferred() -> Self {
        Self {
            deferred: true,
            ..Self::default()
        }
    }

    pub fn with_source(
        self,
        address: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        self.insert(address, text);
        self
    }

    pub fn insert(
        &self,
        address: impl Into<String>,
        text: impl Into<String>,
    ) {
        self.sources.lock().insert(address.into(), text.into());
    }

    /// 某地址被请求的次数
    pub fn fetch_count(
        &self,
        address: &str,
    ) -> usize {
        self.counts.lock().get(address).copied().unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.counts.lock().values().sum()
    }

    /// 按请求顺序排列的地址
    pub fn fetch_log(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    /// 挂起中的请求地址
    pub fn parked(&self) -> Vec<String> {
        self.parked
            .lock()
            .iter()
            .map(|r| r.address().to_string())
            .collect()
    }

    /// 应答某地址的所有挂起请求，返回应答数量
    pub fn release(
        &self,
        address: &str,
    ) -> usize {
        let released: Vec<FetchResponder> = {
            let mut parked = self.parked.lock();
            let (matching, rest): (Vec<_>, Vec<_>) =
                parked.drain(..).partition(|r| r.address() == address);
            *parked = rest;
            matching
        };
        let count = released.len();
        for responder in released {
            self.answer(responder);
        }
        count
    }

    /// 按请求顺序应答所有挂起请求
    pub fn release_all(&self) -> usize {
        let released: Vec<FetchResponder> = self.parked.lock().drain(..).collect();
        let count = released.len();
        for responder in released {
            self.answer(responder);
        }
        count
    }

    fn record(
        &self,
        address: &str,
    ) {
        *self.counts.lock().entry(address.to_string()).or_insert(0) += 1;
        self.log.lock().push(address.to_string());
    }

    fn lookup(
        &self,
        address: &str,
    ) -> Result<String, FetchError> {
        self.sources
            .lock()
            .get(address)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(address.to_string()))
    }

    fn answer(
        &self,
        responder: FetchResponder,
    ) {
        match self.lookup(responder.address()) {
            Ok(text) => responder.resolve(text),
            Err(error) => responder.reject(error),
        }
    }
}

impl Fetcher for MemoryFetcher {
    fn fetch(
        &self,
        address: &str,
        responder: FetchResponder,
    ) -> FetchHandle {
        self.record(address);
        let handle = responder.handle();
        if self.deferred {
            self.parked.lock().push(responder);
        } else {
            self.answer(responder);
        }
        handle
    }

    fn fetch_sync(
        &self,
        address: &str,
    ) -> Result<String, FetchError> {
        self.record(address);
        self.lookup(address)
    }
}

/// 文件系统获取器
///
/// 地址按文件路径读取；设置了根目录时绝对地址视为相对于根目录。
/// 异步请求在 rayon 线程池上读取文件。
#[derive(Debug, Clone, Default)]
pub struct FileFetcher {
    root: Option<PathBuf>,
}

impl FileFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以 `root` 为根目录
    pub fn rooted(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    /// 地址对应的文件路径
    pub fn path_for(
        &self,
        address: &str,
    ) -> PathBuf {
        let path = address.strip_prefix("file://").unwrap_or(address);
        match &self.root {
            Some(root) => root.join(path.trim_start_matches('/')),
            None => PathBuf::from(path),
        }
    }

    fn read(
        path: &std::path::Path,
        address: &str,
    ) -> Result<String, FetchError> {
        std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => FetchError::NotFound(address.to_string()),
            _ => FetchError::Io {
                address: address.to_string(),
                message: e.to_string(),
            },
        })
    }
}

impl Fetcher for FileFetcher {
    fn fetch(
        &self,
        address: &str,
        responder: FetchResponder,
    ) -> FetchHandle {
        let handle = responder.handle();
        let path = self.path_for(address);
        let address = address.to_string();
        rayon::spawn(move || {
            if responder.is_cancelled() {
                return;
            }
            match Self::read(&path, &address) {
                Ok(text) => responder.resolve(text),
                Err(error) => responder.reject(error),
            }
        });
        handle
    }

    fn fetch_sync(
        &self,
        address: &str,
    ) -> Result<String, FetchError> {
        Self::read(&self.path_for(address), address)
    }
}
