//! 语言协作者
//!
//! 加载器只负责编排，语法、语义、转换、序列化与执行都由外部协作者提供。
//! 每个协作者是一个独立的 trait，按 [`Language`] 固定树与值的类型，
//! 由 [`Toolchain`] 打包后在构造时注入编译器。

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::module::{Project, SourceFile, UnitKind};
use crate::util::diagnostic::Reporter;

/// 语言定义
pub trait Language: Sized + fmt::Debug + 'static {
    /// 解析树与转换后的树
    type Tree: fmt::Debug;
    /// 执行得到的完成值
    type Value: Clone + fmt::Debug;
}

/// 语法分析器
///
/// 对非法输入不会 panic，而是向报告器记录诊断并返回尽力恢复的树。
pub trait Grammar<L: Language> {
    fn parse(
        &self,
        source: &SourceFile,
        kind: UnitKind,
        reporter: &Reporter,
    ) -> L::Tree;
}

/// 导入说明符收集
pub trait SpecifierVisitor<L: Language> {
    /// 按声明顺序返回说明符
    fn module_specifiers(
        &self,
        tree: &L::Tree,
    ) -> Vec<String>;
}

/// 交给分析器的一个单元
#[derive(Debug)]
pub struct AnalysisTarget<'a, L: Language> {
    pub address: &'a str,
    pub kind: UnitKind,
    pub tree: &'a L::Tree,
}

/// 全图语义分析
pub trait Analyzer<L: Language> {
    /// 一次批量调用分析所有目标
    fn analyze_trees(
        &self,
        targets: &[AnalysisTarget<'_, L>],
        project: &mut Project,
        reporter: &Reporter,
    );
}

/// 转换时可见的上下文
#[derive(Debug)]
pub struct TransformContext<'a> {
    pub address: &'a str,
    pub kind: UnitKind,
    pub project: &'a Project,
}

/// 代码转换
pub trait Transformer<L: Language> {
    fn transform(
        &self,
        tree: &L::Tree,
        context: &TransformContext<'_>,
        reporter: &Reporter,
    ) -> L::Tree;
}

/// 把转换后的树写成可执行文本
pub trait Serializer<L: Language> {
    fn write(
        &self,
        tree: &L::Tree,
    ) -> String;
}

/// 执行器
pub trait Executor<L: Language> {
    /// 在共享命名空间中执行文本，返回完成值；抛出时返回消息
    fn execute(
        &self,
        code: &str,
        namespace: &mut Namespace<L::Value>,
    ) -> Result<L::Value, String>;

    /// 读取模块执行后发布的导出值；语言不发布导出时返回 `None`
    fn exported_value(
        &self,
        _address: &str,
        _name: &str,
        _namespace: &Namespace<L::Value>,
    ) -> Option<L::Value> {
        None
    }
}

/// 执行命名空间
///
/// 同一加载器（或显式共享它的多个加载器）中所有单元共用的全局绑定。
#[derive(Debug, Clone, PartialEq)]
pub struct Namespace<V> {
    bindings: IndexMap<String, V>,
}

impl<V> Default for Namespace<V> {
    fn default() -> Self {
        Self {
            bindings: IndexMap::new(),
        }
    }
}

impl<V> Namespace<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 可被多个加载器共享的句柄
    pub fn shared() -> SharedNamespace<V> {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn get(
        &self,
        name: &str,
    ) -> Option<&V> {
        self.bindings.get(name)
    }

    /// 定义或覆盖绑定
    pub fn define(
        &mut self,
        name: impl Into<String>,
        value: V,
    ) {
        self.bindings.insert(name.into(), value);
    }

    pub fn contains(
        &self,
        name: &str,
    ) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// 绑定名，按定义顺序
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.bindings.keys().map(String::as_str)
    }
}

/// 共享命名空间句柄
pub type SharedNamespace<V> = Rc<RefCell<Namespace<V>>>;

/// 协作者集合
pub struct Toolchain<L: Language> {
    pub grammar: Box<dyn Grammar<L>>,
    pub specifiers: Box<dyn SpecifierVisitor<L>>,
    pub analyzer: Box<dyn Analyzer<L>>,
    pub transformer: Box<dyn Transformer<L>>,
    pub serializer: Box<dyn Serializer<L>>,
    pub executor: Box<dyn Executor<L>>,
}

impl<L: Language> Toolchain<L> {
    pub fn new(
        grammar: impl Grammar<L> + 'static,
        specifiers: impl SpecifierVisitor<L> + 'static,
        analyzer: impl Analyzer<L> + 'static,
        transformer: impl Transformer<L> + 'static,
        serializer: impl Serializer<L> + 'static,
        executor: impl Executor<L> + 'static,
    ) -> Self {
        Self {
            grammar: Box::new(grammar),
            specifiers: Box::new(specifiers),
            analyzer: Box::new(analyzer),
            transformer: Box::new(transformer),
            serializer: Box::new(serializer),
            executor: Box::new(executor),
        }
    }
}

impl<L: Language> fmt::Debug for Toolchain<L> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str("Toolchain")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_define_and_get() {
        let mut ns: Namespace<i64> = Namespace::new();
        assert!(ns.is_empty());
        ns.define("x", 1);
        ns.define("y", 2);
        ns.define("x", 3);

        assert_eq!(ns.get("x"), Some(&3));
        assert!(ns.contains("y"));
        assert_eq!(ns.names().collect::<Vec<_>>(), vec!["x", "y"]);
    }

    #[test]
    fn test_shared_namespace_is_shared() {
        let shared: SharedNamespace<i64> = Namespace::shared();
        let other = Rc::clone(&shared);
        shared.borrow_mut().define("g", 7);
        assert_eq!(other.borrow().get("g"), Some(&7));
    }
}
