//! 项目上下文
//!
//! 全图分析需要共享的符号表：所有已注册的源文件、已解析的单元，以及每个地址
//! 对应的外部模块符号。分析器在一次批量调用中读取并填充这些信息，转换器据此
//! 把跨模块引用改写为地址限定的形式。

use std::fmt;

use indexmap::{IndexMap, IndexSet};

use super::resolver::AddressResolver;

/// 源文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// 地址
    pub name: String,
    /// 源文本
    pub contents: String,
}

impl SourceFile {
    pub fn new(
        name: impl Into<String>,
        contents: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }

    /// 第 `line` 行（从 1 开始）
    pub fn line(
        &self,
        line: usize,
    ) -> Option<&str> {
        line.checked_sub(1)
            .and_then(|index| self.contents.lines().nth(index))
    }
}

/// 外部模块符号
///
/// 每个成功解析的单元都会以自己的地址注册一个符号，导出项由分析阶段填充。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleSymbol {
    /// 模块地址
    pub address: String,
    /// 导出名，按声明顺序
    pub exports: IndexSet<String>,
}

impl ModuleSymbol {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            exports: IndexSet::new(),
        }
    }

    /// 添加导出项，返回是否为新名称
    pub fn add_export(
        &mut self,
        name: impl Into<String>,
    ) -> bool {
        self.exports.insert(name.into())
    }

    pub fn has_export(
        &self,
        name: &str,
    ) -> bool {
        self.exports.contains(name)
    }

    pub fn export_names(&self) -> Vec<&str> {
        self.exports.iter().map(String::as_str).collect()
    }
}

/// 全图项目上下文
pub struct Project {
    root: String,
    resolver: Box<dyn AddressResolver>,
    files: IndexMap<String, SourceFile>,
    parsed: IndexSet<String>,
    modules: IndexMap<String, ModuleSymbol>,
}

impl Project {
    /// 以 `root` 为基地址创建
    pub fn new(
        root: impl Into<String>,
        resolver: Box<dyn AddressResolver>,
    ) -> Self {
        Self {
            root: root.into(),
            resolver,
            files: IndexMap::new(),
            parsed: IndexSet::new(),
            modules: IndexMap::new(),
        }
    }

    /// 基地址
    pub fn root(&self) -> &str {
        &self.root
    }

    /// 注册源文件；同名文件被替换
    pub fn add_file(
        &mut self,
        file: SourceFile,
    ) {
        self.files.insert(file.name.clone(), file);
    }

    pub fn file(
        &self,
        name: &str,
    ) -> Option<&SourceFile> {
        self.files.get(name)
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// 标记文件已解析
    pub fn set_parsed(
        &mut self,
        name: &str,
    ) {
        self.parsed.insert(name.to_string());
    }

    pub fn is_parsed(
        &self,
        name: &str,
    ) -> bool {
        self.parsed.contains(name)
    }

    /// 注册外部模块；已存在则返回已有符号
    pub fn add_external_module(
        &mut self,
        address: &str,
    ) -> &mut ModuleSymbol {
        self.modules
            .entry(address.to_string())
            .or_insert_with(|| ModuleSymbol::new(address))
    }

    pub fn external_module(
        &self,
        address: &str,
    ) -> Option<&ModuleSymbol> {
        self.modules.get(address)
    }

    pub fn external_module_mut(
        &mut self,
        address: &str,
    ) -> Option<&mut ModuleSymbol> {
        self.modules.get_mut(address)
    }

    pub fn has_module(
        &self,
        address: &str,
    ) -> bool {
        self.modules.contains_key(address)
    }

    /// 所有模块符号，按注册顺序
    pub fn modules(&self) -> impl Iterator<Item = &ModuleSymbol> + '_ {
        self.modules.values()
    }

    /// 相对于 `base` 解析说明符
    pub fn resolve(
        &self,
        specifier: &str,
        base: &str,
    ) -> String {
        self.resolver.resolve(specifier, base)
    }

    /// 查找 `address` 模块中的导出项
    ///
    /// 模块未注册或没有该导出时返回错误描述，其中列出可用的导出名。
    pub fn resolve_export(
        &self,
        address: &str,
        name: &str,
    ) -> Result<(), String> {
        let module = self
            .modules
            .get(address)
            .ok_or_else(|| format!("module '{}' is not loaded", address))?;
        if module.has_export(name) {
            return Ok(());
        }
        let available = module.export_names();
        if available.is_empty() {
            Err(format!("module '{}' has no export '{}'", address, name))
        } else {
            Err(format!(
                "module '{}' has no export '{}' (available: {})",
                address,
                name,
                available.join(", ")
            ))
        }
    }
}

impl fmt::Debug for Project {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Project")
            .field("root", &self.root)
            .field("files", &self.files.len())
            .field("parsed", &self.parsed)
            .field("modules", &self.modules)
            .finish()
    }
}
