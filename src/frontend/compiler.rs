//! 编译器核心
//!
//! 流水线协调器：对单个单元或整批单元调用外部协作者，把诊断汇总到共享报告器，
//! 并在阶段出错时让整批单元失败。
//!
//! | 操作 | 粒度 | 说明 |
//! |------|------|------|
//! | [`Compiler::parse`] | 单元 | 注册源文件，按种类解析，返回是否成功 |
//! | [`Compiler::analyze_dependencies`] | 整批 | 只处理恰好处于 `Parsed` 的单元，一次批量调用 |
//! | [`Compiler::transform_dependencies`] | 整批 | 依赖优先，已转换的单元跳过 |
//! | [`Compiler::check_for_errors`] | 整批 | 阶段内有错误时，所有未完成单元失败 |

use std::time::Instant;

use hashbrown::HashSet;
use indexmap::IndexMap;
use tracing::debug;

use super::module::{LoadError, Project, SourceFile, Unit, UnitCache, UnitId, UnitState};
use super::pipeline::{Phase, PhaseStats};
use super::toolchain::{AnalysisTarget, Language, Namespace, Toolchain, TransformContext};
use crate::util::diagnostic::{Checkpoint, Reporter};

/// 编译器
///
/// 持有会话级共享状态：诊断报告器与全图项目上下文。
#[derive(Debug)]
pub struct Compiler<L: Language> {
    reporter: Reporter,
    project: Project,
    toolchain: Toolchain<L>,
    stats: PhaseStats,
}

impl<L: Language> Compiler<L> {
    /// 创建编译器
    pub fn new(
        toolchain: Toolchain<L>,
        project: Project,
    ) -> Self {
        Self {
            reporter: Reporter::new(),
            project,
            toolchain,
            stats: PhaseStats::new(),
        }
    }

    #[inline]
    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    #[inline]
    pub fn project(&self) -> &Project {
        &self.project
    }

    #[inline]
    pub fn project_mut(&mut self) -> &mut Project {
        &mut self.project
    }

    #[inline]
    pub fn stats(&self) -> &PhaseStats {
        &self.stats
    }

    /// 记录获取阶段的耗时
    pub(crate) fn record_fetch(
        &mut self,
        started: Instant,
    ) {
        self.stats.record(Phase::Fetch, started);
    }

    /// 解析单元
    ///
    /// 对非法输入不返回错误，只报告诊断并返回 `false`；单元状态保持不变。
    pub fn parse(
        &mut self,
        unit: &mut Unit<L>,
    ) -> bool {
        let started = Instant::now();
        let checkpoint = self.reporter.checkpoint();

        let source = SourceFile::new(unit.address(), unit.text().unwrap_or_default());
        self.project.add_file(source.clone());
        let tree = self
            .toolchain
            .grammar
            .parse(&source, unit.kind(), &self.reporter);
        self.stats.record(Phase::Parse, started);

        if self.reporter.had_error_since(checkpoint) {
            debug!(unit = %unit.address(), "parse failed");
            return false;
        }

        self.project.set_parsed(unit.address());
        unit.set_tree(tree);
        true
    }

    /// 检查点之后第一条错误的描述
    pub fn error_message_since(
        &self,
        checkpoint: Checkpoint,
    ) -> String {
        self.reporter
            .errors_since(checkpoint)
            .first()
            .map(|d| d.message.clone())
            .unwrap_or_else(|| "unknown error".to_string())
    }

    /// 为解析成功的单元注册外部模块符号，任何来源都注册
    pub fn add_external_module(
        &mut self,
        unit: &Unit<L>,
    ) {
        self.project.add_external_module(unit.address());
    }

    /// 模块已发布的导出值，按导出声明顺序；未发布的名字跳过
    pub fn module_exports(
        &self,
        address: &str,
        namespace: &Namespace<L::Value>,
    ) -> IndexMap<String, L::Value> {
        let Some(symbol) = self.project.external_module(address) else {
            return IndexMap::new();
        };
        symbol
            .export_names()
            .into_iter()
            .filter_map(|name| {
                self.toolchain
                    .executor
                    .exported_value(address, name, namespace)
                    .map(|value| (name.to_string(), value))
            })
            .collect()
    }

    /// 单元的导入说明符，按声明顺序
    pub fn module_specifiers(
        &self,
        unit: &Unit<L>,
    ) -> Vec<String> {
        unit.tree()
            .map(|tree| self.toolchain.specifiers.module_specifiers(tree))
            .unwrap_or_default()
    }

    /// 全图语义分析
    ///
    /// 只处理恰好处于 `Parsed` 的单元，以一次批量调用完成；跨模块绑定需要共享符号表。
    pub fn analyze_dependencies(
        &mut self,
        cache: &mut UnitCache<L>,
        ids: &[UnitId],
    ) -> Result<(), Vec<UnitId>> {
        let checkpoint = self.reporter.checkpoint();
        let started = Instant::now();

        let targets: Vec<AnalysisTarget<'_, L>> = ids
            .iter()
            .map(|&id| &cache[id])
            .filter(|unit| unit.state() == UnitState::Parsed)
            .filter_map(|unit| {
                unit.tree().map(|tree| AnalysisTarget {
                    address: unit.address(),
                    kind: unit.kind(),
                    tree,
                })
            })
            .collect();

        if !targets.is_empty() {
            debug!(units = targets.len(), "analyzing batch");
            self.toolchain
                .analyzer
                .analyze_trees(&targets, &mut self.project, &self.reporter);
            self.stats.record(Phase::Analyze, started);
        }

        self.check_for_errors(cache, ids, Phase::Analyze, checkpoint)
    }

    /// 依赖优先转换
    ///
    /// 已到达 `Transformed` 的单元不再转换，菱形依赖中的共享单元只转换一次；
    /// 进行中集合保证环形依赖也能终止。
    pub fn transform_dependencies(
        &mut self,
        cache: &mut UnitCache<L>,
        ids: &[UnitId],
    ) -> Result<(), Vec<UnitId>> {
        let checkpoint = self.reporter.checkpoint();
        let mut in_progress = HashSet::new();
        for &id in ids {
            self.transform_unit(cache, id, &mut in_progress);
        }
        self.check_for_errors(cache, ids, Phase::Transform, checkpoint)
    }

    fn transform_unit(
        &mut self,
        cache: &mut UnitCache<L>,
        id: UnitId,
        in_progress: &mut HashSet<UnitId>,
    ) {
        if cache[id].state() != UnitState::Parsed || !in_progress.insert(id) {
            return;
        }

        let dependencies = cache[id].dependencies().to_vec();
        for dependency in dependencies {
            self.transform_unit(cache, dependency, in_progress);
        }

        let started = Instant::now();
        let unit = &cache[id];
        let Some(tree) = unit.tree() else {
            return;
        };
        let context = TransformContext {
            address: unit.address(),
            kind: unit.kind(),
            project: &self.project,
        };
        let transformed = self
            .toolchain
            .transformer
            .transform(tree, &context, &self.reporter);
        self.stats.record(Phase::Transform, started);

        let unit = &mut cache[id];
        unit.set_transformed(transformed);
        if let Err(e) = unit.set_state(UnitState::Transformed) {
            tracing::warn!("{}", e);
        }
    }

    /// 阶段错误检查
    ///
    /// 检查点之后记录过错误时，每个尚未完成的单元都失败：
    /// 自己有诊断的单元得到该阶段的错误，其余单元以第一条错误为原因被中止。
    pub fn check_for_errors(
        &mut self,
        cache: &mut UnitCache<L>,
        ids: &[UnitId],
        phase: Phase,
        checkpoint: Checkpoint,
    ) -> Result<(), Vec<UnitId>> {
        let errors = self.reporter.errors_since(checkpoint);
        let Some(first) = errors.first() else {
            return Ok(());
        };

        let origin = LoadError::for_phase(
            phase,
            first.address.clone().unwrap_or_default(),
            first.message.clone(),
        );
        tracing::warn!(%phase, "{}", origin);

        let mut failed = Vec::new();
        for &id in ids {
            let unit = &mut cache[id];
            if unit.state() >= UnitState::Complete {
                continue;
            }
            let address = unit.address().to_string();
            let error = match errors
                .iter()
                .find(|d| d.address.as_deref() == Some(address.as_str()))
            {
                Some(own) => LoadError::for_phase(phase, address, own.message.clone()),
                None => LoadError::Aborted {
                    address,
                    cause: Box::new(origin.clone()),
                },
            };
            unit.fail(error);
            failed.push(id);
        }
        Err(failed)
    }

    /// 把转换后的树写成可执行文本
    pub fn write(
        &self,
        unit: &Unit<L>,
    ) -> Option<String> {
        unit.transformed()
            .map(|tree| self.toolchain.serializer.write(tree))
    }

    /// 执行单元
    pub fn execute(
        &mut self,
        unit: &Unit<L>,
        namespace: &mut Namespace<L::Value>,
    ) -> Result<L::Value, String> {
        let code = self
            .write(unit)
            .ok_or_else(|| format!("'{}' has not been transformed", unit.address()))?;
        let started = Instant::now();
        let result = self.toolchain.executor.execute(&code, namespace);
        self.stats.record(Phase::Evaluate, started);
        result
    }
}
