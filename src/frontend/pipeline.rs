//! 编译流水线阶段
//!
//! 描述单元经过的各个阶段，以及按阶段累计的调用次数与耗时。

use std::fmt;
use std::time::{Duration, Instant};

/// 流水线阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    /// 获取源文本
    Fetch,
    /// 语法分析
    Parse,
    /// 全图语义分析
    Analyze,
    /// 代码转换
    Transform,
    /// 执行
    Evaluate,
}

impl Phase {
    /// 所有阶段，按流水线顺序
    pub const ALL: [Phase; 5] = [
        Phase::Fetch,
        Phase::Parse,
        Phase::Analyze,
        Phase::Transform,
        Phase::Evaluate,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Phase {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Phase::Fetch => write!(f, "fetch"),
            Phase::Parse => write!(f, "parse"),
            Phase::Analyze => write!(f, "analyze"),
            Phase::Transform => write!(f, "transform"),
            Phase::Evaluate => write!(f, "evaluate"),
        }
    }
}

/// 单个阶段的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseRecord {
    /// 调用次数
    pub calls: usize,
    /// 累计耗时
    pub elapsed: Duration,
}

/// 按阶段累计的统计信息
#[derive(Debug, Clone, Default)]
pub struct PhaseStats {
    records: [PhaseRecord; 5],
}

impl PhaseStats {
    /// 创建空统计
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次阶段调用
    pub fn record(
        &mut self,
        phase: Phase,
        started: Instant,
    ) {
        let record = &mut self.records[phase.index()];
        record.calls += 1;
        record.elapsed += started.elapsed();
    }

    /// 获取某阶段的统计
    pub fn get(
        &self,
        phase: Phase,
    ) -> PhaseRecord {
        self.records[phase.index()]
    }

    /// 按流水线顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = (Phase, PhaseRecord)> + '_ {
        Phase::ALL.iter().map(move |&phase| (phase, self.get(phase)))
    }
}
