//! # codeloader 性能基准测试
//!
//! 使用 Criterion.rs 进行性能基准测试。
//!
//! ## 基准测试分组
//! - `graph`: 不同形状依赖图的完整加载（获取 → 解析 → 分析 → 转换 → 执行）
//! - `eval`: 内联求值
//!
//! ## 使用方法
//! ```bash
//! cargo bench        # 运行所有
//! cargo bench graph  # 只运行依赖图测试
//! ```

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use codeloader::frontend::module::{Loader, MemoryFetcher, UnitKind};
use codeloader::frontend::plain::{self, Plain, Value};

// ============================================================================
// 依赖图构造
// ============================================================================

/// 入口直接导入 `width` 个叶子模块
fn wide_graph(width: usize) -> MemoryFetcher {
    let fetcher = MemoryFetcher::new();
    let mut main = String::new();
    for i in 0..width {
        fetcher.insert(format!("/leaf{}", i), format!("export v{} = {}", i, i));
        main.push_str(&format!("import v{} from \"./leaf{}\"\n", i, i));
    }
    main.push_str("1");
    fetcher.insert("/main", main);
    fetcher
}

/// 长度为 `depth` 的导入链
fn deep_graph(depth: usize) -> MemoryFetcher {
    let fetcher = MemoryFetcher::new();
    fetcher.insert(format!("/m{}", depth), "export v = 0");
    for i in (0..depth).rev() {
        fetcher.insert(
            format!("/m{}", i),
            format!("import v from \"./m{}\"\nexport v = v + 1", i + 1),
        );
    }
    fetcher.insert("/main", "import v from \"./m0\"\nv");
    fetcher
}

fn run_graph(fetcher: MemoryFetcher) -> Value {
    let loader: Loader<Plain> = Loader::builder(plain::toolchain())
        .fetcher(fetcher)
        .build()
        .unwrap();
    let id = loader.load("/main", UnitKind::Script);
    loader.run_until_idle();
    loader.result(id).unwrap()
}

// ============================================================================
// Graph Benchmarks
// ============================================================================

fn bench_wide(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph/wide");
    for width in [8, 64, 256] {
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, &width| {
            b.iter(|| black_box(run_graph(wide_graph(width))))
        });
    }
    group.finish();
}

fn bench_deep(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph/deep");
    for depth in [8, 64, 256] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            b.iter(|| black_box(run_graph(deep_graph(depth))))
        });
    }
    group.finish();
}

fn bench_sync_load(c: &mut Criterion) {
    c.bench_function("graph/sync_wide_64", |b| {
        b.iter(|| {
            let loader: Loader<Plain> = Loader::builder(plain::toolchain())
                .fetcher(wide_graph(64))
                .sync(true)
                .build()
                .unwrap();
            black_box(loader.load_sync("/main", UnitKind::Script).unwrap())
        })
    });
}

// ============================================================================
// Eval Benchmarks
// ============================================================================

fn bench_eval(c: &mut Criterion) {
    let source: String = (0..200)
        .map(|i| format!("let x{} = {}\n", i, i))
        .chain(std::iter::once("x0 + x199".to_string()))
        .collect();
    c.bench_function("eval/200_lets", |b| {
        b.iter(|| black_box(codeloader::eval(&source).unwrap()))
    });
}

criterion_group!(graph, bench_wide, bench_deep, bench_sync_load);
criterion_group!(eval, bench_eval);
criterion_main!(graph, eval);
