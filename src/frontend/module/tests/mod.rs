//! 加载器测试


use std::cell::RefCell;
use std::rc::Rc;

use crate::frontend::module::{ListenerPair, LoadError, Loader, MemoryFetcher};
use crate::frontend::plain::{self, Plain, Value};

/// 结算记录
type Settled = Rc<RefCell<Vec<Result<Value, LoadError>>>>;

fn loader_with(fetcher: &Rc<MemoryFetcher>) -> Loader<Plain> {
    Loader::builder(plain::toolchain())
        .fetcher(Rc::clone(fetcher))
        .build()
        .unwrap()
}

fn sources(entries: &[(&str, &str)]) -> Rc<MemoryFetcher> {
    let fetcher = MemoryFetcher::new();
    for (address, text) in entries {
        fetcher.insert(*address, *text);
    }
    Rc::new(fetcher)
}

fn deferred_sources(entries: &[(&str, &str)]) -> Rc<MemoryFetcher> {
    let fetcher = MemoryFetcher::deferred();
    for (address, text) in entries {
        fetcher.insert(*address, *text);
    }
    Rc::new(fetcher)
}

/// 把结算结果记录进共享列表的监听对
fn recording(settled: &Settled) -> ListenerPair<Plain> {
    let ok = Rc::clone(settled);
    let err = Rc::clone(settled);
    ListenerPair::new(
        move |value: &Value| ok.borrow_mut().push(Ok(value.clone())),
        move |error: &LoadError| err.borrow_mut().push(Err(error.clone())),
    )
}
