//! Host-facing callback surface

use std::cell::RefCell;
use std::rc::Rc;

use codeloader::embedded::{CodeLoader, LoadedModule};
use codeloader::frontend::module::{Fetcher, LoadError, Loader, LoaderError, MemoryFetcher};
use codeloader::frontend::plain::{self, Plain, Value};

fn host(fetcher: impl Fetcher + 'static) -> CodeLoader<Plain> {
    let loader = Loader::builder(plain::toolchain())
        .base_address("/app/")
        .fetcher(fetcher)
        .build()
        .unwrap();
    CodeLoader::new(loader)
}

#[test]
fn test_import_hands_back_module() {
    let host = host(MemoryFetcher::new().with_source("/app/lib", "export n = 1\n\"lib\""));
    let seen: Rc<RefCell<Option<LoadedModule<Value>>>> = Rc::default();
    let slot = Rc::clone(&seen);

    host.import(
        "./lib",
        move |module| *slot.borrow_mut() = Some(module.clone()),
        |e| panic!("{}", e),
    )
    .unwrap();
    assert!(seen.borrow().is_none());

    host.run_until_idle();
    let module = seen.borrow().clone().unwrap();
    assert_eq!(module.address, "/app/lib");
    assert_eq!(module.value, Value::from("lib"));
    assert_eq!(module.exports.get("n"), Some(&Value::Int(1)));
}

#[test]
fn test_import_exposes_exports_in_declaration_order() {
    let host = host(
        MemoryFetcher::new()
            .with_source("/app/dep", "export base = 10")
            .with_source("/app/lib", "import base from \"./dep\"\nexport m = base + 2\nexport n = 1"),
    );
    let seen: Rc<RefCell<Option<LoadedModule<Value>>>> = Rc::default();
    let slot = Rc::clone(&seen);

    host.import(
        "/app/lib",
        move |module| *slot.borrow_mut() = Some(module.clone()),
        |e| panic!("{}", e),
    )
    .unwrap();
    host.run_until_idle();

    let module = seen.borrow().clone().unwrap();
    assert_eq!(module.value, Value::Unit);
    let exports: Vec<_> = module.exports.into_iter().collect();
    assert_eq!(
        exports,
        vec![("m".to_string(), Value::Int(12)), ("n".to_string(), Value::Int(1))]
    );
}

#[test]
fn test_load_reports_errors_through_callback() {
    let host = host(MemoryFetcher::new());
    let failure: Rc<RefCell<Option<LoadError>>> = Rc::default();
    let slot = Rc::clone(&failure);

    host.load(
        "missing",
        |_| panic!("should not succeed"),
        move |e| *slot.borrow_mut() = Some(e.clone()),
    )
    .unwrap();
    host.run_until_idle();

    match failure.borrow().as_ref() {
        Some(LoadError::Fetch { address, .. }) => assert_eq!(address, "/app/missing"),
        other => panic!("expected fetch error, got {:?}", other),
    };
}

#[test]
fn test_eval_and_globals() {
    let host = host(MemoryFetcher::new());
    host.define_global("answer", Value::Int(41));

    assert_eq!(host.eval("answer + 1"), Ok(Value::Int(42)));
    assert!(matches!(
        host.eval("import \"./nowhere\"\n1"),
        Err(LoaderError::Unresolved { .. })
    ));
}

#[test]
fn test_eval_async_waits_for_imports() {
    let fetcher = Rc::new(MemoryFetcher::deferred().with_source("/app/m", "export k = 2"));
    let host = host(Rc::clone(&fetcher));
    let result: Rc<RefCell<Option<Value>>> = Rc::default();
    let slot = Rc::clone(&result);

    host.eval_async(
        "import k from \"./m\"\nk + 40",
        move |v| *slot.borrow_mut() = Some(v.clone()),
        |e| panic!("{}", e),
    );
    assert!(result.borrow().is_none());
    assert!(!host.run_until_idle_timeout(std::time::Duration::from_millis(5)));

    fetcher.release_all();
    host.run_until_idle();
    assert_eq!(*result.borrow(), Some(Value::Int(42)));
}
