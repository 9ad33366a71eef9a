//! Abort-all behavior seen from listeners

use std::cell::RefCell;
use std::rc::Rc;

use codeloader::frontend::module::{
    ListenerPair, LoadError, Loader, MemoryFetcher, UnitKind, UnitState,
};
use codeloader::frontend::plain::{self, Plain, Value};

type Outcomes = Rc<RefCell<Vec<(String, Result<Value, LoadError>)>>>;

fn listener(
    outcomes: &Outcomes,
    label: &str,
) -> ListenerPair<Plain> {
    let ok = (Rc::clone(outcomes), label.to_string());
    let err = (Rc::clone(outcomes), label.to_string());
    ListenerPair::new(
        move |value: &Value| ok.0.borrow_mut().push((ok.1, Ok(value.clone()))),
        move |error: &LoadError| err.0.borrow_mut().push((err.1, Err(error.clone()))),
    )
}

#[test]
fn test_sibling_parse_error_reaches_every_listener() {
    let fetcher = Rc::new(
        MemoryFetcher::deferred()
            .with_source("/main", "import \"/good\"\nimport \"/bad\"\n1")
            .with_source("/good", "export g = 1")
            .with_source("/bad", "export = 2"),
    );
    let loader = Loader::builder(plain::toolchain())
        .fetcher(Rc::clone(&fetcher))
        .build()
        .unwrap();
    let outcomes = Outcomes::default();

    loader
        .load_with_listener("/main", UnitKind::Script, listener(&outcomes, "main"))
        .unwrap();
    fetcher.release("/main");
    loader.poll();

    let good = loader.lookup("/good", UnitKind::Module).unwrap();
    loader.add_listener(good, listener(&outcomes, "good")).unwrap();
    fetcher.release("/good");
    loader.poll();
    assert_eq!(loader.state(good), Some(UnitState::Parsed));

    fetcher.release("/bad");
    loader.run_until_idle();

    let outcomes = outcomes.borrow();
    assert_eq!(outcomes.len(), 2);
    for (label, outcome) in outcomes.iter() {
        let error = outcome.as_ref().unwrap_err();
        assert_eq!(error.root_cause().address(), "/bad", "{}", label);
        assert!(matches!(error.root_cause(), LoadError::Parse { .. }));
    }
    for id in loader.unit_ids() {
        assert_eq!(loader.state(id), Some(UnitState::Error));
    }
}

#[test]
fn test_parse_error_aborts_unrelated_pending_load() {
    let fetcher = Rc::new(
        MemoryFetcher::deferred()
            .with_source("/x", "1")
            .with_source("/y", "let = 1"),
    );
    let loader = Loader::builder(plain::toolchain())
        .fetcher(Rc::clone(&fetcher))
        .build()
        .unwrap();
    let outcomes = Outcomes::default();

    let x = loader
        .load_with_listener("/x", UnitKind::Script, listener(&outcomes, "x"))
        .unwrap();
    let y = loader
        .load_with_listener("/y", UnitKind::Script, listener(&outcomes, "y"))
        .unwrap();
    fetcher.release("/x");
    loader.poll();
    assert_eq!(loader.state(x), Some(UnitState::Parsed));
    assert!(outcomes.borrow().is_empty());

    fetcher.release("/y");
    loader.run_until_idle();

    assert_eq!(loader.state(x), Some(UnitState::Error));
    assert_eq!(loader.state(y), Some(UnitState::Error));
    let outcomes = outcomes.borrow();
    let labels: Vec<&str> = outcomes.iter().map(|(l, _)| l.as_str()).collect();
    assert_eq!(labels.len(), 2);
    assert!(labels.contains(&"x") && labels.contains(&"y"));
    for (label, outcome) in outcomes.iter() {
        let error = outcome.as_ref().unwrap_err();
        assert!(matches!(error.root_cause(), LoadError::Parse { .. }), "{}", label);
        assert_eq!(error.root_cause().address(), "/y", "{}", label);
        if label == "x" {
            assert!(matches!(error, LoadError::Aborted { .. }));
        }
    }
}

#[test]
fn test_completed_units_keep_results_after_later_failure() {
    let fetcher = MemoryFetcher::new()
        .with_source("/ok", "export v = 5\nv")
        .with_source("/broken", "import v from \"/ok\"\nthrow v");
    let loader = Loader::builder(plain::toolchain())
        .fetcher(fetcher)
        .build()
        .unwrap();

    let ok = loader.load("/ok", UnitKind::Module);
    loader.run_until_idle();
    assert_eq!(loader.result(ok), Some(Value::Int(5)));

    let broken = loader.load("/broken", UnitKind::Script);
    loader.run_until_idle();

    assert_eq!(loader.state(ok), Some(UnitState::Complete));
    assert_eq!(loader.result(ok), Some(Value::Int(5)));
    match loader.error(broken) {
        Some(LoadError::Execution { message, .. }) => assert_eq!(message, "uncaught 5"),
        other => panic!("expected execution error, got {:?}", other),
    }
}

#[test]
fn test_each_listener_fires_exactly_once_on_failure() {
    let fetcher = MemoryFetcher::new().with_source("/a", "throw \"x\"");
    let loader = Loader::builder(plain::toolchain())
        .fetcher(fetcher)
        .build()
        .unwrap();
    let outcomes = Outcomes::default();

    let a = loader
        .load_with_listener("/a", UnitKind::Script, listener(&outcomes, "first"))
        .unwrap();
    loader.add_listener(a, listener(&outcomes, "second")).unwrap();
    loader.run_until_idle();
    loader.run_until_idle();

    let labels: Vec<String> = outcomes.borrow().iter().map(|(l, _)| l.clone()).collect();
    assert_eq!(labels, vec!["first", "second"]);
    assert!(outcomes.borrow().iter().all(|(_, o)| o.is_err()));
}
