//! Whole-graph loading through the public API

use std::cell::RefCell;
use std::rc::Rc;

use codeloader::frontend::module::{ListenerPair, Loader, MemoryFetcher, UnitKind, UnitState};
use codeloader::frontend::plain::Value;

use crate::common::{analyses, diamond, executions, journal, parses, recording_toolchain, transforms};

#[test]
fn test_diamond_end_to_end() {
    let journal = journal();
    let fetcher = Rc::new(diamond());
    let loader = Loader::builder(recording_toolchain(&journal))
        .fetcher(Rc::clone(&fetcher))
        .build()
        .unwrap();

    let delivered: Rc<RefCell<Vec<Value>>> = Rc::default();
    let sink = Rc::clone(&delivered);
    let main = loader
        .load_with_listener(
            "/main",
            UnitKind::Script,
            ListenerPair::new(
                move |value: &Value| sink.borrow_mut().push(value.clone()),
                |error| panic!("load failed: {}", error),
            ),
        )
        .unwrap();
    loader.run_until_idle();

    for address in ["/main", "/a", "/b", "/c"] {
        assert_eq!(fetcher.fetch_count(address), 1, "fetches of {}", address);
    }
    let mut parsed = parses(&journal);
    parsed.sort();
    assert_eq!(parsed, vec!["/a", "/b", "/c", "/main"]);

    let analyses = analyses(&journal);
    assert_eq!(analyses.len(), 1);
    assert_eq!(analyses[0].len(), 4);

    assert_eq!(transforms(&journal), vec!["/c", "/a", "/b", "/main"]);

    let executed = executions(&journal);
    assert_eq!(executed.len(), 4);
    assert_eq!(executed[0], Value::from("C"));
    assert!(executed[1..3].contains(&Value::from("A")));
    assert!(executed[1..3].contains(&Value::from("B")));
    assert_eq!(executed[3], Value::from("23MAIN"));

    assert_eq!(delivered.borrow().as_slice(), &[Value::from("23MAIN")]);
    assert_eq!(loader.state(main), Some(UnitState::Complete));
}

#[test]
fn test_later_batches_reuse_completed_units() {
    let journal = journal();
    let loader = Loader::builder(recording_toolchain(&journal))
        .fetcher(diamond())
        .build()
        .unwrap();

    loader.load("/a", UnitKind::Module);
    loader.run_until_idle();
    assert_eq!(transforms(&journal), vec!["/c", "/a"]);

    loader.load("/main", UnitKind::Script);
    loader.run_until_idle();
    assert_eq!(transforms(&journal), vec!["/c", "/a", "/b", "/main"]);
    assert_eq!(analyses(&journal).len(), 2);
    assert_eq!(analyses(&journal)[1].len(), 2);
}

#[test]
fn test_concurrent_requests_join_one_batch() {
    let journal = journal();
    let fetcher = Rc::new(
        MemoryFetcher::deferred()
            .with_source("/x", "1")
            .with_source("/y", "2"),
    );
    let loader = Loader::builder(recording_toolchain(&journal))
        .fetcher(Rc::clone(&fetcher))
        .build()
        .unwrap();

    let x = loader.load("/x", UnitKind::Script);
    let y = loader.load("/y", UnitKind::Script);
    fetcher.release("/x");
    loader.poll();
    assert_eq!(loader.state(x), Some(UnitState::Parsed));

    fetcher.release("/y");
    loader.run_until_idle();
    assert_eq!(analyses(&journal).len(), 1);
    assert_eq!(loader.result(x), Some(Value::Int(1)));
    assert_eq!(loader.result(y), Some(Value::Int(2)));
}
