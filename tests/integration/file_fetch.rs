//! Loading graphs from disk

use std::fs;

use codeloader::frontend::module::{FileFetcher, LoadError, Loader, UnitKind, UnitState};
use codeloader::frontend::plain::{self, Value};
use codeloader::util::config::LoaderConfig;
use tempfile::TempDir;

fn write_tree(dir: &TempDir) {
    fs::create_dir_all(dir.path().join("lib")).unwrap();
    fs::write(
        dir.path().join("main.pl"),
        "import a from \"./lib/a.pl\"\nimport b from \"./lib/b.pl\"\na + b",
    )
    .unwrap();
    fs::write(
        dir.path().join("lib/a.pl"),
        "import base from \"./base.pl\"\nexport a = base + 1",
    )
    .unwrap();
    fs::write(
        dir.path().join("lib/b.pl"),
        "import base from \"../lib/base.pl\"\nexport b = base + 2",
    )
    .unwrap();
    fs::write(dir.path().join("lib/base.pl"), "export base = 10").unwrap();
}

#[test]
fn test_rooted_async_load() {
    let dir = TempDir::new().unwrap();
    write_tree(&dir);
    let loader = Loader::builder(plain::toolchain())
        .fetcher(FileFetcher::rooted(dir.path()))
        .build()
        .unwrap();

    let main = loader.load("/main.pl", UnitKind::Script);
    loader.run_until_idle();

    assert_eq!(loader.result(main), Some(Value::Int(23)));
    assert_eq!(loader.unit_ids().len(), 4);
    assert!(loader.lookup("/lib/base.pl", UnitKind::Module).is_some());
}

#[test]
fn test_sync_config_reads_inline() {
    let dir = TempDir::new().unwrap();
    write_tree(&dir);
    let loader = Loader::builder(plain::toolchain())
        .config(LoaderConfig::default().with_sync(true))
        .fetcher(FileFetcher::rooted(dir.path()))
        .build()
        .unwrap();

    let main = loader.load("/main.pl", UnitKind::Script);
    assert_eq!(loader.pending_fetches(), 0);
    assert_eq!(loader.state(main), Some(UnitState::Complete));
    assert_eq!(loader.result(main), Some(Value::Int(23)));
}

#[test]
fn test_run_file_entry_point() {
    let dir = TempDir::new().unwrap();
    write_tree(&dir);

    let value = codeloader::run_file(
        &dir.path().join("main.pl"),
        UnitKind::Script,
        LoaderConfig::default(),
    )
    .unwrap();
    assert_eq!(value, Value::Int(23));
}

#[test]
fn test_missing_import_on_disk() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("main.pl"), "import \"./absent.pl\"\n1").unwrap();
    let loader = Loader::builder(plain::toolchain())
        .fetcher(FileFetcher::rooted(dir.path()))
        .build()
        .unwrap();

    let main = loader.load("/main.pl", UnitKind::Script);
    loader.run_until_idle();

    let absent = loader.lookup("/absent.pl", UnitKind::Module).unwrap();
    assert!(matches!(loader.error(absent), Some(LoadError::Fetch { .. })));
    assert!(loader.error(main).unwrap().is_aborted());
}
