//! S6: compiling and executing twice against the same on-disk source file
//! produces the same result the second time via the cache, not by
//! recompiling (spec.md §8 S6, Q5/Q6).

use std::fs;

use etch_driver::{Config, Mode};
use etch_vm::Value;

#[test]
fn a_second_run_against_the_same_source_file_reuses_the_cached_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let source_path = dir.path().join("arithmetic.etch");
    fs::write(&source_path, "let x: int = 2 + 3;\nprint(x);\n").unwrap();

    let config = Config::new(source_path.clone(), Mode::Debug, false);

    let first = etch_driver::run(etch_driver::demos::lookup("arithmetic").unwrap(), &config).unwrap();
    assert!(!first.used_cache);
    assert_eq!(first.value, Value::Void);

    let second = etch_driver::run(etch_driver::demos::lookup("arithmetic").unwrap(), &config).unwrap();
    assert!(second.used_cache);
    assert_eq!(second.value, first.value);

    let cache_path = dir.path().join(".etch-cache").join("arithmetic.etch.etchc");
    assert!(cache_path.exists());
}

#[test]
fn a_changed_source_file_invalidates_the_cache() {
    let dir = tempfile::tempdir().unwrap();
    let source_path = dir.path().join("arithmetic.etch");
    fs::write(&source_path, "let x: int = 2 + 3;\nprint(x);\n").unwrap();
    let config = Config::new(source_path.clone(), Mode::Debug, false);
    etch_driver::run(etch_driver::demos::lookup("arithmetic").unwrap(), &config).unwrap();

    fs::write(&source_path, "let x: int = 2 + 3;\nprint(x); // changed\n").unwrap();
    let second = etch_driver::run(etch_driver::demos::lookup("arithmetic").unwrap(), &config).unwrap();
    assert!(!second.used_cache);
}
