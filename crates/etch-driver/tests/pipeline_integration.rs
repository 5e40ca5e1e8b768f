//! End-to-end tests driving the whole pipeline through `etch_driver::run`,
//! directly exercising spec.md §8's scenarios S1, S2, S3, S4-shaped
//! failures and S5.

use etch_driver::{Config, Mode};
use etch_vm::Value;

fn config(name: &str) -> Config {
    Config::new(format!("<demo:{name}>"), Mode::Debug, false)
}

#[test]
fn s1_arithmetic_prints_five_and_returns_void() {
    let program = etch_driver::demos::lookup("arithmetic").unwrap();
    let output = etch_driver::run(program, &config("arithmetic")).unwrap();
    assert_eq!(output.value, Value::Void);
    assert!(!output.used_cache);
}

#[test]
fn s2_division_by_zero_is_rejected_by_the_prover() {
    let program = etch_driver::demos::lookup("division-by-zero").unwrap();
    let err = etch_driver::run(program, &config("division-by-zero")).unwrap_err();
    assert!(matches!(err, etch_driver::DriverError::Prove(_)));
}

#[test]
fn s3_generic_add_instantiates_both_monomorphic_instances() {
    let program = etch_driver::demos::lookup("generic-add").unwrap();
    let output = etch_driver::run(program, &config("generic-add")).unwrap();
    assert_eq!(output.value, Value::Void);
}

#[test]
fn s5_comptime_inject_runs_to_completion() {
    let program = etch_driver::demos::lookup("comptime-inject").unwrap();
    let output = etch_driver::run(program, &config("comptime-inject")).unwrap();
    assert_eq!(output.value, Value::Void);
}

#[test]
fn unknown_demo_name_is_not_in_the_registry() {
    assert!(etch_driver::demos::lookup("does-not-exist").is_none());
}

#[test]
fn release_mode_skips_debug_info_emission() {
    assert!(!Mode::Release.emits_debug_info());
    assert!(Mode::Debug.emits_debug_info());
}
