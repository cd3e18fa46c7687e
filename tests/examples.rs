mod common;
use common::run_pipeline;

#[test]
fn minimal() {
    run_pipeline(include_str!("../demos/minimal.cay"));
}

#[test]
fn language_tour() {
    run_pipeline(include_str!("../demos/language-tour.cay"));
}

#[test]
fn fib() {
    run_pipeline(include_str!("../demos/fib.cay"));
}

#[test]
fn planets() {
    run_pipeline(include_str!("../demos/planets.cay"));
}
