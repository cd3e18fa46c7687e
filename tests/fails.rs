mod common;
use common::run_pipeline;

#[test]
#[should_panic]
fn fail_lexing() {
    run_pipeline(include_str!("fails/fail_lexing.cay"));
}

#[test]
#[should_panic]
fn fail_parsing() {
    run_pipeline(include_str!("fails/fail_parsing.cay"));
}

#[test]
#[should_panic]
fn fail_binding() {
    run_pipeline(include_str!("fails/fail_binding.cay"));
}

#[test]
#[should_panic]
fn fail_typechecking() {
    run_pipeline(include_str!("fails/fail_typechecking.cay"));
}
