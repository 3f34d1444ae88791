//! Common test utilities for douk-hooks integration tests

#[allow(dead_code)]
pub mod reporters;

#[allow(unused_imports)]
pub use reporters::*;
