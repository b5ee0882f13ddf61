//! the test_utils folder here will share utils or test components between
//! unit tests of the different modules
mod common;
mod stub_module;

pub use common::*;
pub use stub_module::*;
