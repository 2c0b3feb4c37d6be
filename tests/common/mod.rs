#![allow(unused_imports)]

pub use flashrun_test_utils::*;
