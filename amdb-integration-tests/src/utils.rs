//! Helpers shared by the tests in this crate.

pub mod logging;
pub mod test_tools;
