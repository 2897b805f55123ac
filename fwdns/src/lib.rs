pub mod errors;
pub mod labelstring;
pub mod message;
pub mod parser;
pub mod reader;
pub mod structs;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
