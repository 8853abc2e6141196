//! Command implementations for the `pcms` binary

pub mod password;
pub mod tree;
