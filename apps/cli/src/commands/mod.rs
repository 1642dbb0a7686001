//! Command implementations for the Resbench CLI.

pub mod bench;
pub mod gather;
pub mod manifest;
pub mod types;
