// Library crate: re-export harness modules for reuse by the CLI and tests.

pub mod backend;
pub mod bucket;
pub mod config;
pub mod keyspace;
pub mod runner;
pub mod scenarios;
pub mod verify;
