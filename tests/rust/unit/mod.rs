//! Unit tests - Configuration and mapping loading through the public API
//!
//! These tests touch the filesystem and the process environment, nothing else.

mod config_tests;
mod mapping_schema_tests;
