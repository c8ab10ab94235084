//! Integration tests - Full resolution of statement trees through the public API
//!
//! These tests drive `MappingResolutionStage::resolve_query` against the YAML
//! shop mapping under `tests/rust/fixtures/`.

mod fixtures;

mod error_handling_tests;
mod grouping_tests;
mod resolution_pipeline_tests;
