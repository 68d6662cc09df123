//! Shared test utilities for the qlreport workspace.
//!
//! This crate provides:
//! - **arb**: Proptest strategies for result sets, tuples and index items
//! - **fixtures**: Sample decoder output, `bqrs info` output, SARIF and metadata
//! - **schema**: JSON schema validators for the serialized DTOs
//!
//! # Example
//!
//! ```rust,ignore
//! use qlreport_testkit::arb;
//! use proptest::prelude::*;
//!
//! proptest! {
//!     fn ranked(items in prop::collection::vec(arb::arb_index_item(), 0..10)) {
//!         // ...
//!     }
//! }
//! ```

pub mod arb;
pub mod fixtures;
pub mod schema;

pub use arb::{
    arb_alert_tuple, arb_compatible_kinds, arb_entity, arb_index_item, arb_nwo, arb_raw_result_set,
};
pub use fixtures::{sample_artifacts, sample_results};
pub use schema::{validate_config_file, validate_result_index, validate_run_metadata};
