//! Operator layer entry.
//!
//! Extension path (minimal touch points):
//! 1) add the function variant in `spec.rs` (`BinaryFn` / `AggFn`),
//! 2) register its token in `catalog.rs` (`BINARY_METAS` / `UAGG_METAS`),
//! 3) teach `agg.rs` or `outer_agg.rs` the arithmetic and add parity tests
//!    between the fast and generic kernel paths.

pub mod agg;
pub mod binary;
pub mod catalog;
pub mod outer_agg;
pub mod spec;

pub use agg::{
    derive_aggregate_opcode, derive_correction_location, kahan_add, AggCell, AggregateOperator,
    AggregateUnaryOperator, AggregationBuffer,
};
pub use binary::BinaryOperator;
pub use catalog::{BinaryMeta, OperatorCatalog, UaggMeta};
pub use outer_agg::{choose_orientation, is_supported_fast_path, outer_aggregate};
pub use spec::{
    AggFn, BinaryFn, CombineRule, CorrectionLocation, Direction, Orientation,
    UAGG_OUTER_CHAIN_OPCODE,
};
