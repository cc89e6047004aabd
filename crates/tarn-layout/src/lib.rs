//! Runtime-representation inference for the Tarn compiler.
//!
//! The type checker needs to know, for every type, how its values live at
//! runtime before code generation can begin. This crate is that engine:
//!
//! - [`sort`]: the fully concrete representations (`value`, `void`) and the
//!   unification table that resolves deferred ones
//! - [`layout`]: the lattice the checker actually manipulates (`any`, the
//!   sorts, and the unboxed immediates), with meet and sub-layout relations
//! - [`violation`]: constraint failures, returned as values for the caller
//!   to report
//!
//! A checking session owns one [`SortTable`]; layouts are cheap immutable
//! values whose only mutable state lives in the sort variables the table
//! owns.

pub mod layout;
pub mod sort;
pub mod violation;

pub use layout::{Layout, LayoutKind, LayoutReason};
pub use sort::{Sort, SortConst, SortTable, SortVar};
pub use violation::Violation;
