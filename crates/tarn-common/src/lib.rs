//! Shared primitives for the Tarn compiler.
//!
//! Everything in this crate is small, dependency-light data that several
//! compiler crates need to agree on:
//!
//! - [`span`]: byte-offset source spans

pub mod span;

pub use span::Span;
