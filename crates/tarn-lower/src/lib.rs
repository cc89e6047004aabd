//! Array-comprehension lowering for the Tarn compiler.
//!
//! Comprehensions arrive as surface syntax generic over the host
//! expression type ([`ast`]), get their clauses translated into loops and
//! iterator bindings ([`comp`]), and leave as imperative buffer-filling
//! code in the core IR ([`ir`]). The host compiler plugs in through
//! [`TranslateExpr`], which translates its own expressions and reports
//! array element kinds; [`lower_comprehension`] does the rest.

pub mod ast;
pub mod comp;
pub mod ir;

pub use ast::{Clause, Comprehension, GenIterator, Generator, Pattern, Scope, TranslateExpr};
pub use comp::lower_comprehension;
pub use ir::{ArrayKind, Binop, Direction, Expr, Ident, IdentGen};
