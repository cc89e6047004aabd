//! Let bindings for generator iterators, and the usage witness that
//! decides which of them exist at all.
//!
//! Every value a generator evaluates (range bounds, the iterated array,
//! its length) is bound to a fresh variable exactly once, so the emitted
//! code never re-runs user expressions. Bindings that only the fixed-size
//! strategy reads are guarded by [`IfReused`], which ties "did we create
//! this" to "will anyone read it twice" in the type.

use crate::ir::{Direction, Expr, Ident};

// ── Usage witness ───────────────────────────────────────────────────────

/// How many times the translation will read a generator's bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Usage {
    /// Read once, by the loop that consumes the iterator.
    Once,
    /// Read again after the loops are built (size and emptiness tests).
    Many,
}

/// A value that exists only when its creator promised to read it again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IfReused<T> {
    Unused,
    Used(T),
}

impl<T> IfReused<T> {
    /// Run `make` only under [`Usage::Many`]; [`Usage::Once`] skips it
    /// and records nothing.
    pub fn new(usage: Usage, make: impl FnOnce() -> T) -> IfReused<T> {
        match usage {
            Usage::Once => IfReused::Unused,
            Usage::Many => IfReused::Used(make()),
        }
    }
}

// ── Let bindings ────────────────────────────────────────────────────────

/// A pending `let`: an identifier and the value it will be bound to,
/// waiting for the body it should wrap.
#[derive(Debug, Clone, PartialEq)]
pub struct LetBinding {
    pub ident: Ident,
    pub mutable: bool,
    pub value: Expr,
}

impl LetBinding {
    pub fn new(ident: Ident, value: Expr) -> LetBinding {
        LetBinding {
            ident,
            mutable: false,
            value,
        }
    }

    pub fn new_mutable(ident: Ident, value: Expr) -> LetBinding {
        LetBinding {
            ident,
            mutable: true,
            value,
        }
    }

    /// A read of the bound variable.
    pub fn var(&self) -> Expr {
        Expr::Var(self.ident.clone())
    }

    /// The finished `let .. in body`.
    pub fn bind_around(self, body: Expr) -> Expr {
        Expr::Let {
            ident: self.ident,
            mutable: self.mutable,
            value: Box::new(self.value),
            body: Box::new(body),
        }
    }
}

/// Wrap `body` in every binding, first binding outermost, so values are
/// evaluated in the order they were pushed.
pub fn bind_all(bindings: Vec<LetBinding>, body: Expr) -> Expr {
    bindings
        .into_iter()
        .rev()
        .fold(body, |acc, binding| binding.bind_around(acc))
}

// ── Per-generator records ───────────────────────────────────────────────

/// The bindings one generator produced, kept structured so the fixed-size
/// strategy can read bounds and lengths back out by role.
#[derive(Debug)]
pub enum IterBindings {
    Range {
        start: LetBinding,
        stop: LetBinding,
        /// Needed a second time only to size the range.
        direction: IfReused<Direction>,
    },
    Array {
        iter_arr: LetBinding,
        /// The length is bound to a variable only when both the loop bound
        /// and the size computation will read it.
        iter_len: IfReused<LetBinding>,
    },
}

impl IterBindings {
    /// Surrender the bindings in evaluation order.
    pub fn into_bindings(self) -> Vec<LetBinding> {
        match self {
            IterBindings::Range { start, stop, .. } => vec![start, stop],
            IterBindings::Array { iter_arr, iter_len } => {
                let mut bindings = vec![iter_arr];
                if let IfReused::Used(len) = iter_len {
                    bindings.push(len);
                }
                bindings
            }
        }
    }
}
