//! The growable output buffer used when a comprehension's size cannot be
//! computed up front.
//!
//! Protocol: allocate [`STARTING_SIZE`] slots, double whenever the write
//! index catches up with the capacity, and let the caller truncate to the
//! element count once the loops finish.

use crate::ir::{ArrayKind, Expr};

/// Initial capacity of a dynamically sized output buffer.
pub const STARTING_SIZE: i64 = 8;

/// Allocate the output buffer for a known element kind, every slot
/// default-initialized.
pub fn alloc(kind: ArrayKind, capacity: Expr) -> Expr {
    Expr::ArrayAlloc {
        kind,
        len: Box::new(capacity),
    }
}

/// Double a full buffer by appending it to itself. The copies in the new
/// second half keep the element kind intact and are overwritten before
/// any read reaches them.
pub fn double(buffer: Expr) -> Expr {
    Expr::ArrayAppend(Box::new(buffer.clone()), Box::new(buffer))
}
