//! Overflow-checked size arithmetic for fixed-size comprehensions.
//!
//! Sizes are computed in the emitted code with ordinary wrapping integer
//! ops, so every step that could wrap is followed by a check that raises
//! instead of allocating a garbage-sized buffer. The checks assume the
//! emptiness test has already run: a range reaching [`range_size`] is
//! known non-empty, which is what makes "diff + 1 came out non-positive"
//! synonymous with overflow.

use crate::comp::bindings::{bind_all, LetBinding};
use crate::ir::{Binop, Direction, Expr, IdentGen};

/// Payload of the exception raised when a comprehension's size overflows.
pub const OVERFLOW_MESSAGE: &str =
    "integer overflow while computing the size of a comprehension";

/// The raise every failed check lands on.
pub fn overflow_raise() -> Expr {
    Expr::Raise(Box::new(Expr::Str(OVERFLOW_MESSAGE.to_string())))
}

/// IR computing the iteration count of one non-empty range generator:
/// `stop - start + 1` upward, `start - stop + 1` downward, raising if the
/// count wrapped to zero or below.
pub fn range_size(idents: &mut IdentGen, start: Expr, stop: Expr, direction: Direction) -> Expr {
    let diff = match direction {
        Direction::Up => Expr::binop(Binop::Sub, stop, start),
        Direction::Down => Expr::binop(Binop::Sub, start, stop),
    };
    let size = idents.fresh("comp_range_size");
    Expr::let_in(
        size.clone(),
        false,
        Expr::binop(Binop::Add, diff, Expr::int(1)),
        Expr::If {
            cond: Box::new(Expr::binop(Binop::Le, Expr::var(&size), Expr::int(0))),
            then_branch: Box::new(overflow_raise()),
            else_branch: Box::new(Expr::var(&size)),
        },
    )
}

/// IR computing the product of per-generator iteration counts, checking
/// each multiplication by dividing back: `p = a * b` is trusted only if
/// `p / b == a`. Factors are bound left to right so each is evaluated
/// once, in generator order.
pub fn total_size(idents: &mut IdentGen, factors: Vec<Expr>) -> Expr {
    let mut bindings: Vec<LetBinding> = Vec::new();
    let mut acc: Option<LetBinding> = None;

    for factor in factors {
        let bound = LetBinding::new(idents.fresh("comp_factor"), factor);
        acc = Some(match acc {
            None => bound,
            Some(prev) => {
                let product = LetBinding::new(
                    idents.fresh("comp_product"),
                    Expr::binop(Binop::Mul, prev.var(), bound.var()),
                );
                let checked = LetBinding::new(
                    idents.fresh("comp_total"),
                    Expr::If {
                        cond: Box::new(Expr::binop(
                            Binop::Eq,
                            Expr::binop(Binop::Div, product.var(), bound.var()),
                            prev.var(),
                        )),
                        then_branch: Box::new(product.var()),
                        else_branch: Box::new(overflow_raise()),
                    },
                );
                bindings.push(prev);
                bindings.push(bound);
                bindings.push(product);
                checked
            }
        });
    }

    match acc {
        Some(total) => {
            let result = total.var();
            bindings.push(total);
            bind_all(bindings, result)
        }
        // The empty product.
        None => Expr::int(1),
    }
}
