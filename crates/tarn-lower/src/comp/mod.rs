//! Lowering for array comprehensions.
//!
//! A comprehension becomes an imperative frame around its clause loops: an
//! output buffer, a write index, and a size variable, with the element
//! body stored at the bottom of the loop nest. [`clauses`] translates the
//! clause chain and decides between sizing the buffer up front and growing
//! it on demand; [`bindings`], [`overflow`] and [`resizable`] carry the
//! supporting pieces. The emitted code always has this outline:
//!
//! ```text
//! <iterator bindings>                    (fixed sizing only)
//! if <any generator empty> then [] else  (fixed sizing only)
//! let comp_size = <element count> in
//! let comp_out = <buffer> in
//! let mut comp_idx = 0 in
//! <loops>
//!   <store element; comp_idx := comp_idx + 1>;
//! <result>
//! ```

pub mod bindings;
pub mod clauses;
pub mod overflow;
pub mod resizable;

use tarn_common::Span;

use crate::ast::{Comprehension, Scope, TranslateExpr};
use crate::ir::{ArrayKind, Binop, Expr, Ident, IdentGen};

use self::clauses::{ArraySizing, TranslatedClauses};

/// Lower one array comprehension to IR.
///
/// `scope` is the ambient scope at the comprehension; pattern bindings
/// live in a child of it and are gone once this returns. `kind` is the
/// element kind the type checker settled on for the result array.
pub fn lower_comprehension<T: TranslateExpr>(
    translator: &mut T,
    scope: &Scope,
    idents: &mut IdentGen,
    span: Span,
    kind: ArrayKind,
    comp: &Comprehension<T::Expr>,
) -> Expr {
    let mut scope = scope.child();
    let TranslatedClauses {
        array_size,
        size_binding,
        outside_context,
        make_body,
    } = clauses::translate_clauses(translator, &mut scope, idents, span, kind, &comp.clauses);

    // The body is translated last: every clause pattern is in scope here.
    let element = translator.translate(&scope, &comp.body);

    let out = idents.fresh("comp_out");
    let idx = idents.fresh("comp_idx");
    let body = emit_body(
        idents,
        kind,
        array_size.sizing,
        &out,
        &idx,
        &array_size.ident,
        element,
    );
    let loops = make_body(body);

    let result = match array_size.sizing {
        ArraySizing::Fixed => Expr::var(&out),
        // A growable buffer ends oversized; copy out the elements written.
        ArraySizing::Dynamic => Expr::ArraySub {
            arr: Box::new(Expr::var(&out)),
            offset: Box::new(Expr::int(0)),
            len: Box::new(Expr::var(&idx)),
        },
    };

    let out_mutable =
        array_size.sizing == ArraySizing::Dynamic || kind == ArrayKind::Unknown;
    let core = Expr::let_in(
        out.clone(),
        out_mutable,
        initial_buffer(kind, &array_size.ident),
        Expr::let_in(idx, true, Expr::int(0), Expr::seq(loops, result)),
    );
    outside_context(size_binding.bind_around(core))
}

/// The output buffer bound before the loops run.
fn initial_buffer(kind: ArrayKind, size: &Ident) -> Expr {
    match kind {
        ArrayKind::Value | ArrayKind::Float => resizable::alloc(kind, Expr::var(size)),
        // Nothing to allocate with; the first element replaces this
        // placeholder with a right-sized buffer of its own kind.
        ArrayKind::Unknown => Expr::ArrayLit {
            kind: ArrayKind::Unknown,
            elems: Vec::new(),
        },
    }
}

/// The innermost loop body: evaluate the element, store it, advance the
/// write index.
///
/// When the element kind is unknown the first iteration is split off: it
/// replicates its element across a fresh buffer, fixing the runtime
/// representation, and every later iteration stores into that buffer.
fn emit_body(
    idents: &mut IdentGen,
    kind: ArrayKind,
    sizing: ArraySizing,
    out: &Ident,
    idx: &Ident,
    size: &Ident,
    element: Expr,
) -> Expr {
    let advance = Expr::assign(idx, Expr::binop(Binop::Add, Expr::var(idx), Expr::int(1)));
    match kind {
        ArrayKind::Value | ArrayKind::Float => {
            let elem = idents.fresh("comp_elem");
            let store = store_step(kind, sizing, out, idx, size, &elem);
            Expr::let_in(elem, false, element, Expr::seq(store, advance))
        }
        ArrayKind::Unknown => {
            let first = idents.fresh("comp_elem");
            let replicate = Expr::Assign {
                ident: out.clone(),
                value: Box::new(Expr::ArrayReplicate {
                    len: Box::new(Expr::var(size)),
                    value: Box::new(Expr::var(&first)),
                }),
            };
            let first_branch = Expr::let_in(first, false, element.clone(), replicate);

            let later = idents.fresh("comp_elem");
            let store = store_step(kind, sizing, out, idx, size, &later);
            let later_branch = Expr::let_in(later, false, element, store);

            let split = Expr::If {
                cond: Box::new(Expr::binop(Binop::Eq, Expr::var(idx), Expr::int(0))),
                then_branch: Box::new(first_branch),
                else_branch: Box::new(later_branch),
            };
            Expr::seq(split, advance)
        }
    }
}

/// Store one element at the write index, growing a dynamic buffer first
/// when the index has caught up with the capacity.
fn store_step(
    kind: ArrayKind,
    sizing: ArraySizing,
    out: &Ident,
    idx: &Ident,
    size: &Ident,
    elem: &Ident,
) -> Expr {
    let set = Expr::ArraySet {
        kind,
        arr: Box::new(Expr::var(out)),
        index: Box::new(Expr::var(idx)),
        value: Box::new(Expr::var(elem)),
    };
    match sizing {
        ArraySizing::Fixed => set,
        ArraySizing::Dynamic => {
            let grow = Expr::seq(
                Expr::assign(out, resizable::double(Expr::var(out))),
                Expr::assign(size, Expr::binop(Binop::Mul, Expr::var(size), Expr::int(2))),
            );
            let grow_if_full = Expr::If {
                cond: Box::new(Expr::binop(Binop::Eq, Expr::var(idx), Expr::var(size))),
                then_branch: Box::new(grow),
                else_branch: Box::new(Expr::Unit),
            };
            Expr::seq(grow_if_full, set)
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────
