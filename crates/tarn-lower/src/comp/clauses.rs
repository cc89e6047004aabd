//! Clause translation: turning a comprehension's `for`/`when` chain into
//! iterator bindings, nested loops, and a sizing strategy.
//!
//! The strategy decision happens here. A comprehension whose clause list
//! is exactly one `for` clause can have its element count computed before
//! allocating, so its output buffer is sized up front; any guard, and any
//! second clause (whose generators may depend on earlier patterns), makes
//! the count unknowable in advance and forces a growable buffer.

use tarn_common::Span;

use crate::ast::{Clause, GenIterator, Generator, Pattern, Scope, TranslateExpr};
use crate::comp::bindings::{bind_all, IfReused, IterBindings, LetBinding, Usage};
use crate::comp::{overflow, resizable};
use crate::ir::{ArrayKind, Binop, Direction, Expr, Ident, IdentGen};

// ── Results handed to the top-level lowering ────────────────────────────

/// How the output buffer's size is managed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArraySizing {
    /// Element count computed before allocation; the buffer never grows.
    Fixed,
    /// Count discovered by running the loops; the buffer doubles on demand.
    Dynamic,
}

/// The size variable of the output buffer and how it behaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArraySize {
    pub ident: Ident,
    pub sizing: ArraySizing,
}

/// Everything clause translation produces, waiting for the caller to slot
/// in the allocation and the element-producing body.
///
/// The two builders are one-shot by construction: each wraps IR the
/// translation already emitted around the expression it is given.
pub struct TranslatedClauses {
    pub array_size: ArraySize,
    /// Binds the size variable. Mutable (starting capacity) under
    /// [`ArraySizing::Dynamic`], immutable (exact count) under
    /// [`ArraySizing::Fixed`].
    pub size_binding: LetBinding,
    /// Wraps the whole lowered comprehension in whatever must run first:
    /// iterator bindings and the emptiness short-circuit for fixed sizing,
    /// nothing for dynamic.
    pub outside_context: Box<dyn FnOnce(Expr) -> Expr>,
    /// Wraps the per-element body in the clause loops, first clause
    /// outermost.
    pub make_body: Box<dyn FnOnce(Expr) -> Expr>,
}

// ── Loop skeletons ──────────────────────────────────────────────────────

/// Destructuring read at the top of a collection generator's loop body.
struct ElementBind {
    target: Ident,
    arr: Ident,
    kind: ArrayKind,
}

/// One generator's loop, waiting for its body.
struct LoopShape {
    var: Ident,
    from: Expr,
    to: Expr,
    direction: Direction,
    element: Option<ElementBind>,
}

impl LoopShape {
    fn wrap(self, body: Expr) -> Expr {
        let LoopShape {
            var,
            from,
            to,
            direction,
            element,
        } = self;
        let body = match element {
            Some(bind) => Expr::Let {
                ident: bind.target,
                mutable: false,
                value: Box::new(Expr::ArrayGet {
                    kind: bind.kind,
                    arr: Box::new(Expr::Var(bind.arr)),
                    index: Box::new(Expr::Var(var.clone())),
                }),
                body: Box::new(body),
            },
            None => body,
        };
        Expr::For {
            var,
            from: Box::new(from),
            to: Box::new(to),
            direction,
            body: Box::new(body),
        }
    }
}

/// One translated clause, under dynamic sizing.
enum ClauseShape {
    /// A `for` clause: its iterator bindings, then its loops. The bindings
    /// sit inside the enclosing clause's body, so they re-evaluate when an
    /// outer loop advances.
    Iterate {
        bindings: Vec<LetBinding>,
        loops: Vec<LoopShape>,
    },
    /// A `when` clause: iterations failing the guard contribute nothing.
    Filter { guard: Expr },
}

impl ClauseShape {
    fn wrap(self, body: Expr) -> Expr {
        match self {
            ClauseShape::Iterate { bindings, loops } => {
                let inner = loops.into_iter().rev().fold(body, |acc, shape| shape.wrap(acc));
                bind_all(bindings, inner)
            }
            ClauseShape::Filter { guard } => Expr::If {
                cond: Box::new(guard),
                then_branch: Box::new(body),
                else_branch: Box::new(Expr::Unit),
            },
        }
    }
}

// ── Generator translation ───────────────────────────────────────────────

/// Translate one generator's iterator under the given usage, producing its
/// binding record, its loop, and the scope entry its pattern will make.
///
/// The scope entry is returned rather than inserted: siblings in one `for`
/// clause are simultaneous, so every iterator in the clause must be
/// translated before any of the clause's patterns becomes visible.
fn translate_generator<T: TranslateExpr>(
    translator: &mut T,
    scope: &Scope,
    idents: &mut IdentGen,
    usage: Usage,
    generator: &Generator<T::Expr>,
) -> (IterBindings, LoopShape, Option<(String, Ident)>) {
    match &generator.iterator {
        GenIterator::Range {
            start,
            stop,
            direction,
        } => {
            let start = LetBinding::new(idents.fresh("comp_start"), translator.translate(scope, start));
            let stop = LetBinding::new(idents.fresh("comp_stop"), translator.translate(scope, stop));
            let (var, entry) = match &generator.pattern {
                Pattern::Name(name) => {
                    let ident = idents.fresh(name);
                    (ident.clone(), Some((name.clone(), ident)))
                }
                Pattern::Wildcard => (idents.fresh("comp_unused"), None),
            };
            let shape = LoopShape {
                var,
                from: start.var(),
                to: stop.var(),
                direction: *direction,
                element: None,
            };
            let record = IterBindings::Range {
                start,
                stop,
                direction: IfReused::new(usage, || *direction),
            };
            (record, shape, entry)
        }
        GenIterator::Collection { expr } => {
            let elem_kind = translator.array_kind(expr);
            let iter_arr = LetBinding::new(idents.fresh("comp_arr"), translator.translate(scope, expr));
            let index = idents.fresh("comp_i");
            let iter_len = IfReused::new(usage, || {
                LetBinding::new(
                    idents.fresh("comp_len"),
                    Expr::ArrayLen(Box::new(iter_arr.var())),
                )
            });
            // Loop to len - 1; read the length back from its binding when
            // one exists, recompute it in place when not.
            let to = match &iter_len {
                IfReused::Used(len) => Expr::binop(Binop::Sub, len.var(), Expr::int(1)),
                IfReused::Unused => Expr::binop(
                    Binop::Sub,
                    Expr::ArrayLen(Box::new(iter_arr.var())),
                    Expr::int(1),
                ),
            };
            let (element, entry) = match &generator.pattern {
                Pattern::Name(name) => {
                    let ident = idents.fresh(name);
                    let bind = ElementBind {
                        target: ident.clone(),
                        arr: iter_arr.ident.clone(),
                        kind: elem_kind,
                    };
                    (Some(bind), Some((name.clone(), ident)))
                }
                Pattern::Wildcard => (None, None),
            };
            let shape = LoopShape {
                var: index,
                from: Expr::int(0),
                to,
                direction: Direction::Up,
                element,
            };
            let record = IterBindings::Array { iter_arr, iter_len };
            (record, shape, entry)
        }
    }
}

// ── Strategy selection ──────────────────────────────────────────────────

/// Translate a comprehension's clauses, extending `scope` with every
/// pattern binding along the way.
pub(crate) fn translate_clauses<T: TranslateExpr>(
    translator: &mut T,
    scope: &mut Scope,
    idents: &mut IdentGen,
    span: Span,
    kind: ArrayKind,
    clauses: &[Clause<T::Expr>],
) -> TranslatedClauses {
    match clauses {
        [Clause::For { generators, .. }] => {
            tracing::debug!(
                start = span.start,
                end = span.end,
                generators = generators.len(),
                "comprehension sized up front"
            );
            fixed_size(translator, scope, idents, kind, generators)
        }
        _ => {
            tracing::debug!(
                start = span.start,
                end = span.end,
                clauses = clauses.len(),
                "comprehension sized on the fly"
            );
            dynamic_size(translator, scope, idents, clauses)
        }
    }
}

fn fixed_size<T: TranslateExpr>(
    translator: &mut T,
    scope: &mut Scope,
    idents: &mut IdentGen,
    kind: ArrayKind,
    generators: &[Generator<T::Expr>],
) -> TranslatedClauses {
    let mut records = Vec::new();
    let mut shapes = Vec::new();
    let mut entries = Vec::new();
    for generator in generators {
        let (record, shape, entry) =
            translate_generator(translator, scope, idents, Usage::Many, generator);
        records.push(record);
        shapes.push(shape);
        entries.extend(entry);
    }
    for (name, ident) in entries {
        scope.insert(name, ident);
    }

    // Per-generator iteration counts and emptiness tests, reading the
    // iterator bindings a second time.
    let mut factors = Vec::new();
    let mut empty_tests = Vec::new();
    for record in &records {
        match record {
            IterBindings::Range {
                start,
                stop,
                direction: IfReused::Used(direction),
            } => {
                factors.push(overflow::range_size(idents, start.var(), stop.var(), *direction));
                let crossed = match direction {
                    Direction::Up => Binop::Gt,
                    Direction::Down => Binop::Lt,
                };
                empty_tests.push(Expr::binop(crossed, start.var(), stop.var()));
            }
            IterBindings::Array {
                iter_len: IfReused::Used(len),
                ..
            } => {
                factors.push(len.var());
                empty_tests.push(Expr::binop(Binop::Eq, len.var(), Expr::int(0)));
            }
            IterBindings::Range {
                direction: IfReused::Unused,
                ..
            }
            | IterBindings::Array {
                iter_len: IfReused::Unused,
                ..
            } => unreachable!("fixed-size translation always records reuse payloads"),
        }
    }

    let size_ident = idents.fresh("comp_size");
    let size_binding = LetBinding::new(size_ident.clone(), overflow::total_size(idents, factors));

    // Any empty generator empties the whole result, and skipping straight
    // to the literal also skips the size arithmetic and its raises.
    let any_empty = empty_tests
        .into_iter()
        .reduce(|acc, test| Expr::binop(Binop::Or, acc, test))
        .unwrap_or(Expr::Bool(false));
    let empty_result = Expr::ArrayLit { kind, elems: Vec::new() };

    let bindings: Vec<LetBinding> = records
        .into_iter()
        .flat_map(IterBindings::into_bindings)
        .collect();
    let outside_context: Box<dyn FnOnce(Expr) -> Expr> = Box::new(move |rest| {
        bind_all(
            bindings,
            Expr::If {
                cond: Box::new(any_empty),
                then_branch: Box::new(empty_result),
                else_branch: Box::new(rest),
            },
        )
    });
    let make_body: Box<dyn FnOnce(Expr) -> Expr> = Box::new(move |body| {
        shapes.into_iter().rev().fold(body, |acc, shape| shape.wrap(acc))
    });

    TranslatedClauses {
        array_size: ArraySize {
            ident: size_ident,
            sizing: ArraySizing::Fixed,
        },
        size_binding,
        outside_context,
        make_body,
    }
}

fn dynamic_size<T: TranslateExpr>(
    translator: &mut T,
    scope: &mut Scope,
    idents: &mut IdentGen,
    clauses: &[Clause<T::Expr>],
) -> TranslatedClauses {
    let mut shapes = Vec::new();
    for clause in clauses {
        match clause {
            Clause::For { generators, .. } => {
                let mut bindings = Vec::new();
                let mut loops = Vec::new();
                let mut entries = Vec::new();
                for generator in generators {
                    let (record, shape, entry) =
                        translate_generator(translator, scope, idents, Usage::Once, generator);
                    bindings.extend(record.into_bindings());
                    loops.push(shape);
                    entries.extend(entry);
                }
                for (name, ident) in entries {
                    scope.insert(name, ident);
                }
                shapes.push(ClauseShape::Iterate { bindings, loops });
            }
            Clause::When { guard, .. } => {
                shapes.push(ClauseShape::Filter {
                    guard: translator.translate(scope, guard),
                });
            }
        }
    }

    let size_ident = idents.fresh("comp_size");
    let size_binding =
        LetBinding::new_mutable(size_ident.clone(), Expr::int(resizable::STARTING_SIZE));
    let make_body: Box<dyn FnOnce(Expr) -> Expr> = Box::new(move |body| {
        shapes.into_iter().rev().fold(body, |acc, shape| shape.wrap(acc))
    });

    TranslatedClauses {
        array_size: ArraySize {
            ident: size_ident,
            sizing: ArraySizing::Dynamic,
        },
        size_binding,
        outside_context: Box::new(|rest| rest),
        make_body,
    }
}

// ── Tests ──────────────────────────────────────────────────────────────
