//! The comprehension surface syntax, and the seam back to the surrounding
//! expression translator.
//!
//! Comprehensions are generic over the host expression type `E`: the parser
//! hands us clause and body expressions it has already built, and we call
//! back through [`TranslateExpr`] whenever one of them has to become IR.
//! This keeps the lowering usable from any front end that can translate
//! its own expressions and name their array element kinds.

use rustc_hash::FxHashMap;
use tarn_common::Span;

use crate::ir::{self, ArrayKind, Direction};

// ── Surface syntax ──────────────────────────────────────────────────────

/// A whole array comprehension: a body expression and the clauses that
/// drive it, left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct Comprehension<E> {
    pub body: E,
    pub clauses: Vec<Clause<E>>,
    pub span: Span,
}

/// One clause of a comprehension.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause<E> {
    /// `for g1 and g2 and ...`: simultaneous generators. Iterator
    /// expressions of siblings may not refer to each other's patterns.
    For {
        generators: Vec<Generator<E>>,
        span: Span,
    },
    /// `when cond`: keep only iterations where the guard holds.
    When { guard: E, span: Span },
}

/// One generator inside a `for` clause: a pattern and the thing iterated.
#[derive(Debug, Clone, PartialEq)]
pub struct Generator<E> {
    pub pattern: Pattern,
    pub iterator: GenIterator<E>,
    pub span: Span,
}

/// What a generator iterates over.
#[derive(Debug, Clone, PartialEq)]
pub enum GenIterator<E> {
    /// `start to stop` or `start downto stop`, bounds inclusive.
    Range {
        start: E,
        stop: E,
        direction: Direction,
    },
    /// `in arr`: walk an array's elements front to back.
    Collection { expr: E },
}

/// The binding position of a generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    Name(String),
    Wildcard,
}

// ── Translator seam ─────────────────────────────────────────────────────

/// The callback surface the comprehension lowering needs from the rest of
/// the compiler: translate one host expression under a scope, and name the
/// element kind of an expression that types as an array.
pub trait TranslateExpr {
    type Expr;

    fn translate(&mut self, scope: &Scope, expr: &Self::Expr) -> ir::Expr;

    /// Element kind of an array-typed expression, as the type checker
    /// inferred it. `Unknown` when inference could not pin one down.
    fn array_kind(&self, expr: &Self::Expr) -> ArrayKind;
}

/// Maps source names to the stamped identifiers currently bound for them.
///
/// Comprehension clauses extend a child scope; the parent passed to
/// [`crate::comp::lower_comprehension`] is never touched, so bindings
/// cannot leak past the comprehension.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    vars: FxHashMap<String, ir::Ident>,
}

impl Scope {
    pub fn new() -> Self {
        Scope {
            vars: FxHashMap::default(),
        }
    }

    /// A scope seeded with this one's bindings. Later inserts shadow,
    /// and are invisible to the parent.
    pub fn child(&self) -> Scope {
        self.clone()
    }

    pub fn insert(&mut self, name: String, ident: ir::Ident) {
        self.vars.insert(name, ident);
    }

    pub fn lookup(&self, name: &str) -> Option<&ir::Ident> {
        self.vars.get(name)
    }
}
