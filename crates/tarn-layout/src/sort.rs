//! Sorts: the fully concrete end of runtime-representation inference.
//!
//! A sort says how a value is represented at runtime once all inference is
//! done: either it occupies no storage at all (`Void`) or it is a normal
//! machine value (`Value`). While checking is still in progress a sort may
//! instead be a unification variable owned by a [`SortTable`]; the table
//! binds variables as constraints arrive and compresses lookup paths as it
//! resolves them.

use std::fmt;

// ── Sorts ───────────────────────────────────────────────────────────────

/// A fully determined sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortConst {
    /// No runtime representation at all.
    Void,
    /// An ordinary runtime value.
    Value,
}

/// Key naming one unification cell inside a [`SortTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SortVar(pub u32);

/// A possibly still-undetermined sort.
///
/// Equality on `Sort` is structural and does not consult any table; callers
/// that want semantic equality go through [`SortTable::equate`] or
/// [`SortTable::equal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sort {
    Const(SortConst),
    Var(SortVar),
}

impl Sort {
    /// The `Value` sort constant.
    pub fn value() -> Sort {
        Sort::Const(SortConst::Value)
    }

    /// The `Void` sort constant.
    pub fn void() -> Sort {
        Sort::Const(SortConst::Void)
    }

    /// Whether this sort is already a constant (no table lookup involved).
    pub fn is_const(&self) -> bool {
        matches!(self, Sort::Const(_))
    }
}

impl fmt::Display for SortConst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortConst::Void => write!(f, "void"),
            SortConst::Value => write!(f, "value"),
        }
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sort::Const(c) => write!(f, "{c}"),
            Sort::Var(v) => write!(f, "'s{}", v.0),
        }
    }
}

// ── Unification table ───────────────────────────────────────────────────

/// State of one unification cell.
///
/// A cell starts `Unbound` and is bound at most once by unification or
/// defaulting; after that the only rewrite ever applied is path compression,
/// which re-points the cell at the final target of its chain. A cell is
/// never bound to its own variable, so chains cannot form cycles.
#[derive(Debug, Clone)]
enum Binding {
    Unbound,
    Bound(Sort),
}

/// Which operand of `equate_tracking_mutation` had a variable bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mutation {
    Neither,
    First,
    Second,
}

/// Outcome of a tracked equate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EquateResult {
    Unequal,
    Equal(Mutation),
}

/// Owner of all sort unification cells for one checking session.
///
/// Every mutating operation on sorts lives here: the checker that owns the
/// table is the only code that can move inference forward, and `&mut`
/// receivers make that structural.
#[derive(Debug, Default)]
pub struct SortTable {
    cells: Vec<Binding>,
}

impl SortTable {
    /// Create an empty table.
    pub fn new() -> Self {
        SortTable { cells: Vec::new() }
    }

    /// Number of cells ever created.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether no variables have been created yet.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    // ── Variable creation ───────────────────────────────────────────────

    /// Create a fresh, unbound sort variable.
    pub fn fresh_var(&mut self) -> Sort {
        let var = SortVar(self.cells.len() as u32);
        self.cells.push(Binding::Unbound);
        Sort::Var(var)
    }

    // ── Resolution ──────────────────────────────────────────────────────

    /// Resolve a sort by following bindings to the end of the chain.
    ///
    /// Returns either a constant or the unbound variable at the chain's
    /// root. Every intermediate cell on the way is rewritten to point
    /// directly at that final target, so later lookups are one step.
    pub fn resolve(&mut self, sort: &Sort) -> Sort {
        let var = match sort {
            Sort::Const(_) => return *sort,
            Sort::Var(var) => *var,
        };
        let target = match &self.cells[var.0 as usize] {
            Binding::Unbound => return Sort::Var(var),
            Binding::Bound(target) => *target,
        };
        let resolved = self.resolve(&target);
        if resolved != target {
            self.cells[var.0 as usize] = Binding::Bound(resolved);
        }
        resolved
    }

    /// Resolve without compressing paths. Used by probes that promise not
    /// to touch the table.
    pub fn resolve_readonly(&self, sort: &Sort) -> Sort {
        let mut current = *sort;
        loop {
            let var = match current {
                Sort::Const(_) => return current,
                Sort::Var(var) => var,
            };
            match &self.cells[var.0 as usize] {
                Binding::Unbound => return current,
                Binding::Bound(target) => current = *target,
            }
        }
    }

    // ── Unification ─────────────────────────────────────────────────────

    /// Unify two sorts, returning whether they are (now) equal.
    ///
    /// Constants compare by tag; an unbound variable binds to whatever it
    /// meets; two distinct unbound variables are merged by binding the
    /// first at the second.
    pub fn equate(&mut self, a: &Sort, b: &Sort) -> bool {
        matches!(self.equate_tracking_mutation(a, b), EquateResult::Equal(_))
    }

    /// Equality that must not move inference forward.
    ///
    /// Legal only after unification has finished for the sorts involved:
    /// if making the two sorts equal would require binding a variable,
    /// that is a bug in the caller and this function panics.
    pub fn equal(&mut self, a: &Sort, b: &Sort) -> bool {
        match self.equate_tracking_mutation(a, b) {
            EquateResult::Unequal => false,
            EquateResult::Equal(Mutation::Neither) => true,
            EquateResult::Equal(_) => {
                tracing::error!(first = %a, second = %b, "sort equality check required unification");
                panic!(
                    "Sort::equal {a} with {b}: equality required binding a variable; \
                     equal is only legal once unification is complete"
                );
            }
        }
    }

    /// The core unifier, reporting which operand was mutated.
    fn equate_tracking_mutation(&mut self, a: &Sort, b: &Sort) -> EquateResult {
        let a = self.resolve(a);
        let b = self.resolve(b);
        match (a, b) {
            // Two constants -- equal exactly when the tags match.
            (Sort::Const(c1), Sort::Const(c2)) => {
                if c1 == c2 {
                    EquateResult::Equal(Mutation::Neither)
                } else {
                    EquateResult::Unequal
                }
            }

            // The same unbound cell on both sides -- nothing to do.
            (Sort::Var(v1), Sort::Var(v2)) if v1 == v2 => {
                EquateResult::Equal(Mutation::Neither)
            }

            // Two distinct unbound cells -- bind the first at the second.
            (Sort::Var(v1), Sort::Var(v2)) => {
                self.cells[v1.0 as usize] = Binding::Bound(Sort::Var(v2));
                EquateResult::Equal(Mutation::First)
            }

            // Unbound cell meets a constant -- bind the cell.
            (Sort::Var(v), c @ Sort::Const(_)) => {
                self.cells[v.0 as usize] = Binding::Bound(c);
                EquateResult::Equal(Mutation::First)
            }
            (c @ Sort::Const(_), Sort::Var(v)) => {
                self.cells[v.0 as usize] = Binding::Bound(c);
                EquateResult::Equal(Mutation::Second)
            }
        }
    }

    // ── Defaulting ──────────────────────────────────────────────────────

    /// Force the sort to a constant, defaulting a still-unbound variable
    /// to `Void`, and return the constant it ends up as.
    ///
    /// Called when no further constraints can arrive and the checker
    /// prefers the representation-free default.
    pub fn constrain_default_void(&mut self, sort: &Sort) -> SortConst {
        match self.resolve(sort) {
            Sort::Const(c) => c,
            Sort::Var(v) => {
                self.cells[v.0 as usize] = Binding::Bound(Sort::void());
                SortConst::Void
            }
        }
    }

    /// Whether defaulting could still make this sort `Void`.
    ///
    /// A probe: never binds anything, so it may be asked speculatively.
    pub fn can_make_void(&self, sort: &Sort) -> bool {
        match self.resolve_readonly(sort) {
            Sort::Const(SortConst::Void) => true,
            Sort::Const(SortConst::Value) => false,
            Sort::Var(_) => true,
        }
    }

    /// Default a still-unbound variable to `Value`. Never fails; sorts
    /// that are already constant are left alone.
    ///
    /// This is the end-of-checking sweep that makes every surviving sort
    /// concrete.
    pub fn default_to_value(&mut self, sort: &Sort) {
        if let Sort::Var(v) = self.resolve(sort) {
            self.cells[v.0 as usize] = Binding::Bound(Sort::value());
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────
