//! Layouts: the runtime-representation lattice.
//!
//! A layout classifies how values of a type are represented at runtime.
//! Layouts form a small lattice ordered by "concrete enough to stand in
//! for":
//!
//! ```text
//!         any
//!        /   \
//!    value    void
//!      |
//!  immediate64
//!      |
//!  immediate
//! ```
//!
//! `any` is the top (no information), `value` and `void` are the two sort
//! constants, and the immediates refine `value` (unboxed, pointer-free).
//! `void` is incomparable with the immediates. Layouts that are still being
//! inferred wrap a sort unification variable; every relation here that can
//! learn something routes the learning through the [`SortTable`].
//!
//! Each layout also carries a provenance trail of [`LayoutReason`] entries
//! for diagnostics. The trail never participates in equality.

use std::fmt;

use tarn_common::Span;

use crate::sort::{Sort, SortConst, SortTable};
use crate::violation::Violation;

// ── Provenance ──────────────────────────────────────────────────────────

/// Why a layout exists or was narrowed. Diagnostic payload only: relations
/// record these so error messages can explain where a requirement came
/// from, and nothing else ever reads them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutReason {
    /// Written in a source annotation at the given location.
    Declared(Span),
    /// Invented as a fresh inference layout for the expression here.
    Inferred(Span),
    /// Narrowed to satisfy a requirement imposed at this location.
    Constrained(Span),
    /// Synthesized by the compiler with no source location.
    Builtin,
}

// ── Layouts ─────────────────────────────────────────────────────────────

/// The classification a layout makes, without its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutKind {
    /// Top of the lattice: nothing is known or required.
    Any,
    /// Backed by a sort, possibly still an unbound variable.
    Sorted(Sort),
    /// Unboxed and pointer-free, fits in 64 bits on every target.
    Immediate64,
    /// Unboxed and pointer-free on every target, including 32-bit ones.
    Immediate,
}

/// A layout: a classification plus the trail of reasons that produced it.
///
/// The trail is ONLY for diagnostics. It is intentionally excluded from
/// `PartialEq` so that two layouts reached by different checking paths
/// still count as the same layout; there is deliberately no `Hash` impl.
#[derive(Debug, Clone)]
pub struct Layout {
    kind: LayoutKind,
    /// Provenance, oldest entry first. See [`Layout::history`].
    history: Vec<LayoutReason>,
}

impl PartialEq for Layout {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind // history intentionally excluded
    }
}

impl Layout {
    fn new(kind: LayoutKind, reason: LayoutReason) -> Layout {
        Layout {
            kind,
            history: vec![reason],
        }
    }

    /// The top layout.
    pub fn any(reason: LayoutReason) -> Layout {
        Layout::new(LayoutKind::Any, reason)
    }

    /// The `immediate` layout.
    pub fn immediate(reason: LayoutReason) -> Layout {
        Layout::new(LayoutKind::Immediate, reason)
    }

    /// The `immediate64` layout.
    pub fn immediate64(reason: LayoutReason) -> Layout {
        Layout::new(LayoutKind::Immediate64, reason)
    }

    /// The layout of ordinary runtime values.
    pub fn value(reason: LayoutReason) -> Layout {
        Layout::of_sort(Sort::value(), reason)
    }

    /// The layout of values with no runtime representation.
    pub fn void(reason: LayoutReason) -> Layout {
        Layout::of_sort(Sort::void(), reason)
    }

    /// Wrap an existing sort as a layout.
    pub fn of_sort(sort: Sort, reason: LayoutReason) -> Layout {
        Layout::new(LayoutKind::Sorted(sort), reason)
    }

    /// A fresh inference layout backed by a new sort variable.
    pub fn of_new_sort_var(table: &mut SortTable, reason: LayoutReason) -> Layout {
        Layout::of_sort(table.fresh_var(), reason)
    }

    /// The classification, without provenance.
    pub fn kind(&self) -> &LayoutKind {
        &self.kind
    }

    /// The backing sort, if this layout has one.
    pub fn sort(&self) -> Option<&Sort> {
        match &self.kind {
            LayoutKind::Sorted(sort) => Some(sort),
            _ => None,
        }
    }

    /// Provenance entries, newest first.
    pub fn history(&self) -> impl Iterator<Item = &LayoutReason> {
        self.history.iter().rev()
    }

    /// Copy of this layout narrowed to `kind`, with `reason` as the newest
    /// history entry.
    fn narrowed(&self, kind: LayoutKind, reason: LayoutReason) -> Layout {
        let mut history = self.history.clone();
        history.push(reason);
        Layout { kind, history }
    }

    // ── Relations ───────────────────────────────────────────────────────

    /// Unify two layouts, returning whether they are (now) equal.
    ///
    /// Kinds other than `Sorted` compare by tag; sort-backed layouts
    /// delegate to sort unification and may bind variables.
    pub fn equate(&self, table: &mut SortTable, other: &Layout) -> bool {
        match (&self.kind, &other.kind) {
            (LayoutKind::Any, LayoutKind::Any) => true,
            (LayoutKind::Immediate, LayoutKind::Immediate) => true,
            (LayoutKind::Immediate64, LayoutKind::Immediate64) => true,
            (LayoutKind::Sorted(s1), LayoutKind::Sorted(s2)) => table.equate(s1, s2),
            _ => false,
        }
    }

    /// Equality that must not move inference forward. Panics if deciding it
    /// would bind a sort variable; legal only after unification is done.
    pub fn equal(&self, table: &mut SortTable, other: &Layout) -> bool {
        match (&self.kind, &other.kind) {
            (LayoutKind::Any, LayoutKind::Any) => true,
            (LayoutKind::Immediate, LayoutKind::Immediate) => true,
            (LayoutKind::Immediate64, LayoutKind::Immediate64) => true,
            (LayoutKind::Sorted(s1), LayoutKind::Sorted(s2)) => table.equal(s1, s2),
            _ => false,
        }
    }

    /// The meet of two layouts: the most general layout below both.
    ///
    /// On success the result's history is `reason` prepended to `self`'s
    /// trail; the operation narrows its first argument, and the second
    /// argument's trail is dropped. Sort variables on either side may be
    /// bound in the process, even when the overall meet fails afterwards.
    pub fn intersection(
        &self,
        table: &mut SortTable,
        reason: LayoutReason,
        other: &Layout,
    ) -> Result<Layout, Violation> {
        let kind = match (&self.kind, &other.kind) {
            // Top meets anything as the other side.
            (LayoutKind::Any, kind) => Some(kind.clone()),
            (kind, LayoutKind::Any) => Some(kind.clone()),

            // Equal constants meet as themselves.
            (LayoutKind::Immediate, LayoutKind::Immediate) => Some(LayoutKind::Immediate),
            (LayoutKind::Immediate64, LayoutKind::Immediate64) => {
                Some(LayoutKind::Immediate64)
            }

            // The two immediates meet at the narrower one.
            (LayoutKind::Immediate, LayoutKind::Immediate64)
            | (LayoutKind::Immediate64, LayoutKind::Immediate) => Some(LayoutKind::Immediate),

            // An immediate meets a sort-backed layout only below `value`.
            (LayoutKind::Immediate, LayoutKind::Sorted(sort))
            | (LayoutKind::Sorted(sort), LayoutKind::Immediate) => {
                if table.equate(sort, &Sort::value()) {
                    Some(LayoutKind::Immediate)
                } else {
                    None
                }
            }
            (LayoutKind::Immediate64, LayoutKind::Sorted(sort))
            | (LayoutKind::Sorted(sort), LayoutKind::Immediate64) => {
                if table.equate(sort, &Sort::value()) {
                    Some(LayoutKind::Immediate64)
                } else {
                    None
                }
            }

            // Sort meets sort by unification.
            (LayoutKind::Sorted(s1), LayoutKind::Sorted(s2)) => {
                if table.equate(s1, s2) {
                    Some(LayoutKind::Sorted(*s1))
                } else {
                    None
                }
            }
        };
        match kind {
            Some(kind) => Ok(self.narrowed(kind, reason)),
            None => Err(Violation::NoIntersection(self.clone(), other.clone())),
        }
    }

    /// Check that `self` is below `sup` in the lattice.
    ///
    /// Returns `self` (whose sort may have been refined by unification) on
    /// success; the history is left untouched.
    pub fn sub(&self, table: &mut SortTable, sup: &Layout) -> Result<Layout, Violation> {
        let ok = match (&self.kind, &sup.kind) {
            // Everything is below the top.
            (_, LayoutKind::Any) => true,

            // Equal constants.
            (LayoutKind::Immediate, LayoutKind::Immediate) => true,
            (LayoutKind::Immediate64, LayoutKind::Immediate64) => true,

            // An immediate fits wherever a 64-bit immediate is allowed.
            (LayoutKind::Immediate, LayoutKind::Immediate64) => true,

            // An immediate is below a sort-backed layout only below `value`.
            (LayoutKind::Immediate | LayoutKind::Immediate64, LayoutKind::Sorted(sort)) => {
                table.equate(sort, &Sort::value())
            }

            // Otherwise only unification can make the two comparable.
            (LayoutKind::Sorted(s1), LayoutKind::Sorted(s2)) => table.equate(s1, s2),
            _ => false,
        };
        if ok {
            Ok(self.clone())
        } else {
            Err(Violation::NotASublayout(self.clone(), sup.clone()))
        }
    }

    // ── Defaulting ──────────────────────────────────────────────────────

    /// Force a still-undetermined backing sort to a constant, defaulting to
    /// `Void`. Returns `None` for layouts not backed by a sort.
    pub fn constrain_default_void(&self, table: &mut SortTable) -> Option<SortConst> {
        self.sort().map(|sort| table.constrain_default_void(sort))
    }

    /// Whether defaulting could still make this layout `void`.
    pub fn can_make_void(&self, table: &SortTable) -> bool {
        match self.sort() {
            Some(sort) => table.can_make_void(sort),
            None => false,
        }
    }

    /// Default a still-unbound backing sort to `Value`. Layouts without a
    /// sort are left alone; never fails.
    pub fn default_to_value(&self, table: &mut SortTable) {
        if let Some(sort) = self.sort() {
            table.default_to_value(sort);
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            LayoutKind::Any => write!(f, "any"),
            LayoutKind::Sorted(sort) => write!(f, "{sort}"),
            LayoutKind::Immediate64 => write!(f, "immediate64"),
            LayoutKind::Immediate => write!(f, "immediate"),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────
