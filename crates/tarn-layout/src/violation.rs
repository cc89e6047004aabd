use std::fmt;

use crate::layout::Layout;

/// A failed layout constraint.
///
/// Violations are ordinary values: the relations that produce them return
/// `Result` and the caller decides how to report. Nothing here aborts
/// checking, and a violation is never mutated after construction.
#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    /// The first layout was required to be below the second in the
    /// lattice, and is not.
    NotASublayout(Layout, Layout),
    /// The two layouts have no common lower bound.
    NoIntersection(Layout, Layout),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotASublayout(sub, sup) => {
                write!(f, "layout {sub} is not a sublayout of {sup}")
            }
            Self::NoIntersection(left, right) => {
                write!(f, "layouts {left} and {right} do not intersect")
            }
        }
    }
}

impl std::error::Error for Violation {}
