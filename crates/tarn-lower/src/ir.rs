//! The slice of Tarn's core IR that comprehension lowering emits.
//!
//! This is a post-typing, imperative tree: stamped variables, mutable
//! let bindings, counted loops, flat integer arithmetic, and the array
//! primitives the runtime provides. Comprehension lowering composes these
//! into straight-line buffer-filling code; everything else the compiler
//! does with the IR lives elsewhere.
//!
//! Expressions are plain data. Building one performs no evaluation, and a
//! subtree may be duplicated freely when the same computation has to appear
//! on more than one control-flow path.

use std::fmt;

// ── Identifiers ─────────────────────────────────────────────────────────

/// A variable in lowered code: a display name plus a stamp making it
/// distinct from every other identifier its [`IdentGen`] ever produced.
///
/// Source-level names and compiler temporaries share this type; the stamp
/// is what guarantees generated bindings can never capture user ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident {
    pub name: String,
    pub stamp: u32,
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.name, self.stamp)
    }
}

/// Supply of fresh identifiers for one lowering session.
#[derive(Debug, Default)]
pub struct IdentGen {
    next: u32,
}

impl IdentGen {
    /// Create a supply whose first stamp is 0.
    pub fn new() -> Self {
        IdentGen { next: 0 }
    }

    /// Mint an identifier no other call on this supply has returned.
    pub fn fresh(&mut self, name: &str) -> Ident {
        let stamp = self.next;
        self.next += 1;
        Ident {
            name: name.to_string(),
            stamp,
        }
    }
}

// ── Element kinds ───────────────────────────────────────────────────────

/// Runtime representation of an array's elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayKind {
    /// Uniformly represented values (boxed data or immediates).
    Value,
    /// Unboxed floats, stored flat.
    Float,
    /// Not statically known; the representation is discovered from the
    /// first element at runtime.
    Unknown,
}

impl fmt::Display for ArrayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrayKind::Value => write!(f, "value"),
            ArrayKind::Float => write!(f, "float"),
            ArrayKind::Unknown => write!(f, "unknown"),
        }
    }
}

// ── Operators and loop direction ────────────────────────────────────────

/// Binary operators on integers (and booleans for `And`/`Or`).
///
/// Arithmetic wraps on overflow, like the machine ops it compiles to.
/// `And`/`Or` evaluate both operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binop {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl fmt::Display for Binop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Binop::Add => "+",
            Binop::Sub => "-",
            Binop::Mul => "*",
            Binop::Div => "/",
            Binop::Eq => "==",
            Binop::Ne => "!=",
            Binop::Lt => "<",
            Binop::Le => "<=",
            Binop::Gt => ">",
            Binop::Ge => ">=",
            Binop::And => "&&",
            Binop::Or => "||",
        };
        write!(f, "{s}")
    }
}

/// Which way a counted loop walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

// ── Expressions ─────────────────────────────────────────────────────────

/// One IR expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Read a variable.
    Var(Ident),
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    /// The unit value; also what loops, stores and assignments evaluate to.
    Unit,

    /// Bind `ident` to `value` while evaluating `body`.
    Let {
        ident: Ident,
        mutable: bool,
        value: Box<Expr>,
        body: Box<Expr>,
    },
    /// Overwrite a mutable variable.
    Assign { ident: Ident, value: Box<Expr> },
    /// Evaluate the first expression for effect, then the second for value.
    Seq(Box<Expr>, Box<Expr>),

    If {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    /// Counted loop. Both bounds are inclusive and evaluated exactly once,
    /// before the first iteration; the loop runs zero times when the
    /// bounds are crossed for its direction.
    For {
        var: Ident,
        from: Box<Expr>,
        to: Box<Expr>,
        direction: Direction,
        body: Box<Expr>,
    },

    Binop {
        op: Binop,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    /// Array literal with a known element kind.
    ArrayLit { kind: ArrayKind, elems: Vec<Expr> },
    /// Array of length `len`, default-initialized for `kind`.
    ArrayAlloc { kind: ArrayKind, len: Box<Expr> },
    /// Array of length `len` with every slot holding `value`. The value's
    /// runtime representation decides the array's, so this is the one
    /// allocator that works when the element kind is unknown.
    ArrayReplicate { len: Box<Expr>, value: Box<Expr> },
    /// Unchecked element read. The lowering is responsible for bounds.
    ArrayGet {
        kind: ArrayKind,
        arr: Box<Expr>,
        index: Box<Expr>,
    },
    /// Unchecked element write.
    ArraySet {
        kind: ArrayKind,
        arr: Box<Expr>,
        index: Box<Expr>,
        value: Box<Expr>,
    },
    ArrayLen(Box<Expr>),
    /// Copy of `arr[offset .. offset + len]`.
    ArraySub {
        arr: Box<Expr>,
        offset: Box<Expr>,
        len: Box<Expr>,
    },
    /// New array holding the first operand's elements then the second's.
    ArrayAppend(Box<Expr>, Box<Expr>),

    /// Raise a runtime exception carrying the payload value.
    Raise(Box<Expr>),
}

impl Expr {
    pub fn int(n: i64) -> Expr {
        Expr::Int(n)
    }

    pub fn var(ident: &Ident) -> Expr {
        Expr::Var(ident.clone())
    }

    pub fn binop(op: Binop, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binop {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn let_in(ident: Ident, mutable: bool, value: Expr, body: Expr) -> Expr {
        Expr::Let {
            ident,
            mutable,
            value: Box::new(value),
            body: Box::new(body),
        }
    }

    pub fn assign(ident: &Ident, value: Expr) -> Expr {
        Expr::Assign {
            ident: ident.clone(),
            value: Box::new(value),
        }
    }

    pub fn seq(first: Expr, second: Expr) -> Expr {
        Expr::Seq(Box::new(first), Box::new(second))
    }

    /// Visit every node of the tree, parents before children.
    pub fn for_each(&self, visit: &mut impl FnMut(&Expr)) {
        visit(self);
        match self {
            Expr::Var(_)
            | Expr::Int(_)
            | Expr::Float(_)
            | Expr::Bool(_)
            | Expr::Str(_)
            | Expr::Unit => {}
            Expr::Let { value, body, .. } => {
                value.for_each(visit);
                body.for_each(visit);
            }
            Expr::Assign { value, .. } => value.for_each(visit),
            Expr::Seq(first, second) => {
                first.for_each(visit);
                second.for_each(visit);
            }
            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => {
                cond.for_each(visit);
                then_branch.for_each(visit);
                else_branch.for_each(visit);
            }
            Expr::For { from, to, body, .. } => {
                from.for_each(visit);
                to.for_each(visit);
                body.for_each(visit);
            }
            Expr::Binop { lhs, rhs, .. } => {
                lhs.for_each(visit);
                rhs.for_each(visit);
            }
            Expr::ArrayLit { elems, .. } => {
                for elem in elems {
                    elem.for_each(visit);
                }
            }
            Expr::ArrayAlloc { len, .. } => len.for_each(visit),
            Expr::ArrayReplicate { len, value } => {
                len.for_each(visit);
                value.for_each(visit);
            }
            Expr::ArrayGet { arr, index, .. } => {
                arr.for_each(visit);
                index.for_each(visit);
            }
            Expr::ArraySet {
                arr, index, value, ..
            } => {
                arr.for_each(visit);
                index.for_each(visit);
                value.for_each(visit);
            }
            Expr::ArrayLen(arr) => arr.for_each(visit),
            Expr::ArraySub { arr, offset, len } => {
                arr.for_each(visit);
                offset.for_each(visit);
                len.for_each(visit);
            }
            Expr::ArrayAppend(first, second) => {
                first.for_each(visit);
                second.for_each(visit);
            }
            Expr::Raise(payload) => payload.for_each(visit),
        }
    }

    /// Whether any node of the tree satisfies the predicate.
    pub fn contains(&self, pred: impl Fn(&Expr) -> bool) -> bool {
        let mut found = false;
        self.for_each(&mut |node| {
            if !found && pred(node) {
                found = true;
            }
        });
        found
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Var(ident) => write!(f, "{ident}"),
            Expr::Int(n) => write!(f, "{n}"),
            Expr::Float(x) => write!(f, "{x:?}"),
            Expr::Bool(b) => write!(f, "{b}"),
            Expr::Str(s) => write!(f, "{s:?}"),
            Expr::Unit => write!(f, "()"),
            Expr::Let {
                ident,
                mutable,
                value,
                body,
            } => {
                let kw = if *mutable { "let mut" } else { "let" };
                write!(f, "{kw} {ident} = {value} in {body}")
            }
            Expr::Assign { ident, value } => write!(f, "{ident} := {value}"),
            Expr::Seq(first, second) => write!(f, "{first}; {second}"),
            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => write!(f, "if {cond} then {{ {then_branch} }} else {{ {else_branch} }}"),
            Expr::For {
                var,
                from,
                to,
                direction,
                body,
            } => {
                let dir = match direction {
                    Direction::Up => "to",
                    Direction::Down => "downto",
                };
                write!(f, "for {var} = {from} {dir} {to} {{ {body} }}")
            }
            Expr::Binop { op, lhs, rhs } => write!(f, "({lhs} {op} {rhs})"),
            Expr::ArrayLit { kind, elems } => {
                write!(f, "[{kind}|")?;
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{elem}")?;
                }
                write!(f, "]")
            }
            Expr::ArrayAlloc { kind, len } => write!(f, "alloc[{kind}]({len})"),
            Expr::ArrayReplicate { len, value } => write!(f, "replicate({len}, {value})"),
            Expr::ArrayGet { arr, index, .. } => write!(f, "{arr}[{index}]"),
            Expr::ArraySet {
                arr, index, value, ..
            } => write!(f, "{arr}[{index}] <- {value}"),
            Expr::ArrayLen(arr) => write!(f, "len({arr})"),
            Expr::ArraySub { arr, offset, len } => write!(f, "sub({arr}, {offset}, {len})"),
            Expr::ArrayAppend(first, second) => write!(f, "append({first}, {second})"),
            Expr::Raise(payload) => write!(f, "raise({payload})"),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────
