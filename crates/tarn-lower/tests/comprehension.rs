//! End-to-end comprehension tests: build surface syntax for a tiny host
//! language, lower it, and run the emitted IR under a small evaluator.
//!
//! The evaluator is deliberately machine-like where it matters: integer
//! arithmetic wraps, so the overflow checks in emitted size computations
//! are exercised rather than masked by Rust's own checked arithmetic.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tarn_common::Span;
use tarn_lower::comp::overflow::OVERFLOW_MESSAGE;
use tarn_lower::ir::{ArrayKind, Binop, Direction, Expr, Ident, IdentGen};
use tarn_lower::{
    lower_comprehension, Clause, Comprehension, GenIterator, Generator, Pattern, Scope,
    TranslateExpr,
};

// ── Evaluator ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Unit,
    Arr(Rc<RefCell<Vec<Value>>>),
}

/// A raised exception, carrying its payload.
#[derive(Debug, Clone, PartialEq)]
struct Raised(Value);

type Env = FxHashMap<Ident, Value>;

fn as_int(value: Value) -> i64 {
    match value {
        Value::Int(n) => n,
        other => panic!("expected an int, got {other:?}"),
    }
}

fn as_bool(value: Value) -> bool {
    match value {
        Value::Bool(b) => b,
        other => panic!("expected a bool, got {other:?}"),
    }
}

fn as_arr(value: Value) -> Rc<RefCell<Vec<Value>>> {
    match value {
        Value::Arr(arr) => arr,
        other => panic!("expected an array, got {other:?}"),
    }
}

fn as_index(value: Value) -> usize {
    usize::try_from(as_int(value)).expect("negative index")
}

fn new_arr(elems: Vec<Value>) -> Value {
    Value::Arr(Rc::new(RefCell::new(elems)))
}

/// Default slot contents of a freshly allocated known-kind array.
fn default_elem(kind: ArrayKind) -> Value {
    match kind {
        ArrayKind::Value => Value::Int(0),
        ArrayKind::Float => Value::Float(0.0),
        ArrayKind::Unknown => panic!("allocation of an unknown-kind array"),
    }
}

fn eval(env: &mut Env, expr: &Expr) -> Result<Value, Raised> {
    match expr {
        Expr::Var(ident) => Ok(env
            .get(ident)
            .cloned()
            .unwrap_or_else(|| panic!("unbound {ident}"))),
        Expr::Int(n) => Ok(Value::Int(*n)),
        Expr::Float(x) => Ok(Value::Float(*x)),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::Unit => Ok(Value::Unit),

        Expr::Let {
            ident, value, body, ..
        } => {
            let value = eval(env, value)?;
            env.insert(ident.clone(), value);
            eval(env, body)
        }
        Expr::Assign { ident, value } => {
            let value = eval(env, value)?;
            assert!(env.contains_key(ident), "assignment to unbound {ident}");
            env.insert(ident.clone(), value);
            Ok(Value::Unit)
        }
        Expr::Seq(first, second) => {
            eval(env, first)?;
            eval(env, second)
        }

        Expr::If {
            cond,
            then_branch,
            else_branch,
        } => {
            if as_bool(eval(env, cond)?) {
                eval(env, then_branch)
            } else {
                eval(env, else_branch)
            }
        }
        Expr::For {
            var,
            from,
            to,
            direction,
            body,
        } => {
            let from = as_int(eval(env, from)?);
            let to = as_int(eval(env, to)?);
            let mut i = from;
            loop {
                match direction {
                    Direction::Up if i > to => break,
                    Direction::Down if i < to => break,
                    _ => {}
                }
                env.insert(var.clone(), Value::Int(i));
                eval(env, body)?;
                if i == to {
                    break;
                }
                match direction {
                    Direction::Up => i += 1,
                    Direction::Down => i -= 1,
                }
            }
            Ok(Value::Unit)
        }

        Expr::Binop { op, lhs, rhs } => {
            let lhs = eval(env, lhs)?;
            let rhs = eval(env, rhs)?;
            Ok(match op {
                Binop::Add => Value::Int(as_int(lhs).wrapping_add(as_int(rhs))),
                Binop::Sub => Value::Int(as_int(lhs).wrapping_sub(as_int(rhs))),
                Binop::Mul => Value::Int(as_int(lhs).wrapping_mul(as_int(rhs))),
                Binop::Div => {
                    let divisor = as_int(rhs);
                    if divisor == 0 {
                        return Err(Raised(Value::Str("division by zero".into())));
                    }
                    Value::Int(as_int(lhs).wrapping_div(divisor))
                }
                Binop::Eq => Value::Bool(as_int(lhs) == as_int(rhs)),
                Binop::Ne => Value::Bool(as_int(lhs) != as_int(rhs)),
                Binop::Lt => Value::Bool(as_int(lhs) < as_int(rhs)),
                Binop::Le => Value::Bool(as_int(lhs) <= as_int(rhs)),
                Binop::Gt => Value::Bool(as_int(lhs) > as_int(rhs)),
                Binop::Ge => Value::Bool(as_int(lhs) >= as_int(rhs)),
                Binop::And => Value::Bool(as_bool(lhs) && as_bool(rhs)),
                Binop::Or => Value::Bool(as_bool(lhs) || as_bool(rhs)),
            })
        }

        Expr::ArrayLit { elems, .. } => {
            let mut values = Vec::with_capacity(elems.len());
            for elem in elems {
                values.push(eval(env, elem)?);
            }
            Ok(new_arr(values))
        }
        Expr::ArrayAlloc { kind, len } => {
            let len = as_index(eval(env, len)?);
            Ok(new_arr(vec![default_elem(*kind); len]))
        }
        Expr::ArrayReplicate { len, value } => {
            let len = as_index(eval(env, len)?);
            let value = eval(env, value)?;
            Ok(new_arr(vec![value; len]))
        }
        Expr::ArrayGet { arr, index, .. } => {
            let arr = as_arr(eval(env, arr)?);
            let index = as_index(eval(env, index)?);
            let value = arr.borrow()[index].clone();
            Ok(value)
        }
        Expr::ArraySet {
            arr, index, value, ..
        } => {
            let arr = as_arr(eval(env, arr)?);
            let index = as_index(eval(env, index)?);
            let value = eval(env, value)?;
            arr.borrow_mut()[index] = value;
            Ok(Value::Unit)
        }
        Expr::ArrayLen(arr) => {
            let arr = as_arr(eval(env, arr)?);
            let len = arr.borrow().len();
            Ok(Value::Int(len as i64))
        }
        Expr::ArraySub { arr, offset, len } => {
            let arr = as_arr(eval(env, arr)?);
            let offset = as_index(eval(env, offset)?);
            let len = as_index(eval(env, len)?);
            let copied = arr.borrow()[offset..offset + len].to_vec();
            Ok(new_arr(copied))
        }
        Expr::ArrayAppend(first, second) => {
            let first = as_arr(eval(env, first)?);
            let second = as_arr(eval(env, second)?);
            let mut joined = first.borrow().clone();
            joined.extend(second.borrow().iter().cloned());
            Ok(new_arr(joined))
        }

        Expr::Raise(payload) => {
            let payload = eval(env, payload)?;
            Err(Raised(payload))
        }
    }
}

// ── A tiny host language ───────────────────────────────────────────────

/// Source expressions of the host front end the tests pretend to be.
enum Src {
    Int(i64),
    Float(f64),
    Var(&'static str),
    Bin(Binop, Box<Src>, Box<Src>),
    Arr(Vec<Src>),
    Fail(&'static str),
}

struct Mini;

impl TranslateExpr for Mini {
    type Expr = Src;

    fn translate(&mut self, scope: &Scope, expr: &Src) -> Expr {
        match expr {
            Src::Int(n) => Expr::int(*n),
            Src::Float(x) => Expr::Float(*x),
            Src::Var(name) => match scope.lookup(name) {
                Some(ident) => Expr::Var(ident.clone()),
                None => panic!("unbound {name}"),
            },
            Src::Bin(op, lhs, rhs) => Expr::binop(
                *op,
                self.translate(scope, lhs),
                self.translate(scope, rhs),
            ),
            Src::Arr(elems) => Expr::ArrayLit {
                kind: ArrayKind::Value,
                elems: elems.iter().map(|e| self.translate(scope, e)).collect(),
            },
            Src::Fail(msg) => Expr::Raise(Box::new(Expr::Str((*msg).to_string()))),
        }
    }

    fn array_kind(&self, _expr: &Src) -> ArrayKind {
        ArrayKind::Value
    }
}

fn lit(n: i64) -> Src {
    Src::Int(n)
}

fn flt(x: f64) -> Src {
    Src::Float(x)
}

fn var(name: &'static str) -> Src {
    Src::Var(name)
}

fn bin(op: Binop, lhs: Src, rhs: Src) -> Src {
    Src::Bin(op, Box::new(lhs), Box::new(rhs))
}

fn name(s: &str) -> Pattern {
    Pattern::Name(s.to_string())
}

fn gen_range(pattern: Pattern, start: Src, direction: Direction, stop: Src) -> Generator<Src> {
    Generator {
        pattern,
        iterator: GenIterator::Range {
            start,
            stop,
            direction,
        },
        span: Span::DUMMY,
    }
}

fn gen_in(pattern: Pattern, arr: Src) -> Generator<Src> {
    Generator {
        pattern,
        iterator: GenIterator::Collection { expr: arr },
        span: Span::DUMMY,
    }
}

fn for_clause(generators: Vec<Generator<Src>>) -> Clause<Src> {
    Clause::For {
        generators,
        span: Span::DUMMY,
    }
}

fn when(guard: Src) -> Clause<Src> {
    Clause::When {
        guard,
        span: Span::DUMMY,
    }
}

fn comp(body: Src, clauses: Vec<Clause<Src>>) -> Comprehension<Src> {
    Comprehension {
        body,
        clauses,
        span: Span::DUMMY,
    }
}

// ── Harness ────────────────────────────────────────────────────────────

/// Lower a comprehension and run the result.
fn run(kind: ArrayKind, comp: &Comprehension<Src>) -> Result<Value, Raised> {
    let mut idents = IdentGen::new();
    let lowered = lower_comprehension(
        &mut Mini,
        &Scope::new(),
        &mut idents,
        Span::DUMMY,
        kind,
        comp,
    );
    eval(&mut Env::default(), &lowered)
}

/// Run and unwrap to the produced elements.
fn run_elems(kind: ArrayKind, comp: &Comprehension<Src>) -> Vec<Value> {
    match run(kind, comp) {
        Ok(value) => as_arr(value).borrow().clone(),
        Err(raised) => panic!("comprehension raised {raised:?}"),
    }
}

/// Run and unwrap to a vector of ints.
fn run_ints(kind: ArrayKind, comp: &Comprehension<Src>) -> Vec<i64> {
    run_elems(kind, comp).into_iter().map(as_int).collect()
}

// ── Behavior ───────────────────────────────────────────────────────────

#[test]
fn simultaneous_ranges_fill_in_loop_order() {
    let c = comp(
        bin(Binop::Mul, var("x"), var("y")),
        vec![for_clause(vec![
            gen_range(name("x"), lit(1), Direction::Up, lit(3)),
            gen_range(name("y"), lit(10), Direction::Down, lit(8)),
        ])],
    );
    assert_eq!(
        run_ints(ArrayKind::Value, &c),
        vec![10, 9, 8, 20, 18, 16, 30, 27, 24]
    );
}

#[test]
fn guards_filter_and_later_generators_see_earlier_patterns() {
    // [x + y for x = 1 to 3, when x != 2, for y in [10*x, 100*x]]
    let c = comp(
        bin(Binop::Add, var("x"), var("y")),
        vec![
            for_clause(vec![gen_range(name("x"), lit(1), Direction::Up, lit(3))]),
            when(bin(Binop::Ne, var("x"), lit(2))),
            for_clause(vec![gen_in(
                name("y"),
                Src::Arr(vec![
                    bin(Binop::Mul, lit(10), var("x")),
                    bin(Binop::Mul, lit(100), var("x")),
                ]),
            )]),
        ],
    );
    assert_eq!(run_ints(ArrayKind::Value, &c), vec![11, 101, 33, 303]);
}

#[test]
fn crossed_range_is_empty_without_raising() {
    // The size arithmetic for 5 to 1 would come out negative; the
    // emptiness test has to win before it runs.
    let c = comp(
        var("x"),
        vec![for_clause(vec![gen_range(
            name("x"),
            lit(5),
            Direction::Up,
            lit(1),
        )])],
    );
    assert_eq!(run_ints(ArrayKind::Value, &c), Vec::<i64>::new());
}

#[test]
fn oversized_comprehensions_raise_instead_of_allocating() {
    // stop - start + 1 wraps negative.
    let c = comp(
        lit(0),
        vec![for_clause(vec![gen_range(
            name("x"),
            lit(0),
            Direction::Up,
            lit(i64::MAX),
        )])],
    );
    assert_eq!(
        run(ArrayKind::Value, &c),
        Err(Raised(Value::Str(OVERFLOW_MESSAGE.to_string())))
    );

    // Each factor fits, their product does not.
    let c = comp(
        lit(0),
        vec![for_clause(vec![
            gen_range(name("x"), lit(1), Direction::Up, lit(i64::MAX)),
            gen_range(name("y"), lit(0), Direction::Up, lit(2)),
        ])],
    );
    assert_eq!(
        run(ArrayKind::Value, &c),
        Err(Raised(Value::Str(OVERFLOW_MESSAGE.to_string())))
    );
}

#[test]
fn dynamic_buffer_grows_past_its_starting_capacity() {
    // 20 elements forces two doublings of the 8-slot buffer, and the
    // truncation at the end has to preserve order.
    let c = comp(
        var("x"),
        vec![
            for_clause(vec![gen_range(name("x"), lit(1), Direction::Up, lit(20))]),
            when(bin(Binop::Le, var("x"), lit(99))),
        ],
    );
    assert_eq!(run_ints(ArrayKind::Value, &c), (1..=20).collect::<Vec<_>>());
}

#[test]
fn empty_unknown_kind_comprehension_never_runs_the_body() {
    // A body that raises proves the loops were skipped entirely.
    let c = comp(
        Src::Fail("body ran"),
        vec![for_clause(vec![gen_in(name("x"), Src::Arr(Vec::new()))])],
    );
    assert_eq!(run_elems(ArrayKind::Unknown, &c), Vec::<Value>::new());
}

#[test]
fn unknown_kind_fills_fixed_buffers_through_replication() {
    let c = comp(
        bin(Binop::Mul, var("x"), var("x")),
        vec![for_clause(vec![gen_range(
            name("x"),
            lit(1),
            Direction::Up,
            lit(4),
        )])],
    );
    assert_eq!(run_ints(ArrayKind::Unknown, &c), vec![1, 4, 9, 16]);
}

#[test]
fn unknown_kind_grows_dynamic_buffers_too() {
    let c = comp(
        bin(Binop::Mul, var("x"), var("x")),
        vec![
            for_clause(vec![gen_range(name("x"), lit(1), Direction::Up, lit(20))]),
            when(bin(Binop::Le, var("x"), lit(99))),
        ],
    );
    assert_eq!(
        run_ints(ArrayKind::Unknown, &c),
        (1..=20).map(|x| x * x).collect::<Vec<_>>()
    );
}

#[test]
fn guard_can_reject_every_iteration() {
    let c = comp(
        var("x"),
        vec![
            for_clause(vec![gen_range(name("x"), lit(1), Direction::Up, lit(5))]),
            when(bin(
                Binop::And,
                bin(Binop::Gt, var("x"), lit(99)),
                bin(Binop::Lt, var("x"), lit(0)),
            )),
        ],
    );
    assert_eq!(run_ints(ArrayKind::Value, &c), Vec::<i64>::new());
}

#[test]
fn wildcard_patterns_repeat_the_body() {
    let c = comp(
        lit(7),
        vec![for_clause(vec![gen_range(
            Pattern::Wildcard,
            lit(1),
            Direction::Up,
            lit(3),
        )])],
    );
    assert_eq!(run_ints(ArrayKind::Value, &c), vec![7, 7, 7]);
}

#[test]
fn float_kind_buffers_hold_floats() {
    let c = comp(
        flt(2.5),
        vec![for_clause(vec![gen_range(
            name("x"),
            lit(1),
            Direction::Up,
            lit(2),
        )])],
    );
    assert_eq!(
        run_elems(ArrayKind::Float, &c),
        vec![Value::Float(2.5), Value::Float(2.5)]
    );
}

#[test]
fn iterated_arrays_are_read_front_to_back() {
    let c = comp(
        var("e"),
        vec![for_clause(vec![gen_in(
            name("e"),
            Src::Arr(vec![lit(3), lit(1), lit(4), lit(1), lit(5)]),
        )])],
    );
    assert_eq!(run_ints(ArrayKind::Value, &c), vec![3, 1, 4, 1, 5]);
}
