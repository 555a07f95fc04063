//! Constant propagation (§4.7): a forward must-analysis over a map lattice
//! from variable name to known-constant-or-not.
//!
//! Folding is exposed as a separate [`fold`] function rather than baked into
//! the transfer function, so callers can run the analysis read-only (to
//! drive other passes) or apply it to rewrite `const`s in one pass.

use std::collections::BTreeMap;

use crate::cfg::BasicBlock;
use crate::ir::{Instr, Literal, Opcode};

use super::solver::{Analysis, DataflowFact, Direction};

/// What is known about one variable at a program point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// No definition has reached this point on any path seen so far.
    Undef,
    /// Every path seen so far defines this variable to the same constant.
    Known(Literal),
    /// At least two paths disagree, or the variable was assigned something
    /// not foldable to a constant.
    Varying,
}

impl Value {
    fn meet(&self, other: &Value) -> Value {
        match (self, other) {
            (Value::Undef, v) | (v, Value::Undef) => v.clone(),
            (Value::Known(a), Value::Known(b)) if a == b => Value::Known(*a),
            _ => Value::Varying,
        }
    }
}

/// The per-block fact: a map from variable name to its known value.
/// Absent keys are implicitly [`Value::Undef`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConstFact(BTreeMap<String, Value>);

impl DataflowFact for ConstFact {
    fn bottom() -> Self {
        ConstFact(BTreeMap::new())
    }
}

impl ConstFact {
    fn get(&self, name: &str) -> Value {
        self.0.get(name).cloned().unwrap_or(Value::Undef)
    }

    /// The constant a variable is known to hold at this point, if any.
    #[must_use]
    pub fn known(&self, name: &str) -> Option<Literal> {
        match self.get(name) {
            Value::Known(l) => Some(l),
            _ => None,
        }
    }
}

/// Forward constant-propagation analysis.
pub struct ConstProp;

impl Analysis for ConstProp {
    type Fact = ConstFact;

    fn direction(&self) -> Direction {
        Direction::Forward
    }

    fn merge(&self, incoming: Vec<&ConstFact>) -> ConstFact {
        // A name missing from even one predecessor's map never reached this
        // point on every path, so it must be dropped rather than inherit
        // whichever other predecessor happened to define it -- an absent
        // key is bottom, not the meet identity, at a join.
        let Some((first, rest)) = incoming.split_first() else {
            return ConstFact::bottom();
        };
        let mut names: std::collections::BTreeSet<&str> = first.0.keys().map(String::as_str).collect();
        for fact in rest {
            let keys: std::collections::BTreeSet<&str> = fact.0.keys().map(String::as_str).collect();
            names.retain(|name| keys.contains(name));
        }

        let mut merged = BTreeMap::new();
        for name in names {
            let mut acc = first.get(name);
            for fact in rest {
                acc = acc.meet(&fact.get(name));
            }
            merged.insert(name.to_string(), acc);
        }
        ConstFact(merged)
    }

    fn transfer(&self, inbound: &ConstFact, block: &BasicBlock) -> ConstFact {
        let mut local = inbound.0.clone();
        for instr in &block.instrs {
            let Instr::Value(v) = instr else { continue };
            let value = if v.op == Opcode::Const {
                v.value.map_or(Value::Varying, Value::Known)
            } else if v.op.is_pure_arith() {
                let args: Vec<Value> = v.args.iter().map(|a| local.get(a).cloned().unwrap_or(Value::Undef)).collect();
                eval(v.op, &args).map_or(Value::Varying, Value::Known)
            } else if v.op == Opcode::Id {
                v.args.first().and_then(|a| local.get(a).cloned()).unwrap_or(Value::Undef)
            } else {
                Value::Varying
            };
            local.insert(v.dest.clone(), value);
        }
        ConstFact(local)
    }
}

/// Fold a pure-arithmetic opcode applied to known argument values, or `None`
/// if an argument is not (yet) known, the opcode is unsupported, or the
/// operation is undefined (division by zero folds to unknown, not a panic).
#[must_use]
fn eval(op: Opcode, args: &[Value]) -> Option<Literal> {
    let ints = || -> Option<Vec<i64>> { args.iter().map(|a| match a { Value::Known(l) => l.as_int(), _ => None }).collect() };
    let bools = || -> Option<Vec<bool>> { args.iter().map(|a| match a { Value::Known(l) => l.as_bool(), _ => None }).collect() };

    match op {
        Opcode::Add => ints().map(|a| Literal::Int(a[0] + a[1])),
        Opcode::Sub => ints().map(|a| Literal::Int(a[0] - a[1])),
        Opcode::Mul => ints().map(|a| Literal::Int(a[0] * a[1])),
        Opcode::Div => ints().and_then(|a| if a[1] == 0 { None } else { Some(Literal::Int(a[0] / a[1])) }),
        Opcode::Eq => ints().map(|a| Literal::Bool(a[0] == a[1])),
        Opcode::Lt => ints().map(|a| Literal::Bool(a[0] < a[1])),
        Opcode::Gt => ints().map(|a| Literal::Bool(a[0] > a[1])),
        Opcode::Le => ints().map(|a| Literal::Bool(a[0] <= a[1])),
        Opcode::Ge => ints().map(|a| Literal::Bool(a[0] >= a[1])),
        Opcode::And => bools().map(|a| Literal::Bool(a[0] && a[1])),
        Opcode::Or => bools().map(|a| Literal::Bool(a[0] || a[1])),
        Opcode::Xor => bools().map(|a| Literal::Bool(a[0] ^ a[1])),
        Opcode::Not => bools().map(|a| Literal::Bool(!a[0])),
        _ => None,
    }
}

/// Rewrite every instruction whose result is constant-foldable at its entry
/// point into a `const`, using converged facts (deferred apply -- see
/// [`crate::dataflow::solver::ApplyTiming`]).
pub fn fold(cfg: &crate::cfg::Cfg, blocks: &mut [BasicBlock]) {
    use super::solver::{solve_and_rewrite, ApplyTiming};

    solve_and_rewrite(&ConstProp, cfg, blocks, ApplyTiming::Deferred, |inbound, block| {
        let mut local = inbound.clone();
        for instr in &mut block.instrs {
            let Instr::Value(v) = instr else { continue };
            let folded = if v.op == Opcode::Const {
                None
            } else if v.op.is_pure_arith() {
                let args: Vec<Value> = v.args.iter().map(|a| local.get(a)).collect();
                eval(v.op, &args)
            } else {
                None
            };

            if let Some(lit) = folded {
                v.op = Opcode::Const;
                v.value = Some(lit);
                v.args.clear();
                local.0.insert(v.dest.clone(), Value::Known(lit));
            } else {
                let value = if v.op == Opcode::Const {
                    v.value.map_or(Value::Varying, Value::Known)
                } else if v.op == Opcode::Id {
                    v.args.first().map(|a| local.get(a)).unwrap_or(Value::Undef)
                } else {
                    Value::Varying
                };
                local.0.insert(v.dest.clone(), value);
            }
        }
    });
}
