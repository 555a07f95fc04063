//! Local value numbering (§4.8): block-local common-subexpression
//! elimination and constant folding, driven by an insertion-ordered table
//! so the canonical variable chosen for a repeated computation -- and thus
//! the exact output -- is deterministic across runs on the same input.

use indexmap::IndexMap;

use crate::cfg::BasicBlock;
use crate::ir::{Instr, Literal, Opcode};

/// A value key identifies a computation up to its operands' *values*, not
/// their variable names -- two additions of the same two value-numbers
/// collide here even if one used different operand names than the other.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ValueKey {
    Const(Literal),
    Op(Opcode, Vec<usize>),
}

struct Table {
    /// variable name -> its current value number.
    var_number: IndexMap<String, usize>,
    /// value number -> the variable currently holding it (for rewriting
    /// redundant computations to `id` of that variable).
    canonical: IndexMap<usize, String>,
    /// value key -> the value number it was first assigned.
    numbers: IndexMap<ValueKey, usize>,
    /// value number -> every variable name currently bound to it. When a
    /// name is rebound away from a number and that was its last holder, the
    /// number is no longer reachable from any live name, so its `numbers`
    /// and `canonical` entries must be dropped too -- otherwise a later
    /// instruction could look the stale key back up and alias itself to a
    /// name that has since been reassigned.
    number_holders: IndexMap<usize, Vec<String>>,
    next: usize,
}

impl Table {
    fn new() -> Self {
        Table {
            var_number: IndexMap::new(),
            canonical: IndexMap::new(),
            numbers: IndexMap::new(),
            number_holders: IndexMap::new(),
            next: 0,
        }
    }

    fn number_of(&self, var: &str) -> Option<usize> {
        self.var_number.get(var).copied()
    }

    fn fresh_number(&mut self) -> usize {
        let n = self.next;
        self.next += 1;
        n
    }

    fn bind(&mut self, var: &str, number: usize) {
        if let Some(previous) = self.var_number.insert(var.to_string(), number) {
            if previous != number {
                self.clobber(previous, var);
            }
        }
        // `or_insert_with` means a redefinition of `var` under a fresh
        // number never steals the canonical slot from whichever variable
        // first produced that number -- a later instruction's `id` rewrite
        // keeps pointing at the original producer.
        self.canonical.entry(number).or_insert_with(|| var.to_string());
        self.number_holders.entry(number).or_insert_with(Vec::new).push(var.to_string());
    }

    /// Drop `var` as a holder of `previous`. If it was the last one, the
    /// value number has no live holder left: remove its `numbers` entry so
    /// a later computation with the same value key is not wrongly aliased
    /// to a name that no longer holds that value.
    fn clobber(&mut self, previous: usize, var: &str) {
        let Some(holders) = self.number_holders.get_mut(&previous) else { return };
        holders.retain(|h| h != var);
        if holders.is_empty() {
            self.number_holders.shift_remove(&previous);
            self.canonical.shift_remove(&previous);
            let stale_key = self.numbers.iter().find_map(|(k, &n)| (n == previous).then_some(k.clone()));
            if let Some(key) = stale_key {
                self.numbers.shift_remove(&key);
            }
        } else if self.canonical.get(&previous).map(String::as_str) == Some(var) {
            self.canonical.insert(previous, holders[0].clone());
        }
    }
}

fn value_key(op: Opcode, value: Option<Literal>, arg_numbers: &[usize]) -> ValueKey {
    if op == Opcode::Const {
        return ValueKey::Const(value.expect("const instruction always carries a value"));
    }
    let mut args = arg_numbers.to_vec();
    if op.is_commutative() {
        args.sort_unstable();
    }
    ValueKey::Op(op, args)
}

/// Run LVN over every block independently, rewriting redundant
/// computations to `id` and folding constant-foldable ones in place.
pub fn run(blocks: &mut [BasicBlock]) {
    for block in blocks {
        run_block(block);
    }
}

fn run_block(block: &mut BasicBlock) {
    let mut table = Table::new();

    for instr in &mut block.instrs {
        let Instr::Value(v) = instr else { continue };
        if !(v.op == Opcode::Const || v.op.is_pure_arith() || v.op == Opcode::Id) {
            // Memory ops, calls, and phi are not tracked -- they either have
            // no stable value identity (phi depends on control flow) or
            // their re-execution is unsafe (loads, calls), so LVN leaves
            // them untouched but still assigns their destination a fresh,
            // unshared number so later instructions don't alias it.
            let n = table.fresh_number();
            table.bind(&v.dest, n);
            continue;
        }

        let arg_numbers: Vec<usize> = v
            .args
            .iter()
            .map(|a| {
                table.number_of(a).unwrap_or_else(|| {
                    let n = table.fresh_number();
                    table.bind(a, n);
                    n
                })
            })
            .collect();

        let key = value_key(v.op, v.value, &arg_numbers);

        if let Some(&existing) = table.numbers.get(&key) {
            let canonical_var = table.canonical[&existing].clone();
            v.op = Opcode::Id;
            v.args = vec![canonical_var];
            v.value = None;
            table.bind(&v.dest, existing);
            continue;
        }

        if v.op.is_pure_arith() {
            if let Some(folded) = try_fold(v.op, &v.args, &table) {
                v.op = Opcode::Const;
                v.ty = folded.type_of();
                v.value = Some(folded);
                v.args.clear();
                let n = table.fresh_number();
                table.numbers.insert(ValueKey::Const(folded), n);
                table.bind(&v.dest, n);
                continue;
            }
        }

        let n = table.fresh_number();
        table.numbers.insert(key, n);
        table.bind(&v.dest, n);
    }
}

fn try_fold(op: Opcode, args: &[String], table: &Table) -> Option<Literal> {
    let literals: Vec<Literal> = args
        .iter()
        .map(|a| {
            let n = table.number_of(a)?;
            let key = table.numbers.iter().find_map(|(k, &num)| (num == n).then_some(k))?;
            match key {
                ValueKey::Const(lit) => Some(*lit),
                ValueKey::Op(..) => None,
            }
        })
        .collect::<Option<Vec<_>>>()?;

    match (op, literals.as_slice()) {
        (Opcode::Add, [a, b]) => Some(Literal::Int(a.as_int()? + b.as_int()?)),
        (Opcode::Sub, [a, b]) => Some(Literal::Int(a.as_int()? - b.as_int()?)),
        (Opcode::Mul, [a, b]) => Some(Literal::Int(a.as_int()? * b.as_int()?)),
        (Opcode::Div, [a, b]) => {
            let (a, b) = (a.as_int()?, b.as_int()?);
            if b == 0 { None } else { Some(Literal::Int(a / b)) }
        }
        (Opcode::Eq, [a, b]) => Some(Literal::Bool(a.as_int()? == b.as_int()?)),
        (Opcode::Lt, [a, b]) => Some(Literal::Bool(a.as_int()? < b.as_int()?)),
        (Opcode::Gt, [a, b]) => Some(Literal::Bool(a.as_int()? > b.as_int()?)),
        (Opcode::Le, [a, b]) => Some(Literal::Bool(a.as_int()? <= b.as_int()?)),
        (Opcode::Ge, [a, b]) => Some(Literal::Bool(a.as_int()? >= b.as_int()?)),
        (Opcode::And, [a, b]) => Some(Literal::Bool(a.as_bool()? && b.as_bool()?)),
        (Opcode::Or, [a, b]) => Some(Literal::Bool(a.as_bool()? || b.as_bool()?)),
        (Opcode::Xor, [a, b]) => Some(Literal::Bool(a.as_bool()? ^ b.as_bool()?)),
        (Opcode::Not, [a]) => Some(Literal::Bool(!a.as_bool()?)),
        _ => None,
    }
}
