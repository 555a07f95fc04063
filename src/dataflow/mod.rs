//! Dataflow analyses over basic-block control-flow graphs (§4.6, §4.7).
//!
//! [`solver`] is the generic worklist engine; everything else is a thin
//! [`solver::Analysis`] implementation over it.

mod alias;
mod constprop;
mod live;
mod solver;

pub use alias::{AliasFact, MayAlias, PointerSet};
pub use constprop::{fold, ConstFact, ConstProp, Value as ConstValue};
pub use live::{LiveSet, Liveness, VarIndex};
pub use solver::{solve, solve_and_rewrite, Analysis, ApplyTiming, DataflowFact, Direction, Facts};
