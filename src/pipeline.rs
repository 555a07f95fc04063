//! The pass-pipeline driver (§4.11).
//!
//! Every optimization works on one function's control-flow graph in
//! isolation, so a whole program is just its per-function pipeline applied
//! to each function in turn -- independently enough that, behind the
//! `parallel` feature, [`run_pipeline`] fans the work out across a `rayon`
//! thread pool instead of a plain loop.

use std::collections::BTreeSet;

use tracing::instrument;

use crate::cfg;
use crate::dataflow;
use crate::error::{ConfigError, Result};
use crate::ir::{Function, Program};
use crate::opt;
use crate::ssa;

/// One optimization pass, named the way the CLI and pipeline config spell
/// it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassName {
    /// Convert to static single assignment form (§4.5).
    Ssa,
    /// Sparse conditional-free constant propagation and folding (§4.7).
    ConstProp,
    /// Local value numbering (§4.8).
    Lvn,
    /// Whole-function trivial dead code elimination (§4.9).
    DceTrivial,
    /// Per-block local dead code elimination (§4.9).
    DceLocal,
    /// Liveness-driven dead code elimination (§4.9).
    DceLive,
    /// Dead-store elimination (§4.9).
    Dse,
    /// Loop-invariant code motion (§4.10).
    Licm,
}

impl PassName {
    /// Parse a pass name as written in a pipeline config or the CLI's
    /// positional pass argument.
    pub fn parse(name: &str) -> Result<Self> {
        Ok(match name {
            "ssa" => PassName::Ssa,
            "constprop" => PassName::ConstProp,
            "lvn" => PassName::Lvn,
            "dce-trivial" => PassName::DceTrivial,
            "dce-local" => PassName::DceLocal,
            "dce-live" => PassName::DceLive,
            "dse" => PassName::Dse,
            "licm" => PassName::Licm,
            other => return Err(ConfigError::UnknownPass(other.to_string()).into()),
        })
    }

    /// The canonical spelling used in pipeline configs and CLI help.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PassName::Ssa => "ssa",
            PassName::ConstProp => "constprop",
            PassName::Lvn => "lvn",
            PassName::DceTrivial => "dce-trivial",
            PassName::DceLocal => "dce-local",
            PassName::DceLive => "dce-live",
            PassName::Dse => "dse",
            PassName::Licm => "licm",
        }
    }
}

/// Run `pass` over one function, rebuilding its control-flow graph, applying
/// the pass's effect, and flattening the rewritten blocks back into a flat
/// instruction stream.
#[instrument(level = "debug", skip(function), fields(function = %function.name, pass = pass.as_str()))]
pub fn run_pass_on_function(pass: PassName, function: &Function) -> Result<Function> {
    let (mut blocks, label_index, cfg) = cfg::build(function)?;

    match pass {
        PassName::Ssa => {
            let dom = cfg::compute_dominance(&cfg);
            blocks = ssa::convert(&function.args, blocks, &cfg, &dom);
        }
        PassName::ConstProp => dataflow::fold(&cfg, &mut blocks),
        PassName::Lvn => opt::lvn::run(&mut blocks),
        PassName::DceTrivial => opt::dce::trivial(&mut blocks),
        PassName::DceLocal => opt::dce::local(&mut blocks),
        PassName::DceLive => opt::dce::liveness_driven(&cfg, &mut blocks),
        PassName::Dse => opt::dse::run(&cfg, &mut blocks),
        PassName::Licm => {
            let dom = cfg::compute_dominance(&cfg);
            let loops = cfg::find_loops(&cfg, &dom);
            let (norm_blocks, _norm_labels, norm_cfg) =
                cfg::normalize_loops(&function.name, blocks, &label_index, &cfg, &loops)?;
            let norm_dom = cfg::compute_dominance(&norm_cfg);
            let norm_loops = cfg::find_loops(&norm_cfg, &norm_dom);
            let params: BTreeSet<String> = function.param_names().map(str::to_string).collect();
            blocks = norm_blocks;
            opt::licm::run(&norm_cfg, &mut blocks, &params, &norm_loops);
        }
    }

    let instrs = cfg::flatten(&blocks);
    Ok(Function { instrs, ..function.clone() })
}

/// Run `passes`, in order, over one function.
pub fn run_pipeline_on_function(passes: &[PassName], function: &Function) -> Result<Function> {
    let mut current = function.clone();
    for &pass in passes {
        current = run_pass_on_function(pass, &current)?;
    }
    Ok(current)
}

/// Run `passes` over every function in `program`.
///
/// Behind the `parallel` feature, functions are processed concurrently on a
/// `rayon` thread pool -- sound because every pass is strictly
/// intra-procedural, so one function's rewrite never observes another's.
pub fn run_pipeline(passes: &[PassName], program: &Program) -> Result<Program> {
    #[cfg(feature = "parallel")]
    let functions: Result<Vec<Function>> = {
        use rayon::prelude::*;
        program.functions.par_iter().map(|f| run_pipeline_on_function(passes, f)).collect()
    };

    #[cfg(not(feature = "parallel"))]
    let functions: Result<Vec<Function>> =
        program.functions.iter().map(|f| run_pipeline_on_function(passes, f)).collect();

    Ok(Program { functions: functions? })
}
