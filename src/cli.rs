//! Command line interface (§4.13): run one pass, or a named pipeline from a
//! configuration file, over a program document read from stdin or a file.

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use clap::Parser;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::pipeline::{self, PassName};
use crate::serialize;

/// Run one or more optimization passes over a three-address IR document.
#[derive(Debug, Parser)]
#[command(author, version, about = "Intra-procedural optimizer for a typed three-address IR", long_about = None)]
pub struct Cli {
    /// The single pass to run (e.g. `lvn`, `dce-live`, `licm`). Ignored when `--pipeline` is given.
    pub pass: Option<String>,

    /// Run a named pipeline instead of a single pass.
    #[arg(long, conflicts_with = "pass")]
    pub pipeline: Option<String>,

    /// Path to a pipeline configuration file (TOML). With `--pipeline` and no
    /// `--config`, the built-in `default`/`aggressive` pipelines are used.
    #[arg(long, env = "TACOPT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Input program document; reads stdin when omitted.
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Output path; writes stdout when omitted.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Pretty-print the output JSON document.
    #[arg(long)]
    pub pretty: bool,

    /// Increase log verbosity; repeatable (`-v`, `-vv`, `-vvv`).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Parse a pipeline from the selected flags, run it, and write the
    /// rewritten program.
    ///
    /// # Errors
    ///
    /// Returns an error if the pass/pipeline name is unknown, the input
    /// document is not well-formed, or an I/O or configuration failure
    /// occurs.
    pub fn run(&self) -> Result<()> {
        let passes = self.resolve_passes()?;
        let input = self.read_input()?;
        let program = serialize::parse_program(&input)?;

        let rewritten = pipeline::run_pipeline(&passes, &program)?;

        let output = serialize::to_json(&rewritten, self.pretty)?;
        self.write_output(&output)
    }

    fn resolve_passes(&self) -> Result<Vec<PassName>> {
        if let Some(name) = &self.pipeline {
            let config = PipelineConfig::load(self.config.as_deref())?;
            return config.passes(name);
        }
        let pass = self.pass.as_deref().map(PassName::parse).transpose()?;
        Ok(pass.into_iter().collect())
    }

    fn read_input(&self) -> Result<String> {
        match &self.input {
            Some(path) => Ok(fs::read_to_string(path)?),
            None => {
                let mut buf = String::new();
                io::stdin().read_to_string(&mut buf)?;
                Ok(buf)
            }
        }
    }

    fn write_output(&self, content: &str) -> Result<()> {
        match &self.output {
            Some(path) => Ok(fs::write(path, content)?),
            None => {
                let stdout = io::stdout();
                let mut lock = stdout.lock();
                lock.write_all(content.as_bytes())?;
                lock.write_all(b"\n")?;
                Ok(())
            }
        }
    }
}
