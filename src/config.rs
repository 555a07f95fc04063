//! Pass-pipeline configuration (§6): named, ordered lists of passes, loaded
//! from an optional TOML file via the `config` crate.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{ConfigError, Result};
use crate::pipeline::PassName;

/// A pass-pipeline configuration document: named lists of pass names run in
/// order.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pipelines: BTreeMap<String, Vec<String>>,
}

impl PipelineConfig {
    /// Load a configuration document from `path`, falling back to the
    /// built-in pipelines when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::builtin());
        };

        let built = config::Config::builder()
            .add_source(config::File::from(path))
            .build()
            .map_err(ConfigError::Load)?;
        built.try_deserialize::<PipelineConfig>().map_err(ConfigError::Load).map_err(Into::into)
    }

    /// The pipelines available with no configuration file on disk.
    #[must_use]
    pub fn builtin() -> Self {
        let pipeline = |names: &[&str]| names.iter().map(|n| (*n).to_string()).collect();
        let mut pipelines = BTreeMap::new();
        pipelines.insert("default".to_string(), pipeline(&["ssa", "constprop", "lvn", "dce-live"]));
        pipelines.insert(
            "aggressive".to_string(),
            pipeline(&["ssa", "constprop", "lvn", "dce-live", "dse", "licm", "dce-live"]),
        );
        PipelineConfig { pipelines }
    }

    /// Resolve a named pipeline to its ordered, parsed pass list.
    pub fn passes(&self, name: &str) -> Result<Vec<PassName>> {
        let names = self.pipelines.get(name).ok_or_else(|| ConfigError::UnknownPass(name.to_string()))?;
        if names.is_empty() {
            return Err(ConfigError::EmptyPipeline.into());
        }
        names.iter().map(|n| PassName::parse(n)).collect()
    }
}
