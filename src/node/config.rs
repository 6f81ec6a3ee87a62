use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::consensus::pow::{Difficulty, NonceMiner};

/// Environment variable naming the data directory discriminator (`Data<suffix>`).
pub const ENV_SUFFIX: &str = "POSTCHAIN_ENV";

/// Node configuration, loadable from TOML. Missing keys take defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub data_root: PathBuf,
    pub data_suffix: Option<String>,
    pub difficulty: Difficulty,
    pub workers: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("."),
            data_suffix: None,
            difficulty: Difficulty::default(),
            workers: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
        }
    }
}

impl NodeConfig {
    /// Load config from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let cfg: NodeConfig = toml::from_str(&data)?;
        Ok(cfg)
    }

    /// File config (or defaults), with the suffix falling back to `POSTCHAIN_ENV`.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => Self::load(p)?,
            None => Self::default(),
        };
        if cfg.data_suffix.is_none() {
            cfg.data_suffix = std::env::var(ENV_SUFFIX).ok().filter(|s| !s.is_empty());
        }
        Ok(cfg)
    }

    /// `<data_root>/Data<suffix>/Blocks`
    pub fn block_dir(&self) -> PathBuf {
        let suffix = self.data_suffix.as_deref().unwrap_or("");
        self.data_root.join(format!("Data{}", suffix)).join("Blocks")
    }

    pub fn miner(&self) -> NonceMiner {
        NonceMiner::new(self.workers)
    }
}
