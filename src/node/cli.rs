use anyhow::{anyhow, bail, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::consensus::pow::Difficulty;
use crate::crypto::Hash;
use crate::ledger::block::{Block, Post};
use crate::ledger::verify::verify_bytes;
use crate::ledger::Ledger;
use crate::node::config::NodeConfig;
use crate::utils::init_logging;
use crate::utils::metrics::{HASHES_COMPUTED, METRICS};

/// CLI for sealing and checking post blocks.
#[derive(Parser)]
#[clap(name = "postchain", version)]
pub struct Cli {
    /// Path to a TOML config file
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Root under which `Data<suffix>/Blocks` lives
    #[clap(long)]
    pub data_root: Option<PathBuf>,

    /// Environment discriminator appended to `Data`
    #[clap(long)]
    pub suffix: Option<String>,

    /// Required leading zero hex digits
    #[clap(long)]
    pub difficulty: Option<u32>,

    /// Mining threads
    #[clap(long)]
    pub workers: Option<usize>,

    #[clap(subcommand)]
    pub cmd: Cmd,
}

#[derive(Args, Debug, Default)]
pub struct PostArgs {
    /// Post payload given inline (repeatable)
    #[clap(long = "post")]
    pub posts: Vec<String>,

    /// Post payload read from a file (repeatable)
    #[clap(long = "post-file")]
    pub post_files: Vec<PathBuf>,

    /// Give up mining after this many seconds
    #[clap(long)]
    pub timeout_secs: Option<u64>,
}

impl PostArgs {
    fn load(&self) -> Result<Vec<Post>> {
        let mut posts: Vec<Post> = self.posts.iter().map(|p| Post::new(p.clone())).collect();
        for path in &self.post_files {
            posts.push(Post::new(std::fs::read(path)?));
        }
        if posts.is_empty() {
            bail!("at least one --post or --post-file is required");
        }
        Ok(posts)
    }
}

#[derive(Subcommand)]
pub enum Cmd {
    /// Seal the first block of an empty chain
    Genesis(PostArgs),
    /// Seal a block on top of the latest indexed block
    Mine(PostArgs),
    /// Check a block file's posts against its Merkle root
    Verify { file: PathBuf },
    /// Re-validate content, work and linkage of the stored chain
    Validate,
    /// Print a stored block
    Show { hash: String },
}

impl Cli {
    fn node_config(&self) -> Result<NodeConfig> {
        let mut cfg = NodeConfig::resolve(self.config.as_deref())?;
        if let Some(root) = &self.data_root {
            cfg.data_root = root.clone();
        }
        if let Some(suffix) = &self.suffix {
            cfg.data_suffix = Some(suffix.clone());
        }
        if let Some(d) = self.difficulty {
            cfg.difficulty = Difficulty::new(d)?;
        }
        if let Some(w) = self.workers {
            cfg.workers = w.max(1);
        }
        Ok(cfg)
    }
}

/// Run the nonce search off the async runtime; Ctrl-C or the timeout cancel it.
async fn seal(cfg: &NodeConfig, previous: Option<Hash>, args: &PostArgs) -> Result<Block> {
    let posts = args.load()?;
    let token = CancellationToken::new();
    let (miner, difficulty, worker_token) = (cfg.miner(), cfg.difficulty, token.clone());
    info!(difficulty = %difficulty, workers = miner.workers(), posts = posts.len(), "mining");

    let mut task = tokio::task::spawn_blocking(move || Block::seal(previous, posts, difficulty, &miner, &worker_token));
    let timeout = args.timeout_secs.map(Duration::from_secs);
    let deadline = async move {
        match timeout {
            Some(t) => tokio::time::sleep(t).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        res = &mut task => Ok(res??),
        _ = tokio::signal::ctrl_c() => {
            token.cancel();
            let _ = task.await;
            bail!("mining interrupted")
        }
        _ = deadline => {
            warn!("mining timed out");
            token.cancel();
            let _ = task.await;
            bail!("mining timed out after {}s", args.timeout_secs.unwrap_or_default())
        }
    }
}

pub async fn run_cli() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let cfg = cli.node_config()?;

    match &cli.cmd {
        Cmd::Genesis(args) => {
            let mut ledger = Ledger::open(cfg.block_dir(), cfg.difficulty)?;
            if ledger.latest_hash().is_some() {
                bail!("chain in {} already has a genesis block", ledger.dir().display());
            }
            let block = seal(&cfg, None, args).await?;
            let path = ledger.append(&block)?;
            println!("genesis {} -> {}", block.hash(), path.display());
        }
        Cmd::Mine(args) => {
            let mut ledger = Ledger::open(cfg.block_dir(), cfg.difficulty)?;
            let previous = ledger
                .latest_hash()
                .ok_or_else(|| anyhow!("no predecessor in {}: run `genesis` first", ledger.dir().display()))?;
            let block = seal(&cfg, Some(previous), args).await?;
            let path = ledger.append(&block)?;
            println!(
                "block {} (nonce {}, {} hashes) -> {}",
                block.hash(),
                block.header().nonce(),
                METRICS.counter(HASHES_COMPUTED),
                path.display()
            );
        }
        Cmd::Verify { file } => {
            let bytes = std::fs::read(file)?;
            if !verify_bytes(&bytes)? {
                bail!("{}: posts do not match the recorded merkle root", file.display());
            }
            println!("{}: ok", file.display());
        }
        Cmd::Validate => {
            let ledger = Ledger::open(cfg.block_dir(), cfg.difficulty)?;
            let n = ledger.validate()?;
            println!("chain of {} blocks in {} is valid", n, ledger.dir().display());
        }
        Cmd::Show { hash } => {
            let ledger = Ledger::open(cfg.block_dir(), cfg.difficulty)?;
            let block = ledger.get(&Hash::from_hex(hash)?)?;
            let header = block.header();
            println!("hash:        {}", block.hash());
            println!("version:     {}", header.version());
            match header.previous_hash() {
                Some(prev) => println!("previous:    {}", prev),
                None => println!("previous:    <genesis>"),
            }
            println!("merkle root: {}", header.merkle_root());
            println!("nonce:       {}", header.nonce());
            for (i, post) in block.posts().iter().enumerate() {
                println!("post[{}]:     {}", i, String::from_utf8_lossy(post.to_bytes()));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_overrides_and_subcommand() {
        let cli = Cli::try_parse_from([
            "postchain", "--difficulty", "2", "--suffix", "Test", "--workers", "0",
            "mine", "--post", "A", "--post", "B",
        ])
        .unwrap();
        let cfg = cli.node_config().unwrap();
        assert_eq!(cfg.difficulty, Difficulty::new(2).unwrap());
        assert_eq!(cfg.workers, 1);
        assert!(cfg.block_dir().ends_with("DataTest/Blocks"));
        match cli.cmd {
            Cmd::Mine(args) => assert_eq!(args.load().unwrap().len(), 2),
            _ => panic!("expected mine"),
        }
    }

    #[test]
    fn empty_post_args_are_rejected() {
        assert!(PostArgs::default().load().is_err());
    }

    #[tokio::test]
    async fn seal_runs_on_blocking_pool() {
        let cfg = NodeConfig { difficulty: Difficulty::new(1).unwrap(), workers: 2, ..NodeConfig::default() };
        let args = PostArgs { posts: vec!["hi".into()], ..PostArgs::default() };
        let block = seal(&cfg, None, &args).await.unwrap();
        assert!(cfg.difficulty.is_met_by(&block.hash()));
    }
}
