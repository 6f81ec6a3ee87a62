pub mod cli;
pub mod config;

pub use cli::run_cli;
pub use config::NodeConfig;
