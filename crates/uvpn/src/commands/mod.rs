//! Command dispatch: bridges CLI args -> core services -> output formatting.

pub mod audit;
pub mod config_cmd;
pub mod counter;
pub mod normalize;
pub mod pool;
pub mod run;

use std::sync::Arc;

use uvpn_config::Config;
use uvpn_core::{CounterStore, FileStore, Provisioner, StaticDirectory};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a command that needs the loaded configuration.
pub async fn dispatch(cmd: Command, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Run(args) => run::handle(args, cfg, global).await,
        Command::Audit => audit::handle(cfg, global).await,
        Command::Counter(args) => counter::handle(args, cfg, global).await,
        Command::Pool(args) => pool::handle(args, cfg, global),
        Command::Config(args) => config_cmd::handle(args, cfg, global),
        // Normalize and Completions are handled before config is required
        Command::Normalize(_) | Command::Completions(_) => Ok(()),
    }
}

// ── Service construction ────────────────────────────────────────────

fn open_store(cfg: &Config) -> Arc<FileStore> {
    Arc::new(FileStore::new(&cfg.store.path))
}

/// The counter on its own, for commands that never touch CCD files.
fn counter_store(cfg: &Config) -> CounterStore {
    CounterStore::new(open_store(cfg), &cfg.counter.key)
}

/// A provisioner wired to the configured store and roster.
fn build_provisioner(cfg: &Config) -> Result<Provisioner, CliError> {
    let runtime = cfg.to_provisioner_config()?;
    let directory = Arc::new(StaticDirectory::load(&cfg.directory.roster)?);
    tracing::debug!(
        ccd_dir = %runtime.ccd_dir.display(),
        pool = %runtime.pool,
        store = %cfg.store.path.display(),
        "provisioner configured"
    );
    Ok(Provisioner::new(&runtime, directory, open_store(cfg)))
}
