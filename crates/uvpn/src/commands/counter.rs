//! Counter command handlers.

use std::net::Ipv4Addr;

use serde::Serialize;
use uvpn_config::Config;
use uvpn_core::{AddressPool, CounterError, PoolError};

use crate::cli::{CounterArgs, CounterCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::counter_store;

#[derive(Serialize)]
struct CounterView {
    key: String,
    value: u32,
    /// Address the next new account will receive, if still in the pool.
    next_address: Option<Ipv4Addr>,
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: CounterArgs, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let pool = AddressPool::new(cfg.pool()?);
    let counter = counter_store(cfg);

    match args.command {
        CounterCommand::Show => {
            let value = counter
                .current()
                .await?
                .ok_or_else(|| CounterError::CounterMissing {
                    key: counter.key().to_owned(),
                })?;
            let view = CounterView {
                key: counter.key().to_owned(),
                value,
                next_address: pool.offset_to_address(value).ok(),
            };
            let out = output::render_single(
                &global.output,
                &view,
                |v| match v.next_address {
                    Some(address) => format!("{} = {} (next address {address})", v.key, v.value),
                    None => format!("{} = {} (pool exhausted)", v.key, v.value),
                },
                |v| v.value.to_string(),
            )?;
            output::print_output(&out, global.quiet);
        }
        CounterCommand::Seed { value, force } => {
            let range = pool.assignable();
            if !range.contains(&value) {
                return Err(PoolError::OffsetOutOfRange {
                    offset: value,
                    first: *range.start(),
                    last: *range.end(),
                    pool: pool.net(),
                }
                .into());
            }
            counter.seed(value, force).await?;
            tracing::info!(key = counter.key(), value, "allocation counter seeded");
            output::print_output(
                &format!("{} seeded with {value}", counter.key()),
                global.quiet,
            );
        }
    }
    Ok(())
}
