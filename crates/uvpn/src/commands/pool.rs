//! Pool command handlers.

use std::net::Ipv4Addr;

use serde::Serialize;
use uvpn_config::Config;
use uvpn_core::AddressPool;

use crate::cli::{GlobalOpts, PoolArgs, PoolCommand};
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct PoolSummary {
    cidr: String,
    netmask: Ipv4Addr,
    first: Option<Ipv4Addr>,
    last: Option<Ipv4Addr>,
    assignable: usize,
}

impl PoolSummary {
    fn of(pool: &AddressPool) -> Self {
        let range = pool.assignable();
        Self {
            cidr: pool.to_string(),
            netmask: pool.netmask(),
            first: pool.offset_to_address(*range.start()).ok(),
            last: pool.offset_to_address(*range.end()).ok(),
            assignable: range.count(),
        }
    }
}

fn or_dash(address: Option<Ipv4Addr>) -> String {
    address.map_or_else(|| "-".into(), |a| a.to_string())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: PoolArgs, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let pool = AddressPool::new(cfg.pool()?);

    let out = match args.command {
        PoolCommand::Show => {
            let summary = PoolSummary::of(&pool);
            output::render_single(
                &global.output,
                &summary,
                |s| {
                    format!(
                        "Pool:       {}\nNetmask:    {}\nAssignable: {} .. {} ({} addresses)",
                        s.cidr,
                        s.netmask,
                        or_dash(s.first),
                        or_dash(s.last),
                        s.assignable
                    )
                },
                |s| s.cidr.clone(),
            )?
        }
        PoolCommand::Address { offset } => pool.offset_to_address(offset)?.to_string(),
        PoolCommand::Offset { address } => pool.address_to_offset(address)?.to_string(),
    };

    output::print_output(&out, global.quiet);
    Ok(())
}
