//! Audit command handler.

use serde::Serialize;
use tabled::Tabled;
use uvpn_config::Config;
use uvpn_core::AuditRow;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::build_provisioner;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Serialize, Tabled)]
struct AuditLine {
    #[tabled(rename = "Account")]
    account: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Offset")]
    offset: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&AuditRow> for AuditLine {
    fn from(row: &AuditRow) -> Self {
        Self {
            account: row.account.clone(),
            address: row.address.map_or_else(|| "-".into(), |a| a.to_string()),
            offset: row.offset.map_or_else(|| "-".into(), |o| o.to_string()),
            status: row.status.to_string(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let provisioner = build_provisioner(cfg)?;
    let report = uvpn_core::audit(&provisioner).await?;

    let lines: Vec<AuditLine> = report.rows.iter().map(AuditLine::from).collect();
    let out = output::render_list(&global.output, &lines, |l| {
        format!("{}\t{}", l.account, l.status)
    })?;
    output::print_output(&out, global.quiet);

    match report.problems().count() {
        0 => Ok(()),
        count => Err(CliError::AuditFindings { count }),
    }
}
