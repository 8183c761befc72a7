//! Run command: consume envelopes until end of input or ctrl-c.

use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uvpn_config::Config;
use uvpn_core::{ConsumeSummary, Consumer};

use crate::cli::{GlobalOpts, RunArgs};
use crate::error::CliError;
use crate::output;

use super::build_provisioner;

pub async fn handle(args: RunArgs, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let provisioner = build_provisioner(cfg)?;
    if let Err(e) = provisioner.prune_applied().await {
        warn!(error = %e, "could not prune redelivery markers");
    }
    let consumer = Consumer::new(Arc::new(provisioner), cfg.subscription()?);

    let cancel = CancellationToken::new();
    let shutdown = tokio::spawn(watch_ctrl_c(cancel.clone()));

    let reader = open_events(&args.events).await?;
    let summary = consumer.run(reader, cancel).await;
    shutdown.abort();
    let summary = summary?;

    let out = output::render_single(
        &global.output,
        &summary,
        |s| {
            format!(
                "Received {}, succeeded {}, failed {}, skipped {}",
                s.received, s.succeeded, s.failed, s.skipped
            )
        },
        summary_plain,
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn summary_plain(s: &ConsumeSummary) -> String {
    format!("{} {} {} {}", s.received, s.succeeded, s.failed, s.skipped)
}

async fn open_events(path: &Path) -> Result<Box<dyn AsyncBufRead + Unpin + Send>, CliError> {
    if path == Path::new("-") {
        info!("reading events from stdin");
        return Ok(Box::new(BufReader::new(tokio::io::stdin())));
    }
    let file = tokio::fs::File::open(path).await?;
    info!(path = %path.display(), "reading events from file");
    Ok(Box::new(BufReader::new(file)))
}

async fn watch_ctrl_c(cancel: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("interrupt received; finishing in-flight requests");
            cancel.cancel();
        }
        Err(e) => warn!(error = %e, "cannot listen for ctrl-c"),
    }
}
