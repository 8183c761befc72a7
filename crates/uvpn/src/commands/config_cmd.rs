//! Config command handlers.

use uvpn_config::Config;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

pub fn handle(args: ConfigArgs, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let out = match args.command {
        ConfigCommand::Show => {
            // Report invalid settings instead of printing them
            cfg.to_provisioner_config()?;
            cfg.subscription()?;
            uvpn_config::render_config(cfg)?
        }
        ConfigCommand::Path => global
            .config
            .clone()
            .unwrap_or_else(uvpn_config::config_path)
            .display()
            .to_string(),
    };
    output::print_output(out.trim_end(), global.quiet);
    Ok(())
}
