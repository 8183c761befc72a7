//! Normalize command handler: the producer side of an event.

use serde::Serialize;
use tabled::Tabled;
use uvpn_core::ProvisioningRequest;
use uvpn_core::normalize::{self, TokenKind};

use crate::cli::{GlobalOpts, NormalizeArgs};
use crate::error::CliError;
use crate::output;

/// Topic and tag the consumer subscribes to by default.
const EVENT_TOPIC: &str = "UVPN";

#[derive(Serialize, Tabled)]
struct TokenLine {
    #[tabled(rename = "Destination")]
    token: String,
    #[tabled(rename = "Kind")]
    kind: String,
}

pub fn handle(args: NormalizeArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cleaned = normalize::normalize(&args.tokens);
    if cleaned.tokens.is_empty() {
        return Err(CliError::Validation {
            field: "destinations".into(),
            reason: "no usable destination left after normalization".into(),
        });
    }

    let out = if let (Some(name), Some(id)) = (args.name, args.id) {
        let mut request = ProvisioningRequest::new(name, id, cleaned.tokens);
        request.ticket = args.ticket;

        let mut envelope =
            uvpn_core::Envelope::new(EVENT_TOPIC, serde_json::to_value(&request)?)
                .with_tag(EVENT_TOPIC);
        envelope.msg_id = args.msg_id;
        serde_json::to_string(&envelope)?
    } else {
        let lines: Vec<TokenLine> = cleaned
            .tokens
            .into_iter()
            .map(|token| TokenLine {
                kind: normalize::classify(&token)
                    .map_or(TokenKind::Hostname, |(kind, _)| kind)
                    .to_string(),
                token,
            })
            .collect();
        output::render_list(&global.output, &lines, |l| l.token.clone())?
    };

    output::print_output(&out, global.quiet);
    Ok(())
}
