// ── Event consumer ──
//
// Reads newline-delimited JSON envelopes and hands each matching one to
// the provisioner on its own task. At most `max_in_flight` requests run
// at once. Cancelling stops intake; requests already started are allowed
// to finish, since a request past allocation must not be abandoned.

use std::io;
use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Subscription;
use crate::event::Envelope;
use crate::provisioner::Provisioner;

/// Counts for one consumer run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConsumeSummary {
    /// Non-blank lines read.
    pub received: usize,
    pub succeeded: usize,
    /// Malformed envelopes and failed requests.
    pub failed: usize,
    /// Envelopes for another topic or tag.
    pub skipped: usize,
}

impl ConsumeSummary {
    fn record(&mut self, joined: Result<bool, JoinError>) {
        match joined {
            Ok(true) => self.succeeded += 1,
            Ok(false) => self.failed += 1,
            Err(e) => {
                error!(error = %e, "provisioning task aborted");
                self.failed += 1;
            }
        }
    }
}

#[derive(Debug)]
pub struct Consumer {
    provisioner: Arc<Provisioner>,
    subscription: Subscription,
}

impl Consumer {
    pub fn new(provisioner: Arc<Provisioner>, subscription: Subscription) -> Self {
        Self {
            provisioner,
            subscription,
        }
    }

    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    /// Consume until end of input or cancellation, then drain in-flight work.
    ///
    /// A line that is not UTF-8 or not an envelope counts as failed. A read
    /// error ends intake; it is returned only after in-flight work drains.
    pub async fn run<R>(
        &self,
        mut reader: R,
        cancel: CancellationToken,
    ) -> io::Result<ConsumeSummary>
    where
        R: AsyncBufRead + Unpin,
    {
        let limit = Arc::new(Semaphore::new(self.subscription.max_in_flight.max(1)));
        let mut tasks = JoinSet::new();
        let mut summary = ConsumeSummary::default();
        let mut buf = Vec::new();
        let mut read_error = None;

        info!(
            topic = %self.subscription.topic,
            tag = self.subscription.tag.as_deref().unwrap_or("*"),
            max_in_flight = self.subscription.max_in_flight,
            "consumer started"
        );

        loop {
            buf.clear();
            let read = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    info!("shutdown requested; no further events will be read");
                    break;
                }
                read = reader.read_until(b'\n', &mut buf) => read,
            };
            match read {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, "event stream failed; no further events will be read");
                    read_error = Some(e);
                    break;
                }
            }

            let Ok(line) = std::str::from_utf8(&buf) else {
                summary.received += 1;
                summary.failed += 1;
                warn!(bytes = buf.len(), "dropping envelope that is not valid UTF-8");
                continue;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            summary.received += 1;

            let envelope = match Envelope::from_line(line) {
                Ok(envelope) => envelope,
                Err(e) => {
                    warn!(state = %e.state(), error = %e, "dropping undecodable envelope");
                    summary.failed += 1;
                    continue;
                }
            };

            if !self
                .subscription
                .accepts(&envelope.topic, envelope.tag.as_deref())
            {
                debug!(
                    topic = %envelope.topic,
                    tag = envelope.tag.as_deref().unwrap_or("-"),
                    "envelope not subscribed; skipping"
                );
                summary.skipped += 1;
                continue;
            }

            // The semaphore is never closed
            let Ok(permit) = Arc::clone(&limit).acquire_owned().await else {
                break;
            };
            let provisioner = Arc::clone(&self.provisioner);
            tasks.spawn(async move {
                let _permit = permit;
                provisioner.handle(&envelope).await.is_ok()
            });

            while let Some(joined) = tasks.try_join_next() {
                summary.record(joined);
            }
        }

        if !tasks.is_empty() {
            debug!(in_flight = tasks.len(), "waiting for in-flight requests");
        }
        while let Some(joined) = tasks.join_next().await {
            summary.record(joined);
        }

        info!(
            received = summary.received,
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            "consumer finished"
        );
        match read_error {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }
}
