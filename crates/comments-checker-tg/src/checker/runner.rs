use super::{
    classify, governor, ChannelDirectory, CheckError, CheckedChannel, FloodWait, Progress,
    ProgressSink, RemainingWorkFile, RunHandle, Tallies, Username, Verdict,
};
use crate::prelude::*;
use crate::Result;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub(crate) enum RunStatus {
    /// All channels of the run were checked
    Completed,

    /// The user stopped the run before all channels were checked
    Cancelled,
}

#[derive(Debug)]
pub(crate) struct RunOutcome {
    pub(crate) status: RunStatus,
    pub(crate) tallies: Arc<Tallies>,

    /// Number of channels left in the list of unchecked channels. These are
    /// the channels skipped due to cancellation plus the ones that didn't fit
    /// into the max batch size.
    pub(crate) unchecked: usize,
}

/// Checks the channels one by one, sorting them by the verdict.
///
/// The checks are strictly sequential. The channel directory is rate limited,
/// and concurrent requests would only make the flood waits longer.
pub(crate) struct BatchRunner<'a, D: ?Sized, P: ?Sized> {
    pub(crate) directory: &'a D,
    pub(crate) progress: &'a mut P,
    pub(crate) remaining: RemainingWorkFile,
    pub(crate) run: RunHandle,
    pub(crate) max_batch_size: usize,
    pub(crate) lookup_timeout: Duration,
}

impl<D, P> BatchRunner<'_, D, P>
where
    D: ChannelDirectory + ?Sized,
    P: ProgressSink + ?Sized,
{
    #[instrument(skip_all, fields(chat = %self.run.chat_id(), input = usernames.len()))]
    pub(crate) async fn run(self, usernames: Vec<String>) -> RunOutcome {
        let mut pending = VecDeque::from(usernames);

        let deferred: Vec<_> = if pending.len() > self.max_batch_size {
            pending.drain(self.max_batch_size..).collect()
        } else {
            vec![]
        };

        if !deferred.is_empty() {
            info!(
                deferred = deferred.len(),
                max_batch_size = self.max_batch_size,
                "The batch is too big, deferring the rest of the channels"
            );
        }

        self.save_remaining(&pending, &deferred).await;

        let total = pending.len();
        let start = Instant::now();
        let mut tallies = Tallies::default();
        let mut calls_made = 0;

        let status = loop {
            if !pending.is_empty() && self.run.is_cancelled() {
                info!(
                    processed = tallies.processed(),
                    total, "The run was cancelled by the user"
                );
                break RunStatus::Cancelled;
            }

            let Some(username) = pending.front().cloned() else {
                break RunStatus::Completed;
            };

            let verdict = match Username::parse(&username) {
                Some(parsed) => self.check(&parsed, total, &mut calls_made).await,
                None => {
                    debug!(%username, "Skipping invalid username");
                    Verdict::Error(CheckError::InvalidUsername)
                }
            };

            metrics::increment_counter!(
                "channel_checks_total",
                "verdict" => verdict.label(),
                "reason" => verdict.reason_label(),
            );

            pending.pop_front();

            self.run.record_checked(CheckedChannel {
                username: username.clone(),
                verdict: verdict.clone(),
            });
            tallies.record(username, verdict);

            let progress = Progress {
                processed: tallies.processed(),
                total,
                elapsed: start.elapsed(),
            };

            if let Err(err) = self.progress.tick(progress).await {
                warn!(err = tracing_err(&err), "Failed to report the progress");
            }

            self.save_remaining(&pending, &deferred).await;
        };

        let unchecked = pending.len() + deferred.len();
        let tallies = Arc::new(tallies);

        info!(
            status = <&str>::from(status),
            opened = tallies.opened.len(),
            closed = tallies.closed.len(),
            errors = tallies.errors.len(),
            unchecked,
            elapsed = tracing_duration(start.elapsed()),
            "Channel check run finished"
        );

        metrics::increment_counter!("channel_check_runs_total", "status" => <&str>::from(status));

        self.run.finish(tallies.clone());

        RunOutcome {
            status,
            tallies,
            unchecked,
        }
    }

    /// The list of unchecked channels is a convenience for the user. Failing
    /// to save it must not lose the results of the channels already checked.
    async fn save_remaining(&self, pending: &VecDeque<String>, deferred: &[String]) {
        if let Err(err) = self.remaining.write(pending.iter().chain(deferred)).await {
            warn!(
                err = tracing_err(&err),
                remaining = pending.len() + deferred.len(),
                "Failed to save the list of unchecked channels"
            );
        }
    }

    /// Checks the channel, honoring the rate limits. If the directory asks to
    /// slow down, the whole run waits for the requested time and the check is
    /// retried once. If the second attempt also hits the flood control the
    /// channel is reported as rate limited.
    async fn check(&self, username: &Username, total: usize, calls_made: &mut usize) -> Verdict {
        let delay = governor::next_delay(total, *calls_made);
        if !delay.is_zero() {
            trace!(delay = tracing_duration(delay), "Waiting before the next check");
            tokio::time::sleep(delay).await;
        }

        let mut retried = false;

        loop {
            *calls_made += 1;

            let FloodWait { retry_after } = match self.classify(username).await {
                Ok(verdict) => return verdict,
                Err(flood_wait) => flood_wait,
            };

            metrics::increment_counter!("channel_check_flood_waits_total");

            warn!(
                %username,
                retry_after = tracing_duration(retry_after),
                retried,
                "Hit the flood control, suspending the run"
            );

            tokio::time::sleep(retry_after).await;

            if retried {
                return Verdict::Error(CheckError::RateLimited { retry_after });
            }

            retried = true;
        }
    }

    async fn classify(&self, username: &Username) -> Result<Verdict, FloodWait> {
        let check = classify(self.directory, username).with_duration_log("Checked the channel");

        match tokio::time::timeout(self.lookup_timeout, check).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    %username,
                    timeout = tracing_duration(self.lookup_timeout),
                    "Channel lookup timed out"
                );
                Ok(Verdict::Error(CheckError::Unknown {
                    message: format!(
                        "the lookup timed out after {} s.",
                        self.lookup_timeout.as_secs()
                    ),
                }))
            }
        }
    }
}
