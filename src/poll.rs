use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::devicefarm::arn::{console_url, Arn};
use crate::devicefarm::{Counters, DeviceFarmApi, ExecutionResult, Run};
use crate::prelude::*;
use crate::run::helpers::sleep_or_cancel;

pub const RUN_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Latest known state of a run, replaced wholesale on every poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResultSnapshot {
    pub run_id: String,
    pub run_name: String,
    pub status: String,
    pub result: Option<ExecutionResult>,
    pub counters: Counters,
    pub console_url: Option<String>,
}

impl TestResultSnapshot {
    pub fn from_run(run: &Run) -> Self {
        let run_id = run
            .arn
            .parse::<Arn>()
            .map(|arn| arn.short_id().to_owned())
            .unwrap_or_else(|_| run.arn.clone());
        Self {
            run_id,
            run_name: run.name.clone(),
            status: run.status.clone(),
            result: run.result,
            counters: run.counters.clone(),
            console_url: console_url(&run.arn).ok(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status.eq_ignore_ascii_case("COMPLETED")
    }

    /// `COMPLETED` becomes `Completed`.
    pub fn display_status(&self) -> String {
        let lower = self.status.to_ascii_lowercase();
        let mut chars = lower.chars();
        match chars.next() {
            Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
            None => String::new(),
        }
    }
}

/// Waits for a scheduled run to complete. There is no overall timeout, only cancellation
/// stops the wait early.
pub struct RunPoller<'a> {
    api: &'a dyn DeviceFarmApi,
    cancellation: CancellationToken,
    interval: Duration,
}

impl<'a> RunPoller<'a> {
    pub fn new(api: &'a dyn DeviceFarmApi, cancellation: CancellationToken) -> Self {
        Self {
            api,
            cancellation,
            interval: RUN_POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub async fn wait_for_completion(&self, run_arn: &str) -> Result<TestResultSnapshot> {
        loop {
            let run = self
                .api
                .get_run(run_arn)
                .await
                .with_context(|| format!("Failed to fetch run {run_arn}"))?;
            let snapshot = TestResultSnapshot::from_run(&run);
            info!("Run {} status {}", snapshot.run_name, snapshot.status);
            if snapshot.is_completed() {
                return Ok(snapshot);
            }
            sleep_or_cancel(&self.cancellation, self.interval, "the run to complete").await?;
        }
    }
}
