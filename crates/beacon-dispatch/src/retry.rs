// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry with exponential backoff for fire-and-forget dispatch.
//!
//! [`RetryPolicy`] is plain data. [`execute_with_retry`] runs any async
//! operation under a policy, and [`RetryScheduler`] uses it to drive
//! [`DispatchService`] attempts on background tasks. Attempts of one job are
//! strictly sequential; a job observes cancellation between attempts and
//! never interrupts an in-flight provider call.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use beacon_config::model::RetryConfig;
use beacon_core::types::{DispatchOutcome, NotificationKind, NotificationParams};
use beacon_core::{BeaconError, UserId, mask_phone};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::service::DispatchService;

/// How many attempts to make and how long to wait between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    /// Delay before retry `retry` (0-based): `min(base * 2^retry, max)`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Whether another attempt is allowed after `attempts_made`.
    pub fn should_retry(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }
}

/// Policies split by urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicies {
    pub urgent: RetryPolicy,
    pub standard: RetryPolicy,
}

impl RetryPolicies {
    pub fn from_config(config: &RetryConfig) -> Self {
        let max_delay = Duration::from_secs(config.max_delay_secs);
        Self {
            urgent: RetryPolicy::new(
                config.max_attempts,
                Duration::from_secs(config.urgent_base_delay_secs),
                max_delay,
            ),
            standard: RetryPolicy::new(
                config.max_attempts,
                Duration::from_secs(config.base_delay_secs),
                max_delay,
            ),
        }
    }

    pub fn for_kind(&self, kind: NotificationKind) -> &RetryPolicy {
        if kind.is_urgent() {
            &self.urgent
        } else {
            &self.standard
        }
    }
}

impl Default for RetryPolicies {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Result of running an operation under a [`RetryPolicy`].
#[derive(Debug)]
pub struct RetryRun<T> {
    /// Output of the last attempt, `None` if cancelled before the first.
    pub last: Option<T>,
    pub attempts: u32,
    pub cancelled: bool,
}

/// Run `op` until it yields a non-transient result, the policy is exhausted,
/// or `cancel` fires. `op` receives the 1-based attempt number.
pub async fn execute_with_retry<T, F, Fut, P>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut op: F,
    is_transient: P,
) -> RetryRun<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = T>,
    P: Fn(&T) -> bool,
{
    let mut run = RetryRun {
        last: None,
        attempts: 0,
        cancelled: false,
    };

    loop {
        if cancel.is_cancelled() {
            run.cancelled = true;
            return run;
        }

        run.attempts += 1;
        let output = op(run.attempts).await;
        let retry = is_transient(&output) && policy.should_retry(run.attempts);
        run.last = Some(output);
        if !retry {
            return run;
        }

        let delay = policy.delay_for(run.attempts - 1);
        debug!(attempt = run.attempts, ?delay, "transient failure, backing off");
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel.cancelled() => {
                run.cancelled = true;
                return run;
            }
        }
    }
}

/// One fire-and-forget send.
#[derive(Debug, Clone)]
pub struct RetryJob {
    pub user_id: UserId,
    pub phone_number: String,
    pub params: NotificationParams,
}

/// Final state of a scheduled job.
#[derive(Debug)]
pub struct JobReport {
    pub attempts: u32,
    pub cancelled: bool,
    /// Outcome of the last attempt, `None` if no attempt ran.
    pub last: Option<Result<DispatchOutcome, BeaconError>>,
}

impl JobReport {
    pub fn outcome(&self) -> Option<&DispatchOutcome> {
        self.last.as_ref().and_then(|r| r.as_ref().ok())
    }
}

/// Runs dispatch jobs on background tasks with per-kind backoff.
#[derive(Clone)]
pub struct RetryScheduler {
    service: Arc<DispatchService>,
    policies: RetryPolicies,
    cancel: CancellationToken,
    tasks: TaskTracker,
}

impl RetryScheduler {
    pub fn new(
        service: Arc<DispatchService>,
        policies: RetryPolicies,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            service,
            policies,
            cancel,
            tasks: TaskTracker::new(),
        }
    }

    /// Spawn a job. The handle resolves when the job finishes or is cancelled.
    pub fn schedule(&self, job: RetryJob) -> JoinHandle<JobReport> {
        let scheduler = self.clone();
        self.tasks.spawn(async move { scheduler.run(job).await })
    }

    /// Run a job on the current task.
    pub async fn run(&self, job: RetryJob) -> JobReport {
        let kind = job.params.kind();
        let policy = self.policies.for_kind(kind);
        let service = &self.service;
        let job = &job;

        let run = execute_with_retry(
            policy,
            &self.cancel,
            move |attempt| {
                if attempt > 1 {
                    beacon_prometheus::record_retry(&kind.to_string());
                    info!(
                        user_id = %job.user_id,
                        to = %mask_phone(&job.phone_number),
                        %kind,
                        attempt,
                        "retrying sms"
                    );
                }
                service.send_attempt(&job.user_id, &job.phone_number, &job.params, attempt)
            },
            |result| matches!(result, Ok(outcome) if outcome.is_transient_failure()),
        )
        .await;

        match &run.last {
            Some(Ok(outcome)) if outcome.is_transient_failure() && !run.cancelled => warn!(
                user_id = %job.user_id,
                %kind,
                attempts = run.attempts,
                "sms retries exhausted"
            ),
            Some(Err(e)) => warn!(user_id = %job.user_id, %kind, error = %e, "sms job failed"),
            _ => {}
        }
        if run.cancelled {
            info!(user_id = %job.user_id, %kind, attempts = run.attempts, "sms job cancelled");
        }

        JobReport {
            attempts: run.attempts,
            cancelled: run.cancelled,
            last: run.last,
        }
    }

    /// Number of jobs still running.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Cancel pending retries and wait for running jobs to stop.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.tasks.close();
        self.tasks.wait().await;
        debug!("retry scheduler drained");
    }
}
