use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::checker::{HealthCheck, ProbeOutcome};
use crate::config::{CheckTarget, MonitorConfig};
use crate::monitor::error::MonitorError;
use crate::monitor::event::NotificationEvent;
use crate::monitor::state::{ErrorStateTracker, MonitorState, TransitionDecision};
use crate::notify::NotificationDispatcher;

/// Sequential check-and-notify loop over a fixed set of targets.
pub struct Monitor {
    id: Uuid,
    config: MonitorConfig,
    targets: Vec<CheckTarget>,
    checker: Arc<dyn HealthCheck>,
    tracker: ErrorStateTracker,
    dispatcher: NotificationDispatcher,
    state: MonitorState,
    cycles: u64,
}

impl Monitor {
    /// Announce startup on every channel and return a running monitor.
    ///
    /// `config.notify_timeout` replaces whatever deadline `dispatcher` carried.
    pub async fn start(
        targets: Vec<CheckTarget>,
        config: MonitorConfig,
        checker: Arc<dyn HealthCheck>,
        dispatcher: NotificationDispatcher,
    ) -> Self {
        let id = Uuid::new_v4();
        let dispatcher = dispatcher.with_timeout(config.notify_timeout);
        debug!(version = env!("CARGO_PKG_VERSION"), "This is promon");
        info!(
            monitor_id = %id,
            targets = targets.len(),
            channels = dispatcher.len(),
            interval_secs = config.interval.as_secs(),
            "Starting monitor"
        );

        dispatcher
            .dispatch(&NotificationEvent::startup(std::process::id()))
            .await;

        Self {
            id,
            config,
            targets,
            checker,
            tracker: ErrorStateTracker::new(),
            dispatcher,
            state: MonitorState::Running,
            cycles: 0,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn targets(&self) -> &[CheckTarget] {
        &self.targets
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn error_state(&self) -> &ErrorStateTracker {
        &self.tracker
    }

    /// Poll until `shutdown` resolves, then announce termination.
    ///
    /// `shutdown` may interrupt a cycle or the inter-cycle sleep.
    pub async fn run<F>(mut self, shutdown: F) -> Self
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = self.poll_and_sleep() => {}
                _ = &mut shutdown => break,
            }
        }

        self.shutdown().await;
        self
    }

    async fn poll_and_sleep(&mut self) {
        self.poll_once().await;
        tokio::time::sleep(self.config.interval).await;
    }

    /// Run one cycle inside the crash-recovery boundary.
    ///
    /// Any error or panic escaping the cycle clears all error state and is
    /// reported as an internal error; it never propagates.
    pub async fn poll_once(&mut self) {
        self.cycles += 1;

        let fault = match AssertUnwindSafe(self.run_cycle()).catch_unwind().await {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e,
            Err(payload) => MonitorError::from_panic(payload.as_ref()),
        };

        self.application_error(&fault).await;
    }

    async fn run_cycle(&mut self) -> Result<(), MonitorError> {
        for target in &self.targets {
            let outcome = self.checker.check(target).await?;
            let decision = self.tracker.record(&target.url, &outcome);
            if let Some(event) = event_for(target, &outcome, decision) {
                self.dispatcher.dispatch(&event).await;
            }
        }
        Ok(())
    }

    async fn application_error(&mut self, fault: &MonitorError) {
        error!(
            monitor_id = %self.id,
            cycle = self.cycles,
            cleared = ?self.tracker.faulting_urls(),
            error = %fault,
            "An uncaught error occurred in the check cycle"
        );
        self.tracker.clear();
        self.dispatcher
            .dispatch(&NotificationEvent::internal_error(fault.to_string()))
            .await;
    }

    async fn shutdown(&mut self) {
        info!(monitor_id = %self.id, cycles = self.cycles, "Stopping monitor");
        self.state = MonitorState::Terminated;
        self.dispatcher
            .dispatch(&NotificationEvent::shutdown(std::process::id()))
            .await;
    }
}

/// Translate a tracker decision into at most one notification.
fn event_for(
    target: &CheckTarget,
    outcome: &ProbeOutcome,
    decision: TransitionDecision,
) -> Option<NotificationEvent> {
    let url = target.url.as_str();
    match decision {
        TransitionDecision::FirstAlert => {
            warn!(url, outcome = %outcome, "{}", outcome.label());
            Some(NotificationEvent::alert(url, outcome))
        }
        TransitionDecision::RepeatSuppressed => {
            warn!(url, outcome = %outcome, "{} - no notification", outcome.label());
            None
        }
        TransitionDecision::Recovered => {
            info!(url, "Error resolved");
            Some(NotificationEvent::resolved(url))
        }
        TransitionDecision::NoChange => {
            debug!(url, "Target healthy");
            None
        }
    }
}
