use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::checker::ProbeOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorState {
    Running,
    Terminated,
}

impl std::fmt::Display for MonitorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Terminated => write!(f, "terminated"),
        }
    }
}

/// What the tracker decided about one probe outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionDecision {
    FirstAlert,
    RepeatSuppressed,
    Recovered,
    NoChange,
}

/// Per-URL fault flags.
///
/// A URL is present exactly while the last notification issued for it was an
/// alert with no resolution yet, so each uninterrupted fault episode produces
/// one `FirstAlert` and one `Recovered`.
#[derive(Debug, Clone, Default)]
pub struct ErrorStateTracker {
    faulting: HashSet<String>,
}

impl ErrorStateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, url: &str, outcome: &ProbeOutcome) -> TransitionDecision {
        if outcome.is_success() {
            if self.faulting.remove(url) {
                TransitionDecision::Recovered
            } else {
                TransitionDecision::NoChange
            }
        } else if self.faulting.contains(url) {
            TransitionDecision::RepeatSuppressed
        } else {
            self.faulting.insert(url.to_string());
            TransitionDecision::FirstAlert
        }
    }

    pub fn is_faulting(&self, url: &str) -> bool {
        self.faulting.contains(url)
    }

    pub fn faulting_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.faulting.iter().cloned().collect();
        urls.sort();
        urls
    }

    /// Forget every fault. Used after an unclassified failure, when prior
    /// state can no longer be trusted.
    pub fn clear(&mut self) {
        self.faulting.clear();
    }

    pub fn len(&self) -> usize {
        self.faulting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faulting.is_empty()
    }
}
