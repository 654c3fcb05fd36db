//! Health Monitoring
//!
//! Tracks agent readiness for operators. Status is written from two
//! places only: construction-time validation and the periodic liveness
//! probe. Reads never block on I/O and never trigger a probe.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Externally observable readiness signal
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// Construction-time validation has not completed yet
    Initializing,
    /// Validated and serving
    Ready,
    /// Transient liveness-check failure; may recover to Ready
    Degraded,
    /// Validation failed at construction. Terminal: the status never
    /// leaves this state.
    Unavailable,
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentStatus::Initializing => write!(f, "initializing"),
            AgentStatus::Ready => write!(f, "ready"),
            AgentStatus::Degraded => write!(f, "degraded"),
            AgentStatus::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// Status plus a diagnostic string
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: AgentStatus,
    pub detail: String,
}

/// Mutex-guarded current status. Updates enforce the legal transition
/// set; illegal transitions are ignored with a warning rather than
/// panicking, since the probe task races with nothing but itself.
pub struct HealthMonitor {
    inner: Mutex<HealthReport>,
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthMonitor {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HealthReport {
                status: AgentStatus::Initializing,
                detail: "validating model endpoint".into(),
            }),
        }
    }

    /// Current status and detail. Pure read, cheap to poll.
    pub fn report(&self) -> HealthReport {
        self.inner.lock().expect("health lock poisoned").clone()
    }

    /// Current status only
    pub fn status(&self) -> AgentStatus {
        self.report().status
    }

    /// Initializing → Ready, or Degraded → Ready on probe recovery
    pub fn mark_ready(&self, detail: impl Into<String>) {
        self.transition(AgentStatus::Ready, detail.into());
    }

    /// Ready → Degraded on a transient probe failure
    pub fn mark_degraded(&self, detail: impl Into<String>) {
        self.transition(AgentStatus::Degraded, detail.into());
    }

    /// Initializing → Unavailable on failed validation. Terminal.
    pub fn mark_unavailable(&self, detail: impl Into<String>) {
        self.transition(AgentStatus::Unavailable, detail.into());
    }

    fn transition(&self, to: AgentStatus, detail: String) {
        let mut report = self.inner.lock().expect("health lock poisoned");

        let allowed = match (report.status, to) {
            // Unavailable never regresses
            (AgentStatus::Unavailable, _) => false,
            (AgentStatus::Initializing, AgentStatus::Ready | AgentStatus::Unavailable) => true,
            // Degraded is only reachable from a previously validated state
            (AgentStatus::Ready, AgentStatus::Degraded) => true,
            (AgentStatus::Degraded, AgentStatus::Ready) => true,
            (from, to) if from == to => true,
            _ => false,
        };

        if allowed {
            tracing::debug!(from = %report.status, to = %to, "health transition");
            report.status = to;
            report.detail = detail;
        } else {
            tracing::warn!(from = %report.status, to = %to, "ignoring illegal health transition");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_initializing() {
        let monitor = HealthMonitor::new();
        assert_eq!(monitor.status(), AgentStatus::Initializing);
    }

    #[test]
    fn test_ready_degraded_cycle() {
        let monitor = HealthMonitor::new();
        monitor.mark_ready("validated");
        assert_eq!(monitor.status(), AgentStatus::Ready);

        monitor.mark_degraded("probe failed");
        assert_eq!(monitor.status(), AgentStatus::Degraded);

        monitor.mark_ready("probe recovered");
        assert_eq!(monitor.status(), AgentStatus::Ready);
    }

    #[test]
    fn test_unavailable_is_terminal() {
        let monitor = HealthMonitor::new();
        monitor.mark_unavailable("bad credentials");
        assert_eq!(monitor.status(), AgentStatus::Unavailable);

        monitor.mark_ready("should not apply");
        monitor.mark_degraded("should not apply");
        assert_eq!(monitor.status(), AgentStatus::Unavailable);
        assert_eq!(monitor.report().detail, "bad credentials");
    }

    #[test]
    fn test_degraded_unreachable_from_initializing() {
        let monitor = HealthMonitor::new();
        monitor.mark_degraded("probe failed");
        assert_eq!(monitor.status(), AgentStatus::Initializing);
    }
}
