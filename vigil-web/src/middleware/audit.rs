//! Tracing-backed audit sink
//!
//! Events land on the `audit` log target as single-line JSON, so operators
//! can route them to a separate file or shipper with an `EnvFilter` on the
//! target alone.

use tracing::{error, info};

use vigil_interfaces::{AuditEvent, AuditSink};

/// [`AuditSink`] that writes events to the `audit` tracing target
#[derive(Debug, Clone, Default)]
pub struct TracingAuditSink;

impl TracingAuditSink {
    pub fn new() -> Self {
        Self
    }
}

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => info!(target: "audit", "{json}"),
            Err(e) => error!(action = %event.action, error = %e, "failed to serialize audit event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_accepts_a_full_event() {
        let sink = TracingAuditSink::new();
        sink.record(
            AuditEvent::new("auth.login", "user")
                .with_user(7)
                .with_detail("method", "password")
                .with_ip("203.0.113.9"),
        );
    }
}
