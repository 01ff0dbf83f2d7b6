//! Audit sink interface
//!
//! Security-relevant events (logins, lockouts, role changes, key issuance)
//! are recorded through this collaborator. Recording is fire-and-forget: the
//! sink has no way to fail the primary operation, and implementations are
//! expected to swallow their own errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// One security-relevant event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Acting user, when one is known
    pub user_id: Option<i32>,
    /// Dotted action name, e.g. `auth.login` or `rbac.role.delete`
    pub action: String,
    /// Kind of resource acted on, e.g. `user`, `role`, `api_key`
    pub resource_type: String,
    /// Identifier of the acted-on resource, when one exists
    pub resource_id: Option<String>,
    /// Structured detail payload
    pub details: Value,
    /// Client IP as reported by the transport
    pub ip_address: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    /// Create an event for an action on a resource type
    pub fn new(action: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            user_id: None,
            action: action.into(),
            resource_type: resource_type.into(),
            resource_id: None,
            details: json!({}),
            ip_address: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach the acting user
    pub fn with_user(mut self, user_id: i32) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Attach the acted-on resource identifier
    pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    /// Add one key to the detail payload
    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        if let Value::Object(ref mut map) = self.details {
            map.insert(key.to_string(), value.into());
        }
        self
    }

    /// Attach the client IP
    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }
}

/// Fire-and-forget recorder for [`AuditEvent`]s.
pub trait AuditSink: Send + Sync {
    /// Record one event. There is no error path back to the caller.
    fn record(&self, event: AuditEvent);
}
