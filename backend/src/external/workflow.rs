//! Automation webhook forwarder
//!
//! Relays a workflow name and a JSON payload to the external automation
//! service that sends transactional email. Failures never reach the caller.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::config::WorkflowConfig;

/// Client for the automation webhook
#[derive(Clone)]
pub struct WorkflowClient {
    http_client: Client,
    url: Option<String>,
    secret: Option<String>,
}

/// Body posted to the automation service
#[derive(Debug, Serialize)]
pub struct WorkflowTrigger<'a> {
    pub workflow: &'a str,
    pub payload: &'a Value,
}

/// Outcome of a trigger, for logging and tests
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    Delivered,
    Disabled,
    Rejected(String),
    Failed(String),
}

impl WorkflowClient {
    /// Create a new WorkflowClient
    pub fn new(config: &WorkflowConfig) -> Self {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Falling back to default HTTP client: {}", e);
                Client::new()
            });

        Self {
            http_client,
            url: config.url.clone().filter(|u| !u.trim().is_empty()),
            secret: config.secret.clone().filter(|s| !s.is_empty()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.url.is_some()
    }

    /// Forward a workflow trigger. Errors are logged and swallowed.
    pub async fn trigger(&self, workflow: &str, payload: Value) -> TriggerOutcome {
        let Some(url) = self.url.as_deref() else {
            tracing::debug!(workflow, "workflow forwarding disabled");
            return TriggerOutcome::Disabled;
        };

        if let Err(e) = shared::validate_workflow_name(workflow) {
            tracing::warn!(workflow, "refusing to forward workflow: {}", e);
            return TriggerOutcome::Rejected(e.to_string());
        }

        let body = WorkflowTrigger {
            workflow,
            payload: &payload,
        };

        let mut request = self.http_client.post(url).json(&body);
        if let Some(secret) = &self.secret {
            request = request.bearer_auth(secret);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(workflow, "workflow triggered");
                TriggerOutcome::Delivered
            }
            Ok(response) => {
                let status = response.status();
                tracing::warn!(workflow, %status, "automation service rejected workflow");
                TriggerOutcome::Rejected(status.to_string())
            }
            Err(e) => {
                tracing::warn!(workflow, "failed to reach automation service: {}", e);
                TriggerOutcome::Failed(e.to_string())
            }
        }
    }

    /// Fire-and-forget variant used from request handlers
    pub fn spawn_trigger(&self, workflow: &'static str, payload: Value) {
        if !self.is_enabled() {
            return;
        }
        let client = self.clone();
        tokio::spawn(async move {
            client.trigger(workflow, payload).await;
        });
    }
}
