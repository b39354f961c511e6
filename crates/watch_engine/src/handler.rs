use serde::{Deserialize, Serialize};
use watch_core::{CheckReport, CheckResult};
use watch_logging::{watch_debug, watch_error};

use crate::detector::ChangeDetector;

/// Structured result of one externally triggered invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResponse {
    pub status_code: u16,
    pub body: String,
}

impl InvocationResponse {
    fn new(status_code: u16, body: impl Into<String>) -> Self {
        Self {
            status_code,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}

/// Entry point for one check. The trigger event is opaque and only logged.
pub async fn handle_invocation(
    detector: &ChangeDetector,
    event: &serde_json::Value,
) -> InvocationResponse {
    watch_debug!("Invocation for {} triggered by {}", detector.url(), event);
    match detector.run().await {
        Ok(report) => response_for(&report),
        Err(err) => {
            watch_error!("Invocation for {} failed: {}", detector.url(), err);
            InvocationResponse::new(500, format!("Check did not complete: {err}"))
        }
    }
}

pub fn response_for(report: &CheckReport) -> InvocationResponse {
    match report.result {
        CheckResult::NoChange => InvocationResponse::new(200, "No changes detected"),
        CheckResult::ChangeDetected => {
            if let Some(err) = &report.notify_error {
                InvocationResponse::new(200, format!("Change detected but notification failed: {err}"))
            } else if let Some(err) = &report.persist_error {
                InvocationResponse::new(
                    200,
                    format!("Change detected and notification sent, but saving the fingerprint failed: {err}"),
                )
            } else {
                InvocationResponse::new(200, "Change detected and notification sent")
            }
        }
        CheckResult::FetchFailed => {
            InvocationResponse::new(500, "Failed to retrieve website content")
        }
        CheckResult::StoreReadFailed => {
            InvocationResponse::new(503, "Failed to read last fingerprint")
        }
    }
}
