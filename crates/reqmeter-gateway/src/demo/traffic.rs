//! Traffic generator for the demo routes.
//!
//! Each round sends `GET /api/user` then `POST /api/order` to a running
//! gateway and pauses. Failures are counted and logged; the run never
//! stops early.

use std::time::Duration;

use reqwest::{Client, Method};

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct TrafficPlan {
    /// Gateway base URL, e.g. `http://127.0.0.1:3000`.
    pub base_url: String,
    pub rounds: u32,
    /// Pause after each round.
    pub pause: Duration,
}

/// Outcome counts for one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TrafficReport {
    pub sent: u64,
    /// 2xx responses.
    pub succeeded: u64,
    /// Non-2xx responses.
    pub failed: u64,
    /// Transport errors (refused, timed out).
    pub unreachable: u64,
}

pub fn client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder().timeout(timeout).build()?)
}

pub async fn drive(client: &Client, plan: &TrafficPlan) -> TrafficReport {
    let base = plan.base_url.trim_end_matches('/');
    let mut report = TrafficReport::default();

    for round in 1..=plan.rounds {
        for (method, path) in [(Method::GET, "/api/user"), (Method::POST, "/api/order")] {
            report.sent += 1;
            let url = format!("{base}{path}");
            match client.request(method.clone(), &url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    report.succeeded += 1;
                    tracing::debug!(round, %method, path, status = resp.status().as_u16(), "request sent");
                }
                Ok(resp) => {
                    report.failed += 1;
                    tracing::warn!(round, %method, path, status = resp.status().as_u16(), "request failed");
                }
                Err(e) => {
                    report.unreachable += 1;
                    tracing::warn!(round, %method, path, error = %e, "request not delivered");
                }
            }
        }
        if !plan.pause.is_zero() {
            tokio::time::sleep(plan.pause).await;
        }
    }

    tracing::info!(
        sent = report.sent,
        succeeded = report.succeeded,
        failed = report.failed,
        unreachable = report.unreachable,
        "traffic run complete"
    );
    report
}
