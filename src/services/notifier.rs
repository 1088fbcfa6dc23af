//! Background callback delivery.
//!
//! Sweeps records that passed the confirmation gate, rebuilds each record's
//! callback URL from its current state and delivers it with an HTTP GET.
//! A record stays eligible until the customer endpoint acknowledges, so a
//! failed delivery is simply retried on a later sweep.

use futures::TryStreamExt;
use reqwest::Client;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::callback::{build_callback_url, InvalidCallbackUrl};
use crate::db::{ForwardingAddressStore, StoreError};
use crate::domain::ForwardingAddress;

/// Response body the customer endpoint must return to acknowledge delivery.
const CLIENT_ACK: &str = "ok";

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("invalid callback URL: {0}")]
    InvalidUrl(#[from] InvalidCallbackUrl),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("endpoint answered {status} without acknowledging")]
    NotAcknowledged { status: reqwest::StatusCode },
}

/// Outcome counters for one sweep.
#[derive(Debug, Default)]
pub struct DeliveryReport {
    pub swept: usize,
    pub delivered: usize,
    pub failed: usize,
}

pub struct CallbackNotifier {
    store: ForwardingAddressStore,
    http: Client,
    poll_interval: Duration,
}

impl CallbackNotifier {
    pub fn new(
        store: ForwardingAddressStore,
        poll_interval_secs: u64,
        request_timeout_secs: u64,
    ) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(request_timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            store,
            http,
            poll_interval: Duration::from_secs(poll_interval_secs),
        }
    }

    pub async fn start(self) {
        info!(
            "Callback notifier started (interval {}s)",
            self.poll_interval.as_secs()
        );

        loop {
            match self.run_once().await {
                Ok(report) if report.swept > 0 => {
                    info!(
                        swept = report.swept,
                        delivered = report.delivered,
                        failed = report.failed,
                        "Callback sweep finished"
                    );
                }
                Ok(_) => {}
                Err(e) => error!("Callback sweep error: {}", e),
            }

            sleep(self.poll_interval).await;
        }
    }

    /// One sweep over the confirmation gate. The batch is collected up
    /// front so no pool connection is held across network I/O, and one bad
    /// record never blocks the rest of the batch.
    pub async fn run_once(&self) -> Result<DeliveryReport, StoreError> {
        let batch: Vec<ForwardingAddress> =
            self.store.unconfirmed_by_client().try_collect().await?;

        let mut report = DeliveryReport {
            swept: batch.len(),
            ..Default::default()
        };

        for record in batch {
            let id = record.id;
            match self.deliver(&record).await {
                Ok(()) => {
                    self.store.record_delivery_success(id).await?;
                    report.delivered += 1;
                    info!("Callback for {} acknowledged by client", id);
                }
                Err(e) => {
                    self.store.record_delivery_failure(id).await?;
                    report.failed += 1;
                    warn!("Callback delivery for {} failed: {}", id, e);
                }
            }
        }

        Ok(report)
    }

    async fn deliver(&self, record: &ForwardingAddress) -> Result<(), DeliveryError> {
        let url = build_callback_url(record)?;
        debug!("Delivering callback for {} to {}", record.id, url);

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::NotAcknowledged { status });
        }

        let body = response.text().await?;
        if body.trim() != CLIENT_ACK {
            return Err(DeliveryError::NotAcknowledged { status });
        }

        Ok(())
    }
}
