//! Client for cross-seed's `/api/webhook` search trigger.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Asks a cross-seed instance to search a directory for matchable content.
#[derive(Debug, Clone)]
pub struct Notifier {
    client: Client,
    endpoint: String,
}

impl Notifier {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("xseed-usenet/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/webhook", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST `path=<directory>` as a form body. Only `204 No Content` counts as
    /// success. Not retried.
    pub fn trigger(&self, directory: &str) -> Result<()> {
        debug!(endpoint = %self.endpoint, directory, "Sending cross-seed trigger");

        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("path", directory)])
            .send()?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            info!(directory, "Cross-seed search triggered");
            Ok(())
        } else {
            warn!(status_code = status.as_u16(), "Cross-seed trigger rejected");
            Err(Error::Notification {
                status: status.as_u16(),
            })
        }
    }
}
