// crates/workprogram-core/src/loader/http.rs

use super::page::{parse_page, FeaturePage, PageQuery};
use crate::config::FetchConfig;
use crate::error::{Result, WorkProgramError};
use crate::traits::PageSource;
use reqwest::blocking::Client;
use reqwest::Url;
use std::time::Duration;
use tracing::debug;

/// Blocking ArcGIS FeatureServer client. One request per page, no retries.
#[derive(Debug, Clone)]
pub struct HttpPageSource {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpPageSource {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("workprogram-core/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            timeout,
        })
    }

    pub fn from_config(config: &FetchConfig) -> Result<Self> {
        Self::new(config.endpoint.clone(), config.timeout)
    }

    pub fn request_url(&self, query: &PageQuery) -> Result<Url> {
        Url::parse_with_params(&self.endpoint, query.params()).map_err(|e| {
            WorkProgramError::InvalidData(format!("bad endpoint {}: {e}", self.endpoint))
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> WorkProgramError {
        if err.is_timeout() {
            WorkProgramError::Timeout {
                secs: self.timeout.as_secs(),
            }
        } else {
            WorkProgramError::Http(err)
        }
    }
}

impl PageSource for HttpPageSource {
    fn fetch_page(&self, query: &PageQuery) -> Result<FeaturePage> {
        let url = self.request_url(query)?;
        debug!(%url, "GET");

        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WorkProgramError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().map_err(|e| self.transport_error(e))?;
        parse_page(&body)
    }
}
