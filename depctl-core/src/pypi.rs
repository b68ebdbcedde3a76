//! PyPI JSON API client used for latest-version lookups.

use anyhow::Result;
use log::debug;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct ProjectDocument {
    info: ProjectInfo,
}

#[derive(Debug, Deserialize)]
struct ProjectInfo {
    version: String,
}

#[derive(Debug, Clone)]
pub struct IndexClient {
    client: Client,
    base_url: String,
}

fn create_http_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder()
        .timeout(timeout)
        .user_agent(concat!("depctl/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

impl IndexClient {
    /// `None` when `base_url` is empty (index lookups disabled) or the client
    /// cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Option<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return None;
        }
        match create_http_client(timeout) {
            Ok(client) => Some(Self {
                client,
                base_url: base_url.to_string(),
            }),
            Err(err) => {
                log::warn!("package index client unavailable: {err}");
                None
            }
        }
    }

    pub fn project_url(&self, package: &str) -> String {
        format!("{}/pypi/{}/json", self.base_url, package)
    }

    fn fetch_latest(&self, package: &str) -> Result<Option<String>> {
        let response = self.client.get(self.project_url(package)).send()?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let doc: ProjectDocument = response.error_for_status()?.json()?;
        let version = doc.info.version.trim().to_string();
        Ok((!version.is_empty()).then_some(version))
    }

    /// Latest published version of `package`, or `None` on any failure.
    pub fn latest_version(&self, package: &str) -> Option<String> {
        match self.fetch_latest(package) {
            Ok(version) => version,
            Err(err) => {
                debug!("index lookup for {package} failed: {err}");
                None
            }
        }
    }
}
