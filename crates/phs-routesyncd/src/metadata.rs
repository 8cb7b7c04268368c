//! Metadata service client.
//!
//! Implements [`TopologyClient`] over the cluster metadata HTTP API. The
//! service answers on a fixed link-local address inside the cluster and
//! serves JSON when asked for it.

use crate::error::{Result, RouteSyncError};
use crate::topology::TopologyClient;
use async_trait::async_trait;
use phs_types::Host;
use serde::de::DeserializeOwned;
use tokio::time::Duration;
use tracing::{debug, warn};

/// Default address of the metadata service.
pub const DEFAULT_METADATA_ADDRESS: &str = "169.254.169.250";

/// Metadata API version prefix.
const METADATA_API_VERSION: &str = "2016-07-29";

/// Per-request deadline for metadata calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Interval between connection attempts in [`MetadataClient::connect_and_wait`].
const CONNECT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// HTTP client against the metadata service.
pub struct MetadataClient {
    http: reqwest::Client,
    base_url: String,
}

impl MetadataClient {
    /// Creates a client for the metadata service at the given address.
    pub fn new(address: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RouteSyncError::internal(format!("building HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: format!("http://{}/{}", address, METADATA_API_VERSION),
        })
    }

    /// Creates a client and blocks until the metadata service answers.
    ///
    /// The service may come up after the agent does; retry until it is
    /// reachable rather than failing the process.
    pub async fn connect_and_wait(address: &str) -> Result<Self> {
        let client = Self::new(address)?;

        loop {
            match client.version().await {
                Ok(version) => {
                    debug!(version = %version, "Connected to metadata service");
                    return Ok(client);
                }
                Err(e) => {
                    warn!(error = %e, address, "Metadata service not ready, retrying");
                    tokio::time::sleep(CONNECT_RETRY_INTERVAL).await;
                }
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path);
        let unavailable = |e: reqwest::Error| {
            RouteSyncError::topology_unavailable(path.to_string(), e.to_string())
        };

        self.http
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(unavailable)?
            .error_for_status()
            .map_err(unavailable)?
            .json()
            .await
            .map_err(unavailable)
    }
}

#[async_trait]
impl TopologyClient for MetadataClient {
    async fn local_host(&self) -> Result<Host> {
        self.get_json("self/host").await
    }

    async fn hosts(&self) -> Result<Vec<Host>> {
        self.get_json("hosts").await
    }

    async fn version(&self) -> Result<String> {
        self.get_json("version").await
    }
}
