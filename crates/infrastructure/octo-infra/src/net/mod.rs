use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use octo_config::{API_KEY_HEADER, CONNECT_TIMEOUT, READ_TIMEOUT, USER_AGENT};
use octo_core::{JobState, PrinterState, Timelapse, TimelapseConfig, TimelapseListing};
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Body of a streamed response, chunk by chunk.
pub type ByteStream = BoxStream<'static, Result<Bytes, ClientError>>;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid url: {0}")]
    Url(String),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{url} returned {status}: {body}")]
    Status {
        status: StatusCode,
        url: Url,
        body: String,
    },
    #[error("decoding response from {url} failed: {source}")]
    Decode {
        url: Url,
        #[source]
        source: serde_json::Error,
    },
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Request(e) => e.status(),
            _ => None,
        }
    }
}

/// Shared HTTP client with the connect/read timeouts every tool uses.
pub fn default_http_client() -> Result<Client, ClientError> {
    Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(CONNECT_TIMEOUT)
        .read_timeout(READ_TIMEOUT)
        .build()
        .map_err(ClientError::from)
}

/// A client to an OctoPrint server.
#[derive(Clone)]
pub struct OctoClient {
    http: Client,
    base: Url,
    token: String,
}

impl OctoClient {
    pub fn new(base: &str, token: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_http(default_http_client()?, base, token)
    }

    pub fn with_http(
        http: Client,
        base: &str,
        token: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let base = Url::parse(base).map_err(|e| ClientError::Url(format!("{base}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(ClientError::Url(format!(
                "{base} cannot be used as a base url"
            )));
        }
        Ok(Self {
            http,
            base,
            token: token.into(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// The server URL with its path replaced by `path`.
    pub fn url(&self, path: &str, query: Option<&str>) -> Url {
        let mut u = self.base.clone();
        u.set_path(path);
        u.set_query(query);
        u
    }

    /// Resolve a server-relative reference (as found in listings) against the base.
    pub fn resolve(&self, reference: &str) -> Result<Url, ClientError> {
        self.base
            .join(reference)
            .map_err(|e| ClientError::Url(format!("{reference}: {e}")))
    }

    async fn send(&self, method: Method, url: Url) -> Result<Response, ClientError> {
        debug!("{} {}", method, url);
        let res = self
            .http
            .request(method, url)
            .header(API_KEY_HEADER, &self.token)
            .send()
            .await?;
        Self::check_status(res).await
    }

    async fn check_status(res: Response) -> Result<Response, ClientError> {
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        let url = res.url().clone();
        let body = res.text().await.unwrap_or_default();
        Err(ClientError::Status { status, url, body })
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ClientError> {
        let res = self.send(Method::GET, url.clone()).await?;
        let bytes = res.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|source| ClientError::Decode { url, source })
    }

    /// Streaming GET of a server-relative path.
    pub async fn fetch_path(&self, path: &str) -> Result<ByteStream, ClientError> {
        let url = self.resolve(path)?;
        let res = self.send(Method::GET, url).await?;
        Ok(res.bytes_stream().map_err(ClientError::from).boxed())
    }

    pub async fn list_timelapses(
        &self,
    ) -> Result<(TimelapseConfig, Vec<Timelapse>), ClientError> {
        let listing: TimelapseListing = self.fetch_json(self.url("/api/timelapse", None)).await?;
        Ok((listing.config, listing.files))
    }

    /// Absolute download URL of a timelapse video.
    pub fn timelapse_url(&self, timelapse: &Timelapse) -> Result<Url, ClientError> {
        self.resolve(&timelapse.path)
    }

    pub async fn delete_timelapse(&self, name: &str) -> Result<(), ClientError> {
        let mut url = self.url("/api/timelapse", None);
        url.path_segments_mut()
            .map_err(|_| ClientError::Url(format!("{} cannot be a base", self.base)))?
            .push(name);
        self.send(Method::DELETE, url).await?;
        Ok(())
    }

    /// Current printer state, including up to `history` temperature samples.
    pub async fn printer_state(&self, history: usize) -> Result<PrinterState, ClientError> {
        let query = (history > 0).then(|| format!("history=true&limit={history}"));
        self.fetch_json(self.url("/api/printer", query.as_deref())).await
    }

    pub async fn job_state(&self) -> Result<JobState, ClientError> {
        self.fetch_json(self.url("/api/job", None)).await
    }
}
