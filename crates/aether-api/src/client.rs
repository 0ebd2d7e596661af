// Control/query client for the Core's request/response API.
//
// Stateless wrapper around `reqwest::Client`: URL construction relative
// to the API base, uniform status handling, and typed bodies. Every call
// either yields a fully-typed payload or fails; nothing is retried here.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{
    ConfigDocument, MetricsSnapshot, StatusResponse, StreamInfo, SystemProxyRequest,
};
use crate::transport::TransportConfig;

/// Default control endpoint of a locally running Core.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:9880/api/v1/";

/// Control commands accepted under `POST control/{command}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ControlCommand {
    Start,
    Stop,
    Rotate,
}

/// HTTP client for the Core's control endpoint.
#[derive(Debug, Clone)]
pub struct CoreClient {
    http: reqwest::Client,
    base_url: Url,
}

impl CoreClient {
    /// Create a client for `base_url` (e.g. `http://127.0.0.1:9880/api/v1`).
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url: normalize_base(base_url),
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Url::parse(base_url)?;
        Ok(Self {
            http,
            base_url: normalize_base(base_url),
        })
    }

    /// The API base URL, always ending in `/`.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Status & config ──────────────────────────────────────────────

    /// `GET status`
    pub async fn get_status(&self) -> Result<StatusResponse, Error> {
        self.get(self.endpoint("status")?).await
    }

    /// `GET config`
    pub async fn get_config(&self) -> Result<ConfigDocument, Error> {
        self.get(self.endpoint("config")?).await
    }

    /// `POST config` -- full replace with `config`.
    pub async fn update_config(&self, config: &ConfigDocument) -> Result<(), Error> {
        self.post(self.endpoint("config")?, Some(config)).await
    }

    // ── Control ──────────────────────────────────────────────────────

    /// `POST control/{start|stop|rotate}`
    pub async fn control(&self, command: ControlCommand) -> Result<(), Error> {
        let url = self.endpoint(&format!("control/{command}"))?;
        self.post::<()>(url, None).await
    }

    pub async fn start(&self) -> Result<(), Error> {
        self.control(ControlCommand::Start).await
    }

    pub async fn stop(&self) -> Result<(), Error> {
        self.control(ControlCommand::Stop).await
    }

    pub async fn rotate(&self) -> Result<(), Error> {
        self.control(ControlCommand::Rotate).await
    }

    // ── Streams & metrics ────────────────────────────────────────────

    /// `GET streams`
    pub async fn list_streams(&self) -> Result<Vec<StreamInfo>, Error> {
        self.get(self.endpoint("streams")?).await
    }

    /// `DELETE streams/{id}`
    pub async fn close_stream(&self, id: &str) -> Result<(), Error> {
        let mut url = self.endpoint("streams")?;
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .push(id);
        self.delete(url).await
    }

    /// `GET metrics`
    pub async fn get_metrics(&self) -> Result<MetricsSnapshot, Error> {
        self.get(self.endpoint("metrics")?).await
    }

    // ── System proxy ─────────────────────────────────────────────────

    /// `POST system-proxy` with `{"enabled": bool}`
    pub async fn set_system_proxy(&self, enabled: bool) -> Result<(), Error> {
        let body = SystemProxyRequest { enabled };
        self.post(self.endpoint("system-proxy")?, Some(&body)).await
    }

    // ── Request helpers ──────────────────────────────────────────────

    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await?;
        let resp = ensure_success(resp)?;
        let body = resp.text().await?;

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }

    async fn post<B: Serialize + ?Sized>(&self, url: Url, body: Option<&B>) -> Result<(), Error> {
        debug!("POST {}", url);

        let mut request = self.http.post(url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let resp = request.send().await?;
        ensure_success(resp)?;
        Ok(())
    }

    async fn delete(&self, url: Url) -> Result<(), Error> {
        debug!("DELETE {}", url);

        let resp = self.http.delete(url).send().await?;
        ensure_success(resp)?;
        Ok(())
    }
}

/// Treat every non-2xx status uniformly; the Core sends no error body we rely on.
fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        Err(Error::RequestFailed {
            status: status.as_u16(),
            url: resp.url().to_string(),
        })
    }
}

/// `Url::join` replaces the last segment unless the base ends with `/`.
fn normalize_base(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
