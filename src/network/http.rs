use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use tracing::{debug, warn};
use url::Url;

use super::gateway::{ProgressGateway, ProgressRecord};
use crate::config::GatewayConfig;
use crate::error::GatewayError;

const PROGRESS_PATH: &str = "progress";

/// Progress gateway backed by a REST endpoint
///
/// `POST {base}/progress` stores a record, `GET {base}/progress/{id}` reads it
/// back with 404 meaning "nothing saved".
#[derive(Debug, Clone)]
pub struct HttpProgressGateway {
    client: Client,
    base_url: Url,
    auth_token: Option<String>,
}

impl HttpProgressGateway {
    pub fn new(base_url: &str, auth_token: Option<String>) -> Result<Self, GatewayError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            client: Client::new(),
            base_url,
            auth_token,
        })
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let base_url = config
            .base_url
            .as_deref()
            .ok_or_else(|| GatewayError::Unavailable("gateway base url not configured".into()))?;
        Self::new(base_url, config.auth_token.clone())
    }

    fn save_url(&self) -> Result<Url, GatewayError> {
        Ok(self.base_url.join(PROGRESS_PATH)?)
    }

    fn fetch_url(&self, content_id: &str) -> Result<Url, GatewayError> {
        let path = format!("{}/{}", PROGRESS_PATH, urlencoding::encode(content_id));
        Ok(self.base_url.join(&path)?)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl ProgressGateway for HttpProgressGateway {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn save(&self, record: &ProgressRecord) -> Result<(), GatewayError> {
        let url = self.save_url()?;
        debug!("POST {} ({:.1}s)", url, record.position_seconds);

        let response = self
            .authorize(self.client.post(url))
            .json(record)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status(status.as_u16()));
        }
        Ok(())
    }

    async fn fetch(&self, content_id: &str) -> Result<Option<ProgressRecord>, GatewayError> {
        let url = self.fetch_url(content_id)?;
        debug!("GET {}", url);

        let response = self.authorize(self.client.get(url)).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::NO_CONTENT => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            status => Err(GatewayError::Status(status.as_u16())),
        }
    }

    fn send_beacon(&self, record: ProgressRecord) {
        let url = match self.save_url() {
            Ok(url) => url,
            Err(e) => {
                warn!("Dropping unload save: {}", e);
                return;
            }
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("Dropping unload save: no async runtime");
            return;
        };

        let request = self.authorize(self.client.post(url)).json(&record);
        runtime.spawn(async move {
            let _ = request.send().await;
        });
    }
}
