use crate::{config::AppConfig, errors::ServiceError};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, instrument, warn};

const SERVICE_NAME: &str = "User directory";

/// Answers "does this user exist" for the order flow.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// `Ok(false)` means the directory answered and the user is absent;
    /// an unreachable directory is `UpstreamUnavailable`.
    async fn user_exists(&self, user_id: i32) -> Result<bool, ServiceError>;
}

/// User directory reached over HTTP at `GET {base_url}/users/{id}`
#[derive(Clone, Debug)]
pub struct HttpUserDirectory {
    client: reqwest::Client,
    base_url: String,
}

impl HttpUserDirectory {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ServiceError::InternalError(format!("failed to build user directory client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ServiceError> {
        Self::new(config.user_service_url.clone(), config.user_service_timeout())
    }

    fn user_url(&self, user_id: i32) -> String {
        format!("{}/users/{}", self.base_url, user_id)
    }
}

#[async_trait]
impl UserDirectory for HttpUserDirectory {
    #[instrument(skip(self))]
    async fn user_exists(&self, user_id: i32) -> Result<bool, ServiceError> {
        let url = self.user_url(user_id);

        match self.client.get(&url).send().await {
            Ok(response) => {
                let status = response.status();
                if status == StatusCode::OK {
                    debug!(user_id, "User confirmed by directory");
                    Ok(true)
                } else {
                    if status != StatusCode::NOT_FOUND {
                        warn!(user_id, %status, "Unexpected user directory status; treating as absent");
                    }
                    Ok(false)
                }
            }
            Err(e) => {
                warn!(
                    user_id,
                    timeout = e.is_timeout(),
                    error = %e,
                    "User directory request failed"
                );
                Err(ServiceError::UpstreamUnavailable(SERVICE_NAME.to_string()))
            }
        }
    }
}
