use crate::config::ApiSettings;
use crate::errors::{ApiError, LoginError};
use crate::models::{CurrentUserEnvelope, ProfileForm, ProfileUpdateReply, ProfileUpdateResponse, User};
use async_trait::async_trait;
use fleet_core::observability::TracedClientExt;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

/// The three calls the profile gate makes against the dashboard API.
#[async_trait]
pub trait ProfileApi: Send + Sync {
    /// Re-read the authenticated user. `Ok(None)` means the API answered
    /// without a user.
    async fn fetch_current_user(&self) -> Result<Option<User>, ApiError>;

    /// Submit corrected profile values. Non-2xx statuses with a decodable
    /// body are returned as a reply, not an error.
    async fn update_profile(&self, form: &ProfileForm) -> Result<ProfileUpdateReply, ApiError>;

    /// End the server-side session and clear its cookies.
    async fn logout(&self) -> Result<(), ApiError>;
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoginResponse {
    success: Option<bool>,
    user: Option<User>,
    message: Option<String>,
}

/// HTTP client for the dashboard API.
///
/// Holds a cookie jar, so the session cookie set at login travels with every
/// later request.
pub struct ApiClient {
    client: Client,
    settings: ApiSettings,
}

impl ApiClient {
    pub fn new(settings: ApiSettings) -> Result<Self, ApiError> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self { client, settings })
    }

    pub fn base_url(&self) -> &str {
        &self.settings.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    /// Authenticate and return the signed-in user.
    pub async fn login(
        &self,
        identifier: &str,
        password: &Secret<String>,
    ) -> Result<User, LoginError> {
        let url = self.url(&self.settings.login_path);

        let response = self
            .client
            .traced_post(&url)
            .json(&serde_json::json!({
                "identifier": identifier,
                "password": password.expose_secret(),
            }))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send login request to {}: {}", url, e);
                ApiError::Transport(e)
            })?;

        let status = response.status();
        let text = response.text().await.map_err(ApiError::Transport)?;
        let body = match serde_json::from_str::<LoginResponse>(&text) {
            Ok(body) => body,
            Err(e) if status.is_success() => {
                tracing::error!(error = %e, "Failed to decode login response");
                return Err(LoginError::Api(ApiError::Decode(e.to_string())));
            }
            Err(_) => LoginResponse::default(),
        };

        if !status.is_success() || body.success == Some(false) {
            let message = body
                .message
                .unwrap_or_else(|| "Invalid username or password".to_string());
            tracing::warn!(status = %status, identifier = %identifier, "Login rejected");
            return Err(LoginError::Rejected(message));
        }

        body.user.ok_or_else(|| {
            LoginError::Api(ApiError::Decode("login response carried no user".to_string()))
        })
    }
}

#[async_trait]
impl ProfileApi for ApiClient {
    async fn fetch_current_user(&self) -> Result<Option<User>, ApiError> {
        let url = self.url(&self.settings.current_user_path);

        let response = self.client.traced_get(&url).send().await.map_err(|e| {
            tracing::warn!("Failed to send GET request to {}: {}", url, e);
            ApiError::Transport(e)
        })?;

        match response.status() {
            status if status.is_success() => {
                let envelope: CurrentUserEnvelope = response
                    .json()
                    .await
                    .map_err(|e| ApiError::Decode(e.to_string()))?;
                Ok(envelope.into_user())
            }
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
            status => Err(ApiError::UnexpectedStatus {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            }),
        }
    }

    async fn update_profile(&self, form: &ProfileForm) -> Result<ProfileUpdateReply, ApiError> {
        let url = self.url(&self.settings.profile_path);

        let response = self.client.traced_put(&url).json(form).send().await.map_err(|e| {
            tracing::error!("Failed to send PUT request to {}: {}", url, e);
            ApiError::Transport(e)
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }

        let text = response.text().await?;
        let body = match serde_json::from_str::<ProfileUpdateResponse>(&text) {
            Ok(body) => body,
            Err(e) if status.is_success() => return Err(ApiError::Decode(e.to_string())),
            // Error pages without a JSON body still count as a failed update.
            Err(_) => ProfileUpdateResponse {
                success: false,
                message: Some(format!("Profile update failed with status {}", status)),
                ..Default::default()
            },
        };

        Ok(ProfileUpdateReply {
            status: status.as_u16(),
            body,
        })
    }

    async fn logout(&self) -> Result<(), ApiError> {
        let url = self.url(&self.settings.logout_path);

        let response = self
            .client
            .traced_post(&url)
            .json(&serde_json::json!({}))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ApiError::UnexpectedStatus {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            })
        }
    }
}
