use std::time::Duration;

use async_trait::async_trait;
use gander_core::attachments::MessageAttachment;
use gander_core::config::MattermostConfig;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("mattermost api request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("bot token is not usable as an authorization header")]
    InvalidToken,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    #[serde(default = "unknown_username")]
    pub username: String,
}

fn unknown_username() -> String {
    "Unknown".to_string()
}

/// Outbound REST calls the post handler is allowed to make. Seam for tests;
/// implemented for real by [`MattermostClient`].
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn username_of(&self, user_id: &str) -> Result<String, ClientError>;
    async fn post_message(&self, channel_id: &str, message: &str) -> Result<(), ClientError>;
    async fn post_interactive(
        &self,
        channel_id: &str,
        attachment: MessageAttachment,
    ) -> Result<(), ClientError>;
}

/// Thin async client for the Mattermost REST API (`/api/v4`).
///
/// One connection pool per process lifetime, bearer-token auth on every
/// call, one fixed request timeout. Non-2xx statuses surface as errors.
#[derive(Clone, Debug)]
pub struct MattermostClient {
    http: reqwest::Client,
    base_url: String,
}

impl MattermostClient {
    pub fn new(config: &MattermostConfig) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        let bearer = format!("Bearer {}", config.bot_token.expose_secret());
        let mut auth_value = HeaderValue::from_str(&bearer).map_err(|_| ClientError::InvalidToken)?;
        auth_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_value);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self { http, base_url: config.base_url.trim_end_matches('/').to_string() })
    }

    pub async fn get_me(&self) -> Result<User, ClientError> {
        let user = self
            .http
            .get(format!("{}/api/v4/users/me", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json::<User>()
            .await?;
        Ok(user)
    }

    pub async fn get_user(&self, user_id: &str) -> Result<User, ClientError> {
        let user = self
            .http
            .get(format!("{}/api/v4/users/{user_id}", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json::<User>()
            .await?;
        Ok(user)
    }

    async fn create_post(&self, body: &serde_json::Value) -> Result<(), ClientError> {
        self.http
            .post(format!("{}/api/v4/posts", self.base_url))
            .json(body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl ChatApi for MattermostClient {
    async fn username_of(&self, user_id: &str) -> Result<String, ClientError> {
        Ok(self.get_user(user_id).await?.username)
    }

    async fn post_message(&self, channel_id: &str, message: &str) -> Result<(), ClientError> {
        debug!(channel_id, "posting message");
        self.create_post(&plain_post_body(channel_id, message)).await
    }

    async fn post_interactive(
        &self,
        channel_id: &str,
        attachment: MessageAttachment,
    ) -> Result<(), ClientError> {
        debug!(channel_id, "posting interactive prompt");
        self.create_post(&interactive_post_body(channel_id, &attachment)).await
    }
}

fn plain_post_body(channel_id: &str, message: &str) -> serde_json::Value {
    serde_json::json!({
        "channel_id": channel_id,
        "message": message,
    })
}

fn interactive_post_body(channel_id: &str, attachment: &MessageAttachment) -> serde_json::Value {
    serde_json::json!({
        "channel_id": channel_id,
        "message": "",
        "props": {
            "attachments": [attachment],
        },
    })
}

#[cfg(test)]
mod tests {
    use gander_core::attachments::persona_prompt_attachment;

    use super::{interactive_post_body, plain_post_body, User};

    #[test]
    fn plain_post_body_carries_channel_and_message() {
        let body = plain_post_body("chan-1", "привет");
        assert_eq!(body["channel_id"], "chan-1");
        assert_eq!(body["message"], "привет");
    }

    #[test]
    fn interactive_post_body_nests_attachment_under_props() {
        let attachment = persona_prompt_attachment("http://localhost:8000");
        let body = interactive_post_body("chan-1", &attachment);

        assert_eq!(body["channel_id"], "chan-1");
        let actions = body["props"]["attachments"][0]["actions"]
            .as_array()
            .expect("actions array");
        assert_eq!(actions.len(), 2);
    }

    #[test]
    fn user_without_username_falls_back_to_unknown() {
        let user: User = serde_json::from_str(r#"{"id":"u1"}"#).expect("deserialize user");
        assert_eq!(user.username, "Unknown");
    }
}
