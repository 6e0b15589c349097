use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Form, Json, Router,
};
use gander_core::attachments::{persona_prompt_attachment, MessageAttachment};
use gander_core::personas::resolve_action;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::health;

/// Everything the handlers share: nothing mutable, no outbound clients.
#[derive(Clone)]
pub struct WebhookState {
    pub integration_url: String,
    pub slash_secret: Option<SecretString>,
}

pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/slash", post(slash_command))
        .route("/actions", post(action_callback))
        .route("/health", get(health::health))
        .with_state(state)
}

/// Form-encoded slash command invocation. The platform sends many more
/// fields; only the shared-secret token matters here.
#[derive(Debug, Default, Deserialize)]
pub struct SlashRequest {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SlashResponse {
    pub response_type: &'static str,
    pub attachments: Vec<MessageAttachment>,
}

pub async fn slash_command(
    State(state): State<WebhookState>,
    Form(request): Form<SlashRequest>,
) -> Result<Json<SlashResponse>, StatusCode> {
    if let Some(expected) = &state.slash_secret {
        if request.token.as_deref() != Some(expected.expose_secret()) {
            warn!(
                event_name = "ingress.webhook.slash_rejected",
                user_id = request.user_id.as_deref().unwrap_or("unknown"),
                "slash command token mismatch"
            );
            return Err(StatusCode::UNAUTHORIZED);
        }
    }

    info!(
        event_name = "ingress.webhook.slash_received",
        user_id = request.user_id.as_deref().unwrap_or("unknown"),
        channel_id = request.channel_id.as_deref().unwrap_or("unknown"),
        "returning persona prompt"
    );

    Ok(Json(SlashResponse {
        response_type: "in_channel",
        attachments: vec![persona_prompt_attachment(&state.integration_url)],
    }))
}

/// Button click callback. All identifiers except `context.action` are
/// informational.
#[derive(Debug, Default, Deserialize)]
pub struct ActionPayload {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub context: Option<ActionContext>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ActionContext {
    #[serde(default)]
    pub action: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub update: MessageUpdate,
}

#[derive(Debug, Serialize)]
pub struct MessageUpdate {
    pub message: String,
}

pub async fn action_callback(Json(payload): Json<ActionPayload>) -> Json<ActionResponse> {
    let action = payload.context.as_ref().and_then(|context| context.action.as_deref());

    info!(
        event_name = "ingress.webhook.action_received",
        action = action.unwrap_or("unknown"),
        user_id = payload.user_id.as_deref().unwrap_or("unknown"),
        "resolving button action"
    );

    Json(ActionResponse {
        update: MessageUpdate { message: resolve_action(action).to_string() },
    })
}
