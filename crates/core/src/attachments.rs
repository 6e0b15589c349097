//! Interactive message attachment model shared by the realtime bot and the
//! webhook service.
//!
//! Serialize-only: these types exist to produce the platform's attachment
//! wire shape, both inside `POST /api/v4/posts` props and in the slash
//! command response.

use serde::Serialize;

use crate::personas;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageAttachment {
    pub text: String,
    pub actions: Vec<ButtonAction>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
    Danger,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ButtonAction {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub action_type: &'static str,
    pub style: ButtonStyle,
    pub integration: ActionIntegration,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActionIntegration {
    pub url: String,
    pub context: ActionContext,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActionContext {
    pub action: String,
}

impl ButtonAction {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        style: ButtonStyle,
        callback_url: impl Into<String>,
    ) -> Self {
        let id = id.into();
        Self {
            integration: ActionIntegration {
                url: callback_url.into(),
                context: ActionContext { action: id.clone() },
            },
            id,
            name: label.into(),
            action_type: "button",
            style,
        }
    }
}

/// Builds the persona prompt attachment: two mutually exclusive buttons,
/// each calling back to `{integration_url}/actions` with its own id as
/// context.
pub fn persona_prompt_attachment(integration_url: &str) -> MessageAttachment {
    let callback_url = format!("{}/actions", integration_url.trim_end_matches('/'));

    MessageAttachment {
        text: personas::PROMPT_TEXT.to_string(),
        actions: vec![
            ButtonAction::new(
                personas::GOOSE_ACTION_ID,
                personas::GOOSE_LABEL,
                ButtonStyle::Primary,
                callback_url.clone(),
            ),
            ButtonAction::new(
                personas::DANILOVICH_ACTION_ID,
                personas::DANILOVICH_LABEL,
                ButtonStyle::Danger,
                callback_url,
            ),
        ],
    }
}
