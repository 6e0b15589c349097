use async_trait::async_trait;
use gander_core::attachments::persona_prompt_attachment;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::client::{ChatApi, ClientError};

/// A single chat message lifted out of a `posted` stream event. Ephemeral:
/// lives for one dispatch only.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Post {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub message: String,
}

/// Inbound stream event, classified by the `event` tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEvent {
    Hello,
    Posted(Post),
    Unsupported { event_type: String },
}

#[derive(Debug, Error)]
pub enum EventParseError {
    #[error("frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("posted event carries no encoded post payload")]
    MissingPost,
}

#[derive(Debug, Deserialize)]
struct RawStreamEvent {
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    data: serde_json::Value,
}

/// Parses one text frame from the event stream.
///
/// For `posted` events the platform double-encodes the post: `data.post` is
/// itself a JSON string that must be parsed again.
pub fn parse_frame(frame: &str) -> Result<StreamEvent, EventParseError> {
    let raw: RawStreamEvent = serde_json::from_str(frame)?;

    match raw.event.as_deref() {
        Some("hello") => Ok(StreamEvent::Hello),
        Some("posted") => {
            let encoded = raw
                .data
                .get("post")
                .and_then(|value| value.as_str())
                .ok_or(EventParseError::MissingPost)?;
            let post: Post = serde_json::from_str(encoded)?;
            Ok(StreamEvent::Posted(post))
        }
        Some(other) => Ok(StreamEvent::Unsupported { event_type: other.to_string() }),
        None => Ok(StreamEvent::Unsupported { event_type: String::new() }),
    }
}

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// What the handler decided to do with a post. Returned for observability
/// and tests; the runner only cares about the error side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandlerOutcome {
    IgnoredSelf,
    SentPrompt,
    Echoed,
}

#[async_trait]
pub trait PostHandler: Send + Sync {
    async fn handle_post(&self, post: &Post) -> Result<HandlerOutcome, HandlerError>;
}

/// The production message handler.
///
/// Drops the bot's own posts, answers the trigger keyword with the persona
/// button prompt, and echoes everything else back prefixed with the
/// author's username.
pub struct PersonaBot<C> {
    api: C,
    self_user_id: String,
    trigger_keyword: String,
    integration_url: String,
}

impl<C> PersonaBot<C>
where
    C: ChatApi,
{
    pub fn new(
        api: C,
        self_user_id: impl Into<String>,
        trigger_keyword: &str,
        integration_url: impl Into<String>,
    ) -> Self {
        Self {
            api,
            self_user_id: self_user_id.into(),
            trigger_keyword: trigger_keyword.to_lowercase(),
            integration_url: integration_url.into(),
        }
    }
}

#[async_trait]
impl<C> PostHandler for PersonaBot<C>
where
    C: ChatApi,
{
    async fn handle_post(&self, post: &Post) -> Result<HandlerOutcome, HandlerError> {
        // The bot reacting to its own output would loop forever.
        if post.user_id == self.self_user_id {
            return Ok(HandlerOutcome::IgnoredSelf);
        }

        info!(
            event_name = "ingress.mattermost.post_received",
            user_id = %post.user_id,
            channel_id = %post.channel_id,
            "received post"
        );

        if post.message.to_lowercase().contains(&self.trigger_keyword) {
            info!(
                event_name = "egress.mattermost.prompt_sent",
                channel_id = %post.channel_id,
                "trigger keyword detected, sending persona prompt"
            );
            self.api
                .post_interactive(&post.channel_id, persona_prompt_attachment(&self.integration_url))
                .await?;
            return Ok(HandlerOutcome::SentPrompt);
        }

        let username = self.api.username_of(&post.user_id).await?;
        let reply = format!("{username} написал: {}", post.message);
        self.api.post_message(&post.channel_id, &reply).await?;
        Ok(HandlerOutcome::Echoed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use gander_core::attachments::MessageAttachment;
    use tokio::sync::Mutex;

    use super::{parse_frame, EventParseError, HandlerOutcome, PersonaBot, Post, PostHandler, StreamEvent};
    use crate::client::{ChatApi, ClientError};

    fn posted_frame(user_id: &str, channel_id: &str, message: &str) -> String {
        let post = serde_json::json!({
            "user_id": user_id,
            "channel_id": channel_id,
            "message": message,
        })
        .to_string();
        serde_json::json!({
            "event": "posted",
            "data": { "post": post },
        })
        .to_string()
    }

    #[test]
    fn parses_hello_frame() {
        let event = parse_frame(r#"{"event":"hello","data":{}}"#).expect("parse hello");
        assert_eq!(event, StreamEvent::Hello);
    }

    #[test]
    fn parses_posted_frame_with_double_encoded_post() {
        let frame = posted_frame("u1", "c1", "привет");
        let event = parse_frame(&frame).expect("parse posted");

        assert_eq!(
            event,
            StreamEvent::Posted(Post {
                user_id: "u1".to_string(),
                channel_id: "c1".to_string(),
                message: "привет".to_string(),
            })
        );
    }

    #[test]
    fn classifies_other_events_as_unsupported() {
        let event = parse_frame(r#"{"event":"typing","data":{}}"#).expect("parse typing");
        assert_eq!(event, StreamEvent::Unsupported { event_type: "typing".to_string() });
    }

    #[test]
    fn frame_without_event_tag_is_unsupported() {
        // Auth challenge replies look like this: a status object, no event.
        let event = parse_frame(r#"{"status":"OK","seq_reply":1}"#).expect("parse reply");
        assert!(matches!(event, StreamEvent::Unsupported { .. }));
    }

    #[test]
    fn rejects_non_json_frame() {
        let result = parse_frame("not json at all");
        assert!(matches!(result, Err(EventParseError::Json(_))));
    }

    #[test]
    fn rejects_posted_frame_without_encoded_post() {
        let result = parse_frame(r#"{"event":"posted","data":{}}"#);
        assert!(matches!(result, Err(EventParseError::MissingPost)));
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    enum ApiCall {
        Username { user_id: String },
        Message { channel_id: String, message: String },
        Interactive { channel_id: String, action_ids: Vec<String> },
    }

    #[derive(Clone, Default)]
    struct RecordingApi {
        calls: Arc<Mutex<Vec<ApiCall>>>,
    }

    impl RecordingApi {
        async fn calls(&self) -> Vec<ApiCall> {
            self.calls.lock().await.clone()
        }
    }

    #[async_trait]
    impl ChatApi for RecordingApi {
        async fn username_of(&self, user_id: &str) -> Result<String, ClientError> {
            self.calls.lock().await.push(ApiCall::Username { user_id: user_id.to_string() });
            Ok("alice".to_string())
        }

        async fn post_message(&self, channel_id: &str, message: &str) -> Result<(), ClientError> {
            self.calls.lock().await.push(ApiCall::Message {
                channel_id: channel_id.to_string(),
                message: message.to_string(),
            });
            Ok(())
        }

        async fn post_interactive(
            &self,
            channel_id: &str,
            attachment: MessageAttachment,
        ) -> Result<(), ClientError> {
            self.calls.lock().await.push(ApiCall::Interactive {
                channel_id: channel_id.to_string(),
                action_ids: attachment.actions.iter().map(|action| action.id.clone()).collect(),
            });
            Ok(())
        }
    }

    fn bot(api: &RecordingApi) -> PersonaBot<RecordingApi> {
        PersonaBot::new(api.clone(), "bot-user", "выбор", "http://localhost:8000")
    }

    #[tokio::test]
    async fn drops_own_posts_without_any_rest_call() {
        let api = RecordingApi::default();
        let post = Post {
            user_id: "bot-user".to_string(),
            channel_id: "c1".to_string(),
            message: "выбор выбор выбор".to_string(),
        };

        let outcome = bot(&api).handle_post(&post).await.expect("handle");

        assert_eq!(outcome, HandlerOutcome::IgnoredSelf);
        assert!(api.calls().await.is_empty());
    }

    #[tokio::test]
    async fn trigger_keyword_sends_prompt_and_skips_echo() {
        let api = RecordingApi::default();
        let post = Post {
            user_id: "u1".to_string(),
            channel_id: "c1".to_string(),
            message: "сделай ВЫБОР уже".to_string(),
        };

        let outcome = bot(&api).handle_post(&post).await.expect("handle");

        assert_eq!(outcome, HandlerOutcome::SentPrompt);
        assert_eq!(
            api.calls().await,
            vec![ApiCall::Interactive {
                channel_id: "c1".to_string(),
                action_ids: vec!["goosebtn".to_string(), "danilovichbtn".to_string()],
            }]
        );
    }

    #[tokio::test]
    async fn non_trigger_message_is_echoed_with_author_prefix() {
        let api = RecordingApi::default();
        let post = Post {
            user_id: "u1".to_string(),
            channel_id: "c1".to_string(),
            message: "просто сообщение".to_string(),
        };

        let outcome = bot(&api).handle_post(&post).await.expect("handle");

        assert_eq!(outcome, HandlerOutcome::Echoed);
        assert_eq!(
            api.calls().await,
            vec![
                ApiCall::Username { user_id: "u1".to_string() },
                ApiCall::Message {
                    channel_id: "c1".to_string(),
                    message: "alice написал: просто сообщение".to_string(),
                },
            ]
        );
    }
}
