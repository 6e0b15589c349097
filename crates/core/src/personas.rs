//! Canonical persona button identifiers and reply text.
//!
//! Two historical deployments drifted apart on action-id spelling and the
//! second button's reply. This module is the single source of truth: every
//! button id, label, and reply string referenced anywhere in the workspace
//! lives here, and [`resolve_action`] is the one place a click is turned
//! into a reply.

pub const GOOSE_ACTION_ID: &str = "goosebtn";
pub const DANILOVICH_ACTION_ID: &str = "danilovichbtn";

pub const GOOSE_LABEL: &str = "Гусь";
pub const DANILOVICH_LABEL: &str = "Лебедь";

pub const PROMPT_TEXT: &str = "Выбери кто ты:";

pub const GOOSE_ASCII: &str = "```
  __
<(o )___
 ( ._> /
  `---'
```";

pub const DANILOVICH_REPLY: &str = "Данилович";
pub const UNKNOWN_ACTION_REPLY: &str = "Неизвестное действие";

/// Maps a button action id to its reply text.
///
/// Total over its input space: any unrecognized or missing action id falls
/// through to [`UNKNOWN_ACTION_REPLY`].
pub fn resolve_action(action: Option<&str>) -> &'static str {
    match action {
        Some(GOOSE_ACTION_ID) => GOOSE_ASCII,
        Some(DANILOVICH_ACTION_ID) => DANILOVICH_REPLY,
        _ => UNKNOWN_ACTION_REPLY,
    }
}
