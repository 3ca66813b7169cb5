use serde::{Deserialize, Serialize};

/// What a reaction is attached to. The bot only reacts to whole dialogues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Dialogue,
}

/// Payload for `POST /reactions`. The emoji is free-form on the service side.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReaction {
    pub target_type: TargetType,
    pub target_id: String,
    pub emoji: String,
}

impl NewReaction {
    pub fn on_dialogue(dialogue_id: impl Into<String>, emoji: impl Into<String>) -> Self {
        Self {
            target_type: TargetType::Dialogue,
            target_id: dialogue_id.into(),
            emoji: emoji.into(),
        }
    }
}
