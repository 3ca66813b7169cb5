use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Lifecycle of a dialogue as reported by the service.
///
/// Statuses this client does not know are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DialogueStatus {
    Open,
    InProgress,
    Scoring,
    Concluded,
    Other(String),
}

impl DialogueStatus {
    pub fn as_str(&self) -> &str {
        match self {
            DialogueStatus::Open => "open",
            DialogueStatus::InProgress => "in_progress",
            DialogueStatus::Scoring => "scoring",
            DialogueStatus::Concluded => "concluded",
            DialogueStatus::Other(s) => s,
        }
    }

    pub fn is_open(&self) -> bool {
        *self == DialogueStatus::Open
    }

    pub fn is_in_progress(&self) -> bool {
        *self == DialogueStatus::InProgress
    }
}

impl From<&str> for DialogueStatus {
    fn from(s: &str) -> Self {
        match s {
            "open" => DialogueStatus::Open,
            "in_progress" => DialogueStatus::InProgress,
            "scoring" => DialogueStatus::Scoring,
            "concluded" => DialogueStatus::Concluded,
            other => DialogueStatus::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for DialogueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DialogueStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DialogueStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(DialogueStatus::from(raw.as_str()))
    }
}

/// A dialogue as returned by the list, create and detail endpoints.
///
/// The list endpoint only fills the summary fields and the detail endpoint
/// adds `nextParticipantId`, `turns` and `reactions`, so everything beyond
/// `id`, `proposition` and `status` is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dialogue {
    pub id: String,
    pub proposition: String,
    pub status: DialogueStatus,
    #[serde(default)]
    pub challenger_id: Option<String>,
    #[serde(default)]
    pub respondent_id: Option<String>,
    #[serde(default)]
    pub max_turns: Option<u32>,
    #[serde(default)]
    pub current_turn: u32,
    #[serde(default)]
    pub next_participant_id: Option<String>,
    #[serde(default)]
    pub challenger_name: Option<String>,
    #[serde(default)]
    pub respondent_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub turns: Vec<TurnRecord>,
    #[serde(default)]
    pub reactions: HashMap<String, u64>,
}

impl Dialogue {
    /// True when the service says `participant_id` may submit the next turn.
    pub fn is_turn_of(&self, participant_id: &str) -> bool {
        self.status.is_in_progress() && self.next_participant_id.as_deref() == Some(participant_id)
    }

    pub fn view_url(&self, base_url: &str) -> String {
        format!("{}/dialogue/{}", base_url.trim_end_matches('/'), self.id)
    }
}

/// Creation payload for `POST /dialogues`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDialogue {
    pub proposition: String,
    pub challenger_id: String,
}

/// A turn already recorded on a dialogue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRecord {
    pub id: String,
    pub participant_id: String,
    pub content: String,
    pub turn_number: u32,
    #[serde(default)]
    pub reactions: HashMap<String, u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnSubmission {
    pub content: String,
}

/// Response of `POST /dialogues/{id}/turns`. Read leniently, only logged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnReceipt {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub turn_number: Option<u32>,
    #[serde(default)]
    pub dialogue_status: Option<DialogueStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Conclusion {
    pub conclusion: String,
}
