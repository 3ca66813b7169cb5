use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DialolicalError, DialolicalResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantType {
    Human,
    Bot,
}

impl std::fmt::Display for ParticipantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParticipantType::Human => write!(f, "human"),
            ParticipantType::Bot => write!(f, "bot"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityType {
    Anonymous,
    Pseudonymous,
    Named,
}

impl std::fmt::Display for IdentityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityType::Anonymous => write!(f, "anonymous"),
            IdentityType::Pseudonymous => write!(f, "pseudonymous"),
            IdentityType::Named => write!(f, "named"),
        }
    }
}

/// Bearer credential issued at registration.
///
/// `Debug` is redacted so keys never end up in logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix: String = self.0.chars().take(4).collect();
        write!(f, "ApiKey({}****)", prefix)
    }
}

/// Registration payload for `POST /participants`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewParticipant {
    #[serde(rename = "type")]
    pub participant_type: ParticipantType,
    pub identity_type: IdentityType,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot_model: Option<String>,
}

impl NewParticipant {
    pub fn bot(display_name: impl Into<String>, bot_model: impl Into<String>) -> Self {
        Self {
            participant_type: ParticipantType::Bot,
            identity_type: IdentityType::Pseudonymous,
            display_name: display_name.into(),
            bot_model: Some(bot_model.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<ApiKey>,
    #[serde(rename = "type")]
    pub participant_type: ParticipantType,
    pub identity_type: IdentityType,
    pub display_name: String,
    #[serde(default)]
    pub bot_model: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Participant {
    /// The key to use for authenticated calls.
    ///
    /// Fails with [`DialolicalError::MissingCredential`] when the service did
    /// not return one at registration.
    pub fn credential(&self) -> DialolicalResult<&ApiKey> {
        self.api_key
            .as_ref()
            .filter(|k| !k.expose().is_empty())
            .ok_or_else(|| DialolicalError::MissingCredential {
                participant_id: self.id.clone(),
            })
    }
}
