use crate::error::{DialolicalError, DialolicalResult};

/// Fixed lines the bot argues with, one per round.
///
/// Rounds past the end of the script reuse the last line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedResponses {
    lines: Vec<String>,
}

impl ScriptedResponses {
    pub fn new(lines: Vec<String>) -> DialolicalResult<Self> {
        if lines.is_empty() {
            return Err(DialolicalError::InvalidConfigValue {
                key: "bot.responses".to_string(),
                message: "At least one scripted response is required".to_string(),
            });
        }
        Ok(Self { lines })
    }

    pub fn for_round(&self, round: usize) -> &str {
        let idx = round.min(self.lines.len() - 1);
        &self.lines[idx]
    }
}
