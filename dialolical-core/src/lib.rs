pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod poll;
pub mod responses;
pub mod session;

pub use client::{DialolicalApi, HttpApiClient};
pub use config::{
    get_config_dir, BotConfig, BotProfile, LoggingConfig, PollingConfig, ServerConfig,
    DEFAULT_BASE_URL, DEFAULT_BOT_MODEL, DEFAULT_PROPOSITION,
};
pub use error::{CliErrorDisplay, DialolicalError, DialolicalResult};
pub use models::{
    ApiKey, Conclusion, Dialogue, DialogueStatus, IdentityType, NewDialogue, NewParticipant,
    NewReaction, Participant, ParticipantType, TargetType, TurnReceipt, TurnRecord,
    TurnSubmission,
};
pub use poll::PollPolicy;
pub use responses::ScriptedResponses;
pub use session::{
    DebateSession, SessionEvent, SessionEventCallback, SessionOutcome, SessionSettings,
    TurnLoopReport, TURN_ROUNDS,
};
