mod dialogue;
mod participant;
mod reaction;

pub use dialogue::{
    Conclusion, Dialogue, DialogueStatus, NewDialogue, TurnReceipt, TurnRecord, TurnSubmission,
};
pub use participant::{ApiKey, IdentityType, NewParticipant, Participant, ParticipantType};
pub use reaction::{NewReaction, TargetType};
