//! Drives one bot through a full debate session.
//!
//! The flow is register, then find an open dialogue or create one. When a
//! dialogue was found it is joined, three turn rounds are played and a
//! reaction is posted. When a dialogue had to be created the session ends
//! right after creation.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::client::DialolicalApi;
use crate::config::BotConfig;
use crate::error::{DialolicalError, DialolicalResult};
use crate::models::{
    Conclusion, Dialogue, DialogueStatus, NewDialogue, NewParticipant, NewReaction, Participant,
    TurnSubmission,
};
use crate::poll::PollPolicy;
use crate::responses::ScriptedResponses;

/// Number of turn rounds a session plays.
pub const TURN_ROUNDS: usize = 3;

/// Everything the session needs besides the API handle.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub base_url: String,
    pub name_prefix: String,
    pub default_model: String,
    pub proposition: String,
    pub reaction_emoji: String,
    pub responses: ScriptedResponses,
    pub conclusion: Option<String>,
    pub poll_policy: PollPolicy,
}

impl SessionSettings {
    pub fn from_config(config: &BotConfig) -> DialolicalResult<Self> {
        Ok(Self {
            base_url: config.base_url().to_string(),
            name_prefix: config.bot.name_prefix.clone(),
            default_model: config.bot.default_model.clone(),
            proposition: config.bot.proposition.clone(),
            reaction_emoji: config.bot.reaction_emoji.clone(),
            responses: ScriptedResponses::new(config.bot.responses.clone())?,
            conclusion: config
                .bot
                .conclusion
                .clone()
                .filter(|c| !c.trim().is_empty()),
            poll_policy: config.polling.policy(),
        })
    }

    /// Prefix plus six random hex characters.
    pub fn generated_display_name(&self) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("{}{}", self.name_prefix, &suffix[..6])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Registered {
        participant_id: String,
        display_name: String,
    },
    Joining {
        dialogue_id: String,
        proposition: String,
    },
    Created {
        dialogue_id: String,
        proposition: String,
    },
    WaitingForTurn {
        dialogue_id: String,
        attempt: u32,
        delay: Duration,
    },
    TurnSubmitted {
        round: usize,
        turn_number: u32,
    },
    DialogueNotInProgress {
        round: usize,
        status: DialogueStatus,
    },
    Concluded {
        dialogue_id: String,
    },
    Reacted {
        dialogue_id: String,
        emoji: String,
    },
    Finished {
        view_url: String,
    },
}

pub type SessionEventCallback = Box<dyn Fn(SessionEvent) + Send + Sync>;

/// What the turn loop did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnLoopReport {
    pub turns_submitted: u32,
    pub rounds_not_in_progress: u32,
    pub last_status: Option<DialogueStatus>,
}

#[derive(Debug, Clone)]
pub enum SessionOutcome {
    /// No open dialogue existed; a new one was created and the run stopped.
    Created {
        participant: Participant,
        dialogue: Dialogue,
    },
    /// An open dialogue was joined and played.
    Completed {
        participant: Participant,
        dialogue_id: String,
        report: TurnLoopReport,
        view_url: String,
    },
}

pub struct DebateSession<A: DialolicalApi> {
    api: A,
    settings: SessionSettings,
    cancel: CancellationToken,
    on_event: Option<SessionEventCallback>,
}

impl<A: DialolicalApi> DebateSession<A> {
    pub fn new(api: A, settings: SessionSettings) -> Self {
        Self {
            api,
            settings,
            cancel: CancellationToken::new(),
            on_event: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_event_callback(mut self, callback: SessionEventCallback) -> Self {
        self.on_event = Some(callback);
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(callback) = &self.on_event {
            callback(event);
        }
    }

    /// Await an API call, giving up as soon as the session is cancelled.
    async fn guarded<T, F>(&self, call: F) -> DialolicalResult<T>
    where
        F: Future<Output = DialolicalResult<T>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(DialolicalError::Cancelled),
            result = call => result,
        }
    }

    /// Run the whole session.
    #[instrument(skip(self))]
    pub async fn run(
        &self,
        display_name: Option<&str>,
        bot_model: Option<&str>,
    ) -> DialolicalResult<SessionOutcome> {
        let participant = self.register_participant(display_name, bot_model).await?;

        let Some(dialogue) = self.list_open_dialogue().await? else {
            let dialogue = self
                .create_dialogue(&self.settings.proposition, &participant.id)
                .await?;
            return Ok(SessionOutcome::Created {
                participant,
                dialogue,
            });
        };

        self.emit(SessionEvent::Joining {
            dialogue_id: dialogue.id.clone(),
            proposition: dialogue.proposition.clone(),
        });
        self.join_dialogue(&participant, &dialogue.id).await?;

        let report = self
            .poll_and_submit_turns(&participant, &dialogue.id)
            .await?;

        if let Some(conclusion) = &self.settings.conclusion {
            self.conclude_if_scoring(&participant, &dialogue.id, conclusion)
                .await?;
        }

        self.post_reaction(&participant, &dialogue.id, &self.settings.reaction_emoji)
            .await?;

        let view_url = dialogue.view_url(&self.settings.base_url);
        self.emit(SessionEvent::Finished {
            view_url: view_url.clone(),
        });
        info!(dialogue_id = %dialogue.id, turns = report.turns_submitted, "Session complete");

        Ok(SessionOutcome::Completed {
            participant,
            dialogue_id: dialogue.id,
            report,
            view_url,
        })
    }

    /// Register this bot, filling in a generated name and the default model
    /// when none are given.
    pub async fn register_participant(
        &self,
        display_name: Option<&str>,
        bot_model: Option<&str>,
    ) -> DialolicalResult<Participant> {
        let display_name = display_name
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.settings.generated_display_name());
        let bot_model = bot_model
            .filter(|m| !m.is_empty())
            .unwrap_or(self.settings.default_model.as_str());

        let participant = self
            .guarded(
                self.api
                    .register_participant(&NewParticipant::bot(display_name.clone(), bot_model)),
            )
            .await?;

        if participant.api_key.is_none() {
            warn!(participant_id = %participant.id, "Registration returned no API key");
        }
        info!(participant_id = %participant.id, %display_name, "Registered participant");

        self.emit(SessionEvent::Registered {
            participant_id: participant.id.clone(),
            display_name,
        });

        Ok(participant)
    }

    /// First dialogue with status `open`, in the order the service lists them.
    pub async fn list_open_dialogue(&self) -> DialolicalResult<Option<Dialogue>> {
        let dialogues = self.guarded(self.api.list_dialogues()).await?;
        debug!(count = dialogues.len(), "Fetched dialogues");

        Ok(dialogues.into_iter().find(|d| d.status.is_open()))
    }

    pub async fn join_dialogue(
        &self,
        participant: &Participant,
        dialogue_id: &str,
    ) -> DialolicalResult<()> {
        let key = participant.credential()?;

        self.guarded(self.api.join_dialogue(dialogue_id, key)).await?;
        info!(%dialogue_id, "Joined dialogue");
        Ok(())
    }

    pub async fn create_dialogue(
        &self,
        proposition: &str,
        challenger_id: &str,
    ) -> DialolicalResult<Dialogue> {
        let request = NewDialogue {
            proposition: proposition.to_string(),
            challenger_id: challenger_id.to_string(),
        };
        let dialogue = self.guarded(self.api.create_dialogue(&request)).await?;
        info!(dialogue_id = %dialogue.id, "Created dialogue");

        self.emit(SessionEvent::Created {
            dialogue_id: dialogue.id.clone(),
            proposition: dialogue.proposition.clone(),
        });

        Ok(dialogue)
    }

    /// Play [`TURN_ROUNDS`] rounds.
    ///
    /// Each round re-fetches the dialogue until either it is not in progress
    /// (the round is skipped) or it is our turn (the scripted line for the
    /// round is submitted). A turn is only ever submitted right after a fetch
    /// that named us as the next participant.
    pub async fn poll_and_submit_turns(
        &self,
        participant: &Participant,
        dialogue_id: &str,
    ) -> DialolicalResult<TurnLoopReport> {
        let policy = &self.settings.poll_policy;
        let mut report = TurnLoopReport::default();

        for round in 0..TURN_ROUNDS {
            let started = Instant::now();
            let mut attempt: u32 = 0;

            loop {
                let state = self.guarded(self.api.get_dialogue(dialogue_id)).await?;
                report.last_status = Some(state.status.clone());

                if !state.status.is_in_progress() {
                    debug!(%dialogue_id, round, status = %state.status, "Dialogue not in progress");
                    report.rounds_not_in_progress += 1;
                    self.emit(SessionEvent::DialogueNotInProgress {
                        round,
                        status: state.status,
                    });
                    break;
                }

                if state.is_turn_of(&participant.id) {
                    let key = participant.credential()?;
                    let content = self.settings.responses.for_round(round).to_string();

                    let submission = TurnSubmission { content };
                    let receipt = self
                        .guarded(self.api.submit_turn(dialogue_id, &submission, key))
                        .await?;

                    report.turns_submitted += 1;
                    if let Some(status) = receipt.dialogue_status {
                        report.last_status = Some(status);
                    }

                    let turn_number = state.current_turn.saturating_add(1);
                    info!(%dialogue_id, round, turn = turn_number, "Turn submitted");
                    self.emit(SessionEvent::TurnSubmitted { round, turn_number });
                    break;
                }

                let Some(delay) = policy.next_sleep(attempt, started.elapsed()) else {
                    return Err(DialolicalError::PollTimeout {
                        dialogue_id: dialogue_id.to_string(),
                        waited_secs: started.elapsed().as_secs(),
                    });
                };

                debug!(%dialogue_id, attempt, ?delay, "Not our turn, waiting");
                self.emit(SessionEvent::WaitingForTurn {
                    dialogue_id: dialogue_id.to_string(),
                    attempt,
                    delay,
                });

                tokio::select! {
                    _ = self.cancel.cancelled() => return Err(DialolicalError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
                attempt = attempt.saturating_add(1);
            }
        }

        Ok(report)
    }

    /// Attach `emoji` to the dialogue.
    pub async fn post_reaction(
        &self,
        participant: &Participant,
        dialogue_id: &str,
        emoji: &str,
    ) -> DialolicalResult<()> {
        let key = participant.credential()?;

        let reaction = NewReaction::on_dialogue(dialogue_id, emoji);
        self.guarded(self.api.post_reaction(&reaction, key)).await?;

        self.emit(SessionEvent::Reacted {
            dialogue_id: dialogue_id.to_string(),
            emoji: emoji.to_string(),
        });
        Ok(())
    }

    /// Submit a closing statement when the dialogue has reached scoring.
    ///
    /// Returns whether a conclusion was sent.
    pub async fn conclude_if_scoring(
        &self,
        participant: &Participant,
        dialogue_id: &str,
        conclusion: &str,
    ) -> DialolicalResult<bool> {
        let state = self.guarded(self.api.get_dialogue(dialogue_id)).await?;
        if state.status != DialogueStatus::Scoring {
            debug!(%dialogue_id, status = %state.status, "Skipping conclusion");
            return Ok(false);
        }

        let key = participant.credential()?;
        let request = Conclusion {
            conclusion: conclusion.to_string(),
        };
        self.guarded(self.api.conclude_dialogue(dialogue_id, &request, key))
            .await?;

        self.emit(SessionEvent::Concluded {
            dialogue_id: dialogue_id.to_string(),
        });
        Ok(true)
    }
}
