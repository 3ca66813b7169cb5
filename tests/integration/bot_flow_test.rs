use dialolical_core::{
    BotConfig, DebateSession, DialolicalError, HttpApiClient, PollPolicy, SessionOutcome,
    SessionSettings,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const BOT_ID: &str = "bot-1";
const OTHER_ID: &str = "bot-2";

/// Replies with each template in turn, repeating the last one.
struct Sequence {
    replies: Vec<ResponseTemplate>,
    cursor: AtomicUsize,
}

impl Sequence {
    fn new(replies: Vec<ResponseTemplate>) -> Self {
        Self {
            replies,
            cursor: AtomicUsize::new(0),
        }
    }
}

impl Respond for Sequence {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let idx = self.cursor.fetch_add(1, Ordering::SeqCst);
        self.replies[idx.min(self.replies.len() - 1)].clone()
    }
}

fn participant_json(api_key: Option<&str>) -> Value {
    let mut body = json!({
        "id": BOT_ID,
        "type": "bot",
        "identityType": "pseudonymous",
        "displayName": "FlowBot",
        "botModel": "flow-v1"
    });
    if let Some(key) = api_key {
        body["apiKey"] = json!(key);
    }
    body
}

fn state(status: &str, next: Option<&str>, current_turn: u32) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": "d1",
        "proposition": "Rust is fun",
        "status": status,
        "currentTurn": current_turn,
        "nextParticipantId": next
    }))
}

fn session_for(server: &MockServer, policy: PollPolicy) -> DebateSession<HttpApiClient> {
    let mut config = BotConfig::default();
    config.server.base_url = server.uri();

    let client = HttpApiClient::new(&config).unwrap();
    let mut settings = SessionSettings::from_config(&config).unwrap();
    settings.poll_policy = policy;

    DebateSession::new(client, settings)
}

async fn mount_registration(server: &MockServer, api_key: Option<&str>) {
    Mock::given(method("POST"))
        .and(path("/api/participants"))
        .respond_with(ResponseTemplate::new(201).set_body_json(participant_json(api_key)))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_list(server: &MockServer, dialogues: Value) {
    Mock::given(method("GET"))
        .and(path("/api/dialogues"))
        .respond_with(ResponseTemplate::new(200).set_body_json(dialogues))
        .expect(1)
        .mount(server)
        .await;
}

mod create_path_tests {
    use super::*;

    #[tokio::test]
    async fn test_no_open_dialogue_creates_one_and_stops() {
        let server = MockServer::start().await;
        mount_registration(&server, Some("key-1")).await;
        mount_list(
            &server,
            json!([{ "id": "d0", "proposition": "Old", "status": "concluded" }]),
        )
        .await;

        Mock::given(method("POST"))
            .and(path("/api/dialogues"))
            .and(body_json(json!({
                "proposition": "AI will surpass human intelligence within 10 years",
                "challengerId": BOT_ID
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "d-new",
                "proposition": "AI will surpass human intelligence within 10 years",
                "status": "open"
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/dialogues/d0/join"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/dialogues/d-new"))
            .respond_with(state("open", None, 0))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/reactions"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let session = session_for(&server, PollPolicy::fixed(Duration::from_millis(5)));
        let outcome = session.run(Some("FlowBot"), Some("flow-v1")).await.unwrap();

        match outcome {
            SessionOutcome::Created { dialogue, .. } => assert_eq!(dialogue.id, "d-new"),
            other => panic!("expected Created, got {:?}", other),
        }
    }
}

mod join_path_tests {
    use super::*;

    #[tokio::test]
    async fn test_joins_plays_turns_and_reacts() {
        let server = MockServer::start().await;
        mount_registration(&server, Some("key-1")).await;
        mount_list(
            &server,
            json!([
                { "id": "d0", "proposition": "Busy", "status": "in_progress" },
                { "id": "d1", "proposition": "Rust is fun", "status": "open" }
            ]),
        )
        .await;

        Mock::given(method("POST"))
            .and(path("/api/dialogues/d1/join"))
            .and(header("authorization", "Bearer key-1"))
            .and(body_json(json!({})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/dialogues/d1"))
            .respond_with(Sequence::new(vec![
                state("in_progress", Some(BOT_ID), 0),
                state("in_progress", Some(OTHER_ID), 1),
                state("in_progress", Some(BOT_ID), 2),
                state("in_progress", Some(OTHER_ID), 3),
                state("concluded", None, 4),
            ]))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/dialogues/d1/turns"))
            .and(header("authorization", "Bearer key-1"))
            .and(body_json(json!({
                "content": "An interesting position. Let me argue that..."
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "turnNumber": 1 })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/dialogues/d1/turns"))
            .and(body_json(json!({ "content": "Building on that point..." })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "turnNumber": 3 })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/dialogues/d1/turns"))
            .and(body_json(json!({ "content": "In conclusion..." })))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/reactions"))
            .and(header("authorization", "Bearer key-1"))
            .and(body_json(json!({
                "targetType": "dialogue",
                "targetId": "d1",
                "emoji": "🦉"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "r1" })))
            .expect(1)
            .mount(&server)
            .await;

        let session = session_for(&server, PollPolicy::fixed(Duration::from_millis(5)));
        let outcome = session.run(Some("FlowBot"), Some("flow-v1")).await.unwrap();

        let SessionOutcome::Completed {
            dialogue_id,
            report,
            view_url,
            ..
        } = outcome
        else {
            panic!("expected a completed session");
        };
        assert_eq!(dialogue_id, "d1");
        assert_eq!(report.turns_submitted, 2);
        assert_eq!(report.rounds_not_in_progress, 1);
        assert_eq!(view_url, format!("{}/dialogue/d1", server.uri()));
    }

    #[tokio::test]
    async fn test_status_not_in_progress_never_submits() {
        let server = MockServer::start().await;
        mount_registration(&server, Some("key-1")).await;
        mount_list(
            &server,
            json!([{ "id": "d1", "proposition": "Rust is fun", "status": "open" }]),
        )
        .await;

        Mock::given(method("POST"))
            .and(path("/api/dialogues/d1/join"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/dialogues/d1"))
            .respond_with(state("scoring", Some(BOT_ID), 6))
            .expect(3)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/dialogues/d1/turns"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/reactions"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let session = session_for(&server, PollPolicy::fixed(Duration::from_millis(5)));
        session.run(None, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_opponent_never_moves_times_out() {
        let server = MockServer::start().await;
        mount_registration(&server, Some("key-1")).await;
        mount_list(
            &server,
            json!([{ "id": "d1", "proposition": "Rust is fun", "status": "open" }]),
        )
        .await;

        Mock::given(method("POST"))
            .and(path("/api/dialogues/d1/join"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/dialogues/d1"))
            .respond_with(state("in_progress", Some(OTHER_ID), 1))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/dialogues/d1/turns"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/reactions"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let policy =
            PollPolicy::fixed(Duration::from_millis(10)).with_timeout(Duration::from_millis(60));
        let session = session_for(&server, policy);
        let err = session.run(None, None).await.unwrap_err();

        assert!(matches!(err, DialolicalError::PollTimeout { .. }));
        assert_eq!(err.error_code(), "E4001");
    }
}

mod failure_tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_api_key_sends_no_authenticated_request() {
        let server = MockServer::start().await;
        mount_registration(&server, None).await;
        mount_list(
            &server,
            json!([{ "id": "d1", "proposition": "Rust is fun", "status": "open" }]),
        )
        .await;

        Mock::given(method("POST"))
            .and(path("/api/dialogues/d1/join"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let session = session_for(&server, PollPolicy::fixed(Duration::from_millis(5)));
        let err = session.run(None, None).await.unwrap_err();

        assert!(matches!(err, DialolicalError::MissingCredential { .. }));
    }

    #[tokio::test]
    async fn test_rejected_join_surfaces_service_message() {
        let server = MockServer::start().await;
        mount_registration(&server, Some("key-1")).await;
        mount_list(
            &server,
            json!([{ "id": "d1", "proposition": "Rust is fun", "status": "open" }]),
        )
        .await;

        Mock::given(method("POST"))
            .and(path("/api/dialogues/d1/join"))
            .respond_with(
                ResponseTemplate::new(409)
                    .set_body_json(json!({ "error": "Dialogue already has a respondent" })),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/dialogues/d1"))
            .respond_with(state("in_progress", Some(BOT_ID), 0))
            .expect(0)
            .mount(&server)
            .await;

        let session = session_for(&server, PollPolicy::fixed(Duration::from_millis(5)));
        let err = session.run(None, None).await.unwrap_err();

        match err {
            DialolicalError::Validation(message) => {
                assert_eq!(message, "Dialogue already has a respondent")
            }
            other => panic!("expected Validation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_registration_rejected_with_bad_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/participants"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({ "error": "Unauthorized" })),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/dialogues"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let session = session_for(&server, PollPolicy::fixed(Duration::from_millis(5)));
        let err = session.run(None, None).await.unwrap_err();

        assert!(err.is_auth_error());
    }
}
