use serde_json::json;
use std::process::{Command, Output};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn bot_command(args: &[&str], env_vars: &[(&str, &str)]) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_dialolical-bot"));
    cmd.args(args)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("DIALOLICAL_LOG_LEVEL");
    for (key, value) in env_vars {
        cmd.env(key, value);
    }
    cmd
}

fn run_bot(args: &[&str], env_vars: &[(&str, &str)]) -> Output {
    bot_command(args, env_vars)
        .output()
        .expect("Failed to execute dialolical-bot")
}

/// Run the binary off the async runtime so the mock server keeps serving.
async fn run_bot_against(server: &MockServer, args: &[&str]) -> Output {
    let url = server.uri();
    let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();

    tokio::task::spawn_blocking(move || {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        run_bot(
            &args,
            &[
                ("DIALOLICAL_URL", url.as_str()),
                ("DIALOLICAL_POLLING__INTERVAL_MS", "10"),
                ("DIALOLICAL_POLLING__MAX_INTERVAL_MS", "10"),
            ],
        )
    })
    .await
    .expect("blocking task panicked")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

mod surface_tests {
    use super::*;

    #[test]
    fn test_help_lists_positional_arguments() {
        let output = run_bot(&["--help"], &[]);
        let out = stdout(&output);

        assert!(output.status.success());
        assert!(out.contains("DISPLAY_NAME"));
        assert!(out.contains("BOT_MODEL"));
        assert!(out.contains("--verbose"));
    }

    #[test]
    fn test_version() {
        let output = run_bot(&["--version"], &[]);

        assert!(output.status.success());
        assert!(stdout(&output).contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_invalid_base_url_fails_with_config_error() {
        let output = run_bot(&[], &[("DIALOLICAL_URL", "ftp://dialolical.com")]);

        assert!(!output.status.success());
        let err = stderr(&output);
        assert!(err.contains("E5002"), "stderr was: {}", err);
        assert!(err.contains("server.base_url"));
    }
}

mod session_tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_creates_dialogue_and_exits_zero() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/participants"))
            .and(body_partial_json(json!({
                "type": "bot",
                "identityType": "pseudonymous",
                "botModel": "python-example-v1"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "p-1",
                "apiKey": "key-1",
                "type": "bot",
                "identityType": "pseudonymous",
                "displayName": "RustBot-abcdef"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/dialogues"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/dialogues"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "d-new",
                "proposition": "AI will surpass human intelligence within 10 years",
                "status": "open"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let output = run_bot_against(&server, &[]).await;
        let out = stdout(&output);

        assert!(output.status.success(), "stderr was: {}", stderr(&output));
        assert!(out.contains("Registered as RustBot-abcdef (id: p-1)"));
        assert!(out.contains(
            "Created: \"AI will surpass human intelligence within 10 years\" - waiting for opponent"
        ));
        assert!(!out.contains("Done!"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_full_debate_transcript() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/participants"))
            .and(body_partial_json(json!({
                "displayName": "CliBot",
                "botModel": "cli-v2"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "p-1",
                "apiKey": "key-1",
                "type": "bot",
                "identityType": "pseudonymous",
                "displayName": "CliBot",
                "botModel": "cli-v2"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/dialogues"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": "d1", "proposition": "Rust is fun", "status": "open" }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/dialogues/d1/join"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/dialogues/d1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "d1",
                "proposition": "Rust is fun",
                "status": "in_progress",
                "currentTurn": 1,
                "nextParticipantId": "p-1"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/dialogues/d1/turns"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
            .expect(3)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/reactions"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let output = run_bot_against(&server, &["CliBot", "cli-v2"]).await;
        let out = stdout(&output);

        assert!(output.status.success(), "stderr was: {}", stderr(&output));
        assert!(out.contains("Joining: \"Rust is fun\""));
        assert_eq!(out.matches("Turn 2 submitted").count(), 3);
        assert!(out.contains(&format!("Done! View at: {}/dialogue/d1", server.uri())));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_server_error_exits_non_zero() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/participants"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({ "error": "database is down" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let output = run_bot_against(&server, &[]).await;
        let err = stderr(&output);

        assert!(!output.status.success());
        assert!(err.contains("E3004"), "stderr was: {}", err);
        assert!(err.contains("database is down"));
    }
}
