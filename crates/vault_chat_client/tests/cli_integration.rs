//! Integration tests for the vault-chat binary.
//! Uses assert_cmd to run the binary, a real temp config, and a wiremock
//! server standing in for the API.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ANSWER: &str = "event: token\ndata: \"Test \"\n\n\
                      event: token\ndata: \"answer.\"\n\n\
                      event: done\ndata: thread-7\n\n";

/// Write a minimal YAML config pointing at `base_url`.
fn write_config(dir: &tempfile::TempDir, base_url: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.yaml");
    std::fs::write(
        &path,
        format!("api:\n  base_url: {base_url}\nclient:\n  timeout_secs: 10\n"),
    )
    .unwrap();
    path
}

async fn streaming_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/stream"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(ANSWER.as_bytes().to_vec(), "text/event-stream"),
        )
        .mount(&server)
        .await;
    server
}

fn vault_chat(home: &tempfile::TempDir) -> Command {
    let mut cmd = Command::from(cargo_bin_cmd!("vault-chat"));
    cmd.env_remove("VAULT_CHAT_CONFIG")
        .env_remove("RUST_LOG")
        .env("HOME", home.path())
        .env("USERPROFILE", home.path());
    cmd
}

#[tokio::test(flavor = "multi_thread")]
async fn prints_streamed_answer_and_thread_id() {
    let server = streaming_server().await;
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_config(&dir, &server.uri());

    vault_chat(&dir)
        .arg("--config")
        .arg(&config_path)
        .write_stdin("What is the answer?\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Test answer."))
        .stderr(predicate::str::contains("thread_id: thread-7"));
}

#[tokio::test(flavor = "multi_thread")]
async fn config_from_env_var() {
    let server = streaming_server().await;
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_config(&dir, &server.uri());

    vault_chat(&dir)
        .env("VAULT_CHAT_CONFIG", &config_path)
        .write_stdin("What is the answer?\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Test answer."));
}

#[tokio::test(flavor = "multi_thread")]
async fn positional_question_and_base_url_flag() {
    let server = streaming_server().await;
    let dir = tempfile::tempdir().unwrap();

    // No config file anywhere: defaults plus --base-url.
    vault_chat(&dir)
        .arg("--base-url")
        .arg(server.uri())
        .arg("What is the answer?")
        .assert()
        .success()
        .stdout(predicate::str::contains("Test answer."));
}

#[tokio::test(flavor = "multi_thread")]
async fn thread_id_is_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/stream"))
        .and(body_json(serde_json::json!({
            "message": "again",
            "thread_id": "thread-7"
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(ANSWER.as_bytes().to_vec(), "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();

    vault_chat(&dir)
        .arg("--base-url")
        .arg(server.uri())
        .arg("--thread-id")
        .arg("thread-7")
        .arg("again")
        .assert()
        .success()
        .stdout(predicate::str::contains("Test answer."));
}

#[tokio::test(flavor = "multi_thread")]
async fn no_stream_uses_chat_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "response": "Whole answer.",
            "thread_id": "thread-9"
        })))
        .expect(1)
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();

    vault_chat(&dir)
        .arg("--base-url")
        .arg(server.uri())
        .arg("--no-stream")
        .arg("question")
        .assert()
        .success()
        .stdout(predicate::str::contains("Whole answer."))
        .stderr(predicate::str::contains("thread_id: thread-9"));
}

#[tokio::test(flavor = "multi_thread")]
async fn server_error_exits_nonzero() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/stream"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();

    vault_chat(&dir)
        .arg("--base-url")
        .arg(server.uri())
        .arg("hello")
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("HTTP 500"));
}

#[test]
fn server_down_shows_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_config(&dir, &format!("http://127.0.0.1:{port}"));

    vault_chat(&dir)
        .arg("--config")
        .arg(&config_path)
        .write_stdin("hello\n")
        .assert()
        .failure()
        .stderr(predicate::str::is_match("(?i)(connect|error|refused)").unwrap());
}

#[test]
fn empty_question_is_rejected() {
    let dir = tempfile::tempdir().unwrap();

    vault_chat(&dir)
        .write_stdin("\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no question provided"));
}
