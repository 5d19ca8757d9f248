mod common;

use std::path::Path;
use std::sync::{Arc, Mutex};

use common::{ScriptedDispatcher, ScriptedOracle, call, no_flow};
use maestro::config::AppConfig;
use maestro::orchestration::{DecisionOracle, OracleResponse};
use maestro::runner::{OracleFactory, Runner};
use serde_json::json;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

// ─── Helpers ──────────────────────────────────────────────────────────

fn test_config(log_dir: &Path) -> AppConfig {
    AppConfig {
        model: "default-model".to_string(),
        system_prompt: "You orchestrate remote agents.".to_string(),
        log_dir: log_dir.to_path_buf(),
        router_url: "http://127.0.0.1:9".to_string(),
        api_key: None,
        dispatch_timeout_secs: 5,
        max_rounds: 25,
        partial_trace_on_cancel: true,
    }
}

/// Factory handing out one shared scripted oracle and recording model names.
fn factory(oracle: Arc<ScriptedOracle>, models: Arc<Mutex<Vec<String>>>) -> OracleFactory {
    Arc::new(move |model: &str| {
        models.lock().unwrap().push(model.to_string());
        oracle.clone() as Arc<dyn DecisionOracle>
    })
}

fn log_lines(dir: &Path) -> Vec<serde_json::Value> {
    let mut lines = Vec::new();
    for entry in std::fs::read_dir(dir).unwrap() {
        let text = std::fs::read_to_string(entry.unwrap().path()).unwrap();
        for line in text.lines() {
            lines.push(serde_json::from_str(line).unwrap());
        }
    }
    lines
}

const REQUEST: &str = r#"{
    "message": "Translate 'hola'",
    "agents": [
        {"agent_id": "a1", "agent_name": "Translator", "agent_description": "Translates text",
         "agent_input_schema": {"type": "object", "properties": {"text": {"type": "string"}}}}
    ]
}"#;

// ============================================================
// Runner
// ============================================================

#[tokio::test]
async fn runs_request_end_to_end_and_logs_it() {
    let tmp = TempDir::new().unwrap();
    let oracle = Arc::new(ScriptedOracle::new(vec![
        no_flow(),
        Ok(OracleResponse::call(call("c1", "a1", json!({"text": "hola"})))),
        no_flow(),
        Ok(OracleResponse::reply("It means hello.")),
    ]));
    let models = Arc::new(Mutex::new(Vec::new()));
    let dispatcher = Arc::new(ScriptedDispatcher::new().answer("a1", true, json!("hello")));
    let runner = Runner::new(
        test_config(tmp.path()),
        dispatcher,
        factory(oracle.clone(), models.clone()),
    );

    let result = runner.execute(REQUEST, &CancellationToken::new()).await;

    assert!(result.is_success);
    assert_eq!(result.response, "It means hello.");
    assert_eq!(result.trace.len(), 2);
    assert_eq!(*models.lock().unwrap(), vec!["default-model".to_string()]);
    // System prompt and user message seed the conversation.
    assert_eq!(oracle.consultations()[0].history_len, 2);

    let lines = log_lines(tmp.path());
    let kinds: Vec<&str> = lines
        .iter()
        .map(|l| l["event_type"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["run_start", "run_end"]);
    assert_eq!(lines[0]["workers"], 1);
    assert_eq!(lines[1]["is_success"], true);
}

#[tokio::test]
async fn request_model_overrides_configured_model() {
    let tmp = TempDir::new().unwrap();
    let oracle = Arc::new(ScriptedOracle::new(vec![no_flow(), Ok(OracleResponse::reply("hi"))]));
    let models = Arc::new(Mutex::new(Vec::new()));
    let runner = Runner::new(
        test_config(tmp.path()),
        Arc::new(ScriptedDispatcher::new()),
        factory(oracle, models.clone()),
    );
    let request = json!({
        "message": "hello",
        "agents": [],
        "configs": {"llm": {"model": "gpt-4o-mini"}}
    })
    .to_string();

    let result = runner.execute(&request, &CancellationToken::new()).await;

    assert!(result.is_success);
    assert_eq!(*models.lock().unwrap(), vec!["gpt-4o-mini".to_string()]);
}

#[tokio::test]
async fn malformed_request_is_reported_in_the_envelope() {
    let tmp = TempDir::new().unwrap();
    let oracle = Arc::new(ScriptedOracle::new(Vec::new()));
    let models = Arc::new(Mutex::new(Vec::new()));
    let runner = Runner::new(
        test_config(tmp.path()),
        Arc::new(ScriptedDispatcher::new()),
        factory(oracle.clone(), models.clone()),
    );

    let result = runner
        .execute("{not json", &CancellationToken::new())
        .await;

    assert!(!result.is_success);
    assert!(result.response.starts_with("An error occurred: RequestError - "));
    assert!(result.trace.is_empty());
    assert!(models.lock().unwrap().is_empty());
    assert!(oracle.consultations().is_empty());

    let lines = log_lines(tmp.path());
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["event_type"], "error");
}

#[tokio::test]
async fn duplicate_agent_ids_are_rejected() {
    let tmp = TempDir::new().unwrap();
    let oracle = Arc::new(ScriptedOracle::new(Vec::new()));
    let runner = Runner::new(
        test_config(tmp.path()),
        Arc::new(ScriptedDispatcher::new()),
        factory(oracle, Arc::new(Mutex::new(Vec::new()))),
    );
    let request = json!({
        "message": "hello",
        "agents": [
            {"agent_id": "a1", "agent_name": "One"},
            {"agent_id": "a1", "agent_name": "Two"}
        ]
    })
    .to_string();

    let result = runner.execute(&request, &CancellationToken::new()).await;

    assert!(!result.is_success);
    assert!(result.response.contains("Duplicate action id"));
}
