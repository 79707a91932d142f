mod common;

use common::{registry_with, spied_weather, text, tool_call, RecordingObserver, ScriptedClient, Spy};
use tempfile::TempDir;
use turngate::cli::{Args, Command};
use turngate::config::{Config, JsonConfig};
use turngate::error::TurnGateError;
use turngate::models::{Phase, Role};
use turngate::orchestrator::{run, OrchestratorContext};
use turngate::session::{FilesystemSessionStore, SessionStore};
use turngate::turn::TurnOutcome;

fn test_config() -> Config {
    Config::resolve(&Args::default(), JsonConfig::default(), |key| {
        (key == "OPENAI_API_KEY").then(|| "sk-test".to_string())
    })
    .unwrap()
}

#[tokio::test]
async fn test_confirmation_survives_between_invocations() {
    let temp_dir = TempDir::new().unwrap();
    let store = FilesystemSessionStore::with_dir(temp_dir.path());
    let config = test_config();
    let args = Args::default();
    let spy = Spy::default();
    let registry = registry_with(vec![spied_weather(&spy)]);
    let client = ScriptedClient::new(vec![
        vec![tool_call(
            0,
            "call_1",
            "get_current_weather",
            r#"{"location": "Tokyo"}"#,
        )],
        text(&["It is 10 degrees in Tokyo."]),
    ]);
    let context = || OrchestratorContext {
        config: &config,
        args: &args,
        client: &client,
        registry: &registry,
        store: &store,
    };
    let mut observer = RecordingObserver::default();

    let outcome = run(
        context(),
        Command::Input("What's the weather in Tokyo?".to_string()),
        &mut observer,
    )
    .await
    .unwrap();
    assert!(matches!(outcome, Some(TurnOutcome::AwaitingConfirmation(_))));

    let parked = store.find_recent_session().unwrap();
    assert_eq!(parked.phase(), Phase::AwaitingConfirmation);
    assert!(spy.invocations().is_empty());

    let outcome = run(context(), Command::Approve, &mut observer).await.unwrap();
    assert_eq!(outcome, Some(TurnOutcome::Replied));

    let finished = store.find_recent_session().unwrap();
    assert_eq!(finished.session_id, parked.session_id);
    assert_eq!(finished.phase(), Phase::Ready);
    assert_eq!(finished.history().len(), 5);
    assert_eq!(finished.history()[3].role, Role::Tool);
    assert_eq!(spy.names(), vec!["get_current_weather"]);
}

#[tokio::test]
async fn test_interrupted_turn_is_saved_as_ready() {
    let temp_dir = TempDir::new().unwrap();
    let store = FilesystemSessionStore::with_dir(temp_dir.path());
    let config = test_config();
    let args = Args::default();
    let registry = registry_with(vec![]);
    let mut reply = text(&["Half a sen"]);
    reply.push(common::interrupted());
    let client = ScriptedClient::new(vec![reply]);
    let mut observer = RecordingObserver::default();

    let context = OrchestratorContext {
        config: &config,
        args: &args,
        client: &client,
        registry: &registry,
        store: &store,
    };
    assert!(run(context, Command::Input("hello".to_string()), &mut observer)
        .await
        .is_err());

    let saved = store.find_recent_session().unwrap();
    assert_eq!(saved.phase(), Phase::Ready);
    assert_eq!(saved.history().len(), 2);
}

#[tokio::test]
async fn test_reset_and_pending_without_calls() {
    let temp_dir = TempDir::new().unwrap();
    let store = FilesystemSessionStore::with_dir(temp_dir.path());
    let config = test_config();
    let args = Args::default();
    let registry = registry_with(vec![]);
    let client = ScriptedClient::new(vec![text(&["Hi!"])]);
    let mut observer = RecordingObserver::default();
    let context = || OrchestratorContext {
        config: &config,
        args: &args,
        client: &client,
        registry: &registry,
        store: &store,
    };

    run(context(), Command::Input("hello".to_string()), &mut observer)
        .await
        .unwrap();
    assert_eq!(store.find_recent_session().unwrap().history().len(), 3);

    assert_eq!(run(context(), Command::Pending, &mut observer).await.unwrap(), None);

    run(context(), Command::Reset, &mut observer).await.unwrap();
    let reset = store.find_recent_session().unwrap();
    assert_eq!(reset.history().len(), 1);
    assert_eq!(reset.history()[0].content.as_deref(), Some("How can I help you?"));
}

#[tokio::test]
async fn test_read_only_commands_write_no_session() {
    let temp_dir = TempDir::new().unwrap();
    let store = FilesystemSessionStore::with_dir(temp_dir.path());
    let config = test_config();
    let args = Args::default();
    let registry = registry_with(vec![]);
    let client = ScriptedClient::new(vec![]);
    let mut observer = RecordingObserver::default();
    let context = || OrchestratorContext {
        config: &config,
        args: &args,
        client: &client,
        registry: &registry,
        store: &store,
    };

    assert_eq!(run(context(), Command::History, &mut observer).await.unwrap(), None);
    assert_eq!(run(context(), Command::Pending, &mut observer).await.unwrap(), None);
    assert_eq!(run(context(), Command::Reset, &mut observer).await.unwrap(), None);
    assert!(matches!(
        run(context(), Command::Approve, &mut observer).await,
        Err(TurnGateError::NoPendingConfirmation)
    ));

    assert!(store.find_recent_session().is_none());
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn test_new_flag_does_not_bury_parked_session() {
    let temp_dir = TempDir::new().unwrap();
    let store = FilesystemSessionStore::with_dir(temp_dir.path());
    let config = test_config();
    let registry = registry_with(vec![spied_weather(&Spy::default())]);
    let client = ScriptedClient::new(vec![vec![tool_call(
        0,
        "call_1",
        "get_current_weather",
        r#"{"location": "Tokyo"}"#,
    )]]);
    let mut observer = RecordingObserver::default();

    let args = Args::default();
    let context = OrchestratorContext {
        config: &config,
        args: &args,
        client: &client,
        registry: &registry,
        store: &store,
    };
    run(context, Command::Input("Weather in Tokyo?".to_string()), &mut observer)
        .await
        .unwrap();
    let parked = store.find_recent_session().unwrap();

    let fresh_args = Args {
        new_conversation: true,
        ..Args::default()
    };
    let context = OrchestratorContext {
        config: &config,
        args: &fresh_args,
        client: &client,
        registry: &registry,
        store: &store,
    };
    assert!(matches!(
        run(context, Command::Approve, &mut observer).await,
        Err(TurnGateError::NoPendingConfirmation)
    ));

    let recent = store.find_recent_session().unwrap();
    assert_eq!(recent.session_id, parked.session_id);
    assert_eq!(recent.phase(), Phase::AwaitingConfirmation);
}
