use colored::*;

use crate::api::ModelClient;
use crate::cli::{Args, Command};
use crate::config::Config;
use crate::error::{Result, TurnGateError};
use crate::local_tools::ToolRegistry;
use crate::models::TurnSessionState;
use crate::session::{self, SessionStore};
use crate::turn::{ConfirmationGate, Decision, TurnEngine, TurnObserver, TurnOutcome};
use crate::ui::{display_history, display_pending};

pub struct OrchestratorContext<'a> {
    pub config: &'a Config,
    pub args: &'a Args,
    pub client: &'a dyn ModelClient,
    pub registry: &'a ToolRegistry,
    pub store: &'a dyn SessionStore,
}

/// Load the session, apply one command to it and save it if it changed.
///
/// A turn is saved even when it fails, so that a stream that broke off still
/// leaves the stored state back in `ready`.
pub async fn run(
    context: OrchestratorContext<'_>,
    command: Command,
    observer: &mut dyn TurnObserver,
) -> Result<Option<TurnOutcome>> {
    let greeting = context.config.greeting.as_deref();
    let (mut state, resumed) =
        session::load_or_create(context.store, context.args.new_conversation, greeting);
    tracing::debug!(
        session = %state.session_id,
        resumed,
        phase = %state.phase(),
        messages = state.history().len(),
        "loaded session"
    );

    let engine = TurnEngine::new(
        context.client,
        context.registry,
        ConfirmationGate::new(context.config.confirmation),
    )
    .with_refusal_message(context.config.refusal_message.clone());

    let changes_state = match &command {
        Command::Input(_) | Command::Approve | Command::Deny => true,
        Command::Reset => resumed,
        Command::Pending | Command::History => false,
    };
    let result = dispatch(&engine, &mut state, command, greeting, observer).await;

    // Nothing was waiting, so the state is untouched
    if !changes_state || matches!(result, Err(TurnGateError::NoPendingConfirmation)) {
        return result;
    }

    if let Err(e) = context.store.save_session(&state) {
        tracing::warn!(session = %state.session_id, error = %e, "failed to save session");
        if result.is_ok() {
            return Err(TurnGateError::SessionError(format!(
                "failed to save session: {}",
                e
            )));
        }
    }

    result
}

async fn dispatch(
    engine: &TurnEngine<'_>,
    state: &mut TurnSessionState,
    command: Command,
    greeting: Option<&str>,
    observer: &mut dyn TurnObserver,
) -> Result<Option<TurnOutcome>> {
    match command {
        Command::Input(input) => engine
            .submit_user_input(state, &input, observer)
            .await
            .map(Some),
        Command::Approve => engine
            .resolve_confirmation(state, Some(Decision::Approved), observer)
            .await
            .map(Some),
        Command::Deny => engine
            .resolve_confirmation(state, Some(Decision::Denied), observer)
            .await
            .map(Some),
        Command::Pending => {
            match engine.resolve_confirmation(state, None, observer).await {
                Ok(outcome) => {
                    display_pending(state);
                    Ok(Some(outcome))
                }
                Err(TurnGateError::NoPendingConfirmation) => {
                    display_pending(state);
                    Ok(None)
                }
                Err(e) => Err(e),
            }
        }
        Command::History => {
            display_history(state);
            Ok(None)
        }
        Command::Reset => {
            state.reset(greeting);
            println!("{}", "Conversation reset.".green());
            Ok(None)
        }
    }
}
