use clap::Parser;

use crate::turn::ConfirmationMode;

#[derive(Parser, Debug, Default)]
#[command(name = "turngate")]
#[command(
    about = "Chat with an OpenAI-compatible model; tool calls wait for your approval",
    long_about = None
)]
pub struct Args {
    #[arg(short = 'n', long = "new", help = "Start a new conversation")]
    pub new_conversation: bool,

    #[arg(
        long = "reset",
        help = "Reset the current conversation to its opening message"
    )]
    pub reset: bool,

    #[arg(long = "clear", help = "Clear all conversation history")]
    pub clear_history: bool,

    #[arg(
        long = "approve",
        conflicts_with = "deny",
        help = "Approve the tool calls waiting for confirmation"
    )]
    pub approve: bool,

    #[arg(long = "deny", help = "Deny the tool calls waiting for confirmation")]
    pub deny: bool,

    #[arg(long = "pending", help = "Show tool calls waiting for confirmation")]
    pub pending: bool,

    #[arg(long = "history", help = "Print the current conversation")]
    pub history: bool,

    #[arg(
        long = "confirmation",
        value_name = "MODE",
        help = "How tool calls are confirmed (batch, per-call, auto)"
    )]
    pub confirmation: Option<ConfirmationMode>,

    #[arg(long = "no-tools", help = "Do not offer tools to the model")]
    pub no_tools: bool,

    #[arg(short = 'm', long = "model", help = "Model to use for this request")]
    pub model: Option<String>,

    #[arg(
        long = "api-endpoint",
        help = "Custom API base URL (e.g., http://localhost:11434/v1)"
    )]
    pub api_endpoint: Option<String>,

    #[arg(short = 'v', long = "verbose", help = "Print debug logs to stderr")]
    pub verbose: bool,

    #[arg(
        long = "reasoning-effort",
        help = "Set reasoning effort level (high, medium, low)"
    )]
    pub reasoning_effort: Option<String>,

    #[arg(
        long = "reasoning-max-tokens",
        help = "Set maximum tokens for reasoning"
    )]
    pub reasoning_max_tokens: Option<u32>,

    #[arg(
        long = "reasoning-exclude",
        help = "Use reasoning but exclude from response"
    )]
    pub reasoning_exclude: bool,

    #[arg(
        long = "reasoning-enabled",
        help = "Enable reasoning with default parameters"
    )]
    pub reasoning_enabled: bool,

    #[arg(help = "Message to send")]
    pub message: Vec<String>,
}

/// What one invocation asks the session to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Input(String),
    Approve,
    Deny,
    Pending,
    History,
    Reset,
}

impl Args {
    /// `None` when nothing was asked for.
    pub fn command(&self) -> Option<Command> {
        if self.approve {
            Some(Command::Approve)
        } else if self.deny {
            Some(Command::Deny)
        } else if self.pending {
            Some(Command::Pending)
        } else if self.history {
            Some(Command::History)
        } else if self.reset {
            Some(Command::Reset)
        } else if !self.message.is_empty() {
            Some(Command::Input(self.message.join(" ")))
        } else {
            None
        }
    }
}
