use colored::*;
use std::io::{self, Write};

use crate::error::ToolError;
use crate::models::{Message, Role, ToolCallRequest, TurnSessionState};
use crate::turn::TurnObserver;

const RULE: &str = "──────────────────────────────────────────────────────────";

/// Prints a turn to the terminal as it happens.
#[derive(Debug, Default)]
pub struct ConsoleObserver {
    reasoning_exclude: bool,
    in_reasoning: bool,
    wrote_text: bool,
}

impl ConsoleObserver {
    pub fn new(reasoning_exclude: bool) -> Self {
        Self {
            reasoning_exclude,
            ..Self::default()
        }
    }

    fn close_reasoning(&mut self) {
        if self.in_reasoning {
            println!();
            println!("{}", format!("└{}", RULE).dimmed());
            self.in_reasoning = false;
        }
    }
}

impl TurnObserver for ConsoleObserver {
    fn on_text(&mut self, text: &str) {
        self.close_reasoning();
        print!("{}", text);
        self.wrote_text = true;
        let _ = io::stdout().flush();
    }

    fn on_reasoning(&mut self, text: &str) {
        if self.reasoning_exclude {
            return;
        }
        if !self.in_reasoning {
            println!("{}", format!("┌─[REASONING]{}", "─".repeat(46)).cyan());
            self.in_reasoning = true;
        }
        print!("{}", text.dimmed());
        let _ = io::stdout().flush();
    }

    fn on_confirmation_requested(&mut self, calls: &[ToolCallRequest]) {
        self.close_reasoning();
        println!(
            "{}",
            format!(
                "The assistant wants to run {} tool call{}:",
                calls.len(),
                if calls.len() == 1 { "" } else { "s" }
            )
            .yellow()
            .bold()
        );
        for call in calls {
            print_call(call);
        }
        println!(
            "{}",
            "Run `turngate --approve` to run them or `turngate --deny` to refuse.".dimmed()
        );
    }

    fn on_tool_result(&mut self, call: &ToolCallRequest, result: &Result<String, ToolError>) {
        self.close_reasoning();
        match result {
            Ok(output) => display_tool_result(&call.function_name, output),
            Err(e) => display_tool_error(&call.function_name, &e.to_string()),
        }
    }

    fn on_reply_finished(&mut self) {
        self.close_reasoning();
        if self.wrote_text {
            println!();
            self.wrote_text = false;
        }
        let _ = io::stdout().flush();
    }
}

fn print_call(call: &ToolCallRequest) {
    println!("  {} {}", "•".yellow(), call.function_name.bold());
    let arguments = serde_json::from_str::<serde_json::Value>(&call.arguments)
        .ok()
        .and_then(|v| serde_json::to_string_pretty(&v).ok())
        .unwrap_or_else(|| call.arguments.clone());
    for line in arguments.lines() {
        println!("    {}", line.dimmed());
    }
}

fn display_block(title: ColoredString, body: &str) {
    println!("{}", format!("┌─[{}]", title).dimmed());
    for line in body.trim_end().lines() {
        println!("{} {}", "│".dimmed(), line);
    }
    println!("{}", format!("└{}", RULE).dimmed());
}

/// Display a tool result in a boxed format
pub fn display_tool_result(name: &str, result: &str) {
    display_block(format!("TOOL: {}", name).cyan(), result);
}

/// Display a tool error in a boxed format
pub fn display_tool_error(name: &str, error: &str) {
    display_block(format!("TOOL ERROR: {}", name).red(), error);
}

pub fn display_pending(state: &TurnSessionState) {
    if state.pending_tool_calls().is_empty() {
        println!("{}", "No tool calls are waiting for confirmation.".dimmed());
        return;
    }
    println!("{}", "Waiting for confirmation:".yellow().bold());
    for call in state.pending_tool_calls() {
        print_call(call);
    }
}

pub fn display_history(state: &TurnSessionState) {
    println!(
        "{}",
        format!("Session {} ({})", state.session_id, state.phase()).dimmed()
    );
    for message in state.history() {
        print_message(message);
    }
}

fn print_message(message: &Message) {
    let content = message.content.as_deref().unwrap_or("");
    match message.role {
        Role::System => println!("{} {}", "system:".dimmed(), content.dimmed()),
        Role::User => println!("{} {}", "you:".green().bold(), content),
        Role::Assistant => {
            if !content.is_empty() {
                println!("{} {}", "assistant:".blue().bold(), content);
            }
            for call in message.tool_calls.iter().flatten() {
                println!(
                    "{} {}({})",
                    "assistant wants:".blue().bold(),
                    call.function_name,
                    call.arguments
                );
            }
        }
        Role::Tool => {
            let name = message.name.as_deref().unwrap_or("tool");
            println!("{} {}", format!("{}:", name).cyan(), content);
        }
    }
}
