use clap::Parser;
use colored::*;
use std::process;
use tracing_subscriber::EnvFilter;

use turngate::api::OpenAiClient;
use turngate::cli::Args;
use turngate::config::Config;
use turngate::error::Result;
use turngate::local_tools::{format_tools_for_llm, ToolRegistry};
use turngate::orchestrator::{self, OrchestratorContext};
use turngate::session::{FilesystemSessionStore, SessionStore};
use turngate::ui::ConsoleObserver;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = run(args).await {
        eprintln!("{} {}", "Error:".red(), e);
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "turngate=debug" } else { "turngate=warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(args: Args) -> Result<()> {
    if args.clear_history {
        FilesystemSessionStore::new()?.clear_all_sessions()?;
        println!("{}", "All conversation history cleared.".green());
        return Ok(());
    }

    let Some(command) = args.command() else {
        print_usage();
        process::exit(1);
    };

    let config = Config::from_env_and_args(&args)?;
    init_logging(config.verbose);
    tracing::debug!(
        model = %config.model,
        endpoint = %config.api_endpoint,
        confirmation = ?config.confirmation,
        "configuration loaded"
    );

    let registry = if config.tools_enabled {
        ToolRegistry::from_config(&config.local_tools_config)
    } else {
        ToolRegistry::new()
    };
    if !registry.is_empty() {
        tracing::debug!(tools = ?registry.names(), "tools available");
    }

    let client = OpenAiClient::new(&config, format_tools_for_llm(&registry))?;
    let store = FilesystemSessionStore::new()?.with_expiry_minutes(config.session_expiry_minutes);
    let mut observer = ConsoleObserver::new(config.reasoning_exclude);

    let context = OrchestratorContext {
        config: &config,
        args: &args,
        client: &client,
        registry: &registry,
        store: &store,
    };
    orchestrator::run(context, command, &mut observer).await?;
    Ok(())
}

fn print_usage() {
    eprintln!("{}", "Usage: turngate [OPTIONS] <message>".red());
    eprintln!(
        "{}",
        "  -n, --new                  Start a new conversation".dimmed()
    );
    eprintln!(
        "{}",
        "      --approve              Run the tool calls waiting for confirmation".dimmed()
    );
    eprintln!(
        "{}",
        "      --deny                 Refuse the tool calls waiting for confirmation".dimmed()
    );
    eprintln!(
        "{}",
        "      --pending              Show tool calls waiting for confirmation".dimmed()
    );
    eprintln!(
        "{}",
        "      --history              Print the current conversation".dimmed()
    );
    eprintln!(
        "{}",
        "      --reset                Reset the current conversation".dimmed()
    );
    eprintln!(
        "{}",
        "      --clear                Clear all conversation history".dimmed()
    );
    eprintln!(
        "{}",
        "      --confirmation <MODE>  batch, per-call or auto".dimmed()
    );
}
