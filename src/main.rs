//! # Playground Relay binary
//!
//! `playground serve` runs the relay; `playground ask` sends one prompt to a
//! running relay and prints the reply as it streams in.

use clap::{Args, Parser, Subcommand};
use playground_relay::{
    create_router,
    graceful_shutdown::wait_for_signal,
    models::{DEFAULT_COMPARE_MODEL_ID, DEFAULT_MODEL_ID},
    schemas::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE},
    stats::{estimate_cost, format_duration},
    AppState, Config, ConsumeOutcome, GracefulShutdown, Playground, Provider, RecentPromptLog, RelayClient,
    RunOutcome, StreamObserver, StreamSession, TokenUsage,
};
use std::{
    io::Write,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "playground", version, about = "LLM playground streaming relay")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the relay server
    Serve(Config),
    /// Send one prompt to a running relay and stream the reply
    Ask(AskArgs),
}

#[derive(Args)]
struct AskArgs {
    /// Prompt to send
    prompt: String,

    /// Relay base URL
    #[arg(long, env = "PLAYGROUND_RELAY_URL", default_value = "http://127.0.0.1:3000")]
    relay_url: String,

    /// Model id
    #[arg(short, long, default_value = DEFAULT_MODEL_ID)]
    model: String,

    /// Optional system prompt
    #[arg(short, long)]
    system: Option<String>,

    #[arg(short, long, default_value_t = DEFAULT_TEMPERATURE)]
    temperature: f32,

    #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
    max_tokens: u32,

    /// Also run the prompt against a second model, side by side
    #[arg(long, num_args = 0..=1, default_missing_value = DEFAULT_COMPARE_MODEL_ID)]
    compare: Option<String>,

    /// JSON file holding the recent prompt log
    #[arg(long, env = "PLAYGROUND_HISTORY")]
    history_file: Option<PathBuf>,

    /// Log filter for client-side diagnostics (written to stderr)
    #[arg(long, env = "RUST_LOG", default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env before parsing so its values back the env-bound arguments
    let _ = dotenv::dotenv();

    match Cli::parse().command {
        Command::Serve(config) => serve(config).await,
        Command::Ask(args) => ask(args).await,
    }
}

async fn serve(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    config.init();

    let state = AppState::new(config.clone())?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!("🚀 Playground relay listening on http://{}", listener.local_addr()?);
    info!("Default model: {}", config.default_model);
    for provider in [Provider::Groq, Provider::OpenAI] {
        info!(
            "{} upstream: {} (credential {})",
            provider,
            config.redacted_base_url(provider),
            if config.credential(provider).is_some() { "set" } else { "missing" }
        );
    }

    let shutdown = GracefulShutdown::new();
    shutdown.listen_for_signals();

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await?;

    info!("✅ Relay stopped");
    Ok(())
}

/// Prints primary-session deltas as they arrive.
struct TerminalPrinter;

impl StreamObserver for TerminalPrinter {
    fn on_content(&mut self, text: &str) {
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }

    fn on_done(&mut self, _usage: Option<TokenUsage>) {
        println!();
    }

    fn on_error(&mut self, _message: String) {
        println!();
    }
}

async fn ask(args: AskArgs) -> Result<(), Box<dyn std::error::Error>> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&args.log_level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();

    let mut playground = Playground::new(RelayClient::new(args.relay_url.clone())?);

    // Armed before any awaiting so an early Ctrl-C cancels the run
    let stop = playground.stop_handle();
    tokio::spawn(async move {
        if wait_for_signal().await.is_ok() {
            stop.stop();
        }
    });

    if let Some(path) = &args.history_file {
        playground = playground.with_history(load_history(path).await);
    }
    playground.prompt = args.prompt;
    playground.system_prompt = args.system.unwrap_or_default();
    playground.model = args.model;
    playground.temperature = args.temperature;
    playground.max_tokens = args.max_tokens;
    if let Some(compare_model) = args.compare {
        playground.compare_mode = true;
        playground.compare_model = compare_model;
    }

    let Some(outcome) = playground.submit_with(&mut TerminalPrinter).await else {
        eprintln!("Prompt is empty; nothing to send.");
        std::process::exit(2);
    };

    let failed = match outcome {
        RunOutcome::Single(result) => {
            report("", &playground.primary, result);
            result == ConsumeOutcome::Failed
        }
        RunOutcome::Compare(left, right) => {
            report(&format!("── {} ", playground.primary.model), &playground.primary, left);
            report(&format!("── {} ", playground.compare.model), &playground.compare, right);
            left == ConsumeOutcome::Failed || right == ConsumeOutcome::Failed
        }
    };

    if let Some(path) = &args.history_file {
        if let Err(e) = tokio::fs::write(path, playground.history.to_json()).await {
            warn!("Could not save prompt history to {}: {}", path.display(), e);
        }
    }

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

async fn load_history(path: &Path) -> RecentPromptLog {
    match tokio::fs::read_to_string(path).await {
        Ok(json) => RecentPromptLog::from_json(&json),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => RecentPromptLog::new(),
        Err(e) => {
            warn!("Could not read prompt history from {}: {}", path.display(), e);
            RecentPromptLog::new()
        }
    }
}

/// Summarize one finished session. In compare mode the text was not streamed
/// live, so it is printed under a heading here.
fn report(heading: &str, session: &StreamSession, outcome: ConsumeOutcome) {
    if !heading.is_empty() {
        println!("{}", heading);
        if !session.response.is_empty() {
            println!("{}", session.response);
        }
    }

    match outcome {
        ConsumeOutcome::Cancelled => eprintln!("(cancelled)"),
        ConsumeOutcome::Closed => eprintln!("(stream closed before completion)"),
        ConsumeOutcome::Failed => {
            eprintln!("Error: {}", session.error.as_deref().unwrap_or("unknown error"));
        }
        ConsumeOutcome::Completed => {}
    }

    let mut stats = Vec::new();
    if let Some(usage) = session.usage {
        stats.push(format!(
            "tokens {} prompt / {} completion / {} total",
            usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
        ));
        stats.push(format!(
            "cost {}",
            estimate_cost(Provider::for_model(&session.model), &session.model, usage.prompt_tokens, usage.completion_tokens)
        ));
    }
    if let Some(elapsed) = session.response_time {
        stats.push(format!("time {}", format_duration(elapsed)));
    }
    if !stats.is_empty() {
        eprintln!("[{}]", stats.join(" · "));
    }
}
