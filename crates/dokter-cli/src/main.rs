//! dokter - a terminal chatbot that suggests diseases from described symptoms

mod config;
mod strings;
mod ui;

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;

use clap::Parser;
use dokter_ai::providers::google::GoogleProvider;
use dokter_chat::{ChatEvent, ChatSession, Error, SessionSettings, Turn};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

/// dokter - medical symptom chatbot backed by Gemini
#[derive(Parser, Debug)]
#[command(name = "dokter")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Model to use (default: gemini-1.5-flash)
    #[arg(short, long)]
    model: Option<String>,

    /// Path to secrets.toml
    #[arg(long)]
    secrets: Option<PathBuf>,

    /// Send a single prompt, print the reply and exit
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Disable TUI mode (use simple stdin/stdout)
    #[arg(long)]
    no_tui: bool,

    /// List models the API key can chat with
    #[arg(long)]
    list_models: bool,

    /// Write a secrets file template
    #[arg(long)]
    init_config: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.verbose {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("dokter=debug"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }

    let secrets_path = args
        .secrets
        .clone()
        .unwrap_or_else(config::Secrets::default_path);

    if args.init_config {
        match config::Secrets::init(&secrets_path) {
            Ok(true) => println!("Secrets file created at: {}", secrets_path.display()),
            Ok(false) => println!("Secrets file already exists at: {}", secrets_path.display()),
            Err(e) => {
                eprintln!("Error creating secrets file: {}", e);
                std::process::exit(1);
            }
        }
        println!("\nExample:\n{}", config::example_config());
        return Ok(());
    }

    let cfg = match config::Secrets::load(&secrets_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("secrets file unusable: {}", e);
            eprintln!("{}", strings::config_error(&e));
            std::process::exit(1);
        }
    };
    let api_key = cfg.api_key();

    let model_id = args
        .model
        .or(cfg.model.clone())
        .unwrap_or_else(|| dokter_ai::models::DEFAULT_MODEL_ID.to_string());
    let model = dokter_ai::models::resolve_model(&model_id);

    if args.list_models {
        return list_models(api_key.as_deref(), &model.base_url).await;
    }

    let mut session = match ChatSession::start(api_key.as_deref(), SessionSettings::for_model(model)) {
        Ok(session) => session,
        Err(e) => {
            tracing::error!("startup failed: {}", e);
            eprintln!("{}", strings::startup_error(&e));
            std::process::exit(1);
        }
    };

    if let Some(command) = args.command {
        return run_command(&mut session, &command).await;
    }

    let use_tui = !args.no_tui && cfg.tui.unwrap_or(true) && io::stdout().is_terminal();
    if use_tui {
        return ui::run_tui(&mut session, cfg.theme()).await;
    }

    run_interactive(&mut session).await
}

async fn list_models(api_key: Option<&str>, base_url: &str) -> anyhow::Result<()> {
    let Some(api_key) = api_key else {
        eprintln!("{}", strings::MISSING_API_KEY);
        std::process::exit(1);
    };

    let provider = match GoogleProvider::new(api_key) {
        Ok(provider) => provider,
        Err(e) => {
            eprintln!("{}", strings::startup_error(&Error::from_init(e)));
            std::process::exit(1);
        }
    };

    for model in provider.list_models(base_url).await? {
        println!("{:<32} {}", model.id(), model.display_name);
    }
    Ok(())
}

/// Write reply text to `out` as it streams, until the relay ends
async fn print_reply<W: Write>(
    mut receiver: broadcast::Receiver<ChatEvent>,
    out: &mut W,
) -> io::Result<()> {
    let mut printed = 0;
    loop {
        match receiver.recv().await {
            Ok(ChatEvent::ReplyUpdate { text }) => {
                // Updates carry the whole reply so far
                if let Some(fresh) = text.get(printed..) {
                    write!(out, "{}", fresh)?;
                    out.flush()?;
                }
                printed = text.len();
            }
            Ok(ChatEvent::RelayEnd { total_usage }) => {
                if printed > 0 {
                    writeln!(out)?;
                }
                tracing::debug!(
                    input = total_usage.input,
                    output = total_usage.output,
                    "token usage"
                );
                return Ok(());
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(n)) => {
                // The next update still carries the full text
                tracing::warn!("printer skipped {} chat events", n);
            }
            Err(broadcast::error::RecvError::Closed) => return Ok(()),
        }
    }
}

/// Relay one prompt, streaming the reply to `out`
async fn relay_once<W: Write>(
    session: &mut ChatSession,
    prompt: &str,
    out: &mut W,
) -> dokter_chat::Result<Turn> {
    let receiver = session.subscribe();
    let printer = print_reply(receiver, out);
    let relay = session.send_message(prompt);
    tokio::pin!(printer, relay);

    let mut printing = true;
    let result = loop {
        tokio::select! {
            result = &mut relay => break result,
            done = &mut printer, if printing => {
                if let Err(e) = done {
                    tracing::warn!("cannot print reply: {}", e);
                }
                printing = false;
            }
        }
    };

    // A rejected prompt never reaches the relay, so no RelayEnd is coming
    if printing && !matches!(result, Err(Error::EmptyPrompt)) {
        if let Err(e) = printer.await {
            tracing::warn!("cannot print reply: {}", e);
        }
    }
    result
}

/// One-shot mode: relay `prompt` and exit
async fn run_command(session: &mut ChatSession, prompt: &str) -> anyhow::Result<()> {
    if let Err(e) = relay_once(session, prompt, &mut io::stdout()).await {
        eprintln!("{}", strings::relay_error(&e));
        std::process::exit(1);
    }
    Ok(())
}

/// Plain line-mode chat on stdin/stdout
async fn run_interactive(session: &mut ChatSession) -> anyhow::Result<()> {
    let show_placeholder = io::stdin().is_terminal();
    chat_lines(
        session,
        io::stdin().lock(),
        &mut io::stdout(),
        &mut io::stderr(),
        show_placeholder,
    )
    .await?;
    Ok(())
}

/// Read prompts line by line from `input` until EOF or `exit`.
///
/// Replies go to `out`; progress and errors go to `diag`.
async fn chat_lines<R: BufRead, W: Write, D: Write>(
    session: &mut ChatSession,
    mut input: R,
    out: &mut W,
    diag: &mut D,
    show_placeholder: bool,
) -> io::Result<()> {
    writeln!(out, "{}", strings::TITLE)?;
    writeln!(out, "{}", strings::CAPTION)?;
    writeln!(out)?;
    for entry in session.transcript() {
        writeln!(out, "{}: {}", entry.label, entry.text)?;
    }
    writeln!(out)?;

    loop {
        if show_placeholder {
            write!(out, "{} > ", strings::PLACEHOLDER)?;
        } else {
            write!(out, "> ")?;
        }
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            break;
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        writeln!(diag, "{}", strings::THINKING)?;
        match session.send_message(line).await {
            Ok(reply) => writeln!(out, "{}: {}\n", dokter_chat::transcript::MODEL_LABEL, reply.text)?,
            Err(e) => writeln!(diag, "{}\n", strings::relay_error(&e))?,
        }
    }

    Ok(())
}
