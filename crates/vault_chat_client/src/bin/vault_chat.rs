//! vault-chat: ask the vault organizer agent a question from the terminal.
//! Reads config, posts the question, prints the answer to stdout as it streams
//! in, and reports the conversation id on stderr.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

use anyhow::{bail, Context};
use clap::Parser;
use futures_util::StreamExt;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vault_chat_client::{config, Client, Config};

/// Chat with the vault organizer agent.
#[derive(Parser, Debug)]
#[command(name = "vault-chat")]
#[command(version, about, long_about = None)]
struct Args {
    /// Question to ask. Read from the first line of stdin when omitted.
    question: Option<String>,

    /// Path to configuration file (YAML).
    #[arg(long, env = "VAULT_CHAT_CONFIG")]
    config: Option<PathBuf>,

    /// Override the API base URL.
    #[arg(long)]
    base_url: Option<String>,

    /// Continue an existing conversation.
    #[arg(short, long)]
    thread_id: Option<String>,

    /// Wait for the full answer instead of streaming tokens.
    #[arg(long)]
    no_stream: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    debug: bool,
}

fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    // --config / VAULT_CHAT_CONFIG must exist; the default path may not.
    if let Some(path) = &args.config {
        return config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()));
    }
    match config::default_config_path() {
        Some(path) => config::load_or_default(&path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(Config::default()),
    }
}

fn read_question(args: &Args) -> anyhow::Result<String> {
    let question = match &args.question {
        Some(q) => q.trim().to_string(),
        None => {
            let mut line = String::new();
            io::stdin()
                .lock()
                .read_line(&mut line)
                .context("failed to read question from stdin")?;
            line.trim().to_string()
        }
    };
    if question.is_empty() {
        bail!("no question provided (pass it as an argument or on stdin)");
    }
    Ok(question)
}

async fn ask(client: &Client, question: &str, args: &Args) -> anyhow::Result<String> {
    let thread_id = args.thread_id.as_deref();
    let stdout = io::stdout();

    if args.no_stream {
        let reply = client.chat(question, thread_id).await?;
        let mut out = stdout.lock();
        writeln!(out, "{}", reply.response)?;
        return Ok(reply.thread_id);
    }

    let mut tokens = client.stream(question, thread_id).await?;
    while let Some(token) = tokens.next().await {
        let token = token?;
        let mut out = stdout.lock();
        write!(out, "{}", token)?;
        out.flush()?;
    }
    writeln!(stdout.lock())?;
    Ok(tokens.into_thread_id())
}

async fn run(args: Args) -> anyhow::Result<()> {
    let cfg = load_config(&args)?;
    let base_url = args
        .base_url
        .clone()
        .unwrap_or_else(|| cfg.base_url().to_string());
    let question = read_question(&args)?;

    tracing::debug!(%base_url, "starting chat");
    let client = Client::new(base_url);

    let thread_id = match cfg.timeout() {
        Some(limit) => tokio::time::timeout(limit, ask(&client, &question, &args))
            .await
            .with_context(|| format!("no complete answer within {}s", limit.as_secs()))??,
        None => ask(&client, &question, &args).await?,
    };

    if !thread_id.is_empty() {
        eprintln!("thread_id: {}", thread_id);
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| {
            eprintln!("Error: failed to create runtime: {}", e);
            process::exit(1);
        });

    if let Err(e) = rt.block_on(run(args)) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}
