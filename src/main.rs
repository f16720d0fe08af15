use std::io::{self, IsTerminal};
use std::panic;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::event::DisableBracketedPaste;
use crossterm::execute;
use crossterm::terminal::{LeaveAlternateScreen, disable_raw_mode};

use edubot::api::{ApiClient, ChatService};
use edubot::config::Config;
use edubot::logging;
use edubot::ui::App;

#[derive(Parser)]
#[command(name = "edubot")]
#[command(version)]
#[command(about = "Terminal chat client for the EduBot study assistant", long_about = None)]
struct Cli {
    /// Base URL of the answering service
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the answer
    Ask {
        /// The question to send
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// Check whether the service is up
    Health,
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = Config::load()?;
    config.apply_cli_overrides(cli.api_url, cli.timeout);

    match cli.command {
        None => run_interactive(config).await,
        Some(Commands::Ask { question }) => {
            logging::init_stderr_logging(&config.logging.level)?;
            ask(&config, &question.join(" ")).await
        }
        Some(Commands::Health) => {
            logging::init_stderr_logging(&config.logging.level)?;
            health(&config).await
        }
        Some(Commands::Config) => {
            print!("{}", config.to_toml()?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn build_client(config: &Config) -> Result<ApiClient> {
    ApiClient::new(&config.api)
        .map_err(anyhow::Error::new)
        .with_context(|| format!("Failed to set up a client for {}", config.api.base_url))
}

async fn run_interactive(config: Config) -> Result<ExitCode> {
    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        eprintln!("Error: edubot needs an interactive terminal (TTY).");
        eprintln!();
        eprintln!("For scripts and pipes use the one-shot commands instead:");
        eprintln!("  edubot ask \"tu pregunta\"");
        eprintln!("  edubot health");
        return Ok(ExitCode::FAILURE);
    }

    let _log_guard = logging::init_file_logging(&config.log_dir(), &config.logging.level)?;
    let client = build_client(&config)?;

    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableBracketedPaste);
        original_hook(panic_info);
    }));

    App::new(&config, client).run_in_terminal().await?;

    println!("¡Hasta pronto! Sigue estudiando.");
    Ok(ExitCode::SUCCESS)
}

async fn ask(config: &Config, question: &str) -> Result<ExitCode> {
    if question.trim().is_empty() {
        eprintln!("Escribe una pregunta.");
        return Ok(ExitCode::FAILURE);
    }

    let client = build_client(config)?;
    match client.send(question.trim()).await {
        Ok(reply) => {
            println!("{}", reply.text);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("{}", err.message);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn health(config: &Config) -> Result<ExitCode> {
    let client = build_client(config)?;
    match client.health().await {
        Ok(status) if status.is_ready() => {
            println!("{}: {} (EduBot listo)", client.base_url(), status.status);
            Ok(ExitCode::SUCCESS)
        }
        Ok(status) => {
            println!("{}: {} (EduBot sin inicializar)", client.base_url(), status.status);
            Ok(ExitCode::FAILURE)
        }
        Err(err) => {
            eprintln!("{}: {}", client.base_url(), err.message);
            Ok(ExitCode::FAILURE)
        }
    }
}
