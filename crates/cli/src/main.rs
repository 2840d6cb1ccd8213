use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use parley_agents::{EchoExecutor, TurnExecutor};
use parley_core::flow::{self, FlowShape};
use parley_llm::{OllamaGenerator, TextGenerator};
use parley_observability::{init_tracing, AppMetrics};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "parley")]
#[command(about = "Intent-routed chat over a local Ollama model")]
struct Cli {
    /// Model served by the Ollama endpoint.
    #[arg(long, env = "PARLEY_MODEL", default_value = "llama3.2:latest")]
    model: String,

    /// Base URL of the Ollama endpoint.
    #[arg(long, env = "PARLEY_OLLAMA_URL", default_value = "http://localhost:11434")]
    ollama_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive chat, one classify-route-respond turn per input line.
    Chat {
        /// Single-node chatbot: no classification, the model sees the whole
        /// transcript.
        #[arg(long)]
        simple: bool,
    },
    /// Write the turn topology as a Mermaid diagram.
    Graph {
        #[arg(long, default_value = "turn_graph.mmd")]
        out: PathBuf,
        #[arg(long)]
        simple: bool,
    },
    /// Check that the model endpoint is reachable.
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("parley_cli");
    let cli = Cli::parse();

    let generator = Arc::new(OllamaGenerator::new(&cli.model).with_base_url(&cli.ollama_url));

    match cli.command {
        Command::Chat { simple } => {
            let metrics = AppMetrics::shared();
            if simple {
                run_simple_chat(EchoExecutor::new(generator, metrics.clone())).await?;
            } else {
                run_chat(TurnExecutor::new(generator, metrics.clone())).await?;
            }
            info!(snapshot = ?metrics.snapshot(), "session ended");
        }
        Command::Graph { out, simple } => {
            let shape = if simple {
                FlowShape::Direct
            } else {
                FlowShape::Routed
            };
            fs::write(&out, flow::mermaid(shape))
                .with_context(|| format!("failed writing diagram to {}", out.display()))?;
            println!("graph diagram saved to {}", out.display());
        }
        Command::Doctor => {
            let healthy = generator
                .health_check()
                .await
                .context("model endpoint unreachable")?;
            if !healthy {
                bail!("model endpoint answered with an error status");
            }
            println!("ok: {} is reachable (model {})", cli.ollama_url, cli.model);
        }
    }

    Ok(())
}

async fn run_chat(mut executor: TurnExecutor<OllamaGenerator>) -> Result<()> {
    print_banner();

    while let Some(line) = read_user_line()? {
        let message = line.trim();
        if is_exit(message) {
            println!("Goodbye!");
            break;
        }
        if message.is_empty() {
            continue;
        }

        // A failed turn appends nothing; the user just tries again.
        match executor.run_turn(message).await {
            Ok(outcome) => println!("\nAssistant: {}", outcome.reply.content),
            Err(error) => eprintln!("turn failed ({error}); try again"),
        }
    }

    Ok(())
}

async fn run_simple_chat(mut executor: EchoExecutor<OllamaGenerator>) -> Result<()> {
    println!("parley chatbot. type 'exit' to quit.");

    while let Some(line) = read_user_line()? {
        let message = line.trim();
        if is_exit(message) {
            println!("Goodbye!");
            break;
        }
        if message.is_empty() {
            continue;
        }

        match executor.run_turn(message).await {
            Ok(reply) => println!("\nAssistant: {}", reply.content),
            Err(error) => eprintln!("turn failed ({error}); try again"),
        }
    }

    Ok(())
}

fn print_banner() {
    println!("{}", "=".repeat(50));
    println!("  parley: intent-routed chat");
    println!("  Try: 'tell me a joke', 'give me a fact about space',");
    println!("       'I need advice on studying'");
    println!("  Type 'exit' to quit");
    println!("{}", "=".repeat(50));
}

fn read_user_line() -> Result<Option<String>> {
    print!("\nYou: ");
    io::stdout().flush()?;

    let mut line = String::new();
    let read = io::stdin().read_line(&mut line)?;
    if read == 0 {
        // EOF: treat like an exit request.
        return Ok(None);
    }
    Ok(Some(line))
}

fn is_exit(message: &str) -> bool {
    message.eq_ignore_ascii_case("exit") || message.eq_ignore_ascii_case("quit")
}
