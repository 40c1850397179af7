mod bootstrap_helpers;
mod chat_loop;
mod cli_args;
mod notifier;

use std::io::Write;

use anyhow::{anyhow, bail, Context, Result};
use breeze_ai::{AgentStreamClient, TurnOutcome};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::bootstrap_helpers::init_tracing;
use crate::chat_loop::{ChatSession, LoopControl};
use crate::cli_args::Cli;
use crate::notifier::{Notifier, SoundSettings};

const PROMPT: &str = "> ";

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    run_cli(cli).await
}

async fn run_cli(cli: Cli) -> Result<()> {
    cli.validate().map_err(|message| anyhow!(message))?;
    let client = AgentStreamClient::new(cli.client_config())
        .context("failed to configure weather agent client")?;
    let notifier = Notifier::new(SoundSettings { enabled: cli.sound }, std::io::stderr());
    let mut session = ChatSession::new(
        &client,
        cli.run_parameters(),
        notifier,
        std::io::stdout(),
    );

    if let Some(prompt) = cli.prompt.as_deref() {
        return match session.send(prompt, ctrl_c_signal()).await? {
            TurnOutcome::Completed(_) => Ok(()),
            TurnOutcome::Failed(detail) => bail!("weather agent turn failed: {detail}"),
            TurnOutcome::Cancelled => bail!("weather agent turn cancelled"),
        };
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print_prompt()?;
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read stdin")?,
            _ = ctrl_c_signal() => None,
        };
        let Some(line) = line else {
            break;
        };
        if session.handle_line(&line, ctrl_c_signal()).await? == LoopControl::Quit {
            break;
        }
    }
    debug!(messages = session.conversation().len(), "chat session ended");
    Ok(())
}

fn print_prompt() -> Result<()> {
    let mut stdout = std::io::stdout();
    write!(stdout, "{PROMPT}")?;
    stdout.flush()?;
    Ok(())
}

async fn ctrl_c_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        debug!(%error, "ctrl-c handler unavailable");
        std::future::pending::<()>().await;
    }
}
