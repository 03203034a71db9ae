//! Engineer Chat - terminal entry point
//!
//! Reads operator input line by line and runs each message through the agent.

use engineer_chat::agent::{Agent, Transcript};
use engineer_chat::config::Config;
use engineer_chat::console::Console;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const EXIT_SENTINEL: &str = "exit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they don't interleave with the chat on stdout
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "engineer_chat=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Loaded configuration: model={}, workspace={}, max_rounds={}",
        config.default_model,
        config.workspace_path.display(),
        config.max_rounds
    );

    let agent = Agent::new(config)?;
    let console = Console::new();
    let mut transcript = Transcript::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    console.welcome();

    loop {
        console.prompt()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();

        if input.eq_ignore_ascii_case(EXIT_SENTINEL) {
            break;
        }
        if input.is_empty() {
            continue;
        }

        match agent.run_turn(&mut transcript, input, &console).await {
            Ok(reply) => console.answer(&reply.text),
            Err(e) => console.error(&e.to_string()),
        }
    }

    console.goodbye();
    Ok(())
}
