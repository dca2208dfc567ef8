use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Text};
use tracing_subscriber::EnvFilter;
use weather_agent_core::{
    AgentConfig, ArtifactScope, FsArtifactStore, ToolResponse, Units, WeatherAgent, WeatherTools,
    config::DEFAULT_BASE_URL,
    tools::{CurrentWeatherArgs, ForecastArgs},
};

const AGENT_NAME: &str = "weather-agent";

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-agent", version, about = "Weather agent tools")]
pub struct Cli {
    /// Verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeatherMap API key and base URL.
    Configure,

    /// Show current weather for a location.
    Current {
        /// City name, state and country, e.g. "London,UK".
        location: String,

        #[arg(long, default_value = "metric")]
        units: Units,

        /// Save the report as a JSON artifact.
        #[arg(long)]
        save: bool,

        /// Print the full tool result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show a daily forecast for a location.
    Forecast {
        location: String,

        /// Number of days (1-5).
        #[arg(long, default_value_t = 5)]
        days: i64,

        #[arg(long, default_value = "metric")]
        units: Units,

        #[arg(long)]
        save: bool,

        #[arg(long)]
        json: bool,
    },

    /// Print the tool definitions offered to agent hosts.
    Tools,
}

/// Log to stderr; `RUST_LOG` wins over `-v`.
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("weather_agent_core={level},weather_agent_cli={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Tools => {
                let defs = WeatherTools::definitions();
                println!("{}", serde_json::to_string_pretty(&defs)?);
                Ok(())
            }
            Command::Current { location, units, save, json } => {
                let args = CurrentWeatherArgs { location, units, save_to_file: save };
                with_tools(|tools| async move { tools.get_current_weather(args).await }, json).await
            }
            Command::Forecast { location, days, units, save, json } => {
                let args = ForecastArgs { location, days, units, save_to_file: save };
                with_tools(|tools| async move { tools.get_weather_forecast(args).await }, json).await
            }
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut cfg = AgentConfig::load()?;

    let api_key = Password::new("OpenWeatherMap API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    let base_url = Text::new("API base URL:")
        .with_default(if cfg.base_url.is_empty() { DEFAULT_BASE_URL } else { &cfg.base_url })
        .prompt()
        .context("Failed to read base URL")?;

    cfg.set_api_key(api_key.trim().to_string());
    cfg.base_url = base_url.trim().to_string();
    cfg.save()?;

    println!("Configuration saved to {}", AgentConfig::config_file_path()?.display());
    Ok(())
}

/// Initialize the agent, run one tool invocation, print it, then clean up.
async fn with_tools<F, Fut>(invoke: F, json: bool) -> anyhow::Result<()>
where
    F: FnOnce(WeatherTools) -> Fut,
    Fut: std::future::Future<Output = ToolResponse>,
{
    let cfg = AgentConfig::load()?.with_env_overrides(|k| std::env::var(k).ok());
    let agent = Arc::new(WeatherAgent::initialize(AGENT_NAME, &cfg)?);
    let store = FsArtifactStore::new(cfg.artifact_dir_or_default()?);
    let scope = ArtifactScope {
        app_name: AGENT_NAME.to_string(),
        user_id: whoami(),
        session_id: format!("cli-{}", agent.initialized_at().format("%Y%m%dT%H%M%S")),
    };
    let tools = WeatherTools::new(agent.clone()).with_artifact_store(Arc::new(store), scope);

    let response = invoke(tools).await;
    agent.cleanup();

    print_response(&response, json)?;
    if response.is_success() {
        Ok(())
    } else {
        std::process::exit(1)
    }
}

fn print_response(response: &ToolResponse, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(response)?);
        return Ok(());
    }

    match response {
        ToolResponse::Success { summary, artifact, .. } => {
            println!("{summary}");
            if let Some(artifact) = artifact {
                println!("\nArtifact: {}", serde_json::to_string(artifact)?);
            }
        }
        ToolResponse::Error { message } => eprintln!("Error: {message}"),
    }
    Ok(())
}

fn whoami() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "local".to_string())
}
