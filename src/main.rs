use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::{fmt, EnvFilter};
use weatherbot::channels::TelegramChannel;
use weatherbot::config::Config;
use weatherbot::gateway::{self, AppState};
use weatherbot::observability::Metrics;
use weatherbot::weather::ForecastProvider;
use weatherbot::{AccessGate, LocationCache, QueryPipeline, YandexWeatherClient};

/// Telegram bot that answers a shared location with the current weather.
#[derive(Parser, Debug)]
#[command(name = "weatherbot", version, about)]
struct Cli {
    /// Path to config.toml (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the bot (default)
    Run,
    /// Load and validate configuration, then print a redacted summary
    CheckConfig,
    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = fmt::Subscriber::builder()
        .with_timer(fmt::time::ChronoLocal::rfc_3339())
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {e}"))?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "weatherbot", &mut std::io::stdout());
            Ok(())
        }
        Commands::CheckConfig => {
            let config = load_config(cli.config.as_deref());
            println!("{}", config.summary());
            Ok(())
        }
        Commands::Run => run(load_config(cli.config.as_deref())).await,
    }
}

/// Load and validate configuration; a bot without credentials must not start.
fn load_config(path: Option<&std::path::Path>) -> Config {
    tracing::info!("Loading configuration...");
    let config = Config::load(path).and_then(|config| config.validate().map(|()| config));
    match config {
        Ok(config) => {
            tracing::info!("Configuration loaded");
            config
        }
        Err(e) => {
            eprintln!("❌ Configuration error: {e}");
            eprintln!("Set the variables in the environment or a .env file.");
            std::process::exit(1);
        }
    }
}

async fn run(config: Config) -> Result<()> {
    let gate = AccessGate::new(config.allowed_user_ids.iter().copied());
    if gate.is_open() {
        tracing::warn!("No allow-list configured: the bot is open to every Telegram user");
    } else {
        tracing::info!("Access restricted to {} user(s)", gate.allowed_count());
    }

    let cache = Arc::new(LocationCache::new());
    let metrics = Arc::new(Metrics::new()?);
    let provider = Arc::new(YandexWeatherClient::from_config(
        config.yandex_weather_api_key.clone(),
        &config.forecast,
    ));

    let pipeline = Arc::new(
        QueryPipeline::new(gate, Arc::clone(&cache), provider.clone())
            .with_metrics(Arc::clone(&metrics)),
    );

    if let Some(bind) = config.gateway.bind.clone() {
        let state = AppState {
            metrics: Arc::clone(&metrics),
            cache: Arc::clone(&cache),
            provider: provider.name().to_string(),
            started_at: Instant::now(),
        };
        tokio::spawn(async move {
            if let Err(e) = gateway::serve(&bind, state).await {
                tracing::error!("Gateway stopped: {e:#}");
            }
        });
    }

    let channel = Arc::new(TelegramChannel::new(
        config.telegram_bot_token.clone(),
        &config.telegram,
        pipeline,
    )?);

    tracing::info!("Bot starting...");
    let result = tokio::select! {
        result = channel.run() => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
            Ok(())
        }
    };

    tracing::info!("Stopping bot...");
    provider.close().await;
    tracing::info!("Bot stopped");
    result
}
