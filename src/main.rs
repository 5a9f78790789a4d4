use clap::{Args as ClapArgs, Parser, Subcommand};
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bug_vision::analysis::{
    AnalysisSource, Analyzer, MockAnalyzer, OllamaAnalyzer, OllamaConfig, format_bug_analysis,
};
use bug_vision::bot::{BugReportBot, ConsoleTransport, TelegramTransport};
use bug_vision::config::{
    self, AnalysisMode, DEFAULT_OLLAMA_MODEL, DEFAULT_OLLAMA_URL, DEFAULT_TELEGRAM_API_URL,
    ENV_ANALYSIS_MODE, ENV_OLLAMA_MODEL, ENV_OLLAMA_URL, ENV_TELEGRAM_API_URL,
    ENV_TELEGRAM_BOT_TOKEN,
};
use bug_vision::fixture::sample_bug_screenshot;
use bug_vision::report::AnalysisReport;

/// Bug Vision - QA test cases from bug screenshots and descriptions
#[derive(Parser, Debug)]
#[command(
    name = "bug-vision",
    about = "Turn bug screenshots and text descriptions into structured QA test cases",
    after_help = "ENVIRONMENT VARIABLES:\n\
        ANALYSIS_MODE                mock or ollama\n\
        OLLAMA_URL                   Ollama base URL\n\
        OLLAMA_MODEL                 Model name (vision-capable for screenshots)\n\
        BUG_VISION_REQUEST_TIMEOUT   Analysis timeout (seconds)\n\
        BUG_VISION_PROBE_TIMEOUT     Reachability probe timeout (seconds)\n\
        BUG_VISION_MAX_CONCURRENCY   Analyses the bot runs at once\n\
        TELEGRAM_BOT_TOKEN           Telegram bot token\n\
        TELEGRAM_API_URL             Telegram Bot API base URL\n\
        RUST_LOG                     Log filter (default: info)"
)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Backend selection shared by every command that analyzes
#[derive(ClapArgs, Debug, Clone)]
struct BackendArgs {
    /// Analysis backend: mock or ollama
    #[arg(long, env = ENV_ANALYSIS_MODE, default_value = "mock")]
    mode: String,

    /// Ollama base URL
    #[arg(long, env = ENV_OLLAMA_URL, default_value = DEFAULT_OLLAMA_URL)]
    ollama_url: String,

    /// Ollama model name
    #[arg(long, env = ENV_OLLAMA_MODEL, default_value = DEFAULT_OLLAMA_MODEL)]
    model: String,

    /// Analysis request timeout in seconds (default: BUG_VISION_REQUEST_TIMEOUT or 180)
    #[arg(long)]
    timeout: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze one screenshot or text description and print test cases
    Analyze {
        /// Screenshot file (PNG, JPEG, ...)
        #[arg(short, long, conflicts_with = "text", required_unless_present = "text")]
        image: Option<PathBuf>,

        /// Bug description in any language
        #[arg(short, long)]
        text: Option<String>,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        backend: BackendArgs,
    },

    /// Check that the Ollama backend is reachable
    Check {
        #[command(flatten)]
        backend: BackendArgs,
    },

    /// Chat with the bot in this terminal
    Chat {
        #[command(flatten)]
        backend: BackendArgs,
    },

    /// Run the bot on Telegram (long polling)
    Telegram {
        /// Bot token from @BotFather
        #[arg(long, env = ENV_TELEGRAM_BOT_TOKEN, hide_env_values = true)]
        token: String,

        /// Bot API base URL
        #[arg(long, env = ENV_TELEGRAM_API_URL, default_value = DEFAULT_TELEGRAM_API_URL)]
        api_url: String,

        #[command(flatten)]
        backend: BackendArgs,
    },

    /// Render a sample bug screenshot (login form with a clipped button)
    MockScreenshot {
        /// Output file path
        #[arg(short, long, default_value = "./bug_screenshot.png")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // .env must be loaded before clap reads `env = ...` defaults
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, shutting down");
                shutdown.cancel();
            }
        });
    }

    match args.command {
        Some(Commands::Analyze {
            image,
            text,
            json,
            backend,
        }) => {
            let analyzer = build_analyzer(&backend).await?;

            let report = if let Some(path) = image {
                let bytes = std::fs::read(&path)?;
                let outcome = analyzer.analyze_image(&bytes, &shutdown).await;
                AnalysisReport::from_outcome(
                    AnalysisSource::Image,
                    analyzer.name(),
                    path.display().to_string(),
                    outcome,
                )
            } else {
                let description = text.unwrap_or_default();
                let outcome = analyzer.analyze_text(&description, &shutdown).await;
                AnalysisReport::from_outcome(
                    AnalysisSource::Text,
                    analyzer.name(),
                    description,
                    outcome,
                )
            };

            if let Some(error) = &report.error {
                warn!(%error, "analysis failed, showing fallback test cases");
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                if let Some(error) = &report.error {
                    println!("Analysis failed: {}", error);
                    println!("Fallback test cases you can edit:");
                    println!();
                }
                println!("{}", format_bug_analysis(&report.analysis));
            }
        }

        Some(Commands::Check { backend }) => {
            let analyzer = OllamaAnalyzer::new(ollama_config(&backend))?;
            let url = &analyzer.config().base_url;
            match analyzer.check_reachable().await {
                Ok(()) => {
                    println!("Ollama is reachable at {}", url);
                    println!("  Model: {}", analyzer.config().model);
                }
                Err(e) => {
                    eprintln!("Ollama is not reachable at {}: {}", url, e);
                    eprintln!("Start Ollama (open the app or run: ollama serve) and try again.");
                    std::process::exit(1);
                }
            }
        }

        Some(Commands::Chat { backend }) => {
            let analyzer = build_analyzer(&backend).await?;
            let transport = Arc::new(ConsoleTransport::stdio());

            eprintln!("Bug Vision chat. Type a bug description, @<path> for a screenshot,");
            eprintln!(">N <text> to reply to message N, /help for commands. Ctrl-D to quit.");

            BugReportBot::new(analyzer, transport).run(shutdown).await;
        }

        Some(Commands::Telegram {
            token,
            api_url,
            backend,
        }) => {
            let analyzer = build_analyzer(&backend).await?;
            let transport = TelegramTransport::with_api_url(token, api_url)?;
            transport.get_me().await?;

            BugReportBot::new(analyzer, Arc::new(transport))
                .run(shutdown)
                .await;
        }

        Some(Commands::MockScreenshot { output }) => {
            let canvas = sample_bug_screenshot()?;
            std::fs::write(&output, canvas.to_png()?)?;

            println!("Created sample bug screenshot: {}", output.display());
            println!("  Size: {}x{}", canvas.width(), canvas.height());
        }

        None => {
            println!("Bug Vision - QA test cases from bug screenshots and descriptions");
            println!();
            println!("Usage: bug-vision <COMMAND>");
            println!();
            println!("Commands:");
            println!("  analyze          Analyze a screenshot (--image) or description (--text)");
            println!("  check            Check that the Ollama backend is reachable");
            println!("  chat             Chat with the bot in this terminal");
            println!("  telegram         Run the bot on Telegram");
            println!("  mock-screenshot  Render a sample bug screenshot");
            println!();
            println!("Run with --help for more information.");
        }
    }

    Ok(())
}

fn ollama_config(backend: &BackendArgs) -> OllamaConfig {
    let mut config = OllamaConfig::new(&backend.ollama_url).model(&backend.model);
    if let Some(seconds) = backend.timeout {
        config = config.request_timeout(seconds);
    }
    config
}

/// Select the analyzer; the Ollama backend is probed once and a failed
/// probe only warns, since the bot falls back to templates per request.
async fn build_analyzer(backend: &BackendArgs) -> Result<Arc<dyn Analyzer>, Box<dyn Error>> {
    match AnalysisMode::from_name(&backend.mode) {
        AnalysisMode::Mock => {
            info!("analysis mode: mock");
            Ok(Arc::new(MockAnalyzer::new()))
        }
        AnalysisMode::Ollama => {
            let analyzer = OllamaAnalyzer::new(ollama_config(backend))?;
            info!(
                url = %analyzer.config().base_url,
                model = %analyzer.config().model,
                timeout = analyzer.config().request_timeout,
                max_concurrency = config::get().bot.max_concurrency,
                "analysis mode: ollama"
            );
            match analyzer.check_reachable().await {
                Ok(()) => info!("Ollama is reachable; AI analysis enabled"),
                Err(e) => warn!(
                    error = %e,
                    "Ollama is not reachable; start it (open the app or run: ollama serve). \
                     Until then results fall back to templates"
                ),
            }
            Ok(Arc::new(analyzer))
        }
    }
}
