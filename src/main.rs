// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, debug};
use std::io::{Read, Write};
use std::path::PathBuf;

use lingopad::Config;
use lingopad::app_config::{EngineBackend, LogLevel};
use lingopad::app_controller::Controller;
use lingopad::errors::AppError;
use lingopad::language_catalog;

/// CLI Wrapper for EngineBackend to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliEngineBackend {
    Ollama,
    Simulated,
}

impl From<CliEngineBackend> for EngineBackend {
    fn from(cli_backend: CliEngineBackend) -> Self {
        match cli_backend {
            CliEngineBackend::Ollama => EngineBackend::Ollama,
            CliEngineBackend::Simulated => EngineBackend::Simulated,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

/// Options shared by commands that load a configuration
#[derive(Args, Debug)]
struct CommonArgs {
    /// Configuration file path (defaults to ./conf.json, then the user config directory)
    #[arg(short, long)]
    config_path: Option<PathBuf>,

    /// Engine backend to use
    #[arg(short, long, value_enum)]
    engine: Option<CliEngineBackend>,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

#[derive(Args, Debug)]
struct TranslateArgs {
    /// Text to translate (read from stdin when omitted)
    #[arg(value_name = "TEXT")]
    text: Vec<String>,

    /// Source language code or name (e.g., 'en', 'Spanish')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code or name (e.g., 'fr', 'Japanese')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Allow model downloads over cellular connections
    #[arg(long)]
    allow_cellular: bool,

    /// Exit with an error status when the translation fails
    #[arg(long)]
    fail_on_error: bool,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate text between two supported languages
    Translate(TranslateArgs),

    /// List the supported languages
    Languages,

    /// Show which language models are installed locally
    Models(CommonArgs),

    /// Generate shell completions for lingopad
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// LingoPad - two-language text translation on a local engine
#[derive(Parser, Debug)]
#[command(name = "lingopad")]
#[command(version)]
#[command(about = "Translate text between two languages with a local translation engine")]
#[command(long_about = "LingoPad translates text with a local engine, downloading the language models it needs on first use.

EXAMPLES:
    lingopad translate -s en -t es \"Good morning\"   # English to Spanish
    echo \"Bonjour\" | lingopad translate -s fr -t en  # Read text from stdin
    lingopad translate -e simulated \"hello\"         # Offline run, no engine needed
    lingopad models                                 # Installed language models
    lingopad languages                              # Supported languages
    lingopad completions bash > lingopad.bash       # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. If the config file doesn't
    exist, a default one will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI color code for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "31",
            Level::Warn => "33",
            Level::Info => "32",
            Level::Debug => "36",
            Level::Trace => "35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.target().starts_with("lingopad")
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[1;{}m{} {} {}\x1B[0m",
                Self::get_color_for_level(record.level()),
                now,
                Self::get_emoji_for_level(record.level()),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize with trace so the max level alone decides what is shown
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "lingopad", &mut std::io::stdout());
            Ok(())
        }
        Commands::Languages => {
            for language in language_catalog::supported_languages() {
                println!("{:<4} {}", language.code, language.display_name);
            }
            Ok(())
        }
        Commands::Models(common) => run_models(common).await,
        Commands::Translate(args) => run_translate(args).await,
    }
}

/// Load the configuration and apply the shared command line overrides
fn load_config(common: &CommonArgs) -> Result<Config> {
    if let Some(cmd_log_level) = &common.log_level {
        let level: LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let config_path = common.config_path.clone().unwrap_or_else(Config::default_path);
    debug!("Using config file {}", config_path.display());
    let mut config = Config::load_or_create(&config_path)?;

    if let Some(engine) = &common.engine {
        config.engine.backend = engine.clone().into();
    }

    match &common.log_level {
        Some(log_level) => config.log_level = log_level.clone().into(),
        None => log::set_max_level(config.log_level.to_level_filter()),
    }

    Ok(config)
}

async fn run_translate(args: TranslateArgs) -> Result<()> {
    let mut config = load_config(&args.common)?;

    if let Some(source_language) = &args.source_language {
        config.source_language = source_language.clone();
    }
    if let Some(target_language) = &args.target_language {
        config.target_language = target_language.clone();
    }
    if args.allow_cellular {
        config.coordinator.allow_cellular = true;
    }

    config.validate().context("Configuration validation failed")?;

    let text = if args.text.is_empty() {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read text from stdin")?;
        buffer.trim_end().to_string()
    } else {
        args.text.join(" ")
    };

    if text.trim().is_empty() {
        return Err(anyhow!("Nothing to translate"));
    }

    let controller = Controller::with_config(config)?;
    debug!(
        "Translating {} chars from {} to {}",
        text.chars().count(),
        controller.config().source_language,
        controller.config().target_language
    );
    let translated = if args.fail_on_error {
        controller.try_translate_default(&text).await
    } else {
        controller.translate_default(&text).await.map_err(|e| AppError::Config(format!("{:#}", e)))
    };
    controller.shutdown();
    let translated = translated?;

    println!("{}", translated);
    Ok(())
}

async fn run_models(common: CommonArgs) -> Result<()> {
    let config = load_config(&common)?;
    config.validate().context("Configuration validation failed")?;

    let controller = Controller::with_config(config)?;
    for status in controller.model_report().await {
        let marker = if status.available { "installed" } else { "-" };
        println!(
            "{:<4} {:<12} {}",
            status.language.code, status.language.display_name, marker
        );
    }
    controller.shutdown();
    Ok(())
}
