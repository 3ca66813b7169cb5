use clap::Parser;
use colored::Colorize;
use dialolical_core::{
    BotConfig, CliErrorDisplay, DebateSession, DialolicalError, DialolicalResult, HttpApiClient,
    LoggingConfig, SessionOutcome, SessionSettings,
};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod output;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exit status used when the run was interrupted with Ctrl-C.
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser)]
#[command(name = "dialolical-bot")]
#[command(version = VERSION)]
#[command(about = "Reference bot for Dialolical - registers, joins a dialogue and debates")]
#[command(long_about = r#"
Registers a bot participant with a Dialolical server, joins the first open
dialogue and plays three scripted turns, then reacts to the dialogue.

When no dialogue is open, the bot creates one and exits so another bot can
join it. Point the bot at a server with DIALOLICAL_URL.
"#)]
struct Cli {
    #[arg(help = "Display name to register with (random when omitted)")]
    display_name: Option<String>,

    #[arg(help = "Bot model identifier reported to the server")]
    bot_model: Option<String>,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match BotConfig::load() {
        Ok(config) => config,
        Err(e) => {
            init_logging(cli.verbose, &LoggingConfig::default());
            return report_error(&e, cli.verbose);
        }
    };

    init_logging(cli.verbose, &config.logging);
    debug!(base_url = %config.base_url(), "Configuration loaded");

    let verbose = cli.verbose;
    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report_error(&e, verbose),
    }
}

fn init_logging(verbose: bool, logging: &LoggingConfig) {
    let default_level = if verbose { "debug" } else { logging.level.as_str() };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let json = logging.json_format;
    tracing_subscriber::registry()
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| {
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
        }))
        .with(filter)
        .init();
}

fn report_error(error: &DialolicalError, verbose: bool) -> ExitCode {
    if verbose {
        error.log();
    }
    eprint!("{}: {}", "Error".red().bold(), CliErrorDisplay::new(error));

    if matches!(error, DialolicalError::Cancelled) {
        ExitCode::from(EXIT_INTERRUPTED)
    } else {
        ExitCode::FAILURE
    }
}

async fn run(cli: Cli, config: BotConfig) -> DialolicalResult<()> {
    let client = HttpApiClient::new(&config)?;
    let settings = SessionSettings::from_config(&config)?;

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let session = DebateSession::new(client, settings)
        .with_cancellation(cancel)
        .with_event_callback(Box::new(|event| output::render(&event)));

    let outcome = session
        .run(cli.display_name.as_deref(), cli.bot_model.as_deref())
        .await?;

    if let SessionOutcome::Completed { report, .. } = &outcome {
        debug!(
            turns = report.turns_submitted,
            skipped = report.rounds_not_in_progress,
            "Turn loop finished"
        );
    }

    Ok(())
}

fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupted, cancelling session");
                cancel.cancel();
            }
            Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
        }
    });
}
