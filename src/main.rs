mod cli;
mod setup;

use cli::{parse_cli_mode, CliMode};
use desktop_agenda::storage::{app_dir, config::Config};
use setup::check_or_setup_auth;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_logging();

    let cli_mode = match parse_cli_mode(std::env::args().skip(1)) {
        Ok(mode) => mode,
        Err(err) => {
            eprintln!("Error: {}", err);
            println!("{}", cli::USAGE);
            return Ok(());
        }
    };

    if let CliMode::Help = cli_mode {
        println!("{}", cli::USAGE);
        return Ok(());
    }

    let config = Config::load_or_create()?;

    match cli_mode {
        CliMode::ShowPreferences => cli::show_preferences(&config),
        CliMode::SetPreference { key, value } => cli::set_preference(&config, &key, &value),
        CliMode::Agenda => {
            let auth = check_or_setup_auth(&config).await?;
            cli::run_agenda_mode(config, auth).await
        }
        CliMode::Open(index) => {
            let auth = check_or_setup_auth(&config).await?;
            cli::run_open_mode(config, auth, index).await
        }
        CliMode::Watch => {
            let auth = check_or_setup_auth(&config).await?;
            cli::run_watch_mode(config, auth).await
        }
        CliMode::Help => Ok(()),
    }
}

fn setup_logging() {
    let log_dir = app_dir();

    desktop_agenda::storage::ensure_private_dir(&log_dir).ok();

    let file_appender = tracing_appender::rolling::daily(log_dir, "desktop-agenda.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .init();

    std::mem::forget(_guard);

    tracing::info!("desktop-agenda started");
}
