use std::io::{self, IsTerminal};
use std::process::ExitCode;
use std::sync::mpsc;

use clap::Parser;
use olaf::{EngineState, SystemClock};
use olaf_cli::cli::CliArgs;
use olaf_cli::config::Settings;
use olaf_cli::logging;
use olaf_cli::providers::Providers;
use olaf_cli::runtime::{spawn_stdin_reader, ChatLoop, LoopHost};
use session_store::FileStore;

fn main() -> ExitCode {
    let args = CliArgs::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("olaf: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &CliArgs) -> Result<(), String> {
    let settings = Settings::from_env(args).map_err(|error| error.to_string())?;
    logging::init(&settings.log_level, settings.log_file.as_deref())
        .map_err(|error| error.to_string())?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        data_dir = %settings.data_dir.display(),
        provider = ?settings.provider,
        "starting olaf"
    );

    let store = FileStore::open(settings.store_dir()).map_err(|error| error.to_string())?;
    let engine = EngineState::new(
        Box::new(store),
        Box::new(SystemClock),
        settings.engine_config(),
    )
    .map_err(|error| error.to_string())?;
    let providers = Providers::from_settings(&settings).map_err(|error| error.to_string())?;

    let (events, receiver) = mpsc::channel();
    let host = LoopHost::new(events.clone(), providers, settings.reveal_tick)
        .map_err(|error| format!("failed to start reveal timer: {error}"))?;
    spawn_stdin_reader(events).map_err(|error| format!("failed to read stdin: {error}"))?;

    let stdout = io::stdout();
    let ansi = stdout.is_terminal();
    let mut chat = ChatLoop::new(engine, host, receiver, stdout.lock(), ansi);
    chat.run().map_err(|error| error.to_string())
}
