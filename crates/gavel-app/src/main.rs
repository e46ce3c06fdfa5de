use std::process::ExitCode;

use clap::Parser;
use gavel_app::{
    AppDirs, ConsolePresenter, favorite_selection, machine_config, master_config, master_resolver,
    server_from_arg,
};
use gavel_config::{CliArgs, Config, load_favorites};
use gavel_session::{ClientCommand, ProtocolStateMachine, SessionDriver};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    let dirs = match AppDirs::resolve(args.config.as_deref()) {
        Ok(dirs) => dirs,
        Err(e) => {
            eprintln!("Failed to resolve directories: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut config = match Config::load_or_create(&dirs.config_dir) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e}, using defaults");
            Config::default()
        }
    };
    config.apply_cli_overrides(&args);

    gavel_log::init_logging(Some(&dirs.log_dir), cfg!(debug_assertions), Some(&config));
    tracing::info!("Config dir: {}", dirs.config_dir.display());

    let game_server = match args.server.as_deref().map(server_from_arg).transpose() {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let resolver = match master_resolver(&config) {
        Ok(resolver) => resolver,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let favorites = load_favorites(&dirs.config_dir).unwrap_or_else(|e| {
        tracing::warn!("Failed to load favorites: {e}");
        Vec::new()
    });
    let mut presenter = ConsolePresenter::new();
    if let Some(server) = &game_server {
        presenter.select(favorite_selection(&favorites, server));
        presenter.follow(server);
    }

    let mut machine = ProtocolStateMachine::new(machine_config(&config), presenter);
    machine.set_favorites(favorites);
    machine.construct_lobby();

    let game_link = gavel_app::link_config(&config.network, config.network.connect_timeout_ms);
    let (commands, commands_rx) = mpsc::channel(32);
    let driver = SessionDriver::new(
        machine,
        master_config(&config),
        game_link,
        resolver,
        commands_rx,
    );
    let mut session = tokio::spawn(driver.with_favorites_dir(&dirs.config_dir).run());

    let _ = commands.send(ClientCommand::ConnectMaster).await;
    if let Some(server) = game_server {
        tracing::info!("Joining {}", server.authority());
        let _ = commands.send(ClientCommand::ConnectGame(server)).await;
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, shutting down");
            let _ = commands.send(ClientCommand::Shutdown).await;
            if let Err(e) = session.await {
                tracing::error!("Session task failed: {e}");
                return ExitCode::FAILURE;
            }
        }
        result = &mut session => {
            if let Err(e) = result {
                tracing::error!("Session task failed: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}
