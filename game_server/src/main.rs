use std::process::ExitCode;

use game_server::config::parse_cli_args;
use game_server::shutdown::{shutdown_channel, wait_for_signal};
use game_server::GameServer;

#[tokio::main]
async fn main() -> ExitCode {
    observability::init_logging();

    let config = match parse_cli_args(std::env::args()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load config");
            return ExitCode::FAILURE;
        }
    };

    let server = match GameServer::bind(&config).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "failed to start server");
            return ExitCode::FAILURE;
        }
    };

    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    tokio::spawn(async move {
        match wait_for_signal().await {
            Ok(()) => {
                tracing::info!("shutting down");
                shutdown_tx.trigger();
            }
            Err(e) => {
                // Dropping the sender would stop the server, so keep it alive.
                tracing::error!(error = %e, "failed to listen for shutdown signals");
                std::future::pending::<()>().await;
            }
        }
    });

    match server.run(shutdown_rx).await {
        Ok(()) => {
            tracing::info!("server stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "server failed");
            ExitCode::FAILURE
        }
    }
}
