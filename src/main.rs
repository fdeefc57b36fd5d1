use std::process::ExitCode;
use std::sync::Arc;

mod config;
mod counter;
mod error;
mod handler;
mod http;
mod logger;
mod server;

use error::ServerError;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logger::log_fatal(&e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), ServerError> {
    // First positional argument names the config file, without extension
    let config_name = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_NAME.to_string());
    let cfg = config::Config::load_from(&config_name)?;

    logger::init(&cfg.logging).map_err(ServerError::Logger)?;

    // Build the Tokio runtime, sized by `server.workers` when set
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build().map_err(ServerError::Runtime)?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), ServerError> {
    let addr = cfg.get_socket_addr()?;
    let listener = server::create_listener(addr)?;

    logger::log_server_start(&addr, &cfg);

    let state = Arc::new(config::AppState::new(cfg));
    let router = Arc::new(handler::Router::new(state));
    server::serve(listener, router).await;
    Ok(())
}
