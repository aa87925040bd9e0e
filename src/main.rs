use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use leadsift::config::Settings;
use leadsift::interface::ContactInterface;
use leadsift::persist::Persistor;
use leadsift::server;

#[tokio::main]
async fn main() -> ExitCode {
    // an optional first argument names the config file
    let config_file = std::env::args().nth(1);
    let settings = match Settings::load(config_file.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let filter = EnvFilter::try_new(&settings.log).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match serve(settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "server stopped");
            ExitCode::FAILURE
        }
    }
}

async fn serve(settings: Settings) -> leadsift::Result<()> {
    let persistor = Persistor::new(settings.persistence_mode())?;
    let interface = Arc::new(ContactInterface::new(persistor, settings.filter_policy));
    let app = server::router(interface, settings.expose_error_details);
    let listener = tokio::net::TcpListener::bind(&settings.bind)
        .await
        .map_err(|e| leadsift::LeadsiftError::Config(format!("cannot bind {}: {e}", settings.bind)))?;
    info!(bind = %settings.bind, database = %settings.database, "listening");
    axum::serve(listener, app)
        .await
        .map_err(|e| leadsift::LeadsiftError::Store(e.to_string()))
}
