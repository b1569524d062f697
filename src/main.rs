use conduit::config::Config;
use error_chain::ChainedError;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[rocket::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let rocket = match Config::from_env().and_then(conduit::rocket) {
        Ok(rocket) => rocket,
        Err(e) => {
            error!("{}", e.display_chain());
            std::process::exit(1);
        }
    };

    if let Err(e) = rocket.launch().await {
        error!(error = %e, "server stopped");
        std::process::exit(1);
    }
}
